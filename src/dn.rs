//! Distinguished-name helpers.
//!
//! DNs compare case-insensitively. Splitting honours backslash escapes, so
//! `CN=Doe\, John,OU=Staff` has two components.

/// Whether two DNs name the same entry.
pub fn equals(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Split a DN into its raw RDN strings.
pub fn split(dn: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' => {
                parts.push(dn[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < dn.len() || !parts.is_empty() {
        parts.push(dn[start..].trim());
    }
    parts.retain(|p| !p.is_empty());
    parts
}

/// `(type, value)` pairs for every RDN. Escapes are left in the value.
pub fn components(dn: &str) -> Vec<(&str, &str)> {
    split(dn)
        .into_iter()
        .filter_map(|rdn| rdn.split_once('='))
        .map(|(t, v)| (t.trim(), v.trim()))
        .collect()
}

/// Everything after the first RDN; `None` for a single-RDN DN.
pub fn parent(dn: &str) -> Option<&str> {
    let first = split(dn).into_iter().next()?;
    let offset = dn.find(first)? + first.len();
    let rest = dn[offset..].trim_start();
    let rest = rest.strip_prefix(',')?.trim_start();
    if rest.is_empty() { None } else { Some(rest) }
}

/// The first RDN's attribute type, e.g. `CN`.
pub fn rdn_type(dn: &str) -> Option<&str> {
    components(dn).first().map(|(t, _)| *t)
}

/// The first RDN's value.
pub fn rdn_value(dn: &str) -> Option<&str> {
    components(dn).first().map(|(_, v)| *v)
}

/// Whether `dn` is `base` or lies below it.
pub fn is_within(dn: &str, base: &str) -> bool {
    if equals(dn, base) {
        return true;
    }
    let dn_lower = dn.to_ascii_lowercase();
    let suffix = format!(",{}", base.to_ascii_lowercase());
    dn_lower.ends_with(&suffix)
}

/// Whether `dn` is an immediate child of `base`.
pub fn is_child_of(dn: &str, base: &str) -> bool {
    parent(dn).is_some_and(|p| equals(p, base))
}

/// Escape a value for use as an RDN value (RFC 4514 section 2.4).
pub fn escape_rdn_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '#' | ' ' if i == 0 => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' ' if i == last => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Undo RDN value escaping: `\,` becomes `,` and `\2C` becomes `,`.
pub fn unescape_rdn_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 == bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let pair = bytes
            .get(i + 1..i + 3)
            .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match pair {
            Some(byte) => {
                out.push(byte);
                i += 3;
            }
            None => {
                out.push(bytes[i + 1]);
                i += 2;
            }
        }
    }
    match String::from_utf8(out) {
        Ok(unescaped) => unescaped,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
