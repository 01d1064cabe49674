//! Typed accessors and property export.
//!
//! Every accessor parses its attribute on each call and returns `None` (or an
//! empty list) when the attribute is absent. Export goes through a static
//! registry of `(name, accessor)` pairs rather than reflection.

use super::DirectoryObject;
use crate::attributes::time::filetime_epoch;
use crate::dn;
use crate::error::DirectoryResult;
use crate::flags::GroupType;
use crate::session::DirectorySession;
use crate::transport::DirectoryTransport;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use uuid::Uuid;

/// Placeholder value for expensive properties left out of an export.
pub const SKIPPED: &str = "[SKIPPED]";

/// Properties that need the extended account facility.
pub const EXPENSIVE_PROPERTIES: [&str; 5] = [
    "is_disabled",
    "is_locked",
    "password_expiration_date",
    "password_expired",
    "user_cannot_change_password",
];

macro_rules! string_properties {
    ($($getter:ident, $setter:ident => $attribute:literal;)*) => {
        impl DirectoryObject {
            $(
                pub fn $getter(&self) -> Option<String> {
                    self.attributes.get_string($attribute)
                }

                pub async fn $setter<T: DirectoryTransport>(
                    &mut self,
                    session: &mut DirectorySession<T>,
                    value: Option<&str>,
                ) -> DirectoryResult<bool> {
                    self.set_string_property(session, $attribute, value).await
                }
            )*
        }
    };
}

string_properties! {
    comment, set_comment => "comment";
    company, set_company => "company";
    country_code, set_country_code => "countryCode";
    department, set_department => "department";
    description, set_description => "description";
    display_name, set_display_name => "displayName";
    display_name_printable, set_display_name_printable => "displayNamePrintable";
    employee_number, set_employee_number => "employeeNumber";
    given_name, set_given_name => "givenName";
    home_directory, set_home_directory => "homeDirectory";
    home_drive, set_home_drive => "homeDrive";
    info, set_info => "info";
    initials, set_initials => "initials";
    location, set_location => "location";
    lockout_time, set_lockout_time => "lockoutTime";
    mail, set_mail => "mail";
    mail_nickname, set_mail_nickname => "mailNickname";
    managed_by, set_managed_by => "managedBy";
    name, set_name => "name";
    physical_delivery_office_name, set_physical_delivery_office_name => "physicalDeliveryOfficeName";
    profile_path, set_profile_path => "profilePath";
    sam_account_name, set_sam_account_name => "sAMAccountName";
    script_path, set_script_path => "scriptPath";
    sn, set_sn => "sn";
    target_address, set_target_address => "targetAddress";
    telephone_number, set_telephone_number => "telephoneNumber";
    unc_name, set_unc_name => "uNCName";
    url, set_url => "url";
    user_principal_name, set_user_principal_name => "userPrincipalName";
    www_home_page, set_www_home_page => "wWWHomePage";
}

macro_rules! aliases {
    ($($alias:ident, $set_alias:ident => $getter:ident, $setter:ident;)*) => {
        impl DirectoryObject {
            $(
                pub fn $alias(&self) -> Option<String> {
                    self.$getter()
                }

                pub async fn $set_alias<T: DirectoryTransport>(
                    &mut self,
                    session: &mut DirectorySession<T>,
                    value: Option<&str>,
                ) -> DirectoryResult<bool> {
                    self.$setter(session, value).await
                }
            )*
        }
    };
}

aliases! {
    first_name, set_first_name => given_name, set_given_name;
    last_name, set_last_name => sn, set_sn;
    logon_name, set_logon_name => user_principal_name, set_user_principal_name;
    logon_name_pre_windows_2000, set_logon_name_pre_windows_2000 => sam_account_name, set_sam_account_name;
    office, set_office => physical_delivery_office_name, set_physical_delivery_office_name;
    web_page, set_web_page => www_home_page, set_www_home_page;
    login_script, set_login_script => script_path, set_script_path;
}

// `lastLogon` style attributes hold zero when never set.
fn never_set_to_none(value: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    value.filter(|v| *v > filetime_epoch())
}

impl DirectoryObject {
    pub fn account_expires(&self) -> Option<DateTime<Utc>> {
        self.attributes.get_datetime_utc("accountExpires")
    }

    pub fn bad_password_time(&self) -> Option<DateTime<Utc>> {
        self.attributes.get_datetime_utc("badPasswordTime")
    }

    pub fn bad_pwd_count(&self) -> Option<i32> {
        self.attributes.get_int("badPwdCount")
    }

    pub fn cn(&self) -> Option<String> {
        self.attributes.get_string("cn")
    }

    pub fn creation_time(&self) -> Option<DateTime<Utc>> {
        self.attributes.get_datetime_utc("creationTime")
    }

    pub fn dc(&self) -> Option<String> {
        self.attributes.get_string("dc")
    }

    pub fn dns_host_name(&self) -> Option<String> {
        self.attributes.get_string("dNSHostName")
    }

    pub fn dns_property(&self) -> Option<&[u8]> {
        self.attributes.get_bytes("dNSProperty")
    }

    pub fn dns_record(&self) -> Option<&[u8]> {
        self.attributes.get_bytes("dnsRecord")
    }

    pub fn dsa_signature(&self) -> Option<&[u8]> {
        self.attributes.get_bytes("dSASignature")
    }

    /// Raw `groupType` text.
    pub fn group_type(&self) -> Option<String> {
        self.attributes.get_string("groupType")
    }

    /// `groupType` decoded; `None` when absent or not a known combination.
    pub fn group_type_flags(&self) -> Option<GroupType> {
        self.attributes.get_int("groupType").and_then(GroupType::from_value)
    }

    pub fn home_mdb(&self) -> Option<String> {
        self.attributes.get_string("homeMDB")
    }

    pub fn home_mta(&self) -> Option<String> {
        self.attributes.get_string("homeMTA")
    }

    pub fn is_critical_system_object(&self) -> Option<bool> {
        self.attributes.get_bool("isCriticalSystemObject")
    }

    /// `None` when never set.
    pub fn last_logon(&self) -> Option<DateTime<Utc>> {
        never_set_to_none(self.attributes.get_datetime_utc("lastLogon"))
    }

    /// `None` when never set.
    pub fn last_logon_timestamp(&self) -> Option<DateTime<Utc>> {
        never_set_to_none(self.attributes.get_datetime_utc("lastLogonTimestamp"))
    }

    pub fn last_set_time(&self) -> Option<DateTime<Utc>> {
        self.attributes.get_datetime_utc("lastSetTime")
    }

    pub fn logon_count(&self) -> Option<i32> {
        self.attributes.get_int("logonCount")
    }

    pub fn managed_objects(&self) -> Vec<String> {
        self.attributes.get_strings("managedObjects")
    }

    pub fn mastered_by(&self) -> Vec<String> {
        self.attributes.get_strings("masteredBy")
    }

    pub fn max_pwd_age(&self) -> Option<i64> {
        self.attributes.get_long("maxPwdAge")
    }

    /// DNs of direct members.
    pub fn member(&self) -> Vec<String> {
        self.attributes.get_strings("member")
    }

    /// DNs of groups this object is a direct member of.
    pub fn member_of(&self) -> Vec<String> {
        self.attributes.get_strings("memberOf")
    }

    pub fn min_pwd_age(&self) -> Option<i64> {
        self.attributes.get_long("minPwdAge")
    }

    pub fn min_pwd_length(&self) -> Option<i32> {
        self.attributes.get_int("minPwdLength")
    }

    pub fn object_category(&self) -> Option<String> {
        self.attributes.get_string("objectCategory")
    }

    pub fn object_class(&self) -> Vec<String> {
        self.attributes.get_strings("objectClass")
    }

    pub fn object_sid(&self) -> Option<&[u8]> {
        self.attributes.get_bytes("objectSid")
    }

    pub fn object_version(&self) -> Option<i64> {
        self.attributes.get_long("objectVersion")
    }

    pub fn operating_system(&self) -> Option<String> {
        self.attributes.get_string("operatingSystem")
    }

    pub fn operating_system_hotfix(&self) -> Option<String> {
        self.attributes.get_string("operatingSystemHotfix")
    }

    pub fn operating_system_service_pack(&self) -> Option<String> {
        self.attributes.get_string("operatingSystemServicePack")
    }

    pub fn operating_system_version(&self) -> Option<String> {
        self.attributes.get_string("operatingSystemVersion")
    }

    pub fn other_well_known_objects(&self) -> Option<String> {
        self.attributes.get_string("otherWellKnownObjects")
    }

    pub fn ou(&self) -> Option<String> {
        self.attributes.get_string("ou")
    }

    pub fn primary_group_id(&self) -> Option<i64> {
        self.attributes.get_long("primaryGroupID")
    }

    pub fn priority(&self) -> Option<i64> {
        self.attributes.get_long("priority")
    }

    pub fn prior_set_time(&self) -> Option<DateTime<Utc>> {
        self.attributes.get_datetime_utc("priorSetTime")
    }

    pub fn protocol_settings(&self) -> Vec<&[u8]> {
        self.attributes.get_byte_arrays("protocolSettings")
    }

    pub fn proxy_addresses(&self) -> Vec<String> {
        self.attributes.get_strings("proxyAddresses")
    }

    pub fn pwd_history_length(&self) -> Option<i32> {
        self.attributes.get_int("pwdHistoryLength")
    }

    pub fn pwd_last_set(&self) -> Option<DateTime<Utc>> {
        self.attributes.get_datetime_utc("pwdLastSet")
    }

    pub fn pwd_properties(&self) -> Option<i64> {
        self.attributes.get_long("pwdProperties")
    }

    pub fn revision(&self) -> Option<i64> {
        self.attributes.get_long("revision")
    }

    pub fn sam_account_type(&self) -> Option<i32> {
        self.attributes.get_int("sAMAccountType")
    }

    pub fn security_identifier(&self) -> Option<&[u8]> {
        self.attributes.get_bytes("securityIdentifier")
    }

    pub fn server_name(&self) -> Option<String> {
        self.attributes.get_string("serverName")
    }

    pub fn system_flags(&self) -> Option<i64> {
        self.attributes.get_long("systemFlags")
    }

    pub fn user_account_control(&self) -> Option<i32> {
        self.attributes.get_int("userAccountControl")
    }

    /// Server-computed account control, under either spelling.
    pub fn user_account_control_computed(&self) -> Option<i32> {
        self.attributes
            .get_int("msDS-User-Account-Control-Computed")
            .or_else(|| self.attributes.get_int("ms-DS-User-Account-Control-Computed"))
    }

    pub fn user_certificate(&self) -> Vec<&[u8]> {
        self.attributes.get_byte_arrays("userCertificate")
    }

    pub fn user_parameters(&self) -> Option<&[u8]> {
        self.attributes.get_bytes("userParameters")
    }

    pub fn usn_changed(&self) -> Option<i64> {
        self.attributes.get_long("uSNChanged")
    }

    pub fn usn_created(&self) -> Option<i64> {
        self.attributes.get_long("uSNCreated")
    }

    pub fn version_number(&self) -> Option<i32> {
        self.attributes.get_int("versionNumber")
    }

    pub fn well_known_objects(&self) -> Vec<String> {
        self.attributes.get_strings("wellKnownObjects")
    }

    pub fn when_changed(&self) -> Option<DateTime<Utc>> {
        self.attributes.get_datetime_utc("whenChanged")
    }

    pub fn when_created(&self) -> Option<DateTime<Utc>> {
        self.attributes.get_datetime_utc("whenCreated")
    }

    /// DN of the container holding this object.
    pub fn organizational_unit(&self) -> Option<String> {
        dn::parent(self.distinguished_name()).map(str::to_string)
    }

    pub fn is_object_class(&self, object_class: &str) -> bool {
        self.object_class()
            .iter()
            .any(|c| c.eq_ignore_ascii_case(object_class))
    }

    /// Whether any RDN value of `objectCategory` equals `category`.
    pub fn is_object_category(&self, category: &str) -> bool {
        self.object_category().is_some_and(|value| {
            dn::components(&value)
                .iter()
                .any(|(_, v)| v.eq_ignore_ascii_case(category))
        })
    }

    pub fn is_group(&self) -> bool {
        self.is_object_class("group")
    }

    pub fn is_user(&self) -> bool {
        self.is_object_class("user") && self.is_object_category("person")
    }

    pub fn is_computer(&self) -> bool {
        self.is_object_class("computer") && self.is_object_category("computer")
    }
}

/// A property value in export form.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Text(String),
    Integer(i64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Guid(Uuid),
    Binary(Vec<u8>),
    TextList(Vec<String>),
    BinaryList(Vec<Vec<u8>>),
    /// An expensive property that was not loaded.
    Skipped,
}

impl PropertyValue {
    /// Render as `(index, text)` pairs; `Null` and empty lists render nothing.
    pub fn render(&self) -> Vec<(usize, String)> {
        match self {
            PropertyValue::Null => Vec::new(),
            PropertyValue::Text(s) => vec![(0, s.clone())],
            PropertyValue::Integer(i) => vec![(0, i.to_string())],
            PropertyValue::Boolean(b) => vec![(0, b.to_string())],
            PropertyValue::DateTime(dt) => vec![(0, dt.format("%Y-%m-%d %H:%M:%S").to_string())],
            PropertyValue::Guid(g) => vec![(0, g.to_string())],
            PropertyValue::Binary(bytes) => vec![(0, hex(bytes))],
            PropertyValue::TextList(list) => list.iter().cloned().enumerate().collect(),
            PropertyValue::BinaryList(list) => list.iter().map(|b| hex(b)).enumerate().collect(),
            PropertyValue::Skipped => vec![(0, SKIPPED.to_string())],
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        let _ = write!(out, "{byte:02X}");
    }
    out
}

impl From<Option<String>> for PropertyValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(PropertyValue::Null, PropertyValue::Text)
    }
}

impl From<Option<i32>> for PropertyValue {
    fn from(value: Option<i32>) -> Self {
        value.map_or(PropertyValue::Null, |v| PropertyValue::Integer(i64::from(v)))
    }
}

impl From<Option<i64>> for PropertyValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(PropertyValue::Null, PropertyValue::Integer)
    }
}

impl From<Option<bool>> for PropertyValue {
    fn from(value: Option<bool>) -> Self {
        value.map_or(PropertyValue::Null, PropertyValue::Boolean)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<Option<DateTime<Utc>>> for PropertyValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(PropertyValue::Null, PropertyValue::DateTime)
    }
}

impl From<Option<Uuid>> for PropertyValue {
    fn from(value: Option<Uuid>) -> Self {
        value.map_or(PropertyValue::Null, PropertyValue::Guid)
    }
}

impl From<Option<&[u8]>> for PropertyValue {
    fn from(value: Option<&[u8]>) -> Self {
        value.map_or(PropertyValue::Null, |b| PropertyValue::Binary(b.to_vec()))
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::TextList(value)
    }
}

impl From<Vec<&[u8]>> for PropertyValue {
    fn from(value: Vec<&[u8]>) -> Self {
        PropertyValue::BinaryList(value.into_iter().map(<[u8]>::to_vec).collect())
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

type Accessor = fn(&DirectoryObject) -> PropertyValue;

static PROPERTIES: &[(&str, Accessor)] = &[
    ("account_expires", |o| o.account_expires().into()),
    ("bad_password_time", |o| o.bad_password_time().into()),
    ("bad_pwd_count", |o| o.bad_pwd_count().into()),
    ("cn", |o| o.cn().into()),
    ("comment", |o| o.comment().into()),
    ("company", |o| o.company().into()),
    ("country_code", |o| o.country_code().into()),
    ("creation_time", |o| o.creation_time().into()),
    ("dc", |o| o.dc().into()),
    ("department", |o| o.department().into()),
    ("description", |o| o.description().into()),
    ("display_name", |o| o.display_name().into()),
    ("display_name_printable", |o| o.display_name_printable().into()),
    ("distinguished_name", |o| o.distinguished_name().into()),
    ("dns_host_name", |o| o.dns_host_name().into()),
    ("dns_property", |o| o.dns_property().into()),
    ("dns_record", |o| o.dns_record().into()),
    ("dsa_signature", |o| o.dsa_signature().into()),
    ("employee_number", |o| o.employee_number().into()),
    ("first_name", |o| o.first_name().into()),
    ("given_name", |o| o.given_name().into()),
    ("group_type", |o| o.group_type().into()),
    ("home_directory", |o| o.home_directory().into()),
    ("home_drive", |o| o.home_drive().into()),
    ("home_mdb", |o| o.home_mdb().into()),
    ("home_mta", |o| o.home_mta().into()),
    ("info", |o| o.info().into()),
    ("initials", |o| o.initials().into()),
    ("is_computer", |o| o.is_computer().into()),
    ("is_critical_system_object", |o| o.is_critical_system_object().into()),
    ("is_group", |o| o.is_group().into()),
    ("is_user", |o| o.is_user().into()),
    ("last_logon", |o| o.last_logon().into()),
    ("last_logon_timestamp", |o| o.last_logon_timestamp().into()),
    ("last_name", |o| o.last_name().into()),
    ("last_set_time", |o| o.last_set_time().into()),
    ("location", |o| o.location().into()),
    ("lockout_time", |o| o.lockout_time().into()),
    ("login_script", |o| o.login_script().into()),
    ("logon_count", |o| o.logon_count().into()),
    ("logon_name", |o| o.logon_name().into()),
    ("logon_name_pre_windows_2000", |o| o.logon_name_pre_windows_2000().into()),
    ("mail", |o| o.mail().into()),
    ("mail_nickname", |o| o.mail_nickname().into()),
    ("managed_by", |o| o.managed_by().into()),
    ("managed_objects", |o| o.managed_objects().into()),
    ("mastered_by", |o| o.mastered_by().into()),
    ("max_pwd_age", |o| o.max_pwd_age().into()),
    ("member", |o| o.member().into()),
    ("member_of", |o| o.member_of().into()),
    ("min_pwd_age", |o| o.min_pwd_age().into()),
    ("min_pwd_length", |o| o.min_pwd_length().into()),
    ("name", |o| o.name().into()),
    ("object_category", |o| o.object_category().into()),
    ("object_class", |o| o.object_class().into()),
    ("object_guid", |o| o.object_guid().into()),
    ("object_sid", |o| o.object_sid().into()),
    ("object_version", |o| o.object_version().into()),
    ("office", |o| o.office().into()),
    ("operating_system", |o| o.operating_system().into()),
    ("operating_system_hotfix", |o| o.operating_system_hotfix().into()),
    ("operating_system_service_pack", |o| o.operating_system_service_pack().into()),
    ("operating_system_version", |o| o.operating_system_version().into()),
    ("organizational_unit", |o| o.organizational_unit().into()),
    ("other_well_known_objects", |o| o.other_well_known_objects().into()),
    ("ou", |o| o.ou().into()),
    ("physical_delivery_office_name", |o| o.physical_delivery_office_name().into()),
    ("primary_group_id", |o| o.primary_group_id().into()),
    ("prior_set_time", |o| o.prior_set_time().into()),
    ("priority", |o| o.priority().into()),
    ("profile_path", |o| o.profile_path().into()),
    ("protocol_settings", |o| o.protocol_settings().into()),
    ("proxy_addresses", |o| o.proxy_addresses().into()),
    ("pwd_history_length", |o| o.pwd_history_length().into()),
    ("pwd_last_set", |o| o.pwd_last_set().into()),
    ("pwd_properties", |o| o.pwd_properties().into()),
    ("revision", |o| o.revision().into()),
    ("sam_account_name", |o| o.sam_account_name().into()),
    ("sam_account_type", |o| o.sam_account_type().into()),
    ("script_path", |o| o.script_path().into()),
    ("security_identifier", |o| o.security_identifier().into()),
    ("server_name", |o| o.server_name().into()),
    ("sn", |o| o.sn().into()),
    ("system_flags", |o| o.system_flags().into()),
    ("target_address", |o| o.target_address().into()),
    ("telephone_number", |o| o.telephone_number().into()),
    ("unc_name", |o| o.unc_name().into()),
    ("url", |o| o.url().into()),
    ("user_account_control", |o| o.user_account_control().into()),
    ("user_account_control_computed", |o| o.user_account_control_computed().into()),
    ("user_certificate", |o| o.user_certificate().into()),
    ("user_parameters", |o| o.user_parameters().into()),
    ("user_principal_name", |o| o.user_principal_name().into()),
    ("usn_changed", |o| o.usn_changed().into()),
    ("usn_created", |o| o.usn_created().into()),
    ("version_number", |o| o.version_number().into()),
    ("web_page", |o| o.web_page().into()),
    ("well_known_objects", |o| o.well_known_objects().into()),
    ("when_changed", |o| o.when_changed().into()),
    ("when_created", |o| o.when_created().into()),
    ("www_home_page", |o| o.www_home_page().into()),
];

/// One exported value of one property of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRow {
    pub distinguished_name: String,
    pub object_guid: String,
    pub name: String,
    pub index: usize,
    pub value: String,
}

impl DirectoryObject {
    /// Every registered property by name.
    ///
    /// Expensive properties are [`PropertyValue::Skipped`] unless
    /// `include_expensive` is set and the extended account state has been
    /// loaded with [`load_extended`](Self::load_extended).
    pub fn properties(&self, include_expensive: bool) -> BTreeMap<&'static str, PropertyValue> {
        let mut map: BTreeMap<&'static str, PropertyValue> = PROPERTIES
            .iter()
            .map(|(name, accessor)| (*name, accessor(self)))
            .collect();

        let extended = self.extended_state().filter(|_| include_expensive);
        for name in EXPENSIVE_PROPERTIES {
            let value = match (name, extended) {
                (_, None) => PropertyValue::Skipped,
                ("is_disabled", Some(_)) => self.is_disabled_loaded().into(),
                ("is_locked", Some(state)) => state.is_locked.into(),
                ("password_expiration_date", Some(state)) => state.password_expiration_date.into(),
                ("password_expired", Some(_)) => self.password_expired().into(),
                ("user_cannot_change_password", Some(state)) => state.user_cannot_change_password.into(),
                _ => PropertyValue::Skipped,
            };
            map.insert(name, value);
        }
        map
    }

    /// Flatten objects into `(DN, GUID, name, index, value)` rows.
    ///
    /// Absent values produce no rows; lists produce one row per element;
    /// binary values render as `0x` followed by uppercase hex.
    pub fn property_rows<'a>(
        objects: impl IntoIterator<Item = &'a DirectoryObject>,
        include_expensive: bool,
    ) -> Vec<PropertyRow> {
        let mut rows = Vec::new();
        for object in objects {
            let guid = object.object_guid().map(|g| g.to_string()).unwrap_or_default();
            for (name, value) in object.properties(include_expensive) {
                for (index, text) in value.render() {
                    rows.push(PropertyRow {
                        distinguished_name: object.distinguished_name().to_string(),
                        object_guid: guid.clone(),
                        name: name.to_string(),
                        index,
                        value: text,
                    });
                }
            }
        }
        log::debug!("Exported {} property rows", rows.len());
        rows
    }
}
