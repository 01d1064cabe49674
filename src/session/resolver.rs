//! Choosing the server a session binds to.

use crate::error::{DirectoryError, DirectoryResult};
use crate::session::SessionConfig;
use crate::transport::{DirectoryConnector, TransportError};
use crate::validation::trim_or_none;
use log::debug;

/// Pick exactly one server for `config`.
///
/// An explicit server wins. Otherwise the first server of the configured site
/// in the configured (else joined) domain is used, falling back to the joined
/// domain's name itself. There is no failover across candidates.
pub async fn resolve_server<C: DirectoryConnector>(
    config: &SessionConfig,
    connector: &C,
) -> DirectoryResult<String> {
    if let Some(server) = trim_or_none(config.server.as_deref()) {
        debug!("Using configured server '{}'", server);
        return Ok(server.to_string());
    }

    let joined = connector.joined_domain().await.map_err(connection_error)?;
    let joined = trim_or_none(joined.as_deref()).map(str::to_string);
    let domain = trim_or_none(config.domain_name.as_deref())
        .map(str::to_string)
        .or_else(|| joined.clone());

    if let (Some(site), Some(domain)) = (trim_or_none(config.site_name.as_deref()), domain.as_deref()) {
        let servers = connector
            .servers_for_site(domain, site)
            .await
            .map_err(connection_error)?;
        if let Some(first) = servers.into_iter().next() {
            debug!("Using server '{}' from site '{}' in '{}'", first, site, domain);
            return Ok(first);
        }
        debug!("Site '{}' in '{}' lists no servers", site, domain);
    }

    match joined {
        Some(joined) => {
            debug!("Using joined domain '{}'", joined);
            Ok(joined)
        }
        None => Err(DirectoryError::Connection {
            server: None,
            message: "no server configured and the machine is not joined to a domain".to_string(),
        }),
    }
}

fn connection_error(error: TransportError) -> DirectoryError {
    DirectoryError::Connection {
        server: None,
        message: error.to_string(),
    }
}
