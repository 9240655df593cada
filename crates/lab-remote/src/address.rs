//! Endpoint address validation

use crate::error::{RemoteError, RemoteResult};
use reqwest::Url;

/// Parse and validate a service base address.
///
/// Accepts absolute `http`/`https` URLs with a host. Query strings and
/// fragments are rejected since operation paths are appended to the base.
/// Performs no I/O.
pub fn parse_address(address: &str) -> RemoteResult<Url> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(RemoteError::invalid_address(address, "address is empty"));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| RemoteError::invalid_address(address, e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(RemoteError::invalid_address(
                address,
                format!("unsupported scheme {other:?}, expected http or https"),
            ))
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(RemoteError::invalid_address(address, "missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(RemoteError::invalid_address(
            address,
            "query and fragment are not allowed in a base address",
        ));
    }

    Ok(url)
}

/// Append an operation path segment to a base address
pub(crate) fn endpoint(base: &Url, segment: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(segment);
    }
    url
}
