//! Gateway endpoint derivation.

use url::Url;

use crate::error::ProtoError;

/// Path of the gateway endpoint on every node.
pub const GATEWAY_PATH: &str = "/api/v1/gateway";

/// Derive the gateway WebSocket URL from a node's base URL.
///
/// The socket scheme mirrors the base scheme: `https` becomes `wss`, `http`
/// becomes `ws`. `ws`/`wss` bases are kept as they are. Path, query and
/// fragment of the base are replaced.
///
/// # Errors
///
/// Returns [`ProtoError::Endpoint`] if the base does not parse, has no host,
/// or uses another scheme.
pub fn gateway_url(base: &str) -> Result<Url, ProtoError> {
    let mut url = Url::parse(base).map_err(|e| ProtoError::Endpoint(format!("{base}: {e}")))?;

    if url.host_str().is_none() {
        return Err(ProtoError::Endpoint(format!("{base}: missing host")));
    }

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(ProtoError::Endpoint(format!(
                "{base}: unsupported scheme '{other}'"
            )));
        }
    };

    url.set_scheme(scheme)
        .map_err(|()| ProtoError::Endpoint(format!("{base}: cannot switch scheme to {scheme}")))?;
    url.set_path(GATEWAY_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://chat.example.com", "wss://chat.example.com/api/v1/gateway" ; "secure")]
    #[test_case("http://chat.example.com", "ws://chat.example.com/api/v1/gateway" ; "plain")]
    #[test_case("http://localhost:8080/", "ws://localhost:8080/api/v1/gateway" ; "with port")]
    #[test_case("https://chat.example.com/app/guilds?x=1#top", "wss://chat.example.com/api/v1/gateway" ; "page url")]
    #[test_case("wss://chat.example.com", "wss://chat.example.com/api/v1/gateway" ; "already websocket")]
    fn test_gateway_url(base: &str, expected: &str) {
        assert_eq!(gateway_url(base).expect("valid base").as_str(), expected);
    }

    #[test_case("ftp://chat.example.com" ; "unsupported scheme")]
    #[test_case("not a url" ; "unparseable")]
    #[test_case("" ; "empty")]
    fn test_gateway_url_rejected(base: &str) {
        let err = gateway_url(base).unwrap_err();
        assert!(matches!(err, ProtoError::Endpoint(_)));
    }
}
