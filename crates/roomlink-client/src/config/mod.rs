//! Client config loader (strict parsing).

pub mod schema;

use std::fs;

use url::Url;
use roomlink_core::error::{Result, RoomlinkError};

pub use schema::{
    ClientConfig, ControlSection, DataSection, ServerSection, SessionSection, StoreSection,
};

pub fn load_from_file(path: &str) -> Result<ClientConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RoomlinkError::BadConfig(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ClientConfig> {
    let cfg: ClientConfig = serde_yaml::from_str(s)
        .map_err(|e| RoomlinkError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Derive the control channel endpoint from a server base URL.
///
/// `http`/`ws` map to `ws`, `https`/`wss` to `wss`; `/ws` is appended to the
/// base path and the binary encoding is selected in the query.
pub fn control_endpoint(base: &str) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| RoomlinkError::BadConfig(format!("server.url {base}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(RoomlinkError::BadConfig(format!(
                "server.url: unsupported scheme {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| RoomlinkError::BadConfig(format!("server.url: cannot switch to {scheme}")))?;

    let path = format!("{}/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.query_pairs_mut().append_pair("encoding", "messagePack");

    Ok(url)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn http_base_becomes_ws_endpoint() {
        let url = control_endpoint("http://chat.local:8080").unwrap();
        assert_eq!(url.as_str(), "ws://chat.local:8080/ws?encoding=messagePack");
    }

    #[test]
    fn https_keeps_base_path() {
        let url = control_endpoint("https://example.com/chat/").unwrap();
        assert_eq!(url.as_str(), "wss://example.com/chat/ws?encoding=messagePack");
    }

    #[test]
    fn other_schemes_are_rejected() {
        let err = control_endpoint("ftp://example.com").unwrap_err();
        assert_eq!(err.class().as_str(), "CONFIG");
    }
}
