//! Backend addresses.
//!
//! Every URL the client talks to is derived from one configured base URL.
//! The channel lives on the same host and port, using the unencrypted `ws`
//! scheme for local development hosts and `wss` everywhere else.

use std::net::{Ipv4Addr, Ipv6Addr};

use gambit_core::SearchMode;
use gambit_proto::{ClientId, SessionId};
use thiserror::Error;
use url::{Host, Url};

/// Invalid backend base URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// Not a URL
    #[error("invalid backend URL: {0}")]
    Parse(#[from] url::ParseError),
    /// Scheme other than http(s) or ws(s)
    #[error("unsupported backend scheme `{0}`")]
    UnsupportedScheme(String),
    /// URL without a host part
    #[error("backend URL has no host")]
    MissingHost,
}

/// Validated backend base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
    channel_base: Url,
}

impl Endpoint {
    /// Validate a backend base URL such as `http://localhost:8000`.
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        let mut base = Url::parse(raw)?;
        if !matches!(base.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(EndpointError::UnsupportedScheme(base.scheme().to_string()));
        }
        let host = base.host().ok_or(EndpointError::MissingHost)?.to_owned();

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);

        let scheme = if is_local(&host) { "ws" } else { "wss" };
        let port = base.port().map(|p| format!(":{p}")).unwrap_or_default();
        let channel_base = Url::parse(&format!("{scheme}://{host}{port}/"))?;

        Ok(Self { base, channel_base })
    }

    /// Base URL as configured (normalised to end in `/`).
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Channel address for `session`, carrying the persisted client id.
    pub fn channel_url(&self, session: &SessionId, client: &ClientId) -> Url {
        let mut url = self.channel_base.clone();
        url.set_path("/ws/chess/");
        push_segment(&mut url, session);
        url.query_pairs_mut().clear().append_pair("client_id", client.as_str());
        url
    }

    /// Joinable session listing.
    pub fn listing_url(&self) -> Url {
        self.resolve("waiting-games/")
    }

    /// Authoritative snapshot of `session`.
    pub fn snapshot_url(&self, session: &SessionId) -> Url {
        let mut url = self.resolve("join-game/");
        push_segment(&mut url, session);
        url
    }

    /// Move suggestion for the given search flavour.
    pub fn suggestion_url(&self, search: SearchMode) -> Url {
        let mut url = self.resolve("best-move/");
        url.query_pairs_mut().append_pair("game_mode", search.as_str());
        url
    }

    /// Position evaluation.
    pub fn evaluation_url(&self) -> Url {
        self.resolve("evalbar/")
    }

    fn resolve(&self, relative: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("{}{relative}", self.base.path()));
        url
    }
}

/// Append `session` as one percent-encoded segment to a path ending in `/`.
fn push_segment(url: &mut Url, session: &SessionId) {
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(session.as_str());
    }
}

fn is_local(host: &Host<String>) -> bool {
    match host {
        Host::Domain(name) => name.eq_ignore_ascii_case("localhost"),
        Host::Ipv4(ip) => ip.is_loopback() || *ip == Ipv4Addr::UNSPECIFIED,
        Host::Ipv6(ip) => ip.is_loopback() || *ip == Ipv6Addr::UNSPECIFIED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str) -> SessionId {
        SessionId::new(id).unwrap()
    }

    #[test]
    fn local_hosts_use_plain_websocket() {
        let client = ClientId::new("c-1");
        for raw in ["http://localhost:8000", "http://127.0.0.1:8000/", "http://[::1]:8000"] {
            let endpoint = Endpoint::parse(raw).unwrap();
            let url = endpoint.channel_url(&session("g1"), &client);
            assert_eq!(url.scheme(), "ws", "{raw}");
            assert_eq!(url.port(), Some(8000));
            assert_eq!(url.path(), "/ws/chess/g1");
            assert_eq!(url.query(), Some("client_id=c-1"));
        }
    }

    #[test]
    fn remote_hosts_use_encrypted_websocket() {
        let endpoint = Endpoint::parse("https://chess.example.org/api").unwrap();
        let url = endpoint.channel_url(&session("abc"), &ClientId::new("x"));
        assert_eq!(url.as_str(), "wss://chess.example.org/ws/chess/abc?client_id=x");
    }

    #[test]
    fn rest_urls_extend_base_path() {
        let endpoint = Endpoint::parse("https://chess.example.org/api").unwrap();
        assert_eq!(endpoint.listing_url().as_str(), "https://chess.example.org/api/waiting-games/");
        assert_eq!(
            endpoint.snapshot_url(&session("g7")).as_str(),
            "https://chess.example.org/api/join-game/g7"
        );
        assert_eq!(
            endpoint.suggestion_url(SearchMode::Minimax).as_str(),
            "https://chess.example.org/api/best-move/?game_mode=minimax"
        );
        assert_eq!(endpoint.evaluation_url().as_str(), "https://chess.example.org/api/evalbar/");
    }

    #[test]
    fn session_stays_one_path_segment() {
        let endpoint = Endpoint::parse("https://chess.example.org/api").unwrap();
        let spaced = session("g 1?x#y");
        assert_eq!(
            endpoint.channel_url(&spaced, &ClientId::new("c")).path(),
            "/ws/chess/g%201%3Fx%23y"
        );
        let snapshot = endpoint.snapshot_url(&spaced);
        assert_eq!(snapshot.path(), "/api/join-game/g%201%3Fx%23y");
        assert_eq!(snapshot.query(), None);
        assert_eq!(snapshot.path_segments().map(Iterator::count), Some(3));
    }

    #[test]
    fn rejects_unusable_bases() {
        assert!(matches!(
            Endpoint::parse("ftp://example.org"),
            Err(EndpointError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(matches!(Endpoint::parse("not a url"), Err(EndpointError::Parse(_))));
    }
}
