//! DNS fallback resolution.
//!
//! When the system resolver can't find `app.birdweather.com` — a common
//! failure mode on misconfigured routers and some container networks — we
//! retry against a short list of public resolvers before giving up, and log
//! a diagnostic pointing at the system configuration rather than the
//! fallback servers themselves.

use crate::constants::birdweather::{FALLBACK_DNS_SERVERS, FALLBACK_DNS_SERVER_TIMEOUT, FALLBACK_DNS_TOTAL_BUDGET};
use crate::error::{Error, Result};
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, warn};

/// `true` if `error` looks like a DNS resolution failure rather than a
/// connection, TLS, or timeout problem. Used to decide whether the fallback
/// path is worth attempting at all.
#[must_use]
pub fn looks_like_dns_failure(error: &reqwest::Error) -> bool {
    error.is_connect() && error.source().is_some_and(|source| {
        let text = source.to_string().to_lowercase();
        text.contains("dns") || text.contains("resolve") || text.contains("name or service")
    })
}

/// Resolve `host` against each of [`FALLBACK_DNS_SERVERS`] in order, within
/// [`FALLBACK_DNS_TOTAL_BUDGET`] overall. Returns the first successful
/// resolution's addresses; never connects by raw IP, only resolves.
///
/// # Errors
/// Returns [`Error::DnsResolution`] if every fallback server fails or the
/// total time budget is exhausted first.
pub async fn resolve_with_fallback(host: &str) -> Result<Vec<std::net::IpAddr>> {
    let deadline = Instant::now() + FALLBACK_DNS_TOTAL_BUDGET;
    warn!(host, "system DNS resolution failed; system DNS may be misconfigured, trying fallback resolvers");

    for server in FALLBACK_DNS_SERVERS {
        if Instant::now() >= deadline {
            break;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        let per_server_timeout = remaining.min(FALLBACK_DNS_SERVER_TIMEOUT);

        debug!(host, server, "probing fallback DNS resolver");
        match tokio::time::timeout(per_server_timeout, resolve_via(server, host)).await {
            Ok(Ok(addrs)) if !addrs.is_empty() => {
                debug!(host, server, count = addrs.len(), "fallback resolution succeeded");
                return Ok(addrs);
            }
            Ok(Ok(_)) => debug!(host, server, "fallback resolver returned no records"),
            Ok(Err(e)) => debug!(host, server, error = %e, "fallback resolver failed"),
            Err(_) => debug!(host, server, "fallback resolver timed out"),
        }
    }

    Err(Error::DnsResolution {
        host: host.to_string(),
        message: "all fallback resolvers failed or timed out".to_string(),
    })
}

async fn resolve_via(server: &str, host: &str) -> Result<Vec<std::net::IpAddr>> {
    let socket_addr: SocketAddr = server.parse().map_err(|_| Error::DnsResolution {
        host: host.to_string(),
        message: format!("invalid fallback server address {server}"),
    })?;
    let mut config = ResolverConfig::new();
    config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Udp));

    let resolver = TokioAsyncResolver::tokio(config, ResolverOpts::default());
    let response = resolver.lookup_ip(host).await.map_err(|e| Error::DnsResolution {
        host: host.to_string(),
        message: format!("via {server}: {e}"),
    })?;
    Ok(response.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_server_list_is_non_empty_and_parseable() {
        for server in FALLBACK_DNS_SERVERS {
            assert!(server.parse::<SocketAddr>().is_ok(), "{server} should parse as a socket addr");
        }
    }

    /// `resolve_with_fallback` always talks to real public resolvers, so it
    /// can't be exercised against a mock HTTP server. What's testable without
    /// a live network dependency is the decision this module makes before
    /// calling it: does a given transport error actually look like a DNS
    /// failure? We get a real one cheaply by asking reqwest to connect to a
    /// hostname that can't resolve; that failure happens locally, at the
    /// resolver, with no outbound packet sent.
    #[tokio::test]
    async fn looks_like_dns_failure_detects_an_actual_unresolvable_host() {
        let client = reqwest::Client::new();
        let err = client
            .get("http://this-host-does-not-exist.invalid/")
            .send()
            .await
            .expect_err("an unresolvable hostname should fail to connect");

        assert!(looks_like_dns_failure(&err), "expected a DNS-shaped error, got: {err}");
    }

    #[test]
    fn looks_like_dns_failure_rejects_non_connect_errors() {
        // A decode/body error (not a connect error) should never be treated
        // as DNS-shaped, regardless of its message text.
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let err = runtime.block_on(async {
            reqwest::get("not a url at all").await.expect_err("malformed URL should fail to build/send")
        });
        assert!(!looks_like_dns_failure(&err));
    }
}
