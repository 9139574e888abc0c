//! Link enrichment: reachability and safety verdicts for bookmark URLs.
//!
//! The sidebar only ever applies these verdicts as field updates; nothing here
//! touches the tree.

use std::net::IpAddr;

use async_trait::async_trait;
use serde::Serialize;
use url::{Host, Url};

use crate::types::bookmark::{LinkStatus, SafetyStatus};
use crate::types::errors::LinkCheckError;

/// Domains that serve placeholder pages for unused or for-sale domains.
const PARKING_HOSTS: &[&str] = &[
    "sedoparking.com",
    "parkingcrew.net",
    "bodis.com",
    "afternic.com",
    "dan.com",
    "hugedomains.com",
    "above.com",
    "parklogic.com",
];

const MAX_SUBDOMAIN_DEPTH: usize = 5;

/// Verdict for one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub status: LinkStatus,
    pub safety: SafetyStatus,
}

#[async_trait]
pub trait LinkChecker: Send + Sync {
    async fn check(&self, url: &str) -> Result<LinkReport, LinkCheckError>;
}

/// Whether `host` is, or is a subdomain of, a known parking service.
pub fn is_parking_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    PARKING_HOSTS
        .iter()
        .any(|parked| host == *parked || host.ends_with(&format!(".{}", parked)))
}

/// Static threat heuristics over the URL text alone.
///
/// Any scheme other than http(s) is `Unsafe`. Text that does not parse as a
/// URL at all is only a `Warning`.
pub fn assess_url_safety(raw: &str) -> SafetyStatus {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return SafetyStatus::Warning,
    };

    if !matches!(url.scheme(), "http" | "https") {
        return SafetyStatus::Unsafe;
    }

    let mut warning = url.scheme() == "http" || !url.username().is_empty() || url.password().is_some();

    match url.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => warning = true,
        Some(Host::Domain(domain)) => {
            let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
            if labels.iter().any(|l| l.starts_with("xn--")) || labels.len() > MAX_SUBDOMAIN_DEPTH {
                warning = true;
            }
            // Some URL parsers leave dotted-quad hosts as domains.
            if domain.parse::<IpAddr>().is_ok() {
                warning = true;
            }
        }
        None => return SafetyStatus::Unsafe,
    }

    if warning {
        SafetyStatus::Warning
    } else {
        SafetyStatus::Safe
    }
}

/// Maps an HTTP result onto a reachability status.
pub fn classify_response(status_code: u16, original_host: &str, final_host: &str) -> LinkStatus {
    if final_host != original_host && is_parking_host(final_host) {
        return LinkStatus::Parked;
    }
    match status_code {
        200..=399 => LinkStatus::Live,
        _ => LinkStatus::Dead,
    }
}

#[cfg(feature = "network")]
pub use http::HttpLinkChecker;

#[cfg(feature = "network")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::{Client, Method, StatusCode};
    use tracing::debug;
    use url::Url;

    use super::{assess_url_safety, classify_response, LinkChecker, LinkReport};
    use crate::types::bookmark::LinkStatus;
    use crate::types::errors::LinkCheckError;
    use crate::types::settings::EnrichmentSettings;

    /// Reachability checker issuing a HEAD request, falling back to GET for servers that refuse HEAD.
    pub struct HttpLinkChecker {
        client: Client,
    }

    impl HttpLinkChecker {
        pub fn new(settings: &EnrichmentSettings) -> Result<Self, LinkCheckError> {
            let client = Client::builder()
                .timeout(Duration::from_secs(settings.request_timeout_secs))
                .user_agent(settings.user_agent.clone())
                .build()
                .map_err(|e| LinkCheckError::Client(e.to_string()))?;
            Ok(Self { client })
        }

        async fn fetch(&self, method: Method, url: &Url) -> Option<(u16, String)> {
            match self.client.request(method, url.clone()).send().await {
                Ok(resp) => {
                    let host = resp.url().host_str().unwrap_or_default().to_string();
                    Some((resp.status().as_u16(), host))
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "link check request failed");
                    None
                }
            }
        }
    }

    #[async_trait]
    impl LinkChecker for HttpLinkChecker {
        async fn check(&self, raw: &str) -> Result<LinkReport, LinkCheckError> {
            let url = Url::parse(raw).map_err(|e| LinkCheckError::InvalidUrl(format!("{}: {}", raw, e)))?;
            let safety = assess_url_safety(raw);
            if !matches!(url.scheme(), "http" | "https") {
                return Ok(LinkReport {
                    status: LinkStatus::Dead,
                    safety,
                });
            }

            let original_host = url.host_str().unwrap_or_default().to_string();
            let mut result = self.fetch(Method::HEAD, &url).await;
            let refused_head = matches!(
                result,
                Some((code, _)) if code == StatusCode::METHOD_NOT_ALLOWED.as_u16()
                    || code == StatusCode::NOT_IMPLEMENTED.as_u16()
                    || code == StatusCode::FORBIDDEN.as_u16()
            );
            if result.is_none() || refused_head {
                result = self.fetch(Method::GET, &url).await;
            }

            let status = match result {
                Some((code, final_host)) => classify_response(code, &original_host, &final_host),
                None => LinkStatus::Dead,
            };
            Ok(LinkReport { status, safety })
        }
    }
}
