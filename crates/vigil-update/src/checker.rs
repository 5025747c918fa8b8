// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot update check against the version manifest endpoint.
//!
//! Fetches a JSON manifest (`{"version": "x.y.z"}`, extra fields
//! tolerated) and compares it against the running version with semver
//! ordering. Remote endpoints must use HTTPS; loopback is exempt so a
//! local mirror can be tested without certificates.

use std::time::Duration;

use semver::Version;
use serde::Deserialize;
use tracing::{debug, error};

use vigil_config::model::UpdateConfig;
use vigil_core::VigilError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// What the manifest says relative to the running version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Running the manifest version (or the manifest is not newer).
    UpToDate,
    /// The manifest advertises a newer version.
    Available { latest: Version },
    /// The running version is newer than the manifest; usually a
    /// development build or a stale mirror.
    AheadOfManifest { latest: Version },
}

#[derive(Debug, Deserialize)]
struct Manifest {
    version: String,
}

/// Fetches and evaluates the version manifest.
pub struct UpdateChecker {
    client: reqwest::Client,
    manifest_url: reqwest::Url,
    current: Version,
}

impl UpdateChecker {
    /// Build a checker from the `[update]` configuration section.
    ///
    /// The manifest URL is `https://{host}:{port}{location}`. When a CA
    /// file is pinned, the built-in roots are disabled and only that
    /// authority is trusted.
    pub fn new(config: &UpdateConfig, current_version: &str) -> Result<Self, VigilError> {
        let url = format!("https://{}:{}{}", config.host, config.port, config.location);
        Self::from_url(&url, config.ca_file.as_deref(), current_version)
    }

    /// Build a checker for an explicit manifest URL.
    ///
    /// Remote URLs must be HTTPS; loopback hosts may use plain HTTP.
    pub fn from_url(
        url: &str,
        ca_file: Option<&str>,
        current_version: &str,
    ) -> Result<Self, VigilError> {
        let manifest_url = reqwest::Url::parse(url)
            .map_err(|e| VigilError::Config(format!("invalid manifest URL `{url}`: {e}")))?;

        let host = manifest_url.host_str().unwrap_or("");
        if !is_loopback(host) && manifest_url.scheme() != "https" {
            error!(url, "update endpoint must use HTTPS");
            return Err(VigilError::Config(
                "update endpoint must use HTTPS".to_string(),
            ));
        }

        let current = Version::parse(current_version).map_err(|e| {
            VigilError::Config(format!("running version `{current_version}` is not semver: {e}"))
        })?;

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .timeout(REQUEST_TIMEOUT);

        if let Some(path) = ca_file {
            let pem = std::fs::read(path).map_err(|e| {
                VigilError::Config(format!("cannot read update.ca_file `{path}`: {e}"))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                VigilError::Config(format!("update.ca_file `{path}` is not a PEM certificate: {e}"))
            })?;
            builder = builder
                .add_root_certificate(cert)
                .tls_built_in_root_certs(false);
        }

        let client = builder.build().map_err(|e| {
            VigilError::update_check("building the update HTTP client failed", e)
        })?;

        Ok(Self {
            client,
            manifest_url,
            current,
        })
    }

    /// Fetch the manifest and compare versions.
    pub async fn check(&self) -> Result<UpdateStatus, VigilError> {
        let response = self
            .client
            .get(self.manifest_url.clone())
            .send()
            .await
            .map_err(|e| VigilError::update_check("manifest request failed", e))?;

        let response = response
            .error_for_status()
            .map_err(|e| VigilError::update_check("manifest endpoint returned an error", e))?;

        let manifest: Manifest = response
            .json()
            .await
            .map_err(|e| VigilError::update_check("manifest is not valid JSON", e))?;

        let latest = Version::parse(&manifest.version).map_err(|e| {
            VigilError::update_check(
                format!("manifest version `{}` is not semver", manifest.version),
                e,
            )
        })?;

        debug!(current = %self.current, %latest, "manifest fetched");

        Ok(match latest.cmp(&self.current) {
            std::cmp::Ordering::Greater => UpdateStatus::Available { latest },
            std::cmp::Ordering::Equal => UpdateStatus::UpToDate,
            std::cmp::Ordering::Less => UpdateStatus::AheadOfManifest { latest },
        })
    }

    /// The running version this checker compares against.
    pub fn current_version(&self) -> &Version {
        &self.current
    }
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "127.0.0.1" | "::1" | "[::1]" | "localhost") || host.starts_with("127.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn checker_for(server: &MockServer, current: &str) -> UpdateChecker {
        let url = format!("{}/manifest.json", server.uri());
        UpdateChecker::from_url(&url, None, current).unwrap()
    }

    #[test]
    fn remote_http_endpoint_is_rejected() {
        let result = UpdateChecker::from_url("http://updates.example.org/manifest.json", None, "0.4.1");
        assert!(matches!(result, Err(VigilError::Config(_))));
    }

    #[test]
    fn loopback_http_endpoint_is_allowed() {
        assert!(UpdateChecker::from_url("http://127.0.0.1:9/manifest.json", None, "0.4.1").is_ok());
    }

    #[test]
    fn non_semver_running_version_is_a_config_error() {
        let result =
            UpdateChecker::from_url("https://updates.example.org/manifest.json", None, "latest");
        assert!(matches!(result, Err(VigilError::Config(_))));
    }

    #[tokio::test]
    async fn newer_manifest_reports_available() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifest.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"version": "1.2.0", "rev": 7})),
            )
            .mount(&server)
            .await;

        let status = checker_for(&server, "1.1.3").await.check().await.unwrap();
        assert_eq!(
            status,
            UpdateStatus::Available {
                latest: Version::new(1, 2, 0)
            }
        );
    }

    #[tokio::test]
    async fn equal_manifest_reports_up_to_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifest.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "1.1.3"})),
            )
            .mount(&server)
            .await;

        let status = checker_for(&server, "1.1.3").await.check().await.unwrap();
        assert_eq!(status, UpdateStatus::UpToDate);
    }

    #[tokio::test]
    async fn older_manifest_reports_ahead() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifest.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "1.0.0"})),
            )
            .mount(&server)
            .await;

        let status = checker_for(&server, "1.1.3").await.check().await.unwrap();
        assert_eq!(
            status,
            UpdateStatus::AheadOfManifest {
                latest: Version::new(1, 0, 0)
            }
        );
    }

    #[tokio::test]
    async fn tls_failure_is_an_update_check_error() {
        // Speak TLS at a plaintext listener: the handshake fails and the
        // check reports it without panicking.
        let server = MockServer::start().await;
        let url = format!("https://{}/manifest.json", server.address());
        let checker = UpdateChecker::from_url(&url, None, "0.4.1").unwrap();

        let result = checker.check().await;
        assert!(matches!(result, Err(VigilError::UpdateCheck { .. })));
    }

    #[tokio::test]
    async fn server_error_is_an_update_check_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifest.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = checker_for(&server, "1.1.3").await.check().await;
        assert!(matches!(result, Err(VigilError::UpdateCheck { .. })));
    }

    #[tokio::test]
    async fn malformed_manifest_is_an_update_check_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result = checker_for(&server, "1.1.3").await.check().await;
        assert!(matches!(result, Err(VigilError::UpdateCheck { .. })));

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifest.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "seven"})),
            )
            .mount(&server)
            .await;

        let result = checker_for(&server, "1.1.3").await.check().await;
        assert!(matches!(result, Err(VigilError::UpdateCheck { .. })));
    }
}
