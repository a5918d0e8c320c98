//! Synology Photos over the DSM web API.
//!
//! One [`SynologyPhotos`] holds a single `reqwest` client (and its connection
//! pool); each login produces an independent [`SynologySession`] carrying its
//! own session id, so users never share a session.

mod api;
mod session;

use self::api::{AUTH_API, AUTH_VERSION, ENDPOINT, Envelope, LoginData};
use self::session::SynologySession;
use crate::error::{ErrorKind, Result};
use crate::models::Credentials;
use crate::service::{PhotoService, SessionHandle};
use async_trait::async_trait;
use exn::ResultExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Connection settings for a Synology NAS.
#[derive(Debug, Clone)]
pub struct SynologyOptions {
    /// Scheme, host and port, e.g. `https://nas.local:5001`.
    pub base_url: String,
    /// Accept self-signed certificates when `false`.
    pub verify_tls: bool,
    /// Session name passed at login; Synology Photos expects `SynologyPhotos`.
    pub session_name: String,
    pub timeout: Duration,
    /// Number of entries requested per listing page.
    pub page_size: u32,
}
impl SynologyOptions {
    pub fn new(host: &str, port: u16, secure: bool) -> Self {
        let scheme = if secure { "https" } else { "http" };
        Self {
            base_url: format!("{scheme}://{host}:{port}"),
            verify_tls: false,
            session_name: "SynologyPhotos".to_string(),
            timeout: Duration::from_secs(30),
            page_size: 1000,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{ENDPOINT}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug)]
struct Transport {
    client: reqwest::Client,
    endpoint: String,
    options: SynologyOptions,
}
impl Transport {
    /// POST a form-encoded call and decode the response envelope.
    async fn call<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> Result<Envelope<T>> {
        let response = match self.client.post(&self.endpoint).form(params).send().await {
            Ok(response) => response,
            Err(e) => {
                let kind = transport_error(&e);
                return Err(e).or_raise(|| kind);
            },
        };
        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => {
                let kind = transport_error(&e);
                return Err(e).or_raise(|| kind);
            },
        };
        match response.json::<Envelope<T>>().await {
            Ok(envelope) => Ok(envelope),
            Err(e) => {
                let kind = transport_error(&e);
                Err(e).or_raise(|| kind)
            },
        }
    }

    fn options(&self) -> &SynologyOptions {
        &self.options
    }
}

/// Classify a `reqwest` failure. Only failures that a later attempt could
/// plausibly avoid count as network errors.
fn transport_error(e: &reqwest::Error) -> ErrorKind {
    if e.is_decode() {
        return ErrorKind::InvalidResponse;
    }
    if e.is_builder() {
        return ErrorKind::Client;
    }
    match e.status() {
        Some(status) if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS => {
            ErrorKind::Network
        },
        Some(_) => ErrorKind::InvalidResponse,
        None => ErrorKind::Network,
    }
}

/// Synology Photos service.
#[derive(Debug, Clone)]
pub struct SynologyPhotos {
    transport: Arc<Transport>,
}
impl SynologyPhotos {
    pub fn new(options: SynologyOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!options.verify_tls)
            .timeout(options.timeout)
            .build()
            .or_raise(|| ErrorKind::Client)?;
        let endpoint = options.endpoint();
        Ok(Self { transport: Arc::new(Transport { client, endpoint, options }) })
    }
}

#[async_trait]
impl PhotoService for SynologyPhotos {
    fn name(&self) -> &str {
        "synology"
    }

    #[instrument(skip(self, credentials), fields(endpoint = %self.transport.endpoint))]
    async fn authenticate(&self, username: &str, credentials: &Credentials) -> Result<SessionHandle> {
        let params = [
            ("api", AUTH_API.to_string()),
            ("version", AUTH_VERSION.to_string()),
            ("method", "login".to_string()),
            ("account", username.to_string()),
            ("passwd", credentials.password().to_string()),
            ("session", self.transport.options.session_name.clone()),
            ("format", "sid".to_string()),
        ];
        let login: LoginData = self.transport.call::<LoginData>(&params).await?.into_data(AUTH_API)?;
        tracing::debug!("Logged in");
        Ok(Arc::new(SynologySession::new(Arc::clone(&self.transport), username, login.sid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options() {
        let options = SynologyOptions::new("nas.local", 5001, true);
        assert_eq!(options.base_url, "https://nas.local:5001");
        assert_eq!(options.endpoint(), "https://nas.local:5001/webapi/entry.cgi");
        assert_eq!(SynologyOptions::new("10.0.0.2", 5000, false).base_url, "http://10.0.0.2:5000");
    }

    #[test]
    fn test_trailing_slash() {
        let mut options = SynologyOptions::new("nas.local", 5001, true);
        options.base_url.push('/');
        assert_eq!(options.endpoint(), "https://nas.local:5001/webapi/entry.cgi");
    }

    #[test]
    fn test_client_builds() {
        let service = SynologyPhotos::new(SynologyOptions::new("nas.local", 5001, true)).unwrap();
        assert_eq!(service.name(), "synology");
    }
}
