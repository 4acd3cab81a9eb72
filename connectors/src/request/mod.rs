//! Rate-limited, authenticated request dispatcher.
//!
//! One [`Requester`] exists per venue. It owns that venue's rate limits,
//! nonce counter, signer and credentials; nothing here is shared across
//! venues except the [`Transport`].

mod nonce;
mod probe;
mod rate_limit;
mod signer;
mod transport;

pub use nonce::Nonce;
pub use probe::{venue_error, Probe};
pub use rate_limit::RateLimit;
pub use signer::{
    hmac_sha256, hmac_sha512, CanonicalQuerySigner, Credentials, FormHmacSigner,
    JsonDigestSigner, PrehashSigner, QueryHmacSigner, SignRequest, Signer,
};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

use common::{Error, Result};
use parking_lot::RwLock;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

pub struct Requester {
    name: String,
    base_url: String,
    transport: Arc<dyn Transport>,
    signer: Option<Arc<dyn Signer>>,
    probe: Probe,
    unauth_limit: RateLimit,
    auth_limit: RateLimit,
    nonce: Nonce,
    credentials: RwLock<Credentials>,
    authenticated: AtomicBool,
    verbose: AtomicBool,
    timeout: RwLock<Duration>,
}

impl Requester {
    pub fn new(name: &str, base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            transport,
            signer: None,
            probe: venue_error,
            unauth_limit: RateLimit::unlimited(),
            auth_limit: RateLimit::unlimited(),
            nonce: Nonce::new(),
            credentials: RwLock::new(Credentials::default()),
            authenticated: AtomicBool::new(false),
            verbose: AtomicBool::new(false),
            timeout: RwLock::new(Duration::from_secs(common::config::DEFAULT_HTTP_TIMEOUT_SECS)),
        }
    }

    pub fn with_rate_limits(mut self, unauth: RateLimit, auth: RateLimit) -> Self {
        self.unauth_limit = unauth;
        self.auth_limit = auth;
        self
    }

    pub fn with_signer(mut self, signer: impl Signer + 'static) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    pub fn with_nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    pub fn set_timeout(&self, timeout: Duration) {
        *self.timeout.write() = timeout;
    }

    pub fn timeout(&self) -> Duration {
        *self.timeout.read()
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::SeqCst);
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write() = credentials;
    }

    pub fn client_id(&self) -> String {
        self.credentials.read().client_id.clone()
    }

    /// Unauthenticated GET of `path` (query included) under the public limit.
    pub async fn send_public<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.unauth_limit.acquire().await;

        let mut request = HttpRequest::new(Method::GET, format!("{}{}", self.base_url, path));
        request.timeout = self.timeout();
        self.log_request("public", &request);

        let response = self.transport.execute(request).await?;
        self.decode(response)
    }

    /// Signed request under the authenticated limit.
    ///
    /// Fails with `AuthNotConfigured` before touching the nonce or the
    /// network unless authenticated support was switched on for the venue.
    pub async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<T> {
        if !self.is_authenticated() {
            return Err(Error::AuthNotConfigured(self.name.clone()));
        }
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| Error::AuthNotConfigured(self.name.clone()))?;

        let nonce = self.nonce.next();
        let mut request = {
            let credentials = self.credentials.read();
            signer.sign(
                &credentials,
                SignRequest {
                    method,
                    base_url: &self.base_url,
                    path,
                    params,
                    nonce,
                },
            )?
        };
        request.timeout = self.timeout();

        self.auth_limit.acquire().await;
        self.log_request("signed", &request);

        let response = self.transport.execute(request).await?;
        self.decode(response)
    }

    fn decode<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T> {
        let parsed = serde_json::from_str::<serde_json::Value>(&response.body);

        if !response.is_success() {
            if let Some(message) = parsed.as_ref().ok().and_then(|body| (self.probe)(body)) {
                error!("{} rejected request: {}", self.name, message);
                return Err(Error::VenueRejected(message));
            }
            error!("{} API error: {} - {}", self.name, response.status, response.body);
            return Err(Error::RequestFailed(format!(
                "{} returned HTTP {}",
                self.name, response.status
            )));
        }

        let body = parsed.map_err(|e| {
            Error::DecodeFailed(format!("{} sent invalid JSON: {}", self.name, e))
        })?;
        if let Some(message) = (self.probe)(&body) {
            error!("{} rejected request: {}", self.name, message);
            return Err(Error::VenueRejected(message));
        }
        serde_json::from_value(body).map_err(|e| {
            Error::DecodeFailed(format!("{} response has unexpected shape: {}", self.name, e))
        })
    }

    fn log_request(&self, kind: &str, request: &HttpRequest) {
        if self.verbose.load(Ordering::SeqCst) {
            info!("{} {} {} {}", self.name, kind, request.method, request.url);
        } else {
            debug!("{} {} {} {}", self.name, kind, request.method, request.url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use std::collections::HashSet;

    struct CannedTransport {
        status: u16,
        body: String,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl CannedTransport {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().len()
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().push(request);
            Ok(HttpResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    #[derive(Debug, Deserialize)]
    struct Price {
        price: String,
    }

    fn requester(transport: Arc<CannedTransport>) -> Requester {
        Requester::new("test", "https://api.example.com", transport).with_signer(FormHmacSigner)
    }

    #[tokio::test]
    async fn public_request_decodes_body() {
        let transport = CannedTransport::new(200, r#"{"price":"1.5"}"#);
        let requester = requester(Arc::clone(&transport));
        requester.set_timeout(Duration::from_secs(3));

        let price: Price = requester.send_public("/ticker?symbol=BTCUSD").await.unwrap();
        assert_eq!(price.price, "1.5");

        let seen = transport.seen.lock();
        assert_eq!(seen[0].url, "https://api.example.com/ticker?symbol=BTCUSD");
        assert_eq!(seen[0].timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn signed_request_without_auth_makes_no_call() {
        let transport = CannedTransport::new(200, "{}");
        let requester = requester(Arc::clone(&transport));
        requester.set_credentials(Credentials {
            api_key: "key".into(),
            api_secret: b"secret".to_vec(),
            client_id: String::new(),
        });

        let result: Result<serde_json::Value> =
            requester.send_signed(Method::POST, "/tradingApi", Vec::new()).await;
        assert!(matches!(result, Err(Error::AuthNotConfigured(_))));
        assert_eq!(transport.calls(), 0);
        assert_eq!(requester.nonce().get(), 0);
    }

    #[tokio::test]
    async fn venue_errors_are_rejections() {
        let transport = CannedTransport::new(200, r#"{"error":"Invalid command."}"#);
        let result: Result<serde_json::Value> = requester(transport).send_public("/x").await;
        assert!(matches!(result, Err(Error::VenueRejected(msg)) if msg == "Invalid command."));

        let transport = CannedTransport::new(400, r#"{"code":-1121,"msg":"Invalid symbol."}"#);
        let result: Result<serde_json::Value> = requester(transport).send_public("/x").await;
        assert!(matches!(result, Err(Error::VenueRejected(_))));
    }

    #[tokio::test]
    async fn transport_and_shape_failures_are_distinct() {
        let transport = CannedTransport::new(503, "<html>down</html>");
        let result: Result<Price> = requester(transport).send_public("/x").await;
        assert!(matches!(result, Err(Error::RequestFailed(_))));

        let transport = CannedTransport::new(200, r#"{"other":1}"#);
        let result: Result<Price> = requester(transport).send_public("/x").await;
        assert!(matches!(result, Err(Error::DecodeFailed(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_signed_calls_get_unique_nonces() {
        let transport = CannedTransport::new(200, "{}");
        let requester = Arc::new(requester(Arc::clone(&transport)));
        requester.set_authenticated(true);

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let requester = Arc::clone(&requester);
                tokio::spawn(async move {
                    requester
                        .send_signed::<serde_json::Value>(Method::POST, "/tradingApi", Vec::new())
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let bodies: HashSet<String> = transport
            .seen
            .lock()
            .iter()
            .filter_map(|request| request.body.clone())
            .collect();
        assert_eq!(bodies.len(), 100);
        assert_eq!(transport.calls(), 100);
    }
}
