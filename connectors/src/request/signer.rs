use crate::request::HttpRequest;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use common::{Error, Result};
use hmac::{Hmac, Mac};
use reqwest::Method;
use sha2::{Digest, Sha256, Sha512};
use url::form_urlencoded;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// API credentials held by one venue dispatcher.
#[derive(Clone, Default)]
pub struct Credentials {
    pub api_key: String,
    /// Raw secret bytes, already base64-decoded where the venue requires it
    pub api_secret: Vec<u8>,
    pub client_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Material for one signed call, before venue-specific encoding.
#[derive(Debug, Clone)]
pub struct SignRequest<'a> {
    pub method: Method,
    pub base_url: &'a str,
    pub path: &'a str,
    pub params: Vec<(String, String)>,
    pub nonce: u64,
}

/// Venue signing scheme.
///
/// Turns the call material into a complete request with the signature and
/// API key attached the way the venue expects.
pub trait Signer: Send + Sync {
    fn sign(&self, credentials: &Credentials, request: SignRequest<'_>) -> Result<HttpRequest>;
}

pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::InternalError(format!("invalid HMAC key: {}", e)))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn hmac_sha512(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| Error::InternalError(format!("invalid HMAC key: {}", e)))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn encode_query(params: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

fn params_json(params: &[(String, String)]) -> Result<String> {
    if params.is_empty() {
        return Ok(String::new());
    }
    let map: serde_json::Map<String, serde_json::Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();
    Ok(serde_json::to_string(&map)?)
}

fn with_query(url: String, query: &str) -> String {
    if query.is_empty() {
        url
    } else {
        format!("{}?{}", url, query)
    }
}

/// HMAC-SHA256 over the query string, hex signature appended as `signature`.
#[derive(Debug, Clone)]
pub struct QueryHmacSigner {
    pub key_header: &'static str,
    pub recv_window: u64,
}

impl Default for QueryHmacSigner {
    fn default() -> Self {
        Self {
            key_header: "X-MBX-APIKEY",
            recv_window: 5000,
        }
    }
}

impl QueryHmacSigner {
    pub fn signed_query(&self, secret: &[u8], params: &[(String, String)]) -> Result<String> {
        let query = encode_query(params);
        let signature = hex::encode(hmac_sha256(secret, query.as_bytes())?);
        Ok(format!("{}&signature={}", query, signature))
    }
}

impl Signer for QueryHmacSigner {
    fn sign(&self, credentials: &Credentials, request: SignRequest<'_>) -> Result<HttpRequest> {
        let mut params = request.params;
        params.push(("recvWindow".to_string(), self.recv_window.to_string()));
        params.push(("timestamp".to_string(), Utc::now().timestamp_millis().to_string()));

        let query = self.signed_query(&credentials.api_secret, &params)?;
        let url = format!("{}{}?{}", request.base_url, request.path, query);
        Ok(HttpRequest::new(request.method, url).header(self.key_header, &credentials.api_key))
    }
}

/// HMAC-SHA256 over `timestamp + METHOD + path + body` with a base64 secret.
///
/// The client id is sent as the passphrase.
#[derive(Debug, Clone, Default)]
pub struct PrehashSigner;

impl PrehashSigner {
    pub fn signature(
        secret: &[u8],
        timestamp: &str,
        method: &Method,
        path: &str,
        body: &str,
    ) -> Result<String> {
        let prehash = format!("{}{}{}{}", timestamp, method.as_str(), path, body);
        Ok(BASE64.encode(hmac_sha256(secret, prehash.as_bytes())?))
    }
}

impl Signer for PrehashSigner {
    fn sign(&self, credentials: &Credentials, request: SignRequest<'_>) -> Result<HttpRequest> {
        let timestamp = Utc::now().timestamp().to_string();
        let (path, body) = if request.method == Method::GET {
            (with_query(request.path.to_string(), &encode_query(&request.params)), String::new())
        } else {
            (request.path.to_string(), params_json(&request.params)?)
        };
        let signature =
            Self::signature(&credentials.api_secret, &timestamp, &request.method, &path, &body)?;

        let mut http = HttpRequest::new(request.method, format!("{}{}", request.base_url, path))
            .header("CB-ACCESS-KEY", &credentials.api_key)
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", timestamp)
            .header("CB-ACCESS-PASSPHRASE", &credentials.client_id)
            .header("Content-Type", "application/json");
        if !body.is_empty() {
            http = http.body(body);
        }
        Ok(http)
    }
}

/// HMAC-SHA512 over a form body carrying the nonce, hex signature in `Sign`.
#[derive(Debug, Clone, Default)]
pub struct FormHmacSigner;

impl Signer for FormHmacSigner {
    fn sign(&self, credentials: &Credentials, request: SignRequest<'_>) -> Result<HttpRequest> {
        let mut params = request.params;
        params.push(("nonce".to_string(), request.nonce.to_string()));
        let body = encode_query(&params);
        let signature = hex::encode(hmac_sha512(&credentials.api_secret, body.as_bytes())?);

        Ok(HttpRequest::new(request.method, format!("{}{}", request.base_url, request.path))
            .header("Key", &credentials.api_key)
            .header("Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body))
    }
}

/// SHA-256 digest of `nonce + JSON[method, url, body, nonce, timestamp]`,
/// then HMAC-SHA512 over `url + digest`, base64 in `Authorization`.
#[derive(Debug, Clone, Default)]
pub struct JsonDigestSigner;

impl JsonDigestSigner {
    pub fn signature(
        secret: &[u8],
        method: &Method,
        url: &str,
        body: &str,
        nonce: &str,
        timestamp: &str,
    ) -> Result<String> {
        let message = serde_json::to_string(&[method.as_str(), url, body, nonce, timestamp])?;
        let digest = Sha256::digest(format!("{}{}", nonce, message).as_bytes());

        let mut material = url.as_bytes().to_vec();
        material.extend_from_slice(&digest);
        Ok(BASE64.encode(hmac_sha512(secret, &material)?))
    }
}

impl Signer for JsonDigestSigner {
    fn sign(&self, credentials: &Credentials, request: SignRequest<'_>) -> Result<HttpRequest> {
        let base = format!("{}{}", request.base_url, request.path);
        let (url, body) = if request.method == Method::GET {
            (with_query(base, &encode_query(&request.params)), String::new())
        } else {
            (base, params_json(&request.params)?)
        };
        let nonce = request.nonce.to_string();
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = Self::signature(
            &credentials.api_secret,
            &request.method,
            &url,
            &body,
            &nonce,
            &timestamp,
        )?;

        let mut http = HttpRequest::new(request.method, url)
            .header("Authorization", format!("{}:{}", credentials.client_id, signature))
            .header("X-Auth-Timestamp", timestamp)
            .header("X-Auth-Nonce", nonce)
            .header("Content-Type", "application/json");
        if !body.is_empty() {
            http = http.body(body);
        }
        Ok(http)
    }
}

/// HMAC-SHA256 over `METHOD\nhost\npath\nsorted-query`, base64 signature
/// appended as the `Signature` query parameter.
#[derive(Debug, Clone, Default)]
pub struct CanonicalQuerySigner;

impl CanonicalQuerySigner {
    pub fn canonical_payload(
        method: &Method,
        host: &str,
        path: &str,
        params: &mut Vec<(String, String)>,
    ) -> (String, String) {
        params.sort();
        let query = encode_query(params);
        let payload = format!("{}\n{}\n{}\n{}", method.as_str(), host, path, query);
        (query, payload)
    }
}

impl Signer for CanonicalQuerySigner {
    fn sign(&self, credentials: &Credentials, request: SignRequest<'_>) -> Result<HttpRequest> {
        let host = url::Url::parse(request.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .ok_or_else(|| Error::InternalError(format!("bad base url {}", request.base_url)))?;

        let mut params = request.params;
        params.push(("AccessKeyId".to_string(), credentials.api_key.clone()));
        params.push(("SignatureMethod".to_string(), "HmacSHA256".to_string()));
        params.push(("SignatureVersion".to_string(), "2".to_string()));
        params.push((
            "Timestamp".to_string(),
            Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        ));

        let (query, payload) =
            Self::canonical_payload(&request.method, &host, request.path, &mut params);
        let signature = BASE64.encode(hmac_sha256(&credentials.api_secret, payload.as_bytes())?);
        let signature: String = form_urlencoded::byte_serialize(signature.as_bytes()).collect();

        let url = format!(
            "{}{}?{}&Signature={}",
            request.base_url, request.path, query, signature
        );
        Ok(HttpRequest::new(request.method, url).header("Content-Type", "application/json"))
    }
}
