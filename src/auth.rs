//! Signed-request authentication.
//!
//! Verifies AWS-SigV4-signed HTTP requests against per-account secrets.
//! The transport layer hands over a [`SignedRequest`] descriptor plus the
//! materialized body; this module parses the `Authorization` header,
//! resolves the claimed access key through an [`AuthPrincipalProvider`],
//! rebuilds the canonical request, and compares signatures in constant
//! time. The three possible outcomes are values on
//! [`AuthenticationOutcome`]; anything else (store I/O, crypto faults)
//! propagates as [`Error`] so the caller can answer 5xx.
//!
//! Nothing in this module logs secrets, signatures, or request bodies.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::CryptoAlgebra;
use crate::error::Error;
use crate::metrics::{self, AuthOutcome, Timer};

/// `AWS4-HMAC-SHA256 Credential=<access>/<date>/<region>/<service>/aws4_request,
/// SignedHeaders=<h1;h2>, Signature=<hex64>`; only the scheme token is
/// case-insensitive.
static AUTHORIZATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i:AWS4-HMAC-SHA256)\s+Credential=([^/,\s]+)/(\d{8})/([^/,\s]+)/([^/,\s]+)/aws4_request,\s*SignedHeaders=([^,\s]+),\s*Signature=([0-9a-f]{64})$",
    )
    .unwrap()
});

/// An authenticated caller.
///
/// Constructed only by an [`AuthPrincipalProvider`]; the core never
/// synthesizes one. `secret_key` holds the stored form of the HMAC secret
/// (encrypted at rest when the deployment enables it).
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    /// Opaque user identifier.
    pub user_id: String,
    /// Public access-key identifier, unique per account.
    pub access_key: String,
    /// Stored HMAC secret.
    pub secret_key: String,
    /// Group memberships consumed by authorization downstream.
    pub groups: Vec<String>,
}

// Secret material must not reach logs or error output.
impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("user_id", &self.user_id)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("groups", &self.groups)
            .finish()
    }
}

/// Result of authenticating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationOutcome {
    /// The signature validated; here is the caller.
    Authenticated(Principal),
    /// The request carried no credentials.
    CredentialsMissing(String),
    /// The request carried credentials that did not hold up.
    CredentialsRejected(String),
}

/// Maps an access key to the principal that owns it.
///
/// Absence is modeled as `Ok(None)`; `Err` is reserved for infrastructure
/// failures and propagates to the caller untranslated.
#[async_trait]
pub trait AuthPrincipalProvider: Send + Sync {
    /// Looks up the principal owning the given access key.
    async fn get_auth_principal(&self, access_key: &str) -> Result<Option<Principal>, Error>;
}

/// Thread-safe in-memory principal store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryAuthPrincipalProvider {
    principals: RwLock<HashMap<String, Principal>>,
}

impl MemoryAuthPrincipalProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a principal, keyed by its access key.
    pub fn upsert(&self, principal: Principal) {
        self.principals
            .write()
            .insert(principal.access_key.clone(), principal);
    }
}

#[async_trait]
impl AuthPrincipalProvider for MemoryAuthPrincipalProvider {
    async fn get_auth_principal(&self, access_key: &str) -> Result<Option<Principal>, Error> {
        Ok(self.principals.read().get(access_key).cloned())
    }
}

/// Transport-neutral descriptor of an incoming HTTP request.
///
/// Headers preserve arrival order and may repeat; lookup is
/// case-insensitive and first-wins. The body travels separately as a
/// byte-exact string.
#[derive(Debug, Clone, Default)]
pub struct SignedRequest {
    /// HTTP method, uppercase.
    pub method: String,
    /// Request path exactly as sent, before percent-encoding.
    pub path: String,
    /// Query parameters in arrival order.
    pub query: Vec<(String, String)>,
    /// Headers in arrival order.
    pub headers: Vec<(String, String)>,
}

impl SignedRequest {
    /// Creates a descriptor for the given method and path.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header with the given name, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parsed fields of a SigV4 `Authorization` header.
#[derive(Debug, Clone)]
struct SigV4Header {
    access_key: String,
    date: String,
    region: String,
    service: String,
    signed_headers: Vec<String>,
    signature: String,
}

/// Outcome of parsing the `Authorization` header value.
enum HeaderParse {
    Parsed(SigV4Header),
    /// Header present but blank: the distinguished missing-token case.
    MissingToken,
    Malformed,
}

fn parse_authorization(value: &str) -> HeaderParse {
    let value = value.trim();
    if value.is_empty() {
        return HeaderParse::MissingToken;
    }

    match AUTHORIZATION_RE.captures(value) {
        Some(captures) => HeaderParse::Parsed(SigV4Header {
            access_key: captures[1].to_string(),
            date: captures[2].to_string(),
            region: captures[3].to_string(),
            service: captures[4].to_string(),
            signed_headers: captures[5].split(';').map(str::to_string).collect(),
            signature: captures[6].to_string(),
        }),
        None => HeaderParse::Malformed,
    }
}

/// Authenticates signed requests against a principal store.
pub struct Authenticator {
    provider: Arc<dyn AuthPrincipalProvider>,
    crypto: Arc<dyn CryptoAlgebra>,
    encrypt_user_secrets: bool,
}

impl Authenticator {
    /// Creates an authenticator.
    ///
    /// `encrypt_user_secrets` states whether the provider's stored secrets
    /// are encrypted with `crypto`; when false they are used as-is.
    pub fn new(
        provider: Arc<dyn AuthPrincipalProvider>,
        crypto: Arc<dyn CryptoAlgebra>,
        encrypt_user_secrets: bool,
    ) -> Self {
        Self {
            provider,
            crypto,
            encrypt_user_secrets,
        }
    }

    /// Authenticates one request.
    ///
    /// Returns the outcome as a value; only infrastructure faults surface
    /// as `Err`. Re-invocation with the same request and a stable store
    /// yields the same outcome.
    pub async fn authenticate(
        &self,
        request: &SignedRequest,
        body: &str,
    ) -> Result<AuthenticationOutcome, Error> {
        let timer = Timer::start();
        let outcome = self.authenticate_inner(request, body).await?;

        let label = match &outcome {
            AuthenticationOutcome::Authenticated(_) => AuthOutcome::Authenticated,
            AuthenticationOutcome::CredentialsMissing(_) => AuthOutcome::CredentialsMissing,
            AuthenticationOutcome::CredentialsRejected(_) => AuthOutcome::CredentialsRejected,
        };
        metrics::record_authentication(label, timer.elapsed());

        Ok(outcome)
    }

    async fn authenticate_inner(
        &self,
        request: &SignedRequest,
        body: &str,
    ) -> Result<AuthenticationOutcome, Error> {
        let Some(header_value) = request.header_value("authorization") else {
            debug!("no authorization header on request");
            return Ok(AuthenticationOutcome::CredentialsMissing(
                "Authorization header not found".to_string(),
            ));
        };

        let header = match parse_authorization(header_value) {
            HeaderParse::Parsed(header) => header,
            HeaderParse::MissingToken => {
                debug!("authorization header carried no authentication token");
                return Ok(AuthenticationOutcome::CredentialsMissing(
                    "Missing authentication token".to_string(),
                ));
            }
            HeaderParse::Malformed => {
                debug!("authorization header did not match the SigV4 grammar");
                return Ok(AuthenticationOutcome::CredentialsRejected(
                    "Authorization header could not be parsed".to_string(),
                ));
            }
        };

        let Some(principal) = self.provider.get_auth_principal(&header.access_key).await? else {
            debug!(access_key = %header.access_key, "no principal for access key");
            return Ok(AuthenticationOutcome::CredentialsRejected(format!(
                "Account with accessKey {} specified was not found",
                header.access_key
            )));
        };

        // Plaintext secret lives only for the duration of verification.
        let secret = if self.encrypt_user_secrets {
            Zeroizing::new(self.crypto.decrypt(&principal.secret_key)?)
        } else {
            Zeroizing::new(principal.secret_key.clone())
        };

        if verify_signature(request, body, &header, &secret) {
            debug!(access_key = %header.access_key, "request authenticated");
            Ok(AuthenticationOutcome::Authenticated(principal))
        } else {
            debug!(access_key = %header.access_key, "signature mismatch");
            Ok(AuthenticationOutcome::CredentialsRejected(
                "Request signature could not be validated".to_string(),
            ))
        }
    }
}

/// Rebuilds the canonical request and compares signatures.
///
/// Returns false when a signed header or `X-Amz-Date` is absent; the
/// canonical request could never match in that case.
fn verify_signature(
    request: &SignedRequest,
    body: &str,
    header: &SigV4Header,
    secret: &str,
) -> bool {
    let Some(amz_date) = request.header_value("x-amz-date") else {
        return false;
    };
    let Some(canonical_request) = canonical_request(request, &header.signed_headers, body) else {
        return false;
    };

    let scope = format!(
        "{}/{}/{}/aws4_request",
        header.date, header.region, header.service
    );
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signature = calculate_signature(
        secret,
        &header.date,
        &header.region,
        &header.service,
        &string_to_sign,
    );

    constant_time_eq(signature.as_bytes(), header.signature.as_bytes())
}

/// Builds the canonical request string.
///
/// Returns `None` if a header listed in `SignedHeaders` is absent from the
/// request.
fn canonical_request(
    request: &SignedRequest,
    signed_headers: &[String],
    body: &str,
) -> Option<String> {
    let mut canonical_headers = String::new();
    for name in signed_headers {
        let value = request.header_value(name)?;
        canonical_headers.push_str(&name.to_ascii_lowercase());
        canonical_headers.push(':');
        canonical_headers.push_str(&collapse_whitespace(value.trim()));
        canonical_headers.push('\n');
    }

    Some(format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        uri_encode_path(&request.path),
        canonical_query_string(&request.query),
        canonical_headers,
        signed_headers.join(";"),
        hex_sha256(body.as_bytes())
    ))
}

/// Collapses runs of inner whitespace to single spaces.
fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical query string: names and values percent-encoded, pairs sorted
/// lexicographically by name then value.
fn canonical_query_string(query: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .map(|(name, value)| (uri_encode_value(name), uri_encode_value(value)))
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// URI-encode a path, preserving segment slashes.
fn uri_encode_path(path: &str) -> String {
    use std::fmt::Write;
    let mut result = String::with_capacity(path.len() * 3);
    for c in path.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' | '/' => {
                result.push(c);
            }
            _ => {
                let mut buf = [0u8; 4];
                let encoded = c.encode_utf8(&mut buf);
                for b in encoded.as_bytes() {
                    let _ = write!(result, "%{:02X}", b);
                }
            }
        }
    }
    result
}

/// URI-encode a query name or value.
fn uri_encode_value(value: &str) -> String {
    use std::fmt::Write;
    let mut result = String::with_capacity(value.len() * 3);
    for c in value.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => {
                result.push(c);
            }
            _ => {
                let mut buf = [0u8; 4];
                let encoded = c.encode_utf8(&mut buf);
                for b in encoded.as_bytes() {
                    let _ = write!(result, "%{:02X}", b);
                }
            }
        }
    }
    result
}

/// SHA-256, hex-lowercase.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Four-step SigV4 signing key derivation and final signature.
fn calculate_signature(
    secret_key: &str,
    date: &str,
    region: &str,
    service: &str,
    string_to_sign: &str,
) -> String {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");
    hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()))
}

/// Length-safe constant-time comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}
