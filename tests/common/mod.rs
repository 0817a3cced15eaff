//! Shared test infrastructure for control-plane integration tests.
//!
//! Carries a standalone SigV4 client-side signer so the integration tests
//! exercise the authenticator against independently produced signatures
//! rather than its own canonicalization code.

#![allow(dead_code)]

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use zonegate::{
    Authenticator, MemoryAuthPrincipalProvider, NoOpCrypto, Principal, SignedRequest,
};

// --- Constants ---

pub const ACCESS_KEY: &str = "AKID";
pub const SECRET_KEY: &str = "shh";
pub const REGION: &str = "us-east-1";
pub const SERVICE: &str = "vinyldns";
pub const DATE: &str = "20180101";
pub const AMZ_DATE: &str = "20180101T000000Z";

// --- Client-side signer ---

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

fn uri_encode(value: &str, keep_slash: bool) -> String {
    use std::fmt::Write;
    let mut result = String::with_capacity(value.len() * 3);
    for c in value.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => result.push(c),
            '/' if keep_slash => result.push(c),
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

/// Signs a request the way a SigV4 client library would and returns the
/// `Authorization` header value. Signs every header already present on the
/// request, sorted by lowercased name.
pub fn sign_request(request: &SignedRequest, body: &str, secret: &str) -> String {
    let mut signed_headers: Vec<String> = request
        .headers
        .iter()
        .map(|(name, _)| name.to_ascii_lowercase())
        .collect();
    signed_headers.sort();

    let mut canonical_headers = String::new();
    for name in &signed_headers {
        let value = request
            .headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .expect("signed header present");
        let collapsed = value.trim().split_whitespace().collect::<Vec<_>>().join(" ");
        canonical_headers.push_str(&format!("{name}:{collapsed}\n"));
    }

    let mut query: Vec<(String, String)> = request
        .query
        .iter()
        .map(|(name, value)| (uri_encode(name, false), uri_encode(value, false)))
        .collect();
    query.sort();
    let canonical_query = query
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        uri_encode(&request.path, true),
        canonical_query,
        canonical_headers,
        signed_headers.join(";"),
        hex_sha256(body.as_bytes())
    );

    let scope = format!("{DATE}/{REGION}/{SERVICE}/aws4_request");
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{AMZ_DATE}\n{scope}\n{}",
        hex_sha256(canonical_request.as_bytes())
    );

    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), DATE.as_bytes());
    let k_region = hmac_sha256(&k_date, REGION.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");
    let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

    format!(
        "AWS4-HMAC-SHA256 Credential={ACCESS_KEY}/{scope}, SignedHeaders={}, Signature={signature}",
        signed_headers.join(";")
    )
}

// --- Fixtures ---

pub fn make_principal() -> Principal {
    Principal {
        user_id: "ok-user".to_string(),
        access_key: ACCESS_KEY.to_string(),
        secret_key: SECRET_KEY.to_string(),
        groups: vec!["ok-group".to_string()],
    }
}

pub fn make_request(method: &str, path: &str) -> SignedRequest {
    SignedRequest::new(method, path)
        .header("Host", "api.example.com")
        .header("X-Amz-Date", AMZ_DATE)
}

/// Authenticator over a single-principal store with plaintext secrets.
pub fn make_authenticator() -> Authenticator {
    let provider = MemoryAuthPrincipalProvider::new();
    provider.upsert(make_principal());
    Authenticator::new(Arc::new(provider), Arc::new(NoOpCrypto), false)
}
