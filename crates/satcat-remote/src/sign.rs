//! AWS Signature Version 4 header signing for private S3 objects.
//!
//! Signing is entirely a transport concern: the core only ever sees
//! "give me bytes" / "accept these bytes". Credentials are passed as an
//! explicit [`Credentials`] value so the signer is testable without
//! touching the environment; [`Credentials::from_env`] is the production
//! loader.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::env;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Whether a URL matches the private-object-storage pattern the signer
/// handles.
pub fn is_s3_url(url: &str) -> bool {
    url.contains("s3.amazonaws.com")
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub session_token: Option<String>,
}

impl Credentials {
    /// Load credentials from the environment, preferring the
    /// bucket-specific variables over the generic AWS ones. `None` when no
    /// key pair is configured, in which case callers fall back to unsigned
    /// requests.
    pub fn from_env() -> Option<Self> {
        let access_key = env::var("AWS_BUCKET_ACCESS_KEY_ID")
            .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
            .ok()?;
        let secret_key = env::var("AWS_BUCKET_SECRET_ACCESS_KEY")
            .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
            .ok()?;
        let region = env::var("AWS_BUCKET_REGION")
            .or_else(|_| env::var("AWS_REGION"))
            .unwrap_or_else(|_| "eu-central-1".to_string());
        // a session token only applies to the generic credential pair
        let session_token = if env::var("AWS_BUCKET_ACCESS_KEY_ID").is_err() {
            env::var("AWS_SESSION_TOKEN").ok()
        } else {
            None
        };
        Some(Self {
            access_key,
            secret_key,
            region,
            session_token,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    pub requester_pays: bool,
    pub public_read: bool,
    pub content_type: Option<String>,
}

/// A rewritten request URL plus the headers that authorize it.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

fn hmac_sha256(key: &[u8], msg: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn signing_key(secret: &str, datestamp: &str, region: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), datestamp);
    let k_region = hmac_sha256(&k_date, region);
    let k_service = hmac_sha256(&k_region, SERVICE);
    hmac_sha256(&k_service, "aws4_request")
}

/// Sign a request against an S3 URL, producing the canonical virtual-host
/// URL and the headers to send with it.
pub fn sign(
    url: &str,
    method: &str,
    credentials: &Credentials,
    options: &SignOptions,
    now: DateTime<Utc>,
) -> SignedRequest {
    let stripped = url.trim_start_matches("https://").trim_start_matches("http://");
    let mut parts = stripped.splitn(2, '/');
    let host_part = parts.next().unwrap_or_default();
    let key = parts.next().unwrap_or_default();
    let bucket = host_part.replace(".s3.amazonaws.com", "");
    let host = format!("{bucket}.s3.amazonaws.com");

    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let datestamp = now.format("%Y%m%d").to_string();
    let canonical_uri = format!("/{key}");

    let mut headers: Vec<(String, String)> = vec![
        ("host".to_string(), host.clone()),
        ("x-amz-content-sha256".to_string(), UNSIGNED_PAYLOAD.to_string()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if options.requester_pays {
        headers.push(("x-amz-request-payer".to_string(), "requester".to_string()));
    }
    if options.public_read {
        headers.push(("x-amz-acl".to_string(), "public-read".to_string()));
    }
    if let Some(token) = &credentials.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort();

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();
    let signed_headers: String = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{method}\n{canonical_uri}\n\n{canonical_headers}\n{signed_headers}\n{UNSIGNED_PAYLOAD}"
    );
    let credential_scope = format!("{datestamp}/{}/{SERVICE}/aws4_request", credentials.region);
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{credential_scope}\n{}",
        sha256_hex(&canonical_request)
    );

    let key_bytes = signing_key(&credentials.secret_key, &datestamp, &credentials.region);
    let signature = {
        let mut mac = HmacSha256::new_from_slice(&key_bytes).expect("HMAC accepts any key length");
        mac.update(string_to_sign.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    };

    let authorization = format!(
        "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key
    );
    headers.push(("Authorization".to_string(), authorization));
    if let Some(content_type) = &options.content_type {
        headers.push(("content-type".to_string(), content_type.clone()));
    }

    SignedRequest {
        url: format!("https://{host}{canonical_uri}"),
        headers,
    }
}
