//! Remote storage backends for satcat.
//!
//! [`HttpStore`] serves catalogs over HTTP(S), transparently signing
//! requests for private S3 buckets when credentials are configured.
//! [`AnyStore`] routes each location to HTTP or the local filesystem by
//! scheme, so a single store handle can back a catalog whose links mix
//! both.

pub mod sign;

use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use satcat::{Error, FileStore, Result, Store};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::sign::{is_s3_url, sign, Credentials, SignOptions, SignedRequest};

/// Fetches and stores documents over HTTP(S).
///
/// S3 URLs are signed with SigV4 when credentials are available in the
/// environment; a failed signed GET falls back to an unsigned request so
/// public buckets keep working with stale or unrelated credentials.
pub struct HttpStore {
    client: Client,
    credentials: Option<Credentials>,
    requester_pays: bool,
    public_read: bool,
}

impl fmt::Debug for HttpStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpStore")
            .field("signed", &self.credentials.is_some())
            .field("requester_pays", &self.requester_pays)
            .field("public_read", &self.public_read)
            .finish()
    }
}

impl Default for HttpStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpStore {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            credentials: Credentials::from_env(),
            requester_pays: false,
            public_read: false,
        }
    }

    /// Use explicit credentials instead of the environment loader.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Send requester-pays headers on signed S3 requests.
    pub fn with_requester_pays(mut self, requester_pays: bool) -> Self {
        self.requester_pays = requester_pays;
        self
    }

    /// Give stored S3 objects a public-read ACL.
    pub fn with_public_read(mut self, public_read: bool) -> Self {
        self.public_read = public_read;
        self
    }

    pub fn shared() -> Arc<dyn Store> {
        Arc::new(Self::new())
    }

    /// The signed form of a request, for S3 locations with credentials on
    /// hand. `None` means send it plain. Every method goes through here so
    /// GET, PUT, and HEAD agree on what a private object looks like.
    fn signed(&self, method: &str, location: &str) -> Option<SignedRequest> {
        if !is_s3_url(location) {
            return None;
        }
        let credentials = self.credentials.as_ref()?;
        let options = SignOptions {
            requester_pays: self.requester_pays,
            public_read: self.public_read && method == "PUT",
            content_type: (method == "PUT").then(|| "application/json".to_string()),
        };
        Some(sign(location, method, credentials, &options, Utc::now()))
    }

    fn get(&self, location: &str) -> Result<reqwest::blocking::Response> {
        if let Some(signed) = self.signed("GET", location) {
            let mut request = self.client.get(&signed.url);
            for (name, value) in &signed.headers {
                request = request.header(name, value);
            }
            let response = request.send().map_err(transport)?;
            if response.status().is_success() {
                return Ok(response);
            }
            // the bucket may be public while the credentials are for
            // something else entirely
            debug!(location, status = %response.status(), "signed request failed, retrying unsigned");
        }
        self.client.get(location).send().map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> Error {
    Error::Transport(err.to_string())
}

impl Store for HttpStore {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let response = self.get(location)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::NotFound(location.to_string())),
            status if !status.is_success() => {
                Err(Error::Transport(format!("GET {location}: {status}")))
            }
            _ => Ok(response.bytes().map_err(transport)?.to_vec()),
        }
    }

    fn store(&self, location: &str, data: &[u8]) -> Result<()> {
        let mut request = self.client.put(location);
        if let Some(signed) = self.signed("PUT", location) {
            request = self.client.put(&signed.url);
            for (name, value) in &signed.headers {
                request = request.header(name, value);
            }
        }
        let response = request.body(data.to_vec()).send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("PUT {location}: {status}")));
        }
        Ok(())
    }

    fn exists(&self, location: &str) -> bool {
        let mut request = self.client.head(location);
        if let Some(signed) = self.signed("HEAD", location) {
            request = self.client.head(&signed.url);
            for (name, value) in &signed.headers {
                request = request.header(name, value);
            }
        }
        request
            .send()
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }
}

/// Routes each location to [`HttpStore`] or [`FileStore`] by scheme.
#[derive(Debug, Default)]
pub struct AnyStore {
    file: FileStore,
    http: HttpStore,
}

impl AnyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<dyn Store> {
        Arc::new(Self::new())
    }

    fn backend(&self, location: &str) -> &dyn Store {
        if location.starts_with("http://") || location.starts_with("https://") {
            &self.http
        } else {
            &self.file
        }
    }
}

impl Store for AnyStore {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        self.backend(location).fetch(location)
    }

    fn store(&self, location: &str, data: &[u8]) -> Result<()> {
        self.backend(location).store(location, data)
    }

    fn exists(&self, location: &str) -> bool {
        self.backend(location).exists(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::SignedRequest;

    fn credentials() -> Credentials {
        Credentials {
            access_key: "AKIDEXAMPLE".to_string(),
            secret_key: "secret".to_string(),
            region: "eu-central-1".to_string(),
            session_token: None,
        }
    }

    fn header<'a>(req: &'a SignedRequest, name: &str) -> Option<&'a str> {
        req.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_every_method_signs_s3_locations() {
        let store = HttpStore::new().with_credentials(credentials());
        let url = "https://bucket.s3.amazonaws.com/tree/catalog.json";

        // HEAD must be authorized the same way as GET and PUT, or exists()
        // reports private objects as absent
        for method in ["GET", "PUT", "HEAD"] {
            let signed = store.signed(method, url).unwrap();
            assert!(header(&signed, "Authorization").is_some(), "{method}");
            assert!(header(&signed, "x-amz-date").is_some(), "{method}");
        }
        assert!(store.signed("GET", "https://example.com/catalog.json").is_none());
    }

    #[test]
    fn test_public_read_applies_to_put_only() {
        let store = HttpStore::new()
            .with_credentials(credentials())
            .with_public_read(true);
        let url = "https://bucket.s3.amazonaws.com/catalog.json";

        let put = store.signed("PUT", url).unwrap();
        assert_eq!(header(&put, "x-amz-acl"), Some("public-read"));
        assert_eq!(header(&put, "content-type"), Some("application/json"));

        let get = store.signed("GET", url).unwrap();
        assert_eq!(header(&get, "x-amz-acl"), None);
        assert_eq!(header(&get, "content-type"), None);
    }

    #[test]
    fn test_any_store_routes_files_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json").to_str().unwrap().to_string();
        let store = AnyStore::new();

        assert!(!store.exists(&path));
        store.store(&path, b"{}").unwrap();
        assert!(store.exists(&path));
        assert_eq!(store.fetch(&path).unwrap(), b"{}");
    }

    #[test]
    fn test_any_store_missing_file_is_not_found() {
        let store = AnyStore::new();
        let err = store.fetch("/no/such/place.json").unwrap_err();
        assert!(err.is_not_found());
    }
}
