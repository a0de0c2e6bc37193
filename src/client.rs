//! Client for the root publication service
//!
//! Fetches a namespace's signed root, checks the signature against a pinned
//! public key and hands back the root for use with
//! [`crate::trie::verify_merkle_path`].

use crate::model::Hash;
use crate::service::{PublicKeyResponse, SignedMerkleRootResponse};
use crate::{Error, Result};
use std::time::Duration;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Blocking client for `/merkleRoot` and `/publicKey`
pub struct RootClient {
    base_url: String,
    client: reqwest::blocking::Client,
    /// Key published roots must be signed with
    public_key: Option<Vec<u8>>,
}

impl RootClient {
    /// Create a client for a service base URL (e.g. `http://peer0:8051`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(RootClient {
            base_url: base_url.into(),
            client,
            public_key: None,
        })
    }

    /// Require roots to be signed by this key
    pub fn with_public_key(mut self, public_key: Vec<u8>) -> Self {
        self.public_key = Some(public_key);
        self
    }

    /// Build the full URL for an endpoint
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Fetch the signed envelope as served
    pub fn fetch_signed_root(&self, namespace: &str) -> Result<SignedMerkleRootResponse> {
        let url = reqwest::Url::parse_with_params(
            &self.url("/merkleRoot"),
            &[("namespace", namespace)],
        )
        .map_err(|e| Error::Http(format!("Invalid service URL: {}", e)))?;

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "Request failed with status code {}",
                response.status()
            )));
        }

        response.json().map_err(|e| Error::Http(e.to_string()))
    }

    /// Fetch a namespace's root
    ///
    /// With a pinned public key the signature must verify; without one the
    /// signature is left to the caller. `None` means the namespace has no
    /// trie on the peer.
    pub fn fetch_root(&self, namespace: &str) -> Result<Option<Hash>> {
        let signed = self.fetch_signed_root(namespace)?;
        let payload = match &self.public_key {
            Some(key) => signed.open(key)?,
            None => signed.payload()?,
        };
        payload.root()
    }

    /// Fetch the service's signing key
    pub fn fetch_public_key(&self) -> Result<PublicKeyResponse> {
        let response = self
            .client
            .get(self.url("/publicKey"))
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "Request failed with status code {}",
                response.status()
            )));
        }

        response.json().map_err(|e| Error::Http(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let client = RootClient::new("http://localhost:8051/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/merkleRoot"), "http://localhost:8051/merkleRoot");
    }

    #[test]
    fn test_unreachable_service_is_http_error() {
        let client = RootClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert!(matches!(client.fetch_root("ns1"), Err(Error::Http(_))));
    }
}
