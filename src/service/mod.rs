//! Root publication service
//!
//! Serves `GET /merkleRoot?namespace=<ns>`: the namespace's current root,
//! serialized and signed, so an auditor can fetch a commitment without any
//! access to the trie. `GET /publicKey` exposes the key to verify against.

mod server;

pub use server::{PublisherGuard, ServiceHandle};

use crate::model::encoding::{base64_bytes, base64_opt};
use crate::model::Hash;
use crate::registry::TreeRegistry;
use crate::signer::{verify_signature, RootSigner};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inner payload: the root a namespace currently commits to
///
/// `last_commit_hash` carries the root as well until per-commit hashes are
/// tracked by the registry. Both are `null` for an untouched namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleRootResponse {
    #[serde(with = "base64_opt")]
    pub data: Option<Vec<u8>>,
    #[serde(with = "base64_opt")]
    pub last_commit_hash: Option<Vec<u8>>,
}

impl MerkleRootResponse {
    pub fn new(root: Option<Hash>) -> Self {
        let bytes = root.map(|h| h.as_bytes().to_vec());
        MerkleRootResponse {
            data: bytes.clone(),
            last_commit_hash: bytes,
        }
    }

    /// Decode the root
    pub fn root(&self) -> Result<Option<Hash>> {
        self.data.as_deref().map(Hash::from_slice).transpose()
    }
}

/// Outer envelope: serialized payload plus a signature over those bytes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMerkleRootResponse {
    #[serde(with = "base64_bytes")]
    pub serialized_merkle_root_response: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
}

impl SignedMerkleRootResponse {
    /// Check the signature against `public_key` and decode the payload
    pub fn open(&self, public_key: &[u8]) -> Result<MerkleRootResponse> {
        if !verify_signature(
            public_key,
            &self.serialized_merkle_root_response,
            &self.signature,
        )? {
            return Err(Error::Signature(
                "Signature does not match merkle root payload".into(),
            ));
        }
        self.payload()
    }

    /// Decode the payload without checking the signature
    pub fn payload(&self) -> Result<MerkleRootResponse> {
        Ok(serde_json::from_slice(&self.serialized_merkle_root_response)?)
    }
}

/// Response of `GET /publicKey`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub scheme: String,
    /// Hex-encoded public key
    pub public_key: String,
}

/// Looks up, serializes and signs namespace roots; transport-agnostic
pub struct RootPublisher {
    registry: Arc<TreeRegistry>,
    signer: Arc<dyn RootSigner>,
}

impl RootPublisher {
    pub fn new(registry: Arc<TreeRegistry>, signer: Arc<dyn RootSigner>) -> Self {
        RootPublisher { registry, signer }
    }

    /// Current root for `namespace`, signed over its serialized bytes
    pub fn signed_root(&self, namespace: &str) -> Result<SignedMerkleRootResponse> {
        let root = self.registry.get_merkle_root(namespace);
        tracing::debug!(
            namespace = %namespace,
            root = %root.map(|h| h.to_hex()).unwrap_or_default(),
            "publishing merkle root"
        );

        let payload = serde_json::to_vec(&MerkleRootResponse::new(root))?;
        let signature = self.signer.sign(&payload)?;
        Ok(SignedMerkleRootResponse {
            serialized_merkle_root_response: payload,
            signature,
        })
    }

    pub fn public_key(&self) -> PublicKeyResponse {
        PublicKeyResponse {
            scheme: self.signer.scheme().to_string(),
            public_key: hex::encode(self.signer.public_key()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HashAlgorithm;
    use crate::registry::{Height, UpdateBatch};
    use crate::signer::Ed25519Signer;

    struct FailingSigner;

    impl RootSigner for FailingSigner {
        fn sign(&self, _message: &[u8]) -> Result<Vec<u8>> {
            Err(Error::Signature("key unavailable".into()))
        }

        fn public_key(&self) -> Vec<u8> {
            Vec::new()
        }

        fn scheme(&self) -> &str {
            "none"
        }
    }

    fn publisher() -> (RootPublisher, Arc<TreeRegistry>, Vec<u8>) {
        let registry = Arc::new(TreeRegistry::new(HashAlgorithm::Sha256));
        let mut batch = UpdateBatch::new();
        batch.put("ns1", "k1", "v1");
        registry.apply_updates(&batch, Height::new(1, 0)).unwrap();

        let signer = Ed25519Signer::generate();
        let public_key = signer.public_key();
        (
            RootPublisher::new(registry.clone(), Arc::new(signer)),
            registry,
            public_key,
        )
    }

    #[test]
    fn test_signed_root_opens() {
        let (publisher, registry, public_key) = publisher();
        let signed = publisher.signed_root("ns1").unwrap();
        let payload = signed.open(&public_key).unwrap();
        assert_eq!(payload.root().unwrap(), registry.get_merkle_root("ns1"));
        assert_eq!(payload.data, payload.last_commit_hash);
    }

    #[test]
    fn test_untouched_namespace_has_null_root() {
        let (publisher, _, public_key) = publisher();
        let signed = publisher.signed_root("nsX").unwrap();
        let payload = signed.open(&public_key).unwrap();
        assert_eq!(payload.root().unwrap(), None);

        let raw: serde_json::Value =
            serde_json::from_slice(&signed.serialized_merkle_root_response).unwrap();
        assert!(raw["data"].is_null());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let (publisher, _, public_key) = publisher();
        let mut signed = publisher.signed_root("ns1").unwrap();
        let last = signed.serialized_merkle_root_response.len() - 3;
        signed.serialized_merkle_root_response[last] ^= 0x01;
        assert!(matches!(signed.open(&public_key), Err(Error::Signature(_))));
    }

    #[test]
    fn test_wire_field_names() {
        let (publisher, _, _) = publisher();
        let signed = publisher.signed_root("ns1").unwrap();
        let json = serde_json::to_value(&signed).unwrap();
        assert!(json["serializedMerkleRootResponse"].is_string());
        assert!(json["signature"].is_string());

        let inner: serde_json::Value =
            serde_json::from_slice(&signed.serialized_merkle_root_response).unwrap();
        assert!(inner["data"].is_string());
        assert!(inner["lastCommitHash"].is_string());
    }

    #[test]
    fn test_signer_failure_surfaces() {
        let registry = Arc::new(TreeRegistry::default());
        let publisher = RootPublisher::new(registry, Arc::new(FailingSigner));
        assert!(publisher.signed_root("ns1").is_err());
    }

    #[test]
    fn test_public_key_response() {
        let (publisher, _, public_key) = publisher();
        let info = publisher.public_key();
        assert_eq!(info.scheme, "ed25519");
        assert_eq!(hex::decode(info.public_key).unwrap(), public_key);
    }
}
