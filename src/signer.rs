//! Signing of published roots
//!
//! The publication service signs the exact serialized bytes it returns, so
//! an auditor holding the public key can check a root without trusting the
//! transport.

use crate::{Error, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::path::{Path, PathBuf};

/// Trait for whatever holds the key that vouches for published roots
///
/// Implementations can use:
/// - An in-process ed25519 key ([`Ed25519Signer`])
/// - An HSM or remote signing service
pub trait RootSigner: Send + Sync {
    /// Sign the message bytes
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;

    /// Public key auditors verify against
    fn public_key(&self) -> Vec<u8>;

    /// Signature scheme identifier
    fn scheme(&self) -> &str;
}

/// In-process ed25519 signer
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    /// Create a signer with a fresh random key
    pub fn generate() -> Self {
        Ed25519Signer {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Ed25519Signer {
            key: SigningKey::from_bytes(secret),
        }
    }

    /// Parse a hex-encoded 32-byte secret key
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| Error::Signature(format!("Invalid key encoding: {}", e)))?;
        let secret: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::Signature(format!("Expected 32-byte key, got {}", bytes.len())))?;
        Ok(Self::from_secret_bytes(&secret))
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }
}

impl RootSigner for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }

    fn public_key(&self) -> Vec<u8> {
        self.key.verifying_key().to_bytes().to_vec()
    }

    fn scheme(&self) -> &str {
        "ed25519"
    }
}

/// Check an ed25519 signature produced by a [`RootSigner`]
///
/// Malformed keys or signatures are errors; a well-formed signature that
/// does not match is `Ok(false)`.
pub fn verify_signature(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool> {
    let key: [u8; 32] = public_key.try_into().map_err(|_| {
        Error::Signature(format!(
            "Expected 32-byte public key, got {}",
            public_key.len()
        ))
    })?;
    let key = VerifyingKey::from_bytes(&key)
        .map_err(|e| Error::Signature(format!("Invalid public key: {}", e)))?;
    let signature = Signature::from_slice(signature)
        .map_err(|e| Error::Signature(format!("Invalid signature: {}", e)))?;
    Ok(key.verify(message, &signature).is_ok())
}

/// Key file store - keeps the signer's secret key as hex on disk
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    /// Create store using default path (~/.config/mtree/signing.key)
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".into()))?
            .join("mtree");
        Ok(Self {
            path: config_dir.join("signing.key"),
        })
    }

    /// Create store at a specific path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the key, or `None` if the file doesn't exist
    pub fn load(&self) -> Result<Option<Ed25519Signer>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::Config(format!("Failed to read signing key: {}", e)))?;
        Ed25519Signer::from_hex(&content).map(Some)
    }

    /// Write a key, replacing any existing one
    pub fn save(&self, signer: &Ed25519Signer) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::Config(format!("Failed to create key dir: {}", e)))?;
        }
        std::fs::write(&self.path, signer.secret_hex())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Load the key, generating and saving a new one if missing
    pub fn load_or_create(&self) -> Result<Ed25519Signer> {
        if let Some(signer) = self.load()? {
            return Ok(signer);
        }
        let signer = Ed25519Signer::generate();
        self.save(&signer)?;
        tracing::info!(path = %self.path.display(), "generated new signing key");
        Ok(signer)
    }
}
