//! Signing identity for the relayer account.

use crate::error::ClientError;
use escrow_ledger::{keccak256, Address};
use std::fmt;

/// Relayer key material and the identity derived from it.
///
/// The address is the trailing 20 bytes of the Keccak-256 digest of the
/// secret, matching how the deployment descriptor derives the relayer
/// identity from the same key.
#[derive(Clone)]
pub struct Signer {
    secret: [u8; 32],
    address: Address,
}

impl Signer {
    /// Parses a 32-byte hex-encoded secret (with or without `0x` prefix).
    pub fn from_hex(key: &str) -> Result<Self, ClientError> {
        let raw = key.strip_prefix("0x").unwrap_or(key);
        let bytes =
            hex::decode(raw).map_err(|e| ClientError::InvalidKey(format!("not hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(ClientError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&bytes);
        Ok(Self::from_secret(secret))
    }

    /// Builds a signer from raw secret bytes.
    #[must_use]
    pub fn from_secret(secret: [u8; 32]) -> Self {
        let digest = keccak256(&secret);
        let address = Address::from_slice(&digest.as_bytes()[12..])
            .unwrap_or(Address::ZERO);
        Self { secret, address }
    }

    /// The account identity this signer submits as.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Raw secret bytes. Only the connection adapter should need these.
    #[must_use]
    pub fn secret(&self) -> &[u8; 32] {
        &self.secret
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material
        f.debug_struct("Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
