//! Content addresses for version-controlled objects.
//!
//! A `VcHash` identifies a function, module, or enum definition by the
//! SHA-256 of its canonical encoding. Pinned references in the elaborated
//! AST carry these hashes, and the evaluator resolves them through the
//! pinned environment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte content address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VcHash(pub [u8; 32]);

impl VcHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a hash from its 64-character hex rendering.
    pub fn from_hex(s: &str) -> Result<VcHash, String> {
        let bytes = hex::decode(s).map_err(|e| format!("invalid hash literal: {}", e))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "invalid hash literal: expected 32 bytes".to_string())?;
        Ok(VcHash(arr))
    }
}

impl fmt::Display for VcHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for VcHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps Debug output of AST nodes readable
        write!(f, "VcHash({}..)", &hex::encode(self.0)[..8])
    }
}
