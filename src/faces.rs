//! Face-database entries stored as record payloads.
//!
//! The face loader hands us `(name, feature vector)` pairs; they are
//! stored as JSON (`{"name":"john_doe","vector":[0.12, ...]}`) under the
//! record id `name`.  Vectors round-trip bit-exactly.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::errors::{VaultError, Result};
use crate::vault::record::validate_record_id;

/// One enrolled face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEntry {
    pub name: String,
    pub vector: Vec<f64>,
}

impl FaceEntry {
    pub fn new(name: impl Into<String>, vector: Vec<f64>) -> Result<Self> {
        let entry = Self {
            name: name.into(),
            vector,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Serialize to the record payload.
    pub fn to_payload(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.validate()?;
        serde_json::to_vec(self)
            .map(Zeroizing::new)
            .map_err(|e| VaultError::Serialization(format!("face entry: {e}")))
    }

    /// Parse a record payload back into an entry.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| VaultError::Serialization(format!("face entry: {e}")))
    }

    fn validate(&self) -> Result<()> {
        validate_record_id(&self.name)?;
        if self.vector.is_empty() {
            return Err(VaultError::InvalidRecordId(format!(
                "face '{}' has an empty feature vector",
                self.name
            )));
        }
        if self.vector.iter().any(|v| !v.is_finite()) {
            return Err(VaultError::InvalidRecordId(format!(
                "face '{}' has a non-finite feature value",
                self.name
            )));
        }
        Ok(())
    }
}
