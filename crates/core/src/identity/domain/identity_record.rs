use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentityError {
    #[error("identity name must not be empty")]
    EmptyName,
    #[error("embedding must not be empty")]
    EmptyEmbedding,
    #[error("embedding contains a non-finite value at position {0}")]
    NonFiniteEmbedding(usize),
    #[error("embedding has zero norm")]
    ZeroNorm,
}

/// An enrolled face: operator-chosen name plus the embedding captured for it.
///
/// Names are not unique; re-enrolling a name adds another record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    name: String,
    embedding: Vec<f32>,
}

impl IdentityRecord {
    pub fn new(name: impl Into<String>, embedding: Vec<f32>) -> Result<Self, IdentityError> {
        let record = Self {
            name: name.into().trim().to_string(),
            embedding,
        };
        record.validate()?;
        Ok(record)
    }

    /// Checks the shape invariants. Records read from disk bypass [`IdentityRecord::new`],
    /// so stores call this after deserializing.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.name.trim().is_empty() {
            return Err(IdentityError::EmptyName);
        }
        if self.embedding.is_empty() {
            return Err(IdentityError::EmptyEmbedding);
        }
        if let Some(pos) = self.embedding.iter().position(|v| !v.is_finite()) {
            return Err(IdentityError::NonFiniteEmbedding(pos));
        }
        if self.embedding.iter().all(|v| *v == 0.0) {
            return Err(IdentityError::ZeroNorm);
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}
