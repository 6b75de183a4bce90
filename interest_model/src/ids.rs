//! Identifiers for genomes and dream sessions.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::{Builder, Uuid};

/// Unique identifier for a strategy genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenomeId(pub Uuid);

impl GenomeId {
    /// Create a new random genome ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a genome ID from the bytes of the given random source.
    ///
    /// Seeded sources yield reproducible identities.
    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(random_uuid(rng))
    }

    /// Create a nil/empty genome ID.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for GenomeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GenomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a dream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DreamSessionId(pub Uuid);

impl DreamSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(random_uuid(rng))
    }
}

impl Default for DreamSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DreamSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn random_uuid<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    Builder::from_random_bytes(bytes).into_uuid()
}
