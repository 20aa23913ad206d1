//! Artifact Cache
//!
//! Filesystem-backed idempotency check: a target path counts as already produced
//! when a file exists there and is larger than a minimum size. The size floor
//! separates real rendered assets from truncated or error placeholder files.
//! There is no content hashing.

use std::path::Path;
use tracing::debug;

/// Default size floor in bytes
pub const DEFAULT_MIN_ARTIFACT_BYTES: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactCache {
    min_bytes: u64,
}

impl ArtifactCache {
    pub fn new(min_bytes: u64) -> Self {
        Self { min_bytes }
    }

    pub fn min_bytes(&self) -> u64 {
        self.min_bytes
    }

    /// True iff a regular file exists at `path` and its size exceeds the floor.
    /// Read-only; any metadata error is a miss.
    pub fn is_hit(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {
                let hit = meta.len() > self.min_bytes;
                debug!(
                    path = %path.display(),
                    size = meta.len(),
                    min_bytes = self.min_bytes,
                    hit,
                    "Artifact cache lookup"
                );
                hit
            }
            _ => false,
        }
    }
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ARTIFACT_BYTES)
    }
}
