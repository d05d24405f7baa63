use serde::{Deserialize, Serialize};

use crate::EngineError;

/// The simulation backend driving a universe. Backends differ in how many
/// cell states they support, which matters when switching: states above the
/// new backend's maximum are clipped to it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Straightforward array-based stepping, up to 256 states.
    #[default]
    Quick,
    /// Hashed quadtree stepping, two states only but supports the compact
    /// on-disk snapshot format.
    Hash,
}

impl Algorithm {
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownAlgorithm`] for unrecognized names.
    pub fn from_name(name: &str) -> Result<Algorithm, EngineError> {
        match name {
            "Quick" => Ok(Algorithm::Quick),
            "Hash" => Ok(Algorithm::Hash),
            other => Err(EngineError::UnknownAlgorithm(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Quick => "Quick",
            Algorithm::Hash => "Hash",
        }
    }

    /// Highest legal cell state value for this backend.
    pub fn max_state(&self) -> u8 {
        match self {
            Algorithm::Quick => 255,
            Algorithm::Hash => 1,
        }
    }

    pub fn supports_compact(&self) -> bool {
        matches!(self, Algorithm::Hash)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
