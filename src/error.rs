//! Error types
//!
//! Runtime combat conditions (cooldowns, dead targets, missed lookups) are
//! never errors. Only broken configuration data fails, and it fails fast.

use thiserror::Error;

/// Configuration or catalog data is invalid
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown bot class: {0}")]
    UnknownClass(String),

    #[error("class {class_id} is not unlocked for player {player}")]
    ClassLocked { player: u32, class_id: String },

    #[error("duplicate {kind} id in catalog: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("upgrade {id} requires unknown upgrade {prerequisite}")]
    MissingPrerequisite { id: String, prerequisite: String },

    #[error("upgrade {id} breaks the {category} chain: {reason}")]
    BrokenChain {
        id: String,
        category: String,
        reason: String,
    },

    #[error("invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = ConfigurationError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<u32>("\"x\"").unwrap_err()
    }

    #[test]
    fn test_serialize_and_parse_messages_differ() {
        let write = ConfigurationError::Serialize {
            what: "settings",
            source: json_error(),
        };
        let read = ConfigurationError::Parse {
            what: "settings",
            source: json_error(),
        };
        assert!(write.to_string().starts_with("failed to serialize settings"));
        assert!(read.to_string().starts_with("failed to parse settings"));
        assert!(std::error::Error::source(&write).is_some());
    }
}
