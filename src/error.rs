use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use serde_yaml::Error as YamlError;
use thiserror::Error;

use crate::graph::GraphState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum AsdError {
    #[error("Descriptor '{id}' was defined twice with conflicting content (scope: {scope})")]
    ConflictingDescriptor { id: String, scope: String },
    #[error("Descriptor not found: {0}")]
    DescriptorNotFound(String),
    #[error("Unresolved reference '{target}' in {origin}")]
    UnresolvedReference { origin: String, target: String },
    #[error("Cyclic reference: {}", chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },
    #[error("Unknown descriptor kind '{kind}' on descriptor '{id}'")]
    UnknownDescriptorKind { id: String, kind: String },
    #[error("Transition '{id}' targets '{rt}', which is not a semantic descriptor")]
    DanglingTransitionTarget { id: String, rt: String },
    #[error("Profile graph is not finalized (current state: {0})")]
    GraphNotReady(GraphState),
    #[error("Pipeline stage out of order: expected state {expected}, found {found}")]
    StageOutOfOrder {
        expected: GraphState,
        found: GraphState,
    },
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("Invalid link relation: {0}")]
    InvalidLinkRelation(String),
    #[error("Profile codec error: {0}")]
    Codec(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl AsdError {
    /// Structural errors mean the document set cannot be merged into a consistent graph. They
    /// always abort construction.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            AsdError::CyclicReference { .. }
                | AsdError::UnknownDescriptorKind { .. }
                | AsdError::DanglingTransitionTarget { .. }
                | AsdError::UnresolvedReference { .. }
                | AsdError::InvalidDescriptor(_)
                | AsdError::InvalidLinkRelation(_)
        )
    }

    /// Errors caused by the calling code rather than by document content.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            AsdError::GraphNotReady(_) | AsdError::StageOutOfOrder { .. }
        )
    }
}

impl From<toml::de::Error> for AsdError {
    fn from(src: toml::de::Error) -> AsdError {
        AsdError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for AsdError {
    fn from(src: toml::ser::Error) -> AsdError {
        AsdError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for AsdError {
    fn from(src: JsonError) -> AsdError {
        AsdError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<YamlError> for AsdError {
    fn from(src: YamlError) -> AsdError {
        AsdError::Serialization(format!("YAML (de)serialization error: {src}"))
    }
}

impl From<io::Error> for AsdError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => AsdError::NotFound(format!("{x}")),
            _ => AsdError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_classification() {
        let cyclic = AsdError::CyclicReference {
            chain: vec!["a.json#x".to_string(), "b.json#y".to_string()],
        };
        assert!(cyclic.is_structural());
        assert_eq!(cyclic.to_string(), "Cyclic reference: a.json#x -> b.json#y");

        let conflict = AsdError::ConflictingDescriptor {
            id: "home".to_string(),
            scope: "profile.json".to_string(),
        };
        assert!(!conflict.is_structural());
        assert!(!AsdError::DescriptorNotFound("x".to_string()).is_structural());

        let not_ready = AsdError::GraphNotReady(GraphState::Scanning);
        assert!(not_ready.is_misuse());
        assert!(!not_ready.is_structural());
    }

    #[test]
    fn test_io_error_mapping() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(matches!(AsdError::from(missing), AsdError::NotFound(_)));
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(AsdError::from(denied), AsdError::Io(_)));
    }
}
