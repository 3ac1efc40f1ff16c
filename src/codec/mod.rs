//! Profile document parsing.
//!
//! This module turns profile source text into the untyped [`RawDocument`] tree consumed by the
//! graph pipeline. The core never parses the wire format itself; it only goes through a
//! [`DocumentLoader`].
//!
//! ## Key Components
//!
//! - [`ProfileCodec`] trait - implement to support another profile serialization
//! - [`CodecMap`] - registry of codecs keyed by file extension (accessible via [`CODECS`])
//! - [`DocumentLoader`] trait - supplies parsed documents by file id ([`FsLoader`],
//!   [`MemoryLoader`])
//!
//! ## Built-in Codecs
//!
//! - **JSON** (`.json`) - via [`JsonCodec`]
//! - **YAML** (`.yaml`, `.yml`) - via [`YamlCodec`]
//!
//! Register custom codecs via [`CodecMap::insert`]:
//!
//! ```rust
//! use asd_core::{codec::{CODECS, ProfileCodec, RawDocument}, AsdError};
//!
//! #[derive(Default)]
//! struct EmptyCodec;
//!
//! impl ProfileCodec for EmptyCodec {
//!     fn parse(&self, _content: &str) -> Result<RawDocument, AsdError> {
//!         Ok(RawDocument::default())
//!     }
//! }
//! CODECS.insert::<EmptyCodec>("empty".to_string());
//! assert!(CODECS.get("empty").is_some());
//! ```

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::{error::AsdError, paths::AnchorPath};

pub mod loader;
pub mod profile_ir;

pub use loader::{DocumentLoader, FsLoader, MemoryLoader};
pub use profile_ir::{RawDescriptor, RawDocument, RawLink};

use profile_ir::AlpsEnvelope;

/// Global singleton codec map with builtin codecs (json, yaml, yml)
pub static CODECS: Lazy<CodecMap> = Lazy::new(CodecMap::create);

pub trait ProfileCodec: Send + Sync {
    fn parse(&self, content: &str) -> Result<RawDocument, AsdError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl ProfileCodec for JsonCodec {
    fn parse(&self, content: &str) -> Result<RawDocument, AsdError> {
        let envelope: AlpsEnvelope = serde_json::from_str(content)?;
        Ok(envelope.into())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct YamlCodec;

impl ProfileCodec for YamlCodec {
    fn parse(&self, content: &str) -> Result<RawDocument, AsdError> {
        let envelope: AlpsEnvelope = serde_yaml::from_str(content)?;
        Ok(envelope.into())
    }
}

/// Extension → codec table, shared between clones.
#[allow(clippy::type_complexity)]
pub struct CodecMap(Arc<RwLock<Vec<(String, Arc<dyn ProfileCodec>)>>>);

impl Clone for CodecMap {
    fn clone(&self) -> Self {
        CodecMap(self.0.clone())
    }
}

impl CodecMap {
    pub fn create() -> Self {
        CodecMap(Arc::new(RwLock::new(vec![
            ("json".to_string(), Arc::new(JsonCodec) as Arc<dyn ProfileCodec>),
            ("yaml".to_string(), Arc::new(YamlCodec) as Arc<dyn ProfileCodec>),
            ("yml".to_string(), Arc::new(YamlCodec) as Arc<dyn ProfileCodec>),
        ])))
    }

    pub fn insert<T: ProfileCodec + Default + 'static>(&self, extension: String) {
        let mut writer = self.0.write();
        if let Some(entry) = writer.iter_mut().find(|(ext, _)| ext == &extension) {
            tracing::debug!("[CodecMap::insert] Replacing codec for '.{}'", extension);
            entry.1 = Arc::new(T::default());
        } else {
            let codec: Arc<dyn ProfileCodec> = Arc::new(T::default());
            writer.push((extension, codec));
        }
    }

    pub fn get(&self, ext: &str) -> Option<Arc<dyn ProfileCodec>> {
        self.0
            .read()
            .iter()
            .find(|(codec_ext, _value)| ext == codec_ext)
            .map(|(_codec_ext, value)| value.clone())
    }

    pub fn extensions(&self) -> Vec<String> {
        self.0
            .read()
            .iter()
            .map(|(codec_ext, _value)| codec_ext.clone())
            .collect::<Vec<String>>()
    }

    /// Parse `content` with the codec registered for the extension of `file`.
    pub fn parse(&self, file: &str, content: &str) -> Result<RawDocument, AsdError> {
        let ext = AnchorPath::from(file).ext().to_lowercase();
        let codec = self.get(&ext).ok_or_else(|| {
            AsdError::Codec(format!(
                "No profile codec registered for '{file}' (extension '{ext}'). Known \
                extensions: {:?}",
                self.extensions()
            ))
        })?;
        codec.parse(content)
    }
}
