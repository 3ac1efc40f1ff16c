use std::{
    collections::BTreeMap,
    fs::read_to_string,
    path::{Path, PathBuf},
};

use crate::{
    codec::{RawDocument, CODECS},
    error::AsdError,
    paths::{string_to_os_path, AnchorPath},
};

/// Supplies parsed profile documents by file id.
///
/// File ids are `/`-separated and relative to whatever root the loader serves. Loading is a
/// blocking call.
pub trait DocumentLoader {
    fn load(&self, file: &str) -> Result<RawDocument, AsdError>;
}

/// Loads profile files from disk, relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsLoader { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentLoader for FsLoader {
    fn load(&self, file: &str) -> Result<RawDocument, AsdError> {
        let anchor_path = AnchorPath::from(file);
        let normalized = anchor_path.normalize();
        if anchor_path.is_url()
            || anchor_path.is_absolute()
            || normalized == ".."
            || normalized.starts_with("../")
        {
            return Err(AsdError::Io(format!(
                "profile file '{file}' is outside loader root {:?}",
                self.root
            )));
        }
        let path = self.root.join(string_to_os_path(&normalized));
        tracing::debug!("[FsLoader::load] Reading {:?}", path);
        let content = read_to_string(&path).map_err(|err| match AsdError::from(err) {
            AsdError::NotFound(_) => AsdError::NotFound(format!("profile file {path:?}")),
            other => other,
        })?;
        CODECS.parse(file, &content)
    }
}

/// Serves profile documents from memory. Useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: BTreeMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        MemoryLoader::default()
    }

    pub fn with_document(mut self, file: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(file, content);
        self
    }

    pub fn insert(&mut self, file: impl Into<String>, content: impl Into<String>) {
        self.documents.insert(file.into(), content.into());
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, file: &str) -> Result<RawDocument, AsdError> {
        let content = self
            .documents
            .get(file)
            .ok_or_else(|| AsdError::NotFound(format!("profile file '{file}'")))?;
        CODECS.parse(file, content)
    }
}
