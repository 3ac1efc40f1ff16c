//! Shared test utilities for profile graph testing

use crate::codec::MemoryLoader;

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A small to-do profile: one state and one safe transition back to it.
pub const TODO_PROFILE: &str = r##"{
    "$schema": "https://alps-io.github.io/schemas/alps.json",
    "alps": {
        "title": "ToDo",
        "doc": {"value": "A minimal to-do list", "format": "text"},
        "link": {"href": "https://example.com/todo/help", "rel": "help"},
        "descriptor": [
            {"id": "home", "title": "Home", "tag": "nav"},
            {"id": "listItems", "type": "safe", "rt": "#home", "tag": "nav read"}
        ]
    }
}"##;

/// Build a [MemoryLoader] serving `documents` as `(file id, content)` pairs.
pub fn loader_with(documents: &[(&str, &str)]) -> MemoryLoader {
    init_logging();
    documents
        .iter()
        .fold(MemoryLoader::new(), |loader, (file, content)| {
            loader.with_document(*file, *content)
        })
}

/// Wrap a JSON descriptor list in an ALPS envelope.
pub fn profile(descriptors: serde_json::Value) -> String {
    serde_json::json!({ "alps": { "descriptor": descriptors } }).to_string()
}
