use crate::{
    codec::{RawDescriptor, RawDocument},
    config::AsdConfig,
    error::AsdError,
    graph::{
        registry::{ReferenceRegistry, ReferenceRole},
        store::InstanceStore,
    },
    properties::{LinkRelation, ProfileMetadata},
};

/// One document after the Scanning stage: its flattened definitions and the references it
/// makes, none of them resolved yet.
#[derive(Debug, Clone)]
pub(crate) struct ScannedDocument {
    pub file: String,
    pub metadata: ProfileMetadata,
    pub store: InstanceStore,
    pub registry: ReferenceRegistry,
}

pub(crate) fn scan_document(
    file: &str,
    document: RawDocument,
    config: &AsdConfig,
) -> Result<ScannedDocument, AsdError> {
    let links = document
        .links
        .iter()
        .map(LinkRelation::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let metadata = ProfileMetadata {
        schema: document.schema,
        title: document.title,
        doc: document.doc,
        links,
    };
    let mut store = InstanceStore::new(file);
    let mut registry = ReferenceRegistry::default();
    scan_descriptors(
        file,
        &document.descriptors,
        &mut store,
        &mut registry,
        config,
        0,
    )?;
    tracing::debug!(
        "[scan_document] {}: {} instances, {} pending references",
        file,
        store.len(),
        registry.len()
    );
    Ok(ScannedDocument {
        file: file.to_string(),
        metadata,
        store,
        registry,
    })
}

/// Flatten a descriptor list into `store`, registering every reference into `registry`.
///
/// Nodes with an id are stored and their nested lists walked. Nodes without one must carry an
/// `href`. The `rt` of a transition node is registered regardless of the node form; blank ones
/// and those on semantic nodes are not.
fn scan_descriptors(
    file: &str,
    descriptors: &[RawDescriptor],
    store: &mut InstanceStore,
    registry: &mut ReferenceRegistry,
    config: &AsdConfig,
    depth: usize,
) -> Result<(), AsdError> {
    if depth > config.max_nesting_depth {
        return Err(AsdError::InvalidDescriptor(format!(
            "descriptor nesting in {file} exceeds the configured maximum depth of {}",
            config.max_nesting_depth
        )));
    }
    for raw in descriptors {
        if let Some(rt) = raw.transition_target() {
            registry.register(file, rt, ReferenceRole::Transition);
        }

        if raw.is_definition() {
            store.merge(raw.clone(), config.conflict_policy)?;
            scan_descriptors(
                file,
                &raw.descriptor,
                store,
                registry,
                config,
                depth + 1,
            )?;
            continue;
        }

        if let Some(href) = &raw.href {
            registry.register(file, href, ReferenceRole::Alias);
            continue;
        }

        return Err(AsdError::InvalidDescriptor(raw.describe()));
    }
    Ok(())
}
