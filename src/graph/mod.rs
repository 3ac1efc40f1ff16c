//! Profile graph construction.
//!
//! A [ProfileGraph] is built in strictly sequential stages:
//!
//! 1. **Scanning** - the root document is loaded and its descriptor tree flattened into an
//!    [InstanceStore]. Every `href` and `rt` is recorded in a [ReferenceRegistry].
//! 2. **Resolving** - pending references are resolved. References into other files load those
//!    files (once per build) and merge the referenced descriptors, plus everything they need,
//!    into the store.
//! 3. **Typing** - instances are sorted for display and converted by the [DescriptorFactory].
//! 4. **Linking** - the [TransitionLinker] builds the transition edge set and the state links,
//!    then the [TagIndex] is derived.
//!
//! Only a [GraphState::Finalized] graph answers reads. A failed stage leaves the graph in
//! [GraphState::Failed]; [ProfileGraph::build] never hands such a graph out.
//!
//! ```rust
//! use asd_core::{codec::MemoryLoader, graph::ProfileGraph};
//!
//! let loader = MemoryLoader::new().with_document(
//!     "todo.json",
//!     r##"{"alps": {"descriptor": [
//!         {"id": "home"},
//!         {"id": "listItems", "type": "safe", "rt": "#home"}
//!     ]}}"##,
//! );
//! let graph = ProfileGraph::build("todo.json", &loader).unwrap();
//! assert_eq!(graph.descriptors().unwrap().len(), 2);
//! assert_eq!(graph.transitions().unwrap().len(), 1);
//! ```

use std::{
    collections::{BTreeSet, VecDeque},
    fmt::{Display, Formatter},
    path::Path,
    rc::Rc,
};

use serde::{Deserialize, Serialize};

use crate::{
    codec::{DocumentLoader, FsLoader, RawDescriptor},
    config::AsdConfig,
    error::AsdError,
    paths::{os_path_to_string, AnchorPath},
    properties::{reference_id, Descriptor, DescriptorRef, ProfileMetadata},
};

pub mod descriptor_map;
pub mod factory;
pub mod linker;
pub mod registry;
mod scan;
pub mod store;
pub mod tags;


pub use descriptor_map::DescriptorMap;
pub use factory::DescriptorFactory;
pub use linker::{StateDiagram, StateLink, TransitionEdge, TransitionLinker};
pub use registry::{ReferenceRegistry, ReferenceRole, ReferenceTarget, ResolutionChain, Resolver};
pub use store::InstanceStore;
pub use tags::TagIndex;

use scan::{scan_document, ScannedDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphState {
    Uninitialized,
    Scanning,
    Resolving,
    Typing,
    Linking,
    Finalized,
    /// A stage returned an error. No further stage can run.
    Failed,
}

impl Display for GraphState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GraphState::Uninitialized => "uninitialized",
            GraphState::Scanning => "scanning",
            GraphState::Resolving => "resolving",
            GraphState::Typing => "typing",
            GraphState::Linking => "linking",
            GraphState::Finalized => "finalized",
            GraphState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// The merged, typed descriptor graph of one root profile document.
#[derive(Debug, Clone)]
pub struct ProfileGraph {
    file: String,
    config: AsdConfig,
    state: GraphState,
    metadata: ProfileMetadata,
    root: Option<ScannedDocument>,
    store: InstanceStore,
    registry: ReferenceRegistry,
    descriptors: DescriptorMap,
    tags: TagIndex,
    transitions: BTreeSet<TransitionEdge>,
    state_links: BTreeSet<StateLink>,
}

impl ProfileGraph {
    /// An empty graph for the root document `file`. Run the stages in order, or use
    /// [ProfileGraph::build].
    pub fn new(file: &str, config: AsdConfig) -> Self {
        let file = AnchorPath::from(file).normalize();
        ProfileGraph {
            store: InstanceStore::new(file.clone()),
            file,
            config,
            state: GraphState::Uninitialized,
            metadata: ProfileMetadata::default(),
            root: None,
            registry: ReferenceRegistry::default(),
            descriptors: DescriptorMap::default(),
            tags: TagIndex::default(),
            transitions: BTreeSet::new(),
            state_links: BTreeSet::new(),
        }
    }

    /// Build and finalize the graph rooted at `file` with the default [AsdConfig].
    pub fn build<L: DocumentLoader + ?Sized>(file: &str, loader: &L) -> Result<Self, AsdError> {
        ProfileGraph::build_with_config(file, loader, AsdConfig::default())
    }

    #[tracing::instrument(skip(loader, config))]
    pub fn build_with_config<L: DocumentLoader + ?Sized>(
        file: &str,
        loader: &L,
        config: AsdConfig,
    ) -> Result<Self, AsdError> {
        let mut graph = ProfileGraph::new(file, config);
        graph.scan(loader)?;
        graph.resolve(loader)?;
        graph.type_descriptors()?;
        graph.link()?;
        Ok(graph)
    }

    /// Build the graph of the profile file at `path`, resolving references relative to its
    /// directory on disk.
    #[tracing::instrument(skip_all, fields(path = ?path.as_ref()))]
    pub fn from_path<P: AsRef<Path>>(path: P, config: AsdConfig) -> Result<Self, AsdError> {
        let path = path.as_ref();
        let file = path
            .file_name()
            .map(os_path_to_string)
            .ok_or_else(|| AsdError::NotFound(format!("no profile file name in {path:?}")))?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        let loader = FsLoader::new(root);
        ProfileGraph::build_with_config(&file, &loader, config)
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn config(&self) -> &AsdConfig {
        &self.config
    }

    fn enter(&mut self, expected: GraphState, next: GraphState) -> Result<(), AsdError> {
        if self.state != expected {
            return Err(AsdError::StageOutOfOrder {
                expected,
                found: self.state,
            });
        }
        self.state = next;
        Ok(())
    }

    fn settle<T>(&mut self, result: Result<T, AsdError>) -> Result<T, AsdError> {
        if let Err(err) = &result {
            tracing::debug!(
                "[ProfileGraph] {} failed while {}: {}",
                self.file,
                self.state,
                err
            );
            self.state = GraphState::Failed;
        }
        result
    }

    /// Scanning stage: load the root document, flatten it and register its references.
    pub fn scan<L: DocumentLoader + ?Sized>(&mut self, loader: &L) -> Result<(), AsdError> {
        self.enter(GraphState::Uninitialized, GraphState::Scanning)?;
        let result = loader
            .load(&self.file)
            .and_then(|raw| scan_document(&self.file, raw, &self.config));
        let scanned = self.settle(result)?;
        self.metadata = scanned.metadata.clone();
        self.store = scanned.store.clone();
        self.registry = scanned.registry.clone();
        tracing::debug!(
            "[ProfileGraph::scan] {}: {} instances, {} references",
            self.file,
            self.store.len(),
            self.registry.len()
        );
        self.root = Some(scanned);
        Ok(())
    }

    /// Resolving stage: satisfy every registered reference, loading other documents as needed.
    pub fn resolve<L: DocumentLoader + ?Sized>(&mut self, loader: &L) -> Result<(), AsdError> {
        self.enter(GraphState::Scanning, GraphState::Resolving)?;
        let registry = std::mem::take(&mut self.registry);
        let mut resolver = Resolver::new(loader, &self.config);
        if let Some(root) = self.root.take() {
            resolver.insert_document(Rc::new(root));
        }
        let result = registry.resolve_all(&mut self.store, &mut resolver);
        let loaded = resolver.loaded_documents();
        let merged = self.settle(result)?;
        tracing::debug!(
            "[ProfileGraph::resolve] {}: merged {} instances from {} documents",
            self.file,
            merged,
            loaded
        );
        Ok(())
    }

    /// Typing stage: sort the merged instances for display and create typed descriptors.
    pub fn type_descriptors(&mut self) -> Result<(), AsdError> {
        self.enter(GraphState::Resolving, GraphState::Typing)?;
        let result = self
            .store
            .sorted()
            .into_iter()
            .map(DescriptorFactory::create)
            .collect::<Result<Vec<_>, _>>();
        let typed = self.settle(result)?;
        self.descriptors = DescriptorMap::from_descriptors(typed);
        Ok(())
    }

    /// Linking stage: build transition edges, state links and the tag index, then finalize.
    pub fn link(&mut self) -> Result<(), AsdError> {
        self.enter(GraphState::Typing, GraphState::Linking)?;
        let result = TransitionLinker::link(&self.descriptors).and_then(|edges| {
            TransitionLinker::state_links(&self.descriptors).map(|links| (edges, links))
        });
        let (transitions, state_links) = self.settle(result)?;
        self.transitions = transitions;
        self.state_links = state_links;
        self.tags = TagIndex::build(self.descriptors.iter());
        self.state = GraphState::Finalized;
        tracing::info!(
            "[ProfileGraph::link] Finalized {}: {} descriptors, {} transitions, {} tags",
            self.file,
            self.descriptors.len(),
            self.transitions.len(),
            self.tags.len()
        );
        Ok(())
    }

    fn ready(&self) -> Result<(), AsdError> {
        match self.state {
            GraphState::Finalized => Ok(()),
            state => Err(AsdError::GraphNotReady(state)),
        }
    }

    /// All descriptors, ordered by case-insensitive id then kind.
    pub fn descriptors(&self) -> Result<&[Descriptor], AsdError> {
        self.ready()?;
        Ok(self.descriptors.as_slice())
    }

    pub fn descriptor_map(&self) -> Result<&DescriptorMap, AsdError> {
        self.ready()?;
        Ok(&self.descriptors)
    }

    pub fn tags(&self) -> Result<&TagIndex, AsdError> {
        self.ready()?;
        Ok(&self.tags)
    }

    pub fn transitions(&self) -> Result<&BTreeSet<TransitionEdge>, AsdError> {
        self.ready()?;
        Ok(&self.transitions)
    }

    pub fn lookup(&self, id: &str) -> Result<&Descriptor, AsdError> {
        self.ready()?;
        self.descriptors.get(id)
    }

    pub fn metadata(&self) -> Result<&ProfileMetadata, AsdError> {
        self.ready()?;
        Ok(&self.metadata)
    }

    pub fn state_links(&self) -> Result<&BTreeSet<StateLink>, AsdError> {
        self.ready()?;
        Ok(&self.state_links)
    }

    pub fn state_diagram(&self) -> Result<StateDiagram, AsdError> {
        self.ready()?;
        Ok(StateDiagram::from_links(&self.state_links))
    }

    /// The descriptors nested directly under `id`, in sibling order. Aliases resolve to their
    /// targets, carrying the alias title when one is given.
    pub fn nested(&self, id: &str) -> Result<Vec<Descriptor>, AsdError> {
        self.ready()?;
        let parent = self.descriptors.get(id)?;
        let mut nested = parent
            .nested()
            .iter()
            .map(|entry| {
                let mut child = self.descriptors.get(entry.target_id())?.clone();
                if let DescriptorRef::Alias {
                    title: Some(title), ..
                } = entry
                {
                    child.core_mut().title = Some(title.clone());
                }
                Ok(child)
            })
            .collect::<Result<Vec<_>, AsdError>>()?;
        nested.sort_by(|a, b| a.sibling_cmp(b));
        Ok(nested)
    }

    /// The raw sub-tree of `id`: the descriptor, everything nested in it and the sub-trees of
    /// transition targets, each instance once.
    pub fn export(&self, id: &str) -> Result<Vec<RawDescriptor>, AsdError> {
        self.ready()?;
        self.store.get(id)?;
        let mut visited = BTreeSet::new();
        let mut exported = Vec::new();
        let mut queue = VecDeque::from([id.to_string()]);
        while let Some(next) = queue.pop_front() {
            if !visited.insert(next.clone()) {
                continue;
            }
            let instance = self.store.get(&next)?;
            for child in &instance.descriptor {
                let target = child
                    .id
                    .as_deref()
                    .or(child.href.as_deref().map(reference_id));
                queue.extend(target.map(str::to_string));
                queue.extend(child.transition_target().map(reference_id).map(str::to_string));
            }
            queue.extend(
                instance
                    .transition_target()
                    .map(reference_id)
                    .map(str::to_string),
            );
            exported.push(instance.clone());
        }
        Ok(exported)
    }
}
