//! Pending reference tracking and cross-document resolution.
//!
//! While a document is scanned, every `href` alias and every `rt` transition target is recorded
//! in a [ReferenceRegistry] as an `(origin file, specifier)` pair. The Resolving stage consumes
//! the registry. References into the origin document itself are satisfied by the local
//! [InstanceStore]. References into another file make the [Resolver] load and scan that file,
//! then export the requested descriptor with everything it transitively needs.
//!
//! Cycle detection runs on a [ResolutionChain] passed by value down each resolution path, so
//! independent branches of one build never see each other's state.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter},
    iter::once,
    rc::Rc,
};

use crate::{
    codec::{DocumentLoader, RawDescriptor},
    config::AsdConfig,
    error::AsdError,
    graph::{
        scan::{scan_document, ScannedDocument},
        store::InstanceStore,
    },
    paths::AnchorPath,
};

/// How a reference was written, which decides what a missing same-file target means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReferenceRole {
    /// An `href` standing in for a descriptor. Must resolve.
    Alias,
    /// An `rt` transition target. A missing same-file target is reported by the
    /// [TransitionLinker](crate::graph::linker::TransitionLinker).
    Transition,
}

/// A parsed reference specifier: the normalized file that holds the target and the target id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReferenceTarget {
    pub file: String,
    pub id: String,
}

impl ReferenceTarget {
    /// Parse `specifier` (`id`, `#id` or `file#id`) as written in `origin`.
    ///
    /// Relative files resolve against the directory of `origin`.
    pub fn parse(origin: &str, specifier: &str) -> Result<Self, AsdError> {
        let origin_path = AnchorPath::from(origin);
        let spec = AnchorPath::from(specifier);
        let (file, id) = if !spec.has_anchor() {
            (origin_path.normalize(), specifier)
        } else if spec.filepath().is_empty() {
            (origin_path.normalize(), spec.anchor())
        } else {
            (origin_path.join(spec.filepath()), spec.anchor())
        };
        if id.is_empty() {
            return Err(AsdError::UnresolvedReference {
                origin: origin.to_string(),
                target: specifier.to_string(),
            });
        }
        Ok(ReferenceTarget {
            file,
            id: id.to_string(),
        })
    }

    pub fn is_local_to(&self, file: &str) -> bool {
        self.file == AnchorPath::from(file).normalize()
    }
}

impl Display for ReferenceTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.file, self.id)
    }
}

/// The `(file, id)` targets currently being exported along one resolution path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionChain(Vec<ReferenceTarget>);

impl ResolutionChain {
    pub fn contains(&self, target: &ReferenceTarget) -> bool {
        self.0.contains(target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceTarget> + '_ {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of this chain with `target` appended.
    ///
    /// Fails with [AsdError::CyclicReference] if `target` is already on the chain, or if the
    /// chain would grow past `max_depth`.
    pub fn extended(
        &self,
        target: &ReferenceTarget,
        max_depth: usize,
    ) -> Result<ResolutionChain, AsdError> {
        if self.contains(target) || self.0.len() >= max_depth {
            return Err(AsdError::CyclicReference {
                chain: self
                    .0
                    .iter()
                    .chain(once(target))
                    .map(|t| t.to_string())
                    .collect(),
            });
        }
        let mut next = self.clone();
        next.0.push(target.clone());
        Ok(next)
    }
}

/// Pending `(origin file, specifier)` references of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceRegistry {
    pending: BTreeMap<(String, String), ReferenceRole>,
}

impl ReferenceRegistry {
    /// Record a reference. Registering the same pair again does nothing, except that an alias
    /// registration takes precedence over a transition one.
    pub fn register(&mut self, origin: &str, specifier: &str, role: ReferenceRole) {
        self.pending
            .entry((origin.to_string(), specifier.to_string()))
            .and_modify(|existing| *existing = (*existing).min(role))
            .or_insert(role);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, ReferenceRole)> + '_ {
        self.pending
            .iter()
            .map(|((origin, specifier), role)| (origin.as_str(), specifier.as_str(), *role))
    }

    /// Resolve every pending reference, merging cross-file targets into `store`.
    ///
    /// Consumes the registry. Returns the number of instances newly merged into `store`.
    pub fn resolve_all<L: DocumentLoader + ?Sized>(
        self,
        store: &mut InstanceStore,
        resolver: &mut Resolver<'_, L>,
    ) -> Result<usize, AsdError> {
        let chain = ResolutionChain::default();
        let mut merged = 0;
        for ((origin, specifier), role) in self.pending {
            let target = ReferenceTarget::parse(&origin, &specifier)?;
            if target.is_local_to(&origin) {
                if store.contains(&target.id) {
                    continue;
                }
                match role {
                    ReferenceRole::Alias => {
                        return Err(AsdError::UnresolvedReference {
                            origin,
                            target: specifier,
                        });
                    }
                    ReferenceRole::Transition => {
                        tracing::debug!(
                            "[ReferenceRegistry::resolve_all] Transition target '{}' in {} is not \
                            defined locally; leaving it to the linker",
                            specifier,
                            origin
                        );
                        continue;
                    }
                }
            }
            for instance in resolver.export(&target, &chain)? {
                if store.merge(instance, resolver.config.conflict_policy)? {
                    merged += 1;
                }
            }
        }
        Ok(merged)
    }
}

/// A finished export, shared by every path that requests the same target.
#[derive(Debug)]
struct CompletedExport {
    instances: Vec<RawDescriptor>,
    /// Length of the longest resolution chain the export needed, this target included.
    depth: usize,
}

/// Accumulator for one export in progress.
struct ExportState {
    exported: InstanceStore,
    visited: BTreeSet<String>,
    depth: usize,
}

/// Loads, scans and exports referenced documents for one top-level build.
///
/// Scanned documents and completed exports are cached for the lifetime of the resolver, so each
/// file is parsed at most once and each `(file, id)` exported at most once per build.
pub struct Resolver<'a, L: DocumentLoader + ?Sized> {
    loader: &'a L,
    config: &'a AsdConfig,
    documents: BTreeMap<String, Rc<ScannedDocument>>,
    exports: BTreeMap<ReferenceTarget, Rc<CompletedExport>>,
}

impl<'a, L: DocumentLoader + ?Sized> Resolver<'a, L> {
    pub fn new(loader: &'a L, config: &'a AsdConfig) -> Self {
        Resolver {
            loader,
            config,
            documents: BTreeMap::new(),
            exports: BTreeMap::new(),
        }
    }

    /// Seed the cache with an already scanned document.
    pub(crate) fn insert_document(&mut self, document: Rc<ScannedDocument>) {
        self.documents.insert(document.file.clone(), document);
    }

    /// Number of distinct documents loaded so far.
    pub fn loaded_documents(&self) -> usize {
        self.documents.len()
    }

    /// Number of distinct `(file, id)` targets exported so far.
    pub fn completed_exports(&self) -> usize {
        self.exports.len()
    }

    fn document(&mut self, file: &str) -> Result<Rc<ScannedDocument>, AsdError> {
        if let Some(document) = self.documents.get(file) {
            return Ok(document.clone());
        }
        tracing::debug!("[Resolver::document] Loading {}", file);
        let raw = self.loader.load(file)?;
        let scanned = Rc::new(scan_document(file, raw, self.config)?);
        self.documents.insert(file.to_string(), scanned.clone());
        Ok(scanned)
    }

    /// The raw instances `target` needs: the descriptor itself, its nested definitions and
    /// aliases, and its transition target, followed recursively and across files.
    pub fn export(
        &mut self,
        target: &ReferenceTarget,
        chain: &ResolutionChain,
    ) -> Result<Vec<RawDescriptor>, AsdError> {
        Ok(self.export_shared(target, chain)?.instances.clone())
    }

    fn export_shared(
        &mut self,
        target: &ReferenceTarget,
        chain: &ResolutionChain,
    ) -> Result<Rc<CompletedExport>, AsdError> {
        let max_depth = self.config.max_nesting_depth;
        let chain = chain.extended(target, max_depth)?;
        if let Some(done) = self.exports.get(target) {
            // The cached walk found no cycle below `target`; only the depth depends on the path.
            if chain.len() - 1 + done.depth > max_depth {
                return Err(AsdError::CyclicReference {
                    chain: chain.iter().map(|t| t.to_string()).collect(),
                });
            }
            tracing::trace!("[Resolver::export] {} served from cache", target);
            return Ok(done.clone());
        }

        let document = self.document(&target.file)?;
        let mut state = ExportState {
            exported: InstanceStore::new(target.to_string()),
            visited: BTreeSet::new(),
            depth: 0,
        };
        self.collect(&document, &target.id, &chain, &mut state)?;
        let done = Rc::new(CompletedExport {
            instances: state.exported.into_instances(),
            depth: state.depth + 1,
        });
        tracing::debug!(
            "[Resolver::export] {} -> {} instances",
            target,
            done.instances.len()
        );
        self.exports.insert(target.clone(), done.clone());
        Ok(done)
    }

    fn collect(
        &mut self,
        document: &ScannedDocument,
        id: &str,
        chain: &ResolutionChain,
        state: &mut ExportState,
    ) -> Result<(), AsdError> {
        if !state.visited.insert(id.to_string()) {
            return Ok(());
        }
        let instance = document
            .store
            .get(id)
            .map_err(|_| AsdError::UnresolvedReference {
                origin: document.file.clone(),
                target: format!("#{id}"),
            })?
            .clone();
        state
            .exported
            .merge(instance.clone(), self.config.conflict_policy)?;

        for child in &instance.descriptor {
            if let Some(child_id) = &child.id {
                // Inline definitions carry their own `rt` in the stored copy.
                self.collect(document, child_id, chain, state)?;
                continue;
            }
            if let Some(href) = &child.href {
                self.follow(document, href, chain, state)?;
            }
            if let Some(rt) = child.transition_target() {
                self.follow(document, rt, chain, state)?;
            }
        }
        if let Some(rt) = instance.transition_target() {
            self.follow(document, rt, chain, state)?;
        }
        Ok(())
    }

    fn follow(
        &mut self,
        document: &ScannedDocument,
        specifier: &str,
        chain: &ResolutionChain,
        state: &mut ExportState,
    ) -> Result<(), AsdError> {
        let target = ReferenceTarget::parse(&document.file, specifier)?;
        if target.is_local_to(&document.file) {
            return self.collect(document, &target.id, chain, state);
        }
        let done = self.export_shared(&target, chain)?;
        for instance in &done.instances {
            state
                .exported
                .merge(instance.clone(), self.config.conflict_policy)?;
        }
        state.depth = state.depth.max(done.depth);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MemoryLoader;
    use serde_json::json;
    use test_log::test;

    /// `files` documents where both ids of each document alias both ids of the next one.
    fn diamond_chain(files: usize) -> MemoryLoader {
        (0..files).fold(MemoryLoader::new(), |loader, i| {
            let nested = if i + 1 < files {
                json!([
                    {"href": format!("p{}.json#a{}", i + 1, i + 1)},
                    {"href": format!("p{}.json#b{}", i + 1, i + 1)}
                ])
            } else {
                json!([])
            };
            let doc = json!({"alps": {"descriptor": [
                {"id": format!("a{i}"), "descriptor": nested.clone()},
                {"id": format!("b{i}"), "descriptor": nested}
            ]}});
            loader.with_document(format!("p{i}.json"), doc.to_string())
        })
    }

    #[test]
    fn test_parse_specifiers() {
        let local = ReferenceTarget::parse("profiles/index.json", "#home").unwrap();
        assert_eq!(local.file, "profiles/index.json");
        assert_eq!(local.id, "home");
        assert!(local.is_local_to("profiles/index.json"));

        let bare = ReferenceTarget::parse("profiles/index.json", "home").unwrap();
        assert_eq!(bare, local);

        let remote = ReferenceTarget::parse("profiles/index.json", "shared/common.json#blog")
            .unwrap();
        assert_eq!(remote.file, "profiles/shared/common.json");
        assert_eq!(remote.id, "blog");
        assert!(!remote.is_local_to("profiles/index.json"));
        assert_eq!(remote.to_string(), "profiles/shared/common.json#blog");

        let explicit_self = ReferenceTarget::parse("profiles/index.json", "index.json#home")
            .unwrap();
        assert!(explicit_self.is_local_to("profiles/index.json"));

        assert!(matches!(
            ReferenceTarget::parse("index.json", "other.json#"),
            Err(AsdError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = ReferenceRegistry::default();
        registry.register("a.json", "#home", ReferenceRole::Transition);
        registry.register("a.json", "#home", ReferenceRole::Transition);
        assert_eq!(registry.len(), 1);
        registry.register("a.json", "#home", ReferenceRole::Alias);
        assert_eq!(registry.len(), 1);
        let roles: Vec<_> = registry.iter().map(|(_, _, role)| role).collect();
        assert_eq!(roles, vec![ReferenceRole::Alias]);
    }

    #[test]
    fn test_chain_detects_repeats() {
        let a = ReferenceTarget::parse("a.json", "b.json#x").unwrap();
        let b = ReferenceTarget::parse("b.json", "a.json#y").unwrap();
        let chain = ResolutionChain::default().extended(&a, 8).unwrap();
        let chain = chain.extended(&b, 8).unwrap();
        assert_eq!(chain.len(), 2);
        let err = chain.extended(&a, 8).unwrap_err();
        assert_eq!(
            err,
            AsdError::CyclicReference {
                chain: vec![
                    "b.json#x".to_string(),
                    "a.json#y".to_string(),
                    "b.json#x".to_string()
                ]
            }
        );
        // Depth bound
        assert!(ResolutionChain::default().extended(&a, 0).is_err());
    }

    #[test]
    fn test_export_pulls_transitive_needs() {
        let loader = MemoryLoader::new().with_document(
            "shared.json",
            r##"{"alps": {"descriptor": [
                {"id": "blog", "descriptor": [
                    {"href": "#author"},
                    {"id": "goPost", "type": "safe", "rt": "#post"}
                ]},
                {"id": "author"},
                {"id": "post"},
                {"id": "unrelated"}
            ]}}"##,
        );
        let config = AsdConfig::default();
        let mut resolver = Resolver::new(&loader, &config);
        let target = ReferenceTarget::parse("index.json", "shared.json#blog").unwrap();
        let exported = resolver
            .export(&target, &ResolutionChain::default())
            .unwrap();
        let ids: BTreeSet<_> = exported.iter().filter_map(|d| d.id.as_deref()).collect();
        assert_eq!(ids, BTreeSet::from(["blog", "author", "goPost", "post"]));

        // Second export reuses the scanned document
        resolver
            .export(&target, &ResolutionChain::default())
            .unwrap();
        assert_eq!(resolver.loaded_documents(), 1);
    }

    #[test]
    fn test_resolve_all_local_alias_must_exist() {
        let loader = MemoryLoader::new();
        let config = AsdConfig::default();
        let mut resolver = Resolver::new(&loader, &config);
        let mut store = InstanceStore::new("index.json");
        let mut registry = ReferenceRegistry::default();
        registry.register("index.json", "#ghost", ReferenceRole::Alias);
        let err = registry.resolve_all(&mut store, &mut resolver).unwrap_err();
        assert_eq!(
            err,
            AsdError::UnresolvedReference {
                origin: "index.json".to_string(),
                target: "#ghost".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_all_missing_remote_target() {
        let loader = MemoryLoader::new()
            .with_document("other.json", r#"{"alps": {"descriptor": [{"id": "x"}]}}"#);
        let config = AsdConfig::default();
        let mut resolver = Resolver::new(&loader, &config);
        let mut store = InstanceStore::new("index.json");
        let mut registry = ReferenceRegistry::default();
        registry.register("index.json", "other.json#y", ReferenceRole::Transition);
        let err = registry.resolve_all(&mut store, &mut resolver).unwrap_err();
        assert_eq!(
            err,
            AsdError::UnresolvedReference {
                origin: "other.json".to_string(),
                target: "#y".to_string()
            }
        );
    }

    #[test]
    fn test_shared_targets_are_exported_once() {
        let files = 24;
        let loader = diamond_chain(files);
        let config = AsdConfig::default();
        let mut resolver = Resolver::new(&loader, &config);
        let target = ReferenceTarget::parse("root.json", "p0.json#a0").unwrap();
        let exported = resolver
            .export(&target, &ResolutionChain::default())
            .unwrap();
        assert_eq!(exported.len(), 2 * files - 1);
        assert_eq!(resolver.completed_exports(), 2 * files - 1);
        assert_eq!(resolver.loaded_documents(), files);
    }

    #[test]
    fn test_cached_export_still_bounded_by_depth() {
        let loader = MemoryLoader::new()
            .with_document(
                "x.json",
                r##"{"alps": {"descriptor": [{"id": "x", "descriptor": [{"href": "y.json#y"}]}]}}"##,
            )
            .with_document(
                "y.json",
                r##"{"alps": {"descriptor": [{"id": "y", "descriptor": [{"href": "z.json#z"}]}]}}"##,
            )
            .with_document("z.json", r##"{"alps": {"descriptor": [{"id": "z"}]}}"##);
        let config = AsdConfig {
            max_nesting_depth: 2,
            ..Default::default()
        };
        let mut resolver = Resolver::new(&loader, &config);
        let y = ReferenceTarget::parse("root.json", "y.json#y").unwrap();
        assert_eq!(
            resolver.export(&y, &ResolutionChain::default()).unwrap().len(),
            2
        );

        // y is now cached, but reaching it through x needs a chain of three
        let x = ReferenceTarget::parse("root.json", "x.json#x").unwrap();
        let err = resolver
            .export(&x, &ResolutionChain::default())
            .unwrap_err();
        assert_eq!(
            err,
            AsdError::CyclicReference {
                chain: vec!["x.json#x".to_string(), "y.json#y".to_string()]
            }
        );
    }
}
