use std::collections::BTreeMap;

use crate::{
    codec::RawDescriptor,
    config::ConflictPolicy,
    error::AsdError,
    properties::{display_cmp, DescriptorKind},
};

/// Flat id → [RawDescriptor] mapping for one merge scope (one top-level graph or one exported
/// sub-tree).
///
/// Instances are kept in insertion order; ordering for display is applied later by
/// [InstanceStore::sorted].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceStore {
    scope: String,
    instances: Vec<RawDescriptor>,
    index: BTreeMap<String, usize>,
}

impl InstanceStore {
    pub fn new(scope: impl Into<String>) -> Self {
        InstanceStore {
            scope: scope.into(),
            ..Default::default()
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Insert `instance` under its id.
    ///
    /// Returns `Ok(false)` when an identical instance was already present. Differing content
    /// under the same id fails with [AsdError::ConflictingDescriptor].
    pub fn add(&mut self, instance: RawDescriptor) -> Result<bool, AsdError> {
        self.merge(instance, ConflictPolicy::Fail)
    }

    /// [InstanceStore::add] with a configurable answer to conflicts.
    pub fn merge(
        &mut self,
        instance: RawDescriptor,
        policy: ConflictPolicy,
    ) -> Result<bool, AsdError> {
        let Some(id) = instance.id.clone() else {
            return Err(AsdError::InvalidDescriptor(format!(
                "cannot store a descriptor without an id: {}",
                instance.describe()
            )));
        };
        if let Some(existing) = self.index.get(&id).map(|idx| &self.instances[*idx]) {
            if *existing == instance {
                return Ok(false);
            }
            return match policy {
                ConflictPolicy::Fail => Err(AsdError::ConflictingDescriptor {
                    id,
                    scope: self.scope.clone(),
                }),
                ConflictPolicy::KeepFirst => {
                    tracing::warn!(
                        "[InstanceStore::merge] Descriptor '{}' redefined with different content \
                        in {}. Keeping the first definition.",
                        id,
                        self.scope
                    );
                    Ok(false)
                }
            };
        }
        self.index.insert(id, self.instances.len());
        self.instances.push(instance);
        Ok(true)
    }

    pub fn get(&self, id: &str) -> Result<&RawDescriptor, AsdError> {
        self.index
            .get(id)
            .map(|idx| &self.instances[*idx])
            .ok_or_else(|| AsdError::DescriptorNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All stored instances in insertion order. Each call starts a fresh pass.
    pub fn all(&self) -> impl Iterator<Item = &RawDescriptor> + '_ {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances ordered by case-insensitive id, then descriptor kind rank. Unrecognized kinds
    /// sort last within an id.
    pub fn sorted(&self) -> Vec<&RawDescriptor> {
        let mut sorted = self.instances.iter().collect::<Vec<_>>();
        sorted.sort_by(|a, b| {
            display_cmp(
                a.id.as_deref().unwrap_or_default(),
                raw_rank(a),
                b.id.as_deref().unwrap_or_default(),
                raw_rank(b),
            )
        });
        sorted
    }

    pub fn into_instances(self) -> Vec<RawDescriptor> {
        self.instances
    }
}

fn raw_rank(raw: &RawDescriptor) -> u8 {
    match raw.kind.as_deref() {
        None => DescriptorKind::Semantic.rank(),
        Some(kind) => kind
            .parse::<DescriptorKind>()
            .map(|kind| kind.rank())
            .unwrap_or(u8::MAX),
    }
}
