use std::collections::BTreeMap;

use crate::{error::AsdError, properties::Descriptor};

/// Typed descriptors of a finalized graph, in display order, indexed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorMap {
    descriptors: Vec<Descriptor>,
    index: BTreeMap<String, usize>,
}

impl DescriptorMap {
    /// Sorts `descriptors` by [Descriptor::display_cmp] and indexes them.
    pub fn from_descriptors(mut descriptors: Vec<Descriptor>) -> Self {
        descriptors.sort_by(|a, b| a.display_cmp(b));
        let index = descriptors
            .iter()
            .enumerate()
            .map(|(idx, d)| (d.id().to_string(), idx))
            .collect();
        DescriptorMap { descriptors, index }
    }

    pub fn get(&self, id: &str) -> Result<&Descriptor, AsdError> {
        self.index
            .get(id)
            .map(|idx| &self.descriptors[*idx])
            .ok_or_else(|| AsdError::DescriptorNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> + '_ {
        self.descriptors.iter()
    }

    pub fn as_slice(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
