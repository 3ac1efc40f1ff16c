use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::properties::Descriptor;

/// Tag → ids of the descriptors declaring it.
///
/// Keys iterate in ascending order. Ids keep the order of the descriptor listing and appear once
/// per tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagIndex(BTreeMap<String, Vec<String>>);

impl TagIndex {
    pub fn build<'a, I>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = &'a Descriptor>,
    {
        let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for descriptor in descriptors {
            for tag in descriptor.tags() {
                let ids = index.entry(tag.clone()).or_default();
                if !ids.iter().any(|id| id == descriptor.id()) {
                    ids.push(descriptor.id().to_string());
                }
            }
        }
        TagIndex(index)
    }

    pub fn get(&self, tag: &str) -> Option<&[String]> {
        self.0.get(tag).map(|ids| ids.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.0.iter().map(|(tag, ids)| (tag.as_str(), ids.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(id: &str, tags: &[&str]) -> Descriptor {
        let mut d = Descriptor::new_semantic(id);
        d.core_mut().tags = tags.iter().map(|t| t.to_string()).collect();
        d
    }

    #[test]
    fn test_each_id_once_per_tag() {
        let descriptors = vec![
            tagged("home", &["nav", "root"]),
            tagged("list", &["nav", "nav"]),
            tagged("item", &[]),
        ];
        let index = TagIndex::build(&descriptors);
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["nav", "root"]);
        assert_eq!(
            index.get("nav"),
            Some(&["home".to_string(), "list".to_string()][..])
        );
        assert!(index.get("item").is_none());
    }
}
