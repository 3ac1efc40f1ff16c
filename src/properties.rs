//! Typed building blocks of a [ProfileGraph](crate::graph::ProfileGraph): descriptor kinds, the
//! four descriptor variants, link relations and documentation text.

use serde::{Deserialize, Deserializer, Serialize};
use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::{codec::profile_ir::RawLink, error::AsdError};

/// The id part of a reference specifier: everything after the last `#`, or the whole
/// specifier for bare ids.
pub fn reference_id(specifier: &str) -> &str {
    specifier
        .rsplit_once('#')
        .map(|(_, id)| id)
        .unwrap_or(specifier)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    Semantic,
    Safe,
    Unsafe,
    Idempotent,
}

impl DescriptorKind {
    /// Display rank: states first, then transitions grouped safe, unsafe, idempotent.
    pub fn rank(&self) -> u8 {
        match self {
            DescriptorKind::Semantic => 0,
            DescriptorKind::Safe => 1,
            DescriptorKind::Unsafe => 2,
            DescriptorKind::Idempotent => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorKind::Semantic => "semantic",
            DescriptorKind::Safe => "safe",
            DescriptorKind::Unsafe => "unsafe",
            DescriptorKind::Idempotent => "idempotent",
        }
    }

    pub fn is_transition(&self) -> bool {
        !matches!(self, DescriptorKind::Semantic)
    }
}

impl FromStr for DescriptorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "semantic" => Ok(DescriptorKind::Semantic),
            "safe" => Ok(DescriptorKind::Safe),
            "unsafe" => Ok(DescriptorKind::Unsafe),
            "idempotent" => Ok(DescriptorKind::Idempotent),
            _ => Err(s.to_string()),
        }
    }
}

impl Display for DescriptorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three transition kinds, i.e. every [DescriptorKind] except `Semantic`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Safe,
    Unsafe,
    Idempotent,
}

impl From<TransitionKind> for DescriptorKind {
    fn from(kind: TransitionKind) -> Self {
        match kind {
            TransitionKind::Safe => DescriptorKind::Safe,
            TransitionKind::Unsafe => DescriptorKind::Unsafe,
            TransitionKind::Idempotent => DescriptorKind::Idempotent,
        }
    }
}

impl Display for TransitionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", DescriptorKind::from(*self))
    }
}

/// Human readable documentation attached to a profile or descriptor.
///
/// Accepts both the shorthand string form and the `{ "value": .., "format": .. }` object form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Doc {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl<'de> Deserialize<'de> for Doc {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum DocRepr {
            Text(String),
            Object {
                #[serde(default)]
                value: String,
                #[serde(default)]
                format: Option<String>,
            },
        }
        Ok(match DocRepr::deserialize(de)? {
            DocRepr::Text(value) => Doc {
                value,
                format: None,
            },
            DocRepr::Object { value, format } => Doc { value, format },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRelation {
    pub href: String,
    pub rel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TryFrom<&RawLink> for LinkRelation {
    type Error = AsdError;

    fn try_from(raw: &RawLink) -> Result<Self, Self::Error> {
        match (&raw.href, &raw.rel) {
            (Some(href), Some(rel)) => Ok(LinkRelation {
                href: href.clone(),
                rel: rel.clone(),
                title: raw.title.clone(),
            }),
            _ => Err(AsdError::InvalidLinkRelation(serde_json::to_string(raw)?)),
        }
    }
}

/// A descriptor listed under another descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptorRef {
    /// An inline definition, referenced by its id.
    Inline(String),
    /// An `href` reference, optionally overriding the target's title in this context.
    Alias { href: String, title: Option<String> },
}

impl DescriptorRef {
    pub fn target_id(&self) -> &str {
        match self {
            DescriptorRef::Inline(id) => id,
            DescriptorRef::Alias { href, .. } => reference_id(href),
        }
    }
}

/// Attributes shared by every descriptor variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorCore {
    pub id: String,
    pub title: Option<String>,
    pub doc: Option<Doc>,
    pub def: Option<String>,
    pub reference: Option<String>,
    pub src: Option<String>,
    pub rel: Option<String>,
    pub tags: Vec<String>,
    pub nested: Vec<DescriptorRef>,
    pub links: Vec<LinkRelation>,
}

impl DescriptorCore {
    pub fn new(id: impl Into<String>) -> Self {
        DescriptorCore {
            id: id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticDescriptor {
    pub core: DescriptorCore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDescriptor {
    pub core: DescriptorCore,
    /// The semantic descriptor reached once the transition succeeds, as written in the source
    /// (`#id`, `id` or `file#id`).
    pub rt: Option<String>,
}

impl TransitionDescriptor {
    /// The id named by `rt`, with any file or anchor marker stripped.
    pub fn target_id(&self) -> Option<&str> {
        self.rt
            .as_deref()
            .filter(|rt| !rt.trim().is_empty())
            .map(reference_id)
    }
}

/// A typed descriptor. Immutable once created by
/// [DescriptorFactory](crate::graph::factory::DescriptorFactory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Descriptor {
    Semantic(SemanticDescriptor),
    Safe(TransitionDescriptor),
    Unsafe(TransitionDescriptor),
    Idempotent(TransitionDescriptor),
}

impl Descriptor {
    pub fn new_semantic(id: impl Into<String>) -> Self {
        Descriptor::Semantic(SemanticDescriptor {
            core: DescriptorCore::new(id),
        })
    }

    pub fn new_transition(kind: TransitionKind, id: impl Into<String>, rt: impl Into<String>) -> Self {
        Descriptor::from_transition(
            kind,
            TransitionDescriptor {
                core: DescriptorCore::new(id),
                rt: Some(rt.into()),
            },
        )
    }

    pub fn from_transition(kind: TransitionKind, transition: TransitionDescriptor) -> Self {
        match kind {
            TransitionKind::Safe => Descriptor::Safe(transition),
            TransitionKind::Unsafe => Descriptor::Unsafe(transition),
            TransitionKind::Idempotent => Descriptor::Idempotent(transition),
        }
    }

    pub fn core(&self) -> &DescriptorCore {
        match self {
            Descriptor::Semantic(semantic) => &semantic.core,
            Descriptor::Safe(t) | Descriptor::Unsafe(t) | Descriptor::Idempotent(t) => &t.core,
        }
    }

    pub fn core_mut(&mut self) -> &mut DescriptorCore {
        match self {
            Descriptor::Semantic(semantic) => &mut semantic.core,
            Descriptor::Safe(t) | Descriptor::Unsafe(t) | Descriptor::Idempotent(t) => &mut t.core,
        }
    }

    pub fn id(&self) -> &str {
        &self.core().id
    }

    pub fn title(&self) -> Option<&str> {
        self.core().title.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.core().tags
    }

    pub fn nested(&self) -> &[DescriptorRef] {
        &self.core().nested
    }

    pub fn kind(&self) -> DescriptorKind {
        match self {
            Descriptor::Semantic(_) => DescriptorKind::Semantic,
            Descriptor::Safe(_) => DescriptorKind::Safe,
            Descriptor::Unsafe(_) => DescriptorKind::Unsafe,
            Descriptor::Idempotent(_) => DescriptorKind::Idempotent,
        }
    }

    pub fn transition_kind(&self) -> Option<TransitionKind> {
        match self {
            Descriptor::Semantic(_) => None,
            Descriptor::Safe(_) => Some(TransitionKind::Safe),
            Descriptor::Unsafe(_) => Some(TransitionKind::Unsafe),
            Descriptor::Idempotent(_) => Some(TransitionKind::Idempotent),
        }
    }

    pub fn as_transition(&self) -> Option<&TransitionDescriptor> {
        match self {
            Descriptor::Semantic(_) => None,
            Descriptor::Safe(t) | Descriptor::Unsafe(t) | Descriptor::Idempotent(t) => Some(t),
        }
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, Descriptor::Semantic(_))
    }

    /// Ordering within a group of siblings: kind rank, then case-sensitive id.
    pub fn sibling_cmp(&self, other: &Descriptor) -> Ordering {
        (self.kind().rank(), self.id()).cmp(&(other.kind().rank(), other.id()))
    }

    /// Ordering of the global descriptor listing: case-insensitive id, then kind rank, then the
    /// exact id so that the order is total.
    pub fn display_cmp(&self, other: &Descriptor) -> Ordering {
        display_cmp(self.id(), self.kind().rank(), other.id(), other.kind().rank())
    }
}

pub(crate) fn display_cmp(a_id: &str, a_rank: u8, b_id: &str, b_rank: u8) -> Ordering {
    a_id.to_uppercase()
        .cmp(&b_id.to_uppercase())
        .then(a_rank.cmp(&b_rank))
        .then(a_id.cmp(b_id))
}

/// Profile level metadata, read from the `$schema` and `alps` header of the root document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub schema: Option<String>,
    pub title: Option<String>,
    pub doc: Option<Doc>,
    pub links: Vec<LinkRelation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_id() {
        assert_eq!(reference_id("#home"), "home");
        assert_eq!(reference_id("shared/common.json#blog"), "blog");
        assert_eq!(reference_id("home"), "home");
        assert_eq!(reference_id("#"), "");
    }

    #[test]
    fn test_kind_parse_and_rank() {
        assert_eq!("unsafe".parse::<DescriptorKind>(), Ok(DescriptorKind::Unsafe));
        assert_eq!("Safe".parse::<DescriptorKind>(), Err("Safe".to_string()));
        let mut kinds = vec![
            DescriptorKind::Idempotent,
            DescriptorKind::Semantic,
            DescriptorKind::Unsafe,
            DescriptorKind::Safe,
        ];
        kinds.sort_by_key(|k| k.rank());
        assert_eq!(
            kinds,
            vec![
                DescriptorKind::Semantic,
                DescriptorKind::Safe,
                DescriptorKind::Unsafe,
                DescriptorKind::Idempotent
            ]
        );
    }

    #[test]
    fn test_sibling_ordering() {
        let mut siblings = vec![
            Descriptor::new_transition(TransitionKind::Safe, "B", "#A"),
            Descriptor::new_semantic("A"),
            Descriptor::new_transition(TransitionKind::Idempotent, "C", "#A"),
        ];
        siblings.sort_by(|a, b| a.sibling_cmp(b));
        let ids: Vec<&str> = siblings.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        // Rank wins over id
        let mut siblings = vec![
            Descriptor::new_transition(TransitionKind::Unsafe, "a", "#z"),
            Descriptor::new_semantic("z"),
        ];
        siblings.sort_by(|a, b| a.sibling_cmp(b));
        assert_eq!(siblings[0].id(), "z");
    }

    #[test]
    fn test_display_ordering_is_case_insensitive() {
        let mut all = vec![
            Descriptor::new_transition(TransitionKind::Safe, "listItems", "#home"),
            Descriptor::new_semantic("Home"),
            Descriptor::new_semantic("about"),
        ];
        all.sort_by(|a, b| a.display_cmp(b));
        let ids: Vec<&str> = all.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["about", "Home", "listItems"]);
    }

    #[test]
    fn test_doc_forms() {
        let text: Doc = serde_json::from_str("\"plain\"").unwrap();
        assert_eq!(text.value, "plain");
        assert!(text.format.is_none());
        let object: Doc =
            serde_json::from_str(r#"{"value": "<b>rich</b>", "format": "html"}"#).unwrap();
        assert_eq!(object.format.as_deref(), Some("html"));
    }

    #[test]
    fn test_link_relation_requires_href_and_rel() {
        let ok = RawLink {
            href: Some("https://example.com/".to_string()),
            rel: Some("help".to_string()),
            title: None,
        };
        assert!(LinkRelation::try_from(&ok).is_ok());
        let missing_rel = RawLink {
            href: Some("https://example.com/".to_string()),
            rel: None,
            title: None,
        };
        assert!(matches!(
            LinkRelation::try_from(&missing_rel),
            Err(AsdError::InvalidLinkRelation(_))
        ));
    }
}
