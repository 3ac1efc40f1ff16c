//! Untyped intermediate representation of an ALPS profile document.
//!
//! Codecs deserialize into these types. The graph pipeline stores [RawDescriptor]s in its
//! [InstanceStore](crate::graph::store::InstanceStore) until every reference is resolved, and only
//! then converts them into typed [Descriptor](crate::properties::Descriptor)s.

use serde::{Deserialize, Deserializer, Serialize};

use crate::properties::{DescriptorKind, Doc};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::<T>::deserialize(de)? {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    })
}

/// ALPS writes tags as one space separated string; lists are accepted as well.
fn tag_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagRepr {
        Spaced(String),
        List(Vec<String>),
    }
    Ok(match TagRepr::deserialize(de)? {
        TagRepr::Spaced(tags) => tags.split_whitespace().map(str::to_string).collect(),
        TagRepr::List(tags) => tags,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One node of the descriptor tree, as written in the source document.
///
/// A node with an `id` is a definition. A node without one must carry an `href` and is a
/// reference to a definition elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Doc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub def: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(
        default,
        rename = "tag",
        deserialize_with = "tag_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descriptor: Vec<RawDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rt: Option<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub link: Vec<RawLink>,
}

impl RawDescriptor {
    pub fn with_id(id: impl Into<String>) -> Self {
        RawDescriptor {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn alias(href: impl Into<String>) -> Self {
        RawDescriptor {
            href: Some(href.into()),
            ..Default::default()
        }
    }

    pub fn is_definition(&self) -> bool {
        self.id.is_some()
    }

    /// The `rt` of a transition node, if it names anything.
    ///
    /// Semantic (or untyped) nodes and blank `rt` values yield `None`.
    pub fn transition_target(&self) -> Option<&str> {
        let is_transition = self
            .kind
            .as_deref()
            .and_then(|kind| kind.parse::<DescriptorKind>().ok())
            .is_some_and(|kind| kind.is_transition());
        self.rt
            .as_deref()
            .filter(|rt| is_transition && !rt.trim().is_empty())
    }

    /// Compact JSON rendering used in error messages.
    pub fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// A parsed profile document: header metadata plus the root descriptor list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocument {
    pub schema: Option<String>,
    pub title: Option<String>,
    pub doc: Option<Doc>,
    pub links: Vec<RawLink>,
    pub descriptors: Vec<RawDescriptor>,
}

/// The ALPS wire envelope: `{"$schema": .., "alps": {..}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct AlpsEnvelope {
    #[serde(default, rename = "$schema")]
    schema: Option<String>,
    alps: AlpsBody,
}

#[derive(Debug, Deserialize)]
struct AlpsBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    doc: Option<Doc>,
    #[serde(default, deserialize_with = "one_or_many")]
    link: Vec<RawLink>,
    #[serde(default)]
    descriptor: Vec<RawDescriptor>,
}

impl From<AlpsEnvelope> for RawDocument {
    fn from(envelope: AlpsEnvelope) -> Self {
        RawDocument {
            schema: envelope.schema,
            title: envelope.alps.title,
            doc: envelope.alps.doc,
            links: envelope.alps.link,
            descriptors: envelope.alps.descriptor,
        }
    }
}
