use crate::{
    codec::RawDescriptor,
    error::AsdError,
    properties::{
        Descriptor, DescriptorCore, DescriptorKind, DescriptorRef, LinkRelation,
        SemanticDescriptor, TransitionDescriptor, TransitionKind,
    },
};

/// Turns resolved [RawDescriptor]s into typed [Descriptor]s.
pub struct DescriptorFactory;

impl DescriptorFactory {
    /// Dispatch on the `type` tag of `raw`. A missing tag means `semantic`.
    ///
    /// Shared attributes are copied verbatim and nested entries keep their source order.
    pub fn create(raw: &RawDescriptor) -> Result<Descriptor, AsdError> {
        let Some(id) = raw.id.as_deref() else {
            return Err(AsdError::InvalidDescriptor(raw.describe()));
        };
        let kind = match raw.kind.as_deref() {
            None => DescriptorKind::Semantic,
            Some(tag) => tag
                .parse::<DescriptorKind>()
                .map_err(|kind| AsdError::UnknownDescriptorKind {
                    id: id.to_string(),
                    kind,
                })?,
        };
        let core = Self::core(id, raw)?;

        let transition_kind = match kind {
            DescriptorKind::Semantic => {
                if let Some(rt) = &raw.rt {
                    tracing::warn!(
                        "[DescriptorFactory::create] Semantic descriptor '{}' carries rt '{}'. \
                        Ignoring it.",
                        id,
                        rt
                    );
                }
                return Ok(Descriptor::Semantic(SemanticDescriptor { core }));
            }
            DescriptorKind::Safe => TransitionKind::Safe,
            DescriptorKind::Unsafe => TransitionKind::Unsafe,
            DescriptorKind::Idempotent => TransitionKind::Idempotent,
        };
        Ok(Descriptor::from_transition(
            transition_kind,
            TransitionDescriptor {
                core,
                rt: raw.rt.clone(),
            },
        ))
    }

    fn core(id: &str, raw: &RawDescriptor) -> Result<DescriptorCore, AsdError> {
        let nested = raw
            .descriptor
            .iter()
            .map(|child| match (&child.id, &child.href) {
                (Some(child_id), _) => Ok(DescriptorRef::Inline(child_id.clone())),
                (None, Some(href)) => Ok(DescriptorRef::Alias {
                    href: href.clone(),
                    title: child.title.clone(),
                }),
                (None, None) => Err(AsdError::InvalidDescriptor(child.describe())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let links = raw
            .link
            .iter()
            .map(LinkRelation::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DescriptorCore {
            id: id.to_string(),
            title: raw.title.clone(),
            doc: raw.doc.clone(),
            def: raw.def.clone(),
            reference: raw.reference.clone(),
            src: raw.src.clone(),
            rel: raw.rel.clone(),
            tags: raw.tags.clone(),
            nested,
            links,
        })
    }
}
