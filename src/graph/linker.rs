use std::collections::{BTreeMap, BTreeSet};

use petgraph::{graph::NodeIndex, Direction};
use serde::{Deserialize, Serialize};

use crate::{
    error::AsdError,
    graph::descriptor_map::DescriptorMap,
    properties::{Descriptor, TransitionKind},
};

/// A transition and the semantic descriptor it reaches.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionEdge {
    pub from: String,
    pub to: String,
    pub kind: TransitionKind,
}

/// A state-to-state step of the application state diagram: `transition`, nested in `state`,
/// leads to `target`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateLink {
    pub state: String,
    pub target: String,
    pub transition: String,
    pub kind: TransitionKind,
}

pub struct TransitionLinker;

impl TransitionLinker {
    /// Build the deduplicated transition edge set of `descriptors`.
    ///
    /// Every transition with a non-empty `rt` must name a semantic descriptor present in
    /// `descriptors`.
    pub fn link(descriptors: &DescriptorMap) -> Result<BTreeSet<TransitionEdge>, AsdError> {
        let mut edges = BTreeSet::new();
        for descriptor in descriptors.iter() {
            let (Some(kind), Some(transition)) =
                (descriptor.transition_kind(), descriptor.as_transition())
            else {
                continue;
            };
            let Some(target) = transition.target_id() else {
                tracing::warn!(
                    "[TransitionLinker::link] Transition '{}' has no rt. No edge created.",
                    descriptor.id()
                );
                continue;
            };
            check_target(descriptors, descriptor, target)?;
            edges.insert(TransitionEdge {
                from: descriptor.id().to_string(),
                to: target.to_string(),
                kind,
            });
        }
        Ok(edges)
    }

    /// For each semantic descriptor and each transition nested in it, the link from that state
    /// to the transition's target.
    pub fn state_links(descriptors: &DescriptorMap) -> Result<BTreeSet<StateLink>, AsdError> {
        let mut links = BTreeSet::new();
        for state in descriptors.iter().filter(|d| d.is_semantic()) {
            for nested in state.nested() {
                let child = descriptors.get(nested.target_id())?;
                let (Some(kind), Some(target)) = (
                    child.transition_kind(),
                    child.as_transition().and_then(|t| t.target_id()),
                ) else {
                    continue;
                };
                check_target(descriptors, child, target)?;
                links.insert(StateLink {
                    state: state.id().to_string(),
                    target: target.to_string(),
                    transition: child.id().to_string(),
                    kind,
                });
            }
        }
        Ok(links)
    }
}

fn check_target(
    descriptors: &DescriptorMap,
    transition: &Descriptor,
    target: &str,
) -> Result<(), AsdError> {
    match descriptors.get(target) {
        Ok(found) if found.is_semantic() => Ok(()),
        _ => Err(AsdError::DanglingTransitionTarget {
            id: transition.id().to_string(),
            rt: transition
                .as_transition()
                .and_then(|t| t.rt.clone())
                .unwrap_or_default(),
        }),
    }
}

/// The application state diagram: semantic states as nodes, [StateLink]s as edges.
#[derive(Debug, Clone, Default)]
pub struct StateDiagram(petgraph::Graph<String, StateLink>);

impl StateDiagram {
    pub fn from_links<'a, I>(links: I) -> Self
    where
        I: IntoIterator<Item = &'a StateLink>,
    {
        let mut graph = petgraph::Graph::new();
        let mut id_to_index: BTreeMap<String, NodeIndex> = BTreeMap::new();
        let links = links.into_iter().collect::<Vec<_>>();

        for link in links.iter() {
            for id in [&link.state, &link.target] {
                if !id_to_index.contains_key(id) {
                    let index = graph.add_node(id.clone());
                    id_to_index.insert(id.clone(), index);
                }
            }
        }

        for link in links {
            let source_idx = id_to_index[&link.state];
            let sink_idx = id_to_index[&link.target];
            graph.add_edge(source_idx, sink_idx, link.clone());
        }

        StateDiagram(graph)
    }

    pub fn as_graph(&self) -> &petgraph::Graph<String, StateLink> {
        &self.0
    }

    pub fn node_count(&self) -> usize {
        self.0.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.0.edge_count()
    }

    /// States without outgoing links, sorted.
    pub fn terminal_states(&self) -> Vec<&str> {
        let mut terminal = self
            .0
            .node_indices()
            .filter(|idx| {
                self.0
                    .neighbors_directed(*idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|idx| self.0[idx].as_str())
            .collect::<Vec<_>>();
        terminal.sort();
        terminal
    }

    /// Links leaving `state`, sorted.
    pub fn outgoing(&self, state: &str) -> Vec<&StateLink> {
        let mut links = self
            .0
            .raw_edges()
            .iter()
            .map(|edge| &edge.weight)
            .filter(|link| link.state == state)
            .collect::<Vec<_>>();
        links.sort();
        links
    }
}
