//! # asd-core
//!
//! Reference resolution and graph construction for ALPS application-semantics profiles.
//!
//! ## Overview
//!
//! An ALPS profile describes an application as named *descriptors*: semantic states and the
//! safe, unsafe and idempotent transitions between them. Profiles nest descriptors inside each
//! other, alias descriptors by `href`, and may split a profile across several files that
//! reference each other with `file#id` links.
//!
//! asd-core turns such a document set into one merged, typed [`graph::ProfileGraph`]:
//!
//! - nested descriptor trees are flattened into a single id-keyed store
//! - `#id`, `id` and `file#id` references are resolved, loading referenced files on demand and
//!   rejecting reference cycles
//! - every descriptor is classified as [`properties::Descriptor::Semantic`] or one of the three
//!   transition kinds
//! - transition edges (`transition --rt--> state`) and a tag index are derived, along with a
//!   state-to-state [`graph::StateDiagram`] for renderers
//!
//! ## Architecture
//!
//! - **[`codec`]**: profile parsing (`ProfileCodec` trait, JSON and YAML codecs) and the
//!   `DocumentLoader` seam (`FsLoader`, `MemoryLoader`)
//! - **[`graph`]**: the staged build pipeline and its components (`InstanceStore`,
//!   `ReferenceRegistry`, `DescriptorFactory`, `TransitionLinker`, `TagIndex`)
//! - **[`properties`]**: typed descriptors, kinds, link relations and ordering rules
//! - **[`paths`]**: `file#anchor` parsing and relative file resolution
//! - **[`config`]**: build options loaded from TOML
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use asd_core::{config::AsdConfig, graph::ProfileGraph};
//!
//! fn main() -> Result<(), asd_core::AsdError> {
//!     let config = AsdConfig::load("profiles/asd.toml")?;
//!     let graph = ProfileGraph::from_path("profiles/todo.json", config)?;
//!
//!     for descriptor in graph.descriptors()? {
//!         println!("{} ({})", descriptor.id(), descriptor.kind());
//!     }
//!     for edge in graph.transitions()? {
//!         println!("{} --{}--> {}", edge.from, edge.kind, edge.to);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Construction either yields a finalized graph or an [`AsdError`]; no partial graph is ever
//! returned. See [`AsdError::is_structural`] for the errors that describe broken documents.

pub mod codec;
pub mod config;
pub mod error;
pub mod graph;
pub mod paths;
pub mod properties;
#[cfg(test)]
mod tests;

pub use error::*;
