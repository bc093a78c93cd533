//! Core domain types and the [`store::KnowledgeStore`] trait for Loam.
//!
//! Carries no HTTP or database dependencies; every other Loam crate builds
//! on this one.

// Native async-fn-in-trait. The advisory lint about missing `Send` bounds
// is moot: the trait spells the bounds out on its returned futures.
#![allow(async_fn_in_trait)]

pub mod entity;
pub mod observation;
pub mod relation;
pub mod store;

pub use entity::{Entity, NewEntity};
pub use observation::{NewObservation, Observation};
pub use relation::{NewRelation, Relation};
