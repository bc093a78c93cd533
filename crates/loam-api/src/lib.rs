//! JSON REST API for Loam.
//!
//! Exposes an axum [`Router`] backed by any [`loam_core::store::KnowledgeStore`]
//! through a [`loam_engine::Engine`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", loam_api::api_router(engine.clone()))
//! ```

pub mod context;
pub mod entities;
pub mod error;
pub mod index;
pub mod search;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use loam_core::store::KnowledgeStore;
use loam_engine::Engine;

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<Engine<S>>) -> Router<()>
where S: KnowledgeStore + 'static {
  Router::new()
    // Entities & relations
    .route("/entities/{permalink}", get(entities::get_one::<S>))
    .route("/entities/{permalink}/related", get(entities::related::<S>))
    // Search & context
    .route("/search", get(search::handler::<S>))
    .route("/context", get(context::handler::<S>))
    // Index lifecycle
    .route("/index/rebuild", post(index::rebuild::<S>))
    .route("/index/update/{permalink}", post(index::update_one::<S>))
    .with_state(engine)
}
