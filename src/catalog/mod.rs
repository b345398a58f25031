//! Catalog Layer
//!
//! Read-only access to the remote Pokemon catalog. The bulk listing runs once
//! at startup; detail records are fetched on demand per detail view and never
//! cached across views.

pub mod client;
pub mod types;

pub use client::{CatalogClient, CatalogError};
pub use types::{Ability, PokemonDetail, PokemonSummary, StatValue, TYPE_NAMES};
