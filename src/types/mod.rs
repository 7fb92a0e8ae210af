//! Identifier types shared by the webhook, router, and handler layers.

pub mod ids;

pub use ids::{DeliveryId, PrNumber, RepoId};
