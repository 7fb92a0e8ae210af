//! Spackbot - a GitHub webhook bot that routes deliveries to handlers.
//!
//! A delivery arrives at `POST /webhook`, is verified against the webhook
//! secret, and becomes an immutable [`webhooks::Event`]. The [`router`] picks
//! every handler registered for the event's kind and action and runs them in
//! registration order, each with a borrowed [`github::ApiClient`]. A failing
//! handler never stops its siblings.

pub mod commands;
pub mod config;
pub mod git;
pub mod github;
pub mod handlers;
pub mod mirror;
pub mod router;
pub mod server;
pub mod types;
pub mod webhooks;

#[cfg(test)]
mod test_utils;
