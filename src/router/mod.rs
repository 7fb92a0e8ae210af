//! Event router: maps `(kind, action)` to handlers and runs them.
//!
//! # Routing
//!
//! A handler is registered for an event kind and either one action or any
//! action (the wildcard bucket). For an event with kind `k` and action `a`,
//! the matching handlers are every registration for `(k, a)` and every
//! registration for `(k, *)`, in the order they were registered. Each
//! registration runs at most once per dispatch.
//!
//! # Lifecycle
//!
//! Routes are added to a [`RouterBuilder`] at startup; [`RouterBuilder::build`]
//! freezes them into a [`Router`] that is only ever read. A `Router` is shared
//! between concurrent deliveries behind an `Arc` and needs no locking.
//!
//! # Failure isolation
//!
//! Handlers run sequentially. A handler that returns `Err` (or panics) is
//! recorded in the [`DispatchResult`] and the next handler still runs. The
//! router itself never fails: an event nobody handles yields an empty,
//! successful result.

mod result;

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, info, instrument, warn};

use crate::github::ApiClient;
use crate::handlers::{Handler, HandlerError};
use crate::webhooks::Event;

pub use result::{DispatchResult, DispatchStatus, HandlerOutcome};

/// The `(kind, action)` a handler is registered under.
///
/// `action: None` matches every action of the kind, including events that
/// carry no action at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub kind: String,
    pub action: Option<String>,
}

impl RouteKey {
    pub fn new(kind: impl Into<String>, action: Option<&str>) -> Self {
        RouteKey {
            kind: kind.into(),
            action: action.map(str::to_string),
        }
    }

    /// Returns true if an event with this kind and action is routed here.
    pub fn matches(&self, kind: &str, action: Option<&str>) -> bool {
        self.kind == kind
            && match &self.action {
                None => true,
                Some(wanted) => action == Some(wanted.as_str()),
            }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Some(action) => write!(f, "{}.{}", self.kind, action),
            None => write!(f, "{}.*", self.kind),
        }
    }
}

struct Route {
    key: RouteKey,
    handler: Arc<dyn Handler>,
}

/// Collects handler registrations before the routing table is frozen.
#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `kind` and either one `action` or, with
    /// `None`, every action.
    ///
    /// Registering the same handler twice, or two handlers under one key, is
    /// allowed; every registration runs.
    pub fn register<H>(&mut self, kind: &str, action: Option<&str>, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        self.register_shared(kind, action, Arc::new(handler))
    }

    /// Registers an already shared handler.
    pub fn register_shared(
        &mut self,
        kind: &str,
        action: Option<&str>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.routes.push(Route {
            key: RouteKey::new(kind, action),
            handler,
        });
        self
    }

    /// Freezes the registrations into an immutable [`Router`].
    pub fn build(self) -> Router {
        let mut by_kind: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, route) in self.routes.iter().enumerate() {
            by_kind.entry(route.key.kind.clone()).or_default().push(idx);
        }
        Router {
            routes: self.routes,
            by_kind,
        }
    }
}

/// An immutable routing table.
pub struct Router {
    routes: Vec<Route>,
    /// Registration indices per kind, ascending.
    by_kind: HashMap<String, Vec<usize>>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Number of registrations.
    pub fn handler_count(&self) -> usize {
        self.routes.len()
    }

    /// Registered keys and handler names, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&RouteKey, &str)> + '_ {
        self.routes.iter().map(|r| (&r.key, r.handler.name()))
    }

    fn matching<'a>(&'a self, event: &'a Event) -> impl Iterator<Item = &'a Route> + 'a {
        self.by_kind
            .get(event.kind())
            .into_iter()
            .flatten()
            .map(|&idx| &self.routes[idx])
            .filter(move |route| route.key.matches(event.kind(), event.action()))
    }

    /// Runs every handler matching the event, in registration order.
    ///
    /// Never fails; per-handler failures are reported in the result.
    #[instrument(
        skip_all,
        fields(delivery_id = %event.delivery_id(), kind = %event.kind(), action = ?event.action())
    )]
    pub async fn dispatch(&self, event: &Event, client: &dyn ApiClient) -> DispatchResult {
        let mut outcomes = Vec::new();

        for route in self.matching(event) {
            let handler = route.handler.name();
            debug!(handler, route = %route.key, "Invoking handler");

            let result = AssertUnwindSafe(route.handler.handle(event, client))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))));

            match &result {
                Ok(()) => debug!(handler, "Handler succeeded"),
                Err(e) => warn!(handler, error = %e, "Handler failed"),
            }

            outcomes.push(HandlerOutcome {
                handler: handler.to_string(),
                route: route.key.clone(),
                result,
            });
        }

        let result = DispatchResult::new(event.delivery_id().clone(), outcomes);
        match result.status() {
            DispatchStatus::Success if result.is_empty() => {
                debug!("No handlers registered for event")
            }
            DispatchStatus::Success => info!(handlers = result.len(), "Dispatch succeeded"),
            DispatchStatus::PartialFailure { failed, total } => {
                warn!(failed, total, "Dispatch partially failed")
            }
        }
        result
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.routes
                    .iter()
                    .map(|r| format!("{} -> {}", r.key, r.handler.name())),
            )
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
