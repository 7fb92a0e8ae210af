//! The aggregate outcome of one dispatch.

use crate::handlers::HandlerError;
use crate::types::DeliveryId;

use super::RouteKey;

/// What one handler invocation produced.
#[derive(Debug)]
pub struct HandlerOutcome {
    pub handler: String,
    pub route: RouteKey,
    pub result: Result<(), HandlerError>,
}

impl HandlerOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&HandlerError> {
        self.result.as_ref().err()
    }
}

/// Summary status of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Every invoked handler succeeded (vacuously true when none matched).
    Success,
    /// At least one handler failed.
    PartialFailure { failed: usize, total: usize },
}

/// Per-handler outcomes for one delivery, in invocation order.
#[derive(Debug)]
pub struct DispatchResult {
    delivery_id: DeliveryId,
    outcomes: Vec<HandlerOutcome>,
}

impl DispatchResult {
    pub fn new(delivery_id: DeliveryId, outcomes: Vec<HandlerOutcome>) -> Self {
        DispatchResult {
            delivery_id,
            outcomes,
        }
    }

    pub fn delivery_id(&self) -> &DeliveryId {
        &self.delivery_id
    }

    pub fn outcomes(&self) -> &[HandlerOutcome] {
        &self.outcomes
    }

    /// Number of handlers invoked.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn status(&self) -> DispatchStatus {
        match self.failures().count() {
            0 => DispatchStatus::Success,
            failed => DispatchStatus::PartialFailure {
                failed,
                total: self.outcomes.len(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == DispatchStatus::Success
    }
}
