//! Academic Operations Engine
//!
//! The orchestrator owns the store handle, the immutable fee schedule book
//! and the notification sink, and exposes the engine's operations. Each
//! concern lives in its own module as an `impl AcademicEngine` block:
//! fee ledger, registration gate, timetable placement, grading.

use std::sync::Arc;

use tracing::warn;

use crate::config::FeeScheduleBook;
use crate::models::Notification;
use crate::notify::{NotificationSink, TracingNotifier};
use crate::store::AcademicStore;

pub mod fee_ledger;
pub mod grades;
pub mod registration;
pub mod timetable;

pub use fee_ledger::{FeeStatement, FeeStatementLine};
pub use grades::{GpaBreakdown, GpaSummary, TermGpa};
pub use registration::{
    EligibilityDecision, EligibilityStatus, MAX_TERM_CREDITS, MIN_TERM_CREDITS,
};

/// The single externally callable surface for registration, fees,
/// timetabling and grading.
#[derive(Clone)]
pub struct AcademicEngine {
    store: Arc<dyn AcademicStore>,
    fee_book: Arc<FeeScheduleBook>,
    notifier: Arc<dyn NotificationSink>,
}

impl AcademicEngine {
    pub fn new(
        store: Arc<dyn AcademicStore>,
        fee_book: FeeScheduleBook,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            fee_book: Arc::new(fee_book),
            notifier,
        }
    }

    /// Engine over the built-in fee book, notifying into the log stream.
    pub fn with_defaults(store: Arc<dyn AcademicStore>) -> Self {
        Self::new(store, FeeScheduleBook::builtin(), Arc::new(TracingNotifier))
    }

    pub fn fee_book(&self) -> &FeeScheduleBook {
        &self.fee_book
    }

    pub(crate) fn store(&self) -> &dyn AcademicStore {
        self.store.as_ref()
    }

    /// Fire-and-forget delivery, only ever called after a successful commit.
    /// A sink failure is logged and never fails the operation.
    pub(crate) async fn emit(&self, notification: Notification) {
        if let Err(err) = self.notifier.deliver(notification).await {
            warn!("Notification delivery failed: {err:#}");
        }
    }
}
