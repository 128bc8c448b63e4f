//! ACADOPS - Academic Operations Engine
//!
//! Business rules for a university administration portal: programme fee
//! resolution, the student fee ledger, registration eligibility gating,
//! timetable conflict detection and grade/GPA aggregation, composed behind
//! one orchestrator.
//!
//! The engine is written against the [`store::AcademicStore`] seam; the
//! bundled [`store::MemoryStore`] backs tests and the harness binary, and
//! the Postgres adapter ships behind the `database` feature.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use acadops::engine::AcademicEngine;
//! use acadops::store::MemoryStore;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let engine = AcademicEngine::with_defaults(Arc::new(MemoryStore::new()));
//! let student_id = uuid::Uuid::new_v4();
//! let items = engine
//!     .create_schedule_fees(student_id, "BACHELOR OF SCIENCE (COMPUTER SCIENCE)")
//!     .await?;
//! assert_eq!(items.len(), 6);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Domain entities and status enums
pub mod models;

// Fee schedule book configuration
pub mod config;

// Data-store seam and adapters
pub mod store;

// The engine itself: fees, registration, timetable, grades
pub mod engine;

// Post-commit notification delivery
pub mod notify;

pub use engine::AcademicEngine;
pub use error::{EngineError, EngineResult, StoreError};
