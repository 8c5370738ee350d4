//! reporter - an asynchronous report generation worker.
//!
//! The worker consumes report-generation messages from an upstream queue,
//! resolves a template by id, fans out queries across heterogeneous data
//! sources, renders through the extended template dialect, optionally
//! converts to PDF, persists the artifact and records terminal status.
//!
//! External collaborators — message transport, database drivers, the object
//! store, the PDF converter — are specified as contracts ([`queue`],
//! [`pdf`], the repository and store traits in the member crates) and wired
//! in by the host process.

pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod pdf;
pub mod pipeline;
pub mod queue;
pub mod worker;

// Core types and errors used by external consumers
pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{Outcome, Pipeline};
pub use worker::WorkerPool;
