//! `prlink-recon`: record linkage over four independently-sourced PR tables.
//!
//! Pure engine crate: receives pre-loaded tables, returns the linked result
//! and a run summary. Diagnostics go to a caller-supplied sink. No CLI or
//! logging backend dependencies.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod resolver;
pub mod table;

pub use classify::SecurityClassifier;
pub use config::LinkConfig;
pub use engine::run;
pub use error::LinkError;
pub use model::{Diagnostic, DiagnosticSink, FinalRecord, LinkInput, LinkResult, Stage};
pub use table::Table;
