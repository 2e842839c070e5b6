//! Pipeline module.
//!
//! This module provides the batch compiler and the unification and diagnostics
//! steps it relies on.

mod compiler;
mod unify;

pub use compiler::{CompiledReport, FileFailure, ReportCompiler, ReportCompilerBuilder};
pub use unify::{
    FileDiagnostics, ParseDiagnostics, UnmappedReview, display_delimiter, unify_tables,
};
