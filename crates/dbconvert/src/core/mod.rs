//! Core abstractions shared by the conversion pipeline.
//!
//! - [`traits`]: contracts of the source and target database collaborators
//! - [`value`]: SQL value representation for row transfer
//! - [`identifier`]: identifier validation, quoting and sigil handling

pub mod identifier;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use traits::{placeholder, ServerInfo, SourceDatabase, TargetDatabase};
pub use value::{Page, Row, SqlValue};
