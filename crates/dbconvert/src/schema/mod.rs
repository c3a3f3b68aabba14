//! Schema snapshots, target schema derivation and DDL generation.

mod ddl;
mod mapping;
mod types;

pub use ddl::{terminate, DdlGenerator, DdlStatement};
pub use mapping::{compute_target_schema, missing_schemas, target_schema_name, target_table, DialectPair};
pub use types::*;
