//! Cross-dialect function call translation.
//!
//! - [`formula`]: call extraction and argument splitting
//! - [`specs`]: per-dialect function tables and the cross-dialect mapping rows
//! - [`translator`]: the rewrite itself
//!
//! ```rust
//! use dbconvert::dialect::DatabaseType;
//! use dbconvert::function::translate;
//!
//! let out = translate("NVL(a,0)", DatabaseType::Oracle, DatabaseType::MySql);
//! assert_eq!(out, "IFNULL(a,0)");
//! ```

pub mod formula;
pub mod specs;
pub mod translator;

pub use formula::FunctionFormula;
pub use specs::{FunctionMapping, FunctionSpecification};
pub use translator::{translate, FunctionTranslator};
