//! Dialect-neutral statement model.
//!
//! - [`token`]: text fragments with semantic tags and child references
//! - [`statement`]: the closed set of statement variants
//! - [`script`]: routines, views, triggers and common blocks

pub mod script;
pub mod statement;
pub mod token;

pub use script::{
    CommonScript, ObjectName, Parameter, ParameterDirection, RoutineKind, RoutineScript, Script,
    TriggerEvent, TriggerScript, TriggerTiming, ViewScript,
};
pub use statement::*;
pub use token::{Token, TokenKind};
