//! Parsed database objects.
//!
//! A [`Script`] is one translated object: a routine, a view, a trigger or a
//! free-standing block of statements. Adapters build it, the function
//! translator rewrites its tokens, emitters render it.

use serde::{Deserialize, Serialize};

use super::statement::{SelectStatement, Statement};
use super::token::Token;

/// Direction of a routine parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    #[default]
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: Token,
    pub data_type: Token,
    pub direction: ParameterDirection,
    pub default: Option<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    Procedure,
    Function,
}

/// Header shared by every named script.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectName {
    /// Schema or owner; empty when the source named none.
    pub schema: String,
    pub name: String,
}

impl ObjectName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// `schema.name`, or just `name`.
    pub fn qualified(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutineScript {
    pub kind: RoutineKind,
    pub name: ObjectName,
    pub parameters: Vec<Parameter>,
    /// Declared return type, for functions.
    pub return_type: Option<Token>,
    /// Declarations and exception handlers lifted out of the body.
    pub declarations: Vec<Statement>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewScript {
    pub name: ObjectName,
    pub columns: Vec<Token>,
    pub query: SelectStatement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

impl TriggerTiming {
    pub fn keyword(&self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
            TriggerTiming::InsteadOf => "INSTEAD OF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    pub fn keyword(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerScript {
    pub name: ObjectName,
    pub table: Token,
    pub timing: TriggerTiming,
    pub events: Vec<TriggerEvent>,
    pub for_each_row: bool,
    /// `WHEN (...)` row filter.
    pub condition: Option<Token>,
    pub declarations: Vec<Statement>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommonScript {
    pub declarations: Vec<Statement>,
    pub statements: Vec<Statement>,
}

/// One fully parsed database object.
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    Routine(RoutineScript),
    View(ViewScript),
    Trigger(TriggerScript),
    Common(CommonScript),
}

impl Script {
    /// Object name, empty for common blocks.
    pub fn name(&self) -> String {
        match self {
            Script::Routine(r) => r.name.qualified(),
            Script::View(v) => v.name.qualified(),
            Script::Trigger(t) => t.name.qualified(),
            Script::Common(_) => String::new(),
        }
    }

    pub fn object_name_mut(&mut self) -> Option<&mut ObjectName> {
        match self {
            Script::Routine(r) => Some(&mut r.name),
            Script::View(v) => Some(&mut v.name),
            Script::Trigger(t) => Some(&mut t.name),
            Script::Common(_) => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Script::Routine(r) if r.kind == RoutineKind::Function => "function",
            Script::Routine(_) => "procedure",
            Script::View(_) => "view",
            Script::Trigger(_) => "trigger",
            Script::Common(_) => "script",
        }
    }

    pub fn declarations(&self) -> &[Statement] {
        match self {
            Script::Routine(r) => &r.declarations,
            Script::Trigger(t) => &t.declarations,
            Script::Common(c) => &c.declarations,
            Script::View(_) => &[],
        }
    }

    pub fn statements(&self) -> &[Statement] {
        match self {
            Script::Routine(r) => &r.statements,
            Script::Trigger(t) => &t.statements,
            Script::Common(c) => &c.statements,
            Script::View(_) => &[],
        }
    }

    /// Mutable access to the declaration and statement lists.
    pub fn bodies_mut(&mut self) -> Option<(&mut Vec<Statement>, &mut Vec<Statement>)> {
        match self {
            Script::Routine(r) => Some((&mut r.declarations, &mut r.statements)),
            Script::Trigger(t) => Some((&mut t.declarations, &mut t.statements)),
            Script::Common(c) => Some((&mut c.declarations, &mut c.statements)),
            Script::View(_) => None,
        }
    }

    /// Visit every token of the script: header, declarations and body.
    pub fn visit_tokens_mut(&mut self, f: &mut dyn FnMut(&mut Token)) {
        match self {
            Script::Routine(r) => {
                for p in &mut r.parameters {
                    f(&mut p.name);
                    f(&mut p.data_type);
                    if let Some(d) = &mut p.default {
                        f(d);
                    }
                }
                if let Some(rt) = &mut r.return_type {
                    f(rt);
                }
            }
            Script::View(v) => {
                v.columns.iter_mut().for_each(&mut *f);
                v.query.visit_tokens_mut(f);
            }
            Script::Trigger(t) => {
                f(&mut t.table);
                if let Some(c) = &mut t.condition {
                    f(c);
                }
            }
            Script::Common(_) => {}
        }
        if let Some((declarations, statements)) = self.bodies_mut() {
            for stmt in declarations.iter_mut().chain(statements.iter_mut()) {
                stmt.visit_tokens_mut(f);
            }
        }
    }

    /// Stable dump of every token for diagnostics.
    pub fn pretty(&self) -> String {
        let mut copy = self.clone();
        let mut out = format!("{} {}\n", self.kind_name(), self.name());
        copy.visit_tokens_mut(&mut |t| out.push_str(&t.pretty()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::statement::ReturnStatement;
    use crate::model::TokenKind;

    fn function() -> Script {
        Script::Routine(RoutineScript {
            kind: RoutineKind::Function,
            name: ObjectName::new("hr", "F"),
            parameters: vec![Parameter {
                name: Token::new(TokenKind::ParameterName, "a"),
                data_type: Token::new(TokenKind::DataType, "NUMBER"),
                direction: ParameterDirection::In,
                default: None,
            }],
            return_type: Some(Token::new(TokenKind::DataType, "NUMBER")),
            declarations: vec![],
            statements: vec![Statement::Return(ReturnStatement {
                value: Some(Token::expression("NVL(a,0)")),
            })],
        })
    }

    #[test]
    fn test_name_and_kind() {
        let script = function();
        assert_eq!(script.name(), "hr.F");
        assert_eq!(script.kind_name(), "function");
        assert_eq!(script.statements().len(), 1);
    }

    #[test]
    fn test_visit_covers_header_and_body() {
        let mut script = function();
        let mut count = 0;
        script.visit_tokens_mut(&mut |_| count += 1);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_pretty_lists_tokens() {
        let dump = function().pretty();
        assert!(dump.starts_with("function hr.F\n"));
        assert!(dump.contains("Expression \"NVL(a,0)\""));
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let original = function();
        let mut copy = original.clone();
        copy.visit_tokens_mut(&mut |t| t.text.make_ascii_lowercase());
        assert_ne!(copy, original);
        assert_eq!(original.name(), "hr.F");
    }
}
