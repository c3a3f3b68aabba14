//! Concrete syntax tree produced by the dialect grammars.
//!
//! Nodes keep their exact source text and position. Expression nodes carry
//! `Identifier` and `FunctionCall` children whose offsets are absolute, so the
//! adapters can turn them into child tokens with spans relative to the parent.

use crate::model::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    // ===== Units =====
    Script,
    Procedure,
    Function,
    Trigger,
    View,
    Block,

    // ===== Unit parts =====
    Name,
    ParameterList,
    Parameter,
    Mode,
    DataType,
    Default,
    ReturnType,
    DeclareSection,
    Body,
    ExceptionSection,
    Handler,
    Timing,
    Event,
    TableName,
    ForEachRow,
    ColumnList,
    Constant,

    // ===== Declarations =====
    VariableDecl,
    CursorDecl,
    TableVariableDecl,
    HandlerDecl,
    HandlerAction,
    ColumnDef,
    NotNull,

    // ===== Queries =====
    Select,
    With,
    Cte,
    Distinct,
    Top,
    SelectItem,
    Expression,
    Alias,
    AssignTarget,
    IntoVariables,
    IntoTable,
    From,
    TableRef,
    Subquery,
    Join,
    JoinType,
    On,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    Count,
    Union,
    UnionType,

    // ===== DML / DDL =====
    Insert,
    Values,
    Update,
    SetItem,
    Target,
    Value,
    Delete,
    Using,
    CreateTable,
    Temporary,
    Truncate,
    Drop,
    ObjectType,
    IfExists,

    // ===== Procedural =====
    Assignment,
    If,
    IfBranch,
    ElseBranch,
    Condition,
    Case,
    Selector,
    When,
    Loop,
    While,
    ForLoop,
    Reverse,
    Range,
    CursorName,
    Repeat,
    Label,
    Exit,
    Continue,
    Open,
    Fetch,
    Close,
    Deallocate,
    Return,
    Print,
    Raise,
    Code,
    Argument,
    Call,
    Perform,
    ExecuteDynamic,
    Prepare,
    ExecutePrepared,
    DeallocatePrepare,
    Goto,
    LabelDecl,
    Transaction,
    NestedBlock,
    TryCatch,
    TryBlock,
    CatchBlock,
    Null,
    Unknown,

    // ===== Expression references =====
    Identifier,
    FunctionCall,
}

/// A node of the concrete syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    /// Exact source text of the node.
    pub text: String,
    /// Byte offset of `text` in the source.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: SyntaxKind, text: impl Into<String>, offset: usize, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
            line,
            column,
            children: Vec::new(),
        }
    }

    /// Node with no source text of its own (markers, synthetic groups).
    pub fn marker(kind: SyntaxKind) -> Self {
        Self::new(kind, "", 0, 0, 0)
    }

    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        self.children = children;
        self
    }

    pub fn push(&mut self, child: SyntaxNode) {
        self.children.push(child);
    }

    /// First child of a kind.
    pub fn child(&self, kind: SyntaxKind) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// All children of a kind.
    pub fn children_of(&self, kind: SyntaxKind) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    pub fn has(&self, kind: SyntaxKind) -> bool {
        self.child(kind).is_some()
    }

    /// Text of the first child of a kind.
    pub fn child_text(&self, kind: SyntaxKind) -> Option<&str> {
        self.child(kind).map(|c| c.text.as_str())
    }

    /// Convert an expression node into a token of the given kind.
    ///
    /// `Identifier` and `FunctionCall` children become child tokens with spans
    /// relative to this node's text; other children are ignored.
    pub fn to_token(&self, kind: TokenKind) -> Token {
        let children = self
            .children
            .iter()
            .filter_map(|c| {
                let child_kind = match c.kind {
                    SyntaxKind::Identifier => TokenKind::Identifier,
                    SyntaxKind::FunctionCall => TokenKind::FunctionCall,
                    _ => return None,
                };
                let start = c.offset.checked_sub(self.offset)?;
                let end = start + c.text.len();
                if end > self.text.len() {
                    return None;
                }
                Some(Token {
                    span: Some(start..end),
                    ..Token::new(child_kind, c.text.clone())
                })
            })
            .collect();
        Token::new(kind, self.text.clone()).with_children(children)
    }

    /// Indented dump for debugging grammars.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, 0);
        out
    }

    fn pretty_into(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{:?}", self.kind));
        if !self.text.is_empty() && self.children.is_empty() {
            out.push_str(&format!(" {:?}", self.text));
        }
        out.push('\n');
        for child in &self.children {
            child.pretty_into(out, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_token_relative_spans() {
        let mut node = SyntaxNode::new(SyntaxKind::Expression, "NVL(a, 0)", 10, 1, 11);
        node.push(SyntaxNode::new(SyntaxKind::FunctionCall, "NVL(a, 0)", 10, 1, 11));
        node.push(SyntaxNode::new(SyntaxKind::Identifier, "a", 14, 1, 15));
        let token = node.to_token(TokenKind::Expression);
        assert_eq!(token.children.len(), 2);
        assert_eq!(token.children[1].span, Some(4..5));
        assert_eq!(token.children[0].kind, TokenKind::FunctionCall);
    }

    #[test]
    fn test_child_lookup() {
        let node = SyntaxNode::marker(SyntaxKind::If).with_children(vec![
            SyntaxNode::marker(SyntaxKind::IfBranch),
            SyntaxNode::marker(SyntaxKind::IfBranch),
            SyntaxNode::marker(SyntaxKind::ElseBranch),
        ]);
        assert_eq!(node.children_of(SyntaxKind::IfBranch).count(), 2);
        assert!(node.has(SyntaxKind::ElseBranch));
        assert!(node.child(SyntaxKind::Condition).is_none());
    }
}
