//! Source-text fragments carried by statements.
//!
//! A [`Token`] keeps the text of one syntactic role (a condition, a table name,
//! a select item...) exactly as written, plus the identifier and function-call
//! references found inside it. Child tokens record their byte span within the
//! parent text, which lets rewrites replace a single reference without touching
//! look-alike substrings elsewhere in the fragment.

use std::fmt;
use std::ops::Range;

/// Semantic role of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Free expression (select item, value, argument).
    Expression,
    /// Boolean condition (WHERE, IF, WHEN, ON).
    Condition,
    TableName,
    ColumnName,
    VariableName,
    ParameterName,
    CursorName,
    RoutineName,
    DataType,
    Alias,
    /// Derived table or scalar subquery text.
    Subquery,
    /// Identifier reference discovered inside an expression.
    Identifier,
    /// Function call discovered inside an expression.
    FunctionCall,
}

impl TokenKind {
    /// Whether the whole token text is a single (possibly qualified) name.
    pub fn is_name(&self) -> bool {
        matches!(
            self,
            TokenKind::TableName
                | TokenKind::ColumnName
                | TokenKind::VariableName
                | TokenKind::ParameterName
                | TokenKind::CursorName
                | TokenKind::RoutineName
                | TokenKind::Alias
        )
    }
}

/// A source-text fragment with a semantic tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// References found inside `text`, ordered by position.
    pub children: Vec<Token>,
    /// Byte range within the parent token's text, for children.
    pub span: Option<Range<usize>>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            children: Vec::new(),
            span: None,
        }
    }

    pub fn expression(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Expression, text)
    }

    pub fn condition(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Condition, text)
    }

    pub fn with_children(mut self, children: Vec<Token>) -> Self {
        self.children = children;
        self
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Identifier references inside the token.
    pub fn identifiers(&self) -> impl Iterator<Item = &Token> {
        self.children
            .iter()
            .filter(|c| c.kind == TokenKind::Identifier)
    }

    /// Function calls inside the token.
    pub fn function_calls(&self) -> impl Iterator<Item = &Token> {
        self.children
            .iter()
            .filter(|c| c.kind == TokenKind::FunctionCall)
    }

    /// Replace child references in place.
    ///
    /// `rewrite` is asked for every child; a returned string replaces the
    /// child's span in `text`. Children whose span overlaps an earlier
    /// replacement are left alone. Spans of all children are shifted so they
    /// stay valid for later rewrites. Returns the number of replacements.
    pub fn rewrite_children<F>(&mut self, mut rewrite: F) -> usize
    where
        F: FnMut(&Token) -> Option<String>,
    {
        let mut edits: Vec<(Range<usize>, String, usize)> = Vec::new();
        for (idx, child) in self.children.iter().enumerate() {
            let Some(span) = child.span.clone() else {
                continue;
            };
            if span.end > self.text.len() || !self.text.is_char_boundary(span.start) {
                continue;
            }
            if edits.iter().any(|(r, _, _)| r.start < span.end && span.start < r.end) {
                continue;
            }
            if let Some(replacement) = rewrite(child) {
                if replacement != child.text {
                    edits.push((span, replacement, idx));
                }
            }
        }
        if edits.is_empty() {
            return 0;
        }
        edits.sort_by_key(|(r, _, _)| r.start);

        let mut text = String::with_capacity(self.text.len());
        let mut last = 0;
        for (range, replacement, _) in &edits {
            text.push_str(&self.text[last..range.start]);
            text.push_str(replacement);
            last = range.end;
        }
        text.push_str(&self.text[last..]);

        let shift = |pos: usize| -> usize {
            let mut out = pos as isize;
            for (range, replacement, _) in &edits {
                let delta = replacement.len() as isize - range.len() as isize;
                if range.end <= pos {
                    out += delta;
                } else if range.start < pos {
                    // Position inside a replaced range collapses to its start.
                    out = out - (pos - range.start) as isize;
                    break;
                }
            }
            out.max(0) as usize
        };

        for (idx, child) in self.children.iter_mut().enumerate() {
            let Some(span) = child.span.clone() else {
                continue;
            };
            if let Some((range, replacement, _)) = edits.iter().find(|(_, _, i)| *i == idx) {
                let start = shift(range.start);
                child.text = replacement.clone();
                child.span = Some(start..start + replacement.len());
            } else {
                let (start, end) = (shift(span.start), shift(span.end));
                if let Some(slice) = text.get(start..end) {
                    child.text = slice.to_string();
                }
                child.span = Some(start..end);
            }
        }
        self.text = text;
        edits.len()
    }

    /// Stable, indented dump of the token tree for diagnostics.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, 0);
        out
    }

    fn pretty_into(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{:?} {:?}", self.kind, self.text));
        if let Some(span) = &self.span {
            out.push_str(&format!(" @{}..{}", span.start, span.end));
        }
        out.push('\n');
        for child in &self.children {
            child.pretty_into(out, depth + 1);
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
