//! Text output helpers shared by the emitters.

use std::collections::HashSet;

const INDENT: &str = "    ";

/// Line-oriented script builder with indentation.
#[derive(Debug, Default)]
pub struct ScriptWriter {
    lines: Vec<String>,
    depth: usize,
}

impl ScriptWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at the current indentation. Embedded newlines are
    /// indented too.
    pub fn line(&mut self, text: impl AsRef<str>) {
        for part in text.as_ref().lines() {
            if part.trim().is_empty() {
                self.lines.push(String::new());
            } else {
                self.lines.push(format!("{}{}", INDENT.repeat(self.depth), part));
            }
        }
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` one level deeper.
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.indent();
        let out = f(self);
        self.dedent();
        out
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drop lines written after `mark`.
    pub fn truncate(&mut self, mark: usize) {
        self.lines.truncate(mark);
    }

    /// Take the lines written after `mark`, leaving the writer at `mark`.
    pub fn split_off(&mut self, mark: usize) -> Vec<String> {
        self.lines.split_off(mark)
    }

    pub fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// Fresh loop labels for one render call.
///
/// Labels are numbered from 1 in creation order and never repeat a label that
/// the script already uses.
#[derive(Debug)]
pub struct LabelGenerator {
    prefix: &'static str,
    next: usize,
    taken: HashSet<String>,
}

impl LabelGenerator {
    pub fn new(prefix: &'static str, taken: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefix,
            next: 1,
            taken: taken.into_iter().map(|l| l.to_ascii_lowercase()).collect(),
        }
    }

    pub fn fresh(&mut self) -> String {
        loop {
            let label = format!("{}{}", self.prefix, self.next);
            self.next += 1;
            if self.taken.insert(label.to_ascii_lowercase()) {
                return label;
            }
        }
    }
}

/// Quote text as a single-quoted SQL string literal.
pub fn string_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
