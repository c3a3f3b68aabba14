//! Function-call formulas extracted from expression text.

/// One function call as written: `NAME(body)` or a bare `NAME`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionFormula {
    /// Function name as written, possibly qualified (`DBMS_RANDOM.VALUE`).
    pub name: String,
    /// Text between the outer parentheses; empty without parentheses.
    pub body: String,
    pub has_parentheses: bool,
    /// The full matched expression.
    pub expression: String,
}

impl FunctionFormula {
    /// Split a call expression into name and argument body.
    ///
    /// Returns `None` for text that is not a call: unbalanced parentheses or
    /// anything after the closing parenthesis.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let Some(open) = text.find('(') else {
            if text.is_empty() {
                return None;
            }
            return Some(Self {
                name: text.to_string(),
                body: String::new(),
                has_parentheses: false,
                expression: text.to_string(),
            });
        };
        let name = text[..open].trim();
        if name.is_empty() || closing_paren(text, open)? != text.len() - 1 {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            body: text[open + 1..text.len() - 1].to_string(),
            has_parentheses: true,
            expression: text.to_string(),
        })
    }

    /// Upper-cased name used for specification lookups.
    pub fn key(&self) -> String {
        self.name.to_ascii_uppercase()
    }

    pub fn arguments(&self) -> Vec<String> {
        split_arguments(&self.body)
    }
}

/// Byte index of the parenthesis closing the one at `open`, skipping quoted text.
fn closing_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices().skip_while(|(i, _)| *i < open) {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split an argument list at top-level commas. Quoted commas and commas inside
/// nested parentheses do not split. An empty body has no arguments.
pub fn split_arguments(body: &str) -> Vec<String> {
    if body.trim().is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in body.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(body[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(body[start..].trim().to_string());
    out
}

/// Split `body` at the first top-level occurrence of keyword `word`
/// (case-insensitive, delimited by whitespace).
pub fn split_keyword<'a>(body: &'a str, word: &str) -> Option<(&'a str, &'a str)> {
    let upper = body.to_ascii_uppercase();
    let needle = word.to_ascii_uppercase();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, ch) in body.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && upper[i..].starts_with(&needle) => {
                let before_ok = i == 0 || body[..i].ends_with(char::is_whitespace);
                let after = i + needle.len();
                let after_ok = body[after..].starts_with(char::is_whitespace);
                if before_ok && after_ok {
                    return Some((body[..i].trim(), body[after..].trim()));
                }
            }
            _ => {}
        }
    }
    None
}

/// Collapse the `()()` left behind when an empty call gains parentheses twice.
pub fn collapse_empty_calls(text: &str) -> String {
    let mut out = text.to_string();
    while out.contains("()()") {
        out = out.replace("()()", "()");
    }
    out
}
