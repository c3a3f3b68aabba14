//! Rewrites function calls from one dialect's spelling to another's.

use std::collections::HashMap;
use std::ops::Range;

use tracing::debug;

use super::formula::{collapse_empty_calls, split_keyword, FunctionFormula};
use super::specs::{self, normalize_unit, FunctionMapping, MappingEntry, Shape, MAPPINGS};
use crate::dialect::DatabaseType;
use crate::model::{Token, TokenKind};
use crate::parser::scan_references;

/// A call in canonical form: the concept's arguments in canonical order, plus
/// the date unit for date concepts.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CanonicalCall {
    unit: Option<&'static str>,
    args: Vec<String>,
}

/// Function translator for one (source, target) dialect pair.
///
/// The lookup tables are built once in [`FunctionTranslator::new`] and are
/// read-only afterwards, so one translator serves a whole conversion session.
pub struct FunctionTranslator {
    source: DatabaseType,
    target: DatabaseType,
    /// Upper-cased source spelling to its mapping row and entry.
    readers: HashMap<String, (&'static FunctionMapping, &'static MappingEntry)>,
}

impl FunctionTranslator {
    pub fn new(source: DatabaseType, target: DatabaseType) -> Self {
        let mut readers = HashMap::new();
        if source != target {
            for mapping in MAPPINGS {
                for entry in mapping.readers(source) {
                    readers
                        .entry(entry.name.to_ascii_uppercase())
                        .or_insert((mapping, entry));
                }
            }
        }
        Self {
            source,
            target,
            readers,
        }
    }

    pub fn source(&self) -> DatabaseType {
        self.source
    }

    pub fn target(&self) -> DatabaseType {
        self.target
    }

    /// Whether translation leaves every expression unchanged.
    pub fn is_noop(&self) -> bool {
        self.source == self.target
    }

    /// Translate every function call in an expression.
    ///
    /// Text that the scanner cannot tokenize is returned unchanged.
    pub fn translate(&self, text: &str) -> String {
        if self.is_noop() || text.trim().is_empty() {
            return text.to_string();
        }
        let children = match scan_references(self.source, text) {
            Ok(children) => children,
            Err(e) => {
                debug!("Leaving expression untranslated ({}): {}", e, text);
                return text.to_string();
            }
        };
        let mut token = Token::expression(text).with_children(children);
        self.rewrite_references(&mut token);
        token.text
    }

    /// Translate the function calls referenced by a token's children.
    ///
    /// After a rewrite the children are rescanned in the target dialect so
    /// later identifier rewrites see the new text. Returns the number of
    /// calls rewritten.
    pub fn translate_token(&self, token: &mut Token) -> usize {
        if self.is_noop() || token.children.is_empty() {
            return 0;
        }
        let rewritten = self.rewrite_references(token);
        if rewritten > 0 {
            match scan_references(self.target, &token.text) {
                Ok(children) => token.children = children,
                Err(e) => debug!("Could not rescan translated text ({}): {}", e, token.text),
            }
        }
        rewritten
    }

    /// Rewrite top-level calls left to right. A child inside a call that was
    /// already visited is covered by that call's recursive rewrite.
    fn rewrite_references(&self, token: &mut Token) -> usize {
        let mut covered: Vec<Range<usize>> = Vec::new();
        token.rewrite_children(|child| {
            let span = child.span.clone()?;
            if covered
                .iter()
                .any(|r| r.start <= span.start && span.end <= r.end)
            {
                return None;
            }
            match child.kind {
                TokenKind::FunctionCall => {
                    covered.push(span);
                    self.rewrite_call(&child.text)
                }
                TokenKind::Identifier => self.rewrite_bare(&child.text),
                _ => None,
            }
        })
    }

    /// `NAME(body)`: translate the body, then the call itself.
    fn rewrite_call(&self, text: &str) -> Option<String> {
        let formula = FunctionFormula::parse(text)?;
        let body = self.translate(&formula.body);
        let rewritten = self
            .map_formula(&formula, &body)
            .unwrap_or_else(|| format!("{}({})", formula.name, body));
        let rewritten = collapse_empty_calls(&rewritten);
        (rewritten != text).then_some(rewritten)
    }

    /// A bare name is a call only when the source dialect calls it without
    /// parentheses.
    fn rewrite_bare(&self, text: &str) -> Option<String> {
        let spec = specs::find(self.source, text.trim())?;
        if !spec.no_parentheses {
            return None;
        }
        let formula = FunctionFormula::parse(text)?;
        self.map_formula(&formula, "")
            .map(|s| collapse_empty_calls(&s))
            .filter(|s| s != text)
    }

    /// Map a formula through its canonical form to the target spelling.
    fn map_formula(&self, formula: &FunctionFormula, body: &str) -> Option<String> {
        let (mapping, reader) = self.readers.get(&formula.key())?;
        let writer = mapping.writer(self.target)?;
        if reader.shape == Shape::Args && writer.shape == Shape::Args {
            return Some(self.call(writer.name, body));
        }
        let canonical = read(reader.shape, body)?;
        let written = self.write(writer, &canonical);
        if written.is_none() {
            debug!(
                "No {} spelling of {} for unit {:?}",
                self.target, mapping.concept, canonical.unit
            );
        }
        written
    }

    /// Render `name(body)`, or the bare name when the target calls it so.
    fn call(&self, name: &str, body: &str) -> String {
        let bare = body.trim().is_empty()
            && specs::find(self.target, name).is_some_and(|s| s.no_parentheses);
        if bare {
            name.to_string()
        } else {
            format!("{}({})", name, body)
        }
    }

    fn write(&self, writer: &MappingEntry, call: &CanonicalCall) -> Option<String> {
        let args = &call.args;
        let unit = call.unit;
        let text = match writer.shape {
            Shape::Args => self.call(writer.name, &args.join(", ")),
            Shape::SwappedArgs => {
                let mut args = args.clone();
                if args.len() >= 2 {
                    args.swap(0, 1);
                }
                self.call(writer.name, &args.join(", "))
            }
            Shape::UnitFirst => {
                let mut parts = vec![unit_literal(self.target, writer.name, unit?)];
                parts.extend(args.iter().cloned());
                format!("{}({})", writer.name, parts.join(", "))
            }
            Shape::ExtractFrom => {
                format!("{}({} FROM {})", writer.name, unit?, args.first()?)
            }
            Shape::ExtractFixed(fixed) => {
                if unit? != fixed {
                    return None;
                }
                format!("{}({})", writer.name, args.first()?)
            }
            Shape::IntervalAdd => {
                let [n, d] = pair(args)?;
                format!("{}({}, INTERVAL {} {})", writer.name, d, n, unit?)
            }
            Shape::AddMonths => {
                let [n, d] = pair(args)?;
                match unit? {
                    "MONTH" => format!("{}({}, {})", writer.name, d, n),
                    "YEAR" => format!("{}({}, ({}) * 12)", writer.name, d, n),
                    "QUARTER" => format!("{}({}, ({}) * 3)", writer.name, d, n),
                    "WEEK" => format!("({} + ({}) * 7)", d, n),
                    "DAY" => format!("({} + ({}))", d, n),
                    "HOUR" => format!("({} + ({}) / 24)", d, n),
                    "MINUTE" => format!("({} + ({}) / 1440)", d, n),
                    "SECOND" => format!("({} + ({}) / 86400)", d, n),
                    _ => return None,
                }
            }
            Shape::IntervalArithmetic => {
                let [n, d] = pair(args)?;
                let interval = match unit? {
                    "QUARTER" => "3 month".to_string(),
                    other => format!("1 {}", other.to_ascii_lowercase()),
                };
                format!("({} + ({}) * INTERVAL '{}')", d, n, interval)
            }
            Shape::DayDiff => {
                if unit? != "DAY" {
                    return None;
                }
                let [start, end] = pair(args)?;
                format!("{}({}, {})", writer.name, end, start)
            }
            Shape::DateSubtraction => {
                let [start, end] = pair(args)?;
                match unit? {
                    "DAY" => format!("({} - {})", end, start),
                    "MONTH" => format!("MONTHS_BETWEEN({}, {})", end, start),
                    "YEAR" => format!("(MONTHS_BETWEEN({}, {}) / 12)", end, start),
                    "HOUR" => format!("(({} - {}) * 24)", end, start),
                    "MINUTE" => format!("(({} - {}) * 1440)", end, start),
                    "SECOND" => format!("(({} - {}) * 86400)", end, start),
                    _ => return None,
                }
            }
            Shape::CastDateSubtraction => {
                let [start, end] = pair(args)?;
                let years = format!(
                    "(DATE_PART('year', {}) - DATE_PART('year', {}))",
                    end, start
                );
                match unit? {
                    "DAY" => format!("(CAST({} AS DATE) - CAST({} AS DATE))", end, start),
                    "YEAR" => years,
                    "MONTH" => format!(
                        "({} * 12 + DATE_PART('month', {}) - DATE_PART('month', {}))",
                        years, end, start
                    ),
                    "HOUR" => format!("(EXTRACT(EPOCH FROM ({} - {})) / 3600)", end, start),
                    "MINUTE" => format!("(EXTRACT(EPOCH FROM ({} - {})) / 60)", end, start),
                    "SECOND" => format!("EXTRACT(EPOCH FROM ({} - {}))", end, start),
                    _ => return None,
                }
            }
            Shape::Modulo => {
                let [a, b] = pair(args)?;
                format!("({} % {})", a, b)
            }
            Shape::Concatenation => {
                if args.len() == 2 {
                    self.call(writer.name, &args.join(", "))
                } else {
                    format!("({})", args.join(" || "))
                }
            }
            Shape::LeadingSubstr => {
                let [s, n] = pair(args)?;
                format!("SUBSTR({}, 1, {})", s, n)
            }
            Shape::TrailingSubstr => {
                let [s, n] = pair(args)?;
                format!("SUBSTR({}, -({}))", s, n)
            }
            Shape::CaseWhen => {
                let [c, a, b] = <[String; 3]>::try_from(args.clone()).ok()?;
                format!("CASE WHEN {} THEN {} ELSE {} END", c, a, b)
            }
            Shape::Decode => {
                let (subject, rest) = args.split_first()?;
                if rest.len() < 2 {
                    return None;
                }
                let mut out = format!("CASE {}", subject);
                let mut pairs = rest.chunks_exact(2);
                for arm in pairs.by_ref() {
                    out.push_str(&format!(" WHEN {} THEN {}", arm[0], arm[1]));
                }
                if let [default] = pairs.remainder() {
                    out.push_str(&format!(" ELSE {}", default));
                }
                out.push_str(" END");
                out
            }
        };
        Some(text)
    }
}

/// Translate one expression without keeping a translator around.
pub fn translate(text: &str, source: DatabaseType, target: DatabaseType) -> String {
    FunctionTranslator::new(source, target).translate(text)
}

fn pair(args: &[String]) -> Option<[String; 2]> {
    <[String; 2]>::try_from(args.to_vec()).ok()
}

/// Date units are keywords everywhere except PostgreSQL `DATE_PART`.
fn unit_literal(db: DatabaseType, name: &str, unit: &str) -> String {
    if db == DatabaseType::Postgres && name.eq_ignore_ascii_case("DATE_PART") {
        format!("'{}'", unit.to_ascii_lowercase())
    } else {
        unit.to_string()
    }
}

/// Read a call body into canonical form.
fn read(shape: Shape, body: &str) -> Option<CanonicalCall> {
    let mut args = super::formula::split_arguments(body);
    let plain = |args: Vec<String>| Some(CanonicalCall { unit: None, args });
    match shape {
        Shape::Args | Shape::Concatenation => plain(args),
        Shape::SwappedArgs => {
            if args.len() >= 2 {
                args.swap(0, 1);
            }
            plain(args)
        }
        Shape::UnitFirst => {
            if args.is_empty() {
                return None;
            }
            let unit = normalize_unit(&args.remove(0))?;
            Some(CanonicalCall {
                unit: Some(unit),
                args,
            })
        }
        Shape::ExtractFrom => {
            let (unit, date) = split_keyword(body, "FROM")?;
            Some(CanonicalCall {
                unit: Some(normalize_unit(unit)?),
                args: vec![date.to_string()],
            })
        }
        Shape::ExtractFixed(unit) => Some(CanonicalCall {
            unit: Some(unit),
            args,
        }),
        Shape::IntervalAdd => {
            let [d, interval] = pair(&args)?;
            let rest = interval.trim();
            if !rest.get(..9)?.eq_ignore_ascii_case("INTERVAL ") {
                return None;
            }
            let (n, unit) = rest[9..].trim().rsplit_once(char::is_whitespace)?;
            Some(CanonicalCall {
                unit: Some(normalize_unit(unit)?),
                args: vec![n.trim().trim_matches('\'').to_string(), d],
            })
        }
        Shape::AddMonths => {
            let [d, n] = pair(&args)?;
            Some(CanonicalCall {
                unit: Some("MONTH"),
                args: vec![n, d],
            })
        }
        Shape::DayDiff => {
            let [end, start] = pair(&args)?;
            Some(CanonicalCall {
                unit: Some("DAY"),
                args: vec![start, end],
            })
        }
        Shape::IntervalArithmetic
        | Shape::DateSubtraction
        | Shape::CastDateSubtraction
        | Shape::Modulo
        | Shape::LeadingSubstr
        | Shape::TrailingSubstr
        | Shape::CaseWhen
        | Shape::Decode => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DatabaseType::*;

    #[test]
    fn test_nvl_to_ifnull_keeps_arguments() {
        assert_eq!(translate("NVL(a,0)", Oracle, MySql), "IFNULL(a,0)");
        assert_eq!(translate("NVL(a, 0) + 1", Oracle, SqlServer), "ISNULL(a, 0) + 1");
    }

    #[test]
    fn test_same_dialect_is_identity() {
        let exprs = [
            "NVL(a, 0)",
            "DATEADD(day, 1, GETDATE())",
            "IFNULL(x, CONCAT(a, b))",
            "COALESCE(a, NOW())",
        ];
        for db in DatabaseType::ALL {
            for expr in exprs {
                assert_eq!(translate(expr, db, db), expr);
            }
        }
    }

    #[test]
    fn test_charindex_swaps_arguments() {
        assert_eq!(translate("CHARINDEX('x', name)", SqlServer, Postgres), "STRPOS(name, 'x')");
        assert_eq!(translate("CHARINDEX('x', name)", SqlServer, MySql), "INSTR(name, 'x')");
        assert_eq!(translate("INSTR(name, 'x')", Oracle, SqlServer), "CHARINDEX('x', name)");
    }

    #[test]
    fn test_dateadd_forms() {
        assert_eq!(
            translate("DATEADD(dd, 7, created)", SqlServer, MySql),
            "DATE_ADD(created, INTERVAL 7 DAY)"
        );
        assert_eq!(
            translate("DATEADD(month, n, created)", SqlServer, Oracle),
            "ADD_MONTHS(created, n)"
        );
        assert_eq!(
            translate("DATE_ADD(d, INTERVAL 2 HOUR)", MySql, Postgres),
            "(d + (2) * INTERVAL '1 hour')"
        );
        assert_eq!(
            translate("ADD_MONTHS(d, 3)", Oracle, SqlServer),
            "DATEADD(MONTH, 3, d)"
        );
    }

    #[test]
    fn test_datediff_and_datepart() {
        assert_eq!(
            translate("DATEDIFF(day, a, b)", SqlServer, MySql),
            "TIMESTAMPDIFF(DAY, a, b)"
        );
        assert_eq!(translate("DATEDIFF(day, a, b)", SqlServer, Oracle), "(b - a)");
        assert_eq!(translate("DATEDIFF(b, a)", MySql, SqlServer), "DATEDIFF(DAY, a, b)");
        assert_eq!(
            translate("EXTRACT(YEAR FROM d)", Oracle, SqlServer),
            "DATEPART(YEAR, d)"
        );
        assert_eq!(translate("YEAR(d)", SqlServer, Postgres), "EXTRACT(YEAR FROM d)");
        assert_eq!(
            translate("DATEPART(mm, d)", SqlServer, Postgres),
            "EXTRACT(MONTH FROM d)"
        );
    }

    #[test]
    fn test_no_parentheses_functions() {
        assert_eq!(translate("SYSDATE", Oracle, SqlServer), "GETDATE()");
        assert_eq!(translate("SYSDATE - 1", Oracle, Postgres), "NOW() - 1");
        assert_eq!(translate("GETDATE()", SqlServer, Oracle), "SYSDATE");
        assert_eq!(translate("SUSER_SNAME()", SqlServer, Postgres), "CURRENT_USER");
        assert_eq!(translate("NOW()", MySql, Postgres), "NOW()");
    }

    #[test]
    fn test_nested_calls_rewritten_once() {
        assert_eq!(
            translate("NVL(SUBSTR(s, 1, LENGTH(t)), 'x')", Oracle, SqlServer),
            "ISNULL(SUBSTRING(s, 1, LEN(t)), 'x')"
        );
        assert_eq!(
            translate("NVL(a, 0) + NVL(b, 0)", Oracle, MySql),
            "IFNULL(a, 0) + IFNULL(b, 0)"
        );
    }

    #[test]
    fn test_write_only_shapes() {
        assert_eq!(translate("x % 2", SqlServer, Oracle), "x % 2");
        assert_eq!(translate("MOD(x, 2)", Oracle, SqlServer), "(x % 2)");
        assert_eq!(translate("LEFT(s, 3)", SqlServer, Oracle), "SUBSTR(s, 1, 3)");
        assert_eq!(
            translate("IIF(a > 1, 'y', 'n')", SqlServer, Postgres),
            "CASE WHEN a > 1 THEN 'y' ELSE 'n' END"
        );
        assert_eq!(
            translate("DECODE(s, 1, 'a', 2, 'b', 'z')", Oracle, MySql),
            "CASE s WHEN 1 THEN 'a' WHEN 2 THEN 'b' ELSE 'z' END"
        );
        assert_eq!(translate("CONCAT(a, b, c)", SqlServer, Oracle), "(a || b || c)");
    }

    #[test]
    fn test_unknown_functions_and_columns_pass_through() {
        assert_eq!(translate("my_func(a, NVL(b, 0))", Oracle, MySql), "my_func(a, IFNULL(b, 0))");
        assert_eq!(translate("t.user + sysdate_col", Oracle, MySql), "t.user + sysdate_col");
    }

    #[test]
    fn test_translate_token_rescans_children() {
        let text = "NVL(a, 0) > b";
        let children = scan_references(Oracle, text).unwrap();
        let mut token = Token::condition(text).with_children(children);
        let translator = FunctionTranslator::new(Oracle, SqlServer);
        assert_eq!(translator.translate_token(&mut token), 1);
        assert_eq!(token.text, "ISNULL(a, 0) > b");
        let idents: Vec<_> = token.identifiers().map(|t| t.text.as_str()).collect();
        assert_eq!(idents, vec!["a", "b"]);
    }
}
