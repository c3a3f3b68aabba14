//! Queries and data manipulation statements shared by every dialect.

use super::cursor::Parser;
use super::tree::{SyntaxKind, SyntaxNode};
use crate::dialect::DatabaseType;
use crate::error::Result;

/// Words that end a query clause.
pub(super) const CLAUSE_STOPS: &[&str] = &[
    "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "UNION", "EXCEPT", "INTERSECT", "MINUS", "LIMIT",
    "OFFSET", "FETCH", "FOR", "INTO", "WINDOW", "CONNECT", "START", "LOOP", "WITH", "RETURNING",
    "BULK",
];

/// Words that end a join condition.
const JOIN_STOPS: &[&str] = &[
    "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "OUTER", "NATURAL", "STRAIGHT_JOIN", ",",
    "SET", "ON", "USING", "WHERE", "GROUP", "HAVING", "ORDER", "UNION", "EXCEPT", "INTERSECT",
    "MINUS", "LIMIT", "OFFSET", "FETCH", "FOR", "INTO", "LOOP", "WITH",
];

const SELECT_ITEM_STOPS: &[&str] = &[
    ",", "FROM", "INTO", "WHERE", "GROUP", "HAVING", "ORDER", "UNION", "EXCEPT", "INTERSECT",
    "MINUS", "LIMIT", "OFFSET", "FETCH", "FOR", "LOOP", "BULK", "WINDOW",
];

const COLUMN_ATTRIBUTE_STOPS: &[&str] = &[
    ",", "NOT", "NULL", "PRIMARY", "UNIQUE", "CHECK", "CONSTRAINT", "REFERENCES", "IDENTITY",
    "AUTO_INCREMENT", "COLLATE", "GENERATED", "COMMENT",
];

impl<'s> Parser<'s> {
    pub(super) fn at_select(&self) -> bool {
        self.at_word("SELECT") || self.at_word("WITH")
    }

    /// `( SELECT ... )` when the cursor is on such a group.
    pub(super) fn at_paren_select(&self) -> bool {
        self.at_punct("(") && (self.at_word_nth(1, "SELECT") || self.at_word_nth(1, "WITH"))
    }

    pub(super) fn paren_select(&mut self) -> Result<SyntaxNode> {
        self.expect_punct("(")?;
        let select = self.select()?;
        self.expect_punct(")")?;
        Ok(select)
    }

    /// Full query: optional CTEs, the core select and any set operations.
    pub(super) fn select(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        let mut children = Vec::new();
        if self.at_word("WITH") {
            children.push(self.with_clause()?);
        }
        self.select_core(&mut children)?;
        while let Some(union) = self.union_branch()? {
            children.push(union);
        }
        Ok(self.finish(SyntaxKind::Select, start, children))
    }

    fn with_clause(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("WITH")?;
        self.eat_word("RECURSIVE");
        let mut ctes = Vec::new();
        loop {
            let cte_start = self.mark();
            let mut cte = vec![self.name(SyntaxKind::Name)?];
            if self.at_punct("(") {
                cte.push(self.column_list()?);
            }
            self.expect_word("AS")?;
            cte.push(self.paren_select()?);
            ctes.push(self.finish(SyntaxKind::Cte, cte_start, cte));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(self.finish(SyntaxKind::With, start, ctes))
    }

    fn union_branch(&mut self) -> Result<Option<SyntaxNode>> {
        let start = self.mark();
        if self.eat_word("UNION") {
            self.eat_word("ALL");
        } else if !(self.eat_word("EXCEPT") || self.eat_word("INTERSECT") || self.eat_word("MINUS")) {
            return Ok(None);
        }
        let kind = self.node(SyntaxKind::UnionType, start, self.mark());
        let select = if self.at_paren_select() {
            self.paren_select()?
        } else {
            let select_start = self.mark();
            let mut core = Vec::new();
            self.select_core(&mut core)?;
            self.finish(SyntaxKind::Select, select_start, core)
        };
        Ok(Some(self.finish(SyntaxKind::Union, start, vec![kind, select])))
    }

    fn select_core(&mut self, children: &mut Vec<SyntaxNode>) -> Result<()> {
        self.expect_word("SELECT")?;
        if self.at_word("DISTINCT") || self.at_word("DISTINCTROW") {
            children.push(self.leaf(SyntaxKind::Distinct)?);
        } else {
            self.eat_word("ALL");
        }
        if self.at_word("TOP") {
            children.push(self.top()?);
        }
        self.select_items(children)?;
        if self.at_word("INTO") || self.at_words(&["BULK", "COLLECT"]) {
            children.push(self.into_clause()?);
        }
        if self.at_word("FROM") {
            children.push(self.from_clause()?);
        }
        if self.eat_word("WHERE") {
            children.push(self.expression(SyntaxKind::Where, CLAUSE_STOPS)?);
        }
        // Oracle hierarchical queries are kept as part of WHERE-less text.
        if self.at_words(&["START", "WITH"]) || self.at_words(&["CONNECT", "BY"]) {
            return Err(self.unsupported("CONNECT BY"));
        }
        if self.at_words(&["GROUP", "BY"]) {
            let start = self.mark();
            self.pos_advance(2);
            let items = self.expression_list(SyntaxKind::Expression, CLAUSE_STOPS)?;
            children.push(self.finish(SyntaxKind::GroupBy, start, items));
        }
        if self.eat_word("HAVING") {
            children.push(self.expression(SyntaxKind::Having, CLAUSE_STOPS)?);
        }
        if self.at_words(&["ORDER", "BY"]) {
            let start = self.mark();
            self.pos_advance(2);
            let items = self.expression_list(SyntaxKind::Expression, CLAUSE_STOPS)?;
            children.push(self.finish(SyntaxKind::OrderBy, start, items));
        }
        if let Some(limit) = self.limit_clause()? {
            children.push(limit);
        }
        if self.at_word("INTO") && !children.iter().any(|c| c.kind == SyntaxKind::IntoVariables) {
            children.push(self.into_clause()?);
        }
        if self.at_word("FOR") && !self.at_word_nth(1, "EACH") {
            // FOR UPDATE / FOR XML and friends.
            self.bump();
            self.expression(SyntaxKind::Unknown, &["LOOP"])?;
        }
        Ok(())
    }

    pub(super) fn pos_advance(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn top(&mut self) -> Result<SyntaxNode> {
        self.expect_word("TOP")?;
        let node = if self.eat_punct("(") {
            let node = self.expression(SyntaxKind::Top, &[])?;
            self.expect_punct(")")?;
            node
        } else {
            let start = self.mark();
            self.bump();
            self.expression_node(SyntaxKind::Top, start, start + 1)
        };
        if self.at_word("PERCENT") {
            return Err(self.unsupported("TOP ... PERCENT"));
        }
        self.eat_words(&["WITH", "TIES"]);
        Ok(node)
    }

    fn select_items(&mut self, children: &mut Vec<SyntaxNode>) -> Result<()> {
        loop {
            let start = self.mark();
            let tsql = self.db() == DatabaseType::SqlServer;
            let item = if tsql && self.at_assignment_target() {
                let target = self.name(SyntaxKind::AssignTarget)?;
                self.expect_punct("=")?;
                let value = self.expression(SyntaxKind::Expression, SELECT_ITEM_STOPS)?;
                vec![value, target]
            } else if tsql && self.at_alias_candidate() && self.at_punct_nth(1, "=") {
                let alias = self.leaf(SyntaxKind::Alias)?;
                self.expect_punct("=")?;
                let value = self.expression(SyntaxKind::Expression, SELECT_ITEM_STOPS)?;
                vec![value, alias]
            } else {
                let (expr, alias) = self.expression_with_alias(SyntaxKind::Expression, SELECT_ITEM_STOPS)?;
                std::iter::once(expr).chain(alias).collect()
            };
            children.push(self.finish(SyntaxKind::SelectItem, start, item));
            if !self.eat_punct(",") {
                return Ok(());
            }
        }
    }

    /// T-SQL `@v = ...` at the start of a select item.
    fn at_assignment_target(&self) -> bool {
        self.peek()
            .is_some_and(|l| l.text.starts_with('@') && !l.text.starts_with("@@"))
            && self.at_punct_nth(1, "=")
    }

    fn into_clause(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.eat_words(&["BULK", "COLLECT"]);
        self.expect_word("INTO")?;
        self.eat_word("STRICT");
        if self.db() == DatabaseType::SqlServer {
            let name = self.name(SyntaxKind::Name)?;
            return Ok(self.finish(SyntaxKind::IntoTable, start, vec![name]));
        }
        if self.eat_word("TEMPORARY") || self.eat_word("TEMP") {
            self.eat_word("TABLE");
            let name = self.name(SyntaxKind::Name)?;
            return Ok(self.finish(SyntaxKind::IntoTable, start, vec![name]));
        }
        let targets = self.name_list(SyntaxKind::Target)?;
        Ok(self.finish(SyntaxKind::IntoVariables, start, targets))
    }

    pub(super) fn from_clause(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("FROM")?;
        let refs = self.table_ref_list()?;
        Ok(self.finish(SyntaxKind::From, start, refs))
    }

    pub(super) fn table_ref_list(&mut self) -> Result<Vec<SyntaxNode>> {
        let mut refs = vec![self.table_ref()?];
        while self.eat_punct(",") {
            refs.push(self.table_ref()?);
        }
        Ok(refs)
    }

    pub(super) fn table_ref(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        let source = self.table_source()?;
        self.table_ref_rest(start, source)
    }

    /// Alias and joins following an already parsed table source.
    pub(super) fn table_ref_rest(&mut self, start: usize, source: SyntaxNode) -> Result<SyntaxNode> {
        let mut children = vec![source];
        if let Some(alias) = self.table_alias()? {
            children.push(alias);
        }
        self.skip_table_hints()?;
        while let Some(join) = self.join()? {
            children.push(join);
        }
        Ok(self.finish(SyntaxKind::TableRef, start, children))
    }

    fn table_source(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        if self.at_punct("(") {
            self.skip_balanced()?;
            return Ok(self.expression_node(SyntaxKind::Subquery, start, self.mark()));
        }
        if self.at_word("LATERAL") {
            return Err(self.unsupported("LATERAL"));
        }
        let name = self.name(SyntaxKind::TableName)?;
        if self.at_punct("(") {
            // Table-valued function call.
            self.skip_balanced()?;
            return Ok(self.expression_node(SyntaxKind::Subquery, start, self.mark()));
        }
        self.skip_table_hints()?;
        Ok(name)
    }

    fn skip_table_hints(&mut self) -> Result<()> {
        if self.db() == DatabaseType::SqlServer && self.at_word("WITH") && self.at_punct_nth(1, "(") {
            self.bump();
            self.skip_balanced()?;
        }
        Ok(())
    }

    fn table_alias(&mut self) -> Result<Option<SyntaxNode>> {
        if self.eat_word("AS") {
            return Ok(Some(self.leaf(SyntaxKind::Alias)?));
        }
        if self.at_alias_candidate() && !self.at_any_word(&["STRAIGHT_JOIN", "OPTION", "PARTITION"]) {
            return Ok(Some(self.leaf(SyntaxKind::Alias)?));
        }
        Ok(None)
    }

    fn join(&mut self) -> Result<Option<SyntaxNode>> {
        let start = self.mark();
        if self.at_words(&["CROSS", "APPLY"]) || self.at_words(&["OUTER", "APPLY"]) {
            return Err(self.unsupported("APPLY"));
        }
        if self.at_word("NATURAL") {
            return Err(self.unsupported("NATURAL JOIN"));
        }
        let matched = self.eat_word("JOIN")
            || self.eat_word("STRAIGHT_JOIN")
            || self.eat_words(&["INNER", "JOIN"])
            || self.eat_words(&["CROSS", "JOIN"])
            || self.eat_words(&["LEFT", "JOIN"])
            || self.eat_words(&["LEFT", "OUTER", "JOIN"])
            || self.eat_words(&["RIGHT", "JOIN"])
            || self.eat_words(&["RIGHT", "OUTER", "JOIN"])
            || self.eat_words(&["FULL", "JOIN"])
            || self.eat_words(&["FULL", "OUTER", "JOIN"]);
        if !matched {
            return Ok(None);
        }
        let mut children = vec![self.node(SyntaxKind::JoinType, start, self.mark())];
        children.push(self.table_source()?);
        if let Some(alias) = self.table_alias()? {
            children.push(alias);
        }
        self.skip_table_hints()?;
        if self.eat_word("ON") {
            children.push(self.expression(SyntaxKind::On, JOIN_STOPS)?);
        } else if self.at_word("USING") {
            return Err(self.unsupported("JOIN ... USING"));
        }
        Ok(Some(self.finish(SyntaxKind::Join, start, children)))
    }

    fn limit_clause(&mut self) -> Result<Option<SyntaxNode>> {
        let start = self.mark();
        let mut offset: Option<SyntaxNode> = None;
        let mut count: Option<SyntaxNode> = None;
        let count_stops: &[&str] = &["OFFSET", "ROW", "ROWS", "ONLY", "PERCENT", "INTO", "FOR", "LOOP", ","];
        loop {
            if self.eat_word("LIMIT") {
                if self.eat_word("ALL") {
                    continue;
                }
                let first = self.expression(SyntaxKind::Count, count_stops)?;
                if self.eat_punct(",") {
                    let mut first = first;
                    first.kind = SyntaxKind::Offset;
                    offset = Some(first);
                    count = Some(self.expression(SyntaxKind::Count, count_stops)?);
                } else {
                    count = Some(first);
                }
            } else if self.eat_word("OFFSET") {
                let mut stops = count_stops.to_vec();
                stops.extend(["LIMIT", "FETCH"]);
                offset = Some(self.expression(SyntaxKind::Offset, &stops)?);
                let _ = self.eat_word("ROWS") || self.eat_word("ROW");
            } else if self.at_word("FETCH") && (self.at_word_nth(1, "FIRST") || self.at_word_nth(1, "NEXT")) {
                self.pos_advance(2);
                count = Some(self.expression(SyntaxKind::Count, count_stops)?);
                let _ = self.eat_word("ROWS") || self.eat_word("ROW");
                if !self.eat_word("ONLY") && !self.eat_words(&["WITH", "TIES"]) {
                    return Err(self.expected("ONLY"));
                }
            } else {
                break;
            }
        }
        if offset.is_none() && count.is_none() {
            return Ok(None);
        }
        let children = offset.into_iter().chain(count).collect();
        Ok(Some(self.finish(SyntaxKind::Limit, start, children)))
    }

    // ===== INSERT / UPDATE / DELETE =====

    pub(super) fn insert(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("INSERT")?;
        self.eat_word("IGNORE");
        self.eat_word("INTO");
        let mut children = vec![self.name(SyntaxKind::TableName)?];
        if self.at_punct("(") && !self.at_paren_select() {
            children.push(self.column_list()?);
        }
        if self.eat_word("VALUES") || self.eat_word("VALUE") {
            loop {
                let row_start = self.mark();
                let row = self.paren_expression_list(SyntaxKind::Expression)?;
                children.push(self.finish(SyntaxKind::Values, row_start, row));
                if !self.eat_punct(",") {
                    break;
                }
            }
        } else if self.at_select() {
            children.push(self.select()?);
        } else if self.at_paren_select() {
            children.push(self.paren_select()?);
        } else if self.at_words(&["DEFAULT", "VALUES"]) {
            return Err(self.unsupported("INSERT ... DEFAULT VALUES"));
        } else {
            return Err(self.expected("VALUES or SELECT"));
        }
        if self.at_word("ON") || self.at_word("RETURNING") {
            return Err(self.unsupported("INSERT ... ON/RETURNING"));
        }
        Ok(self.finish(SyntaxKind::Insert, start, children))
    }

    pub(super) fn update(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("UPDATE")?;
        if self.at_word("TOP") {
            return Err(self.unsupported("UPDATE TOP"));
        }
        let mut children = vec![self.table_ref()?];
        self.expect_word("SET")?;
        loop {
            let item_start = self.mark();
            let target = self.name(SyntaxKind::Target)?;
            self.expect_punct("=")?;
            let value = self.expression(SyntaxKind::Value, &[",", "FROM", "WHERE", "RETURNING", "ORDER", "LIMIT"])?;
            children.push(self.finish(SyntaxKind::SetItem, item_start, vec![target, value]));
            if !self.eat_punct(",") {
                break;
            }
        }
        if self.at_word("FROM") {
            children.push(self.from_clause()?);
        }
        if self.eat_word("WHERE") {
            children.push(self.expression(SyntaxKind::Where, CLAUSE_STOPS)?);
        }
        if self.at_any_word(&["RETURNING", "ORDER", "LIMIT"]) {
            return Err(self.unsupported("UPDATE ... RETURNING/ORDER BY/LIMIT"));
        }
        Ok(self.finish(SyntaxKind::Update, start, children))
    }

    pub(super) fn delete(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("DELETE")?;
        if self.at_word("TOP") {
            return Err(self.unsupported("DELETE TOP"));
        }
        let mut children = Vec::new();
        if self.at_word("FROM") {
            children.push(self.from_clause()?);
        } else {
            let ref_start = self.mark();
            let name = self.name(SyntaxKind::TableName)?;
            if self.at_word("FROM") {
                let mut target = name;
                target.kind = SyntaxKind::Target;
                children.push(target);
                children.push(self.from_clause()?);
            } else {
                let table_ref = self.table_ref_rest(ref_start, name)?;
                children.push(self.finish(SyntaxKind::From, ref_start, vec![table_ref]));
            }
        }
        if self.eat_word("USING") {
            let using_start = self.mark();
            let refs = self.table_ref_list()?;
            children.push(self.finish(SyntaxKind::Using, using_start, refs));
        }
        if self.eat_word("WHERE") {
            children.push(self.expression(SyntaxKind::Where, CLAUSE_STOPS)?);
        }
        if self.at_word("RETURNING") {
            return Err(self.unsupported("DELETE ... RETURNING"));
        }
        Ok(self.finish(SyntaxKind::Delete, start, children))
    }

    /// Value of an assignment; a parenthesized query also yields its `Select`.
    pub(super) fn assignment_value(&mut self, stops: &[&str]) -> Result<Vec<SyntaxNode>> {
        let start = self.mark();
        let value = self.expression(SyntaxKind::Value, stops)?;
        let end = self.mark();
        if self.lexeme(start).is_some_and(|l| l.is_punct("(")) {
            self.reset(start);
            if self.at_paren_select() {
                if let Ok(select) = self.paren_select() {
                    if self.mark() == end {
                        return Ok(vec![value, select]);
                    }
                }
            }
            self.reset(end);
        }
        Ok(vec![value])
    }

    // ===== DDL inside bodies =====

    pub(super) fn create_table(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("CREATE")?;
        let _ = self.eat_word("GLOBAL") || self.eat_word("LOCAL");
        let mut children = Vec::new();
        if self.at_word("TEMPORARY") || self.at_word("TEMP") {
            children.push(self.leaf(SyntaxKind::Temporary)?);
        }
        self.expect_word("TABLE")?;
        self.eat_words(&["IF", "NOT", "EXISTS"]);
        children.push(self.name(SyntaxKind::Name)?);
        if self.at_punct("(") && !self.at_paren_select() {
            children.extend(self.column_defs()?);
        }
        if self.eat_word("AS") {
            if self.at_paren_select() {
                children.push(self.paren_select()?);
            } else {
                children.push(self.select()?);
            }
        } else if self.at_select() {
            children.push(self.select()?);
        }
        // ON COMMIT ..., ENGINE = ..., and other table options.
        while !self.at_statement_end() {
            self.bump();
        }
        Ok(self.finish(SyntaxKind::CreateTable, start, children))
    }

    /// `( column definitions and constraints )`; constraints are skipped.
    pub(super) fn column_defs(&mut self) -> Result<Vec<SyntaxNode>> {
        self.expect_punct("(")?;
        let mut columns = Vec::new();
        loop {
            if self.at_any_word(&["CONSTRAINT", "PRIMARY", "UNIQUE", "FOREIGN", "CHECK", "INDEX", "KEY"]) {
                self.expression(SyntaxKind::Unknown, &[","])?;
            } else {
                columns.push(self.column_def()?);
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(columns)
    }

    fn column_def(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        let mut children = vec![self.name(SyntaxKind::Name)?, self.data_type()?];
        loop {
            if self.at_punct(",") || self.at_punct(")") || self.at_end() {
                break;
            }
            if self.at_words(&["NOT", "NULL"]) {
                let s = self.mark();
                self.pos_advance(2);
                children.push(self.node(SyntaxKind::NotNull, s, self.mark()));
            } else if self.eat_word("DEFAULT") {
                children.push(self.expression(SyntaxKind::Default, COLUMN_ATTRIBUTE_STOPS)?);
            } else if self.at_punct("(") {
                self.skip_balanced()?;
            } else {
                self.bump();
            }
        }
        Ok(self.finish(SyntaxKind::ColumnDef, start, children))
    }

    pub(super) fn truncate(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("TRUNCATE")?;
        self.eat_word("TABLE");
        let name = self.name(SyntaxKind::TableName)?;
        while !self.at_statement_end() {
            self.bump();
        }
        Ok(self.finish(SyntaxKind::Truncate, start, vec![name]))
    }

    pub(super) fn drop(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        self.expect_word("DROP")?;
        let _ = self.eat_word("TEMPORARY") || self.eat_word("GLOBAL");
        const OBJECTS: &[&str] = &["TABLE", "VIEW", "PROCEDURE", "PROC", "FUNCTION", "TRIGGER", "SEQUENCE", "INDEX"];
        if !self.at_any_word(OBJECTS) {
            return Err(self.expected("object type"));
        }
        let mut children = vec![self.leaf(SyntaxKind::ObjectType)?];
        if self.at_words(&["IF", "EXISTS"]) {
            let s = self.mark();
            self.pos_advance(2);
            children.push(self.node(SyntaxKind::IfExists, s, self.mark()));
        }
        children.push(self.name(SyntaxKind::Name)?);
        while !self.at_statement_end() {
            self.bump();
        }
        Ok(self.finish(SyntaxKind::Drop, start, children))
    }

    /// `BEGIN TRAN`, `START TRANSACTION`, `COMMIT`, `ROLLBACK` with their noise words.
    pub(super) fn transaction(&mut self) -> Result<SyntaxNode> {
        let start = self.mark();
        if self.at_words(&["ROLLBACK", "TO"]) {
            return Err(self.unsupported("ROLLBACK TO SAVEPOINT"));
        }
        self.bump();
        let _ = self.eat_word("TRANSACTION")
            || self.eat_word("TRAN")
            || self.eat_word("WORK")
            || self.eat_words(&["DISTRIBUTED", "TRANSACTION"]);
        // Optional T-SQL transaction name.
        if self.db() == DatabaseType::SqlServer && self.at_name() && !self.at_statement_end() {
            self.bump();
        }
        Ok(self.finish(SyntaxKind::Transaction, start, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_select(db: DatabaseType, sql: &str) -> SyntaxNode {
        let mut p = Parser::new(db, sql).unwrap();
        p.select().unwrap()
    }

    fn kinds(node: &SyntaxNode) -> Vec<SyntaxKind> {
        node.children.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn test_select_clauses() {
        let node = parse_select(
            DatabaseType::MySql,
            "SELECT DISTINCT a, COUNT(*) AS n FROM t x LEFT JOIN u ON u.id = x.id WHERE a > 1 GROUP BY a HAVING COUNT(*) > 2 ORDER BY a DESC LIMIT 5, 10",
        );
        assert_eq!(
            kinds(&node),
            vec![
                SyntaxKind::Distinct,
                SyntaxKind::SelectItem,
                SyntaxKind::SelectItem,
                SyntaxKind::From,
                SyntaxKind::Where,
                SyntaxKind::GroupBy,
                SyntaxKind::Having,
                SyntaxKind::OrderBy,
                SyntaxKind::Limit,
            ]
        );
        let from = node.child(SyntaxKind::From).unwrap();
        let table_ref = &from.children[0];
        assert_eq!(table_ref.child_text(SyntaxKind::Alias), Some("x"));
        let join = table_ref.child(SyntaxKind::Join).unwrap();
        assert_eq!(join.child_text(SyntaxKind::JoinType), Some("LEFT JOIN"));
        assert_eq!(join.child_text(SyntaxKind::On), Some("u.id = x.id"));
        let limit = node.child(SyntaxKind::Limit).unwrap();
        assert_eq!(limit.child_text(SyntaxKind::Offset), Some("5"));
        assert_eq!(limit.child_text(SyntaxKind::Count), Some("10"));
    }

    #[test]
    fn test_select_into_variables_and_union() {
        let node = parse_select(
            DatabaseType::Oracle,
            "SELECT a, b INTO v_a, v_b FROM t WHERE id = 1 UNION ALL SELECT c, d FROM u",
        );
        let into = node.child(SyntaxKind::IntoVariables).unwrap();
        assert_eq!(into.children.len(), 2);
        let union = node.child(SyntaxKind::Union).unwrap();
        assert_eq!(union.child_text(SyntaxKind::UnionType), Some("UNION ALL"));
    }

    #[test]
    fn test_tsql_top_and_assignment_items() {
        let node = parse_select(DatabaseType::SqlServer, "SELECT TOP (5) @a = col1, total = col2 FROM dbo.t WITH (NOLOCK)");
        assert_eq!(node.child_text(SyntaxKind::Top), Some("5"));
        let first = &node.children_of(SyntaxKind::SelectItem).next().unwrap();
        assert_eq!(first.child_text(SyntaxKind::AssignTarget), Some("@a"));
        let second = node.children_of(SyntaxKind::SelectItem).nth(1).unwrap();
        assert_eq!(second.child_text(SyntaxKind::Alias), Some("total"));
        let from = node.child(SyntaxKind::From).unwrap();
        assert_eq!(from.children[0].child_text(SyntaxKind::TableName), Some("dbo.t"));
    }

    #[test]
    fn test_update_with_join_and_delete_target() {
        let mut p = Parser::new(DatabaseType::SqlServer, "UPDATE o SET o.total = s.sum FROM orders o JOIN sums s ON s.id = o.id WHERE o.id > 0").unwrap();
        let node = p.update().unwrap();
        assert_eq!(kinds(&node), vec![SyntaxKind::TableRef, SyntaxKind::SetItem, SyntaxKind::From, SyntaxKind::Where]);

        let mut p = Parser::new(DatabaseType::MySql, "DELETE a FROM orders a JOIN c ON c.id = a.cid WHERE c.x = 1").unwrap();
        let node = p.delete().unwrap();
        assert_eq!(node.child_text(SyntaxKind::Target), Some("a"));
        assert!(node.has(SyntaxKind::From));
    }

    #[test]
    fn test_insert_forms() {
        let mut p = Parser::new(DatabaseType::Postgres, "INSERT INTO t (a, b) VALUES (1, 'x'), (2, 'y')").unwrap();
        let node = p.insert().unwrap();
        assert_eq!(node.children_of(SyntaxKind::Values).count(), 2);
        assert!(node.has(SyntaxKind::ColumnList));

        let mut p = Parser::new(DatabaseType::Oracle, "INSERT INTO t SELECT * FROM u").unwrap();
        assert!(p.insert().unwrap().has(SyntaxKind::Select));
    }

    #[test]
    fn test_create_temp_table_columns() {
        let mut p = Parser::new(DatabaseType::MySql, "CREATE TEMPORARY TABLE tmp (id INT NOT NULL, name VARCHAR(20) DEFAULT 'n', PRIMARY KEY (id))").unwrap();
        let node = p.create_table().unwrap();
        assert!(node.has(SyntaxKind::Temporary));
        let cols: Vec<_> = node.children_of(SyntaxKind::ColumnDef).collect();
        assert_eq!(cols.len(), 2);
        assert!(cols[0].has(SyntaxKind::NotNull));
        assert_eq!(cols[1].child_text(SyntaxKind::Default), Some("'n'"));
    }
}
