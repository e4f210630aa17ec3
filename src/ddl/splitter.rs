//! Statement splitting.
//!
//! Turns raw statement-file text into `;`-separated statements with
//! comments removed, then into the lines the [`Marker`](super::marker::Marker)
//! walks over.

/// Remove `--` and `/* */` comments that sit outside quoted text.
pub fn strip_comments(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                // line comment: drop up to (not including) the newline
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Split statement-file text into trimmed, non-empty statements.
///
/// A `;` inside single or double quotes does not end a statement.
pub fn split_statements(raw: &str) -> Vec<String> {
    let text = strip_comments(raw);
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in text.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None if c == ';' => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
    }
    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// Split one statement into scanner lines.
///
/// `CREATE TABLE` statements are re-flowed so that the header and every
/// top-level item of the column block land on their own line; any other
/// statement collapses into a single line.
pub fn statement_lines(statement: &str) -> Vec<String> {
    if is_create_table(statement) {
        if let Some(lines) = table_lines(statement) {
            return lines;
        }
    }

    let joined = statement
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        Vec::new()
    } else {
        vec![joined]
    }
}

fn is_create_table(statement: &str) -> bool {
    let mut words = statement.split_whitespace();
    matches!(
        (words.next(), words.next()),
        (Some(a), Some(b)) if a.eq_ignore_ascii_case("CREATE") && b.eq_ignore_ascii_case("TABLE")
    )
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Header line followed by one line per top-level column-block item.
fn table_lines(statement: &str) -> Option<Vec<String>> {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut open = None;
    let mut items = Vec::new();
    let mut item_start = 0;
    let mut closed = false;

    for (i, c) in statement.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => {
                if open.is_none() {
                    open = Some(i);
                    item_start = i + 1;
                }
                depth += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && open.is_some() {
                    items.push(&statement[item_start..i]);
                    closed = true;
                    break;
                }
            }
            ',' if depth == 1 => {
                items.push(&statement[item_start..i]);
                item_start = i + 1;
            }
            _ => {}
        }
    }

    let open = open?;
    if !closed {
        items.push(&statement[item_start..]);
    }
    let mut lines = vec![collapse_whitespace(&statement[..open])];
    lines.extend(
        items
            .into_iter()
            .map(collapse_whitespace)
            .filter(|item| !item.is_empty()),
    );
    Some(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_statements_skips_empty() {
        let stmts = split_statements("CREATE TABLE a (id INTEGER);;\n\n ; DROP TABLE b;");
        assert_eq!(stmts, vec!["CREATE TABLE a (id INTEGER)", "DROP TABLE b"]);
    }

    #[test]
    fn test_split_respects_quotes_and_comments() {
        let raw = "-- header; not a statement\nCOMMENT ON COLUMN t.c IS 'a;b';\n/* x; y */ DROP TABLE t;";
        let stmts = split_statements(raw);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "COMMENT ON COLUMN t.c IS 'a;b'");
        assert_eq!(stmts[1], "DROP TABLE t");
    }

    #[test]
    fn test_table_lines_multiline() {
        let stmt = "CREATE TABLE IF NOT EXISTS \"source\"\n(\n    id SERIAL NOT NULL,\n    url VARCHAR(1024),\n    PRIMARY KEY (id)\n)";
        let lines = statement_lines(stmt);
        assert_eq!(
            lines,
            vec![
                "CREATE TABLE IF NOT EXISTS \"source\"",
                "id SERIAL NOT NULL",
                "url VARCHAR(1024)",
                "PRIMARY KEY (id)",
            ]
        );
    }

    #[test]
    fn test_table_lines_single_line() {
        let stmt = "CREATE TABLE \"user\" (id SERIAL NOT NULL, email TEXT, UNIQUE(email, id), PRIMARY KEY(id))";
        let lines = statement_lines(stmt);
        assert_eq!(
            lines,
            vec![
                "CREATE TABLE \"user\"",
                "id SERIAL NOT NULL",
                "email TEXT",
                "UNIQUE(email, id)",
                "PRIMARY KEY(id)",
            ]
        );
    }

    #[test]
    fn test_other_statement_is_one_line() {
        let lines = statement_lines("CREATE INDEX idx_a\n  ON t (a)");
        assert_eq!(lines, vec!["CREATE INDEX idx_a ON t (a)"]);
    }
}
