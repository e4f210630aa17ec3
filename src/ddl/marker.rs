//! Line scanner over the lines of one statement.

/// Cursor over a statement's lines.
///
/// Starts before the first line; [`Marker::advance`] moves to the next
/// significant line.
#[derive(Debug, Clone)]
pub struct Marker {
    lines: Vec<String>,
    index: Option<usize>,
}

impl Marker {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines, index: None }
    }

    /// Move to the next significant line.
    ///
    /// Skips blank lines, a bare `(`, `--` comments and lines opening with
    /// `)`. A trailing `,` is removed. Returns `None` at end of input.
    pub fn advance(&mut self) -> Option<String> {
        let mut next = self.index.map_or(0, |i| i + 1);

        while next < self.lines.len() {
            self.index = Some(next);
            let line = self.lines[next].trim();
            if line.is_empty() || line == "(" || line.starts_with("--") || line.starts_with(')') {
                next += 1;
                continue;
            }
            let line = line.strip_suffix(',').unwrap_or(line).trim();
            return Some(line.to_string());
        }
        None
    }

    /// The line under the cursor, `None` before the first [`advance`](Self::advance).
    pub fn current(&self) -> Option<&str> {
        self.index
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    /// Split a line on whitespace, dropping one layer of double quotes
    /// from each side of every token.
    pub fn tokenize(line: &str) -> Vec<String> {
        line.split_whitespace()
            .map(|token| {
                let token = token.strip_prefix('"').unwrap_or(token);
                let token = token.strip_suffix('"').unwrap_or(token);
                token.trim().to_string()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(lines: &[&str]) -> Marker {
        Marker::new(lines.iter().map(|l| l.to_string()).collect())
    }

    #[test]
    fn test_advance_skips_markers() {
        let mut m = marker(&[
            "CREATE TABLE t",
            "(",
            "",
            "-- the id",
            "id SERIAL NOT NULL,",
            ");",
            "name TEXT",
        ]);
        assert_eq!(m.advance().as_deref(), Some("CREATE TABLE t"));
        assert_eq!(m.advance().as_deref(), Some("id SERIAL NOT NULL"));
        assert_eq!(m.advance().as_deref(), Some("name TEXT"));
        assert_eq!(m.advance(), None);
        assert_eq!(m.advance(), None);
    }

    #[test]
    fn test_current_before_advance() {
        let mut m = marker(&["DROP TABLE t"]);
        assert_eq!(m.current(), None);
        m.advance();
        assert_eq!(m.current(), Some("DROP TABLE t"));
    }

    #[test]
    fn test_tokenize_strips_quotes() {
        let tokens = Marker::tokenize("CREATE TABLE   \"user\"  (");
        assert_eq!(tokens, vec!["CREATE", "TABLE", "user", "("]);

        let tokens = Marker::tokenize("IS \"hello world\"");
        assert_eq!(tokens, vec!["IS", "hello", "world"]);
    }
}
