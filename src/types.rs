//! SQL type to Go type mapping.

use std::collections::BTreeMap;

/// Type for a field named `deleted_at`, whatever its declared SQL type.
pub const SOFT_DELETE_TYPE: &str = "gorm.DeletedAt";

/// Column name that always maps to [`SOFT_DELETE_TYPE`].
pub const SOFT_DELETE_COLUMN: &str = "deleted_at";

/// Built-in mapping from upper-case SQL type names to Go types.
const BUILTIN: &[(&str, &str)] = &[
    // int
    ("SERIAL", "int"),
    ("INTEGER", "int"),
    ("SMALLINT", "int32"),
    ("BIGINT", "int64"),
    ("BOOLEAN", "bool"),
    // string
    ("TEXT", "string"),
    ("VARCHAR", "string"),
    ("BYTEA", "[]byte"),
    ("TIMESTAMP", "time.Time"),
    ("JSON", "json.RawMessage"),
    ("JSONB", "json.RawMessage"),
    // arrays go through the db package adapters
    ("TEXT[]", "db.StringArray"),
    ("INTEGER[]", "db.Int64Array"),
];

/// The effective type table: built-ins plus configured overrides.
#[derive(Debug, Clone)]
pub struct TypeMap {
    entries: BTreeMap<String, String>,
}

impl Default for TypeMap {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeMap {
    /// The built-in table.
    pub fn new() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(sql, go)| (sql.to_string(), go.to_string()))
            .collect();
        Self { entries }
    }

    /// The built-in table with `overrides` applied on top.
    pub fn with_overrides<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut map = Self::new();
        for (sql, go) in overrides {
            map.insert(sql, go);
        }
        map
    }

    /// Add or replace one entry. The SQL name is stored upper-cased.
    pub fn insert(&mut self, sql_type: &str, go_type: &str) {
        self.entries
            .insert(sql_type.trim().to_ascii_uppercase(), go_type.trim().to_string());
    }

    /// Resolve the Go type of a field.
    ///
    /// `deleted_at` always resolves to the soft-delete type. Otherwise the
    /// SQL type is matched case-insensitively, and when that fails a
    /// length/precision suffix is dropped and the lookup retried, so
    /// `VARCHAR(1024)` resolves as `VARCHAR` and `VARCHAR(32)[]` as
    /// `VARCHAR[]`.
    pub fn lookup(&self, field_name: &str, sql_type: &str) -> Option<&str> {
        if field_name == SOFT_DELETE_COLUMN {
            return Some(SOFT_DELETE_TYPE);
        }
        let upper = sql_type.trim().to_ascii_uppercase();
        if let Some(go) = self.entries.get(&upper) {
            return Some(go.as_str());
        }
        strip_modifier(&upper).and_then(|base| self.entries.get(&base).map(String::as_str))
    }

    /// All entries in SQL-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `VARCHAR(32)[]` -> `VARCHAR[]`; `None` when there is no `(...)` group.
fn strip_modifier(sql_type: &str) -> Option<String> {
    let open = sql_type.find('(')?;
    let close = open + sql_type[open..].find(')')?;
    let stripped = format!("{}{}", &sql_type[..open], &sql_type[close + 1..]);
    Some(stripped.trim().to_string())
}

/// True for Go types that gorm stores through its JSON serializer.
pub fn needs_json_serializer(go_type: &str) -> bool {
    matches!(go_type, "[]string" | "[]int")
}
