//! DDL front end: statement text in, [`Schema`] out.
//!
//! Only a constrained subset of SQL is understood:
//!
//! - `CREATE TABLE` with column declarations, `PRIMARY KEY (...)` and
//!   inline `UNIQUE (...)` / `INDEX (...)` clauses
//! - `CREATE [UNIQUE] INDEX <name> ON <table> (<columns>)`
//! - `COMMENT ON COLUMN <table>.<column> IS '<text>'`
//! - `ALTER` and `DROP`, accepted and ignored
//!
//! One statement-file describes one table.

pub mod grammar;
pub mod marker;
pub mod splitter;
mod statement;
mod table;

use crate::error::{GenError, GenResult};
use crate::schema::Schema;
use crate::types::TypeMap;

pub use marker::Marker;
pub use splitter::{split_statements, statement_lines};

/// Build the schema described by one statement-file.
///
/// Any error aborts the whole file; no partial schema is returned.
pub fn analyze(raw: &str, types: &TypeMap) -> GenResult<Schema> {
    let mut schema = Schema::default();

    for statement in split_statements(raw) {
        let mut marker = Marker::new(statement_lines(&statement));
        let Some(line) = marker.advance() else {
            continue;
        };
        let tokens = Marker::tokenize(&line);
        let Some(first) = tokens.first() else {
            continue;
        };

        match first.to_ascii_uppercase().as_str() {
            "CREATE" => {
                let object = tokens.get(1).map(|t| t.to_ascii_uppercase());
                match object.as_deref() {
                    Some("TABLE") => table::parse_create_table(&mut marker, &mut schema, types)?,
                    Some("INDEX") | Some("UNIQUE") => {
                        statement::parse_create_index(&marker, &mut schema)?
                    }
                    Some(other) => {
                        return Err(GenError::invalid(
                            format!("unsupported object CREATE {}", other),
                            line,
                        ));
                    }
                    None => return Err(GenError::invalid("missing object after CREATE", line)),
                }
            }
            "COMMENT" => statement::parse_comment(&marker, &mut schema)?,
            "ALTER" | "DROP" => statement::parse_ignored(&marker),
            _ => {
                return Err(GenError::UnknownStatementKind {
                    keyword: first.clone(),
                    statement: line,
                });
            }
        }
    }

    Ok(schema)
}

/// [`analyze`] over raw file bytes; invalid UTF-8 is replaced.
pub fn analyze_bytes(raw: &[u8], types: &TypeMap) -> GenResult<Schema> {
    analyze(&String::from_utf8_lossy(raw), types)
}
