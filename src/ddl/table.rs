//! `CREATE TABLE` and its field block.

use crate::ddl::grammar;
use crate::ddl::marker::Marker;
use crate::error::{GenError, GenResult};
use crate::naming::to_camel;
use crate::schema::{Field, PrimaryKey, Schema};
use crate::types::TypeMap;

/// Parse the table header under the cursor, then the field block.
pub(super) fn parse_create_table(
    marker: &mut Marker,
    schema: &mut Schema,
    types: &TypeMap,
) -> GenResult<()> {
    let header = marker.current().unwrap_or_default().trim().to_string();
    if !schema.sql_name.is_empty() {
        return Err(GenError::invalid(
            format!("table '{}' already declared in this file", schema.sql_name),
            header,
        ));
    }

    let tokens = strip_if_not_exists(Marker::tokenize(&header));
    let Some(raw_name) = tokens.get(2) else {
        return Err(GenError::invalid("missing table name", header));
    };
    // "public"."user" arrives as public"."user
    let name = raw_name
        .rsplit('.')
        .next()
        .unwrap_or(raw_name)
        .trim_matches('"')
        .to_string();
    if name.is_empty() {
        return Err(GenError::invalid("missing table name", header));
    }

    schema.table_name = to_camel(&name);
    schema.sql_name = name;
    parse_fields(marker, schema)?;
    schema.finalize(types)
}

fn strip_if_not_exists(mut tokens: Vec<String>) -> Vec<String> {
    let clause = ["IF", "NOT", "EXISTS"];
    let matches = tokens.len() > 5
        && tokens[2..5]
            .iter()
            .zip(clause)
            .all(|(token, word)| token.eq_ignore_ascii_case(word));
    if matches {
        tokens.drain(2..5);
    }
    tokens
}

fn is_keyword(token: &str, word: &str) -> bool {
    token.eq_ignore_ascii_case(word)
}

/// `KEY`, or `KEY(id)` when the column list is glued on.
fn is_key_token(token: &str) -> bool {
    token.get(..3).is_some_and(|head| head.eq_ignore_ascii_case("KEY"))
        && token
            .get(3..)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('('))
}

fn parse_fields(marker: &mut Marker, schema: &mut Schema) -> GenResult<()> {
    while let Some(line) = marker.advance() {
        let (constraint, body) = grammar::constraint_prefix(&line);

        if grammar::is_skipped_constraint(body) {
            tracing::debug!("Skipping table constraint: {}", line);
            continue;
        }

        let tokens = Marker::tokenize(body);
        if tokens.first().is_some_and(|t| is_keyword(t, "PRIMARY")) {
            parse_primary_key(body, &tokens, schema)?;
            continue;
        }

        if let Some(inline) = grammar::inline_index(body) {
            let fields = inline
                .columns
                .iter()
                .filter_map(|column| schema.find_column(column))
                .collect();
            let name = inline.name.or_else(|| constraint.map(str::to_string));
            if schema.add_index(inline.kind, name, fields).is_none() {
                tracing::debug!("Dropping index without known columns: {}", line);
            }
            continue;
        }

        if constraint.is_some() {
            return Err(GenError::invalid("unsupported table constraint", line));
        }
        parse_field(&line, &tokens, schema)?;
    }
    Ok(())
}

fn parse_primary_key(line: &str, tokens: &[String], schema: &mut Schema) -> GenResult<()> {
    if !tokens.get(1).is_some_and(|t| is_key_token(t)) {
        return Err(GenError::invalid("expected KEY after PRIMARY", line));
    }
    let column = grammar::paren_capture(line)
        .ok_or_else(|| GenError::invalid("missing primary key column", line))?;

    match schema.find_column(column) {
        Some(position) => set_primary(schema, position),
        None => tracing::debug!("Primary key column '{}' is not a declared field", column),
    }
    Ok(())
}

fn set_primary(schema: &mut Schema, position: usize) {
    let field = &schema.fields[position];
    let autoincrement = field.sql_type.eq_ignore_ascii_case("SERIAL");
    let short_id = !autoincrement && field.column == "id";
    schema.primary = Some(PrimaryKey {
        field: position,
        autoincrement,
        short_id,
    });
}

/// `<name> <type> [DEFAULT <value>] [NOT NULL] [PRIMARY KEY] ...`
fn parse_field(line: &str, tokens: &[String], schema: &mut Schema) -> GenResult<()> {
    if tokens.len() < 2 {
        return Err(GenError::invalid("expected column name and type", line));
    }
    let mut field = Field::new(&tokens[0], &tokens[1]);
    let modifiers = &tokens[2..];

    if let Some(i) = modifiers.iter().position(|t| is_keyword(t, "DEFAULT")) {
        let value = modifiers
            .get(i + 1)
            .ok_or_else(|| GenError::invalid("DEFAULT without a value", line))?;
        field.default = Some(value.clone());
    }
    if let Some(i) = modifiers.iter().position(|t| is_keyword(t, "NOT")) {
        match modifiers.get(i + 1) {
            Some(next) if is_keyword(next, "NULL") => field.not_null = true,
            _ => return Err(GenError::invalid("expected NULL after NOT", line)),
        }
    }
    let inline_primary = modifiers
        .windows(2)
        .any(|pair| is_keyword(&pair[0], "PRIMARY") && is_keyword(&pair[1], "KEY"));

    schema.fields.push(field);
    if inline_primary {
        set_primary(schema, schema.fields.len() - 1);
    }
    Ok(())
}
