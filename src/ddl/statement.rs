//! Single-line statements: `CREATE [UNIQUE] INDEX`, `COMMENT`, `ALTER`, `DROP`.

use crate::ddl::grammar;
use crate::ddl::marker::Marker;
use crate::error::{GenError, GenResult};
use crate::naming::{to_camel, to_snake};
use crate::schema::Schema;

pub(super) fn parse_create_index(marker: &Marker, schema: &mut Schema) -> GenResult<()> {
    let line = marker.current().unwrap_or_default().trim();
    let index = grammar::create_index(line).ok_or_else(|| {
        GenError::invalid(
            "expected CREATE [UNIQUE] INDEX <name> ON <table> (<columns>)",
            line,
        )
    })?;

    let same_table = index.table.eq_ignore_ascii_case(&schema.sql_name)
        || to_snake(&index.table) == to_snake(&schema.table_name);
    if !schema.sql_name.is_empty() && !same_table {
        tracing::debug!(
            "Index '{}' belongs to table '{}', skipping",
            index.name,
            index.table
        );
        return Ok(());
    }

    let fields: Vec<usize> = index
        .columns
        .iter()
        .filter_map(|column| schema.find_column(column))
        .collect();
    if schema
        .add_index(index.kind, Some(index.name.clone()), fields.clone())
        .is_none()
    {
        tracing::debug!("Index '{}' has no known columns, skipping", index.name);
        return Ok(());
    }

    let fragment = format!("{}:{}", index.kind.tag_key(), index.name);
    for position in fields {
        schema.fields[position].push_tag_once(&fragment);
    }
    Ok(())
}

/// `COMMENT ON COLUMN <table>.<column> IS <text>`
pub(super) fn parse_comment(marker: &Marker, schema: &mut Schema) -> GenResult<()> {
    let line = marker.current().unwrap_or_default().trim();
    let tokens = Marker::tokenize(line);
    if tokens.len() < 6 {
        return Err(GenError::invalid(
            "expected COMMENT ON <kind> <target> IS <text>",
            line,
        ));
    }

    let column = tokens[3].rsplit('.').next().unwrap_or(&tokens[3]);
    let text = tokens[5..].join(" ");
    let text = text.trim_matches('\'');

    match schema.find_field_ignore_case(&to_camel(column)) {
        Some(position) => {
            let field = &mut schema.fields[position];
            field.comment = text.to_string();
            field.tag.push_str(";comment:");
            field.tag.push_str(text);
        }
        None => tracing::debug!("No field for comment target '{}'", tokens[3]),
    }
    Ok(())
}

/// `ALTER` and `DROP` are accepted and have no effect.
pub(super) fn parse_ignored(marker: &Marker) {
    tracing::debug!(
        "Ignoring statement: {}",
        marker.current().unwrap_or_default()
    );
}
