//! In-memory description of one statement-file's table.
//!
//! A [`Schema`] owns its fields and indexes. Cross references are
//! positions: an [`Index`] and the [`PrimaryKey`] point into
//! `Schema::fields`, and every [`Field`] lists the positions of the
//! indexes it belongs to in `Schema::indexes`.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{GenError, GenResult};
use crate::naming::{to_camel, to_lower_camel, to_snake};
use crate::types::{TypeMap, needs_json_serializer};

/// Unique or plain index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Normal,
    Unique,
}

impl IndexKind {
    /// The gorm tag key for this kind.
    pub fn tag_key(self) -> &'static str {
        match self {
            IndexKind::Normal => "index",
            IndexKind::Unique => "uniqueIndex",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Field {
    /// Declared name until the table is finalized, Go name afterwards.
    pub name: String,
    /// Column name as declared.
    pub column: String,
    /// Snake-cased column: predicates, filters and document keys.
    pub key: String,
    pub sql_type: String,
    pub go_type: String,
    pub tag: String,
    pub comment: String,
    pub default: Option<String>,
    pub not_null: bool,
    pub created_at: bool,
    pub updated_at: bool,
    /// Positions into `Schema::indexes`.
    pub indexes: Vec<usize>,
}

impl Field {
    pub fn new(column: &str, sql_type: &str) -> Self {
        Self {
            name: column.to_string(),
            column: column.to_string(),
            key: to_snake(column),
            sql_type: sql_type.to_string(),
            created_at: column == "created_at",
            updated_at: column == "updated_at",
            ..Default::default()
        }
    }

    /// Append `;<fragment>` to the tag unless an identical segment is
    /// already there.
    pub fn push_tag_once(&mut self, fragment: &str) {
        if !self.tag.split(';').any(|segment| segment == fragment) {
            self.tag.push(';');
            self.tag.push_str(fragment);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Index {
    pub kind: IndexKind,
    /// Given name; synthesized from table and fields when absent.
    pub name: Option<String>,
    /// Positions into `Schema::fields`, never empty.
    pub fields: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrimaryKey {
    /// Position into `Schema::fields`.
    pub field: usize,
    pub autoincrement: bool,
    pub short_id: bool,
}

/// One generated `...By<Key>` accessor group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accessor {
    /// Concatenated Go names of the participating fields.
    pub key: String,
    /// `(lowerCamel name, Go type)` per field.
    pub params: Vec<(String, String)>,
    /// Column key per field.
    pub columns: Vec<String>,
}

/// One document-store index instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionIndex {
    pub keys: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    /// Go type name (camel case).
    pub table_name: String,
    /// Table name as declared.
    pub sql_name: String,
    pub fields: Vec<Field>,
    pub indexes: Vec<Index>,
    pub primary: Option<PrimaryKey>,

    /// Generated accessor methods, filled by the backend.
    pub index_source: String,
    /// Generated document-store index setup, filled by the backend.
    pub collection_index_source: String,

    /// Destination package name, attached during emission.
    pub pkg_name: String,
    /// Import path of the internal package, attached during emission.
    pub internal_import: String,
    /// Import path used by the registry file; empty when it is the
    /// registry's own package.
    pub import: String,
}

impl Schema {
    /// Position of the field whose name is exactly `name`.
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Position of the field declared as `column`, ignoring ASCII case and
    /// surrounding quotes.
    pub fn find_column(&self, column: &str) -> Option<usize> {
        let column = column.trim().trim_matches('"');
        self.fields
            .iter()
            .position(|f| f.column.eq_ignore_ascii_case(column))
    }

    /// Position of the field whose Go name matches `name` ignoring case.
    pub fn find_field_ignore_case(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Attach an index over `fields`. An empty field list is dropped.
    pub fn add_index(
        &mut self,
        kind: IndexKind,
        name: Option<String>,
        fields: Vec<usize>,
    ) -> Option<usize> {
        if fields.is_empty() {
            return None;
        }
        let position = self.indexes.len();
        for &f in &fields {
            self.fields[f].indexes.push(position);
        }
        self.indexes.push(Index { kind, name, fields });
        Some(position)
    }

    /// Given name of an index, or `idx_<table>_<field>_<field>...`.
    pub fn index_name(&self, index: &Index) -> String {
        if let Some(name) = &index.name {
            return name.clone();
        }
        let mut name = format!("idx_{}", self.sql_name);
        for &f in &index.fields {
            name.push('_');
            name.push_str(&to_snake(&self.fields[f].column));
        }
        name
    }

    /// Map every field's type and build the column tags.
    ///
    /// Runs once, right after the field block of `CREATE TABLE`.
    pub fn finalize(&mut self, types: &TypeMap) -> GenResult<()> {
        for field in &mut self.fields {
            let go_type = types
                .lookup(&field.column, &field.sql_type)
                .ok_or_else(|| GenError::UnsupportedType {
                    field: field.column.clone(),
                    sql_type: field.sql_type.clone(),
                })?;
            field.go_type = go_type.to_string();
        }

        if let Some(pk) = self.primary {
            self.rebuild_tag(pk.field);
            let field = &mut self.fields[pk.field];
            field.tag.push_str(";primaryKey");
            if pk.autoincrement {
                field.tag.push_str(";autoIncrement");
            }
        }

        for i in 0..self.fields.len() {
            if self.fields[i].tag.is_empty() {
                self.rebuild_tag(i);
            }
        }
        Ok(())
    }

    fn rebuild_tag(&mut self, position: usize) {
        let field = &self.fields[position];
        let mut tag = format!("column:{}", field.column);
        if let Some(default) = &field.default {
            tag.push_str(";default:");
            tag.push_str(default);
        }
        if field.not_null {
            tag.push_str(";not null");
        }
        for &ix in &field.indexes {
            let index = &self.indexes[ix];
            tag.push(';');
            tag.push_str(index.kind.tag_key());
            tag.push(':');
            tag.push_str(&self.index_name(index));
        }
        if field.created_at {
            tag.push_str(";autoCreateTime");
        }
        if field.updated_at {
            tag.push_str(";autoUpdateTime");
        }
        if needs_json_serializer(&field.go_type) {
            tag.push_str(";serializer:json");
        }

        let name = to_camel(&field.column);
        let field = &mut self.fields[position];
        field.tag = tag;
        field.name = name;
    }

    fn accessor(&self, positions: &[usize]) -> Accessor {
        let fields = positions.iter().map(|&p| &self.fields[p]);
        Accessor {
            key: fields.clone().map(|f| f.name.as_str()).collect(),
            params: fields
                .clone()
                .map(|f| (to_lower_camel(&f.name), f.go_type.clone()))
                .collect(),
            columns: fields.map(|f| f.key.clone()).collect(),
        }
    }

    /// Accessor groups: the primary key first, then every index in field
    /// order, de-duplicated by key.
    pub fn index_accessors(&self) -> Vec<Accessor> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        if let Some(pk) = &self.primary {
            let accessor = self.accessor(&[pk.field]);
            seen.insert(accessor.key.clone());
            out.push(accessor);
        }
        for field in &self.fields {
            for &ix in &field.indexes {
                let accessor = self.accessor(&self.indexes[ix].fields);
                if seen.insert(accessor.key.clone()) {
                    out.push(accessor);
                }
            }
        }
        out
    }

    /// Document-store index instructions, de-duplicated by key list.
    pub fn collection_indexes(&self) -> Vec<CollectionIndex> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for field in &self.fields {
            for &ix in &field.indexes {
                let index = &self.indexes[ix];
                let keys: Vec<String> = index
                    .fields
                    .iter()
                    .map(|&f| self.fields[f].key.clone())
                    .collect();
                if seen.insert(keys.join(",")) {
                    out.push(CollectionIndex {
                        keys,
                        unique: index.kind == IndexKind::Unique,
                    });
                }
            }
        }
        out
    }

    /// The primary key's field.
    pub fn primary_field(&self) -> Option<&Field> {
        self.primary.map(|pk| &self.fields[pk.field])
    }
}
