//! Relational backend: gorm data access objects.

use std::path::Path;

use crate::backend::{
    Backend, BackendOptions, Driver, Emitter, ModelView, SchemaView, TemplateSet, param_name,
};
use crate::error::GenResult;
use crate::schema::{Accessor, Schema};

const TEMPLATES: TemplateSet = TemplateSet {
    internal: "internal_pg",
    custom: "custom_pg",
    model: "model_pg",
};

pub struct PostgresBackend {
    emitter: Emitter,
}

impl PostgresBackend {
    pub fn new(options: BackendOptions) -> GenResult<Self> {
        let emitter = Emitter::new(
            options,
            &[
                (TEMPLATES.internal, include_str!("templates/internal_pg.tmpl")),
                (TEMPLATES.custom, include_str!("templates/custom_pg.tmpl")),
                (TEMPLATES.model, include_str!("templates/model_pg.tmpl")),
            ],
        )?;
        Ok(Self { emitter })
    }
}

/// Pieces of one accessor's Go text.
struct Signature {
    /// `email string, age int`
    input: String,
    /// `email=? AND age=?`
    predicate: String,
    /// `email, age`
    args: String,
}

impl Signature {
    fn new(accessor: &Accessor) -> Self {
        let names: Vec<String> = accessor.params.iter().map(|(n, _)| param_name(n)).collect();
        let input = names
            .iter()
            .zip(&accessor.params)
            .map(|(name, (_, go_type))| format!("{} {}", name, go_type))
            .collect::<Vec<_>>()
            .join(", ");
        let predicate = accessor
            .columns
            .iter()
            .map(|c| format!("{}=?", c))
            .collect::<Vec<_>>()
            .join(" AND ");
        Self {
            input,
            predicate,
            args: names.join(", "),
        }
    }
}

/// Delete, update and select methods for every accessor group.
pub(crate) fn accessor_source(schema: &Schema) -> String {
    let table = &schema.table_name;
    let accessors = schema.index_accessors();
    let signatures: Vec<Signature> = accessors.iter().map(Signature::new).collect();
    let mut buf = String::new();

    for (accessor, sig) in accessors.iter().zip(&signatures) {
        let func = format!("Delete{}By{}", table, accessor.key);
        buf.push_str(&format!("// {} delete object\n", func));
        buf.push_str(&format!("func (d {}Dao) {}({}) error {{\n", table, func, sig.input));
        buf.push_str(&format!(
            "\treturn d.DB.Where(\"{}\", {}).Delete({}Obj{{}}).Error\n",
            sig.predicate, sig.args, table
        ));
        buf.push_str("}\n\n");
    }

    for (accessor, sig) in accessors.iter().zip(&signatures) {
        let func = format!("Update{}By{}", table, accessor.key);
        buf.push_str(&format!("// {} update object\n", func));
        buf.push_str(&format!(
            "func (d {}Dao) {}({}, fields map[string]interface{{}}) error {{\n",
            table, func, sig.input
        ));
        buf.push_str(&format!(
            "\treturn d.DB.Model({}Obj{{}}).Where(\"{}\", {}).Updates(fields).Error\n",
            table, sig.predicate, sig.args
        ));
        buf.push_str("}\n\n");
    }

    for (accessor, sig) in accessors.iter().zip(&signatures) {
        let func = format!("Select{}By{}", table, accessor.key);
        buf.push_str(&format!("// {} select object\n", func));
        buf.push_str(&format!(
            "func (d {}Dao) {}({}) (*{}Obj, error) {{\n",
            table, func, sig.input, table
        ));
        buf.push_str(&format!("\tobj := new({}Obj)\n", table));
        buf.push_str(&format!(
            "\terr := d.DB.Where(\"{}\", {}).First(obj).Error\n",
            sig.predicate, sig.args
        ));
        buf.push_str("\treturn obj, err\n");
        buf.push_str("}\n\n");
    }
    buf
}

impl Backend for PostgresBackend {
    fn driver(&self) -> Driver {
        Driver::Postgres
    }

    fn generate_internal_file(&self, path: &Path, schema: &mut Schema) -> GenResult<()> {
        schema.index_source = accessor_source(schema);
        let view = SchemaView::new(schema, self.emitter.db_import());
        self.emitter.emit(TEMPLATES.internal, &view, path)
    }

    fn generate_custom_file(&self, path: &Path, schema: &Schema) -> GenResult<()> {
        let view = SchemaView::new(schema, self.emitter.db_import());
        self.emitter.emit(TEMPLATES.custom, &view, path)
    }

    fn generate_model_file(&self, path: &Path, schemas: &[Schema]) -> GenResult<()> {
        let view = ModelView::new(path, schemas, self.emitter.db_import());
        self.emitter.emit(TEMPLATES.model, &view, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::analyze;
    use crate::types::TypeMap;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accessor_source() {
        let schema = analyze(
            "CREATE TABLE \"user\" (id SERIAL NOT NULL, age INTEGER, email TEXT, UNIQUE (email, age), PRIMARY KEY (id));",
            &TypeMap::new(),
        )
        .unwrap();
        let source = accessor_source(&schema);
        let expected = r#"// DeleteUserByID delete object
func (d UserDao) DeleteUserByID(id int) error {
	return d.DB.Where("id=?", id).Delete(UserObj{}).Error
}

// DeleteUserByEmailAge delete object
func (d UserDao) DeleteUserByEmailAge(email string, age int) error {
	return d.DB.Where("email=? AND age=?", email, age).Delete(UserObj{}).Error
}

// UpdateUserByID update object
func (d UserDao) UpdateUserByID(id int, fields map[string]interface{}) error {
	return d.DB.Model(UserObj{}).Where("id=?", id).Updates(fields).Error
}

// UpdateUserByEmailAge update object
func (d UserDao) UpdateUserByEmailAge(email string, age int, fields map[string]interface{}) error {
	return d.DB.Model(UserObj{}).Where("email=? AND age=?", email, age).Updates(fields).Error
}

// SelectUserByID select object
func (d UserDao) SelectUserByID(id int) (*UserObj, error) {
	obj := new(UserObj)
	err := d.DB.Where("id=?", id).First(obj).Error
	return obj, err
}

// SelectUserByEmailAge select object
func (d UserDao) SelectUserByEmailAge(email string, age int) (*UserObj, error) {
	obj := new(UserObj)
	err := d.DB.Where("email=? AND age=?", email, age).First(obj).Error
	return obj, err
}

"#;
        assert_eq!(source, expected);
    }

    #[test]
    fn test_keyword_param_escaped() {
        let schema = analyze(
            "CREATE TABLE t (id SERIAL, type TEXT, PRIMARY KEY (id)); CREATE INDEX idx_type ON t (type);",
            &TypeMap::new(),
        )
        .unwrap();
        let source = accessor_source(&schema);
        assert!(source.contains("func (d TDao) SelectTByType(type_ string) (*TObj, error) {"));
        assert!(source.contains("Where(\"type=?\", type_)"));
    }

    #[test]
    fn test_no_accessors_without_keys() {
        let schema = analyze("CREATE TABLE log (line TEXT);", &TypeMap::new()).unwrap();
        assert_eq!(accessor_source(&schema), "");
    }
}
