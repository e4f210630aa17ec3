//! Document-store backend: mongo-driver data access objects.

use std::path::Path;

use crate::backend::{
    Backend, BackendOptions, Driver, Emitter, ModelView, SchemaView, TemplateSet, param_name,
};
use crate::error::GenResult;
use crate::schema::{Accessor, Schema};

const TEMPLATES: TemplateSet = TemplateSet {
    internal: "internal_mgo",
    custom: "custom_mgo",
    model: "model_mgo",
};

pub struct MongoBackend {
    emitter: Emitter,
}

impl MongoBackend {
    pub fn new(options: BackendOptions) -> GenResult<Self> {
        let emitter = Emitter::new(
            options,
            &[
                (TEMPLATES.internal, include_str!("templates/internal_mgo.tmpl")),
                (TEMPLATES.custom, include_str!("templates/custom_mgo.tmpl")),
                (TEMPLATES.model, include_str!("templates/model_mgo.tmpl")),
            ],
        )?;
        Ok(Self { emitter })
    }
}

/// `(input, filter)` for one accessor: `email string, age int` and the
/// `filter := bson.M{...}` statement.
fn signature(accessor: &Accessor) -> (String, String) {
    let mut input = Vec::new();
    let mut filter = String::from("\tfilter := bson.M{\n");
    for ((name, go_type), column) in accessor.params.iter().zip(&accessor.columns) {
        let name = param_name(name);
        input.push(format!("{} {}", name, go_type));
        filter.push_str(&format!("\t\t\"{}\": {},\n", column, name));
    }
    filter.push_str("\t}\n");
    (input.join(", "), filter)
}

/// Body of `EnsureIndexes`.
pub(crate) fn collection_index_source(schema: &Schema) -> String {
    let indexes = schema.collection_indexes();
    if indexes.is_empty() {
        return "\treturn nil\n".to_string();
    }

    let mut buf = String::from("\tvar idxs []mongo.IndexModel\n");
    for index in &indexes {
        let keys = index
            .keys
            .iter()
            .map(|k| format!("{{Key: \"{}\", Value: 1}}", k))
            .collect::<Vec<_>>()
            .join(", ");
        buf.push_str("\tidxs = append(idxs, mongo.IndexModel{\n");
        buf.push_str(&format!("\t\tKeys: bson.D{{{}}},\n", keys));
        if index.unique {
            buf.push_str("\t\tOptions: options.Index().SetUnique(true),\n");
        }
        buf.push_str("\t})\n");
    }
    buf.push_str("\t_, err := d.Collection().Indexes().CreateMany(context.Background(), idxs)\n");
    buf.push_str("\treturn err\n");
    buf
}

/// Delete, update and select methods for every accessor group.
pub(crate) fn accessor_source(schema: &Schema) -> String {
    let table = &schema.table_name;
    let accessors = schema.index_accessors();
    let signatures: Vec<(String, String)> = accessors.iter().map(signature).collect();
    let mut buf = String::new();

    for (accessor, (input, filter)) in accessors.iter().zip(&signatures) {
        let func = format!("Delete{}By{}", table, accessor.key);
        buf.push_str(&format!("// {} delete object\n", func));
        buf.push_str(&format!("func (d {}Dao) {}({}) error {{\n", table, func, input));
        buf.push_str(filter);
        buf.push_str("\t_, err := d.Collection().DeleteOne(context.Background(), filter)\n");
        buf.push_str("\treturn err\n");
        buf.push_str("}\n\n");
    }

    for (accessor, (input, filter)) in accessors.iter().zip(&signatures) {
        let func = format!("Update{}By{}", table, accessor.key);
        buf.push_str(&format!("// {} update object\n", func));
        buf.push_str(&format!(
            "func (d {}Dao) {}({}, fields map[string]interface{{}}) error {{\n",
            table, func, input
        ));
        buf.push_str(filter);
        buf.push_str("\tparams := bson.M{}\n");
        buf.push_str("\tfor k, v := range fields {\n");
        buf.push_str("\t\tparams[k] = v\n");
        buf.push_str("\t}\n");
        buf.push_str("\tupdate := bson.M{\"$set\": params}\n");
        buf.push_str(
            "\t_, err := d.Collection().UpdateOne(context.Background(), filter, update)\n",
        );
        buf.push_str("\treturn err\n");
        buf.push_str("}\n\n");
    }

    for (accessor, (input, filter)) in accessors.iter().zip(&signatures) {
        let func = format!("Select{}By{}", table, accessor.key);
        buf.push_str(&format!("// {} select object\n", func));
        buf.push_str(&format!(
            "func (d {}Dao) {}({}) (*{}Obj, error) {{\n",
            table, func, input, table
        ));
        buf.push_str(filter);
        buf.push_str(&format!("\tobj := new({}Obj)\n", table));
        buf.push_str("\terr := d.Collection().FindOne(context.Background(), filter).Decode(obj)\n");
        buf.push_str("\treturn obj, err\n");
        buf.push_str("}\n\n");
    }
    buf
}

impl Backend for MongoBackend {
    fn driver(&self) -> Driver {
        Driver::Mongodb
    }

    fn generate_internal_file(&self, path: &Path, schema: &mut Schema) -> GenResult<()> {
        schema.collection_index_source = collection_index_source(schema);
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

    fn user() -> Schema {
        analyze(
            "CREATE TABLE \"user\" (id SERIAL NOT NULL, age INTEGER, email TEXT, UNIQUE (email, age), PRIMARY KEY (id));
             CREATE INDEX idx_user_age ON \"user\" (age);
             CREATE INDEX idx_user_email_age ON \"user\" (email, age);",
            &TypeMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_collection_index_source() {
        let expected = r#"	var idxs []mongo.IndexModel
	idxs = append(idxs, mongo.IndexModel{
		Keys: bson.D{{Key: "email", Value: 1}, {Key: "age", Value: 1}},
		Options: options.Index().SetUnique(true),
	})
	idxs = append(idxs, mongo.IndexModel{
		Keys: bson.D{{Key: "age", Value: 1}},
	})
	_, err := d.Collection().Indexes().CreateMany(context.Background(), idxs)
	return err
"#;
        assert_eq!(collection_index_source(&user()), expected);
    }

    #[test]
    fn test_empty_collection_indexes_return_early() {
        let schema = analyze("CREATE TABLE log (line TEXT);", &TypeMap::new()).unwrap();
        assert_eq!(collection_index_source(&schema), "\treturn nil\n");
    }

    #[test]
    fn test_accessor_filters() {
        let source = accessor_source(&user());
        assert!(source.contains(
            "func (d UserDao) SelectUserByEmailAge(email string, age int) (*UserObj, error) {\n\tfilter := bson.M{\n\t\t\"email\": email,\n\t\t\"age\": age,\n\t}\n"
        ));
        assert!(source.contains("func (d UserDao) DeleteUserByAge(age int) error {"));
        assert!(source.contains("\tupdate := bson.M{\"$set\": params}\n"));
        assert_eq!(source.matches("func (d UserDao) DeleteUserByEmailAge(").count(), 1);
    }
}
