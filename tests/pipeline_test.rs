use std::fs;
use std::path::{Path, PathBuf};

use ddlgen::backend::Driver;
use ddlgen::generate::{GenerateOptions, GenerateReport, run};
use ddlgen::{GenError, TypeMap};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const USER_SQL: &str = r#"
-- accounts that can log in
CREATE TABLE IF NOT EXISTS "user" (
    id SERIAL NOT NULL,
    email TEXT NOT NULL,
    tags TEXT[],
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP NOT NULL,
    UNIQUE (email),
    PRIMARY KEY (id)
);
CREATE INDEX idx_user_created ON "user" (created_at);
COMMENT ON COLUMN user.email IS 'login mail';
"#;

const SESSION_SQL: &str = "CREATE TABLE session (id VARCHAR(32) NOT NULL, user_id INTEGER NOT NULL, PRIMARY KEY (id));
CREATE INDEX idx_session_user ON session (user_id);
";

/// A module root holding `model/user.sql` and `model/account/session.sql`.
fn project() -> TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let model = tmp.path().join("model");
    fs::create_dir_all(model.join("account")).unwrap();
    fs::write(model.join("user.sql"), USER_SQL).unwrap();
    fs::write(model.join("account").join("session.sql"), SESSION_SQL).unwrap();
    fs::write(model.join("README.md"), "not a statement file").unwrap();
    fs::write(tmp.path().join("go.mod"), "module example.com/app\n\ngo 1.22\n").unwrap();
    tmp
}

fn options(root: &Path) -> GenerateOptions {
    let mut options = GenerateOptions::new(vec![PathBuf::from("model")], "model");
    options.work_dir = Some(root.to_path_buf());
    options
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

fn rel(root: &Path, paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn test_output_layout() {
    let tmp = project();
    let report = run(&options(tmp.path())).unwrap();

    assert_eq!(
        rel(tmp.path(), &report.written),
        vec![
            "model/internal/session.go",
            "model/account/session.go",
            "model/internal/user.go",
            "model/user.go",
            "model/model.go",
        ]
    );
    assert!(report.skipped.is_empty());
    assert_eq!(report.schemas, 2);
}

#[test]
fn test_postgres_internal_file() {
    let tmp = project();
    run(&options(tmp.path())).unwrap();
    let user = read(tmp.path(), "model/internal/user.go");

    assert!(user.starts_with("// Code generated by ddlgen. DO NOT EDIT.\n\npackage internal\n"));
    assert!(user.contains(
        "import (\n\t\"time\"\n\n\tdb \"example.com/app/db\"\n\t\"gorm.io/gorm\"\n)\n"
    ));
    for line in [
        "\tID int `gorm:\"column:id;not null;primaryKey;autoIncrement\" json:\"id\"`\n",
        "\tEmail string `gorm:\"column:email;not null;uniqueIndex:idx_user_email;comment:login mail\" json:\"email\"` // login mail\n",
        "\tTags db.StringArray `gorm:\"column:tags\" json:\"tags\"`\n",
        "\tCreatedAt time.Time `gorm:\"column:created_at;default:CURRENT_TIMESTAMP;not null;autoCreateTime;index:idx_user_created\" json:\"created_at\"`\n",
        "func (UserObj) TableName() string {\n\treturn \"user\"\n}\n",
        "func (d UserDao) Create(obj *UserObj) error {\n\treturn d.DB.Create(obj).Error\n}\n",
        "func (d UserDao) SelectUserByCreatedAt(createdAt time.Time) (*UserObj, error) {\n",
        "\treturn d.DB.Where(\"email=?\", email).Delete(UserObj{}).Error\n",
    ] {
        assert!(user.contains(line), "missing {line:?} in\n{user}");
    }
    assert!(!user.contains("shortid"));
    assert!(!user.contains("encoding/json"));
    assert!(user.ends_with("}\n"));
    assert!(!user.ends_with("\n\n"));
}

#[test]
fn test_short_id_primary_key() {
    let tmp = project();
    run(&options(tmp.path())).unwrap();
    let session = read(tmp.path(), "model/internal/session.go");

    assert!(session.contains("\t\"github.com/teris-io/shortid\"\n"));
    assert!(session.contains(
        "func (d SessionDao) Create(obj *SessionObj) error {\n\tif obj.ID == \"\" {\n\t\tobj.ID = shortid.MustGenerate()\n\t}\n\treturn d.DB.Create(obj).Error\n}\n"
    ));
    assert!(session.contains(
        "func (d SessionDao) SelectSessionByUserId(userId int) (*SessionObj, error) {"
    ));
    assert!(!session.contains("\"time\""));
}

#[test]
fn test_custom_and_registry_files() {
    let tmp = project();
    run(&options(tmp.path())).unwrap();

    assert_eq!(
        read(tmp.path(), "model/user.go"),
        r#"package model

import (
	"example.com/app/model/internal"
	"gorm.io/gorm"
)

// User is a row of table user.
type User = internal.UserObj

// UserDao holds hand-written queries on user.
type UserDao struct {
	*internal.UserDao
}

// NewUserDao returns a UserDao over conn.
func NewUserDao(conn *gorm.DB) *UserDao {
	return &UserDao{internal.NewUserDao(conn)}
}
"#
    );
    assert!(read(tmp.path(), "model/account/session.go").starts_with("package account\n"));

    assert_eq!(
        read(tmp.path(), "model/model.go"),
        r#"// Code generated by ddlgen. DO NOT EDIT.

package model

import (
	"example.com/app/model/account"
	"gorm.io/gorm"
)

// Models lists every generated model.
func Models() []interface{} {
	return []interface{}{
		&account.Session{},
		&User{},
	}
}

// AutoMigrate creates or updates the table of every model.
func AutoMigrate(conn *gorm.DB) error {
	return conn.AutoMigrate(Models()...)
}
"#
    );
}

#[test]
fn test_second_run_is_idempotent() {
    let tmp = project();
    let opts = options(tmp.path());
    run(&opts).unwrap();

    let custom = tmp.path().join("model/user.go");
    fs::write(&custom, "package model\n\n// hand written\n").unwrap();
    let internal = read(tmp.path(), "model/internal/user.go");
    let registry = read(tmp.path(), "model/model.go");

    let report: GenerateReport = run(&opts).unwrap();
    assert_eq!(
        rel(tmp.path(), &report.skipped),
        vec!["model/account/session.go", "model/user.go"]
    );
    assert_eq!(read(tmp.path(), "model/user.go"), "package model\n\n// hand written\n");
    assert_eq!(read(tmp.path(), "model/internal/user.go"), internal);
    assert_eq!(read(tmp.path(), "model/model.go"), registry);
}

#[test]
fn test_force_rewrites_custom_files() {
    let tmp = project();
    let mut opts = options(tmp.path());
    run(&opts).unwrap();
    let custom = tmp.path().join("model/user.go");
    fs::write(&custom, "package model\n").unwrap();

    opts.force = true;
    let report = run(&opts).unwrap();
    assert!(report.skipped.is_empty());
    assert!(read(tmp.path(), "model/user.go").contains("type User = internal.UserObj"));
}

#[test]
fn test_mongodb_driver() {
    let tmp = project();
    let mut opts = options(tmp.path());
    opts.driver = Driver::Mongodb;
    opts.module = Some("github.com/acme/svc".to_string());
    run(&opts).unwrap();

    let user = read(tmp.path(), "model/internal/user.go");
    assert!(user.contains("\tEmail string `bson:\"email\" json:\"email\"` // login mail\n"));
    assert!(user.contains("\tdb \"github.com/acme/svc/db\"\n"));
    assert!(user.contains("\t\"go.mongodb.org/mongo-driver/mongo/options\"\n"));
    assert!(user.contains(
        "func (d UserDao) Collection() *mongo.Collection {\n\treturn d.DB.Collection(\"user\")\n}\n"
    ));
    assert!(user.contains(
        "\tidxs = append(idxs, mongo.IndexModel{\n\t\tKeys: bson.D{{Key: \"email\", Value: 1}},\n\t\tOptions: options.Index().SetUnique(true),\n\t})\n"
    ));
    assert!(user.contains("\treturn err\n}\n\n// Insert stores obj.\n"));
    assert!(!user.contains("gorm.io/gorm"));

    let registry = read(tmp.path(), "model/model.go");
    assert!(registry.contains("\t\"github.com/acme/svc/model/account\"\n"));
    assert!(registry.contains(
        "\tif err := account.NewSessionDao(conn).EnsureIndexes(); err != nil {\n\t\treturn err\n\t}\n\tif err := NewUserDao(conn).EnsureIndexes(); err != nil {\n"
    ));
}

#[test]
fn test_type_overrides() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("sql")).unwrap();
    fs::write(
        tmp.path().join("sql/event.sql"),
        "CREATE TABLE event (id UUID NOT NULL, labels TEXT[], PRIMARY KEY (id));",
    )
    .unwrap();

    let mut opts = GenerateOptions::new(vec![PathBuf::from("sql")], "out");
    opts.work_dir = Some(tmp.path().to_path_buf());
    opts.module = Some("example.com/events".to_string());
    let mut types = TypeMap::new();
    types.insert("uuid", "string");
    types.insert("TEXT[]", "[]string");
    opts.types = types;
    run(&opts).unwrap();

    let event = read(tmp.path(), "out/internal/event.go");
    assert!(event.contains("\tID string `gorm:\"column:id;not null;primaryKey\" json:\"id\"`\n"));
    assert!(event.contains(
        "\tLabels []string `gorm:\"column:labels;serializer:json\" json:\"labels\"`\n"
    ));
    assert!(!event.contains("example.com/events/db"));
    assert!(read(tmp.path(), "out/event.go").contains("\t\"example.com/events/out/internal\"\n"));
}

#[test]
fn test_bad_file_stops_run() {
    let tmp = project();
    fs::write(tmp.path().join("model/broken.sql"), "CREATE TABLE t (x MONEY);").unwrap();

    match run(&options(tmp.path())) {
        Err(GenError::Source { path, source }) => {
            assert!(path.ends_with("model/broken.sql"));
            assert!(matches!(
                *source,
                GenError::UnsupportedType { ref sql_type, .. } if sql_type == "MONEY"
            ));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!tmp.path().join("model/model.go").exists());
}

#[test]
fn test_unknown_statement_reported() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("t.sql"), "INSERT INTO t VALUES (1);").unwrap();
    let mut opts = GenerateOptions::new(vec![PathBuf::from("t.sql")], "model");
    opts.work_dir = Some(tmp.path().to_path_buf());

    let err = run(&opts).unwrap_err();
    assert!(err.to_string().contains("t.sql"));
    assert!(err.to_string().contains("Unknown statement kind 'INSERT'"));
}

const FILE_SQL: &str = "CREATE TABLE file (id SERIAL NOT NULL, md5sum TEXT NOT NULL, PRIMARY KEY (id));
CREATE INDEX idx_file_md5 ON file (md5sum);
";

#[test]
fn test_digit_columns_keep_declared_name() {
    let tmp = project();
    fs::write(tmp.path().join("model/file.sql"), FILE_SQL).unwrap();
    run(&options(tmp.path())).unwrap();

    let file = read(tmp.path(), "model/internal/file.go");
    assert!(file.contains(
        "\tMd5Sum string `gorm:\"column:md5sum;not null;index:idx_file_md5\" json:\"md5sum\"`\n"
    ));
    assert!(file.contains(
        "\treturn d.DB.Where(\"md5sum=?\", md5Sum).Delete(FileObj{}).Error\n"
    ));
    assert!(!file.contains("md5_sum"));

    let mut opts = options(tmp.path());
    opts.driver = Driver::Mongodb;
    opts.force = true;
    run(&opts).unwrap();

    let file = read(tmp.path(), "model/internal/file.go");
    assert!(file.contains("\tMd5Sum string `bson:\"md5sum\" json:\"md5sum\"`\n"));
    assert!(file.contains("\t\tKeys: bson.D{{Key: \"md5sum\", Value: 1}},\n"));
    assert!(file.contains("\t\t\"md5sum\": md5Sum,\n"));
    assert!(!file.contains("md5_sum"));
}

#[test]
fn test_file_without_table_is_skipped() {
    let tmp = project();
    fs::write(
        tmp.path().join("model/patch.sql"),
        "-- follow-up\nALTER TABLE user ADD COLUMN nickname TEXT;\n",
    )
    .unwrap();

    let report = run(&options(tmp.path())).unwrap();
    assert_eq!(report.schemas, 2);
    assert!(!tmp.path().join("model/internal/patch.go").exists());
    assert!(!tmp.path().join("model/patch.go").exists());
    assert!(report.written.iter().all(|p| !p.ends_with("patch.go")));

    let registry = read(tmp.path(), "model/model.go");
    assert!(!registry.contains("&{}"));
    assert!(registry.contains("\t\t&User{},\n"));
}

#[test]
fn test_duplicate_file_names_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let model = tmp.path().join("model");
    fs::create_dir_all(model.join("a")).unwrap();
    fs::create_dir_all(model.join("b")).unwrap();
    fs::write(model.join("a/user.sql"), "CREATE TABLE account (id SERIAL);").unwrap();
    fs::write(model.join("b/user.sql"), "CREATE TABLE member (id SERIAL);").unwrap();

    match run(&options(tmp.path())) {
        Err(GenError::Config(message)) => {
            assert!(message.contains("user.sql"));
            assert!(message.contains("internal/user.go"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!model.join("internal").exists());
    assert!(!model.join("a/user.go").exists());
}
