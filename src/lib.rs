//! # ddlgen
//!
//! Turns SQL data-definition files into Go data access code.
//!
//! Each `.sql` file holds one `CREATE TABLE` plus its indexes and column
//! comments. ddlgen parses it into a [`Schema`], maps the column types,
//! and renders three kinds of Go file through a backend:
//!
//! | File | Owner |
//! |------|-------|
//! | `<dst>/internal/<name>.go` | regenerated on every run |
//! | `<dst>/<name>.go` | written once, then hand-edited |
//! | `<dst>/model.go` | regenerated registry of every model |
//!
//! ## Quick Example
//!
//! ```
//! use ddlgen::{TypeMap, analyze};
//!
//! let schema = analyze(
//!     "CREATE TABLE account (id SERIAL NOT NULL, email TEXT, PRIMARY KEY (id));",
//!     &TypeMap::new(),
//! )
//! .unwrap();
//! assert_eq!(schema.table_name, "Account");
//! assert_eq!(schema.fields[1].tag, "column:email");
//! ```

pub mod backend;
pub mod config;
pub mod ddl;
pub mod error;
pub mod generate;
pub mod naming;
pub mod path;
pub mod postprocess;
pub mod schema;
pub mod template;
pub mod types;

pub mod prelude {
    pub use crate::backend::{Backend, BackendOptions, Driver, new_backend};
    pub use crate::config::Config;
    pub use crate::ddl::analyze;
    pub use crate::error::*;
    pub use crate::generate::{GenerateOptions, GenerateReport, run};
    pub use crate::schema::{Field, Index, IndexKind, PrimaryKey, Schema};
    pub use crate::types::TypeMap;
}

pub use ddl::{analyze, analyze_bytes};
pub use error::{GenError, GenResult};
pub use schema::Schema;
pub use types::TypeMap;
