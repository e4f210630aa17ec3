//! Named template registry.
//!
//! Templates are parsed once at registration and rendered any number of
//! times against serializable data. Available functions:
//!
//! | Function | Result |
//! |---|---|
//! | `lower_camel(s)` | `UserId` → `userId` |
//! | `snake(s)` | `UserId` → `user_id` |
//! | `join(list, sep)` | items joined with `sep` |
//! | `eq(a, b)` | value equality |

mod parser;
mod render;

use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use crate::error::{GenError, GenResult};

pub use parser::{Expr, Func, Node, parse_template};

/// Parsed templates addressed by case-sensitive name.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Vec<Node>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` and store it under `name`.
    ///
    /// A name can be registered once; a second registration fails with
    /// [`GenError::DuplicateTemplate`] and leaves the first in place.
    pub fn register(&mut self, name: &str, source: &str) -> GenResult<()> {
        if self.templates.contains_key(name) {
            return Err(GenError::DuplicateTemplate(name.to_string()));
        }
        let nodes = parse_template(name, source)?;
        self.templates.insert(name.to_string(), nodes);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Render `name` with `data` into `out`.
    pub fn render<T: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &T,
        out: &mut dyn Write,
    ) -> GenResult<()> {
        let nodes = self
            .templates
            .get(name)
            .ok_or_else(|| GenError::render(name, "no such template"))?;
        let root = serde_json::to_value(data).map_err(|e| GenError::render(name, e.to_string()))?;
        render::Context::new(name, &root).render_nodes(nodes, out)
    }

    /// Render `name` into a byte buffer.
    pub fn render_to_vec<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> GenResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.render(name, data, &mut buf)?;
        Ok(buf)
    }
}
