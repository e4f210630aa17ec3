//! Evaluation of parsed templates against JSON data.

use std::io::Write;

use serde_json::{Map, Value};

use crate::error::{GenError, GenResult};
use crate::naming::{to_lower_camel, to_snake};
use crate::template::parser::{Expr, Func, Node};

/// Rendering state: the data root and the loop variables in scope.
pub struct Context<'a> {
    name: &'a str,
    root: &'a Value,
    scopes: Vec<(String, Value)>,
}

impl<'a> Context<'a> {
    pub fn new(name: &'a str, root: &'a Value) -> Self {
        Self {
            name,
            root,
            scopes: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> GenError {
        GenError::render(self.name, message)
    }

    pub fn render_nodes(&mut self, nodes: &[Node], out: &mut dyn Write) -> GenResult<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.write_all(text.as_bytes())?,
                Node::Print(expr) => {
                    let value = self.eval(expr)?;
                    let text = self.display(&value)?;
                    out.write_all(text.as_bytes())?;
                }
                Node::If {
                    cond,
                    then,
                    otherwise,
                } => {
                    if truthy(&self.eval(cond)?) {
                        self.render_nodes(then, out)?;
                    } else {
                        self.render_nodes(otherwise, out)?;
                    }
                }
                Node::For { var, iter, body } => {
                    let items = match self.eval(iter)? {
                        Value::Array(items) => items,
                        other => {
                            return Err(self.error(format!(
                                "cannot iterate over {} in 'for {}'",
                                kind_of(&other),
                                var
                            )));
                        }
                    };
                    let count = items.len();
                    for (index, item) in items.into_iter().enumerate() {
                        let mut info = Map::new();
                        info.insert("index".to_string(), Value::from(index));
                        info.insert("first".to_string(), Value::Bool(index == 0));
                        info.insert("last".to_string(), Value::Bool(index + 1 == count));
                        self.scopes.push(("loop".to_string(), Value::Object(info)));
                        self.scopes.push((var.clone(), item));
                        let result = self.render_nodes(body, out);
                        self.scopes.truncate(self.scopes.len() - 2);
                        result?;
                    }
                }
            }
        }
        Ok(())
    }

    fn lookup(&self, path: &[String]) -> GenResult<Value> {
        let Some((head, tail)) = path.split_first() else {
            return Err(self.error("empty path"));
        };
        let scoped = self
            .scopes
            .iter()
            .rev()
            .find(|(name, _)| name == head)
            .map(|(_, value)| value);
        let mut current = match scoped.or_else(|| self.root.get(head.as_str())) {
            Some(value) => value,
            None => return Err(self.error(format!("unknown variable '{}'", head))),
        };

        for (depth, segment) in tail.iter().enumerate() {
            let next = match current {
                Value::Object(map) => map.get(segment.as_str()),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            current = match next {
                Some(value) => value,
                None => {
                    return Err(self.error(format!(
                        "no field '{}' in '{}'",
                        segment,
                        path[..=depth].join(".")
                    )));
                }
            };
        }
        Ok(current.clone())
    }

    fn eval(&self, expr: &Expr) -> GenResult<Value> {
        match expr {
            Expr::Path(path) => self.lookup(path),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Not(inner) => Ok(Value::Bool(!truthy(&self.eval(inner)?))),
            Expr::Call(func, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<GenResult<Vec<_>>>()?;
                self.call(*func, &args)
            }
        }
    }

    fn call(&self, func: Func, args: &[Value]) -> GenResult<Value> {
        match func {
            Func::LowerCamel => Ok(Value::String(to_lower_camel(self.string_arg(func, &args[0])?))),
            Func::Snake => Ok(Value::String(to_snake(self.string_arg(func, &args[0])?))),
            Func::Join => {
                let Value::Array(items) = &args[0] else {
                    return Err(self.error(format!(
                        "join() expects a list, got {}",
                        kind_of(&args[0])
                    )));
                };
                let sep = self.string_arg(func, &args[1])?;
                let parts = items
                    .iter()
                    .map(|item| self.display(item))
                    .collect::<GenResult<Vec<_>>>()?;
                Ok(Value::String(parts.join(sep)))
            }
            Func::Eq => Ok(Value::Bool(args[0] == args[1])),
        }
    }

    fn string_arg<'v>(&self, func: Func, value: &'v Value) -> GenResult<&'v str> {
        value.as_str().ok_or_else(|| {
            self.error(format!(
                "{}() expects a string, got {}",
                func.name(),
                kind_of(value)
            ))
        })
    }

    fn display(&self, value: &Value) -> GenResult<String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) => Ok(s.clone()),
            other => Err(self.error(format!("cannot print {}", kind_of(other)))),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parser::parse_template;
    use serde_json::json;

    fn render(src: &str, data: Value) -> GenResult<String> {
        let nodes = parse_template("t", src)?;
        let mut out = Vec::new();
        Context::new("t", &data).render_nodes(&nodes, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_render_loop_and_conditions() {
        let data = json!({
            "table_name": "User",
            "fields": [
                {"name": "ID", "go_type": "int", "comment": ""},
                {"name": "Email", "go_type": "string", "comment": "mail"},
            ],
        });
        let src = "{% for f in fields %}{{ loop.index }}:{{ f.name }}{% if f.comment %} // {{ f.comment }}{% end %}{% if not loop.last %}, {% end %}{% end %}";
        assert_eq!(render(src, data).unwrap(), "0:ID, 1:Email // mail");
    }

    #[test]
    fn test_render_functions() {
        let data = json!({"name": "UserId", "cols": ["a", "b"], "n": 3, "ty": "string"});
        assert_eq!(
            render(
                "{{ lower_camel(name) }} {{ snake(name) }} {{ join(cols, \" AND \") }} {{ n }}",
                data.clone()
            )
            .unwrap(),
            "userId user_id a AND b 3"
        );
        assert_eq!(
            render("{% if eq(ty, \"string\") %}yes{% else %}no{% end %}", data).unwrap(),
            "yes"
        );
    }

    #[test]
    fn test_nested_loops_shadow() {
        let data = json!({"rows": [["a", "b"], ["c"]]});
        let src = "{% for row in rows %}[{% for c in row %}{{ c }}{{ loop.index }}{% end %}]{{ loop.index }}{% end %}";
        assert_eq!(render(src, data).unwrap(), "[a0b1]0[c0]1");
    }

    #[test]
    fn test_render_errors() {
        let data = json!({"name": "x", "list": [1], "obj": {"a": 1}, "n": 1});
        for src in [
            "{{ missing }}",
            "{{ obj.b }}",
            "{{ list }}",
            "{{ obj }}",
            "{% for x in name %}{% end %}",
            "{{ snake(n) }}",
            "{{ join(name, \",\") }}",
        ] {
            let err = render(src, data.clone()).unwrap_err();
            assert!(matches!(err, GenError::TemplateRender { .. }), "{src}: {err}");
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!([])));
        assert!(truthy(&json!({"a": 1})));
        assert!(truthy(&json!(2.5)));
    }
}
