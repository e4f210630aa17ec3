//! Template parser using nom.
//!
//! # Syntax
//!
//! ```text
//! {{ expr }}                     print a value
//! {% if expr %} .. {% else %} .. {% end %}
//! {% for item in expr %} .. {% end %}
//! {# comment #}
//! ```
//!
//! A `-` just inside a delimiter (`{{-`, `-%}`) trims the whitespace of
//! the neighbouring text on that side.
//!
//! Expressions are dotted paths (`schema.fields`), double-quoted strings,
//! `not <expr>` and calls of the built-in functions.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, multispace0, multispace1, none_of},
    combinator::{map, not, peek, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use crate::error::{GenError, GenResult};

/// Built-in template functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Func {
    LowerCamel,
    Snake,
    Join,
    Eq,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "lower_camel" => Some(Func::LowerCamel),
            "snake" => Some(Func::Snake),
            "join" => Some(Func::Join),
            "eq" => Some(Func::Eq),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::LowerCamel => "lower_camel",
            Func::Snake => "snake",
            Func::Join => "join",
            Func::Eq => "eq",
        }
    }

    fn arity(self) -> usize {
        match self {
            Func::LowerCamel | Func::Snake => 1,
            Func::Join | Func::Eq => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Path(Vec<String>),
    Str(String),
    Not(Box<Expr>),
    Call(Func, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Print(Expr),
    If {
        cond: Expr,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    For {
        var: String,
        iter: Expr,
        body: Vec<Node>,
    },
}

/// Expression before function names are checked.
#[derive(Debug, Clone, PartialEq)]
enum RawExpr {
    Path(Vec<String>),
    Str(String),
    Not(Box<RawExpr>),
    Call(String, Vec<RawExpr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Stmt {
    If(RawExpr),
    Else,
    End,
    For(String, RawExpr),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TagKind {
    Print,
    Block,
    Comment,
}

#[derive(Debug)]
enum Piece<'a> {
    Text(String),
    Tag {
        kind: TagKind,
        body: &'a str,
        line: usize,
    },
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Split the source into text and tags, applying `-` trimming.
fn scan<'a>(name: &str, source: &'a str) -> GenResult<Vec<Piece<'a>>> {
    let mut pieces = Vec::new();
    let mut rest = 0;
    let mut trim_next = false;

    loop {
        let open = find_open(&source[rest..]).map(|(i, kind)| (rest + i, kind));
        let text_end = open.map_or(source.len(), |(i, _)| i);
        let mut text = &source[rest..text_end];
        if trim_next {
            text = text.trim_start();
        }

        let Some((start, kind)) = open else {
            pieces.push(Piece::Text(text.to_string()));
            break;
        };

        let close = match kind {
            TagKind::Print => "}}",
            TagKind::Block => "%}",
            TagKind::Comment => "#}",
        };
        let body_start = start + 2;
        let Some(len) = source[body_start..].find(close) else {
            return Err(GenError::syntax(
                name,
                format!("line {}: unterminated tag", line_of(source, start)),
            ));
        };
        let mut body = &source[body_start..body_start + len];

        if let Some(stripped) = body.strip_prefix('-') {
            text = text.trim_end();
            body = stripped;
        }
        trim_next = false;
        if let Some(stripped) = body.strip_suffix('-') {
            trim_next = true;
            body = stripped;
        }

        pieces.push(Piece::Text(text.to_string()));
        if kind != TagKind::Comment {
            pieces.push(Piece::Tag {
                kind,
                body: body.trim(),
                line: line_of(source, start),
            });
        }
        rest = body_start + len + close.len();
    }
    Ok(pieces)
}

fn find_open(text: &str) -> Option<(usize, TagKind)> {
    let mut from = 0;
    while let Some(i) = text[from..].find('{') {
        let at = from + i;
        let kind = match text.as_bytes().get(at + 1) {
            Some(b'{') => Some(TagKind::Print),
            Some(b'%') => Some(TagKind::Block),
            Some(b'#') => Some(TagKind::Comment),
            _ => None,
        };
        if let Some(kind) = kind {
            return Some((at, kind));
        }
        from = at + 1;
    }
    None
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parse an identifier.
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(take_while1(is_ident_start), take_while(is_ident_char)))(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), not(peek(take_while1(is_ident_char))))
}

/// Parse a double-quoted string with `\"`, `\\`, `\n` and `\t` escapes.
fn parse_string(input: &str) -> IResult<&str, String> {
    let escaped = preceded(
        char('\\'),
        alt((
            value('"', char('"')),
            value('\\', char('\\')),
            value('\n', char('n')),
            value('\t', char('t')),
        )),
    );
    map(
        delimited(char('"'), many0(alt((escaped, none_of("\"\\")))), char('"')),
        |chars| chars.into_iter().collect(),
    )(input)
}

fn parse_path(input: &str) -> IResult<&str, Vec<String>> {
    let (input, first) = parse_identifier(input)?;
    let (input, rest) = many0(preceded(
        char('.'),
        alt((parse_identifier, take_while1(|c: char| c.is_ascii_digit()))),
    ))(input)?;
    let mut path = vec![first.to_string()];
    path.extend(rest.into_iter().map(str::to_string));
    Ok((input, path))
}

fn parse_call(input: &str) -> IResult<&str, RawExpr> {
    let (input, name) = parse_identifier(input)?;
    let (input, _) = tuple((multispace0, char('('), multispace0))(input)?;
    let (input, args) = separated_list0(
        tuple((multispace0, char(','), multispace0)),
        parse_expr,
    )(input)?;
    let (input, _) = tuple((multispace0, char(')')))(input)?;
    Ok((input, RawExpr::Call(name.to_string(), args)))
}

fn parse_expr(input: &str) -> IResult<&str, RawExpr> {
    alt((
        map(preceded(pair(keyword("not"), multispace1), parse_expr), |e| {
            RawExpr::Not(Box::new(e))
        }),
        parse_call,
        map(parse_string, RawExpr::Str),
        map(parse_path, RawExpr::Path),
    ))(input)
}

fn parse_stmt(input: &str) -> IResult<&str, Stmt> {
    alt((
        map(preceded(pair(keyword("if"), multispace1), parse_expr), Stmt::If),
        value(Stmt::Else, keyword("else")),
        value(Stmt::End, keyword("end")),
        map(
            tuple((
                keyword("for"),
                multispace1,
                parse_identifier,
                multispace1,
                keyword("in"),
                multispace1,
                parse_expr,
            )),
            |(_, _, var, _, _, _, iter)| Stmt::For(var.to_string(), iter),
        ),
    ))(input)
}

/// Run a parser over a whole tag body.
fn complete<T>(
    name: &str,
    line: usize,
    body: &str,
    parser: impl Fn(&str) -> IResult<&str, T>,
) -> GenResult<T> {
    match parser(body) {
        Ok((rest, parsed)) if rest.trim().is_empty() => Ok(parsed),
        Ok((rest, _)) => Err(GenError::syntax(
            name,
            format!("line {}: unexpected '{}' in '{}'", line, rest.trim(), body),
        )),
        Err(_) => Err(GenError::syntax(
            name,
            format!("line {}: cannot parse '{}'", line, body),
        )),
    }
}

fn resolve(name: &str, line: usize, raw: RawExpr) -> GenResult<Expr> {
    Ok(match raw {
        RawExpr::Path(path) => Expr::Path(path),
        RawExpr::Str(s) => Expr::Str(s),
        RawExpr::Not(inner) => Expr::Not(Box::new(resolve(name, line, *inner)?)),
        RawExpr::Call(func_name, args) => {
            let func = Func::lookup(&func_name).ok_or_else(|| {
                GenError::syntax(name, format!("line {}: unknown function '{}'", line, func_name))
            })?;
            if args.len() != func.arity() {
                return Err(GenError::syntax(
                    name,
                    format!(
                        "line {}: {}() takes {} argument(s), got {}",
                        line,
                        func.name(),
                        func.arity(),
                        args.len()
                    ),
                ));
            }
            let args = args
                .into_iter()
                .map(|arg| resolve(name, line, arg))
                .collect::<GenResult<Vec<_>>>()?;
            Expr::Call(func, args)
        }
    })
}

/// An open block while building the tree.
enum Frame {
    Root,
    If {
        cond: Expr,
        then: Option<Vec<Node>>,
        line: usize,
    },
    For {
        var: String,
        iter: Expr,
        line: usize,
    },
}

/// Parse template text into nodes.
pub fn parse_template(name: &str, source: &str) -> GenResult<Vec<Node>> {
    // (frame, nodes collected in its current branch)
    let mut stack: Vec<(Frame, Vec<Node>)> = vec![(Frame::Root, Vec::new())];

    for piece in scan(name, source)? {
        let (kind, body, line) = match piece {
            Piece::Text(text) => {
                if !text.is_empty()
                    && let Some((_, nodes)) = stack.last_mut()
                {
                    nodes.push(Node::Text(text));
                }
                continue;
            }
            Piece::Tag { kind, body, line } => (kind, body, line),
        };

        if kind == TagKind::Print {
            let raw = complete(name, line, body, parse_expr)?;
            let expr = resolve(name, line, raw)?;
            if let Some((_, nodes)) = stack.last_mut() {
                nodes.push(Node::Print(expr));
            }
            continue;
        }

        match complete(name, line, body, parse_stmt)? {
            Stmt::If(raw) => {
                let cond = resolve(name, line, raw)?;
                stack.push((
                    Frame::If {
                        cond,
                        then: None,
                        line,
                    },
                    Vec::new(),
                ));
            }
            Stmt::For(var, raw) => {
                let iter = resolve(name, line, raw)?;
                stack.push((Frame::For { var, iter, line }, Vec::new()));
            }
            Stmt::Else => match stack.last_mut() {
                Some((Frame::If { then: then @ None, .. }, nodes)) => {
                    *then = Some(std::mem::take(nodes));
                }
                _ => {
                    return Err(GenError::syntax(
                        name,
                        format!("line {}: 'else' outside of 'if'", line),
                    ));
                }
            },
            Stmt::End => {
                let node = match stack.pop() {
                    Some((Frame::If { cond, then, .. }, nodes)) => match then {
                        Some(then) => Node::If {
                            cond,
                            then,
                            otherwise: nodes,
                        },
                        None => Node::If {
                            cond,
                            then: nodes,
                            otherwise: Vec::new(),
                        },
                    },
                    Some((Frame::For { var, iter, .. }, body)) => Node::For { var, iter, body },
                    _ => {
                        return Err(GenError::syntax(
                            name,
                            format!("line {}: 'end' without an open block", line),
                        ));
                    }
                };
                if let Some((_, nodes)) = stack.last_mut() {
                    nodes.push(node);
                }
            }
        }
    }

    match stack.pop() {
        Some((Frame::Root, nodes)) if stack.is_empty() => Ok(nodes),
        Some((Frame::If { line, .. }, _)) | Some((Frame::For { line, .. }, _)) => Err(
            GenError::syntax(name, format!("line {}: block is never closed", line)),
        ),
        _ => Err(GenError::syntax(name, "unbalanced blocks")),
    }
}
