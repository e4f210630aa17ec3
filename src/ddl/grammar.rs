//! nom patterns for the fixed-shape pieces of the DDL subset.
//!
//! Everything here is case-insensitive and works on a single scanner line.
//!
//! ```text
//! CREATE [UNIQUE] INDEX [CONCURRENTLY] [IF NOT EXISTS] name ON [schema.]table [USING m] (a, b DESC)
//! [CONSTRAINT name] UNIQUE [KEY] [name] (a, b)
//! INDEX [name] (a, b)
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag_no_case, take_until, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, not, opt, peek, recognize, value},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use crate::schema::IndexKind;

/// A parsed `CREATE [UNIQUE] INDEX` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub kind: IndexKind,
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
}

/// A table-level `UNIQUE (...)` / `INDEX (...)` clause inside CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineIndex {
    pub kind: IndexKind,
    pub name: Option<String>,
    pub columns: Vec<String>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// A bare or double-quoted identifier.
fn identifier(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), is_not("\""), char('"')),
        take_while1(is_ident_char),
    ))(input)
}

/// An identifier optionally qualified by a schema; yields the last part.
fn qualified_identifier(input: &str) -> IResult<&str, &str> {
    let (input, first) = identifier(input)?;
    let (input, rest) = opt(preceded(char('.'), identifier))(input)?;
    Ok((input, rest.unwrap_or(first)))
}

/// A keyword that is not the prefix of a longer identifier.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), not(peek(take_while1(is_ident_char))))
}

/// Comma separated column list between parentheses.
///
/// Each entry keeps only its first word, so `created_at DESC` yields
/// `created_at`; surrounding double quotes are dropped.
fn column_list(input: &str) -> IResult<&str, Vec<String>> {
    let (input, body) = delimited(char('('), take_until(")"), char(')'))(input)?;
    let columns = body
        .split(',')
        .filter_map(|col| col.split_whitespace().next())
        .map(|col| col.trim_matches('"').to_string())
        .filter(|col| !col.is_empty())
        .collect();
    Ok((input, columns))
}

fn create_index_inner(input: &str) -> IResult<&str, CreateIndex> {
    let (input, _) = tuple((multispace0, keyword("CREATE"), multispace1))(input)?;
    let (input, unique) = opt(terminated(keyword("UNIQUE"), multispace1))(input)?;
    let (input, _) = tuple((keyword("INDEX"), multispace1))(input)?;
    let (input, _) = opt(terminated(keyword("CONCURRENTLY"), multispace1))(input)?;
    let (input, _) = opt(tuple((
        keyword("IF"),
        multispace1,
        keyword("NOT"),
        multispace1,
        keyword("EXISTS"),
        multispace1,
    )))(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = tuple((multispace1, keyword("ON"), multispace1))(input)?;
    let (input, _) = opt(terminated(keyword("ONLY"), multispace1))(input)?;
    let (input, table) = qualified_identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = opt(tuple((
        keyword("USING"),
        multispace1,
        identifier,
        multispace0,
    )))(input)?;
    let (input, columns) = column_list(input)?;

    let kind = if unique.is_some() {
        IndexKind::Unique
    } else {
        IndexKind::Normal
    };
    Ok((
        input,
        CreateIndex {
            kind,
            name: name.to_string(),
            table: table.to_string(),
            columns,
        },
    ))
}

/// Match `CREATE [UNIQUE] INDEX <name> ON <table> (<cols>)`.
///
/// Trailing text after the column list (`WHERE ...`, `INCLUDE ...`) is
/// ignored.
pub fn create_index(line: &str) -> Option<CreateIndex> {
    create_index_inner(line).ok().map(|(_, idx)| idx)
}

/// The text of the first parenthesised group: `PRIMARY KEY (id)` gives `id`.
pub fn paren_capture(line: &str) -> Option<&str> {
    let parsed: IResult<&str, &str> = preceded(
        pair(take_until("("), char('(')),
        terminated(take_until(")"), char(')')),
    )(line);
    parsed
        .ok()
        .map(|(_, inner)| inner.trim())
        .filter(|inner| !inner.is_empty())
}

/// Strip a leading `CONSTRAINT <name>` and return the name.
pub fn constraint_prefix(line: &str) -> (Option<&str>, &str) {
    let parsed: IResult<&str, &str> = delimited(
        pair(keyword("CONSTRAINT"), multispace1),
        identifier,
        multispace1,
    )(line);
    match parsed {
        Ok((rest, name)) => (Some(name), rest),
        Err(_) => (None, line),
    }
}

fn inline_index_inner(input: &str) -> IResult<&str, InlineIndex> {
    let (input, kind) = alt((
        value(
            IndexKind::Unique,
            recognize(pair(
                keyword("UNIQUE"),
                opt(preceded(
                    multispace1,
                    alt((keyword("KEY"), keyword("INDEX"))),
                )),
            )),
        ),
        value(IndexKind::Normal, keyword("INDEX")),
    ))(input)?;
    let (input, name) = opt(preceded(multispace1, identifier))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, columns) = column_list(input)?;
    Ok((
        input,
        InlineIndex {
            kind,
            name: name.map(str::to_string),
            columns,
        },
    ))
}

/// Match an inline table-level index clause.
pub fn inline_index(line: &str) -> Option<InlineIndex> {
    inline_index_inner(line).ok().map(|(_, idx)| idx)
}

/// True for table constraints the generator has no use for.
pub fn is_skipped_constraint(line: &str) -> bool {
    let parsed: IResult<&str, &str> = alt((
        map(
            tuple((keyword("FOREIGN"), multispace1, keyword("KEY"))),
            |(first, _, _)| first,
        ),
        keyword("CHECK"),
        keyword("EXCLUDE"),
    ))(line);
    parsed.is_ok()
}
