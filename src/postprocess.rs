//! Clean-up pass over generated Go source.
//!
//! Rendering leaves behind unused imports, uneven blank lines and
//! trailing whitespace. [`tidy_go_source`] fixes those, and rejects
//! output whose brackets do not balance. An external formatter such as
//! `gofmt` can be chained with [`run_format_command`].

use std::collections::BTreeSet;
use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::{GenError, GenResult};

/// One import spec.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ImportSpec {
    path: String,
    alias: Option<String>,
}

impl ImportSpec {
    fn parse(spec: &str) -> Option<Self> {
        let spec = match spec.find("//") {
            Some(i) => &spec[..i],
            None => spec,
        }
        .trim();
        let (alias, quoted) = match spec.split_once(char::is_whitespace) {
            Some((alias, rest)) => (Some(alias.to_string()), rest.trim()),
            None => (None, spec),
        };
        let path = quoted.strip_prefix('"')?.strip_suffix('"')?;
        Some(Self {
            path: path.to_string(),
            alias,
        })
    }

    /// Name the package is referenced by.
    fn package_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        let mut segments = self.path.rsplit('/');
        let mut last = segments.next().unwrap_or_default();
        if is_major_version(last)
            && let Some(prev) = segments.next()
        {
            last = prev;
        }
        if let Some((base, version)) = last.rsplit_once('.')
            && is_major_version(version)
        {
            last = base;
        }
        last.strip_prefix("go-").unwrap_or(last).replace('-', "_")
    }

    fn always_kept(&self) -> bool {
        matches!(self.alias.as_deref(), Some("_") | Some("."))
    }

    fn is_std(&self) -> bool {
        !self.path.split('/').next().unwrap_or_default().contains('.')
    }

    fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("\t{} \"{}\"", alias, self.path),
            None => format!("\t\"{}\"", self.path),
        }
    }
}

fn is_major_version(s: &str) -> bool {
    s.strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace comments and string/rune literals with spaces, keeping
/// newlines so line numbers survive.
fn mask_literals(src: &str) -> GenResult<String> {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut line = 1;

    let blank = |c: char| if c == '\n' { '\n' } else { ' ' };

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                out.push(' ');
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    out.push(' ');
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                let start = line;
                out.push(' ');
                let mut prev = '\0';
                let mut closed = false;
                for next in chars.by_ref() {
                    out.push(blank(next));
                    if next == '\n' {
                        line += 1;
                    }
                    if prev == '*' && next == '/' {
                        closed = true;
                        break;
                    }
                    prev = next;
                }
                if !closed {
                    return Err(GenError::Format(format!(
                        "line {}: unterminated block comment",
                        start
                    )));
                }
            }
            '"' | '\'' | '`' => {
                let start = line;
                out.push(' ');
                let mut closed = false;
                while let Some(next) = chars.next() {
                    out.push(blank(next));
                    if next == '\n' {
                        if c != '`' {
                            break;
                        }
                        line += 1;
                    }
                    if next == '\\' && c != '`' {
                        if let Some(escaped) = chars.next() {
                            out.push(blank(escaped));
                        }
                        continue;
                    }
                    if next == c {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(GenError::Format(format!(
                        "line {}: unterminated literal",
                        start
                    )));
                }
            }
            '\n' => {
                line += 1;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

/// Check `()`, `[]` and `{}` nesting of literal-free source.
fn check_balance(masked: &str) -> GenResult<()> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    for c in masked.chars() {
        match c {
            '\n' => line += 1,
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => {
                        return Err(GenError::Format(format!(
                            "line {}: unexpected '{}'",
                            line, c
                        )));
                    }
                }
            }
            _ => {}
        }
    }
    match stack.pop() {
        Some((open, opened)) => Err(GenError::Format(format!(
            "unclosed '{}' opened on line {}",
            open, opened
        ))),
        None => Ok(()),
    }
}

/// True when `name.` appears as a qualified identifier in `code`.
fn uses_package(code: &str, name: &str) -> bool {
    let needle = format!("{}.", name);
    code.match_indices(&needle).any(|(i, _)| {
        code[..i]
            .chars()
            .next_back()
            .is_none_or(|prev| !is_ident_char(prev) && prev != '.')
    })
}

/// Line range `[start, end)` of the import declarations and their specs.
fn find_imports(lines: &[&str]) -> Option<(usize, usize, Vec<ImportSpec>)> {
    let package = lines.iter().position(|l| l.trim_start().starts_with("package "))?;
    let mut specs = Vec::new();
    let mut start = None;
    let mut end = package + 1;
    let mut i = package + 1;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() || line.starts_with("//") {
            i += 1;
            continue;
        }
        let Some(rest) = line.strip_prefix("import") else {
            break;
        };
        if start.is_none() {
            start = Some(i);
        }
        let rest = rest.trim();
        if rest.starts_with('(') {
            let inner = rest[1..].trim();
            if let Some(one_line) = inner.strip_suffix(')') {
                specs.extend(one_line.split(';').filter_map(ImportSpec::parse));
            } else {
                specs.extend(ImportSpec::parse(inner));
                i += 1;
                while i < lines.len() && lines[i].trim() != ")" {
                    specs.extend(ImportSpec::parse(lines[i].trim()));
                    i += 1;
                }
            }
        } else {
            specs.extend(ImportSpec::parse(rest));
        }
        i += 1;
        end = i;
    }
    start.map(|start| (start, end, specs))
}

fn import_block(specs: &[ImportSpec]) -> Vec<String> {
    let (std, third): (Vec<&ImportSpec>, Vec<&ImportSpec>) =
        specs.iter().partition(|spec| spec.is_std());
    let mut block = vec!["import (".to_string()];
    block.extend(std.iter().map(|spec| spec.render()));
    if !std.is_empty() && !third.is_empty() {
        block.push(String::new());
    }
    block.extend(third.iter().map(|spec| spec.render()));
    block.push(")".to_string());
    block
}

/// Normalize imports and whitespace, and verify bracket balance.
pub fn tidy_go_source(src: &str) -> GenResult<String> {
    let lines: Vec<&str> = src.lines().collect();
    let mut rebuilt: Vec<String> = Vec::with_capacity(lines.len());

    match find_imports(&lines) {
        Some((start, end, specs)) => {
            let body: Vec<&str> = lines[..start]
                .iter()
                .chain(&lines[end..])
                .copied()
                .collect();
            let code = mask_literals(&body.join("\n"))?;

            let kept: BTreeSet<ImportSpec> = specs
                .into_iter()
                .filter(|spec| spec.always_kept() || uses_package(&code, &spec.package_name()))
                .collect();
            let kept: Vec<ImportSpec> = kept.into_iter().collect();

            rebuilt.extend(lines[..start].iter().map(|l| l.to_string()));
            if !kept.is_empty() {
                rebuilt.extend(import_block(&kept));
            }
            rebuilt.extend(lines[end..].iter().map(|l| l.to_string()));
        }
        None => rebuilt.extend(lines.iter().map(|l| l.to_string())),
    }

    let mut out = String::with_capacity(src.len());
    let mut blank_run = true;
    for line in &rebuilt {
        let line = line.trim_end();
        if line.is_empty() {
            if !blank_run {
                out.push('\n');
            }
            blank_run = true;
            continue;
        }
        blank_run = false;
        out.push_str(line);
        out.push('\n');
    }
    while out.ends_with("\n\n") {
        out.pop();
    }

    check_balance(&mask_literals(&out)?)?;
    Ok(out)
}

/// Pipe `src` through an external formatter (`argv[0] argv[1..]`).
pub fn run_format_command(argv: &[String], src: &str) -> GenResult<String> {
    let Some((program, args)) = argv.split_first() else {
        return Ok(src.to_string());
    };
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| GenError::Format(format!("cannot run '{}': {}", program, e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(src.as_bytes())?;
    }
    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(GenError::Format(format!(
            "'{}' failed: {}",
            program,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    String::from_utf8(output.stdout)
        .map_err(|e| GenError::Format(format!("'{}' produced invalid UTF-8: {}", program, e)))
}
