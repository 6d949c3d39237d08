use std::collections::BTreeMap;

use lane_types::LaneError;
use winnow::ascii::{digit1, multispace0};
use winnow::combinator::{alt, opt, preceded};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::token::{any, take_while};
use winnow::{ModalResult, Parser};

use crate::ast::*;

const KEYWORDS: &[&str] = &["lane", "before_all", "after_all", "error", "do", "end"];

fn make_cut_error(desc: &'static str) -> ErrMode<ContextError> {
    let mut e = ContextError::new();
    e.push(StrContext::Expected(StrContextValue::Description(desc)));
    ErrMode::Cut(e)
}

fn backtrack() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

/// Blank out `#` line comments. Comment bytes become spaces so that byte
/// offsets, and therefore reported line/col positions, are unchanged.
pub(crate) fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                out.push(c);
            }
            None if c == '#' => {
                out.push(' ');
                for rest in chars.by_ref() {
                    if rest == '\n' {
                        out.push('\n');
                        break;
                    }
                    out.extend(std::iter::repeat(' ').take(rest.len_utf8()));
                }
            }
            None => out.push(c),
        }
    }
    out
}

/// Whitespace consumer (including newlines).
fn ws<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    multispace0.parse_next(input)
}

/// Whitespace consumer that stays on the current line.
fn inline_ws<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(0.., [' ', '\t']).parse_next(input)
}

/// Parse an identifier: [A-Za-z_][A-Za-z0-9_]*
fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1, |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// Match a whole-word keyword, leaving the input untouched on mismatch.
fn keyword(input: &mut &str, kw: &str) -> ModalResult<()> {
    let start = *input;
    let id = identifier.parse_next(input)?;
    if id == kw {
        Ok(())
    } else {
        *input = start;
        Err(backtrack())
    }
}

/// Parse a double-quoted string with escape support.
fn quoted_string(input: &mut &str) -> ModalResult<String> {
    let _ = '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let c = any.parse_next(input)?;
        match c {
            '"' => break,
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    '\\' => s.push('\\'),
                    '"' => s.push('"'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            other => s.push(other),
        }
    }
    Ok(s)
}

/// Parse a single-quoted string. Only `\'` and `\\` are escapes.
fn single_quoted_string(input: &mut &str) -> ModalResult<String> {
    let _ = '\''.parse_next(input)?;
    let mut s = String::new();
    loop {
        let c = any.parse_next(input)?;
        match c {
            '\'' => break,
            '\\' => {
                let esc = any.parse_next(input)?;
                if esc != '\'' && esc != '\\' {
                    s.push('\\');
                }
                s.push(esc);
            }
            other => s.push(other),
        }
    }
    Ok(s)
}

fn string_value(input: &mut &str) -> ModalResult<String> {
    alt((quoted_string, single_quoted_string)).parse_next(input)
}

/// Parse a symbol: `:name` or `:"quoted name"`.
fn symbol(input: &mut &str) -> ModalResult<String> {
    preceded(
        ':',
        alt((identifier.map(String::from), quoted_string)),
    )
    .parse_next(input)
}

/// Parse a float: optional sign, digits, '.', digits.
fn float_value(input: &mut &str) -> ModalResult<f64> {
    let s: &str = (opt(alt(('-', '+'))), digit1, '.', digit1)
        .take()
        .parse_next(input)?;
    s.parse().map_err(|_| backtrack())
}

/// Parse an integer: optional sign + digits.
fn integer_value(input: &mut &str) -> ModalResult<i64> {
    let s: &str = (opt(alt(('-', '+'))), digit1).take().parse_next(input)?;
    s.parse().map_err(|_| backtrack())
}

/// Parse `[lit, lit, ...]`, trailing comma allowed.
fn array_value(input: &mut &str) -> ModalResult<Literal> {
    let _ = '['.parse_next(input)?;
    let mut items = Vec::new();
    loop {
        let _ = ws.parse_next(input)?;
        if opt(']').parse_next(input)?.is_some() {
            break;
        }
        let item = literal_value
            .context(StrContext::Expected(StrContextValue::Description(
                "array element",
            )))
            .parse_next(input)?;
        items.push(item);
        let _ = ws.parse_next(input)?;
        if opt(',').parse_next(input)?.is_none() {
            let _ = ws.parse_next(input)?;
            ']'.parse_next(input)
                .map_err(|_: ErrMode<ContextError>| make_cut_error("`,` or `]`"))?;
            break;
        }
    }
    Ok(Literal::Array(items))
}

/// Hash key: `key:` or `"key" =>` / `:key =>`.
fn hash_key(input: &mut &str) -> ModalResult<String> {
    alt((
        (identifier, ':').map(|(k, _): (&str, char)| k.to_string()),
        (alt((string_value, symbol)), ws, "=>").map(|(k, _, _)| k),
    ))
    .parse_next(input)
}

/// Parse `{ key: lit, "k" => lit }`, trailing comma allowed.
fn hash_value(input: &mut &str) -> ModalResult<Literal> {
    let _ = '{'.parse_next(input)?;
    let mut map = BTreeMap::new();
    loop {
        let _ = ws.parse_next(input)?;
        if opt('}').parse_next(input)?.is_some() {
            break;
        }
        let key = hash_key
            .context(StrContext::Expected(StrContextValue::Description("hash key")))
            .parse_next(input)?;
        let _ = ws.parse_next(input)?;
        let value = literal_value
            .context(StrContext::Expected(StrContextValue::Description(
                "hash value",
            )))
            .parse_next(input)?;
        map.insert(key, value);
        let _ = ws.parse_next(input)?;
        if opt(',').parse_next(input)?.is_none() {
            let _ = ws.parse_next(input)?;
            '}'.parse_next(input)
                .map_err(|_: ErrMode<ContextError>| make_cut_error("`,` or `}`"))?;
            break;
        }
    }
    Ok(Literal::Hash(map))
}

/// `true`, `false`, `nil`, or a block-parameter reference (`options[:key]`).
fn word_value(input: &mut &str) -> ModalResult<Literal> {
    let word = identifier.parse_next(input)?;
    match word {
        "true" => return Ok(Literal::Bool(true)),
        "false" => return Ok(Literal::Bool(false)),
        "nil" => return Ok(Literal::Nil),
        _ => {}
    }
    let index = opt((
        '[',
        ws,
        alt((symbol, string_value)),
        ws,
        ']',
    ))
    .parse_next(input)?;
    Ok(Literal::Variable {
        name: word.to_string(),
        key: index.map(|(_, _, key, _, _)| key),
    })
}

/// Parse an argument literal.
fn literal_value(input: &mut &str) -> ModalResult<Literal> {
    alt((
        string_value.map(Literal::String),
        symbol.map(Literal::Symbol),
        float_value.map(Literal::Float),
        integer_value.map(Literal::Integer),
        array_value,
        hash_value,
        word_value,
    ))
    .parse_next(input)
}

/// Intermediate form of a call, before argument/variable checks.
pub(crate) struct RawCall {
    pub(crate) action: String,
    pub(crate) args: Vec<(String, Literal)>,
    pub(crate) at: usize,
}

pub(crate) enum RawKind {
    Lane(String),
    BeforeAll,
    AfterAll,
    Error,
}

/// Intermediate form of a top-level declaration.
pub(crate) struct RawItem {
    pub(crate) kind: RawKind,
    pub(crate) params: Vec<String>,
    pub(crate) calls: Vec<RawCall>,
    pub(crate) at: usize,
}

fn offset(src: &str, input: &str) -> usize {
    src.len() - input.len()
}

/// Parse `(key: lit, ...)` after the opening paren has been consumed.
fn call_args(input: &mut &str) -> ModalResult<Vec<(String, Literal)>> {
    let mut args = Vec::new();
    loop {
        let _ = ws.parse_next(input)?;
        if opt(')').parse_next(input)?.is_some() {
            break;
        }
        let key = identifier
            .context(StrContext::Expected(StrContextValue::Description(
                "keyword argument name",
            )))
            .parse_next(input)
            .map_err(|_| make_cut_error("keyword argument name"))?;
        ':'.parse_next(input)
            .map_err(|_: ErrMode<ContextError>| make_cut_error("`:` after argument name"))?;
        let _ = ws.parse_next(input)?;
        let value = literal_value
            .parse_next(input)
            .map_err(|_| make_cut_error("argument value"))?;
        args.push((key.to_string(), value));
        let _ = ws.parse_next(input)?;
        if opt(',').parse_next(input)?.is_none() {
            let _ = ws.parse_next(input)?;
            ')'.parse_next(input)
                .map_err(|_: ErrMode<ContextError>| make_cut_error("`,` or `)`"))?;
            break;
        }
    }
    Ok(args)
}

/// Parse an optional `|a, b|` block parameter list.
fn block_params(input: &mut &str) -> ModalResult<Vec<String>> {
    let _ = inline_ws.parse_next(input)?;
    let mut params = Vec::new();
    if opt('|').parse_next(input)?.is_none() {
        return Ok(params);
    }
    loop {
        let _ = inline_ws.parse_next(input)?;
        let name = identifier
            .parse_next(input)
            .map_err(|_| make_cut_error("block parameter name"))?;
        params.push(name.to_string());
        let _ = inline_ws.parse_next(input)?;
        if opt(',').parse_next(input)?.is_none() {
            '|'.parse_next(input)
                .map_err(|_: ErrMode<ContextError>| make_cut_error("`,` or `|`"))?;
            break;
        }
    }
    Ok(params)
}

/// Parse calls until the closing `end`.
fn block_body(input: &mut &str, src: &str) -> ModalResult<Vec<RawCall>> {
    let mut calls = Vec::new();
    loop {
        let _ = ws.parse_next(input)?;
        if opt(';').parse_next(input)?.is_some() {
            continue;
        }
        if input.is_empty() {
            return Err(make_cut_error("`end` to close the block"));
        }
        let start = *input;
        let at = offset(src, input);
        let name = identifier
            .parse_next(input)
            .map_err(|_| make_cut_error("action call or `end`"))?;
        if name == "end" {
            break;
        }
        if KEYWORDS.contains(&name) {
            *input = start;
            return Err(make_cut_error(
                "action call or `end` (declarations cannot be nested)",
            ));
        }
        let _ = inline_ws.parse_next(input)?;
        let args = if opt('(').parse_next(input)?.is_some() {
            call_args(input)?
        } else {
            Vec::new()
        };
        calls.push(RawCall {
            action: name.to_string(),
            args,
            at,
        });
    }
    Ok(calls)
}

/// Parse the lane name: `:beta`, `beta` or `"beta"`. A bare name may not be
/// a reserved word.
fn lane_name(input: &mut &str) -> ModalResult<String> {
    if let Some(name) = opt(alt((symbol, string_value))).parse_next(input)? {
        return Ok(name);
    }
    let start = *input;
    let name = identifier
        .parse_next(input)
        .map_err(|_| make_cut_error("lane name"))?;
    if KEYWORDS.contains(&name) {
        *input = start;
        return Err(make_cut_error("lane name (reserved words must be quoted or written as a symbol)"));
    }
    Ok(name.to_string())
}

fn expect_do(input: &mut &str) -> ModalResult<()> {
    let _ = inline_ws.parse_next(input)?;
    keyword(input, "do").map_err(|_| make_cut_error("`do`"))
}

/// Parse one top-level declaration.
fn item(input: &mut &str, src: &str) -> ModalResult<RawItem> {
    let start = *input;
    let at = offset(src, input);
    let word = identifier
        .parse_next(input)
        .map_err(|_| make_cut_error("`lane`, `before_all`, `after_all` or `error` declaration"))?;

    let kind = match word {
        "lane" => {
            let _ = inline_ws.parse_next(input)?;
            RawKind::Lane(lane_name(input)?)
        }
        "before_all" => RawKind::BeforeAll,
        "after_all" => RawKind::AfterAll,
        "error" => RawKind::Error,
        _ => {
            *input = start;
            return Err(make_cut_error(
                "`lane`, `before_all`, `after_all` or `error` declaration",
            ));
        }
    };

    expect_do(input)?;
    let params = block_params(input)?;
    let calls = block_body(input, src)?;
    Ok(RawItem {
        kind,
        params,
        calls,
        at,
    })
}

/// Parse the whole script into raw declarations.
fn items(input: &mut &str, src: &str) -> ModalResult<Vec<RawItem>> {
    let mut out = Vec::new();
    loop {
        let _ = ws.parse_next(input)?;
        if opt(';').parse_next(input)?.is_some() {
            continue;
        }
        if input.is_empty() {
            break;
        }
        out.push(item(input, src)?);
    }
    Ok(out)
}

/// Compute a 1-based (line, col) for a byte offset.
fn offset_to_line_col(src: &str, offset: usize) -> (usize, usize) {
    let prefix = &src[..offset.min(src.len())];
    let line = prefix.matches('\n').count() + 1;
    let col = match prefix.rfind('\n') {
        Some(pos) => offset - pos,
        None => offset + 1,
    };
    (line, col)
}

fn script_error(src: &str, offset: usize, message: impl Into<String>) -> LaneError {
    let (line, col) = offset_to_line_col(src, offset);
    let snippet: String = src
        .get(offset..)
        .unwrap_or_default()
        .chars()
        .take(40)
        .collect();
    LaneError::Script {
        line,
        col,
        message: message.into(),
        source_snippet: if snippet.trim().is_empty() {
            None
        } else {
            Some(snippet)
        },
    }
}

fn check_params(
    src: &str,
    item: &RawItem,
    block: &str,
    max: usize,
) -> Result<(), LaneError> {
    if item.params.len() > max {
        return Err(script_error(
            src,
            item.at,
            format!(
                "`{block}` takes at most {max} block parameter(s), got {}",
                item.params.len()
            ),
        ));
    }
    for (i, p) in item.params.iter().enumerate() {
        if item.params[..i].contains(p) {
            return Err(script_error(
                src,
                item.at,
                format!("duplicate block parameter '{p}' in `{block}`"),
            ));
        }
    }
    Ok(())
}

/// Turn raw calls into steps, rejecting duplicate argument keys and
/// references to names the block does not bind.
fn build_steps(src: &str, calls: Vec<RawCall>, params: &[String]) -> Result<Vec<Step>, LaneError> {
    let mut steps = Vec::with_capacity(calls.len());
    for call in calls {
        let mut args = BTreeMap::new();
        for (key, value) in call.args {
            if let Some(var) = value.variables().into_iter().find(|v| !params.iter().any(|p| p == v)) {
                return Err(script_error(
                    src,
                    call.at,
                    format!("undefined variable '{var}' in call to '{}'", call.action),
                ));
            }
            if args.insert(key.clone(), value).is_some() {
                return Err(script_error(
                    src,
                    call.at,
                    format!("duplicate argument '{key}' in call to '{}'", call.action),
                ));
            }
        }
        steps.push(Step {
            action: call.action,
            args,
            line: offset_to_line_col(src, call.at).0,
        });
    }
    Ok(steps)
}

fn build_hook(src: &str, item: RawItem) -> Result<Hook, LaneError> {
    let line = offset_to_line_col(src, item.at).0;
    let steps = build_steps(src, item.calls, &item.params)?;
    Ok(Hook {
        params: item.params,
        steps,
        line,
    })
}

/// Merge raw declarations into a program, enforcing uniqueness rules.
fn build_program(src: &str, items: Vec<RawItem>) -> Result<ParsedProgram, LaneError> {
    let mut program = ParsedProgram::default();

    for item in items {
        match item.kind {
            RawKind::Lane(ref name) => {
                if program.has_lane(name) {
                    return Err(script_error(
                        src,
                        item.at,
                        format!("duplicate lane '{name}'"),
                    ));
                }
                check_params(src, &item, "lane", 1)?;
                let name = name.clone();
                let line = offset_to_line_col(src, item.at).0;
                let steps = build_steps(src, item.calls, &item.params)?;
                program.lanes.push(Lane {
                    name,
                    params: item.params,
                    steps,
                    line,
                });
            }
            RawKind::BeforeAll => {
                if program.before_all.is_some() {
                    return Err(script_error(src, item.at, "more than one `before_all` block"));
                }
                check_params(src, &item, "before_all", 2)?;
                program.before_all = Some(build_hook(src, item)?);
            }
            RawKind::AfterAll => {
                if program.after_all.is_some() {
                    return Err(script_error(src, item.at, "more than one `after_all` block"));
                }
                check_params(src, &item, "after_all", 2)?;
                program.after_all = Some(build_hook(src, item)?);
            }
            RawKind::Error => {
                if program.error_handler.is_some() {
                    return Err(script_error(src, item.at, "more than one `error` block"));
                }
                check_params(src, &item, "error", 2)?;
                program.error_handler = Some(build_hook(src, item)?);
            }
        }
    }

    Ok(program)
}

/// Public entry point.
pub fn compile(source: &str) -> Result<ParsedProgram, LaneError> {
    let stripped = strip_comments(source);
    let mut remaining = stripped.as_str();

    let raw = items(&mut remaining, &stripped).map_err(|e| {
        let message = match &e {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => {
                let m = ctx.to_string();
                if m.is_empty() {
                    "unexpected input".to_string()
                } else {
                    m
                }
            }
            ErrMode::Incomplete(_) => "unexpected end of script".to_string(),
        };
        script_error(&stripped, offset(&stripped, remaining), message)
    })?;

    let program = build_program(&stripped, raw)?;
    tracing::debug!(
        lanes = program.lanes.len(),
        before_all = program.before_all.is_some(),
        after_all = program.after_all.is_some(),
        error_handler = program.error_handler.is_some(),
        "compiled script"
    );
    Ok(program)
}
