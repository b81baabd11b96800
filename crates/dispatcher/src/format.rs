//! Filename templates and text helpers

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use contracts::Status;

use crate::error::DispatcherError;

static SHORT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https://t\.co\S+").expect("valid short link pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Render `template` against the status field mapping and join it onto `dirname`.
///
/// Fields are named in braces: `{id}`, `{created_at}`, nested members as
/// `{user.id}` or `{user[id]}`, list items as `{media[0][id]}`. `{{` and
/// `}}` produce literal braces. Fields the status leaves empty are absent
/// from the mapping and fail to render.
pub fn format_filename(
    status: &Status,
    template: &str,
    dirname: Option<&Path>,
) -> Result<PathBuf, DispatcherError> {
    let fields = Value::Object(status.as_dict());
    let name = render(template, &fields)?;
    Ok(match dirname {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
        _ => PathBuf::from(name),
    })
}

fn render(template: &str, fields: &Value) -> Result<String, DispatcherError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut expr = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(DispatcherError::template(
                                template,
                                "expected '}' before end of string",
                            ))
                        }
                        Some(ch) => expr.push(ch),
                    }
                }
                let value = lookup(template, fields, &expr)?;
                out.push_str(&display(value));
            }
            '}' => {
                return Err(DispatcherError::template(
                    template,
                    "single '}' encountered in format string",
                ))
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

fn lookup<'a>(template: &str, fields: &'a Value, expr: &str) -> Result<&'a Value, DispatcherError> {
    if expr.contains([':', '!']) {
        return Err(DispatcherError::template(
            template,
            format!("format spec in '{{{expr}}}' is not supported"),
        ));
    }

    let root_end = expr.find(['.', '[']).unwrap_or(expr.len());
    let root = &expr[..root_end];
    if root.is_empty() {
        return Err(DispatcherError::template(
            template,
            "positional fields are not supported",
        ));
    }

    let missing = || DispatcherError::template(template, format!("missing field '{expr}'"));
    let mut current = fields.get(root).ok_or_else(missing)?;
    let mut rest = &expr[root_end..];

    while !rest.is_empty() {
        let (key, remainder) = if let Some(after) = rest.strip_prefix('.') {
            let end = after.find(['.', '[']).unwrap_or(after.len());
            (&after[..end], &after[end..])
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = after.find(']').ok_or_else(|| {
                DispatcherError::template(template, format!("missing ']' in '{{{expr}}}'"))
            })?;
            (&after[..end], &after[end + 1..])
        } else {
            return Err(DispatcherError::template(
                template,
                format!("only '.' or '[' may follow ']' in '{{{expr}}}'"),
            ));
        };

        current = match current {
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.get(key),
        }
        .ok_or_else(missing)?;
        rest = remainder;
    }

    Ok(current)
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// Drop short links from `text` and collapse whitespace runs to one space.
///
/// Leading and trailing whitespace is collapsed, not trimmed.
pub fn remove_urls(text: &str) -> String {
    let stripped = SHORT_LINK.replace_all(text, "");
    WHITESPACE.replace_all(&stripped, " ").into_owned()
}

/// Path under `dirname` named by the final segment of `url`
pub fn url_to_file(url: &str, dirname: &Path) -> PathBuf {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    dirname.join(name)
}
