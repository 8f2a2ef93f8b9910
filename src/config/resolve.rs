//! `${Section:Key}` references between configuration values.
//!
//! A reference is replaced by the scalar it points at, looked up with the
//! same case-insensitive path rules as [`Configuration::get`](super::Configuration::get).
//! `$$` produces a literal `$`.

use toml::{Table, Value};

use super::section::{lookup, KEY_DELIMITER};
use super::ConfigError;

/// Substitutes every reference in `table`.
///
/// Referenced strings are expanded in turn, so chains resolve in one pass. A
/// chain that leads back to itself is [`ConfigError::CircularReference`].
pub fn resolve_references(table: &mut Table) -> Result<(), ConfigError> {
    let snapshot = table.clone();
    table
        .iter_mut()
        .try_for_each(|(_, value)| substitute_value(value, &snapshot))
}

fn substitute_value(value: &mut Value, root: &Table) -> Result<(), ConfigError> {
    match value {
        Value::String(s) if s.contains('$') => {
            *s = expand(s, root, &mut Vec::new())?;
            Ok(())
        }
        Value::Table(nested) => nested
            .iter_mut()
            .try_for_each(|(_, v)| substitute_value(v, root)),
        Value::Array(items) => items
            .iter_mut()
            .try_for_each(|v| substitute_value(v, root)),
        _ => Ok(()),
    }
}

fn expand(input: &str, root: &Table, stack: &mut Vec<String>) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        if let Some(after) = tail.strip_prefix('$') {
            out.push('$');
            rest = after;
        } else if let Some(body) = tail.strip_prefix('{') {
            let end = body.find('}').ok_or(ConfigError::UnclosedReference)?;
            out.push_str(&scalar_at(root, &body[..end], stack)?);
            rest = &body[end + 1..];
        } else {
            out.push('$');
            rest = tail;
        }
    }
    out.push_str(rest);

    Ok(out)
}

fn scalar_at(root: &Table, path: &str, stack: &mut Vec<String>) -> Result<String, ConfigError> {
    if path.trim().is_empty() || path.split(KEY_DELIMITER).any(str::is_empty) {
        return Err(ConfigError::InvalidReferencePath(path.to_string()));
    }

    let id = path.to_ascii_lowercase();
    if stack.contains(&id) {
        return Err(ConfigError::CircularReference);
    }

    match lookup(root, path) {
        None => Err(ConfigError::ReferenceNotFound(path.to_string())),
        Some(Value::String(s)) => {
            stack.push(id);
            let expanded = expand(s, root, stack);
            stack.pop();
            expanded
        }
        Some(Value::Integer(i)) => Ok(i.to_string()),
        Some(Value::Float(f)) => Ok(f.to_string()),
        Some(Value::Boolean(b)) => Ok(b.to_string()),
        Some(Value::Datetime(dt)) => Ok(dt.to_string()),
        Some(Value::Array(_) | Value::Table(_)) => {
            Err(ConfigError::NonScalarReference(path.to_string()))
        }
    }
}
