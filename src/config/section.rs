//! Read-only view over a merged configuration tree.
//!
//! Keys are `:`-delimited paths (`Sample:StringVal`). Every segment is
//! matched case-insensitively, and a numeric segment addresses an array
//! element by index.

use toml::{Table, Value};

/// Separator between the segments of a configuration key.
pub const KEY_DELIMITER: char = ':';

/// An immutable snapshot of the configuration tree.
///
/// Produced by [`Config::build`](super::Config::build) or held by a
/// [`LiveConfiguration`](super::LiveConfiguration). Lookups never fail: a
/// missing key yields a [`Section`] whose [`exists`](Section::exists) is
/// `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    root: Table,
}

impl Configuration {
    pub fn new(root: Table) -> Self {
        Self { root }
    }

    /// A configuration with no keys at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Table {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Returns the section addressed by `key`, whether or not it exists.
    pub fn get_section(&self, key: &str) -> Section {
        Section {
            path: key.to_string(),
            key: last_segment(key).to_string(),
            value: lookup(&self.root, key).cloned(),
        }
    }

    /// Returns the raw value stored at `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&self.root, key)
    }

    /// Returns the top-level sections in tree order.
    pub fn children(&self) -> Vec<Section> {
        self.root
            .iter()
            .map(|(key, value)| Section {
                path: key.clone(),
                key: key.clone(),
                value: Some(value.clone()),
            })
            .collect()
    }
}

impl From<Table> for Configuration {
    fn from(root: Table) -> Self {
        Self::new(root)
    }
}

/// A named node of the configuration tree.
///
/// Carries the full path it was requested with, which is what diagnostics
/// and change tracking report.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    path: String,
    key: String,
    value: Option<Value>,
}

impl Section {
    /// The full `:`-delimited path of this section.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The last segment of [`path`](Self::path).
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Returns `true` if the tree holds a scalar, or a non-empty table or
    /// array, at this path.
    pub fn exists(&self) -> bool {
        match &self.value {
            None => false,
            Some(Value::Table(table)) => !table.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    /// Returns the descendant section addressed by `key`, relative to this one.
    pub fn get_section(&self, key: &str) -> Section {
        let value = match &self.value {
            Some(Value::Table(table)) => lookup(table, key).cloned(),
            Some(Value::Array(items)) => lookup_in_array(items, key).cloned(),
            _ => None,
        };
        Section {
            path: format!("{}{}{}", self.path, KEY_DELIMITER, key),
            key: last_segment(key).to_string(),
            value,
        }
    }
}

/// Finds the stored name of `key` in `table`, preferring an exact match over
/// a case-insensitive one.
pub(crate) fn find_key<'a>(table: &'a Table, key: &str) -> Option<&'a String> {
    if let Some((name, _)) = table.get_key_value(key) {
        return Some(name);
    }
    table.keys().find(|name| name.eq_ignore_ascii_case(key))
}

/// Looks up a `:`-delimited path in `table`.
///
/// Returns `None` for an empty path or one with an empty segment.
pub(crate) fn lookup<'a>(table: &'a Table, path: &str) -> Option<&'a Value> {
    let mut segments = path.split(KEY_DELIMITER);
    let first = segments.next().filter(|s| !s.is_empty())?;
    let mut current = table.get(find_key(table, first)?)?;

    for segment in segments {
        if segment.is_empty() {
            return None;
        }
        current = match current {
            Value::Table(nested) => nested.get(find_key(nested, segment)?)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

fn lookup_in_array<'a>(items: &'a [Value], path: &str) -> Option<&'a Value> {
    let (index, rest) = match path.split_once(KEY_DELIMITER) {
        Some((index, rest)) => (index, Some(rest)),
        None => (path, None),
    };
    let item = items.get(index.parse::<usize>().ok()?)?;
    match (rest, item) {
        (None, item) => Some(item),
        (Some(rest), Value::Table(nested)) => lookup(nested, rest),
        (Some(rest), Value::Array(nested)) => lookup_in_array(nested, rest),
        _ => None,
    }
}

fn last_segment(key: &str) -> &str {
    key.rsplit(KEY_DELIMITER).next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(toml_str: &str) -> Configuration {
        Configuration::new(toml::from_str(toml_str).unwrap())
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let config = make_config(
            r#"
            [Sample]
            StringVal = "Orange"
            "#,
        );

        let section = config.get_section("sample:stringval");
        assert!(section.exists());
        assert_eq!(section.value(), Some(&Value::String("Orange".into())));
        assert_eq!(section.path(), "sample:stringval");
        assert_eq!(section.key(), "stringval");
    }

    #[test]
    fn test_exact_match_preferred() {
        let config = make_config(
            r#"
            name = "lower"
            Name = "upper"
            "#,
        );

        assert_eq!(config.get("Name").unwrap().as_str(), Some("upper"));
        assert_eq!(config.get("name").unwrap().as_str(), Some("lower"));
    }

    #[test]
    fn test_missing_section_does_not_exist() {
        let config = make_config("a = 1");

        let section = config.get_section("b");
        assert!(!section.exists());
        assert!(section.value().is_none());
        assert!(!config.get_section("a:b").exists());
    }

    #[test]
    fn test_exists_for_parent_only_and_value_only() {
        let config = make_config(
            r#"
            leaf = "value"

            [parent.child]
            key = 1
            "#,
        );

        assert!(config.get_section("leaf").exists());
        assert!(config.get_section("parent").exists());
        assert!(config.get_section("parent:child:key").exists());
    }

    #[test]
    fn test_empty_table_does_not_exist() {
        let config = make_config("[empty]");

        assert!(config.get("empty").is_some());
        assert!(!config.get_section("empty").exists());
    }

    #[test]
    fn test_array_index_segments() {
        let config = make_config(
            r#"
            [[servers]]
            host = "a"

            [[servers]]
            host = "b"
            "#,
        );

        assert_eq!(config.get("servers:1:host").unwrap().as_str(), Some("b"));

        let servers = config.get_section("servers");
        assert!(servers.exists());
        let first = servers.get_section("0:Host");
        assert_eq!(first.value().and_then(Value::as_str), Some("a"));
        assert_eq!(first.path(), "servers:0:Host");
    }

    #[test]
    fn test_empty_segments_never_match() {
        let config = make_config("[a]\nb = 1");

        assert!(config.get("").is_none());
        assert!(config.get("a::b").is_none());
        assert!(config.get("a:").is_none());
    }

    #[test]
    fn test_children_in_tree_order() {
        let config = make_config("alpha = 1\nbeta = 2");

        let keys: Vec<_> = config
            .children()
            .iter()
            .map(|s| s.key().to_string())
            .collect();
        assert_eq!(keys, vec!["alpha", "beta"]);
    }
}
