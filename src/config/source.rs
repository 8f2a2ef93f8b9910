use toml::{Table, Value};

use super::section::find_key;
use super::ConfigError;

/// A value contributed by a source, placed at `path` within the tree.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub path: Vec<String>,
    pub value: Value,
}

impl ConfigEntry {
    pub fn root(table: Table) -> Self {
        Self {
            path: Vec::new(),
            value: Value::Table(table),
        }
    }

    pub fn at_path(path: Vec<String>, value: Value) -> Self {
        Self { path, value }
    }
}

/// A provider of configuration entries.
///
/// Sources are read again on every [`reload`](super::LiveConfiguration::reload),
/// so implementations should not cache what they return.
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError>;

    /// Human-readable name used in log output.
    fn name(&self) -> String;
}

/// Merges `value` into `table` at `path`.
///
/// Path segments match existing keys case-insensitively, so `Sample:IntVal`
/// from one source lands in the `[sample]` table of another.
pub fn merge_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        if let Value::Table(overlay) = value {
            deep_merge(table, overlay);
        }
        return;
    };

    let key = find_key(table, first)
        .cloned()
        .unwrap_or_else(|| first.clone());

    if rest.is_empty() {
        match (table.get_mut(&key), value) {
            (Some(Value::Table(base)), Value::Table(overlay)) => deep_merge(base, overlay),
            (_, value) => {
                table.insert(key, value);
            }
        }
        return;
    }

    if !matches!(table.get(&key), Some(Value::Table(_))) {
        table.insert(key.clone(), Value::Table(Table::new()));
    }

    if let Some(Value::Table(nested)) = table.get_mut(&key) {
        merge_at_path(nested, rest, value);
    }
}

fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        let key = find_key(base, &key).cloned().unwrap_or(key);
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
