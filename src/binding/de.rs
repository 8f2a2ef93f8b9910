//! Deserialization of a section laid over the target's current values.
//!
//! A [`Layered`] pairs the target's serialized form (`base`) with the
//! section found in the configuration (`over`). Struct fields and map
//! entries present in either layer are produced, with `over` winning, so
//! fields the section does not mention keep their values.
//!
//! Configuration values are mostly strings, so scalars are converted
//! toward whatever type the target asks for: `"8080"` feeds a `u16`,
//! `"TRUE"` a `bool`, and `"01234"` stays `"01234"` for a `String`.

use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    Unexpected, VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use toml::{Table, Value};

use super::ConvertError;

type Result<T> = std::result::Result<T, ConvertError>;

#[derive(Clone, Copy)]
pub(super) struct Layered<'a> {
    base: Option<&'a Value>,
    over: Option<&'a Value>,
}

impl<'a> Layered<'a> {
    pub(super) fn new(base: Option<&'a Value>, over: Option<&'a Value>) -> Self {
        Self { base, over }
    }

    fn value(&self) -> Option<&'a Value> {
        self.over.or(self.base)
    }

    fn expect_value(&self) -> Result<&'a Value> {
        self.value()
            .ok_or_else(|| de::Error::custom("no value in either layer"))
    }

    /// Both layers as tables, when the value to produce is a table.
    fn tables(&self) -> Option<(Option<&'a Table>, Option<&'a Table>)> {
        match (self.base, self.over) {
            (base, Some(Value::Table(over))) => Some((base.and_then(Value::as_table), Some(over))),
            (Some(Value::Table(base)), None) => Some((Some(base), None)),
            _ => None,
        }
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::String(s) => Unexpected::Str(s),
        Value::Integer(i) => Unexpected::Signed(*i),
        Value::Float(f) => Unexpected::Float(*f),
        Value::Boolean(b) => Unexpected::Bool(*b),
        Value::Datetime(_) => Unexpected::Other("datetime"),
        Value::Array(_) => Unexpected::Seq,
        Value::Table(_) => Unexpected::Map,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

macro_rules! deserialize_integer {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
            match self.expect_value()? {
                Value::Integer(i) => visitor.visit_i64(*i),
                Value::String(s) => {
                    let trimmed = s.trim();
                    if let Ok(i) = trimmed.parse::<i64>() {
                        visitor.visit_i64(i)
                    } else if let Ok(u) = trimmed.parse::<u64>() {
                        visitor.visit_u64(u)
                    } else {
                        Err(de::Error::invalid_value(Unexpected::Str(s), &visitor))
                    }
                }
                other => Err(de::Error::invalid_type(unexpected(other), &visitor)),
            }
        }
    )*};
}

macro_rules! deserialize_float {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
            match self.expect_value()? {
                Value::Float(f) => visitor.visit_f64(*f),
                Value::Integer(i) => visitor.visit_f64(*i as f64),
                Value::String(s) => match s.trim().parse::<f64>() {
                    Ok(f) => visitor.visit_f64(f),
                    Err(_) => Err(de::Error::invalid_value(Unexpected::Str(s), &visitor)),
                },
                other => Err(de::Error::invalid_type(unexpected(other), &visitor)),
            }
        }
    )*};
}

impl<'de, 'a> Deserializer<'de> for Layered<'a> {
    type Error = ConvertError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if let Some((base, over)) = self.tables() {
            return visitor.visit_map(Entries::new(map_entries(base, over)));
        }
        match self.expect_value()? {
            Value::String(s) => visitor.visit_str(s),
            Value::Integer(i) => visitor.visit_i64(*i),
            Value::Float(f) => visitor.visit_f64(*f),
            Value::Boolean(b) => visitor.visit_bool(*b),
            Value::Datetime(dt) => visitor.visit_string(dt.to_string()),
            Value::Array(items) => visitor.visit_seq(Items::new(items.iter().collect())),
            Value::Table(table) => visitor.visit_map(Entries::new(map_entries(None, Some(table)))),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.expect_value()? {
            Value::Boolean(b) => visitor.visit_bool(*b),
            Value::String(s) => match parse_bool(s) {
                Some(b) => visitor.visit_bool(b),
                None => Err(de::Error::invalid_value(Unexpected::Str(s), &visitor)),
            },
            other => Err(de::Error::invalid_type(unexpected(other), &visitor)),
        }
    }

    deserialize_integer!(
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
    );

    deserialize_float!(deserialize_f32 deserialize_f64);

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.expect_value()? {
            Value::String(s) => visitor.visit_str(s),
            Value::Integer(i) => visitor.visit_string(i.to_string()),
            Value::Float(f) => visitor.visit_string(f.to_string()),
            Value::Boolean(b) => visitor.visit_string(b.to_string()),
            Value::Datetime(dt) => visitor.visit_string(dt.to_string()),
            other => Err(de::Error::invalid_type(unexpected(other), &visitor)),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value() {
            Some(_) => visitor.visit_some(self),
            None => visitor.visit_none(),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.expect_value()? {
            Value::Array(items) => visitor.visit_seq(Items::new(items.iter().collect())),
            Value::Table(table) if table.is_empty() => visitor.visit_seq(Items::new(Vec::new())),
            Value::Table(table) => match indexed_items(table) {
                Some(items) => visitor.visit_seq(Items::new(items)),
                None => Err(de::Error::invalid_type(Unexpected::Map, &visitor)),
            },
            other => Err(de::Error::invalid_type(unexpected(other), &visitor)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.tables() {
            Some((base, over)) => visitor.visit_map(Entries::new(map_entries(base, over))),
            None => Err(de::Error::invalid_type(unexpected(self.expect_value()?), &visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.tables() {
            Some((base, over)) => visitor.visit_map(Entries::new(struct_entries(base, over, fields))),
            None => Err(de::Error::invalid_type(unexpected(self.expect_value()?), &visitor)),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.expect_value()? {
            Value::String(s) => {
                let variant: de::value::StrDeserializer<'_, ConvertError> =
                    variant_name(variants, s).into_deserializer();
                visitor.visit_enum(variant)
            }
            Value::Table(table) if table.len() == 1 => match table.iter().next() {
                Some((key, value)) => visitor.visit_enum(Variant {
                    name: variant_name(variants, key),
                    value,
                }),
                None => Err(de::Error::invalid_length(0, &visitor)),
            },
            other => Err(de::Error::invalid_type(unexpected(other), &visitor)),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        i128 u128 bytes byte_buf
    }
}

/// How closely a configuration key matches a field name. Lower is closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FieldMatch {
    Exact,
    IgnoreCase,
    /// Equal once ASCII case, `_` and `-` are ignored.
    Loose,
}

fn field_match(field: &str, key: &str) -> Option<FieldMatch> {
    if field == key {
        Some(FieldMatch::Exact)
    } else if field.eq_ignore_ascii_case(key) {
        Some(FieldMatch::IgnoreCase)
    } else if loose(field).eq(loose(key)) {
        Some(FieldMatch::Loose)
    } else {
        None
    }
}

fn loose(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
}

/// Entries for a struct: every field of `base`, with each configuration key
/// laid over the field it matches most closely.
///
/// Keys that match no field are dropped.
fn struct_entries<'a>(
    base: Option<&'a Table>,
    over: Option<&'a Table>,
    fields: &'static [&'static str],
) -> Vec<(String, Layered<'a>)> {
    let mut chosen: Vec<Option<(FieldMatch, &'a Value)>> = vec![None; fields.len()];
    for (key, value) in over.into_iter().flatten() {
        let best = fields
            .iter()
            .enumerate()
            .filter_map(|(i, field)| field_match(field, key).map(|rank| (rank, i)))
            .min();
        if let Some((rank, i)) = best {
            if chosen[i].map_or(true, |(current, _)| rank < current) {
                chosen[i] = Some((rank, value));
            }
        }
    }

    let mut entries = base_entries(base);
    for (field, choice) in fields.iter().zip(chosen) {
        let Some((_, value)) = choice else {
            continue;
        };
        match entries.iter_mut().find(|(name, _)| name.as_str() == *field) {
            Some((_, layered)) => layered.over = Some(value),
            None => entries.push((field.to_string(), Layered::new(None, Some(value)))),
        }
    }
    entries
}

/// Entries for a map: keys of both layers, with configuration keys kept as
/// written unless they name an existing entry.
fn map_entries<'a>(base: Option<&'a Table>, over: Option<&'a Table>) -> Vec<(String, Layered<'a>)> {
    let mut entries = base_entries(base);
    for (key, value) in over.into_iter().flatten() {
        let existing = entries
            .iter()
            .position(|(name, _)| name == key)
            .or_else(|| entries.iter().position(|(name, _)| name.eq_ignore_ascii_case(key)));
        match existing {
            Some(i) => entries[i].1.over = Some(value),
            None => entries.push((key.clone(), Layered::new(None, Some(value)))),
        }
    }
    entries
}

fn base_entries(base: Option<&Table>) -> Vec<(String, Layered<'_>)> {
    base.into_iter()
        .flatten()
        .map(|(key, value)| (key.clone(), Layered::new(Some(value), None)))
        .collect()
}

/// Returns the values of a table whose keys are all array indices, in index order.
fn indexed_items(table: &Table) -> Option<Vec<&Value>> {
    let mut items = table
        .iter()
        .map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
        .collect::<Option<Vec<_>>>()?;
    items.sort_by_key(|(i, _)| *i);
    Some(items.into_iter().map(|(_, v)| v).collect())
}

fn variant_name<'v>(variants: &'static [&'static str], given: &'v str) -> &'v str {
    let given = given.trim();
    variants
        .iter()
        .find(|v| **v == given)
        .or_else(|| variants.iter().find(|v| v.eq_ignore_ascii_case(given)))
        .copied()
        .unwrap_or(given)
}

struct Items<'a> {
    items: std::vec::IntoIter<&'a Value>,
    index: usize,
}

impl<'a> Items<'a> {
    fn new(items: Vec<&'a Value>) -> Self {
        Self {
            items: items.into_iter(),
            index: 0,
        }
    }
}

impl<'de, 'a> SeqAccess<'de> for Items<'a> {
    type Error = ConvertError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        let Some(item) = self.items.next() else {
            return Ok(None);
        };
        let index = self.index;
        self.index += 1;
        seed.deserialize(Layered::new(None, Some(item)))
            .map(Some)
            .map_err(|e| e.at(&index.to_string()))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct Entries<'a> {
    entries: std::vec::IntoIter<(String, Layered<'a>)>,
    pending: Option<(String, Layered<'a>)>,
}

impl<'a> Entries<'a> {
    fn new(entries: Vec<(String, Layered<'a>)>) -> Self {
        Self {
            entries: entries.into_iter(),
            pending: None,
        }
    }
}

impl<'de, 'a> MapAccess<'de> for Entries<'a> {
    type Error = ConvertError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        let Some((key, value)) = self.entries.next() else {
            return Ok(None);
        };
        // Keys go through the same conversions so maps keyed by numbers work.
        let name = Value::String(key.clone());
        let parsed = seed
            .deserialize(Layered::new(None, Some(&name)))
            .map_err(|e| e.at(&key))?;
        self.pending = Some((key, value));
        Ok(Some(parsed))
    }

    fn next_value_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<T::Value> {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| de::Error::custom("value requested before its key"))?;
        seed.deserialize(value).map_err(|e| e.at(&key))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct Variant<'a> {
    name: &'a str,
    value: &'a Value,
}

impl<'de, 'a> EnumAccess<'de> for Variant<'a> {
    type Error = ConvertError;
    type Variant = Layered<'a>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let name: de::value::StrDeserializer<'_, ConvertError> = self.name.into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((variant, Layered::new(None, Some(self.value))))
    }
}

impl<'de, 'a> VariantAccess<'de> for Layered<'a> {
    type Error = ConvertError;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_struct("", fields, visitor)
    }
}
