use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use indexmap::IndexMap;
use rust_decimal::Decimal;

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(Arc<str>);

impl FieldKey {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FieldKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&FieldKey> for FieldKey {
    fn from(value: &FieldKey) -> Self {
        value.clone()
    }
}

impl PartialEq<str> for FieldKey {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for FieldKey {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// A value produced by a form input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    Bool(bool),
    Choices(Vec<String>),
}

impl FieldValue {
    /// Blank text and empty choice lists are empty; numbers and flags never are.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Choices(choices) => choices.is_empty(),
            FieldValue::Number(_) | FieldValue::Bool(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            FieldValue::Choices(choices) => Some(choices),
            _ => None,
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::Choices(value)
    }
}

/// Field values in declaration order.
#[derive(Clone, Debug, Default)]
pub struct FormValues {
    entries: IndexMap<FieldKey, FieldValue>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<FieldKey>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Overwrites in place when the key exists, keeping its position.
    pub fn insert(
        &mut self,
        key: impl Into<FieldKey>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FieldValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for FormValues {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.entries.iter().eq(other.entries.iter())
    }
}

impl Eq for FormValues {}

impl<K, V> FromIterator<(K, V)> for FormValues
where
    K: Into<FieldKey>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FormValues::new();
        for (key, value) in iter {
            values.insert(key, value);
        }
        values
    }
}

/// Per-field error messages. Every declared field has an entry; `None` means no error.
#[derive(Clone, Debug, Default)]
pub struct FieldErrors {
    entries: IndexMap<FieldKey, Option<String>>,
}

impl FieldErrors {
    pub fn for_fields<'a>(keys: impl IntoIterator<Item = &'a FieldKey>) -> Self {
        Self {
            entries: keys.into_iter().map(|key| (key.clone(), None)).collect(),
        }
    }

    pub fn message(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|message| message.as_deref())
    }

    pub fn has_error(&self, key: &str) -> bool {
        self.message(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Fields currently holding a message, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &str)> {
        self.entries
            .iter()
            .filter_map(|(key, message)| message.as_deref().map(|message| (key, message)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Option::is_none)
    }

    pub(crate) fn set(&mut self, key: &FieldKey, message: Option<String>) {
        self.entries.insert(key.clone(), message);
    }

    pub(crate) fn ensure(&mut self, key: &FieldKey) {
        self.entries.entry(key.clone()).or_insert(None);
    }
}

impl PartialEq for FieldErrors {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.entries.iter().eq(other.entries.iter())
    }
}

impl Eq for FieldErrors {}
