use rust_decimal::Decimal;

use super::values::{FieldKey, FieldValue, FormValues};

/// A typed form whose struct fields, in declaration order, are the form's fields.
///
/// Usually derived with `#[derive(FormModel)]`.
pub trait FormModel: Sized {
    fn field_names() -> &'static [&'static str];

    fn into_values(self) -> FormValues;

    /// Fails with the first field that is missing or holds another kind of value.
    fn from_values(values: &FormValues) -> Result<Self, FieldKey>;
}

pub trait FromFieldValue: Sized {
    fn from_field_value(value: &FieldValue) -> Option<Self>;
}

impl FromFieldValue for String {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_text().map(str::to_string)
    }
}

impl FromFieldValue for Decimal {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_number()
    }
}

impl FromFieldValue for bool {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromFieldValue for Vec<String> {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_choices().map(<[String]>::to_vec)
    }
}

impl FromFieldValue for FieldValue {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        Some(value.clone())
    }
}

#[doc(hidden)]
pub fn read_field<T>(values: &FormValues, name: &'static str) -> Result<T, FieldKey>
where
    T: FromFieldValue,
{
    values
        .get(name)
        .and_then(T::from_field_value)
        .ok_or_else(|| FieldKey::from(name))
}
