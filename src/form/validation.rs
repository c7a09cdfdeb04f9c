use std::fmt::{Display, Formatter};
use std::sync::Arc;

use super::controller::{FormController, FormResult, read_lock, write_lock};
use super::values::{FieldKey, FieldValue, FormValues};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldError {
    pub field: FieldKey,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<FieldKey>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for FieldError {}

/// Result of a full validation pass. `Invalid` keeps the validator's reporting order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(Vec<FieldError>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn errors(&self) -> &[FieldError] {
        match self {
            ValidationOutcome::Valid => &[],
            ValidationOutcome::Invalid(errors) => errors,
        }
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors().iter().any(|error| error.field == *field)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ValidatorCapabilities {
    pub full_validation: bool,
    pub field_validation: bool,
    pub required_introspection: bool,
}

impl ValidatorCapabilities {
    pub const fn all() -> Self {
        Self {
            full_validation: true,
            field_validation: true,
            required_introspection: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            full_validation: false,
            field_validation: false,
            required_introspection: false,
        }
    }
}

impl Default for ValidatorCapabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// An externally supplied schema checked synchronously against in-memory values.
pub trait SchemaValidator: Send + Sync {
    fn capabilities(&self) -> ValidatorCapabilities {
        ValidatorCapabilities::all()
    }

    /// Checks every field and reports all failures, not just the first.
    fn validate_sync(&self, values: &FormValues) -> Result<(), Vec<FieldError>>;

    fn validate_sync_at(&self, field: &FieldKey, values: &FormValues) -> Result<(), FieldError>;

    fn is_field_required(&self, _field: &FieldKey) -> bool {
        false
    }
}

impl<V> SchemaValidator for Arc<V>
where
    V: SchemaValidator + ?Sized,
{
    fn capabilities(&self) -> ValidatorCapabilities {
        (**self).capabilities()
    }

    fn validate_sync(&self, values: &FormValues) -> Result<(), Vec<FieldError>> {
        (**self).validate_sync(values)
    }

    fn validate_sync_at(&self, field: &FieldKey, values: &FormValues) -> Result<(), FieldError> {
        (**self).validate_sync_at(field, values)
    }

    fn is_field_required(&self, field: &FieldKey) -> bool {
        (**self).is_field_required(field)
    }
}

/// Wraps an optional validator. A missing validator, or one without synchronous
/// full and per-field checks, leaves the form unvalidated.
#[derive(Clone, Default)]
pub struct ValidatorAdapter {
    inner: Option<Arc<dyn SchemaValidator>>,
}

impl ValidatorAdapter {
    pub fn new(validator: Option<Arc<dyn SchemaValidator>>) -> Self {
        Self { inner: validator }
    }

    pub fn from_schema(schema: impl SchemaValidator + 'static) -> Self {
        Self {
            inner: Some(Arc::new(schema)),
        }
    }

    pub fn unvalidated() -> Self {
        Self { inner: None }
    }

    pub fn capabilities(&self) -> ValidatorCapabilities {
        self.inner
            .as_ref()
            .map_or(ValidatorCapabilities::none(), |validator| {
                validator.capabilities()
            })
    }

    pub fn supports_full_validation(&self) -> bool {
        self.capabilities().full_validation
    }

    pub fn supports_field_validation(&self) -> bool {
        self.capabilities().field_validation
    }

    pub fn supports_required_introspection(&self) -> bool {
        self.capabilities().required_introspection
    }

    pub fn has_validation(&self) -> bool {
        let capabilities = self.capabilities();
        capabilities.full_validation && capabilities.field_validation
    }

    pub fn is_field_required(&self, field: &FieldKey) -> bool {
        match &self.inner {
            Some(validator) if self.supports_required_introspection() => {
                validator.is_field_required(field)
            }
            _ => false,
        }
    }

    pub fn required_fields<'a>(
        &self,
        fields: impl IntoIterator<Item = &'a FieldKey>,
    ) -> Vec<FieldKey> {
        if !self.supports_required_introspection() {
            return Vec::new();
        }
        fields
            .into_iter()
            .filter(|field| self.is_field_required(field))
            .cloned()
            .collect()
    }

    /// `None` when validation is unavailable.
    pub fn validate_all(&self, values: &FormValues) -> Option<ValidationOutcome> {
        let validator = self.inner.as_ref().filter(|_| self.has_validation())?;
        Some(match validator.validate_sync(values) {
            Ok(()) => ValidationOutcome::Valid,
            Err(errors) if errors.is_empty() => ValidationOutcome::Valid,
            Err(errors) => ValidationOutcome::Invalid(errors),
        })
    }

    /// `None` when validation is unavailable.
    pub fn validate_field(
        &self,
        field: &FieldKey,
        values: &FormValues,
    ) -> Option<Result<(), FieldError>> {
        let validator = self.inner.as_ref().filter(|_| self.has_validation())?;
        Some(validator.validate_sync_at(field, values))
    }
}

impl std::fmt::Debug for ValidatorAdapter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorAdapter")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl FormController {
    /// Stores the value, then either validates the field against the updated
    /// values or just clears its displayed error.
    pub fn set_value(&self, field: &str, value: impl Into<FieldValue>) -> FormResult<()> {
        let (key, values) = {
            let mut state = write_lock(&self.state, "writing field value")?;
            let key = state.declared_key(field)?;
            let mut values = FormValues::clone(&state.values);
            values.insert(key.clone(), value);
            let values = Arc::new(values);
            state.values = values.clone();
            state.revision += 1;
            (key, values)
        };

        let result = if self.options.validate_on_change {
            self.validator.validate_field(&key, &values)
        } else {
            None
        };
        match result {
            Some(result) => self.apply_field_result(&key, result, true),
            None => {
                let mut state = write_lock(&self.state, "clearing field error")?;
                state.replace_errors(|errors| errors.set(&key, None));
                Ok(())
            }
        }
    }

    /// Blur validation only runs when per-change validation is off.
    pub fn touch(&self, field: &str) -> FormResult<()> {
        let (key, values) = {
            let state = read_lock(&self.state, "reading values for blur")?;
            (state.declared_key(field)?, state.values.clone())
        };
        if !self.options.validate_on_blur || self.options.validate_on_change {
            return Ok(());
        }
        match self.validator.validate_field(&key, &values) {
            Some(result) => self.apply_field_result(&key, result, false),
            None => Ok(()),
        }
    }

    fn apply_field_result(
        &self,
        key: &FieldKey,
        result: Result<(), FieldError>,
        clear_on_success: bool,
    ) -> FormResult<()> {
        let mut state = write_lock(&self.state, "writing field validation result")?;
        match result {
            Ok(()) => {
                state.progress.mark_valid(key);
                if clear_on_success {
                    state.replace_errors(|errors| errors.set(key, None));
                }
            }
            Err(error) => {
                state.progress.mark_invalid(key);
                state.replace_errors(|errors| errors.set(key, Some(error.message)));
            }
        }
        Ok(())
    }
}
