use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::model::FormModel;
use super::progress::{CountingFields, Progress, ProgressCounter};
use super::registry::{FieldHandle, FieldRegistry};
use super::validation::{FieldError, ValidationOutcome, ValidatorAdapter};
use super::values::{FieldErrors, FieldKey, FieldValue, FormValues};
use crate::scroll::{ScrollContainer, ScrollCoordinator, ScrollOutcome};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormPhase {
    Idle,
    Validating,
    Submitted { valid: bool },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormOptions {
    pub validate_on_change: bool,
    pub validate_on_blur: bool,
    pub count_required_only: bool,
    pub autoscroll: bool,
    pub enable_reinitialize: bool,
    pub counting_fields: Option<Vec<FieldKey>>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_on_change: false,
            validate_on_blur: true,
            count_required_only: true,
            autoscroll: true,
            enable_reinitialize: false,
            counting_fields: None,
        }
    }
}

impl FormOptions {
    pub fn counting_fields(&self) -> CountingFields {
        match &self.counting_fields {
            Some(fields) => CountingFields::Explicit(fields.clone()),
            None if self.count_required_only => CountingFields::RequiredOnly,
            None => CountingFields::All,
        }
    }
}

/// Reported once per submit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubmitOutcome {
    pub is_valid: bool,
    pub values: FormValues,
    pub first_error_field: Option<FieldKey>,
}

/// Immutable view of the form at one revision.
#[derive(Clone, Debug, PartialEq)]
pub struct FormSnapshot {
    pub values: Arc<FormValues>,
    pub errors: Arc<FieldErrors>,
    pub progress: Progress,
    pub phase: FormPhase,
    pub submit_count: u32,
    pub revision: u64,
}

impl FormSnapshot {
    /// Identity comparison; a changed form never shares maps with an older snapshot.
    pub fn same_state(&self, other: &Self) -> bool {
        self.revision == other.revision
            && Arc::ptr_eq(&self.values, &other.values)
            && Arc::ptr_eq(&self.errors, &other.errors)
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    InvalidPhaseTransition { from: FormPhase, to: FormPhase },
    UnknownField(FieldKey),
    ModelMismatch(FieldKey),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::InvalidPhaseTransition { from, to } => {
                write!(f, "invalid form phase transition: {from:?} -> {to:?}")
            }
            FormError::UnknownField(field) => write!(f, "field `{field}` is not declared"),
            FormError::ModelMismatch(field) => {
                write!(f, "field `{field}` is missing or has an unexpected type")
            }
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub(super) type SubmitCallback = Arc<dyn Fn(&SubmitOutcome) + Send + Sync>;

pub(super) struct FormState {
    pub(super) order: Vec<FieldKey>,
    pub(super) values: Arc<FormValues>,
    pub(super) errors: Arc<FieldErrors>,
    pub(super) progress: ProgressCounter,
    pub(super) phase: FormPhase,
    pub(super) submit_count: u32,
    pub(super) revision: u64,
}

impl FormState {
    pub(super) fn declared_key(&self, field: &str) -> FormResult<FieldKey> {
        self.order
            .iter()
            .find(|key| key.as_str() == field)
            .cloned()
            .ok_or_else(|| FormError::UnknownField(FieldKey::from(field)))
    }

    pub(super) fn replace_errors(&mut self, update: impl FnOnce(&mut FieldErrors)) {
        let mut errors = FieldErrors::clone(&self.errors);
        update(&mut errors);
        self.errors = Arc::new(errors);
        self.revision += 1;
    }
}

#[derive(Clone)]
pub struct FormController {
    pub(super) options: Arc<FormOptions>,
    pub(super) validator: ValidatorAdapter,
    pub(super) registry: Arc<FieldRegistry>,
    pub(super) scroll: ScrollCoordinator,
    pub(super) state: Arc<RwLock<FormState>>,
    pub(super) on_submit: Arc<RwLock<Option<SubmitCallback>>>,
}

impl FormController {
    /// The declared field set and its order come from `initial`.
    pub fn new(initial: FormValues, validator: ValidatorAdapter, options: FormOptions) -> Self {
        let order = initial.keys().cloned().collect::<Vec<_>>();
        let progress = ProgressCounter::resolve(&options.counting_fields(), &order, || {
            validator.required_fields(&order)
        });
        tracing::trace!(
            fields = order.len(),
            counted = progress.counted_fields().len(),
            validated = validator.has_validation(),
            "creating form controller"
        );
        Self {
            registry: Arc::new(FieldRegistry::create(&order)),
            state: Arc::new(RwLock::new(FormState {
                errors: Arc::new(FieldErrors::for_fields(&order)),
                values: Arc::new(initial),
                order,
                progress,
                phase: FormPhase::Idle,
                submit_count: 0,
                revision: 0,
            })),
            options: Arc::new(options),
            validator,
            scroll: ScrollCoordinator::new(),
            on_submit: Arc::new(RwLock::new(None)),
        }
    }

    pub fn from_model<M>(model: M, validator: ValidatorAdapter, options: FormOptions) -> Self
    where
        M: FormModel,
    {
        Self::new(model.into_values(), validator, options)
    }

    /// Reads the current values back into a typed model.
    pub fn model<M>(&self) -> FormResult<M>
    where
        M: FormModel,
    {
        let values = self.values()?;
        M::from_values(&values).map_err(FormError::ModelMismatch)
    }

    pub fn on_submit(
        &self,
        callback: impl Fn(&SubmitOutcome) + Send + Sync + 'static,
    ) -> FormResult<()> {
        let mut slot = write_lock(&self.on_submit, "registering submit callback")?;
        *slot = Some(Arc::new(callback));
        Ok(())
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn has_validation(&self) -> bool {
        self.validator.has_validation()
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn field_handle(&self, field: &str) -> Option<FieldHandle> {
        self.registry.get(field).cloned()
    }

    pub fn attach_scroll_container(&self, container: Arc<dyn ScrollContainer>) {
        self.scroll.attach_container(container);
    }

    pub fn fields(&self) -> FormResult<Vec<FieldKey>> {
        Ok(read_lock(&self.state, "reading field order")?.order.clone())
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.validator.is_field_required(&FieldKey::from(field))
    }

    pub fn values(&self) -> FormResult<Arc<FormValues>> {
        Ok(read_lock(&self.state, "reading form values")?.values.clone())
    }

    pub fn errors(&self) -> FormResult<Arc<FieldErrors>> {
        Ok(read_lock(&self.state, "reading form errors")?.errors.clone())
    }

    pub fn value(&self, field: &str) -> FormResult<Option<FieldValue>> {
        Ok(read_lock(&self.state, "reading field value")?
            .values
            .get(field)
            .cloned())
    }

    pub fn error(&self, field: &str) -> FormResult<Option<String>> {
        Ok(read_lock(&self.state, "reading field error")?
            .errors
            .message(field)
            .map(str::to_string))
    }

    pub fn progress(&self) -> FormResult<Progress> {
        Ok(read_lock(&self.state, "reading progress")?.progress.progress())
    }

    pub fn phase(&self) -> FormResult<FormPhase> {
        Ok(read_lock(&self.state, "reading form phase")?.phase)
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot {
            values: state.values.clone(),
            errors: state.errors.clone(),
            progress: state.progress.progress(),
            phase: state.phase,
            submit_count: state.submit_count,
            revision: state.revision,
        })
    }

    /// Validates the whole form, records errors and progress, and reports the
    /// outcome to the submit callback. Does not scroll.
    pub fn validate_submit(&self) -> FormResult<SubmitOutcome> {
        let values = {
            let mut state = write_lock(&self.state, "preparing submit")?;
            transition_phase(&mut state, FormPhase::Validating)?;
            state.submit_count = state.submit_count.saturating_add(1);
            state.values.clone()
        };

        let validation = self
            .validator
            .validate_all(&values)
            .unwrap_or(ValidationOutcome::Valid);
        let validated = self.validator.has_validation();

        let outcome = {
            let mut state = write_lock(&self.state, "applying submit validation result")?;
            let valid = validation.is_valid();
            transition_phase(&mut state, FormPhase::Submitted { valid })?;

            let failures = validation.errors();
            let first_error_field = first_error_key(&state.order, failures);

            if validated {
                let FormState {
                    order, progress, ..
                } = &mut *state;
                for key in order.iter() {
                    if validation.has_error(key.as_str()) {
                        progress.mark_invalid(key);
                    } else {
                        progress.mark_valid(key);
                    }
                }
            }

            let (declared, undeclared): (Vec<&FieldError>, Vec<&FieldError>) = failures
                .iter()
                .partition(|failure| state.order.contains(&failure.field));
            for failure in undeclared {
                tracing::trace!(field = %failure.field, "ignoring error for undeclared field");
            }
            if !declared.is_empty() {
                state.replace_errors(|errors| {
                    for failure in &declared {
                        errors.set(&failure.field, Some(failure.message.clone()));
                    }
                });
            }

            SubmitOutcome {
                is_valid: valid,
                values: FormValues::clone(&values),
                first_error_field,
            }
        };

        let callback = read_lock(&self.on_submit, "reading submit callback")?.clone();
        if let Some(callback) = callback {
            callback(&outcome);
        }
        Ok(outcome)
    }

    /// Submits the form and, when enabled, scrolls to the first invalid field.
    pub async fn submit(&self) -> FormResult<SubmitOutcome> {
        let outcome = self.validate_submit()?;
        if self.options.autoscroll
            && let Some(field) = &outcome.first_error_field
        {
            if let Some(ScrollOutcome::Superseded) = self.scroll_to_field(field.as_str()).await {
                tracing::trace!(field = %field, "autoscroll superseded by a later submit");
            }
        }
        Ok(outcome)
    }

    /// Layout failures are logged and yield `None`.
    pub async fn scroll_to_field(&self, field: &str) -> Option<ScrollOutcome> {
        let Some(handle) = self.registry.get(field) else {
            tracing::warn!(field = %field, "no field handle to scroll to");
            return None;
        };
        match self.scroll.scroll_to_field(handle).await {
            Ok(outcome) => Some(outcome),
            Err(error) => {
                tracing::warn!(field = %field, %error, "skipping scroll to field");
                None
            }
        }
    }

    /// Replaces the values wholesale. Errors and progress are kept as they are.
    pub fn reinitialize(&self, values: FormValues) -> FormResult<bool> {
        if !self.options.enable_reinitialize {
            tracing::debug!("reinitialize ignored: not enabled for this form");
            return Ok(false);
        }
        if values.is_empty() {
            tracing::debug!("reinitialize ignored: no values supplied");
            return Ok(false);
        }

        let mut state = write_lock(&self.state, "reinitializing form values")?;
        let added = values
            .keys()
            .filter(|key| !state.order.contains(*key))
            .cloned()
            .collect::<Vec<_>>();
        if !added.is_empty() {
            state.order.extend(added.iter().cloned());
            state.replace_errors(|errors| {
                for key in &added {
                    errors.ensure(key);
                }
            });
        }
        state.values = Arc::new(values);
        state.revision += 1;
        Ok(true)
    }
}

impl std::fmt::Debug for FormController {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormController")
            .field("options", &self.options)
            .field("validator", &self.validator)
            .field("fields", &self.registry.len())
            .finish()
    }
}

pub(super) fn transition_phase(state: &mut FormState, next: FormPhase) -> FormResult<()> {
    let current = state.phase;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (FormPhase::Idle, FormPhase::Validating)
            | (FormPhase::Validating, FormPhase::Submitted { .. })
            | (FormPhase::Submitted { .. }, FormPhase::Validating)
            | (FormPhase::Submitted { .. }, FormPhase::Submitted { .. })
    );
    if !allowed {
        return Err(FormError::InvalidPhaseTransition {
            from: current,
            to: next,
        });
    }
    tracing::trace!(from = ?current, to = ?next, "form phase transition");
    state.phase = next;
    Ok(())
}

/// First failing field by declaration order, whatever order the validator reported in.
pub(super) fn first_error_key(order: &[FieldKey], failures: &[FieldError]) -> Option<FieldKey> {
    order
        .iter()
        .find(|key| failures.iter().any(|failure| &failure.field == *key))
        .cloned()
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
