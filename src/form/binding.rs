use std::sync::Arc;

use super::controller::{FormController, FormResult, read_lock};
use super::registry::FieldHandle;
use super::values::{FieldKey, FieldValue};

pub type ChangeHandler = Arc<dyn Fn(FieldValue) + Send + Sync>;
pub type BlurHandler = Arc<dyn Fn() + Send + Sync>;

/// Everything a render unit needs to draw and wire one field.
#[derive(Clone)]
pub struct FieldBinding {
    pub key: FieldKey,
    pub value: Option<FieldValue>,
    pub error: Option<String>,
    pub required: bool,
    pub handle: FieldHandle,
    on_change: ChangeHandler,
    on_blur: BlurHandler,
}

impl FieldBinding {
    pub fn change(&self, value: impl Into<FieldValue>) {
        (self.on_change)(value.into());
    }

    pub fn blur(&self) {
        (self.on_blur)();
    }

    pub fn change_handler(&self) -> ChangeHandler {
        self.on_change.clone()
    }

    pub fn blur_handler(&self) -> BlurHandler {
        self.on_blur.clone()
    }
}

impl std::fmt::Debug for FieldBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("error", &self.error)
            .field("required", &self.required)
            .field("handle", &self.handle.id())
            .finish()
    }
}

impl FormController {
    /// Change handler for one field. Failures are logged, never raised to the UI.
    pub fn on_change(
        &self,
        field: impl Into<FieldKey>,
    ) -> impl Fn(FieldValue) + Clone + Send + Sync + 'static {
        let controller = self.clone();
        let field = field.into();
        move |value| {
            if let Err(error) = controller.set_value(field.as_str(), value) {
                tracing::warn!(%field, %error, "dropping change event");
            }
        }
    }

    pub fn on_blur(&self, field: impl Into<FieldKey>) -> impl Fn() + Clone + Send + Sync + 'static {
        let controller = self.clone();
        let field = field.into();
        move || {
            if let Err(error) = controller.touch(field.as_str()) {
                tracing::warn!(%field, %error, "dropping blur event");
            }
        }
    }

    pub fn bind(&self, field: &str) -> FormResult<FieldBinding> {
        let (key, value, error) = {
            let state = read_lock(&self.state, "reading field for binding")?;
            let key = state.declared_key(field)?;
            let value = state.values.get(field).cloned();
            let error = state.errors.message(field).map(str::to_string);
            (key, value, error)
        };
        let handle = self
            .registry
            .get(field)
            .cloned()
            .ok_or_else(|| super::controller::FormError::UnknownField(key.clone()))?;

        Ok(FieldBinding {
            required: self.is_required(field),
            on_change: Arc::new(self.on_change(key.clone())),
            on_blur: Arc::new(self.on_blur(key.clone())),
            key,
            value,
            error,
            handle,
        })
    }
}
