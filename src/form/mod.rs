mod binding;
mod controller;
mod model;
mod progress;
mod registry;
mod validation;
mod values;

#[cfg(test)]
mod tests;

pub use calmform_derive::FormModel;
pub use binding::{BlurHandler, ChangeHandler, FieldBinding};
pub use controller::{
    FormController, FormError, FormOptions, FormPhase, FormResult, FormSnapshot, SubmitOutcome,
};
pub use model::{FormModel, FromFieldValue};
pub use progress::{CountingFields, Progress, ProgressCounter};
pub use registry::{FieldHandle, FieldHandleId, FieldRegistry};
pub use validation::{
    FieldError, SchemaValidator, ValidationOutcome, ValidatorAdapter, ValidatorCapabilities,
};
pub use values::{FieldErrors, FieldKey, FieldValue, FormValues};

#[doc(hidden)]
pub mod __private {
    pub use super::model::read_field;
}
