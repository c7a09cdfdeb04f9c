pub use crate::form::{
    CountingFields, FieldBinding, FieldError, FieldHandle, FieldKey, FieldValue, FormController,
    FormError, FormModel, FormOptions, FormPhase, FormResult, FormSnapshot, FormValues, Progress,
    SchemaValidator, SubmitOutcome, ValidatorAdapter, ValidatorCapabilities,
};
pub use crate::scroll::{
    BoxedLayoutFuture, ElementId, LayoutRect, ScrollBehavior, ScrollContainer, ScrollCoordinator,
    ScrollError, ScrollOutcome, ScrollPosition,
};
