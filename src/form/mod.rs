mod binding;
mod controller;
mod submit;
mod validation;
mod value;


pub use binding::FieldSurface;
pub use controller::{
    FieldKey, FormDefaults, FormError, FormOptions, FormResult, FormSession, FormSnapshot,
    RecordId, SubmitState, ValidationMode,
};
pub use postform_derive::FormModel;
pub use submit::{
    BoxedSubmitFuture, SubmitEffects, SubmitError, SubmitHandler, SubmitOutcome, SubmitRequest,
};
pub use validation::{
    FieldDescriptor, FieldErrors, FieldLens, FieldValidationError, FormModel, FormValidation,
    Rule, Schema, validate_field, validate_fields, validate_form,
};
pub use value::{FieldValue, FieldValueError, FileRef, FormField};
