pub use crate::feedback::{Notice, NoticeCenter, NoticeKind};
pub use crate::form::{
    FieldErrors, FieldKey, FieldSurface, FieldValue, FileRef, FormDefaults, FormModel,
    FormOptions, FormSession, SubmitOutcome, SubmitState,
};
pub use crate::post::{
    ImageSource, Navigator, PostFormEffects, PostRead, PostSave, PostSession, PostSubmitter,
    PostValues, SavePayload, load_defaults, post_form_options, post_schema,
};
