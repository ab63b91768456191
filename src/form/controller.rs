use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::binding::FieldSurface;
use super::submit::{SubmitEffects, SubmitHandler};
use super::validation::{FieldErrors, FieldLens, FormModel, Schema};
use super::value::{FieldValue, FieldValueError};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Identifier of a persisted record. Present on a session only in edit mode.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Submitting,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationMode {
    /// Every field change re-validates the changed field.
    OnChange,
    /// Only changes to the listed fields are validated immediately.
    OnChangeFor(&'static [FieldKey]),
    OnSubmit,
}

impl ValidationMode {
    pub fn validates_on_change(self, key: FieldKey) -> bool {
        match self {
            ValidationMode::OnChange => true,
            ValidationMode::OnChangeFor(keys) => keys.contains(&key),
            ValidationMode::OnSubmit => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormOptions {
    pub validate_mode: ValidationMode,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_mode: ValidationMode::OnSubmit,
        }
    }
}

/// Initial contents of a session: a blank record, or a fetched one in edit mode.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormDefaults<T> {
    pub record_id: Option<RecordId>,
    pub values: T,
}

impl<T> FormDefaults<T> {
    pub fn new(values: T) -> Self {
        Self {
            record_id: None,
            values,
        }
    }

    pub fn existing(record_id: impl Into<RecordId>, values: T) -> Self {
        Self {
            record_id: Some(record_id.into()),
            values,
        }
    }
}

impl<T: Default> FormDefaults<T> {
    pub fn blank() -> Self {
        Self::new(T::default())
    }
}

#[derive(Clone, Debug)]
pub struct FormSnapshot<T> {
    pub record_id: Option<RecordId>,
    pub values: T,
    pub errors: FieldErrors,
    pub submit_state: SubmitState,
    pub submit_count: u32,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("form state lock poisoned while {0}")]
    StatePoisoned(&'static str),
    #[error("invalid submit state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    #[error("form has no field named `{0}`")]
    UnknownField(String),
    #[error(transparent)]
    InvalidValue(#[from] FieldValueError),
    #[error("form session has been closed")]
    SessionClosed,
}

pub type FormResult<T> = Result<T, FormError>;

pub(super) struct SessionState<T> {
    pub(super) record_id: Option<RecordId>,
    pub(super) values: T,
    pub(super) errors: FieldErrors,
    pub(super) submit_state: SubmitState,
    pub(super) submit_count: u32,
    pub(super) closed: bool,
}

impl<T> SessionState<T> {
    pub(super) fn ensure_open(&self) -> FormResult<()> {
        if self.closed {
            Err(FormError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

/// Mutable state of one create/edit interaction.
///
/// Cloning yields another handle to the same session, so a host can keep one
/// handle for rendering while another drives a submission.
#[derive(Clone)]
pub struct FormSession<T>
where
    T: FormModel,
{
    pub(super) options: FormOptions,
    pub(super) schema: Arc<Schema<T>>,
    pub(super) state: Arc<RwLock<SessionState<T>>>,
    pub(super) on_submit: Arc<dyn SubmitHandler<T>>,
    pub(super) effects: Arc<RwLock<Option<Arc<dyn SubmitEffects>>>>,
    pub(super) surface: Arc<RwLock<Option<Arc<dyn FieldSurface>>>>,
}

impl<T> FormSession<T>
where
    T: FormModel,
{
    pub fn new(
        schema: Schema<T>,
        defaults: FormDefaults<T>,
        on_submit: impl SubmitHandler<T> + 'static,
        options: FormOptions,
    ) -> Self {
        let errors = FieldErrors::for_schema(&schema);
        debug!(
            fields = errors.len(),
            edit = defaults.record_id.is_some(),
            "form session created"
        );
        Self {
            options,
            schema: Arc::new(schema),
            state: Arc::new(RwLock::new(SessionState {
                record_id: defaults.record_id,
                values: defaults.values,
                errors,
                submit_state: SubmitState::Idle,
                submit_count: 0,
                closed: false,
            })),
            on_submit: Arc::new(on_submit),
            effects: Arc::new(RwLock::new(None)),
            surface: Arc::new(RwLock::new(None)),
        }
    }

    pub fn schema(&self) -> &Schema<T> {
        &self.schema
    }

    pub fn options(&self) -> FormOptions {
        self.options
    }

    pub fn record_id(&self) -> FormResult<Option<RecordId>> {
        Ok(read_lock(&self.state, "reading record id")?.record_id.clone())
    }

    pub fn values(&self) -> FormResult<T> {
        Ok(read_lock(&self.state, "reading form values")?.values.clone())
    }

    pub fn value(&self, key: FieldKey) -> FormResult<Option<FieldValue>> {
        Ok(read_lock(&self.state, "reading field value")?
            .values
            .field_value(key))
    }

    pub fn errors(&self) -> FormResult<FieldErrors> {
        Ok(read_lock(&self.state, "reading field errors")?.errors.clone())
    }

    pub fn submit_state(&self) -> FormResult<SubmitState> {
        Ok(read_lock(&self.state, "reading submit state")?.submit_state)
    }

    pub fn is_submitting(&self) -> FormResult<bool> {
        Ok(self.submit_state()? == SubmitState::Submitting)
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot<T>> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot {
            record_id: state.record_id.clone(),
            values: state.values.clone(),
            errors: state.errors.clone(),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
            is_valid: state.errors.is_clear(),
        })
    }

    /// Applies a value reported by the input surface for the field `name`.
    pub fn on_field_change(&self, name: &str, value: FieldValue) -> FormResult<()> {
        let key = T::find_key(name).ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        {
            let mut state = write_lock(&self.state, "applying field change")?;
            state.ensure_open()?;
            state.values.set_field_value(key, value)?;
        }
        trace!(field = %key, "field changed");

        if self.options.validate_mode.validates_on_change(key) {
            self.validate_field_by_key(key)?;
        }
        Ok(())
    }

    /// Sets a field programmatically and mirrors the new value to the surface.
    pub fn set<L>(&self, lens: L, value: L::Value) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        let current = {
            let mut state = write_lock(&self.state, "writing form model")?;
            state.ensure_open()?;
            lens.set(&mut state.values, value);
            state.values.field_value(key).unwrap_or_default()
        };
        self.push_value(key, &current)?;

        if self.options.validate_mode.validates_on_change(key) {
            self.validate_field_by_key(key)?;
        }
        Ok(())
    }

    /// Tears the session down. An in-flight submission finishes silently.
    pub fn close(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "closing form session")?;
        if !state.closed {
            debug!("form session closed");
        }
        state.closed = true;
        Ok(())
    }

    pub fn is_closed(&self) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading closed flag")?.closed)
    }
}

pub(super) fn transition_submit_state<T>(
    state: &mut SessionState<T>,
    next: SubmitState,
) -> FormResult<()> {
    let current = state.submit_state;
    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Submitting) | (SubmitState::Submitting, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    state.submit_state = next;
    Ok(())
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
