use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use super::controller::{
    FormResult, FormSession, RecordId, SessionState, SubmitState, read_lock,
    transition_submit_state, write_lock,
};
use super::validation::{FieldErrors, FormModel, validate_form};

pub type BoxedSubmitFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RecordId, SubmitError>> + Send + 'a>>;

/// What the session hands to the save collaborator once validation passed.
#[derive(Debug)]
pub struct SubmitRequest<'a, T> {
    /// Set only when editing an existing record.
    pub record_id: Option<&'a RecordId>,
    pub values: &'a T,
}

/// Persists a validated record and returns the identifier it was saved under.
pub trait SubmitHandler<T>: Send + Sync {
    fn submit<'a>(&'a self, request: SubmitRequest<'a, T>) -> BoxedSubmitFuture<'a>;
}

/// Host side effects run once a save settles.
pub trait SubmitEffects: Send + Sync {
    fn on_saved(&self, record_id: &RecordId);
    fn on_failed(&self, error: &SubmitError);
}

/// Failure reported by the save collaborator. Never mapped into field errors.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("the server rejected the record: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("could not build the save payload: {0}")]
    InvalidPayload(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubmitOutcome {
    /// Another submission was in flight; nothing happened.
    AlreadySubmitting,
    /// Validation failed; the collaborator was not contacted.
    Invalid(FieldErrors),
    Saved(RecordId),
    Failed(SubmitError),
    /// The session was closed while the save was in flight.
    Abandoned,
}

impl<T> FormSession<T>
where
    T: FormModel,
{
    pub fn register_effects(&self, effects: impl SubmitEffects + 'static) -> FormResult<()> {
        let mut slot = write_lock(&self.effects, "registering submit effects")?;
        *slot = Some(Arc::new(effects));
        Ok(())
    }

    /// Validates and, when valid, saves the current values.
    ///
    /// Only one submission can be in flight per session: a call made while
    /// the session is [`SubmitState::Submitting`] returns
    /// [`SubmitOutcome::AlreadySubmitting`] without contacting the handler.
    /// Whatever the handler returns, the session is back to
    /// [`SubmitState::Idle`] when this resolves.
    pub async fn submit(&self) -> FormResult<SubmitOutcome> {
        let (record_id, values, errors) = {
            let mut state = write_lock(&self.state, "preparing submit")?;
            state.ensure_open()?;
            if state.submit_state != SubmitState::Idle {
                debug!("submit ignored, a submission is already in flight");
                return Ok(SubmitOutcome::AlreadySubmitting);
            }

            let validation = validate_form(&self.schema, &state.values);
            state.errors = validation.errors.clone();
            if validation.valid {
                transition_submit_state(&mut state, SubmitState::Submitting)?;
                state.submit_count = state.submit_count.saturating_add(1);
            }
            (
                state.record_id.clone(),
                state.values.clone(),
                validation.errors,
            )
        };
        let mut in_flight = InFlight {
            state: self.state.clone(),
            armed: errors.is_clear(),
        };

        self.push_errors(&errors)?;
        if !errors.is_clear() {
            debug!(failed = errors.error_count(), "submit blocked by validation");
            return Ok(SubmitOutcome::Invalid(errors));
        }

        self.notify_submitting(true)?;
        debug!(edit = record_id.is_some(), "submitting form");
        let handler = self.on_submit.clone();
        let result = handler
            .submit(SubmitRequest {
                record_id: record_id.as_ref(),
                values: &values,
            })
            .await;

        let closed = {
            let mut state = write_lock(&self.state, "completing submit")?;
            transition_submit_state(&mut state, SubmitState::Idle)?;
            in_flight.armed = false;
            state.closed
        };
        if closed {
            warn!(saved = result.is_ok(), "form session closed during save, outcome dropped");
            return Ok(SubmitOutcome::Abandoned);
        }

        self.notify_submitting(false)?;
        let effects = read_lock(&self.effects, "reading submit effects")?.clone();
        match result {
            Ok(saved_id) => {
                info!(record_id = %saved_id, "record saved");
                if let Some(effects) = effects {
                    effects.on_saved(&saved_id);
                }
                Ok(SubmitOutcome::Saved(saved_id))
            }
            Err(error) => {
                warn!(%error, "save failed");
                if let Some(effects) = effects {
                    effects.on_failed(&error);
                }
                Ok(SubmitOutcome::Failed(error))
            }
        }
    }
}

/// Returns the session to `Idle` when a submission is dropped before its
/// save settles.
struct InFlight<T> {
    state: Arc<RwLock<SessionState<T>>>,
    armed: bool,
}

impl<T> Drop for InFlight<T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.submit_state == SubmitState::Submitting {
            state.submit_state = SubmitState::Idle;
            warn!("submission dropped before the save settled, session back to idle");
        }
    }
}
