use std::sync::Arc;

use tracing::trace;

use super::controller::{FieldKey, FormResult, FormSession, read_lock, write_lock};
use super::validation::{FieldErrors, FormModel};
use super::value::FieldValue;

/// The host input surface a session reads values from and renders into.
///
/// `set_error` receives `""` to clear a field's error.
pub trait FieldSurface: Send + Sync {
    fn get_value(&self, key: FieldKey) -> Option<FieldValue>;
    fn set_value(&self, key: FieldKey, value: &FieldValue);
    fn set_error(&self, key: FieldKey, message: &str);

    fn set_hidden(&self, _key: FieldKey, _hidden: bool) {}

    /// Called with `true` when a save starts and `false` once it settles.
    fn set_submitting(&self, _submitting: bool) {}
}

impl<T> FormSession<T>
where
    T: FormModel,
{
    /// Connects a surface and renders the current values and errors into it.
    pub fn attach_surface(&self, surface: Arc<dyn FieldSurface>) -> FormResult<()> {
        let (values, errors) = {
            let state = read_lock(&self.state, "reading state for surface attach")?;
            state.ensure_open()?;
            (state.values.clone(), state.errors.clone())
        };
        for key in T::field_keys() {
            surface.set_value(*key, &values.field_value(*key).unwrap_or_default());
        }
        for (key, message) in errors.iter() {
            surface.set_error(key, message);
        }
        *write_lock(&self.surface, "attaching surface")? = Some(surface);
        Ok(())
    }

    pub fn detach_surface(&self) -> FormResult<()> {
        *write_lock(&self.surface, "detaching surface")? = None;
        Ok(())
    }

    /// Pulls every declared field from the surface into the session values.
    /// Keys the surface does not report keep their current value. Nothing is
    /// applied when any reported value does not fit its field.
    pub fn sync_from_surface(&self) -> FormResult<()> {
        let Some(surface) = self.current_surface()? else {
            return Ok(());
        };
        let reported = T::field_keys()
            .iter()
            .filter_map(|key| surface.get_value(*key).map(|value| (*key, value)))
            .collect::<Vec<_>>();

        let mut state = write_lock(&self.state, "syncing values from surface")?;
        state.ensure_open()?;
        let mut values = state.values.clone();
        for (key, value) in reported {
            values.set_field_value(key, value)?;
        }
        state.values = values;
        trace!("values synced from surface");
        Ok(())
    }

    pub(super) fn current_surface(&self) -> FormResult<Option<Arc<dyn FieldSurface>>> {
        Ok(read_lock(&self.surface, "reading surface")?.clone())
    }

    pub(super) fn push_value(&self, key: FieldKey, value: &FieldValue) -> FormResult<()> {
        if let Some(surface) = self.current_surface()? {
            surface.set_value(key, value);
        }
        Ok(())
    }

    pub(super) fn push_error(&self, key: FieldKey, message: &str) -> FormResult<()> {
        if let Some(surface) = self.current_surface()? {
            surface.set_error(key, message);
        }
        Ok(())
    }

    pub(super) fn push_errors(&self, errors: &FieldErrors) -> FormResult<()> {
        if let Some(surface) = self.current_surface()? {
            for (key, message) in errors.iter() {
                surface.set_error(key, message);
            }
        }
        Ok(())
    }

    pub(super) fn notify_submitting(&self, submitting: bool) -> FormResult<()> {
        if let Some(surface) = self.current_surface()? {
            surface.set_submitting(submitting);
        }
        Ok(())
    }

    pub fn set_field_hidden(&self, key: FieldKey, hidden: bool) -> FormResult<()> {
        if let Some(surface) = self.current_surface()? {
            surface.set_hidden(key, hidden);
        }
        Ok(())
    }
}
