use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;
use url::Url;

use super::controller::{FieldKey, FormResult, FormSession, read_lock, write_lock};
use super::value::{FieldValue, FieldValueError};

pub trait FieldLens<T>: Copy + Send + Sync + 'static {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn key(self) -> FieldKey;
    fn get<'a>(self, model: &'a T) -> &'a Self::Value;
    fn set(self, model: &mut T, value: Self::Value);
}

/// A record edited by a form. Usually implemented with `#[derive(FormModel)]`.
pub trait FormModel: Clone + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;

    /// Wire names of every field, in declaration order.
    fn field_keys() -> &'static [FieldKey];

    fn field_value(&self, key: FieldKey) -> Option<FieldValue>;

    fn set_field_value(&mut self, key: FieldKey, value: FieldValue)
    -> Result<(), FieldValueError>;

    fn find_key(name: &str) -> Option<FieldKey> {
        Self::field_keys()
            .iter()
            .copied()
            .find(|key| key.as_str() == name)
    }
}

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type Check<T> = Arc<dyn Fn(&FieldValue, &T) -> bool + Send + Sync>;

/// One validation step of a field: a check, the message shown when it fails,
/// and an optional condition on the whole record that must hold for the check
/// to run at all.
pub struct Rule<T> {
    message: String,
    applies_when: Option<Predicate<T>>,
    check: Check<T>,
}

impl<T: 'static> Rule<T> {
    pub fn new(
        message: impl Into<String>,
        check: impl Fn(&FieldValue, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            applies_when: None,
            check: Arc::new(check),
        }
    }

    pub fn when(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.applies_when = Some(match self.applies_when.take() {
            Some(existing) => Arc::new(move |values: &T| existing(values) && predicate(values)),
            None => Arc::new(predicate),
        });
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn applies_to(&self, values: &T) -> bool {
        self.applies_when
            .as_ref()
            .is_none_or(|predicate| predicate(values))
    }

    pub fn passes(&self, value: &FieldValue, values: &T) -> bool {
        (self.check)(value, values)
    }

    /// Fails on empty text, an unset value, or a file without a name.
    pub fn required(message: impl Into<String>) -> Self {
        Self::new(message, |value: &FieldValue, _: &T| !value.is_empty())
    }

    /// Text must be one of `allowed`. Unset values pass.
    pub fn one_of(allowed: &'static [&'static str], message: impl Into<String>) -> Self {
        Self::new(message, move |value: &FieldValue, _: &T| match value {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.is_empty() || allowed.contains(&text.as_str()),
            FieldValue::File(_) => false,
        })
    }

    /// Text must be an absolute http, https or ftp URL with a host. Empty text passes.
    pub fn url(message: impl Into<String>) -> Self {
        Self::new(message, |value: &FieldValue, _: &T| match value {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.is_empty() || is_well_formed_url(text),
            FieldValue::File(_) => false,
        })
    }

    /// Text must contain at least `count` whitespace separated words of
    /// `min_len` characters or more.
    pub fn min_words(count: usize, min_len: usize, message: impl Into<String>) -> Self {
        Self::new(message, move |value: &FieldValue, _: &T| {
            let text = value.as_text().unwrap_or_default();
            text.split_whitespace()
                .filter(|word| word.chars().count() >= min_len)
                .count()
                >= count
        })
    }

    /// A picked file must not exceed `max_bytes`. Anything that is not a file passes.
    pub fn max_file_size(max_bytes: u64, message: impl Into<String>) -> Self {
        Self::new(message, move |value: &FieldValue, _: &T| {
            value.as_file().is_none_or(|file| file.size <= max_bytes)
        })
    }
}

fn is_well_formed_url(text: &str) -> bool {
    match Url::parse(text.trim()) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https" | "ftp")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

pub struct FieldDescriptor<T> {
    key: FieldKey,
    required: bool,
    rules: Vec<Rule<T>>,
}

impl<T: 'static> FieldDescriptor<T> {
    pub fn new(key: FieldKey) -> Self {
        Self {
            key,
            required: false,
            rules: Vec::new(),
        }
    }

    /// Marks the field as required and appends the required check.
    pub fn required(mut self, message: impl Into<String>) -> Self {
        self.required = true;
        self.rules.push(Rule::required(message));
        self
    }

    pub fn rule(mut self, rule: Rule<T>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn key(&self) -> FieldKey {
        self.key
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn rules(&self) -> &[Rule<T>] {
        &self.rules
    }
}

/// Declarative description of every validated field of a form.
pub struct Schema<T> {
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declares a field. Declaring the same key again appends its rules.
    pub fn field(mut self, descriptor: FieldDescriptor<T>) -> Self {
        match self
            .fields
            .iter_mut()
            .find(|existing| existing.key == descriptor.key)
        {
            Some(existing) => {
                existing.required |= descriptor.required;
                existing.rules.extend(descriptor.rules);
            }
            None => self.fields.push(descriptor),
        }
        self
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn descriptor(&self, key: FieldKey) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.fields.iter().map(|field| field.key)
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.descriptor(key).is_some()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{key}: {message}")]
pub struct FieldValidationError {
    pub key: FieldKey,
    pub message: String,
}

/// Error message per declared field; an empty message means no error.
/// Holds exactly the key set of the schema it was created for.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldErrors {
    entries: BTreeMap<FieldKey, String>,
}

impl FieldErrors {
    pub fn for_schema<T>(schema: &Schema<T>) -> Self {
        Self {
            entries: schema.keys().map(|key| (key, String::new())).collect(),
        }
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    /// The field's message, or `""` when it has none.
    pub fn message(&self, key: FieldKey) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn has_error(&self, key: FieldKey) -> bool {
        !self.message(key).is_empty()
    }

    /// Writes `message` for a declared key. Unknown keys are ignored.
    pub fn set(&mut self, key: FieldKey, message: impl Into<String>) -> bool {
        match self.entries.get_mut(&key) {
            Some(entry) => {
                *entry = message.into();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, key: FieldKey) -> bool {
        self.set(key, String::new())
    }

    pub fn is_clear(&self) -> bool {
        self.entries.values().all(String::is_empty)
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .values()
            .filter(|message| !message.is_empty())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.entries
            .iter()
            .map(|(key, message)| (*key, message.as_str()))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormValidation {
    pub errors: FieldErrors,
    pub valid: bool,
}

/// Evaluates the rules of one field in declaration order and returns the
/// first failing applicable rule. Unknown keys never fail.
pub fn validate_field<T>(
    schema: &Schema<T>,
    key: FieldKey,
    values: &T,
) -> Option<FieldValidationError>
where
    T: FormModel,
{
    let Some(descriptor) = schema.descriptor(key) else {
        trace!(field = %key, "no schema entry, skipping validation");
        return None;
    };
    let value = values.field_value(key).unwrap_or_default();
    descriptor
        .rules
        .iter()
        .filter(|rule| rule.applies_to(values))
        .find(|rule| !rule.passes(&value, values))
        .map(|rule| FieldValidationError {
            key,
            message: rule.message.clone(),
        })
}

/// Runs [`validate_field`] for every declared field accepted by `filter`.
pub fn validate_fields<'a, T>(
    schema: &'a Schema<T>,
    values: &'a T,
    filter: impl Fn(FieldKey) -> bool + 'a,
) -> impl Iterator<Item = (FieldKey, Option<FieldValidationError>)> + 'a
where
    T: FormModel,
{
    schema
        .keys()
        .filter(move |key| filter(*key))
        .map(move |key| (key, validate_field(schema, key, values)))
}

pub fn validate_form<T>(schema: &Schema<T>, values: &T) -> FormValidation
where
    T: FormModel,
{
    let mut errors = FieldErrors::for_schema(schema);
    for (key, error) in validate_fields(schema, values, |_| true) {
        if let Some(error) = error {
            errors.set(key, error.message);
        }
    }
    let valid = errors.is_clear();
    FormValidation { errors, valid }
}

impl<T> FormSession<T>
where
    T: FormModel,
{
    /// Validates every field, stores the errors and writes them to the surface.
    pub fn validate_form(&self) -> FormResult<bool> {
        let validation = {
            let mut state = write_lock(&self.state, "applying form validation result")?;
            state.ensure_open()?;
            let validation = validate_form(&self.schema, &state.values);
            state.errors = validation.errors.clone();
            validation
        };
        self.push_errors(&validation.errors)?;
        Ok(validation.valid)
    }

    pub fn validate_field<L>(&self, lens: L) -> FormResult<bool>
    where
        L: FieldLens<T>,
    {
        self.validate_field_by_key(lens.key())
    }

    pub(super) fn validate_field_by_key(&self, key: FieldKey) -> FormResult<bool> {
        let message = {
            let mut guard = write_lock(&self.state, "writing field validation result")?;
            guard.ensure_open()?;
            let state = &mut *guard;
            let mut message = None;
            for (checked, error) in validate_fields(&self.schema, &state.values, move |k| k == key) {
                let text = error.map(|error| error.message).unwrap_or_default();
                state.errors.set(checked, text.clone());
                message = Some(text);
            }
            message
        };
        let Some(message) = message else {
            return Ok(true);
        };
        trace!(field = %key, failed = !message.is_empty(), "field revalidated");
        self.push_error(key, &message)?;
        Ok(message.is_empty())
    }

    pub fn is_required(&self, key: FieldKey) -> bool {
        self.schema
            .descriptor(key)
            .is_some_and(FieldDescriptor::is_required)
    }

    pub fn error(&self, key: FieldKey) -> FormResult<Option<String>> {
        let state = read_lock(&self.state, "reading field error")?;
        Ok(state
            .errors
            .get(key)
            .filter(|message| !message.is_empty())
            .map(str::to_string))
    }
}
