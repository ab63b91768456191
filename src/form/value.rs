use serde::{Deserialize, Serialize};

use super::controller::FieldKey;

/// A file picked by the user, as reported by the host input surface.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: None,
        }
    }

    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }
}

/// The untyped value of one form field, as exchanged with the input surface
/// and handed to validation rules.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    File(FileRef),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileRef> {
        match self {
            FieldValue::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::File(file) => file.name.is_empty(),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            FieldValue::Empty => "nothing",
            FieldValue::Text(_) => "text",
            FieldValue::File(_) => "a file",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<FileRef> for FieldValue {
    fn from(value: FileRef) -> Self {
        FieldValue::File(value)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FieldValueError {
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("field `{field}` expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("field `{field}` does not accept `{value}`")]
    InvalidChoice { field: String, value: String },
}

impl FieldValueError {
    pub fn mismatch(expected: &'static str, found: &FieldValue) -> Self {
        FieldValueError::TypeMismatch {
            field: String::new(),
            expected,
            found: found.kind(),
        }
    }

    pub fn invalid_choice(value: impl Into<String>) -> Self {
        FieldValueError::InvalidChoice {
            field: String::new(),
            value: value.into(),
        }
    }

    /// Attributes the error to `key`. Used by the `FormModel` derive.
    pub fn for_field(self, key: FieldKey) -> Self {
        let field = key.as_str().to_string();
        match self {
            FieldValueError::TypeMismatch {
                expected, found, ..
            } => FieldValueError::TypeMismatch {
                field,
                expected,
                found,
            },
            FieldValueError::InvalidChoice { value, .. } => {
                FieldValueError::InvalidChoice { field, value }
            }
            other => other,
        }
    }
}

/// Conversion between a typed model field and its [`FieldValue`].
pub trait FormField: Sized {
    fn to_field_value(&self) -> FieldValue;
    fn from_field_value(value: FieldValue) -> Result<Self, FieldValueError>;
}

impl FormField for String {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_field_value(value: FieldValue) -> Result<Self, FieldValueError> {
        match value {
            FieldValue::Empty => Ok(String::new()),
            FieldValue::Text(text) => Ok(text),
            other => Err(FieldValueError::mismatch("text", &other)),
        }
    }
}

impl FormField for FileRef {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::File(self.clone())
    }

    fn from_field_value(value: FieldValue) -> Result<Self, FieldValueError> {
        match value {
            FieldValue::File(file) => Ok(file),
            other => Err(FieldValueError::mismatch("a file", &other)),
        }
    }
}

impl<T> FormField for Option<T>
where
    T: FormField,
{
    fn to_field_value(&self) -> FieldValue {
        match self {
            Some(value) => value.to_field_value(),
            None => FieldValue::Empty,
        }
    }

    fn from_field_value(value: FieldValue) -> Result<Self, FieldValueError> {
        match value {
            FieldValue::Empty => Ok(None),
            FieldValue::Text(text) if text.is_empty() => Ok(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}
