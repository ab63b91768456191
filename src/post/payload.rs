use serde::Serialize;

use super::{ImageSource, PostValues, keys};
use crate::form::{FileRef, RecordId};

/// Structured save body used when the image is a remote URL.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub title: String,
    pub author: String,
    pub description: String,
    pub image_url: String,
}

impl PostJson {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MultipartPart {
    Text { name: &'static str, value: String },
    File { name: &'static str, file: FileRef },
}

impl MultipartPart {
    pub fn name(&self) -> &'static str {
        match self {
            MultipartPart::Text { name, .. } | MultipartPart::File { name, .. } => *name,
        }
    }
}

/// Save body used when the image is an uploaded file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MultipartForm {
    parts: Vec<MultipartPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.parts.push(MultipartPart::Text {
            name,
            value: value.into(),
        });
        self
    }

    pub fn file(mut self, name: &'static str, file: FileRef) -> Self {
        self.parts.push(MultipartPart::File { name, file });
        self
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parts.iter().map(MultipartPart::name)
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            MultipartPart::Text { name: part_name, value } if *part_name == name => {
                Some(value.as_str())
            }
            _ => None,
        })
    }

    pub fn file_value(&self, name: &str) -> Option<&FileRef> {
        self.parts.iter().find_map(|part| match part {
            MultipartPart::File { name: part_name, file } if *part_name == name => Some(file),
            _ => None,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SavePayload {
    Json(PostJson),
    Multipart(MultipartForm),
}

impl SavePayload {
    pub fn is_multipart(&self) -> bool {
        matches!(self, SavePayload::Multipart(_))
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PayloadError {
    #[error("no image source selected")]
    MissingImageSource,
    #[error("upload selected but no image file picked")]
    MissingImage,
}

/// Shapes the outgoing record. The `imageSource` discriminant and the
/// inactive image field are dropped; `id` is sent only when editing.
pub fn build_payload(
    record_id: Option<&RecordId>,
    values: &PostValues,
) -> Result<SavePayload, PayloadError> {
    match values.image_source {
        Some(ImageSource::Picsum) => Ok(SavePayload::Json(PostJson {
            id: record_id.cloned(),
            title: values.title.clone(),
            author: values.author.clone(),
            description: values.description.clone(),
            image_url: values.image_url.clone(),
        })),
        Some(ImageSource::Upload) => {
            let file = values.image.clone().ok_or(PayloadError::MissingImage)?;
            let mut form = MultipartForm::new();
            if let Some(id) = record_id {
                form = form.text("id", id.as_str());
            }
            Ok(SavePayload::Multipart(
                form.text(keys::TITLE.as_str(), values.title.as_str())
                    .text(keys::AUTHOR.as_str(), values.author.as_str())
                    .text(keys::DESCRIPTION.as_str(), values.description.as_str())
                    .file(keys::IMAGE.as_str(), file),
            ))
        }
        None => Err(PayloadError::MissingImageSource),
    }
}
