//! The create/edit post form: its record shape, validation schema and the
//! image-source switch between a picsum URL and an uploaded file.

mod api;
mod effects;
mod payload;

#[cfg(test)]
mod tests;

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::form::{
    FieldDescriptor, FieldKey, FieldSurface, FieldValue, FieldValueError, FileRef, FormField,
    FormModel, FormOptions, FormResult, FormSession, Rule, Schema, ValidationMode,
};

pub use api::{
    BoxedReadFuture, BoxedSaveFuture, PostRead, PostRecord, PostSave, PostSubmitter, ReadError,
    SaveError, SavedRecord, load_defaults,
};
pub use effects::{Navigator, PostFormEffects};
pub use payload::{MultipartForm, MultipartPart, PayloadError, PostJson, SavePayload, build_payload};

/// Largest accepted upload, in bytes.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Number of image ids the random picsum picker chooses from.
pub const PICSUM_IMAGE_COUNT: u32 = 1000;

pub mod keys {
    use crate::form::FieldKey;

    pub const TITLE: FieldKey = FieldKey::new("title");
    pub const AUTHOR: FieldKey = FieldKey::new("author");
    pub const DESCRIPTION: FieldKey = FieldKey::new("description");
    pub const IMAGE_SOURCE: FieldKey = FieldKey::new("imageSource");
    pub const IMAGE_URL: FieldKey = FieldKey::new("imageUrl");
    pub const IMAGE: FieldKey = FieldKey::new("image");
}

/// Fields validated as soon as the user edits them.
pub const EAGER_FIELDS: &[FieldKey] = &[keys::TITLE, keys::AUTHOR, keys::IMAGE];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Picsum,
    Upload,
}

impl ImageSource {
    pub const TAGS: &'static [&'static str] = &["picsum", "upload"];

    pub const fn as_str(self) -> &'static str {
        match self {
            ImageSource::Picsum => "picsum",
            ImageSource::Upload => "upload",
        }
    }
}

impl Display for ImageSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSource {
    type Err = FieldValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "picsum" => Ok(ImageSource::Picsum),
            "upload" => Ok(ImageSource::Upload),
            other => Err(FieldValueError::invalid_choice(other)),
        }
    }
}

impl FormField for ImageSource {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Text(self.as_str().to_string())
    }

    fn from_field_value(value: FieldValue) -> Result<Self, FieldValueError> {
        match value {
            FieldValue::Text(text) => text.parse(),
            other => Err(FieldValueError::mismatch("an image source", &other)),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, FormModel)]
pub struct PostValues {
    pub title: String,
    pub author: String,
    pub description: String,
    #[form(key = "imageSource")]
    pub image_source: Option<ImageSource>,
    #[form(key = "imageUrl")]
    pub image_url: String,
    pub image: Option<FileRef>,
}

impl PostValues {
    /// An empty post with the picsum source preselected.
    pub fn blank() -> Self {
        Self {
            image_source: Some(ImageSource::Picsum),
            ..Self::default()
        }
    }

    pub fn uses(&self, source: ImageSource) -> bool {
        self.image_source == Some(source)
    }
}

fn image_source_is(source: ImageSource) -> impl Fn(&PostValues) -> bool + Send + Sync + 'static {
    move |values: &PostValues| values.uses(source)
}

pub fn post_schema() -> Schema<PostValues> {
    Schema::new()
        .field(FieldDescriptor::new(keys::TITLE).required("Please enter title"))
        .field(
            FieldDescriptor::new(keys::AUTHOR)
                .required("Please enter author")
                .rule(Rule::min_words(2, 3, "Please enter at least two words")),
        )
        .field(FieldDescriptor::new(keys::DESCRIPTION))
        // Tags outside `ImageSource::TAGS` never reach the record; setting one
        // fails with `FieldValueError::InvalidChoice`.
        .field(FieldDescriptor::new(keys::IMAGE_SOURCE).required("Please select an image source"))
        .field(
            FieldDescriptor::new(keys::IMAGE_URL)
                .rule(
                    Rule::required("Please pick a random background image")
                        .when(image_source_is(ImageSource::Picsum)),
                )
                .rule(
                    Rule::url("Please enter a valid URL")
                        .when(image_source_is(ImageSource::Picsum)),
                ),
        )
        .field(
            FieldDescriptor::new(keys::IMAGE)
                .rule(
                    Rule::required("Please select an image to upload")
                        .when(image_source_is(ImageSource::Upload)),
                )
                .rule(
                    Rule::max_file_size(MAX_IMAGE_BYTES, "The image is too large (max 10MB)")
                        .when(image_source_is(ImageSource::Upload)),
                ),
        )
}

pub fn post_form_options() -> FormOptions {
    FormOptions {
        validate_mode: ValidationMode::OnChangeFor(EAGER_FIELDS),
    }
}

pub fn random_picsum_url(rng: &mut impl Rng) -> String {
    let id = rng.gen_range(0..PICSUM_IMAGE_COUNT);
    format!("https://picsum.photos/id/{id}/1368/400")
}

pub type PostSession = FormSession<PostValues>;

impl FormSession<PostValues> {
    /// Switches the active image group. The inactive group keeps its value
    /// but is neither validated nor sent.
    pub fn on_image_source_change(&self, source: ImageSource) -> FormResult<()> {
        self.set(PostValues::fields().image_source(), Some(source))?;
        trace!(%source, "image source changed");
        self.show_active_image_group()
    }

    /// Applies a change event from the post form's surface. A change of
    /// `imageSource` also switches the visible image group, so hosts route
    /// every post field event through here.
    pub fn on_post_field_change(&self, name: &str, value: FieldValue) -> FormResult<()> {
        self.on_field_change(name, value)?;
        if name == keys::IMAGE_SOURCE.as_str() {
            self.show_active_image_group()?;
        }
        Ok(())
    }

    /// Hides the image controls that do not belong to the selected source.
    pub fn show_active_image_group(&self) -> FormResult<()> {
        let source = self.values()?.image_source;
        self.set_field_hidden(keys::IMAGE_URL, source != Some(ImageSource::Picsum))?;
        self.set_field_hidden(keys::IMAGE, source != Some(ImageSource::Upload))
    }

    /// Attaches the host surface and applies the image group visibility.
    pub fn attach_post_surface(&self, surface: Arc<dyn FieldSurface>) -> FormResult<()> {
        self.attach_surface(surface)?;
        self.show_active_image_group()
    }

    /// Picks a random picsum background and stores it as `imageUrl`.
    pub fn randomize_image_url(&self, rng: &mut impl Rng) -> FormResult<String> {
        let url = random_picsum_url(rng);
        self.set(PostValues::fields().image_url(), url.clone())?;
        Ok(url)
    }
}
