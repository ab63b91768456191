use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::payload::build_payload;
use super::{ImageSource, PostValues, SavePayload};
use crate::form::{
    BoxedSubmitFuture, FormDefaults, RecordId, SubmitError, SubmitHandler, SubmitRequest,
};

/// A post as stored by the backend.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: RecordId,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl From<PostRecord> for FormDefaults<PostValues> {
    fn from(record: PostRecord) -> Self {
        FormDefaults::existing(
            record.id,
            PostValues {
                title: record.title,
                author: record.author,
                description: record.description,
                image_source: Some(ImageSource::Picsum),
                image_url: record.image_url,
                image: None,
            },
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct SavedRecord {
    pub id: RecordId,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ReadError {
    #[error("post {0} not found")]
    NotFound(RecordId),
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum SaveError {
    #[error("post rejected: {0}")]
    ValidationRejected(String),
    #[error("network error: {0}")]
    Network(String),
}

impl From<SaveError> for SubmitError {
    fn from(error: SaveError) -> Self {
        match error {
            SaveError::ValidationRejected(reason) => SubmitError::Rejected(reason),
            SaveError::Network(reason) => SubmitError::Transport(reason),
        }
    }
}

pub type BoxedReadFuture<'a> = Pin<Box<dyn Future<Output = Result<PostRecord, ReadError>> + Send + 'a>>;
pub type BoxedSaveFuture<'a> = Pin<Box<dyn Future<Output = Result<SavedRecord, SaveError>> + Send + 'a>>;

/// Fetches an existing post. Timeouts belong to the implementation.
pub trait PostRead: Send + Sync {
    fn fetch_by_id<'a>(&'a self, id: &'a RecordId) -> BoxedReadFuture<'a>;
}

/// Creates a post, or updates it when the payload carries an id.
pub trait PostSave: Send + Sync {
    fn save(&self, payload: SavePayload) -> BoxedSaveFuture<'_>;
}

impl<S> PostSave for Arc<S>
where
    S: PostSave + ?Sized,
{
    fn save(&self, payload: SavePayload) -> BoxedSaveFuture<'_> {
        (**self).save(payload)
    }
}

/// Seeds a session: a blank post, or the stored post `id` in edit mode.
pub async fn load_defaults<R>(
    reader: &R,
    id: Option<RecordId>,
) -> Result<FormDefaults<PostValues>, ReadError>
where
    R: PostRead + ?Sized,
{
    let Some(id) = id else {
        debug!("no post id, starting from a blank post");
        return Ok(FormDefaults::new(PostValues::blank()));
    };
    debug!(record_id = %id, "loading post for edit");
    let record = reader.fetch_by_id(&id).await?;
    Ok(record.into())
}

/// Bridges a session submission to a [`PostSave`] collaborator.
pub struct PostSubmitter<S> {
    saver: S,
}

impl<S> PostSubmitter<S>
where
    S: PostSave,
{
    pub fn new(saver: S) -> Self {
        Self { saver }
    }
}

impl<S> SubmitHandler<PostValues> for PostSubmitter<S>
where
    S: PostSave,
{
    fn submit<'a>(&'a self, request: SubmitRequest<'a, PostValues>) -> BoxedSubmitFuture<'a> {
        Box::pin(async move {
            let payload = build_payload(request.record_id, request.values)
                .map_err(|error| SubmitError::InvalidPayload(error.to_string()))?;
            debug!(multipart = payload.is_multipart(), "sending post payload");
            let saved = self.saver.save(payload).await?;
            Ok(saved.id)
        })
    }
}
