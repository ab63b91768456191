use crate::feedback::{Notice, NoticeCenter, NoticeKind};
use crate::form::{RecordId, SubmitEffects, SubmitError};

/// Moves the host to another page once a post is saved.
pub trait Navigator: Send + Sync {
    fn open_post(&self, id: &RecordId);
}

/// Success notice plus navigation to the saved post; error notice on failure.
pub struct PostFormEffects<N> {
    notices: NoticeCenter,
    navigator: N,
}

impl<N> PostFormEffects<N>
where
    N: Navigator,
{
    pub fn new(notices: NoticeCenter, navigator: N) -> Self {
        Self { notices, navigator }
    }
}

impl<N> SubmitEffects for PostFormEffects<N>
where
    N: Navigator,
{
    fn on_saved(&self, record_id: &RecordId) {
        self.notices
            .show(Notice::new("Saved", "Save post successfully!").kind(NoticeKind::Success));
        self.navigator.open_post(record_id);
    }

    fn on_failed(&self, error: &SubmitError) {
        self.notices.show(
            Notice::new("Could not save post", error.to_string())
                .kind(NoticeKind::Error)
                .auto_close_ms(None),
        );
    }
}
