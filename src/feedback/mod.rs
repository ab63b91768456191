use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NoticeId(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// A user-facing message queued for the host's notification area.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub id: Option<NoticeId>,
    pub title: String,
    pub message: String,
    pub kind: NoticeKind,
    pub auto_close_ms: Option<u32>,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            message: message.into(),
            kind: NoticeKind::Info,
            auto_close_ms: Some(4_000),
        }
    }

    pub fn kind(mut self, value: NoticeKind) -> Self {
        self.kind = value;
        self
    }

    pub fn auto_close_ms(mut self, value: Option<u32>) -> Self {
        self.auto_close_ms = value;
        self
    }
}

struct NoticeState {
    queue: VecDeque<Notice>,
    max_visible: usize,
}

impl Default for NoticeState {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            max_visible: 5,
        }
    }
}

#[derive(Clone, Default)]
pub struct NoticeCenter {
    next_id: Arc<AtomicU64>,
    state: Arc<RwLock<NoticeState>>,
}

impl NoticeCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_visible(&self, value: usize) {
        let mut state = self.write();
        state.max_visible = value.max(1);
        trim(&mut state);
    }

    pub fn show(&self, mut notice: Notice) -> NoticeId {
        let id = NoticeId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        notice.id = Some(id);

        let mut state = self.write();
        state.queue.push_back(notice);
        trim(&mut state);
        id
    }

    pub fn dismiss(&self, id: NoticeId) -> bool {
        let mut state = self.write();
        if let Some(index) = state.queue.iter().position(|notice| notice.id == Some(id)) {
            state.queue.remove(index);
            return true;
        }
        false
    }

    pub fn dismiss_all(&self) {
        self.write().queue.clear();
    }

    pub fn list(&self) -> Vec<Notice> {
        self.read().queue.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Notice> {
        self.read().queue.back().cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, NoticeState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, NoticeState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn trim(state: &mut NoticeState) {
    while state.queue.len() > state.max_visible {
        state.queue.pop_front();
    }
}
