use super::*;
use crate::feedback::{NoticeCenter, NoticeKind};
use crate::form::{
    FieldErrors, FormDefaults, FormError, RecordId, SubmitError, SubmitOutcome, SubmitState,
    validate_field, validate_form,
};
use futures::executor::block_on;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

fn picsum_post() -> PostValues {
    PostValues {
        title: "T".into(),
        author: "Alice Doe".into(),
        description: "D".into(),
        image_source: Some(ImageSource::Picsum),
        image_url: "http://x/y.png".into(),
        image: None,
    }
}

fn upload_post(size: u64) -> PostValues {
    PostValues {
        image_source: Some(ImageSource::Upload),
        image_url: String::new(),
        image: Some(FileRef::new("cover.png", size).content_type("image/png")),
        ..picsum_post()
    }
}

fn errors_for(values: &PostValues) -> FieldErrors {
    validate_form(&post_schema(), values).errors
}

struct FakeSaver {
    calls: AtomicUsize,
    payloads: Mutex<Vec<SavePayload>>,
    fail_with: Option<SaveError>,
}

impl FakeSaver {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
            fail_with: None,
        })
    }

    fn failing(error: SaveError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
            fail_with: Some(error),
        })
    }
}

impl PostSave for FakeSaver {
    fn save(&self, payload: SavePayload) -> BoxedSaveFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().expect("payload lock").push(payload);
        let result = match &self.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(SavedRecord {
                id: RecordId::new("post-42"),
            }),
        };
        Box::pin(async move { result })
    }
}

#[derive(Clone, Default)]
struct RecordingNavigator {
    opened: Arc<Mutex<Vec<RecordId>>>,
}

impl Navigator for RecordingNavigator {
    fn open_post(&self, id: &RecordId) {
        self.opened.lock().expect("navigator lock").push(id.clone());
    }
}

#[derive(Default)]
struct HiddenSurface {
    values: Mutex<BTreeMap<FieldKey, FieldValue>>,
    hidden: Mutex<BTreeMap<FieldKey, bool>>,
}

impl HiddenSurface {
    fn is_hidden(&self, key: FieldKey) -> Option<bool> {
        self.hidden.lock().expect("hidden lock").get(&key).copied()
    }
}

impl FieldSurface for HiddenSurface {
    fn get_value(&self, key: FieldKey) -> Option<FieldValue> {
        self.values.lock().expect("values lock").get(&key).cloned()
    }

    fn set_value(&self, key: FieldKey, value: &FieldValue) {
        self.values
            .lock()
            .expect("values lock")
            .insert(key, value.clone());
    }

    fn set_error(&self, _key: FieldKey, _message: &str) {}

    fn set_hidden(&self, key: FieldKey, hidden: bool) {
        self.hidden.lock().expect("hidden lock").insert(key, hidden);
    }
}

fn post_session(values: PostValues, saver: Arc<FakeSaver>) -> PostSession {
    FormSession::new(
        post_schema(),
        FormDefaults::new(values),
        PostSubmitter::new(saver),
        post_form_options(),
    )
}

#[test]
fn empty_title_is_reported() {
    let values = PostValues {
        title: String::new(),
        ..picsum_post()
    };
    let validation = validate_form(&post_schema(), &values);
    assert!(!validation.valid);
    assert_eq!(validation.errors.message(keys::TITLE), "Please enter title");
}

#[test]
fn author_needs_two_words_of_three_letters() {
    for author in ["Jo", "Al Bo", "Alice B", "   "] {
        let values = PostValues {
            author: author.into(),
            ..picsum_post()
        };
        assert_eq!(
            errors_for(&values).message(keys::AUTHOR),
            "Please enter at least two words",
            "author {author:?} should fail"
        );
    }

    let values = PostValues {
        author: String::new(),
        ..picsum_post()
    };
    assert_eq!(errors_for(&values).message(keys::AUTHOR), "Please enter author");

    let values = PostValues {
        author: "Alice  Doe".into(),
        ..picsum_post()
    };
    assert!(!errors_for(&values).has_error(keys::AUTHOR));
}

#[test]
fn picsum_source_checks_url_and_ignores_upload() {
    let values = PostValues {
        image_url: "not a url".into(),
        image: Some(FileRef::new("", MAX_IMAGE_BYTES * 2)),
        ..picsum_post()
    };
    let errors = errors_for(&values);
    assert_eq!(errors.message(keys::IMAGE_URL), "Please enter a valid URL");
    assert_eq!(errors.message(keys::IMAGE), "");

    let values = PostValues {
        image_url: String::new(),
        ..picsum_post()
    };
    assert_eq!(
        errors_for(&values).message(keys::IMAGE_URL),
        "Please pick a random background image"
    );

    let values = PostValues {
        image_url: "mailto:someone@example.com".into(),
        ..picsum_post()
    };
    assert!(errors_for(&values).has_error(keys::IMAGE_URL));
}

#[test]
fn upload_source_checks_file_and_ignores_url() {
    let values = PostValues {
        image_url: "not a url".into(),
        image: None,
        ..upload_post(0)
    };
    let errors = errors_for(&values);
    assert_eq!(errors.message(keys::IMAGE), "Please select an image to upload");
    assert_eq!(errors.message(keys::IMAGE_URL), "");
}

#[test]
fn upload_size_limit_is_inclusive() {
    assert!(errors_for(&upload_post(MAX_IMAGE_BYTES)).is_clear());
    assert_eq!(
        errors_for(&upload_post(MAX_IMAGE_BYTES + 1)).message(keys::IMAGE),
        "The image is too large (max 10MB)"
    );
}

#[test]
fn unset_image_source_skips_both_image_groups() {
    let values = PostValues {
        image_source: None,
        image_url: "nope".into(),
        ..picsum_post()
    };
    let schema = post_schema();
    assert_eq!(validate_field(&schema, keys::IMAGE_URL, &values), None);
    assert_eq!(validate_field(&schema, keys::IMAGE, &values), None);
    assert_eq!(
        validate_field(&schema, keys::IMAGE_SOURCE, &values).map(|error| error.message),
        Some("Please select an image source".to_string())
    );
}

#[test]
fn image_source_accepts_only_known_tags() {
    let mut values = PostValues::blank();
    values
        .set_field_value(keys::IMAGE_SOURCE, "upload".into())
        .expect("upload is a known source");
    assert_eq!(values.image_source, Some(ImageSource::Upload));
    assert!(matches!(
        values.set_field_value(keys::IMAGE_SOURCE, "gallery".into()),
        Err(FieldValueError::InvalidChoice { .. })
    ));
    assert_eq!(ImageSource::from_str("picsum"), Ok(ImageSource::Picsum));
}

#[test]
fn picsum_payload_drops_discriminant_and_file() {
    let values = PostValues {
        author: "A B".into(),
        image: Some(FileRef::new("stale.png", 3)),
        ..picsum_post()
    };
    let payload = build_payload(None, &values).expect("payload builds");
    let SavePayload::Json(body) = payload else {
        panic!("picsum posts are sent as structured payloads");
    };
    let json = body.to_json().expect("serializes");
    assert_eq!(
        json,
        serde_json::json!({
            "title": "T",
            "author": "A B",
            "description": "D",
            "imageUrl": "http://x/y.png",
        })
    );
}

#[test]
fn upload_payload_drops_url_and_keeps_id_when_editing() {
    let values = PostValues {
        image_url: "http://x/y.png".into(),
        ..upload_post(2048)
    };
    let id = RecordId::new("abc");
    let payload = build_payload(Some(&id), &values).expect("payload builds");
    let SavePayload::Multipart(form) = payload else {
        panic!("uploads are sent as multipart payloads");
    };
    assert_eq!(
        form.names().collect::<Vec<_>>(),
        vec!["id", "title", "author", "description", "image"]
    );
    assert_eq!(form.text_value("id"), Some("abc"));
    assert_eq!(form.file_value("image").map(|file| file.size), Some(2048));
    assert_eq!(form.text_value("imageUrl"), None);
}

#[test]
fn payload_requires_a_source_and_an_uploaded_file() {
    let values = PostValues {
        image_source: None,
        ..picsum_post()
    };
    assert_eq!(
        build_payload(None, &values),
        Err(PayloadError::MissingImageSource)
    );
    let values = PostValues {
        image: None,
        ..upload_post(1)
    };
    assert_eq!(build_payload(None, &values), Err(PayloadError::MissingImage));
}

#[test]
fn eager_fields_validate_on_change() {
    let saver = FakeSaver::succeeding();
    let session = post_session(PostValues::blank(), saver);
    session
        .on_field_change("title", "".into())
        .expect("title change");
    session
        .on_field_change("imageUrl", "nope".into())
        .expect("url change");

    let errors = session.errors().expect("errors");
    assert_eq!(errors.message(keys::TITLE), "Please enter title");
    assert_eq!(errors.message(keys::IMAGE_URL), "");
    assert_eq!(errors.len(), PostValues::field_keys().len());
}

#[test]
fn image_source_change_toggles_groups_without_revalidating() {
    let saver = FakeSaver::succeeding();
    let session = post_session(
        PostValues {
            image_url: "nope".into(),
            ..picsum_post()
        },
        saver.clone(),
    );
    let surface = Arc::new(HiddenSurface::default());
    session
        .attach_post_surface(surface.clone())
        .expect("attach");
    assert_eq!(surface.is_hidden(keys::IMAGE_URL), Some(false));
    assert_eq!(surface.is_hidden(keys::IMAGE), Some(true));

    assert!(!session.validate_form().expect("validate"));
    session
        .on_image_source_change(ImageSource::Upload)
        .expect("switch source");
    assert_eq!(surface.is_hidden(keys::IMAGE_URL), Some(true));
    assert_eq!(surface.is_hidden(keys::IMAGE), Some(false));
    assert_eq!(
        session.error(keys::IMAGE_URL).expect("stale error"),
        Some("Please enter a valid URL".to_string())
    );

    session
        .on_field_change("image", FileRef::new("cover.png", 512).into())
        .expect("pick file");
    let outcome = block_on(session.submit()).expect("submit");
    assert_eq!(outcome, SubmitOutcome::Saved(RecordId::new("post-42")));
    assert!(session.errors().expect("errors").is_clear());
    let payloads = saver.payloads.lock().expect("payload lock");
    assert!(payloads[0].is_multipart());
}

#[test]
fn oversized_upload_is_flagged_as_soon_as_it_is_picked() {
    let session = post_session(upload_post(1), FakeSaver::succeeding());
    session
        .on_field_change("image", FileRef::new("huge.png", MAX_IMAGE_BYTES + 1).into())
        .expect("pick file");
    assert_eq!(
        session.error(keys::IMAGE).expect("image error"),
        Some("The image is too large (max 10MB)".to_string())
    );
}

#[test]
fn random_image_is_stored_and_valid() {
    let session = post_session(PostValues::blank(), FakeSaver::succeeding());
    let mut rng = StdRng::seed_from_u64(7);
    let url = session.randomize_image_url(&mut rng).expect("randomize");
    assert!(url.starts_with("https://picsum.photos/id/"));
    assert!(url.ends_with("/1368/400"));
    assert_eq!(session.values().expect("values").image_url, url);
    assert_eq!(
        validate_field(&post_schema(), keys::IMAGE_URL, &session.values().expect("values")),
        None
    );
}

#[test]
fn successful_save_notifies_and_navigates() {
    let saver = FakeSaver::succeeding();
    let session = post_session(picsum_post(), saver.clone());
    let notices = NoticeCenter::new();
    let navigator = RecordingNavigator::default();
    session
        .register_effects(PostFormEffects::new(notices.clone(), navigator.clone()))
        .expect("register effects");

    let outcome = block_on(session.submit()).expect("submit");
    assert_eq!(outcome, SubmitOutcome::Saved(RecordId::new("post-42")));
    assert_eq!(saver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *navigator.opened.lock().expect("navigator lock"),
        vec![RecordId::new("post-42")]
    );
    let notice = notices.latest().expect("success notice");
    assert_eq!(notice.kind, NoticeKind::Success);
}

#[test]
fn rejected_save_is_a_general_failure_not_field_errors() {
    let saver = FakeSaver::failing(SaveError::ValidationRejected("title taken".into()));
    let session = post_session(picsum_post(), saver);
    let notices = NoticeCenter::new();
    let navigator = RecordingNavigator::default();
    session
        .register_effects(PostFormEffects::new(notices.clone(), navigator.clone()))
        .expect("register effects");

    let outcome = block_on(session.submit()).expect("submit");
    assert_eq!(
        outcome,
        SubmitOutcome::Failed(SubmitError::Rejected("title taken".into()))
    );
    assert!(session.errors().expect("errors").is_clear());
    assert_eq!(session.submit_state(), Ok(SubmitState::Idle));
    assert!(navigator.opened.lock().expect("navigator lock").is_empty());
    let notice = notices.latest().expect("error notice");
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notice.message.contains("title taken"));
}

#[test]
fn network_failure_maps_to_transport_error() {
    assert_eq!(
        SubmitError::from(SaveError::Network("offline".into())),
        SubmitError::Transport("offline".into())
    );
}

#[test]
fn stored_post_seeds_an_edit_session() {
    let record: PostRecord = serde_json::from_value(serde_json::json!({
        "id": "p1",
        "title": "Hello",
        "author": "Alice Doe",
        "imageUrl": "https://picsum.photos/id/3/1368/400",
        "createdAt": 1650000000000_i64,
    }))
    .expect("record parses");
    let defaults = FormDefaults::<PostValues>::from(record);
    assert_eq!(defaults.record_id, Some(RecordId::new("p1")));
    assert_eq!(defaults.values.description, "");
    assert!(defaults.values.uses(ImageSource::Picsum));
}

#[test]
#[tracing_test::traced_test]
fn save_outcome_is_logged() {
    let session = post_session(picsum_post(), FakeSaver::succeeding());
    block_on(session.submit()).expect("submit");
    assert!(logs_contain("record saved"));
    assert!(logs_contain("post-42"));

    let session = post_session(
        picsum_post(),
        FakeSaver::failing(SaveError::Network("offline".into())),
    );
    block_on(session.submit()).expect("submit");
    assert!(logs_contain("save failed"));
}

#[test]
fn image_source_events_switch_the_visible_group() {
    let session = post_session(PostValues::blank(), FakeSaver::succeeding());
    let surface = Arc::new(HiddenSurface::default());
    session
        .attach_post_surface(surface.clone())
        .expect("attach");

    session
        .on_post_field_change("imageSource", "upload".into())
        .expect("switch source");
    assert!(session.values().expect("values").uses(ImageSource::Upload));
    assert_eq!(surface.is_hidden(keys::IMAGE_URL), Some(true));
    assert_eq!(surface.is_hidden(keys::IMAGE), Some(false));

    assert!(matches!(
        session.on_post_field_change("imageSource", "gallery".into()),
        Err(FormError::InvalidValue(FieldValueError::InvalidChoice { .. }))
    ));
    assert!(session.values().expect("values").uses(ImageSource::Upload));
    assert_eq!(surface.is_hidden(keys::IMAGE), Some(false));

    session
        .on_post_field_change("title", "Hello".into())
        .expect("title");
    assert_eq!(session.values().expect("values").title, "Hello");
}
