use postform::form::{FieldLens, FieldValue, FormModel};

#[derive(Clone, postform::form::FormModel)]
struct DemoForm {
    email: String,
    #[form(key = "displayName")]
    display_name: Option<String>,
}

fn main() {
    let fields = DemoForm::fields();
    let lens = fields.email();
    let mut model = DemoForm {
        email: "a@example.com".to_string(),
        display_name: None,
    };
    lens.set(&mut model, "b@example.com".to_string());
    assert_eq!(lens.key().as_str(), "email");
    assert_eq!(lens.get(&model), "b@example.com");

    let keys: Vec<_> = DemoForm::field_keys().iter().map(|key| key.as_str()).collect();
    assert_eq!(keys, ["email", "displayName"]);

    let name = DemoForm::find_key("displayName").expect("wire key");
    model
        .set_field_value(name, FieldValue::from("Ada"))
        .expect("text fits an optional string");
    assert_eq!(fields.display_name().get(&model).as_deref(), Some("Ada"));
}
