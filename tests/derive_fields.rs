use sigfield::{Fields, Runtime};

#[derive(Fields)]
struct AppState {
    counter: i32,
    name: String,
    password: Option<String>,
}

fn app_state() -> AppStateFields {
    AppState {
        counter: 15,
        name: String::new(),
        password: None,
    }
    .into_keys()
}

#[test]
fn keys_follow_struct_fields() {
    let fields = app_state();
    assert_eq!(
        fields.schema().names().collect::<Vec<_>>(),
        ["counter", "name", "password"]
    );
    assert_eq!(fields.counter.hook_name(), "useCounter");
    assert_eq!(fields.password.setter_hook_name(), "useSetPassword");
}

#[test]
fn generated_accessors() {
    let mut rt = Runtime::new();
    let fields = app_state();
    let f = fields.clone();
    let boundary = rt.mount(None, move |cx| f.provide(cx, None));

    let f = fields.clone();
    let reader = rt.mount(Some(boundary.id()), move |cx| {
        (f.use_counter_value(cx), f.use_name(cx), f.use_password_value(cx))
    });
    let f = fields.clone();
    let writer = rt.mount(Some(boundary.id()), move |cx| f.use_set_counter(cx));

    let (counter, (name, set_name), password) = rt.output(&reader);
    assert_eq!((counter, name.as_str(), password), (15, "", None));

    set_name.set("X".to_string());
    rt.output(&writer).set(82);
    rt.update();

    let (counter, (name, _), password) = rt.output(&reader);
    assert_eq!(counter, 82);
    assert_eq!(name, "X");
    assert_eq!(password, None);
    assert_eq!(rt.render_count(writer.id()), 1);
}

#[derive(Fields)]
pub struct Raw {
    r#type: u8,
}

#[test]
fn raw_identifiers() {
    let fields = Raw { r#type: 1 }.into_keys();
    assert_eq!(fields.r#type.name(), "type");
    assert_eq!(fields.r#type.display_name(), "Type");
}

#[test]
fn getter_and_setter_groups() {
    let mut rt = Runtime::new();
    let fields = app_state();
    let f = fields.clone();
    let boundary = rt.mount(None, move |cx| f.provide(cx, None));

    let f = fields.clone();
    let reader = rt.mount(Some(boundary.id()), move |cx| {
        let getters = f.getters();
        (getters.use_counter(cx), getters.use_name(cx))
    });
    let f = fields.clone();
    let writer = rt.mount(Some(boundary.id()), move |cx| {
        let setters = f.setters();
        (setters.use_counter(cx), setters.use_name(cx))
    });
    assert_eq!(rt.output(&reader), (15, String::new()));

    let (set_counter, set_name) = rt.output(&writer);
    assert_eq!(set_counter.name(), "counter");
    set_counter.update_with(|v| v + 1);
    set_name.set("X".to_string());
    rt.update();

    assert_eq!(rt.output(&reader), (16, "X".to_string()));
    assert_eq!(rt.render_count(writer.id()), 1);
    assert_eq!(set_counter.cell().subscriber_count(), 1);
}
