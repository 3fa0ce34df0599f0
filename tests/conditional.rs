use feature_toggle::{Branch, Context, Params, Static, Toggle};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn toggle_with(active: bool) -> Toggle {
    let mut t = Toggle::new();
    let params = json!({"bar": "b"}).as_object().cloned().unwrap();
    t.create("f1", active, params, Static::Unset).unwrap();
    t
}

fn describe(params: &Params, ctx: &Context) -> String {
    format!(
        "{}/{}",
        params.get("bar").and_then(Value::as_str).unwrap_or("-"),
        ctx.get("foo").and_then(Value::as_str).unwrap_or("-")
    )
}

#[test]
fn test_when_runs_callback_with_params_and_context() {
    let mut t = toggle_with(true);
    let ctx = Context::new().with("foo", "a");
    let out = t.when("f1", Some(&ctx), describe).unwrap();
    assert_eq!(out.taken(), Some("b/a".to_string()));
}

#[test]
fn test_when_else_takes_fallback() {
    let mut t = toggle_with(false);
    let ctx = Context::new().with("foo", "a");
    let out = t
        .when_else("f1", Some(&ctx), |_, _| "on", |_, _| "off")
        .unwrap();
    assert_eq!(out, "off");
}

#[test]
fn test_when_without_fallback_hands_back_registry() {
    let mut t = toggle_with(false);
    match t.when("f1", None, |_, _| ()).unwrap() {
        Branch::Skipped(toggle) => {
            toggle.create("f2", true, Params::new(), Static::Unset).unwrap();
        }
        Branch::Taken(_) => panic!("inactive feature ran its callback"),
    }
    assert!(t.has("f2"));
}

#[test]
fn test_unless_mirrors_when() {
    let mut t = toggle_with(false);
    let ctx = Context::new().with("foo", "a");
    let out = t.unless("f1", Some(&ctx), describe).unwrap();
    assert!(out.is_taken());

    let mut t = toggle_with(true);
    assert!(!t.unless("f1", None, |_, _| ()).unwrap().is_taken());
    let out = t
        .unless_else("f1", None, |_, _| "inactive", |_, _| "active")
        .unwrap();
    assert_eq!(out, "active");
}

#[test]
fn test_callbacks_fall_back_to_default_context() {
    let mut t = toggle_with(true);
    t.set_context(Context::new().with("foo", "default"));
    let out = t.when("f1", None, describe).unwrap().taken();
    assert_eq!(out.as_deref(), Some("b/default"));
}

#[test]
fn test_unknown_feature_callback_sees_empty_params() {
    let mut t = Toggle::new();
    let out = t
        .unless("ghost", None, |params: &Params, _: &Context| params.len())
        .unwrap()
        .taken();
    assert_eq!(out, Some(0));
}

#[test]
fn test_strict_mode_propagates_through_helpers() {
    let mut t = Toggle::new();
    t.set_strict(true);
    assert!(t.when("ghost", None, |_, _| ()).is_err());
    assert!(t.unless_else("ghost", None, |_, _| (), |_, _| ()).is_err());
}
