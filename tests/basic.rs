use feature_toggle::{Attribute, AttributeKey, Context, Feature, Params, Processor, Static, Toggle};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn params(v: Value) -> Params {
    v.as_object().cloned().unwrap()
}

#[test]
fn test_unknown_feature_is_inactive() {
    let mut t = Toggle::new();
    assert!(!t.is_active("not-exist").unwrap());
    assert!(t.is_inactive("not-exist").unwrap());
}

#[test]
fn test_closure_processor_decides() {
    let mut t = Toggle::new();
    t.add("yes", Feature::new().with_processor(Processor::from_fn(|_, _| true)))
        .unwrap()
        .add("no", Feature::new().with_processor(Processor::from_fn(|_, _| false)))
        .unwrap();
    assert!(t.is_active("yes").unwrap());
    assert!(!t.is_active("no").unwrap());
}

#[test]
fn test_constant_processors_and_default() {
    let mut t = Toggle::new();
    t.create("on", true, Params::new(), Static::Unset).unwrap();
    t.create("off", false, Params::new(), Static::Unset).unwrap();
    t.add("absent", Feature::new()).unwrap();
    assert!(t.is_active("on").unwrap());
    assert!(!t.is_active("off").unwrap());
    assert!(!t.is_active("absent").unwrap());
}

#[test]
fn test_processor_sees_context_and_params() {
    let mut t = Toggle::new();
    let feature = Feature::new()
        .with_param("min", 18)
        .with_processor(Processor::from_fn(|ctx, params| {
            let age = ctx.get("age").and_then(Value::as_i64).unwrap_or(0);
            let min = params.get("min").and_then(Value::as_i64).unwrap_or(0);
            age >= min
        }));
    t.add("adult", feature).unwrap();
    assert!(t.is_active_with("adult", &Context::new().with("age", 30)).unwrap());
}

#[test]
fn test_names_all_and_flush() {
    let mut t = Toggle::new();
    for n in ["b", "a", "c"] {
        t.add(n, Feature::new()).unwrap();
    }
    assert_eq!(t.names(), vec!["b", "a", "c"]);
    assert_eq!(t.all().len(), 3);
    assert!(t.has("a"));

    t.flush();
    assert!(!t.has("a"));
    assert!(t.names().is_empty());
}

#[test]
fn test_put_overwrites_without_duplicate_check() {
    let mut t = Toggle::new();
    t.create("foo", false, Params::new(), Static::Unset).unwrap();
    t.put("foo", Feature::new().with_processor(true)).unwrap();
    assert!(t.is_active("foo").unwrap());
}

#[test]
fn test_params_read_and_merge() {
    let mut t = Toggle::new();
    t.create("f1", false, params(json!({"foo": "a"})), Static::Unset).unwrap();

    assert_eq!(t.params("f1").unwrap(), &params(json!({"foo": "a"})));
    assert_eq!(t.param("f1", "foo"), Some(&json!("a")));
    assert_eq!(t.param_or("f1", "not-exist", "default"), json!("default"));
    assert_eq!(t.param_or("missing", "foo", 1), json!(1));

    t.merge_params("f1", params(json!({"bar": "b"}))).unwrap();
    assert_eq!(t.params("f1").unwrap(), &params(json!({"foo": "a", "bar": "b"})));

    t.set_param("f1", "foo", "z").unwrap();
    assert_eq!(t.param("f1", "foo"), Some(&json!("z")));

    t.set_params("f1", Params::new()).unwrap();
    assert!(t.params("f1").unwrap().is_empty());
}

#[test]
fn test_processor_accessors() {
    let mut t = Toggle::new();
    t.create("f1", false, Params::new(), Static::Unset).unwrap();
    assert_eq!(t.processor("f1").unwrap().as_constant(), Some(false));

    t.set_processor("f1", Processor::from_fn(|_, _| true)).unwrap();
    assert!(t.processor("f1").unwrap().as_constant().is_none());
    assert!(t.is_active("f1").unwrap());
}

#[test]
fn test_attribute_falls_back_to_default_for_unknown_feature() {
    let mut t = Toggle::new();
    t.create("f1", true, Params::new(), Static::Active).unwrap();

    let fallback = t.attribute_or("missing", AttributeKey::Static, Attribute::Static(Static::Inactive));
    assert_eq!(fallback.as_static(), Some(Static::Inactive));
    assert!(t.attribute("missing", AttributeKey::Params).is_none());

    let found = t.attribute_or("f1", AttributeKey::Static, Attribute::Static(Static::Inactive));
    assert_eq!(found.as_static(), Some(Static::Active));

    t.set_attribute("f1", Attribute::Static(Static::Unset)).unwrap();
    assert_eq!(t.feature("f1").unwrap().static_result(), Static::Unset);
}

#[test]
fn test_remove_unknown_is_noop() {
    let mut t = Toggle::new();
    t.add("foo", Feature::new()).unwrap();
    t.remove("bar");
    assert_eq!(t.names(), vec!["foo"]);
}
