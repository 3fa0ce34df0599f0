use feature_toggle::{Context, Feature, Processor, Toggle};
use proptest::prelude::*;
use serde_json::Value;

fn threshold() -> Processor {
    Processor::from_fn(|ctx, params| {
        let n = ctx.get("n").and_then(Value::as_i64).unwrap_or(0);
        let min = params.get("min").and_then(Value::as_i64).unwrap_or(0);
        n >= min
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // first answer sticks no matter how the context changes afterwards
    #[test]
    fn test_first_result_is_preserved(min in -100i64..100, first in -100i64..100, later in proptest::collection::vec(-100i64..100, 1..8)) {
        let mut t = Toggle::new();
        t.add("f", Feature::new().with_param("min", min).with_processor(threshold())).unwrap();

        let expected = first >= min;
        prop_assert_eq!(t.is_active_with("f", &Context::new().with("n", first)).unwrap(), expected);
        for n in later {
            prop_assert_eq!(t.is_active_with("f", &Context::new().with("n", n)).unwrap(), expected);
            prop_assert_eq!(t.is_inactive_with("f", &Context::new().with("n", n)).unwrap(), !expected);
        }
    }

    #[test]
    fn test_fresh_duplicate_re_evaluates(min in -100i64..100, a in -100i64..100, b in -100i64..100) {
        let mut t = Toggle::new();
        t.add("f", Feature::new().with_param("min", min).with_processor(threshold())).unwrap();
        let first = t.is_active_with("f", &Context::new().with("n", a)).unwrap();

        let ctx_b = Context::new().with("n", b);
        prop_assert_eq!(t.duplicate(true).is_active_with("f", &ctx_b).unwrap(), first);
        prop_assert_eq!(t.duplicate(false).is_active_with("f", &ctx_b).unwrap(), b >= min);
    }

    #[test]
    fn test_static_always_wins(value: bool, imported: bool) {
        let mut t = Toggle::new();
        t.add("f", Feature::new().with_processor(!value).with_static(value)).unwrap();
        t.import_results([("f", imported)]).unwrap();
        prop_assert_eq!(t.is_active("f").unwrap(), value);
    }
}
