use itertools::Itertools;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::feature::Params;

/// Decision capability behind a feature.
///
/// The output is a loosely typed value on purpose: the engine, not the
/// processor author, enforces that it is a boolean.
pub trait Process: Send + Sync {
    fn process(&self, context: &Context, params: &Params) -> Value;
}

impl<F> Process for F
where
    F: Fn(&Context, &Params) -> Value + Send + Sync,
{
    fn process(&self, context: &Context, params: &Params) -> Value {
        self(context, params)
    }
}

/// A feature's processor: either a fixed answer or a shared capability.
#[derive(Clone)]
pub enum Processor {
    Constant(bool),
    Custom(Arc<dyn Process>),
}

impl Processor {
    pub fn constant(value: bool) -> Self {
        Self::Constant(value)
    }

    /// Wrap a closure that already speaks booleans.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Context, &Params) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(move |ctx: &Context, params: &Params| {
            Value::Bool(f(ctx, params))
        }))
    }

    /// Wrap an unchecked capability; its output is validated at evaluation.
    pub fn from_process<P: Process + 'static>(p: P) -> Self {
        Self::Custom(Arc::new(p))
    }

    pub fn call(&self, context: &Context, params: &Params) -> Value {
        match self {
            Self::Constant(b) => Value::Bool(*b),
            Self::Custom(p) => p.process(context, params),
        }
    }

    pub fn as_constant(&self) -> Option<bool> {
        match self {
            Self::Constant(b) => Some(*b),
            Self::Custom(_) => None,
        }
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::Constant(false)
    }
}

impl From<bool> for Processor {
    fn from(value: bool) -> Self {
        Self::Constant(value)
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(b) => f.debug_tuple("Constant").field(b).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Named processors that configuration text can refer to.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<String, Processor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut map: HashMap<String, Processor> = HashMap::new();
        map.insert("always".into(), Processor::Constant(true));
        map.insert("never".into(), Processor::Constant(false));
        map.insert("context_in".into(), Processor::from_process(builtins::ContextIn));
        map.insert("context_flag".into(), Processor::from_process(builtins::ContextFlag));
        map.insert("rollout".into(), Processor::from_process(builtins::Rollout));
        Self { inner: Arc::new(map) }
    }

    pub fn register(&mut self, name: impl Into<String>, processor: Processor) {
        Arc::make_mut(&mut self.inner).insert(name.into(), processor);
    }

    pub fn get(&self, name: &str) -> Option<Processor> {
        self.inner.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("processors", &self.inner.keys().sorted().join(", "))
            .finish()
    }
}

pub mod builtins {
    use super::*;
    use sha2::{Digest, Sha256};

    /// Render a JSON value the way targeting lists are written: strings bare.
    fn render(v: &Value) -> String {
        match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Active when `context[params.attribute]` is one of `params.values`.
    pub struct ContextIn;
    impl Process for ContextIn {
        fn process(&self, context: &Context, params: &Params) -> Value {
            let Some(attr) = params.get("attribute").and_then(Value::as_str) else {
                return Value::Bool(false);
            };
            let Some(actual) = context.get(attr) else {
                return Value::Bool(false);
            };
            let actual = render(actual);
            let hit = params
                .get("values")
                .and_then(Value::as_array)
                .map(|vals| vals.iter().any(|v| render(v) == actual))
                .unwrap_or(false);
            Value::Bool(hit)
        }
    }

    /// Hands back `context[params.key]` untouched; absent keys read as false.
    pub struct ContextFlag;
    impl Process for ContextFlag {
        fn process(&self, context: &Context, params: &Params) -> Value {
            params
                .get("key")
                .and_then(Value::as_str)
                .and_then(|key| context.get(key))
                .cloned()
                .unwrap_or(Value::Bool(false))
        }
    }

    /// Deterministic percentage rollout keyed on a context attribute.
    ///
    /// `params.percentage` may be fractional; it is clamped to 0..=100, and
    /// a missing or non-numeric value reads as 0.
    pub struct Rollout;
    impl Rollout {
        fn bucket(salt: &str, value: &str) -> u8 {
            let mut hasher = Sha256::new();
            hasher.update(salt.as_bytes());
            hasher.update(value.as_bytes());
            let digest = hasher.finalize();
            // first byte (0-255) mapped onto 0-99
            ((digest[0] as u16 * 100) / 256) as u8
        }
    }
    impl Process for Rollout {
        fn process(&self, context: &Context, params: &Params) -> Value {
            let percentage = params
                .get("percentage")
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
                .clamp(0.0, 100.0);
            let bucket_by = params
                .get("bucket_by")
                .and_then(Value::as_str)
                .unwrap_or("user_id");
            let salt = params.get("salt").and_then(Value::as_str).unwrap_or("");
            let Some(value) = context.get(bucket_by) else {
                return Value::Bool(false);
            };
            Value::Bool(f64::from(Self::bucket(salt, &render(value))) < percentage)
        }
    }
}
