use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::cache::{ResultCache, Snapshot};
use crate::context::Context;
use crate::errors::{Result, ToggleError};
use crate::feature::{Attribute, AttributeKey, Feature, Params, Static};
use crate::options::ToggleOptions;
use crate::processor::{Processor, Registry};
use crate::store::FeatureStore;

const DOCUMENT_KEYS: [&str; 3] = ["options", "context", "features"];

/// Outcome of [`Toggle::when`] / [`Toggle::unless`] without a fallback.
#[derive(Debug)]
pub enum Branch<'a, R> {
    /// The callback ran and produced this value.
    Taken(R),
    /// Nothing ran; the registry is handed back for chaining.
    Skipped(&'a mut Toggle),
}

impl<'a, R> Branch<'a, R> {
    pub fn is_taken(&self) -> bool {
        matches!(self, Self::Taken(_))
    }

    pub fn taken(self) -> Option<R> {
        match self {
            Self::Taken(r) => Some(r),
            Self::Skipped(_) => None,
        }
    }
}

/// Feature registry: definitions, evaluation, and the per-instance result cache.
///
/// One instance is meant to live for one logical request or session. The
/// first evaluation of a feature wins until the instance is flushed, the
/// feature removed, or a result imported over it.
#[derive(Debug, Clone)]
pub struct Toggle {
    store: FeatureStore,
    cache: ResultCache,
    context: Context,
    options: ToggleOptions,
    registry: Registry,
}

impl Default for Toggle {
    fn default() -> Self {
        Self::new()
    }
}

impl Toggle {
    pub fn new() -> Self {
        Self {
            store: FeatureStore::new(),
            cache: ResultCache::new(),
            context: Context::new(),
            options: ToggleOptions::default(),
            registry: Registry::with_builtins(),
        }
    }

    pub fn with_options(mut self, options: ToggleOptions) -> Self {
        self.options = options;
        self
    }

    /// Processors that configuration text and `set_attribute_value` may name.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> ToggleOptions {
        self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ---------------------------------------------------------------------
    // Construction from configuration
    // ---------------------------------------------------------------------

    /// Build from a `{name: {processor, params, static}}` object using the
    /// built-in processor registry.
    pub fn from_config(config: &Value) -> Result<Self> {
        Self::from_config_with(config, Registry::with_builtins())
    }

    pub fn from_config_with(config: &Value, registry: Registry) -> Result<Self> {
        let mut toggle = Self::new().with_registry(registry);
        toggle.load_features(config)?;
        Ok(toggle)
    }

    pub fn from_config_str(text: &str) -> Result<Self> {
        let config: Value = serde_json::from_str(text)?;
        Self::from_config(&config)
    }

    /// Accepts either a bare feature map or a document of the form
    /// `{"options": {..}, "context": {..}, "features": {..}}`.
    ///
    /// Only an object whose `features` is an object and whose keys are all
    /// document keys counts as a document, so a feature may be named
    /// `features`.
    pub fn from_document(doc: &Value) -> Result<Self> {
        let features = match doc {
            Value::Object(m)
                if m.get("features").is_some_and(Value::is_object)
                    && m.keys().all(|k| DOCUMENT_KEYS.contains(&k.as_str())) =>
            {
                &m["features"]
            }
            _ => return Self::from_config(doc),
        };
        let options: ToggleOptions = match doc.get("options") {
            Some(raw) => serde_json::from_value(raw.clone())?,
            None => ToggleOptions::default(),
        };
        let context = match doc.get("context") {
            Some(raw) => Context::try_from(raw.clone())?,
            None => Context::new(),
        };
        let mut toggle = Self::new().with_options(options);
        toggle.load_features(features)?;
        toggle.set_context(context);
        Ok(toggle)
    }

    fn load_features(&mut self, config: &Value) -> Result<()> {
        let entries = match config {
            Value::Object(m) => m,
            Value::Null => return Ok(()),
            other => {
                return Err(ToggleError::InvalidDefinition(format!(
                    "feature configuration must be an object, got {other}"
                )))
            }
        };
        let mut parsed = Vec::with_capacity(entries.len());
        for (name, def) in entries {
            let feature = Feature::from_definition(def, &self.registry).map_err(|e| match e {
                ToggleError::InvalidDefinition(msg) => {
                    ToggleError::InvalidDefinition(format!("feature '{name}': {msg}"))
                }
                other => other,
            })?;
            parsed.push((name.clone(), feature));
        }
        self.append(parsed)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Feature store
    // ---------------------------------------------------------------------

    /// Register a new feature; an existing name is a `DuplicateName` error.
    pub fn add(&mut self, name: impl Into<String>, feature: Feature) -> Result<&mut Self> {
        self.store.register(name, feature)?;
        Ok(self)
    }

    pub fn create(
        &mut self,
        name: impl Into<String>,
        processor: impl Into<Processor>,
        params: Params,
        static_result: impl Into<Static>,
    ) -> Result<&mut Self> {
        let feature = Feature::new()
            .with_processor(processor)
            .with_params(params)
            .with_static(static_result);
        self.add(name, feature)
    }

    /// Register or overwrite. A cached result for the name is kept.
    pub fn put(&mut self, name: impl Into<String>, feature: Feature) -> Result<&mut Self> {
        self.store.replace(name, feature)?;
        Ok(self)
    }

    /// Register several features; if any fails, none are registered.
    pub fn append<I, K>(&mut self, features: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, Feature)>,
        K: Into<String>,
    {
        let mut staged = self.store.clone();
        for (name, feature) in features {
            staged.register(name, feature)?;
        }
        self.store = staged;
        Ok(self)
    }

    /// Replace every definition and drop all cached results.
    ///
    /// Duplicate names inside `features` still fail, and a failure leaves the
    /// registry as it was.
    pub fn set_all<I, K>(&mut self, features: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, Feature)>,
        K: Into<String>,
    {
        let mut staged = FeatureStore::new();
        for (name, feature) in features {
            staged.register(name, feature)?;
        }
        debug!(count = staged.len(), "replaced all features");
        self.store = staged;
        self.cache.clear();
        Ok(self)
    }

    pub fn feature(&self, name: &str) -> Result<&Feature> {
        self.store.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.store.exists(name)
    }

    /// Drop a definition and its cached result; unknown names are ignored.
    pub fn remove(&mut self, name: &str) -> &mut Self {
        if self.store.remove(name) {
            debug!(feature = name, "removed feature");
        }
        self.cache.remove(name);
        self
    }

    pub fn flush(&mut self) -> &mut Self {
        debug!("flushed all features and results");
        self.store.flush();
        self.cache.clear();
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.store.names()
    }

    pub fn all(&self) -> IndexMap<String, Feature> {
        self.store.all()
    }

    // ---------------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------------

    pub fn is_active(&mut self, name: &str) -> Result<bool> {
        self.evaluate(name, None)
    }

    /// Evaluate against `context`; an empty context falls back to the default.
    pub fn is_active_with(&mut self, name: &str, context: &Context) -> Result<bool> {
        self.evaluate(name, Some(context))
    }

    pub fn is_inactive(&mut self, name: &str) -> Result<bool> {
        self.evaluate(name, None).map(|active| !active)
    }

    pub fn is_inactive_with(&mut self, name: &str, context: &Context) -> Result<bool> {
        self.evaluate(name, Some(context)).map(|active| !active)
    }

    fn effective_context<'a>(&'a self, context: Option<&'a Context>) -> &'a Context {
        match context {
            Some(ctx) if !ctx.is_empty() => ctx,
            _ => &self.context,
        }
    }

    fn evaluate(&mut self, name: &str, context: Option<&Context>) -> Result<bool> {
        let (result, fresh) = self.resolve(name, context)?;
        if fresh && self.options.preserve {
            self.cache.insert(name, result);
        }
        Ok(result)
    }

    /// Answer for `name` without touching the cache. The flag is set when
    /// the processor had to run, i.e. the answer is cacheable.
    fn resolve(&self, name: &str, context: Option<&Context>) -> Result<(bool, bool)> {
        let Some(feature) = self.store.lookup(name) else {
            if self.options.strict {
                return Err(ToggleError::NotFound(name.to_string()));
            }
            warn!(feature = name, "unknown feature evaluated as inactive");
            return Ok((false, false));
        };

        if let Some(result) = feature.static_result().as_bool() {
            trace!(feature = name, result, "static result");
            return Ok((result, false));
        }

        if let Some(result) = self.cache.get(name) {
            trace!(feature = name, result, "preserved result");
            return Ok((result, false));
        }

        let ctx = self.effective_context(context);
        match feature.processor().call(ctx, feature.params()) {
            Value::Bool(b) => Ok((b, true)),
            other => Err(ToggleError::InvalidResult {
                name: name.to_string(),
                found: other.to_string(),
            }),
        }
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    pub fn attribute(&self, name: &str, key: AttributeKey) -> Option<Attribute> {
        self.store.lookup(name).map(|f| f.get(key))
    }

    /// Like [`Toggle::attribute`], answering `default` for unknown features.
    pub fn attribute_or(&self, name: &str, key: AttributeKey, default: Attribute) -> Attribute {
        self.attribute(name, key).unwrap_or(default)
    }

    pub fn set_attribute(&mut self, name: &str, attribute: Attribute) -> Result<&mut Self> {
        self.store.get_mut(name)?.set(attribute);
        Ok(self)
    }

    /// Set a field from loosely typed input, e.g. `("params", {"a": 1})`.
    pub fn set_attribute_value(&mut self, name: &str, key: &str, value: &Value) -> Result<&mut Self> {
        let key: AttributeKey = key.parse()?;
        if !self.has(name) {
            return Err(ToggleError::NotFound(name.to_string()));
        }
        let attribute = Attribute::from_value(key, value, &self.registry)?;
        self.set_attribute(name, attribute)
    }

    pub fn params(&self, name: &str) -> Result<&Params> {
        self.store.get(name).map(Feature::params)
    }

    pub fn param(&self, name: &str, key: &str) -> Option<&Value> {
        self.store.lookup(name).and_then(|f| f.params().get(key))
    }

    pub fn param_or(&self, name: &str, key: &str, default: impl Into<Value>) -> Value {
        self.param(name, key).cloned().unwrap_or_else(|| default.into())
    }

    pub fn set_params(&mut self, name: &str, params: Params) -> Result<&mut Self> {
        self.set_attribute(name, Attribute::Params(params))
    }

    pub fn set_param(&mut self, name: &str, key: impl Into<String>, value: impl Into<Value>) -> Result<&mut Self> {
        self.store.get_mut(name)?.params_mut().insert(key.into(), value.into());
        Ok(self)
    }

    /// Shallow merge: keys in `params` overwrite, other keys stay.
    pub fn merge_params(&mut self, name: &str, params: Params) -> Result<&mut Self> {
        self.store.get_mut(name)?.params_mut().extend(params);
        Ok(self)
    }

    pub fn processor(&self, name: &str) -> Result<&Processor> {
        self.store.get(name).map(Feature::processor)
    }

    pub fn set_processor(&mut self, name: &str, processor: impl Into<Processor>) -> Result<&mut Self> {
        self.set_attribute(name, Attribute::Processor(processor.into()))
    }

    // ---------------------------------------------------------------------
    // Context & switches
    // ---------------------------------------------------------------------

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Used whenever an evaluation is given no (or an empty) context.
    pub fn set_context(&mut self, context: Context) -> &mut Self {
        self.context = context;
        self
    }

    pub fn set_strict(&mut self, strict: bool) -> &mut Self {
        self.options.strict = strict;
        self
    }

    pub fn set_preserve(&mut self, preserve: bool) -> &mut Self {
        self.options.preserve = preserve;
        self
    }

    // ---------------------------------------------------------------------
    // Results
    // ---------------------------------------------------------------------

    /// Outcome of every registered feature, evaluating the ones not yet seen.
    ///
    /// Newly computed outcomes are cached only once every feature has
    /// answered; a failing processor leaves the cache as it was.
    pub fn export_results(&mut self) -> Result<Snapshot> {
        let mut out = Snapshot::with_capacity(self.store.len());
        let mut staged = Vec::new();
        for name in self.store.names() {
            let (result, fresh) = self.resolve(&name, None)?;
            if fresh {
                staged.push((name.clone(), result));
            }
            out.insert(name, result);
        }
        if self.options.preserve {
            self.cache.merge(staged);
        }
        Ok(out)
    }

    /// Seed or overwrite cached outcomes. Every name must be registered,
    /// otherwise nothing is imported.
    pub fn import_results<I, K>(&mut self, results: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        let entries: Vec<(String, bool)> = results.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if let Some((missing, _)) = entries.iter().find(|(name, _)| !self.store.exists(name)) {
            return Err(ToggleError::NotFound(missing.clone()));
        }
        debug!(count = entries.len(), "imported results");
        self.cache.merge(entries);
        Ok(self)
    }

    /// Copy of this registry sharing its definitions, with or without the
    /// results cached so far.
    pub fn duplicate(&self, preserve_cache: bool) -> Self {
        let mut copy = self.clone();
        if !preserve_cache {
            copy.cache.clear();
        }
        debug!(preserve_cache, features = copy.store.len(), "duplicated registry");
        copy
    }

    // ---------------------------------------------------------------------
    // Conditional helpers
    // ---------------------------------------------------------------------

    fn run_branch<R, F>(&self, name: &str, context: Option<&Context>, f: F) -> R
    where
        F: FnOnce(&Params, &Context) -> R,
    {
        let empty = Params::new();
        let params = self.store.lookup(name).map(Feature::params).unwrap_or(&empty);
        f(params, self.effective_context(context))
    }

    /// Run `on_active(params, context)` if the feature is active.
    pub fn when<R, F>(&mut self, name: &str, context: Option<&Context>, on_active: F) -> Result<Branch<'_, R>>
    where
        F: FnOnce(&Params, &Context) -> R,
    {
        if self.evaluate(name, context)? {
            Ok(Branch::Taken(self.run_branch(name, context, on_active)))
        } else {
            Ok(Branch::Skipped(self))
        }
    }

    pub fn when_else<R, F, G>(
        &mut self,
        name: &str,
        context: Option<&Context>,
        on_active: F,
        on_inactive: G,
    ) -> Result<R>
    where
        F: FnOnce(&Params, &Context) -> R,
        G: FnOnce(&Params, &Context) -> R,
    {
        if self.evaluate(name, context)? {
            Ok(self.run_branch(name, context, on_active))
        } else {
            Ok(self.run_branch(name, context, on_inactive))
        }
    }

    /// Run `on_inactive(params, context)` if the feature is inactive.
    pub fn unless<R, F>(&mut self, name: &str, context: Option<&Context>, on_inactive: F) -> Result<Branch<'_, R>>
    where
        F: FnOnce(&Params, &Context) -> R,
    {
        if self.evaluate(name, context)? {
            Ok(Branch::Skipped(self))
        } else {
            Ok(Branch::Taken(self.run_branch(name, context, on_inactive)))
        }
    }

    pub fn unless_else<R, F, G>(
        &mut self,
        name: &str,
        context: Option<&Context>,
        on_inactive: F,
        on_active: G,
    ) -> Result<R>
    where
        F: FnOnce(&Params, &Context) -> R,
        G: FnOnce(&Params, &Context) -> R,
    {
        if self.evaluate(name, context)? {
            Ok(self.run_branch(name, context, on_active))
        } else {
            Ok(self.run_branch(name, context, on_inactive))
        }
    }
}
