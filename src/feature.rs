use serde_json::{Map, Value};
use std::str::FromStr;

use crate::errors::{Result, ToggleError};
use crate::processor::{Processor, Registry};

/// Free-form configuration consumed by a feature's processor.
pub type Params = Map<String, Value>;

/// Three-state override: a set value short-circuits evaluation and caching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Static {
    #[default]
    Unset,
    Active,
    Inactive,
}

impl Static {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::Active => Some(true),
            Self::Inactive => Some(false),
        }
    }

    pub fn is_set(self) -> bool {
        self != Self::Unset
    }

    /// Anything but a literal boolean reads as unset.
    pub fn normalize(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Bool(b)) => Self::from(*b),
            _ => Self::Unset,
        }
    }
}

impl From<bool> for Static {
    fn from(b: bool) -> Self {
        if b {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

impl From<Option<bool>> for Static {
    fn from(b: Option<bool>) -> Self {
        b.map(Self::from).unwrap_or_default()
    }
}

/// A named unit of toggle logic, minus the name (the store owns that).
#[derive(Debug, Clone, Default)]
pub struct Feature {
    processor: Processor,
    params: Params,
    static_result: Static,
}

impl Feature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_processor(mut self, processor: impl Into<Processor>) -> Self {
        self.processor = processor.into();
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_static(mut self, static_result: impl Into<Static>) -> Self {
        self.static_result = static_result.into();
        self
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub fn static_result(&self) -> Static {
        self.static_result
    }

    pub fn get(&self, key: AttributeKey) -> Attribute {
        match key {
            AttributeKey::Processor => Attribute::Processor(self.processor.clone()),
            AttributeKey::Params => Attribute::Params(self.params.clone()),
            AttributeKey::Static => Attribute::Static(self.static_result),
        }
    }

    pub fn set(&mut self, attribute: Attribute) {
        match attribute {
            Attribute::Processor(p) => self.processor = p,
            Attribute::Params(p) => self.params = p,
            Attribute::Static(s) => self.static_result = s,
        }
    }

    /// Build a feature from a loosely typed definition object such as
    /// `{"processor": true, "params": {...}, "static": false}`.
    ///
    /// `null` stands for an empty definition. String processors are resolved
    /// by name against `registry`.
    pub fn from_definition(def: &Value, registry: &Registry) -> Result<Self> {
        let fields = match def {
            Value::Object(m) => m,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(ToggleError::InvalidDefinition(format!(
                    "feature definition must be an object, got {other}"
                )))
            }
        };
        Ok(Self {
            processor: parse_processor(fields.get("processor"), registry)?,
            params: parse_params(fields.get("params"))?,
            static_result: Static::normalize(fields.get("static")),
        })
    }
}

fn parse_processor(value: Option<&Value>, registry: &Registry) -> Result<Processor> {
    match value {
        None | Some(Value::Null) => Ok(Processor::default()),
        Some(Value::Bool(b)) => Ok(Processor::Constant(*b)),
        Some(Value::String(name)) => registry.get(name).ok_or_else(|| {
            ToggleError::InvalidDefinition(format!(
                "feature key `processor` must be callable, no processor named '{name}'"
            ))
        }),
        Some(other) => Err(ToggleError::InvalidDefinition(format!(
            "feature key `processor` must be callable, got {other}"
        ))),
    }
}

fn parse_params(value: Option<&Value>) -> Result<Params> {
    match value {
        None | Some(Value::Null) => Ok(Params::new()),
        Some(Value::Object(m)) => Ok(m.clone()),
        Some(other) => Err(ToggleError::InvalidDefinition(format!(
            "feature key `params` must be a mapping, got {other}"
        ))),
    }
}

/// The mutable fields of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    Processor,
    Params,
    Static,
}

impl FromStr for AttributeKey {
    type Err = ToggleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "processor" => Ok(Self::Processor),
            "params" => Ok(Self::Params),
            "static" => Ok(Self::Static),
            other => Err(ToggleError::InvalidDefinition(format!(
                "unknown feature key `{other}`"
            ))),
        }
    }
}

/// A single field value of a feature.
#[derive(Debug, Clone)]
pub enum Attribute {
    Processor(Processor),
    Params(Params),
    Static(Static),
}

impl Attribute {
    pub fn key(&self) -> AttributeKey {
        match self {
            Self::Processor(_) => AttributeKey::Processor,
            Self::Params(_) => AttributeKey::Params,
            Self::Static(_) => AttributeKey::Static,
        }
    }

    /// Same rules as a definition field: processor and params are validated,
    /// static is normalized.
    pub fn from_value(key: AttributeKey, value: &Value, registry: &Registry) -> Result<Self> {
        Ok(match key {
            AttributeKey::Processor => Self::Processor(parse_processor(Some(value), registry)?),
            AttributeKey::Params => Self::Params(parse_params(Some(value))?),
            AttributeKey::Static => Self::Static(Static::normalize(Some(value))),
        })
    }

    pub fn as_params(&self) -> Option<&Params> {
        match self {
            Self::Params(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_static(&self) -> Option<Static> {
        match self {
            Self::Static(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_processor(&self) -> Option<&Processor> {
        match self {
            Self::Processor(p) => Some(p),
            _ => None,
        }
    }
}
