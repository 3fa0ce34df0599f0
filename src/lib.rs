//! Feature toggle evaluation.
//!
//! A [`Toggle`] holds named features, decides whether each one is active for
//! a caller-supplied [`Context`], and remembers the first answer so one
//! request sees a consistent view even when processors are time based or
//! random.
//!
//! ```
//! use feature_toggle::{Context, Feature, Processor, Toggle};
//!
//! let mut toggle = Toggle::new();
//! toggle
//!     .add("new-ui", Feature::new().with_processor(Processor::from_fn(|ctx, _| {
//!         ctx.get("beta").and_then(|v| v.as_bool()).unwrap_or(false)
//!     })))
//!     .unwrap();
//!
//! let ctx = Context::new().with("beta", true);
//! assert!(toggle.is_active_with("new-ui", &ctx).unwrap());
//! // the answer is preserved, whatever the next context says
//! assert!(toggle.is_active_with("new-ui", &Context::new().with("beta", false)).unwrap());
//! ```

pub mod cache;
pub mod context;
pub mod errors;
pub mod feature;
pub mod options;
pub mod processor;
pub mod store;
pub mod toggle;

pub use cache::{ResultCache, Snapshot};
pub use context::Context;
pub use errors::{Result, ToggleError};
pub use feature::{Attribute, AttributeKey, Feature, Params, Static};
pub use options::ToggleOptions;
pub use processor::{Process, Processor, Registry};
pub use store::FeatureStore;
pub use toggle::{Branch, Toggle};
