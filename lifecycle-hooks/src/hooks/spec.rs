//! Hook specifications and their declaration-time validation.
//!
//! A [`HookSpec`] describes one condition under which a hooked method fires.
//! Specs are declared through [`hook`], which returns a [`HookBuilder`]:
//!
//! ```
//! use lifecycle_hooks::hooks::{hook, BEFORE_SAVE, AFTER_UPDATE};
//! use serde_json::Value;
//!
//! let lowercase = hook(BEFORE_SAVE).when("email").is_not(Value::Null).build().unwrap();
//! let banned = hook(AFTER_UPDATE)
//!     .when("status")
//!     .was("active")
//!     .is_now("banned")
//!     .build()
//!     .unwrap();
//! # let _ = (lowercase, banned);
//! ```
//!
//! The loosely typed [`HookParams`] form accepts the same parameters as JSON
//! values, for hooks declared from data.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use super::condition::Condition;
use super::error::ConfigError;
use super::event::LifecycleEvent;

/// Which fields a spec watches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSelector {
    /// No field: the spec fires on every occurrence of its event.
    #[default]
    All,
    /// A single field name or `relation.field` path.
    Field(String),
    /// Any of these fields; the spec fires once per field that matches.
    AnyOf(Vec<String>),
}

impl FieldSelector {
    /// Field paths named by this selector.
    pub fn fields(&self) -> &[String] {
        match self {
            FieldSelector::All => &[],
            FieldSelector::Field(field) => std::slice::from_ref(field),
            FieldSelector::AnyOf(fields) => fields,
        }
    }
}

/// An immutable, validated hook condition.
#[derive(Debug, Clone)]
pub struct HookSpec {
    pub event: LifecycleEvent,
    pub selector: FieldSelector,
    /// Expected prior value.
    pub was: Condition,
    /// Expected current value.
    pub is_now: Condition,
    /// Required result of `has_changed` for the field, if set.
    pub has_changed: Option<bool>,
    /// Current value must not literally equal this, if set.
    pub is_not: Option<Condition>,
    /// Prior value must not literally equal this, if set.
    pub was_not: Option<Condition>,
    /// Prior value must not match and current value must match this, if set.
    pub changes_to: Option<Condition>,
}

impl HookSpec {
    /// Field paths of the form `relation.field` watched by this spec.
    pub fn related_paths(&self) -> impl Iterator<Item = &str> {
        self.selector
            .fields()
            .iter()
            .map(String::as_str)
            .filter(|field| field.contains('.'))
    }
}

/// Declarative hook parameters, as they appear in data.
///
/// Selector and flag fields are kept as raw JSON so that malformed input can be
/// reported as a [`ConfigError`] instead of failing deserialization. A key that
/// is present with `null` is distinct from a missing key: `is_not = null`
/// excludes null values, a missing `is_not` excludes nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookParams {
    pub hook: String,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub when: Option<Value>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub when_any: Option<Value>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub was: Option<Value>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub is_now: Option<Value>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub has_changed: Option<Value>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub is_not: Option<Value>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub was_not: Option<Value>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub changes_to: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Check the parameters that can be malformed, returning the parsed event.
///
/// `when` and `when_any` are `None` when not supplied. `when: Some(Value::Null)`
/// is treated like a missing selector.
pub fn validate_hook_params(
    hook: &str,
    when: Option<&Value>,
    when_any: Option<&Value>,
    has_changed: Option<&Value>,
) -> Result<LifecycleEvent, ConfigError> {
    let event: LifecycleEvent = hook.parse()?;

    if let Some(flag) = has_changed
        && !flag.is_null()
        && !flag.is_boolean()
    {
        return Err(ConfigError::NonBooleanHasChanged);
    }

    let when = when.filter(|v| !v.is_null());
    let when_any = when_any.filter(|v| !v.is_null());

    if let Some(field) = when
        && !field.is_string()
    {
        return Err(ConfigError::NonStringWhen);
    }

    if let Some(fields) = when_any {
        let fields = fields.as_array().ok_or(ConfigError::MalformedWhenAny)?;

        if fields.is_empty() {
            return Err(ConfigError::EmptyWhenAny);
        }

        if fields.iter().any(|field| !field.is_string()) {
            return Err(ConfigError::MalformedWhenAny);
        }
    }

    if when.is_some() && when_any.is_some() {
        return Err(ConfigError::ConflictingSelectors);
    }

    Ok(event)
}

/// Start declaring a hook for `event`.
///
/// `event` is one of the names in [`VALID_HOOKS`](super::VALID_HOOKS) or a
/// [`LifecycleEvent`]. Nothing is checked until [`HookBuilder::build`].
pub fn hook(event: impl AsRef<str>) -> HookBuilder {
    HookBuilder::new(event)
}

/// Builder for a [`HookSpec`].
#[derive(Debug, Clone)]
pub struct HookBuilder {
    hook: String,
    when: Option<Value>,
    when_any: Option<Value>,
    has_changed: Option<Value>,
    was: Condition,
    is_now: Condition,
    is_not: Option<Condition>,
    was_not: Option<Condition>,
    changes_to: Option<Condition>,
}

impl HookBuilder {
    pub fn new(event: impl AsRef<str>) -> Self {
        Self {
            hook: event.as_ref().to_string(),
            when: None,
            when_any: None,
            has_changed: None,
            was: Condition::Any,
            is_now: Condition::Any,
            is_not: None,
            was_not: None,
            changes_to: None,
        }
    }

    /// Watch a single field, or a `relation.field` path.
    pub fn when(mut self, field: impl Into<String>) -> Self {
        self.when = Some(Value::String(field.into()));
        self
    }

    /// Watch several fields; the hook fires once per field that matches.
    pub fn when_any<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.when_any = Some(Value::Array(
            fields.into_iter().map(|f| Value::String(f.into())).collect(),
        ));
        self
    }

    /// Expected prior value; `"*"` matches anything.
    pub fn was(mut self, condition: impl Into<Condition>) -> Self {
        self.was = condition.into().expand_wildcard();
        self
    }

    /// Expected current value; `"*"` matches anything.
    pub fn is_now(mut self, condition: impl Into<Condition>) -> Self {
        self.is_now = condition.into().expand_wildcard();
        self
    }

    pub fn has_changed(mut self, changed: bool) -> Self {
        self.has_changed = Some(Value::Bool(changed));
        self
    }

    pub fn is_not(mut self, condition: impl Into<Condition>) -> Self {
        self.is_not = Some(condition.into());
        self
    }

    pub fn was_not(mut self, condition: impl Into<Condition>) -> Self {
        self.was_not = Some(condition.into());
        self
    }

    pub fn changes_to(mut self, condition: impl Into<Condition>) -> Self {
        self.changes_to = Some(condition.into());
        self
    }

    /// Validate the declaration and produce the spec.
    pub fn build(self) -> Result<HookSpec, ConfigError> {
        let event = validate_hook_params(
            &self.hook,
            self.when.as_ref(),
            self.when_any.as_ref(),
            self.has_changed.as_ref(),
        )?;

        let selector = match (self.when, self.when_any) {
            (Some(Value::String(field)), _) => FieldSelector::Field(field),
            (_, Some(Value::Array(fields))) => FieldSelector::AnyOf(
                fields
                    .into_iter()
                    .filter_map(|f| match f {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => FieldSelector::All,
        };

        let has_changed = self.has_changed.and_then(|flag| flag.as_bool());

        for (name, condition) in [("is_not", &self.is_not), ("was_not", &self.was_not)] {
            if condition.as_ref().is_some_and(Condition::is_predicate) {
                warn!(
                    hook = %event,
                    param = name,
                    "predicate given to '{}' is compared literally and never excludes",
                    name
                );
            }
        }

        Ok(HookSpec {
            event,
            selector,
            was: self.was,
            is_now: self.is_now,
            has_changed,
            is_not: self.is_not,
            was_not: self.was_not,
            changes_to: self.changes_to,
        })
    }
}

impl From<HookParams> for HookBuilder {
    fn from(params: HookParams) -> Self {
        Self {
            hook: params.hook,
            when: params.when,
            when_any: params.when_any,
            has_changed: params.has_changed,
            was: params
                .was
                .map(|v| Condition::from(v).expand_wildcard())
                .unwrap_or_default(),
            is_now: params
                .is_now
                .map(|v| Condition::from(v).expand_wildcard())
                .unwrap_or_default(),
            is_not: params.is_not.map(Condition::from),
            was_not: params.was_not.map(Condition::from),
            changes_to: params.changes_to.map(Condition::from),
        }
    }
}

impl TryFrom<HookParams> for HookSpec {
    type Error = ConfigError;

    fn try_from(params: HookParams) -> Result<Self, Self::Error> {
        HookBuilder::from(params).build()
    }
}
