//! `AttributeValue`: Typed values carried by attribute containers
//!
//! Values are type-erased at the data level: the primitives cover the common
//! attributes (usage, platform, debuggable, target version) and the `Custom`
//! variant lets extensions bring their own value types without touching the
//! core.
//!
//! # Extensibility via `Custom`
//!
//! Implement [`CustomAttributeValue`] and wrap in
//! `AttributeValue::Custom(Arc::new(your_type))`. Rules downcast through
//! [`CustomAttributeValue::as_any`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Declared type of an attribute.
///
/// `Custom` carries the type name reported by
/// [`CustomAttributeValue::custom_type_name`], so two extensions that pick the
/// same name are considered the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Free-form string values.
    String,
    /// Boolean flags.
    Bool,
    /// Signed integers (versions, API levels).
    Int,
    /// Extension-defined values.
    Custom(&'static str),
}

impl ValueType {
    /// Stable lowercase name used in configs and diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extension trait for attribute values not covered by the primitives.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; matchers are shared across
/// resolution workers.
///
/// # Example
///
/// ```
/// use std::any::Any;
/// use std::sync::Arc;
/// use vmatch::{AttributeValue, CustomAttributeValue};
///
/// #[derive(Debug, PartialEq)]
/// struct Platform { os: String, arch: String }
///
/// impl CustomAttributeValue for Platform {
///     fn custom_type_name(&self) -> &'static str { "platform" }
///     fn as_any(&self) -> &dyn Any { self }
///     fn value_eq(&self, other: &dyn CustomAttributeValue) -> bool {
///         other.as_any().downcast_ref::<Platform>() == Some(self)
///     }
/// }
///
/// let value = AttributeValue::Custom(Arc::new(Platform { os: "linux".into(), arch: "x86_64".into() }));
/// assert_eq!(value.value_type().name(), "platform");
/// ```
pub trait CustomAttributeValue: Send + Sync + fmt::Debug {
    /// Type identifier, `snake_case` by convention (e.g. `"platform"`).
    fn custom_type_name(&self) -> &'static str;

    /// Returns `self` as `&dyn Any` for downcasting in rules.
    fn as_any(&self) -> &dyn Any;

    /// Value equality against another custom value.
    ///
    /// Used for the default compatibility check and for collecting distinct
    /// values during disambiguation.
    fn value_eq(&self, other: &dyn CustomAttributeValue) -> bool;

    /// Rendering used in diagnostics. Defaults to the `Debug` output.
    fn render(&self) -> String {
        format!("{self:?}")
    }
}

/// A value for one attribute.
///
/// # Example
///
/// ```
/// use vmatch::{AttributeValue, ValueType};
///
/// let value: AttributeValue = "api".into();
/// assert_eq!(value.as_str(), Some("api"));
/// assert_eq!(value.value_type(), ValueType::String);
/// ```
#[derive(Debug, Clone)]
pub enum AttributeValue {
    /// String value.
    String(String),
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Extension-defined value.
    Custom(Arc<dyn CustomAttributeValue>),
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => {
                a.custom_type_name() == b.custom_type_name() && a.value_eq(b.as_ref())
            }
            _ => false,
        }
    }
}

impl AttributeValue {
    /// The type of this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Custom(c) => ValueType::Custom(c.custom_type_name()),
        }
    }

    /// Try to get the value as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Try to get the value as a boolean.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get the value as an integer.
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get the value as a custom value reference.
    #[inline]
    #[must_use]
    pub fn as_custom(&self) -> Option<&dyn CustomAttributeValue> {
        match self {
            Self::Custom(c) => Some(c.as_ref()),
            _ => None,
        }
    }

    /// Convert this value to `target`, if a lossless conversion exists.
    ///
    /// Consumers and producers sometimes declare the same attribute name with
    /// different types (a plain string on one side, a typed value on the other).
    /// Strings parse into booleans and integers; booleans and integers render
    /// into strings. Custom values only "coerce" to their own type.
    ///
    /// ```
    /// use vmatch::{AttributeValue, ValueType};
    ///
    /// let raw: AttributeValue = "true".into();
    /// assert_eq!(raw.coerce(ValueType::Bool), Some(AttributeValue::Bool(true)));
    /// assert_eq!(raw.coerce(ValueType::Int), None);
    /// ```
    #[must_use]
    pub fn coerce(&self, target: ValueType) -> Option<AttributeValue> {
        if self.value_type() == target {
            return Some(self.clone());
        }
        match (self, target) {
            (Self::String(s), ValueType::Bool) => match s.as_str() {
                "true" => Some(Self::Bool(true)),
                "false" => Some(Self::Bool(false)),
                _ => None,
            },
            (Self::String(s), ValueType::Int) => s.parse().ok().map(Self::Int),
            (Self::Bool(b), ValueType::String) => Some(Self::String(b.to_string())),
            (Self::Int(i), ValueType::String) => Some(Self::String(i.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Custom(c) => f.write_str(&c.render()),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}
