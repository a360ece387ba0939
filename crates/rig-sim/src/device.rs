//! Device model: the mutable state record of one simulated instrument
//!
//! A [`DeviceModel`] is a mapping from field name to [`Value`], built once
//! per simulated device and owned by that device's state machine. Fields
//! carry declared defaults so the model can be reset to a known state, and
//! a field may register a *write hook*: an explicit setter side effect that
//! rewrites other fields whenever it is written (for example, writing a
//! `units` field also rewriting a human-readable label).
//!
//! Models are per-instance values. Nothing in this module is process-global.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DeviceError};

/// A single field value on a device model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Numeric quantity (all numerics are f64 internally)
    Number(f64),
    /// Free-form text
    Text(String),
    /// Boolean flag
    Bool(bool),
    /// Nested sub-record
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Numeric value, if this is a `Number`
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text value, if this is a `Text`
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean value, if this is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Nested record, if this is a `Record`
    pub fn as_record(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Record(r) => write!(f, "{r:?}"),
        }
    }
}

/// Mutable view of the raw field map handed to write hooks
///
/// Writes made through this view land directly in the field map and do
/// not re-trigger hooks, so a hook rewriting a sibling field cannot
/// cascade into further hook invocations.
pub struct RawFields<'a> {
    fields: &'a mut BTreeMap<String, Value>,
}

impl RawFields<'_> {
    /// Read a field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Write a field without triggering hooks
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), DeviceError> {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(DeviceError::UnknownField(name.to_string())),
        }
    }
}

type WriteHook = Box<dyn Fn(&mut RawFields<'_>, &Value) + Send>;

/// Mutable state record of one simulated instrument
pub struct DeviceModel {
    fields: BTreeMap<String, Value>,
    defaults: BTreeMap<String, Value>,
    hooks: BTreeMap<String, WriteHook>,
    connectivity_field: Option<String>,
}

impl fmt::Debug for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceModel")
            .field("fields", &self.fields)
            .field("connectivity_field", &self.connectivity_field)
            .finish_non_exhaustive()
    }
}

impl DeviceModel {
    /// Start building a device model
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Read a field
    pub fn get(&self, name: &str) -> Result<&Value, DeviceError> {
        self.fields
            .get(name)
            .ok_or_else(|| DeviceError::UnknownField(name.to_string()))
    }

    /// Read a numeric field
    pub fn number(&self, name: &str) -> Result<f64, DeviceError> {
        self.get(name)?
            .as_number()
            .ok_or_else(|| DeviceError::TypeMismatch {
                field: name.to_string(),
                expected: "number",
            })
    }

    /// Read a boolean field
    pub fn flag(&self, name: &str) -> Result<bool, DeviceError> {
        self.get(name)?
            .as_bool()
            .ok_or_else(|| DeviceError::TypeMismatch {
                field: name.to_string(),
                expected: "bool",
            })
    }

    /// Read a text field
    pub fn text(&self, name: &str) -> Result<&str, DeviceError> {
        self.get(name)?
            .as_text()
            .ok_or_else(|| DeviceError::TypeMismatch {
                field: name.to_string(),
                expected: "text",
            })
    }

    /// Write a field, running its write hook if one is registered
    ///
    /// The hook runs after the write and sees the new value; writes it
    /// makes through [`RawFields`] do not trigger further hooks.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), DeviceError> {
        let value = value.into();
        match self.fields.get_mut(name) {
            Some(slot) => *slot = value.clone(),
            None => return Err(DeviceError::UnknownField(name.to_string())),
        }
        if let Some(hook) = self.hooks.get(name) {
            let mut view = RawFields {
                fields: &mut self.fields,
            };
            hook(&mut view, &value);
        }
        Ok(())
    }

    /// Reinitialize every field to its declared default
    ///
    /// Write hooks do not run; the defaults are restored verbatim.
    /// Resetting twice in a row leaves the model identical both times.
    pub fn reset(&mut self) {
        self.fields = self.defaults.clone();
    }

    /// Whether the simulated link to the instrument is up
    ///
    /// Devices without a declared connectivity flag are always connected.
    pub fn is_connected(&self) -> bool {
        match &self.connectivity_field {
            Some(name) => self
                .fields
                .get(name)
                .and_then(Value::as_bool)
                .unwrap_or(true),
            None => true,
        }
    }

    /// Names of all declared fields, in sorted order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Builder for [`DeviceModel`]
///
/// Field declarations are checked at [`build`](ModelBuilder::build):
/// duplicate field names and hooks or connectivity flags referencing
/// undeclared fields are configuration errors.
#[derive(Default)]
pub struct ModelBuilder {
    fields: Vec<(String, Value)>,
    hooks: Vec<(String, WriteHook)>,
    connectivity_field: Option<String>,
}

impl ModelBuilder {
    /// Declare a field with its default value
    pub fn field(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.fields.push((name.into(), default.into()));
        self
    }

    /// Register a write hook for a field
    pub fn derive_on_write(
        mut self,
        name: impl Into<String>,
        hook: impl Fn(&mut RawFields<'_>, &Value) + Send + 'static,
    ) -> Self {
        self.hooks.push((name.into(), Box::new(hook)));
        self
    }

    /// Declare which boolean field models link connectivity
    pub fn connectivity_flag(mut self, name: impl Into<String>) -> Self {
        self.connectivity_field = Some(name.into());
        self
    }

    /// Validate the declarations and build the model
    pub fn build(self) -> Result<DeviceModel, ConfigError> {
        let mut fields = BTreeMap::new();
        for (name, default) in self.fields {
            if fields.insert(name.clone(), default).is_some() {
                return Err(ConfigError::DuplicateField(name));
            }
        }

        let mut hooks = BTreeMap::new();
        for (name, hook) in self.hooks {
            if !fields.contains_key(&name) {
                return Err(ConfigError::UnknownField(name));
            }
            hooks.insert(name, hook);
        }

        if let Some(name) = &self.connectivity_field {
            if !fields.contains_key(name) {
                return Err(ConfigError::UnknownField(name.clone()));
            }
        }

        Ok(DeviceModel {
            defaults: fields.clone(),
            fields,
            hooks,
            connectivity_field: self.connectivity_field,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> DeviceModel {
        DeviceModel::builder()
            .field("temperature", 20.0)
            .field("setpoint", 20.0)
            .field("units", "C")
            .field("unit_label", "degC")
            .field("connected", true)
            .connectivity_flag("connected")
            .derive_on_write("units", |fields, value| {
                let label = match value.as_text() {
                    Some("F") => "degF",
                    _ => "degC",
                };
                let _ = fields.set("unit_label", label);
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults_and_typed_reads() {
        let model = sample_model();
        assert_eq!(model.number("temperature").unwrap(), 20.0);
        assert_eq!(model.text("units").unwrap(), "C");
        assert!(model.flag("connected").unwrap());
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let mut model = sample_model();
        assert!(matches!(
            model.get("bogus"),
            Err(DeviceError::UnknownField(_))
        ));
        assert!(matches!(
            model.set("bogus", 1.0),
            Err(DeviceError::UnknownField(_))
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let model = sample_model();
        assert!(matches!(
            model.number("units"),
            Err(DeviceError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_write_hook_rewrites_sibling_field() {
        let mut model = sample_model();
        model.set("units", "F").unwrap();
        assert_eq!(model.text("unit_label").unwrap(), "degF");

        model.set("units", "C").unwrap();
        assert_eq!(model.text("unit_label").unwrap(), "degC");
    }

    #[test]
    fn test_reset_restores_defaults_idempotently() {
        let mut model = sample_model();
        model.set("temperature", 85.0).unwrap();
        model.set("units", "F").unwrap();

        model.reset();
        let after_first: Vec<Value> = model
            .field_names()
            .map(|n| model.get(n).unwrap().clone())
            .collect();
        assert_eq!(model.number("temperature").unwrap(), 20.0);
        assert_eq!(model.text("unit_label").unwrap(), "degC");

        model.reset();
        let after_second: Vec<Value> = model
            .field_names()
            .map(|n| model.get(n).unwrap().clone())
            .collect();
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_connectivity_flag() {
        let mut model = sample_model();
        assert!(model.is_connected());
        model.set("connected", false).unwrap();
        assert!(!model.is_connected());
    }

    #[test]
    fn test_model_without_flag_is_always_connected() {
        let model = DeviceModel::builder().field("x", 0.0).build().unwrap();
        assert!(model.is_connected());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = DeviceModel::builder()
            .field("x", 0.0)
            .field("x", 1.0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateField("x".to_string()));
    }

    #[test]
    fn test_hook_on_unknown_field_rejected() {
        let err = DeviceModel::builder()
            .field("x", 0.0)
            .derive_on_write("y", |_, _| {})
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownField("y".to_string()));
    }
}
