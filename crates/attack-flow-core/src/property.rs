//! Typed, self-describing property values.
//!
//! Every field on a diagram object is a [`Property`]: a [`PropertyValue`]
//! paired with the [`PropertyDescriptor`] it was created from. Scalars
//! (int, float, string, date, enum) hold at most one value; dictionaries
//! hold an ordered map of child properties and lists an ordered sequence.
//!
//! # Definedness
//!
//! [`Property::is_defined`] answers whether a property holds a meaningful
//! value. An empty string is *not* defined, neither is a scalar with no
//! value. Validators use this together with
//! [`PropertyDescriptor::is_required`] to find missing fields.
//!
//! # Construction
//!
//! Properties are normally built from descriptors, either with defaults
//! ([`Property::from_descriptor`]) or from a JSON value
//! ([`Property::from_json`]). Both reject list descriptors whose items are
//! lists, which is not a valid schema.

mod descriptor;

pub use descriptor::{DescriptorKind, PropertyDescriptor};

use std::{fmt, rc::Rc};

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

/// The kind of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Int,
    Float,
    String,
    Date,
    Enum,
    Dictionary,
    List,
}

impl PropertyType {
    /// Returns `true` for single-valued kinds.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, PropertyType::Dictionary | PropertyType::List)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::Int => "int",
            PropertyType::Float => "float",
            PropertyType::String => "string",
            PropertyType::Date => "date",
            PropertyType::Enum => "enum",
            PropertyType::Dictionary => "dictionary",
            PropertyType::List => "list",
        };
        f.write_str(name)
    }
}

/// Errors raised while building or updating properties.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    #[error("field '{path}': expected {expected} value")]
    TypeMismatch { path: String, expected: PropertyType },

    #[error("cannot store {found} value in {expected} property")]
    KindMismatch {
        expected: PropertyType,
        found: PropertyType,
    },

    #[error("field '{path}': {value} is outside the allowed range")]
    OutOfRange { path: String, value: String },

    #[error("field '{path}': '{value}' is not one of the allowed options")]
    UnknownOption { path: String, value: String },

    #[error("field '{path}': '{value}' is not an RFC 3339 date")]
    InvalidDate { path: String, value: String },

    #[error("field '{path}': unknown key '{key}'")]
    UnknownKey { path: String, key: String },

    #[error("field '{path}': lists of lists are not supported")]
    NestedList { path: String },
}

/// The value held by a [`Property`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(Option<i64>),
    Float(Option<f64>),
    String(String),
    Date(Option<DateTime<Utc>>),
    Enum(Option<String>),
    Dictionary(IndexMap<String, Property>),
    List(Vec<Property>),
}

impl PropertyValue {
    /// Returns the [`PropertyType`] of this value.
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Int(_) => PropertyType::Int,
            PropertyValue::Float(_) => PropertyType::Float,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Date(_) => PropertyType::Date,
            PropertyValue::Enum(_) => PropertyType::Enum,
            PropertyValue::Dictionary(_) => PropertyType::Dictionary,
            PropertyValue::List(_) => PropertyType::List,
        }
    }
}

/// A property value together with its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    descriptor: Rc<PropertyDescriptor>,
    value: PropertyValue,
}

impl Property {
    /// Pairs a descriptor with a value.
    ///
    /// No consistency check is made between the two; prefer
    /// [`Property::from_descriptor`] or [`Property::from_json`] unless
    /// the value is already known to match.
    pub fn new(descriptor: impl Into<Rc<PropertyDescriptor>>, value: PropertyValue) -> Self {
        Self {
            descriptor: descriptor.into(),
            value,
        }
    }

    /// Builds a property holding the descriptor's default value.
    ///
    /// Dictionaries get one child per form entry, lists start empty.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::NestedList`] if a list descriptor anywhere
    /// in the form has list items.
    pub fn from_descriptor(descriptor: &PropertyDescriptor) -> Result<Self, PropertyError> {
        Self::build_default(&Rc::new(descriptor.clone()), "")
    }

    /// Builds a property from a JSON value.
    ///
    /// `null` means "no value": scalars become undefined, dictionaries take
    /// their children's defaults for missing keys and lists become empty.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyError`] naming the dotted path of the offending
    /// field when the JSON does not fit the descriptor.
    pub fn from_json(descriptor: &PropertyDescriptor, value: &Value) -> Result<Self, PropertyError> {
        Self::build_json(&Rc::new(descriptor.clone()), value, "")
    }

    /// Returns the property's kind.
    pub fn property_type(&self) -> PropertyType {
        self.value.property_type()
    }

    /// Returns the descriptor this property was created from.
    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    /// Returns the held value.
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Replaces the held value, keeping the property's kind.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::KindMismatch`] if `value` is of another kind.
    pub fn set_value(&mut self, value: PropertyValue) -> Result<(), PropertyError> {
        let expected = self.property_type();
        let found = value.property_type();
        if found != expected {
            return Err(PropertyError::KindMismatch { expected, found });
        }
        self.value = value;
        Ok(())
    }

    /// Returns whether the property holds a meaningful value.
    pub fn is_defined(&self) -> bool {
        match &self.value {
            PropertyValue::Int(v) => v.is_some(),
            PropertyValue::Float(v) => v.is_some(),
            PropertyValue::String(v) => !v.is_empty(),
            PropertyValue::Date(v) => v.is_some(),
            PropertyValue::Enum(v) => v.is_some(),
            PropertyValue::Dictionary(children) => children.values().any(Property::is_defined),
            PropertyValue::List(items) => !items.is_empty(),
        }
    }

    /// Returns the dictionary entries in insertion order.
    ///
    /// Non-dictionary properties yield nothing.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Property)> {
        let map = match &self.value {
            PropertyValue::Dictionary(children) => Some(children),
            _ => None,
        };
        map.into_iter()
            .flatten()
            .map(|(key, child)| (key.as_str(), child))
    }

    /// Returns the list items in order. Non-list properties yield nothing.
    pub fn items(&self) -> &[Property] {
        match &self.value {
            PropertyValue::List(items) => items,
            _ => &[],
        }
    }

    /// Looks up a dictionary child by key.
    pub fn get(&self, key: &str) -> Option<&Property> {
        match &self.value {
            PropertyValue::Dictionary(children) => children.get(key),
            _ => None,
        }
    }

    /// Looks up a dictionary child by key for editing.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Property> {
        match &mut self.value {
            PropertyValue::Dictionary(children) => children.get_mut(key),
            _ => None,
        }
    }

    /// Appends an item built from the list's form to a list property.
    ///
    /// Returns the new item for editing, or `None` for non-list properties.
    pub fn push_default(&mut self) -> Result<Option<&mut Property>, PropertyError> {
        let DescriptorKind::List { form } = self.descriptor.kind() else {
            return Ok(None);
        };
        let item = Self::build_default(form, "")?;
        match &mut self.value {
            PropertyValue::List(items) => {
                items.push(item);
                Ok(items.last_mut())
            }
            _ => Ok(None),
        }
    }

    fn build_default(descriptor: &Rc<PropertyDescriptor>, path: &str) -> Result<Self, PropertyError> {
        let value = match descriptor.kind() {
            DescriptorKind::Int { default, .. } => PropertyValue::Int(*default),
            DescriptorKind::Float { default, .. } => PropertyValue::Float(*default),
            DescriptorKind::String { default } => {
                PropertyValue::String(default.clone().unwrap_or_default())
            }
            DescriptorKind::Date { default } => PropertyValue::Date(*default),
            DescriptorKind::Enum { default, .. } => PropertyValue::Enum(default.clone()),
            DescriptorKind::Dictionary { form } => {
                let mut children = IndexMap::with_capacity(form.len());
                for (key, child) in form {
                    let child_path = join_path(path, key);
                    children.insert(key.clone(), Self::build_default(child, &child_path)?);
                }
                PropertyValue::Dictionary(children)
            }
            DescriptorKind::List { form } => {
                ensure_flat_list(form, path)?;
                PropertyValue::List(Vec::new())
            }
        };
        Ok(Self::new(Rc::clone(descriptor), value))
    }

    fn build_json(
        descriptor: &Rc<PropertyDescriptor>,
        json: &Value,
        path: &str,
    ) -> Result<Self, PropertyError> {
        if json.is_null() {
            return Self::build_null(descriptor, path);
        }

        let mismatch = || PropertyError::TypeMismatch {
            path: path.to_string(),
            expected: descriptor.property_type(),
        };

        let value = match descriptor.kind() {
            DescriptorKind::Int { min, max, .. } => {
                let value = json.as_i64().ok_or_else(mismatch)?;
                if min.is_some_and(|min| value < min) || max.is_some_and(|max| value > max) {
                    return Err(PropertyError::OutOfRange {
                        path: path.to_string(),
                        value: value.to_string(),
                    });
                }
                PropertyValue::Int(Some(value))
            }
            DescriptorKind::Float { min, max, .. } => {
                let value = json.as_f64().ok_or_else(mismatch)?;
                if min.is_some_and(|min| value < min) || max.is_some_and(|max| value > max) {
                    return Err(PropertyError::OutOfRange {
                        path: path.to_string(),
                        value: value.to_string(),
                    });
                }
                PropertyValue::Float(Some(value))
            }
            DescriptorKind::String { .. } => {
                PropertyValue::String(json.as_str().ok_or_else(mismatch)?.to_string())
            }
            DescriptorKind::Date { .. } => {
                let text = json.as_str().ok_or_else(mismatch)?;
                let date = DateTime::parse_from_rfc3339(text).map_err(|_| {
                    PropertyError::InvalidDate {
                        path: path.to_string(),
                        value: text.to_string(),
                    }
                })?;
                PropertyValue::Date(Some(date.with_timezone(&Utc)))
            }
            DescriptorKind::Enum { options, .. } => {
                let text = json.as_str().ok_or_else(mismatch)?;
                if !options.iter().any(|option| option == text) {
                    return Err(PropertyError::UnknownOption {
                        path: path.to_string(),
                        value: text.to_string(),
                    });
                }
                PropertyValue::Enum(Some(text.to_string()))
            }
            DescriptorKind::Dictionary { form } => {
                let object = json.as_object().ok_or_else(mismatch)?;
                if let Some(key) = object.keys().find(|key| !form.contains_key(*key)) {
                    return Err(PropertyError::UnknownKey {
                        path: path.to_string(),
                        key: key.clone(),
                    });
                }
                let mut children = IndexMap::with_capacity(form.len());
                for (key, child) in form {
                    let child_path = join_path(path, key);
                    let child_value = match object.get(key) {
                        Some(value) => Self::build_json(child, value, &child_path)?,
                        None => Self::build_default(child, &child_path)?,
                    };
                    children.insert(key.clone(), child_value);
                }
                PropertyValue::Dictionary(children)
            }
            DescriptorKind::List { form } => {
                ensure_flat_list(form, path)?;
                let array = json.as_array().ok_or_else(mismatch)?;
                let items = array
                    .iter()
                    .map(|item| Self::build_json(form, item, path))
                    .collect::<Result<Vec<_>, _>>()?;
                PropertyValue::List(items)
            }
        };
        Ok(Self::new(Rc::clone(descriptor), value))
    }

    fn build_null(descriptor: &Rc<PropertyDescriptor>, path: &str) -> Result<Self, PropertyError> {
        let value = match descriptor.kind() {
            DescriptorKind::Int { .. } => PropertyValue::Int(None),
            DescriptorKind::Float { .. } => PropertyValue::Float(None),
            DescriptorKind::String { .. } => PropertyValue::String(String::new()),
            DescriptorKind::Date { .. } => PropertyValue::Date(None),
            DescriptorKind::Enum { .. } => PropertyValue::Enum(None),
            DescriptorKind::Dictionary { .. } | DescriptorKind::List { .. } => {
                return Self::build_default(descriptor, path);
            }
        };
        Ok(Self::new(Rc::clone(descriptor), value))
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            PropertyValue::Int(Some(v)) => write!(f, "{v}"),
            PropertyValue::Float(Some(v)) => write!(f, "{v}"),
            PropertyValue::String(v) if !v.is_empty() => f.write_str(v),
            PropertyValue::Date(Some(v)) => {
                f.write_str(&v.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            PropertyValue::Enum(Some(v)) => f.write_str(v),
            PropertyValue::Dictionary(children) => {
                f.write_str("{")?;
                let mut first = true;
                for (key, child) in children.iter().filter(|(_, c)| c.is_defined()) {
                    if !first {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {child}")?;
                    first = false;
                }
                f.write_str("}")
            }
            PropertyValue::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            PropertyValue::Int(None)
            | PropertyValue::Float(None)
            | PropertyValue::String(_)
            | PropertyValue::Date(None)
            | PropertyValue::Enum(None) => f.write_str("null"),
        }
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn ensure_flat_list(form: &PropertyDescriptor, path: &str) -> Result<(), PropertyError> {
    if form.property_type() == PropertyType::List {
        return Err(PropertyError::NestedList {
            path: path.to_string(),
        });
    }
    Ok(())
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;
    use serde_json::{Value, json};

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn text_strategy() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), "[a-zA-Z0-9 _-]{1,16}"]
    }

    fn optional_texts() -> impl Strategy<Value = Vec<Option<String>>> {
        proptest::collection::vec(proptest::option::of(text_strategy()), 0..6)
    }

    fn rendered(text: &str) -> &str {
        if text.is_empty() { "null" } else { text }
    }

    // ===================
    // Property Test Functions
    // ===================

    /// A string is defined exactly when it is non-empty, and renders as `null` otherwise.
    fn check_string_definedness(text: &str) -> Result<(), TestCaseError> {
        let prop = Property::from_json(&PropertyDescriptor::string(), &json!(text))
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        prop_assert_eq!(prop.is_defined(), !text.is_empty());
        prop_assert_eq!(prop.to_string(), rendered(text));
        Ok(())
    }

    /// A dictionary renders only its defined children, in form order.
    fn check_dictionary_display(values: &[Option<String>]) -> Result<(), TestCaseError> {
        let keys: Vec<String> = (0..values.len()).map(|idx| format!("k{idx}")).collect();
        let form = PropertyDescriptor::dictionary(
            keys.iter().map(|key| (key.clone(), PropertyDescriptor::string())),
        );
        let json: serde_json::Map<String, Value> = keys
            .iter()
            .zip(values)
            .map(|(key, value)| (key.clone(), value.as_deref().map_or(Value::Null, Value::from)))
            .collect();
        let prop = Property::from_json(&form, &Value::Object(json))
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        let pairs: Vec<String> = keys
            .iter()
            .zip(values)
            .filter_map(|(key, value)| match value.as_deref() {
                Some(text) if !text.is_empty() => Some(format!("{key}: {text}")),
                _ => None,
            })
            .collect();
        prop_assert_eq!(prop.to_string(), format!("{{{}}}", pairs.join(", ")));
        prop_assert_eq!(prop.is_defined(), !pairs.is_empty());
        Ok(())
    }

    /// List items keep their input order.
    fn check_list_order(texts: &[String]) -> Result<(), TestCaseError> {
        let form = PropertyDescriptor::list(PropertyDescriptor::string());
        let prop = Property::from_json(&form, &json!(texts))
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        let items: Vec<String> = prop.items().iter().map(ToString::to_string).collect();
        let expected: Vec<&str> = texts.iter().map(|text| rendered(text)).collect();
        prop_assert_eq!(&items, &expected);
        prop_assert_eq!(prop.to_string(), format!("[{}]", expected.join(", ")));
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn string_definedness(text in text_strategy()) {
            check_string_definedness(&text)?;
        }

        #[test]
        fn dictionary_display_skips_undefined(values in optional_texts()) {
            check_dictionary_display(&values)?;
        }

        #[test]
        fn list_order_is_preserved(texts in proptest::collection::vec(text_strategy(), 0..8)) {
            check_list_order(&texts)?;
        }
    }
}
