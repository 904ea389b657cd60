//! Property descriptors: the schema fragment attached to every property.
//!
//! A [`PropertyDescriptor`] states whether a property is required and what
//! kind of value it holds, including per-kind constraints (numeric bounds,
//! enum options) and, for containers, the descriptors of their children.
//!
//! Descriptors deserialize from JSON with a `type` tag:
//!
//! ```json
//! {
//!   "type": "dictionary",
//!   "form": {
//!     "name": { "type": "string", "is_required": true },
//!     "confidence": { "type": "enum", "options": ["low", "high"] },
//!     "authors": { "type": "list", "form": { "type": "string" } }
//!   }
//! }
//! ```
//!
//! Child descriptors are reference counted, so properties built from a
//! descriptor share its forms instead of copying them.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::PropertyType;

/// Schema fragment describing one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Whether the property must hold a defined value.
    #[serde(default)]
    is_required: bool,

    /// The declared kind and its constraints.
    #[serde(flatten)]
    kind: DescriptorKind,
}

/// Declared kind of a property, with kind-specific constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DescriptorKind {
    Int {
        min: Option<i64>,
        max: Option<i64>,
        default: Option<i64>,
    },
    Float {
        min: Option<f64>,
        max: Option<f64>,
        default: Option<f64>,
    },
    String {
        default: Option<String>,
    },
    Date {
        default: Option<DateTime<Utc>>,
    },
    Enum {
        options: Vec<String>,
        default: Option<String>,
    },
    Dictionary {
        form: IndexMap<String, Rc<PropertyDescriptor>>,
    },
    List {
        form: Rc<PropertyDescriptor>,
    },
}

impl PropertyDescriptor {
    /// Creates an optional descriptor of the given kind.
    pub fn new(kind: DescriptorKind) -> Self {
        Self {
            is_required: false,
            kind,
        }
    }

    /// Optional string descriptor with no default.
    pub fn string() -> Self {
        Self::new(DescriptorKind::String { default: None })
    }

    /// Optional integer descriptor without bounds.
    pub fn int() -> Self {
        Self::new(DescriptorKind::Int {
            min: None,
            max: None,
            default: None,
        })
    }

    /// Optional float descriptor without bounds.
    pub fn float() -> Self {
        Self::new(DescriptorKind::Float {
            min: None,
            max: None,
            default: None,
        })
    }

    /// Optional date descriptor.
    pub fn date() -> Self {
        Self::new(DescriptorKind::Date { default: None })
    }

    /// Optional enum descriptor accepting the given options.
    pub fn enumeration<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(DescriptorKind::Enum {
            options: options.into_iter().map(Into::into).collect(),
            default: None,
        })
    }

    /// Dictionary descriptor with the given ordered form.
    pub fn dictionary<I, K>(form: I) -> Self
    where
        I: IntoIterator<Item = (K, PropertyDescriptor)>,
        K: Into<String>,
    {
        Self::new(DescriptorKind::Dictionary {
            form: form.into_iter().map(|(k, v)| (k.into(), Rc::new(v))).collect(),
        })
    }

    /// Dictionary descriptor over already shared child forms.
    pub fn shared_dictionary(form: IndexMap<String, Rc<PropertyDescriptor>>) -> Self {
        Self::new(DescriptorKind::Dictionary { form })
    }

    /// List descriptor whose items follow `form`.
    pub fn list(form: PropertyDescriptor) -> Self {
        Self::new(DescriptorKind::List {
            form: Rc::new(form),
        })
    }

    /// Marks the descriptor as required.
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Sets the default value for string and enum descriptors. Other kinds are left unchanged.
    pub fn with_default_string(mut self, value: impl Into<String>) -> Self {
        match &mut self.kind {
            DescriptorKind::String { default } => *default = Some(value.into()),
            DescriptorKind::Enum { default, .. } => *default = Some(value.into()),
            _ => {}
        }
        self
    }

    /// Sets inclusive bounds on float descriptors. Other kinds are left unchanged.
    pub fn with_float_bounds(mut self, lower: f64, upper: f64) -> Self {
        if let DescriptorKind::Float { min, max, .. } = &mut self.kind {
            *min = Some(lower);
            *max = Some(upper);
        }
        self
    }

    /// Returns `true` if the property must hold a defined value.
    pub fn is_required(&self) -> bool {
        self.is_required
    }

    /// Returns the declared kind.
    pub fn kind(&self) -> &DescriptorKind {
        &self.kind
    }

    /// Returns the [`PropertyType`] this descriptor declares.
    pub fn property_type(&self) -> PropertyType {
        match self.kind {
            DescriptorKind::Int { .. } => PropertyType::Int,
            DescriptorKind::Float { .. } => PropertyType::Float,
            DescriptorKind::String { .. } => PropertyType::String,
            DescriptorKind::Date { .. } => PropertyType::Date,
            DescriptorKind::Enum { .. } => PropertyType::Enum,
            DescriptorKind::Dictionary { .. } => PropertyType::Dictionary,
            DescriptorKind::List { .. } => PropertyType::List,
        }
    }
}
