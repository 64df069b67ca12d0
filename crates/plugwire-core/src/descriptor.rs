//! Parameter descriptor table.
//!
//! The descriptor table is produced by an external generator from the native
//! plugin source and loaded read-only at startup. It provides everything the
//! UI side needs to know about a parameter: its range and shape curve (for
//! the normalization engine), its default (to seed the parameter store), and
//! presentation metadata.
//!
//! # Format
//!
//! ```text
//! {"parameters": [
//!   {"id": 0, "name": "Cutoff", "type": "float", "min": 20, "max": 20000,
//!    "default": 1000, "unit": "Hz", "shape": "exp", "automatable": true},
//!   {"id": 1, "name": "Mode", "type": "enum", "min": 0, "max": 2, "default": 0,
//!    "enumValues": ["LP", "BP", "HP"], "automatable": true}
//! ]}
//! ```
//!
//! A bare top-level array of descriptors is accepted as well.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;
use crate::parameter_range::{snap_to_step, to_normalized_step, ParameterShape, RangeMapper, ShapedRange};
use crate::types::{NormalizedValue, ParameterId};

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Bool,
    Int,
    Enum,
    Float,
}

impl ParameterKind {
    /// Whether values of this kind move in whole steps.
    pub const fn is_discrete(&self) -> bool {
        !matches!(self, Self::Float)
    }
}

/// Shape curve name as written in the descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShapeKind {
    #[default]
    #[serde(rename = "linear")]
    Linear,
    #[serde(rename = "powCurve")]
    PowCurve,
    #[serde(rename = "exp")]
    Exp,
}

/// Metadata describing a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    /// Parameter index on the wire.
    pub id: ParameterId,
    /// Display name (e.g., "Cutoff").
    pub name: String,
    /// Value type.
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    /// Plain minimum.
    pub min: f64,
    /// Plain maximum.
    pub max: f64,
    /// Plain default.
    pub default: f64,
    /// Plain step size. Discrete kinds default to 1.
    #[serde(default)]
    pub step: Option<f64>,
    /// Unit label (e.g., "dB", "Hz").
    #[serde(default)]
    pub unit: String,
    /// Shape curve.
    #[serde(default)]
    pub shape: ShapeKind,
    /// Shape argument (the power-curve exponent).
    #[serde(default)]
    pub shape_parameter: Option<f64>,
    /// Labels for enum parameters.
    #[serde(default)]
    pub enum_values: Option<Vec<String>>,
    /// Parameter can be automated by the host.
    #[serde(default = "default_automatable")]
    pub automatable: bool,
    /// Optional group name.
    #[serde(default)]
    pub group: Option<String>,
}

fn default_automatable() -> bool {
    true
}

impl ParameterDescriptor {
    /// Create a linear float parameter.
    pub fn new(id: ParameterId, name: impl Into<String>, min: f64, max: f64, default: f64) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ParameterKind::Float,
            min,
            max,
            default,
            step: None,
            unit: String::new(),
            shape: ShapeKind::Linear,
            shape_parameter: None,
            enum_values: None,
            automatable: true,
            group: None,
        }
    }

    /// Create an enum parameter from its labels.
    pub fn enumeration(id: ParameterId, name: impl Into<String>, values: &[&str], default: usize) -> Self {
        let max = values.len().saturating_sub(1) as f64;
        Self {
            kind: ParameterKind::Enum,
            enum_values: Some(values.iter().map(|v| v.to_string()).collect()),
            ..Self::new(id, name, 0.0, max, default as f64)
        }
    }

    /// Create an on/off toggle.
    pub fn toggle(id: ParameterId, name: impl Into<String>, default: bool) -> Self {
        Self {
            kind: ParameterKind::Bool,
            ..Self::new(id, name, 0.0, 1.0, if default { 1.0 } else { 0.0 })
        }
    }

    /// Set the unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set the shape curve and its argument.
    pub fn with_shape(mut self, shape: ShapeKind, shape_parameter: Option<f64>) -> Self {
        self.shape = shape;
        self.shape_parameter = shape_parameter;
        self
    }

    /// Set the plain step size.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Resolved shape curve for the normalization engine.
    pub fn shape(&self) -> ParameterShape {
        match self.shape {
            ShapeKind::Linear => ParameterShape::Linear,
            ShapeKind::PowCurve => ParameterShape::PowCurve {
                exponent: self.shape_parameter.unwrap_or(1.0),
            },
            ShapeKind::Exp => ParameterShape::Exp,
        }
    }

    /// Plain range and shape as a [`RangeMapper`].
    pub fn range(&self) -> ShapedRange {
        ShapedRange::new(self.min, self.max, self.shape())
    }

    /// Plain value to normalized.
    pub fn to_normalized(&self, plain: f64) -> NormalizedValue {
        self.range().normalize(plain)
    }

    /// Normalized value to plain.
    pub fn from_normalized(&self, normalized: NormalizedValue) -> f64 {
        self.range().denormalize(normalized)
    }

    /// Default value in normalized form.
    pub fn default_normalized(&self) -> NormalizedValue {
        self.to_normalized(self.default)
    }

    /// Step size as a fraction of the range. 0.0 means continuous.
    pub fn normalized_step(&self) -> f64 {
        let step = match (self.step, self.kind.is_discrete()) {
            (Some(step), _) => step,
            (None, true) => 1.0,
            (None, false) => return 0.0,
        };
        to_normalized_step(step, self.min, self.max)
    }

    /// Snap a normalized value onto this parameter's step grid.
    pub fn snap(&self, normalized: NormalizedValue) -> NormalizedValue {
        snap_to_step(normalized, self.normalized_step())
    }

    /// Display string for a normalized value.
    pub fn display_value(&self, normalized: NormalizedValue) -> String {
        let plain = self.from_normalized(normalized);
        let text = match self.kind {
            ParameterKind::Bool => {
                return if normalized >= 0.5 { "on" } else { "off" }.to_string();
            }
            ParameterKind::Enum => {
                let index = (plain.round().max(0.0)) as usize;
                if let Some(label) = self.enum_values.as_ref().and_then(|v| v.get(index)) {
                    return label.clone();
                }
                format!("{}", index)
            }
            ParameterKind::Int => format!("{}", plain.round() as i64),
            ParameterKind::Float => format!("{:.2}", plain),
        };
        if self.unit.is_empty() {
            text
        } else {
            format!("{} {}", text, self.unit)
        }
    }

    /// Check the descriptor invariants.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.min > self.max {
            return Err(DescriptorError::InvertedRange {
                id: self.id,
                name: self.name.clone(),
                min: self.min,
                max: self.max,
            });
        }
        if self.default < self.min || self.default > self.max {
            return Err(DescriptorError::DefaultOutOfRange {
                id: self.id,
                name: self.name.clone(),
                min: self.min,
                max: self.max,
                default: self.default,
            });
        }
        if self.kind == ParameterKind::Enum {
            let count = self.enum_values.as_ref().map_or(0, Vec::len);
            if count == 0 || self.max != (count - 1) as f64 {
                return Err(DescriptorError::EnumMismatch {
                    id: self.id,
                    name: self.name.clone(),
                    max: self.max,
                    count,
                });
            }
        }
        if self.shape == ShapeKind::PowCurve {
            let exponent = self.shape_parameter.unwrap_or(1.0);
            if !(exponent.is_finite() && exponent > 0.0) {
                return Err(DescriptorError::InvalidExponent {
                    id: self.id,
                    name: self.name.clone(),
                    exponent,
                });
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTable {
    Table { parameters: Vec<ParameterDescriptor> },
    List(Vec<ParameterDescriptor>),
}

/// Read-only collection of parameter descriptors.
#[derive(Debug, Clone, Default)]
pub struct DescriptorTable {
    parameters: Vec<ParameterDescriptor>,
    by_id: HashMap<ParameterId, usize>,
}

impl DescriptorTable {
    /// Build a table, validating every descriptor.
    pub fn new(parameters: Vec<ParameterDescriptor>) -> Result<Self, DescriptorError> {
        let mut by_id = HashMap::with_capacity(parameters.len());
        for (index, descriptor) in parameters.iter().enumerate() {
            descriptor.validate()?;
            if by_id.insert(descriptor.id, index).is_some() {
                return Err(DescriptorError::DuplicateId(descriptor.id));
            }
        }
        Ok(Self { parameters, by_id })
    }

    /// Parse and validate a generated descriptor table.
    pub fn from_json(json: &str) -> Result<Self, DescriptorError> {
        let parameters = match serde_json::from_str::<RawTable>(json)? {
            RawTable::Table { parameters } | RawTable::List(parameters) => parameters,
        };
        Self::new(parameters)
    }

    /// Look up a descriptor by parameter index.
    pub fn get(&self, id: ParameterId) -> Option<&ParameterDescriptor> {
        self.by_id.get(&id).map(|&index| &self.parameters[index])
    }

    /// Whether the table describes this parameter index.
    pub fn contains(&self, id: ParameterId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Descriptors in table order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Normalized defaults for seeding the parameter store.
    pub fn seed_values(&self) -> HashMap<ParameterId, NormalizedValue> {
        self.parameters
            .iter()
            .map(|d| (d.id, d.default_normalized()))
            .collect()
    }
}
