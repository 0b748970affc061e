//! Animatable value shapes
//!
//! A channel animates either a single scalar or a fixed set of named
//! scalar fields. The shape is captured once when the channel is built and
//! every later value is checked against it; field order inside a value is
//! irrelevant, the channel's own field order is what drives output.

use crate::error::{AnimationError, Result};
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::fmt;

/// Per-field storage, inline for the common 1-4 field case
pub type FieldValues = SmallVec<[f32; 4]>;

/// A scalar or a mapping of named scalar fields
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelValue {
    Scalar(f32),
    Vector(IndexMap<String, f32>),
}

impl ChannelValue {
    pub fn scalar(value: f32) -> Self {
        ChannelValue::Scalar(value)
    }

    /// Build a vector value from `(field, value)` pairs
    pub fn vector<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, f32)>,
        K: Into<String>,
    {
        ChannelValue::Vector(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Convenience for the common `{x, y}` shape
    pub fn xy(x: f32, y: f32) -> Self {
        Self::vector([("x", x), ("y", y)])
    }

    /// Read one field (a scalar answers to any field name)
    pub fn get(&self, field: &str) -> Option<f32> {
        match self {
            ChannelValue::Scalar(v) => Some(*v),
            ChannelValue::Vector(fields) => fields.get(field).copied(),
        }
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            ChannelValue::Scalar(v) => Some(*v),
            ChannelValue::Vector(_) => None,
        }
    }

    /// The shape of this value, in this value's own field order
    pub fn shape(&self) -> ChannelShape {
        match self {
            ChannelValue::Scalar(_) => ChannelShape::Scalar,
            ChannelValue::Vector(fields) => ChannelShape::Vector(fields.keys().cloned().collect()),
        }
    }
}

impl From<f32> for ChannelValue {
    fn from(value: f32) -> Self {
        ChannelValue::Scalar(value)
    }
}

/// The declared shape of a channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelShape {
    Scalar,
    /// Field names in declaration order
    Vector(Vec<String>),
}

impl ChannelShape {
    /// Number of scalar fields
    pub fn len(&self) -> usize {
        match self {
            ChannelShape::Scalar => 1,
            ChannelShape::Vector(fields) => fields.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field names in declaration order (empty for scalars)
    pub fn fields(&self) -> &[String] {
        match self {
            ChannelShape::Scalar => &[],
            ChannelShape::Vector(fields) => fields,
        }
    }

    /// Position of a field in declaration order
    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.fields().iter().position(|f| f == field)
    }

    /// Same kind and same field set, ignoring order
    pub fn accepts(&self, value: &ChannelValue) -> bool {
        match (self, value) {
            (ChannelShape::Scalar, ChannelValue::Scalar(_)) => true,
            (ChannelShape::Vector(fields), ChannelValue::Vector(values)) => {
                fields.len() == values.len() && fields.iter().all(|f| values.contains_key(f))
            }
            _ => false,
        }
    }

    /// Reorder a value into this shape's field order
    pub fn align(&self, channel: &str, value: &ChannelValue) -> Result<FieldValues> {
        match (self, value) {
            (ChannelShape::Scalar, ChannelValue::Scalar(v)) => Ok(smallvec::smallvec![*v]),
            (ChannelShape::Vector(fields), ChannelValue::Vector(values)) if self.accepts(value) => {
                Ok(fields.iter().map(|f| values[f.as_str()]).collect())
            }
            _ => Err(AnimationError::ShapeMismatch {
                channel: channel.to_string(),
                expected: self.to_string(),
                found: value.shape().to_string(),
            }),
        }
    }

    /// Rebuild a value from per-field scalars in declaration order
    pub fn compose(&self, values: impl IntoIterator<Item = f32>) -> ChannelValue {
        match self {
            ChannelShape::Scalar => {
                ChannelValue::Scalar(values.into_iter().next().unwrap_or_default())
            }
            ChannelShape::Vector(fields) => ChannelValue::Vector(
                fields.iter().cloned().zip(values).collect::<IndexMap<_, _>>(),
            ),
        }
    }
}

impl fmt::Display for ChannelShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelShape::Scalar => write!(f, "scalar"),
            ChannelShape::Vector(fields) => write!(f, "{{{}}}", fields.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_ignores_value_order() {
        let shape = ChannelValue::vector([("x", 0.0), ("y", 0.0), ("o", 0.0)]).shape();
        let value = ChannelValue::vector([("o", 3.0), ("x", 1.0), ("y", 2.0)]);

        let aligned = shape.align("glare", &value).unwrap();
        assert_eq!(aligned.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mismatched_fields_rejected() {
        let shape = ChannelValue::xy(0.0, 0.0).shape();

        let extra = ChannelValue::vector([("x", 1.0), ("y", 2.0), ("z", 3.0)]);
        let renamed = ChannelValue::vector([("x", 1.0), ("w", 2.0)]);
        assert!(shape.align("rotate", &extra).is_err());
        assert!(shape.align("rotate", &renamed).is_err());
        assert!(shape.align("rotate", &ChannelValue::scalar(1.0)).is_err());
    }

    #[test]
    fn test_scalar_shape() {
        let shape = ChannelShape::Scalar;
        assert!(shape.accepts(&ChannelValue::scalar(1.0)));
        assert!(!shape.accepts(&ChannelValue::xy(0.0, 0.0)));
        assert_eq!(shape.compose([4.0]), ChannelValue::Scalar(4.0));
    }

    #[test]
    fn test_compose_uses_declaration_order() {
        let shape = ChannelShape::Vector(vec!["y".into(), "x".into()]);
        let value = shape.compose([2.0, 1.0]);
        assert_eq!(value.get("x"), Some(1.0));
        assert_eq!(value.get("y"), Some(2.0));
    }

    #[test]
    fn test_mismatch_error_names_shapes() {
        let shape = ChannelValue::xy(0.0, 0.0).shape();
        let err = shape.align("rotate", &ChannelValue::scalar(1.0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Shape mismatch on channel 'rotate': expected {x, y}, got scalar"
        );
    }
}
