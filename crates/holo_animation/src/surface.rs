//! Render surface output
//!
//! Channels write their values as named style properties on a surface.
//! The host decides what a property means; [`SurfaceStyle`] is an
//! in-memory surface that simply records what was written.

use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Unit attached to a numeric style property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Unitless number
    None,
    /// Degrees
    Deg,
    /// Percent
    Percent,
    /// Pixels
    Px,
}

impl Unit {
    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::Deg => "deg",
            Unit::Percent => "%",
            Unit::Px => "px",
        }
    }
}

/// A value written to a style property
#[derive(Clone, Debug, PartialEq)]
pub enum StyleValue {
    Number { value: f32, unit: Unit },
    Text(String),
}

impl StyleValue {
    pub fn number(value: f32, unit: Unit) -> Self {
        StyleValue::Number { value, unit }
    }

    pub fn as_number(&self) -> Option<f32> {
        match self {
            StyleValue::Number { value, .. } => Some(*value),
            StyleValue::Text(_) => None,
        }
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Number { value, unit } => write!(f, "{}{}", value, unit.suffix()),
            StyleValue::Text(text) => f.write_str(text),
        }
    }
}

/// Where channel output lands
pub trait StyleSink {
    /// Whether the surface currently exists (mounted and attached)
    fn is_attached(&self) -> bool;

    /// Write one style property
    fn set_property(&self, name: &str, value: StyleValue);

    /// Read back a previously written property
    fn property(&self, name: &str) -> Option<StyleValue>;
}

#[derive(Debug, Default)]
struct SurfaceStyleInner {
    attached: bool,
    properties: IndexMap<String, StyleValue>,
    writes: u64,
}

/// An in-memory style surface
///
/// Cloning yields another handle to the same surface.
#[derive(Clone, Debug)]
pub struct SurfaceStyle {
    inner: Rc<RefCell<SurfaceStyleInner>>,
}

impl SurfaceStyle {
    /// A new, attached surface
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SurfaceStyleInner {
                attached: true,
                ..Default::default()
            })),
        }
    }

    /// A surface that has not been attached yet
    pub fn detached() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SurfaceStyleInner::default())),
        }
    }

    pub fn attach(&self) {
        self.inner.borrow_mut().attached = true;
    }

    pub fn detach(&self) {
        self.inner.borrow_mut().attached = false;
    }

    /// Numeric value of a property, if it holds a number
    pub fn number(&self, name: &str) -> Option<f32> {
        self.property(name).and_then(|v| v.as_number())
    }

    /// All properties in first-write order
    pub fn properties(&self) -> Vec<(String, StyleValue)> {
        self.inner
            .borrow()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Total number of property writes
    pub fn write_count(&self) -> u64 {
        self.inner.borrow().writes
    }
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleSink for SurfaceStyle {
    fn is_attached(&self) -> bool {
        self.inner.borrow().attached
    }

    fn set_property(&self, name: &str, value: StyleValue) {
        let mut inner = self.inner.borrow_mut();
        inner.writes += 1;
        inner.properties.insert(name.to_string(), value);
    }

    fn property(&self, name: &str) -> Option<StyleValue> {
        self.inner.borrow().properties.get(name).cloned()
    }
}
