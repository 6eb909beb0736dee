//! The self-describing [`Variable`] value tree.
//!
//! Level globals, entity properties and save-file stats are all stored as
//! variables: a closed set of scalar types plus string-keyed structs and
//! homogeneous arrays, nested to any depth.

use std::fmt;

use indexmap::IndexMap;

/// String-keyed variable map. Insertion order is kept so that writers are
/// deterministic; equality ignores order.
pub type VariableMap = IndexMap<String, Variable>;

/// The 4-bit type tag preceding each variable on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VariableType {
    /// Sentinel that terminates a struct. Never a value.
    Null = 0,
    /// One bit.
    Bool = 1,
    /// Signed 32-bit integer.
    Int = 2,
    /// Unsigned 32-bit integer.
    UInt = 3,
    /// Fixed-point number with 32 integer and 32 fractional bits.
    Float = 4,
    /// Raw byte string.
    String = 5,
    /// Pair of floats.
    Vec2 = 10,
    /// Nested variable map.
    Struct = 14,
    /// Homogeneous sequence.
    Array = 15,
}

impl VariableType {
    /// Decode a wire tag, returning `None` for unassigned values.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::Null,
            1 => Self::Bool,
            2 => Self::Int,
            3 => Self::UInt,
            4 => Self::Float,
            5 => Self::String,
            10 => Self::Vec2,
            14 => Self::Struct,
            15 => Self::Array,
            _ => return None,
        })
    }

    /// The wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Lowercase name, also used as the JSON schema string for scalars.
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::String => "string",
            Self::Vec2 => "vec2",
            Self::Struct => "struct",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed value.
///
/// Strings are byte sequences; the game does not guarantee any text
/// encoding, so no UTF-8 validation is performed.
///
/// # Examples
///
/// ```
/// use dustkit_core::{Variable, VariableArray, VariableMap, VariableType};
///
/// let mut map = VariableMap::new();
/// map.insert("level_name".into(), Variable::string("Downhill"));
/// map.insert(
///     "ent_list".into(),
///     Variable::Array(VariableArray::from_values(
///         VariableType::UInt,
///         vec![Variable::UInt(101), Variable::UInt(102)],
///     )),
/// );
/// let root = Variable::Struct(map);
/// assert_eq!(root.variable_type(), VariableType::Struct);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Variable {
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i32),
    /// Unsigned integer.
    UInt(u32),
    /// Fixed-point number, held as a double.
    Float(f64),
    /// Byte string.
    String(Vec<u8>),
    /// Two-component vector.
    Vec2(f64, f64),
    /// Nested map.
    Struct(VariableMap),
    /// Homogeneous array.
    Array(VariableArray),
}

impl Variable {
    /// Build a string variable from anything byte-like.
    pub fn string(value: impl Into<Vec<u8>>) -> Self {
        Self::String(value.into())
    }

    /// The type tag of this value.
    pub fn variable_type(&self) -> VariableType {
        match self {
            Self::Bool(_) => VariableType::Bool,
            Self::Int(_) => VariableType::Int,
            Self::UInt(_) => VariableType::UInt,
            Self::Float(_) => VariableType::Float,
            Self::String(_) => VariableType::String,
            Self::Vec2(..) => VariableType::Vec2,
            Self::Struct(_) => VariableType::Struct,
            Self::Array(_) => VariableType::Array,
        }
    }

    /// The struct map, if this is a struct.
    pub fn as_struct(&self) -> Option<&VariableMap> {
        match self {
            Self::Struct(map) => Some(map),
            _ => None,
        }
    }

    /// The array, if this is an array.
    pub fn as_array(&self) -> Option<&VariableArray> {
        match self {
            Self::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Mutable array access, if this is an array.
    pub fn as_array_mut(&mut self) -> Option<&mut VariableArray> {
        match self {
            Self::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

/// A sequence of variables sharing one element type.
///
/// The element type is fixed at construction and every mutation checks it,
/// so an array can never become heterogeneous.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableArray {
    element_type: VariableType,
    values: Vec<Variable>,
}

impl VariableArray {
    /// Create an empty array of `element_type`.
    ///
    /// # Panics
    ///
    /// Panics if `element_type` is [`VariableType::Null`].
    pub fn new(element_type: VariableType) -> Self {
        assert!(
            element_type != VariableType::Null,
            "arrays cannot hold null elements"
        );
        Self {
            element_type,
            values: Vec::new(),
        }
    }

    /// Create an array from existing values.
    ///
    /// # Panics
    ///
    /// Panics if any value is not of `element_type`.
    pub fn from_values(element_type: VariableType, values: Vec<Variable>) -> Self {
        let mut arr = Self::new(element_type);
        for value in &values {
            arr.check(value);
        }
        arr.values = values;
        arr
    }

    fn check(&self, value: &Variable) {
        assert_eq!(
            value.variable_type(),
            self.element_type,
            "heterogeneous array: cannot store {} in array of {}",
            value.variable_type(),
            self.element_type
        );
    }

    /// The shared element type.
    pub fn element_type(&self) -> VariableType {
        self.element_type
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&Variable> {
        self.values.get(index)
    }

    /// All elements.
    pub fn values(&self) -> &[Variable] {
        &self.values
    }

    /// Iterate over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.values.iter()
    }

    /// Append an element.
    ///
    /// # Panics
    ///
    /// Panics if `value` does not match the element type.
    pub fn push(&mut self, value: Variable) {
        self.check(&value);
        self.values.push(value);
    }

    /// Replace the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or `value` has the wrong type.
    pub fn set(&mut self, index: usize, value: Variable) {
        self.check(&value);
        self.values[index] = value;
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<Variable> {
        self.values.pop()
    }

    /// Consume the array, returning its elements.
    pub fn into_values(self) -> Vec<Variable> {
        self.values
    }
}

impl<'a> IntoIterator for &'a VariableArray {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
