//! Typed views over variable maps.
//!
//! Entities and levels keep all of their persisted properties in a
//! [`VariableMap`]. The helpers here read and write individual keys with a
//! Rust type and a default, without ever storing a second copy of the
//! value: the map stays the single source of truth.

use std::marker::PhantomData;

use crate::error::CoreError;
use crate::variable::{Variable, VariableArray, VariableMap, VariableType};

/// A Rust type that maps onto exactly one [`VariableType`].
pub trait VariableValue: Sized {
    /// The variable type this Rust type converts to.
    const TYPE: VariableType;

    /// Extract a value, returning `None` on a type mismatch.
    fn from_variable(var: &Variable) -> Option<Self>;

    /// Wrap the value as a variable.
    fn into_variable(self) -> Variable;
}

macro_rules! scalar_value {
    ($ty:ty, $variant:ident) => {
        impl VariableValue for $ty {
            const TYPE: VariableType = VariableType::$variant;

            fn from_variable(var: &Variable) -> Option<Self> {
                match var {
                    Variable::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }

            fn into_variable(self) -> Variable {
                Variable::$variant(self)
            }
        }
    };
}

scalar_value!(bool, Bool);
scalar_value!(i32, Int);
scalar_value!(u32, UInt);
scalar_value!(f64, Float);
scalar_value!(Vec<u8>, String);
scalar_value!(VariableMap, Struct);
scalar_value!(VariableArray, Array);

impl VariableValue for (f64, f64) {
    const TYPE: VariableType = VariableType::Vec2;

    fn from_variable(var: &Variable) -> Option<Self> {
        match var {
            Variable::Vec2(x, y) => Some((*x, *y)),
            _ => None,
        }
    }

    fn into_variable(self) -> Variable {
        Variable::Vec2(self.0, self.1)
    }
}

/// Read `key` as `T`, distinguishing absence (`Ok(None)`) from a stored
/// value of the wrong type (`Err`).
pub fn try_get_field<T: VariableValue>(
    bag: &VariableMap,
    key: &str,
) -> Result<Option<T>, CoreError> {
    match bag.get(key) {
        None => Ok(None),
        Some(var) => T::from_variable(var).map(Some).ok_or_else(|| CoreError::FieldType {
            key: key.to_string(),
            expected: T::TYPE,
            found: var.variable_type(),
        }),
    }
}

/// Read `key` as `T`, falling back to `default` when it is absent or holds
/// another type.
pub fn get_field<T: VariableValue>(bag: &VariableMap, key: &str, default: T) -> T {
    match try_get_field(bag, key) {
        Ok(Some(v)) => v,
        Ok(None) => default,
        Err(e) => {
            log::warn!("{e}; using default");
            default
        }
    }
}

/// Store `value` under `key`, replacing whatever was there.
pub fn set_field<T: VariableValue>(bag: &mut VariableMap, key: &str, value: T) {
    if let Some(slot) = bag.get_mut(key) {
        *slot = value.into_variable();
    } else {
        bag.insert(key.to_string(), value.into_variable());
    }
}

/// A named scalar property with a default.
///
/// # Examples
///
/// ```
/// use dustkit_core::{Field, VariableMap};
///
/// const SPEED: Field<f64> = Field::new("speed", 5.0);
///
/// let mut vars = VariableMap::new();
/// assert_eq!(SPEED.get(&vars), 5.0);
/// SPEED.set(&mut vars, 2.5);
/// assert_eq!(SPEED.get(&vars), 2.5);
/// ```
#[derive(Clone, Debug)]
pub struct Field<T> {
    key: &'static str,
    default: T,
}

impl<T> Field<T> {
    /// Declare a field stored under `key`.
    pub const fn new(key: &'static str, default: T) -> Self {
        Self { key, default }
    }

    /// The variable key.
    pub const fn key(&self) -> &'static str {
        self.key
    }
}

impl<T: VariableValue + Clone> Field<T> {
    /// Current value, or the default.
    pub fn get(&self, bag: &VariableMap) -> T {
        get_field(bag, self.key, self.default.clone())
    }

    /// Current value, with type mismatches reported.
    pub fn try_get(&self, bag: &VariableMap) -> Result<T, CoreError> {
        Ok(try_get_field(bag, self.key)?.unwrap_or_else(|| self.default.clone()))
    }

    /// Store a new value.
    pub fn set(&self, bag: &mut VariableMap, value: T) {
        set_field(bag, self.key, value);
    }

    /// Remove the stored value so reads return the default again.
    pub fn clear(&self, bag: &mut VariableMap) {
        bag.shift_remove(self.key);
    }
}

/// A named array property whose elements convert to `T`.
#[derive(Clone, Debug)]
pub struct ArrayField<T> {
    key: &'static str,
    _elem: PhantomData<fn() -> T>,
}

impl<T> ArrayField<T> {
    /// Declare an array field stored under `key`.
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _elem: PhantomData,
        }
    }

    /// The variable key.
    pub const fn key(&self) -> &'static str {
        self.key
    }
}

impl<T: VariableValue> ArrayField<T> {
    /// Elements of the array; empty when absent or of another type.
    pub fn get(&self, bag: &VariableMap) -> Vec<T> {
        match bag.get(self.key) {
            Some(Variable::Array(arr)) if arr.element_type() == T::TYPE => {
                arr.iter().filter_map(T::from_variable).collect()
            }
            Some(_) => {
                log::warn!(
                    "variable '{}' is not an array of {}; treating as empty",
                    self.key,
                    T::TYPE
                );
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Replace the array contents.
    pub fn set(&self, bag: &mut VariableMap, values: Vec<T>) {
        let values = values.into_iter().map(T::into_variable).collect();
        set_field(bag, self.key, VariableArray::from_values(T::TYPE, values));
    }

    /// Rewrite each element in place. Absent arrays stay absent.
    pub fn update<F>(&self, bag: &mut VariableMap, mut f: F)
    where
        F: FnMut(T) -> T,
    {
        if !bag.contains_key(self.key) {
            return;
        }
        let values = self.get(bag).into_iter().map(&mut f).collect();
        self.set(bag, values);
    }
}
