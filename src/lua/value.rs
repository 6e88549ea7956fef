//! Interpreter-independent values exchanged with a script.
//!
//! Every read from or write to the script's global namespace goes through
//! [`DynamicValue`]. Typed access is layered on top with [`FromDynamic`] and
//! [`IntoDynamic`], so callers never touch interpreter handles.

use std::collections::HashMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use thiserror::Error;

use super::vec3::Vec3;

/// A snapshot of a script value.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    /// Key/value pairs in interpreter iteration order.
    Table(Vec<(DynamicValue, DynamicValue)>),
    /// A script function. Only its presence is visible natively.
    Function,
    Vec3(Vec3),
    /// Any other interpreter value (threads, foreign userdata, ...).
    Opaque(&'static str),
}

impl DynamicValue {
    /// Script-facing name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            DynamicValue::Nil => "nil",
            DynamicValue::Boolean(_) => "boolean",
            DynamicValue::Integer(_) => "integer",
            DynamicValue::Number(_) => "number",
            DynamicValue::String(_) => "string",
            DynamicValue::Table(_) => "table",
            DynamicValue::Function => "function",
            DynamicValue::Vec3(_) => "vec3",
            DynamicValue::Opaque(kind) => *kind,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, DynamicValue::Nil)
    }

    /// Table entries ordered as a sequence, if the keys are exactly `1..=n`.
    fn as_sequence(&self) -> Option<Vec<&DynamicValue>> {
        let DynamicValue::Table(entries) = self else {
            return None;
        };

        let mut indexed = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match key {
                DynamicValue::Integer(i) if *i >= 1 => indexed.push((*i, value)),
                _ => return None,
            }
        }
        indexed.sort_by_key(|(i, _)| *i);

        let contiguous = indexed
            .iter()
            .enumerate()
            .all(|(pos, (i, _))| *i == pos as i64 + 1);
        contiguous.then(|| indexed.into_iter().map(|(_, v)| v).collect())
    }
}

impl Serialize for DynamicValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DynamicValue::Nil => serializer.serialize_unit(),
            DynamicValue::Boolean(b) => serializer.serialize_bool(*b),
            DynamicValue::Integer(i) => serializer.serialize_i64(*i),
            DynamicValue::Number(n) => serializer.serialize_f64(*n),
            DynamicValue::String(s) => serializer.serialize_str(s),
            DynamicValue::Table(entries) => {
                if let Some(items) = self.as_sequence() {
                    let mut seq = serializer.serialize_seq(Some(items.len()))?;
                    for item in items {
                        seq.serialize_element(item)?;
                    }
                    return seq.end();
                }
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(&key_to_string(key), value)?;
                }
                map.end()
            }
            DynamicValue::Vec3(v) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("x", &v.x)?;
                map.serialize_entry("y", &v.y)?;
                map.serialize_entry("z", &v.z)?;
                map.end()
            }
            DynamicValue::Function | DynamicValue::Opaque(_) => {
                serializer.serialize_str(&format!("<{}>", self.type_name()))
            }
        }
    }
}

fn key_to_string(key: &DynamicValue) -> String {
    match key {
        DynamicValue::String(s) => s.clone(),
        DynamicValue::Integer(i) => i.to_string(),
        DynamicValue::Number(n) => n.to_string(),
        DynamicValue::Boolean(b) => b.to_string(),
        other => format!("<{}>", other.type_name()),
    }
}

/// A value could not be converted to the requested native type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {found} to {expected}")]
pub struct ConversionError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl ConversionError {
    fn new(expected: &'static str, value: &DynamicValue) -> Self {
        Self {
            expected,
            found: value.type_name(),
        }
    }
}

/// Native types that can be read back from a script value.
pub trait FromDynamic: Sized {
    /// Whether conversion looks inside tables. Targets that never accept a
    /// table only need to see that the value is one.
    const NEEDS_TABLE_CONTENTS: bool = false;

    fn from_dynamic(value: DynamicValue) -> Result<Self, ConversionError>;
}

/// Native types that can be handed to a script.
pub trait IntoDynamic {
    fn into_dynamic(self) -> DynamicValue;
}

impl FromDynamic for DynamicValue {
    const NEEDS_TABLE_CONTENTS: bool = true;

    fn from_dynamic(value: DynamicValue) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl IntoDynamic for DynamicValue {
    fn into_dynamic(self) -> DynamicValue {
        self
    }
}

impl FromDynamic for bool {
    fn from_dynamic(value: DynamicValue) -> Result<Self, ConversionError> {
        match value {
            DynamicValue::Boolean(b) => Ok(b),
            other => Err(ConversionError::new("boolean", &other)),
        }
    }
}

impl IntoDynamic for bool {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::Boolean(self)
    }
}

impl FromDynamic for f64 {
    fn from_dynamic(value: DynamicValue) -> Result<Self, ConversionError> {
        match value {
            DynamicValue::Number(n) => Ok(n),
            DynamicValue::Integer(i) => Ok(i as f64),
            other => Err(ConversionError::new("f64", &other)),
        }
    }
}

impl FromDynamic for f32 {
    fn from_dynamic(value: DynamicValue) -> Result<Self, ConversionError> {
        match value {
            DynamicValue::Number(n) => Ok(n as f32),
            DynamicValue::Integer(i) => Ok(i as f32),
            other => Err(ConversionError::new("f32", &other)),
        }
    }
}

impl IntoDynamic for f64 {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::Number(self)
    }
}

impl IntoDynamic for f32 {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::Number(self as f64)
    }
}

macro_rules! impl_integer {
    ($($ty:ty),*) => {
        $(
            impl FromDynamic for $ty {
                fn from_dynamic(value: DynamicValue) -> Result<Self, ConversionError> {
                    let found = value.type_name();
                    let err = || ConversionError { expected: stringify!($ty), found };
                    match value {
                        DynamicValue::Integer(i) => <$ty>::try_from(i).map_err(|_| err()),
                        // Floats with an exact integral value convert, like math.tointeger.
                        // i64::MAX as f64 rounds up to 2^63, which does not fit.
                        DynamicValue::Number(n)
                            if n.fract() == 0.0
                                && n >= i64::MIN as f64
                                && n < i64::MAX as f64 =>
                        {
                            <$ty>::try_from(n as i64).map_err(|_| err())
                        }
                        _ => Err(err()),
                    }
                }
            }

            impl IntoDynamic for $ty {
                fn into_dynamic(self) -> DynamicValue {
                    match i64::try_from(self) {
                        Ok(i) => DynamicValue::Integer(i),
                        Err(_) => DynamicValue::Number(self as f64),
                    }
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl FromDynamic for String {
    fn from_dynamic(value: DynamicValue) -> Result<Self, ConversionError> {
        match value {
            DynamicValue::String(s) => Ok(s),
            other => Err(ConversionError::new("string", &other)),
        }
    }
}

impl IntoDynamic for String {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::String(self)
    }
}

impl IntoDynamic for &str {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::String(self.to_string())
    }
}

impl FromDynamic for Vec3 {
    fn from_dynamic(value: DynamicValue) -> Result<Self, ConversionError> {
        match value {
            DynamicValue::Vec3(v) => Ok(v),
            other => Err(ConversionError::new("vec3", &other)),
        }
    }
}

impl IntoDynamic for Vec3 {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::Vec3(self)
    }
}

impl<T: FromDynamic> FromDynamic for Option<T> {
    const NEEDS_TABLE_CONTENTS: bool = T::NEEDS_TABLE_CONTENTS;

    fn from_dynamic(value: DynamicValue) -> Result<Self, ConversionError> {
        match value {
            DynamicValue::Nil => Ok(None),
            other => T::from_dynamic(other).map(Some),
        }
    }
}

impl<T: IntoDynamic> IntoDynamic for Option<T> {
    fn into_dynamic(self) -> DynamicValue {
        self.map_or(DynamicValue::Nil, IntoDynamic::into_dynamic)
    }
}

impl<T: FromDynamic> FromDynamic for Vec<T> {
    const NEEDS_TABLE_CONTENTS: bool = true;

    fn from_dynamic(value: DynamicValue) -> Result<Self, ConversionError> {
        let Some(items) = value.as_sequence() else {
            return Err(ConversionError::new("sequence", &value));
        };
        items
            .into_iter()
            .map(|item| T::from_dynamic(item.clone()))
            .collect()
    }
}

impl<T: IntoDynamic> IntoDynamic for Vec<T> {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::Table(
            self.into_iter()
                .enumerate()
                .map(|(i, item)| (DynamicValue::Integer(i as i64 + 1), item.into_dynamic()))
                .collect(),
        )
    }
}

impl<T: FromDynamic> FromDynamic for HashMap<String, T> {
    const NEEDS_TABLE_CONTENTS: bool = true;

    fn from_dynamic(value: DynamicValue) -> Result<Self, ConversionError> {
        let entries = match value {
            DynamicValue::Table(entries) => entries,
            other => return Err(ConversionError::new("map", &other)),
        };
        entries
            .into_iter()
            .map(|(key, value)| Ok((String::from_dynamic(key)?, T::from_dynamic(value)?)))
            .collect()
    }
}

/// Argument lists for script function calls.
///
/// Implemented for `()`, tuples of [`IntoDynamic`] values and `Vec<DynamicValue>`.
pub trait IntoArgs {
    fn into_args(self) -> Vec<DynamicValue>;
}

impl IntoArgs for () {
    fn into_args(self) -> Vec<DynamicValue> {
        Vec::new()
    }
}

impl IntoArgs for Vec<DynamicValue> {
    fn into_args(self) -> Vec<DynamicValue> {
        self
    }
}

macro_rules! impl_into_args {
    ($($name:ident),+) => {
        impl<$($name: IntoDynamic),+> IntoArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<DynamicValue> {
                let ($($name,)+) = self;
                vec![$($name.into_dynamic()),+]
            }
        }
    };
}

impl_into_args!(A);
impl_into_args!(A, B);
impl_into_args!(A, B, C);
impl_into_args!(A, B, C, D);
impl_into_args!(A, B, C, D, E);
impl_into_args!(A, B, C, D, E, F);
