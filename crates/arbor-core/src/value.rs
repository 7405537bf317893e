use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Primitive tag recorded next to every blackboard cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueTag {
    Bool,
    Int,
    UInt,
    Float,
    Text,
    Object,
}

/// A typed blackboard cell.
///
/// Primitives are normalized to their widest representation so reads can convert between them.
/// Anything else is kept as an opaque shared object and only reads back as its own type.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(Arc<str>),
    Object(Arc<dyn Any + Send + Sync>),
}

fn cast<T: Any, U: Any>(value: U) -> Option<T> {
    (Box::new(value) as Box<dyn Any>)
        .downcast::<T>()
        .ok()
        .map(|b| *b)
}

macro_rules! from_primitive {
    ($any:ident; $($ty:ty => $variant:ident as $repr:ty),* $(,)?) => {
        $(
            if let Some(v) = $any.downcast_ref::<$ty>() {
                return Value::$variant(*v as $repr);
            }
        )*
    };
}

macro_rules! to_primitive {
    ($target:ident; $($ty:ty => $conv:expr),* $(,)?) => {
        $(
            if $target == TypeId::of::<$ty>() {
                let converted: Option<$ty> = $conv;
                return converted.and_then(cast);
            }
        )*
    };
}

impl Value {
    /// Wrap `value`, normalizing known primitive types.
    pub fn from_typed<T: Any + Send + Sync>(value: T) -> Self {
        let any: &dyn Any = &value;
        from_primitive!(any;
            bool => Bool as bool,
            i8 => Int as i64,
            i16 => Int as i64,
            i32 => Int as i64,
            i64 => Int as i64,
            isize => Int as i64,
            u8 => UInt as u64,
            u16 => UInt as u64,
            u32 => UInt as u64,
            u64 => UInt as u64,
            usize => UInt as u64,
            f32 => Float as f64,
            f64 => Float as f64,
        );
        if let Some(s) = any.downcast_ref::<String>() {
            return Value::Text(Arc::from(s.as_str()));
        }
        if let Some(s) = any.downcast_ref::<&'static str>() {
            return Value::Text(Arc::from(*s));
        }
        if let Some(s) = any.downcast_ref::<Arc<str>>() {
            return Value::Text(s.clone());
        }
        Value::Object(Arc::new(value))
    }

    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Bool(_) => ValueTag::Bool,
            Value::Int(_) => ValueTag::Int,
            Value::UInt(_) => ValueTag::UInt,
            Value::Float(_) => ValueTag::Float,
            Value::Text(_) => ValueTag::Text,
            Value::Object(_) => ValueTag::Object,
        }
    }

    /// Read the cell back as `T`.
    ///
    /// Objects only read back as their stored type. Primitives convert best-effort between
    /// each other (and from/to text); a conversion that would lose the value returns `None`.
    pub fn to_typed<T: Any + Clone>(&self) -> Option<T> {
        if let Value::Object(obj) = self {
            return obj.downcast_ref::<T>().cloned();
        }

        let target = TypeId::of::<T>();
        to_primitive!(target;
            bool => self.as_bool(),
            i64 => self.as_i64(),
            i32 => self.as_i64().and_then(|v| i32::try_from(v).ok()),
            i16 => self.as_i64().and_then(|v| i16::try_from(v).ok()),
            i8 => self.as_i64().and_then(|v| i8::try_from(v).ok()),
            isize => self.as_i64().and_then(|v| isize::try_from(v).ok()),
            u64 => self.as_u64(),
            u32 => self.as_u64().and_then(|v| u32::try_from(v).ok()),
            u16 => self.as_u64().and_then(|v| u16::try_from(v).ok()),
            u8 => self.as_u64().and_then(|v| u8::try_from(v).ok()),
            usize => self.as_u64().and_then(|v| usize::try_from(v).ok()),
            f64 => self.as_f64(),
            f32 => self.as_f64().map(|v| v as f32),
            String => self.as_text(),
            Arc<str> => self.as_text().map(Arc::from),
        );
        None
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::UInt(u) => Some(*u != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::Text(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    s.parse::<f64>().ok().map(|f| f != 0.0)
                }
            }
            Value::Object(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            Value::Float(f) => float_to_i64(*f),
            Value::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_to_i64))
            }
            Value::Object(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            other => other.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Object(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::UInt(u) => Some(u.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.to_string()),
            Value::Object(_) => None,
        }
    }
}

fn float_to_i64(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let rounded = f.round();
    if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::UInt(u) => f.debug_tuple("UInt").field(u).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Value::Object(_) => f.write_str("Object(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Patrol {
        waypoints: Vec<u32>,
    }

    #[test]
    fn primitives_are_normalized() {
        assert_eq!(Value::from_typed(3i32), Value::Int(3));
        assert_eq!(Value::from_typed(3u8), Value::UInt(3));
        assert_eq!(Value::from_typed(0.5f32), Value::Float(0.5));
        assert_eq!(Value::from_typed("idle").tag(), ValueTag::Text);
        assert_eq!(Value::from_typed(String::from("idle")).tag(), ValueTag::Text);
    }

    #[test]
    fn objects_only_read_back_as_their_type() {
        let v = Value::from_typed(Patrol { waypoints: vec![1, 2] });
        assert_eq!(v.tag(), ValueTag::Object);
        assert_eq!(
            v.to_typed::<Patrol>(),
            Some(Patrol {
                waypoints: vec![1, 2]
            })
        );
        assert_eq!(v.to_typed::<i32>(), None);
    }

    #[test]
    fn primitive_reads_convert_best_effort() {
        assert_eq!(Value::Int(7).to_typed::<f32>(), Some(7.0));
        assert_eq!(Value::Float(2.6).to_typed::<i32>(), Some(3));
        assert_eq!(Value::Text(Arc::from("42")).to_typed::<u16>(), Some(42));
        assert_eq!(Value::Text(Arc::from("TRUE")).to_typed::<bool>(), Some(true));
        assert_eq!(Value::Int(-1).to_typed::<u32>(), None);
        assert_eq!(Value::Int(300).to_typed::<u8>(), None);
        assert_eq!(Value::Float(f64::NAN).to_typed::<i64>(), None);
        assert_eq!(Value::Bool(true).to_typed::<String>(), Some("true".to_string()));
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Value::from_typed(Patrol { waypoints: vec![] });
        let b = Value::from_typed(Patrol { waypoints: vec![] });
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
