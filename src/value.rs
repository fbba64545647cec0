//! Values exchanged with functions in the dispatch table.

use std::fmt;

use crate::numeric::Int64;

/// Type code of a [`HostValue`], as used in call signatures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `v` - no value
    Void,
    /// `i` - 32-bit integer
    I32,
    /// `j` - 64-bit integer as a word pair
    I64,
    /// `f` - 32-bit float
    F32,
    /// `d` - 64-bit float
    F64,
}

impl ValueKind {
    /// Signature character for this kind.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            ValueKind::Void => 'v',
            ValueKind::I32 => 'i',
            ValueKind::I64 => 'j',
            ValueKind::F32 => 'f',
            ValueKind::F64 => 'd',
        }
    }

    /// Parses a signature character.
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'v' => Some(ValueKind::Void),
            'i' => Some(ValueKind::I32),
            'j' => Some(ValueKind::I64),
            'f' => Some(ValueKind::F32),
            'd' => Some(ValueKind::F64),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A value passed to or returned from a table function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HostValue {
    /// No value
    Void,
    /// 32-bit integer; also used for pointers
    I32(i32),
    /// 64-bit integer
    I64(Int64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
}

impl HostValue {
    /// The kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            HostValue::Void => ValueKind::Void,
            HostValue::I32(_) => ValueKind::I32,
            HostValue::I64(_) => ValueKind::I64,
            HostValue::F32(_) => ValueKind::F32,
            HostValue::F64(_) => ValueKind::F64,
        }
    }

    /// Returns the integer payload of an `I32`.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            HostValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the payload of an `I64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<Int64> {
        match self {
            HostValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the payload of an `F64`, widening an `F32`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::F32(v) => Some(f64::from(*v)),
            HostValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns `true` for `Void`.
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, HostValue::Void)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::I32(value)
    }
}

impl From<Int64> for HostValue {
    fn from(value: Int64) -> Self {
        HostValue::I64(value)
    }
}

impl From<f32> for HostValue {
    fn from(value: f32) -> Self {
        HostValue::F32(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::F64(value)
    }
}

impl From<()> for HostValue {
    fn from((): ()) -> Self {
        HostValue::Void
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        for code in ['v', 'i', 'j', 'f', 'd'] {
            assert_eq!(ValueKind::from_code(code).unwrap().code(), code);
        }
        assert!(ValueKind::from_code('x').is_none());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(HostValue::from(7).as_i32(), Some(7));
        assert_eq!(HostValue::from(1.5f32).as_f64(), Some(1.5));
        assert_eq!(HostValue::from(Int64::from_i64(-1)).kind(), ValueKind::I64);
        assert!(HostValue::from(()).is_void());
        assert!(HostValue::F64(1.0).as_i32().is_none());
    }
}
