//! The three-valued type tag used for instruction results.

use std::fmt;

/// An instruction's result type. `Unknown` covers untyped values:
/// control instructions (`Jump`, `If`, `Ret`) and anything never given
/// a concrete width.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Type {
    Unknown,
    Int32,
    Int64,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Unknown => Ok(()),
            Type::Int32 => write!(f, ".i32"),
            Type::Int64 => write!(f, ".i64"),
        }
    }
}

/// The immediate payload of a `Const` instruction.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ConstValue {
    Int32(i32),
    Int64(i64),
}

impl ConstValue {
    pub fn ty(self) -> Type {
        match self {
            ConstValue::Int32(_) => Type::Int32,
            ConstValue::Int64(_) => Type::Int64,
        }
    }

    /// Widens to a signed 64-bit value, for use in folding arithmetic.
    pub fn as_i64(self) -> i64 {
        match self {
            ConstValue::Int32(v) => i64::from(v),
            ConstValue::Int64(v) => v,
        }
    }

    /// Builds a `ConstValue` of the given type from a widened result,
    /// wrapping on truncation to `Int32`.
    pub fn wrap(ty: Type, value: i64) -> ConstValue {
        match ty {
            Type::Int32 => ConstValue::Int32(value as i32),
            Type::Int64 | Type::Unknown => ConstValue::Int64(value),
        }
    }
}

impl From<i32> for ConstValue {
    fn from(v: i32) -> Self {
        ConstValue::Int32(v)
    }
}

impl From<i64> for ConstValue {
    fn from(v: i64) -> Self {
        ConstValue::Int64(v)
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConstValue::Int32(v) => write!(f, "{}", v),
            ConstValue::Int64(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_dump_grammar() {
        assert_eq!(format!("{}", Type::Unknown), "");
        assert_eq!(format!("{}", Type::Int32), ".i32");
        assert_eq!(format!("{}", Type::Int64), ".i64");
    }

    #[test]
    fn wrap_truncates_to_i32() {
        let v = ConstValue::wrap(Type::Int32, (i32::MAX as i64) + 10);
        assert_eq!(v, ConstValue::Int32((i32::MAX as i64 + 10) as i32));
    }
}
