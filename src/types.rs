//! Element types and their byte widths

use num_traits::{AsPrimitive, NumCast};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OokError;

/// Scalar element types a volume can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TypeTag {
    /// Signed 8-bit integer
    Int8 = 0,
    /// Unsigned 8-bit integer
    Uint8 = 1,
    /// Signed 16-bit integer
    Int16 = 2,
    /// Unsigned 16-bit integer
    Uint16 = 3,
    /// Signed 32-bit integer
    Int32 = 4,
    /// Unsigned 32-bit integer
    Uint32 = 5,
    /// Signed 64-bit integer
    Int64 = 6,
    /// Unsigned 64-bit integer
    Uint64 = 7,
    /// IEEE single precision
    Float32 = 8,
    /// IEEE double precision
    Float64 = 9,
}

impl TypeTag {
    /// Every tag, in wire order
    pub const ALL: [TypeTag; 10] = [
        TypeTag::Int8,
        TypeTag::Uint8,
        TypeTag::Int16,
        TypeTag::Uint16,
        TypeTag::Int32,
        TypeTag::Uint32,
        TypeTag::Int64,
        TypeTag::Uint64,
        TypeTag::Float32,
        TypeTag::Float64,
    ];

    /// Size in bytes of one element of this type
    pub fn width(&self) -> usize {
        match self {
            TypeTag::Int8 | TypeTag::Uint8 => 1,
            TypeTag::Int16 | TypeTag::Uint16 => 2,
            TypeTag::Int32 | TypeTag::Uint32 | TypeTag::Float32 => 4,
            TypeTag::Int64 | TypeTag::Uint64 | TypeTag::Float64 => 8,
        }
    }

    /// Check if this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, TypeTag::Float32 | TypeTag::Float64)
    }

    /// Floats count as signed
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            TypeTag::Int8
                | TypeTag::Int16
                | TypeTag::Int32
                | TypeTag::Int64
                | TypeTag::Float32
                | TypeTag::Float64
        )
    }

    /// Short command-line name (`i8`, `u16`, `f`, `d`, ...)
    pub fn short_name(&self) -> &'static str {
        match self {
            TypeTag::Int8 => "i8",
            TypeTag::Uint8 => "u8",
            TypeTag::Int16 => "i16",
            TypeTag::Uint16 => "u16",
            TypeTag::Int32 => "i32",
            TypeTag::Uint32 => "u32",
            TypeTag::Int64 => "i64",
            TypeTag::Uint64 => "u64",
            TypeTag::Float32 => "f",
            TypeTag::Float64 => "d",
        }
    }

    /// Long name, matching the serialized form
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Int8 => "int8",
            TypeTag::Uint8 => "uint8",
            TypeTag::Int16 => "int16",
            TypeTag::Uint16 => "uint16",
            TypeTag::Int32 => "int32",
            TypeTag::Uint32 => "uint32",
            TypeTag::Int64 => "int64",
            TypeTag::Uint64 => "uint64",
            TypeTag::Float32 => "float32",
            TypeTag::Float64 => "float64",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TypeTag {
    type Err = OokError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let tag = match lower.as_str() {
            "f32" | "float" => TypeTag::Float32,
            "f64" | "double" => TypeTag::Float64,
            other => TypeTag::ALL
                .into_iter()
                .find(|t| t.short_name() == other || t.name() == other)
                .ok_or_else(|| OokError::invalid(format!("Invalid type '{}'", s)))?,
        };
        Ok(tag)
    }
}

/// A primitive that can live in a volume
///
/// Elements are stored in native byte order; the backing store is a plain
/// memory image of the array.
pub trait Element:
    Copy
    + Default
    + PartialOrd
    + NumCast
    + AsPrimitive<f32>
    + AsPrimitive<f64>
    + fmt::Debug
    + Send
    + Sync
    + 'static
{
    /// Tag describing this type on disk
    const TAG: TypeTag;

    /// Decode one element from exactly `TAG.width()` bytes
    fn decode_ne(bytes: &[u8]) -> Self;

    /// Encode into exactly `TAG.width()` bytes
    fn encode_ne(self, out: &mut [u8]);
}

macro_rules! impl_element {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const TAG: TypeTag = TypeTag::$tag;

                fn decode_ne(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(raw)
                }

                fn encode_ne(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

impl_element! {
    i8 => Int8,
    u8 => Uint8,
    i16 => Int16,
    u16 => Uint16,
    i32 => Int32,
    u32 => Uint32,
    i64 => Int64,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
}

/// Runs `$body` with `$T` bound to the primitive matching a runtime [`TypeTag`]
macro_rules! with_element_type {
    ($tag:expr, $T:ident => $body:expr) => {
        match $tag {
            $crate::types::TypeTag::Int8 => {
                type $T = i8;
                $body
            }
            $crate::types::TypeTag::Uint8 => {
                type $T = u8;
                $body
            }
            $crate::types::TypeTag::Int16 => {
                type $T = i16;
                $body
            }
            $crate::types::TypeTag::Uint16 => {
                type $T = u16;
                $body
            }
            $crate::types::TypeTag::Int32 => {
                type $T = i32;
                $body
            }
            $crate::types::TypeTag::Uint32 => {
                type $T = u32;
                $body
            }
            $crate::types::TypeTag::Int64 => {
                type $T = i64;
                $body
            }
            $crate::types::TypeTag::Uint64 => {
                type $T = u64;
                $body
            }
            $crate::types::TypeTag::Float32 => {
                type $T = f32;
                $body
            }
            $crate::types::TypeTag::Float64 => {
                type $T = f64;
                $body
            }
        }
    };
}

pub(crate) use with_element_type;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_widths() {
        let widths: Vec<usize> = TypeTag::ALL.iter().map(|t| t.width()).collect();
        assert_eq!(widths, vec![1, 1, 2, 2, 4, 4, 8, 8, 4, 8]);
    }

    #[test]
    fn test_element_tags_agree_with_widths() {
        fn check<T: Element>() {
            assert_eq!(T::TAG.width(), std::mem::size_of::<T>());
        }
        check::<i8>();
        check::<u16>();
        check::<i32>();
        check::<u64>();
        check::<f32>();
        check::<f64>();
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("u16".parse::<TypeTag>().unwrap(), TypeTag::Uint16);
        assert_eq!("I8".parse::<TypeTag>().unwrap(), TypeTag::Int8);
        assert_eq!("f".parse::<TypeTag>().unwrap(), TypeTag::Float32);
        assert_eq!("d".parse::<TypeTag>().unwrap(), TypeTag::Float64);
        assert_eq!("float32".parse::<TypeTag>().unwrap(), TypeTag::Float32);
        assert_eq!("f64".parse::<TypeTag>().unwrap(), TypeTag::Float64);
        assert!("u3".parse::<TypeTag>().is_err());
    }

    #[test]
    fn test_serde_uses_long_names() {
        let json = serde_json::to_string(&TypeTag::Uint16).unwrap();
        assert_eq!(json, "\"uint16\"");
        let back: TypeTag = serde_json::from_str("\"float64\"").unwrap();
        assert_eq!(back, TypeTag::Float64);
    }

    #[test]
    fn test_signedness() {
        assert!(TypeTag::Int16.is_signed());
        assert!(!TypeTag::Uint64.is_signed());
        assert!(TypeTag::Float32.is_signed());
        assert!(TypeTag::Float64.is_float());
        assert!(!TypeTag::Int64.is_float());
    }

    #[test]
    fn test_dispatch_macro() {
        fn width_of(tag: TypeTag) -> usize {
            with_element_type!(tag, T => std::mem::size_of::<T>())
        }
        for tag in TypeTag::ALL {
            assert_eq!(width_of(tag), tag.width());
        }
    }
}
