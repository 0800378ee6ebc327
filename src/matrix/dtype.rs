//! Numeric element types
//!
//! A store holds a single homogeneous element type. Each type has a stable
//! one-byte code written into shard headers, a fixed byte size, and a
//! lowercase name used in the manifest and on the command line.
//!
//! Elements are always stored little-endian.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Element type tag as persisted on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl DType {
    /// All supported element types, in code order.
    pub const ALL: [DType; 10] = [
        DType::U8,
        DType::I8,
        DType::U16,
        DType::I16,
        DType::U32,
        DType::I32,
        DType::U64,
        DType::I64,
        DType::F32,
        DType::F64,
    ];

    /// On-disk code. Never reorder.
    pub fn code(self) -> u8 {
        match self {
            DType::U8 => 1,
            DType::I8 => 2,
            DType::U16 => 3,
            DType::I16 => 4,
            DType::U32 => 5,
            DType::I32 => 6,
            DType::U64 => 7,
            DType::I64 => 8,
            DType::F32 => 9,
            DType::F64 => 10,
        }
    }

    /// Decodes an on-disk code, returning `None` for unknown codes.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.code() == code)
    }

    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            DType::U8 | DType::I8 => 1,
            DType::U16 | DType::I16 => 2,
            DType::U32 | DType::I32 | DType::F32 => 4,
            DType::U64 | DType::I64 | DType::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::U8 => "u8",
            DType::I8 => "i8",
            DType::U16 => "u16",
            DType::I16 => "i16",
            DType::U32 => "u32",
            DType::I32 => "i32",
            DType::U64 => "u64",
            DType::I64 => "i64",
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.name() == s)
            .ok_or_else(|| format!("unknown dtype '{}'", s))
    }
}

/// A numeric type that can be stored in a shard.
pub trait Element:
    Copy + PartialEq + fmt::Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const DTYPE: DType;

    /// Appends the little-endian encoding of `self` to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decodes one element from exactly `DTYPE.size()` bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_element! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

/// Encodes a slice of elements to little-endian bytes.
pub fn encode_elements<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::DTYPE.size());
    for v in values {
        v.write_le(&mut out);
    }
    out
}

/// Decodes little-endian bytes into elements. `bytes.len()` must be a multiple
/// of the element size.
pub fn decode_elements<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(T::DTYPE.size())
        .map(T::read_le)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_and_decodable() {
        for dtype in DType::ALL {
            assert_eq!(DType::from_code(dtype.code()), Some(dtype));
        }
        assert_eq!(DType::from_code(0), None);
        assert_eq!(DType::from_code(200), None);
    }

    #[test]
    fn test_sizes_match_rust_types() {
        assert_eq!(<u8 as Element>::DTYPE.size(), std::mem::size_of::<u8>());
        assert_eq!(<i16 as Element>::DTYPE.size(), std::mem::size_of::<i16>());
        assert_eq!(<f32 as Element>::DTYPE.size(), std::mem::size_of::<f32>());
        assert_eq!(<f64 as Element>::DTYPE.size(), std::mem::size_of::<f64>());
        assert_eq!(<u64 as Element>::DTYPE.size(), std::mem::size_of::<u64>());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("f64".parse::<DType>().unwrap(), DType::F64);
        assert_eq!("i32".parse::<DType>().unwrap(), DType::I32);
        assert!("float64".parse::<DType>().is_err());
    }

    #[test]
    fn test_little_endian_layout() {
        let bytes = encode_elements(&[1u32, 0x0102_0304]);
        assert_eq!(bytes, vec![1, 0, 0, 0, 4, 3, 2, 1]);
        assert_eq!(decode_elements::<u32>(&bytes), vec![1, 0x0102_0304]);
    }

    #[test]
    fn test_float_bits_preserved() {
        let values = [f64::MIN_POSITIVE, -0.0, 1.5e300, f64::INFINITY];
        let decoded = decode_elements::<f64>(&encode_elements(&values));
        for (a, b) in values.iter().zip(decoded.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_serde_name() {
        assert_eq!(serde_json::to_string(&DType::F32).unwrap(), "\"f32\"");
        let parsed: DType = serde_json::from_str("\"u16\"").unwrap();
        assert_eq!(parsed, DType::U16);
    }
}
