//! The stable disk codec; `trait Encodable` & `trait Decodable`.
//!
//! Every key and value stored through this crate is encoded with
//! the same, version-independent byte format:
//!
//! - integers are little-endian
//! - booleans are a single byte
//! - byte arrays (hashes) are raw bytes, no framing
//! - strings and vectors are prefixed with a [compact size](Reader::compact_size)
//! - tuples are the concatenation of their components, with no separator
//!
//! The tuple rule is what record-family scans rely on: a composite key
//! `("tag", suffix)` sorts by the encoded tag first, then the suffix,
//! so a cursor seeded at `("tag", zeroed-suffix)` walks exactly one
//! family in order.

//---------------------------------------------------------------------------------------------------- Import
use std::string::FromUtf8Error;

//---------------------------------------------------------------------------------------------------- DecodeError
/// A record's bytes did not decode per schema.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// The input ended before the schema was satisfied.
    #[error("unexpected end of record: wanted {wanted} more bytes, {remaining} left")]
    UnexpectedEnd {
        /// How many bytes the decoder asked for.
        wanted: usize,
        /// How many bytes were actually left.
        remaining: usize,
    },

    /// A length prefix pointed past the end of the record.
    #[error("declared length {length} exceeds the {remaining} remaining bytes")]
    OversizedLength {
        /// The declared element/byte count.
        length: u64,
        /// How many bytes were actually left.
        remaining: usize,
    },

    /// A string record held non-UTF-8 bytes.
    #[error("string record is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
}

//---------------------------------------------------------------------------------------------------- Reader
/// A byte reader over one record.
///
/// Decoding is incremental: loaders decode a key's leading tag first,
/// decide whether they care, and only then decode the rest. Trailing
/// bytes are not an error for the same reason.
pub struct Reader<'a> {
    /// The remaining, not-yet-consumed bytes.
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Create a new [`Reader`] over `bytes`.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// How many bytes are left to consume.
    pub const fn remaining(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if every byte has been consumed.
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume and return the next `n` bytes.
    ///
    /// # Errors
    /// [`DecodeError::UnexpectedEnd`] if fewer than `n` bytes remain.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.bytes.len() {
            return Err(DecodeError::UnexpectedEnd {
                wanted: n,
                remaining: self.bytes.len(),
            });
        }
        let (taken, rest) = self.bytes.split_at(n);
        self.bytes = rest;
        Ok(taken)
    }

    /// Consume and return the next `N` bytes as a fixed array.
    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut array = [0; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    /// Consume a compact size prefix.
    ///
    /// The marker byte decides the width: values below `253` are the
    /// marker itself, `253`/`254`/`255` are followed by a little-endian
    /// `u16`/`u32`/`u64` respectively.
    pub fn compact_size(&mut self) -> Result<u64, DecodeError> {
        let marker = self.take(1)?[0];
        Ok(match marker {
            0..=252 => u64::from(marker),
            253 => u64::from(u16::from_le_bytes(self.take_array()?)),
            254 => u64::from(u32::from_le_bytes(self.take_array()?)),
            255 => u64::from_le_bytes(self.take_array()?),
        })
    }

    /// Consume a compact size prefix that counts _bytes_ still to come.
    ///
    /// # Errors
    /// [`DecodeError::OversizedLength`] if the declared length
    /// cannot possibly fit in the remaining input.
    #[allow(clippy::cast_possible_truncation)] // bounded by `remaining()`
    fn bounded_length(&mut self) -> Result<usize, DecodeError> {
        let length = self.compact_size()?;
        if length > self.remaining() as u64 {
            return Err(DecodeError::OversizedLength {
                length,
                remaining: self.remaining(),
            });
        }
        Ok(length as usize)
    }
}

//---------------------------------------------------------------------------------------------------- Compact size
/// Append a compact size prefix to `out`.
#[allow(clippy::cast_possible_truncation)] // every cast is range-matched
pub fn write_compact_size(out: &mut Vec<u8>, size: u64) {
    match size {
        0..=252 => out.push(size as u8),
        253..=0xFFFF => {
            out.push(253);
            out.extend_from_slice(&(size as u16).to_le_bytes());
        }
        0x1_0000..=0xFFFF_FFFF => {
            out.push(254);
            out.extend_from_slice(&(size as u32).to_le_bytes());
        }
        _ => {
            out.push(255);
            out.extend_from_slice(&size.to_le_bytes());
        }
    }
}

//---------------------------------------------------------------------------------------------------- Traits
/// A type encodable to the disk byte stream.
pub trait Encodable {
    /// Append the encoding of `self` to `out`.
    fn encode_into(&self, out: &mut Vec<u8>);
}

/// A type decodable from the disk byte stream.
pub trait Decodable: Sized {
    /// Decode a value, consuming bytes from `reader`.
    ///
    /// # Errors
    /// Any [`DecodeError`] when the bytes do not match the schema.
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError>;
}

/// Encode `value` into a fresh byte vector.
pub fn serialize<T: Encodable + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    value.encode_into(&mut out);
    out
}

/// Decode a `T` from the front of `bytes`.
///
/// Trailing bytes are ignored, matching the incremental
/// decoding the loaders perform.
///
/// # Errors
/// Any [`DecodeError`] when the bytes do not match the schema.
pub fn deserialize<T: Decodable>(bytes: &[u8]) -> Result<T, DecodeError> {
    T::decode_from(&mut Reader::new(bytes))
}

//---------------------------------------------------------------------------------------------------- Integer impls
/// Implement both traits for little-endian integers.
macro_rules! impl_int {
    ($($int:ident),* $(,)?) => {
        $(
            impl Encodable for $int {
                #[inline]
                fn encode_into(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }

            impl Decodable for $int {
                #[inline]
                fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
                    Ok(Self::from_le_bytes(reader.take_array()?))
                }
            }
        )*
    };
}

impl_int! {
    u8, u16, u32, u64,
    i32, i64,
}

impl Encodable for bool {
    #[inline]
    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }
}

impl Decodable for bool {
    /// Any non-zero byte decodes as `true`.
    #[inline]
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(reader.take(1)?[0] != 0)
    }
}

//---------------------------------------------------------------------------------------------------- Array impls
// Fixed-width hashes (160/256-bit) are raw bytes with no framing.
impl<const N: usize> Encodable for [u8; N] {
    #[inline]
    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }
}

impl<const N: usize> Decodable for [u8; N] {
    #[inline]
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        reader.take_array()
    }
}

//---------------------------------------------------------------------------------------------------- String impls
impl Encodable for str {
    fn encode_into(&self, out: &mut Vec<u8>) {
        write_compact_size(out, self.len() as u64);
        out.extend_from_slice(self.as_bytes());
    }
}

impl Encodable for String {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.as_str().encode_into(out);
    }
}

impl Decodable for String {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let length = reader.bounded_length()?;
        Ok(Self::from_utf8(reader.take(length)?.to_vec())?)
    }
}

//---------------------------------------------------------------------------------------------------- Vector impls
impl<T: Encodable> Encodable for Vec<T> {
    fn encode_into(&self, out: &mut Vec<u8>) {
        write_compact_size(out, self.len() as u64);
        for element in self {
            element.encode_into(out);
        }
    }
}

impl<T: Encodable> Encodable for [T] {
    fn encode_into(&self, out: &mut Vec<u8>) {
        write_compact_size(out, self.len() as u64);
        for element in self {
            element.encode_into(out);
        }
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let count = reader.compact_size()?;
        // Every element consumes at least one byte, so a count past
        // the remaining input is corrupt, not just a big allocation.
        if count > reader.remaining() as u64 {
            return Err(DecodeError::OversizedLength {
                length: count,
                remaining: reader.remaining(),
            });
        }
        #[allow(clippy::cast_possible_truncation)]
        let mut elements = Self::with_capacity(count as usize);
        for _ in 0..count {
            elements.push(T::decode_from(reader)?);
        }
        Ok(elements)
    }
}

//---------------------------------------------------------------------------------------------------- Tuple impls
// Tuple encoding is the concatenation of the components'
// encodings with no framing; composite-key scans depend on it.
impl<A: Encodable, B: Encodable> Encodable for (A, B) {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.0.encode_into(out);
        self.1.encode_into(out);
    }
}

impl<A: Decodable, B: Decodable> Decodable for (A, B) {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok((A::decode_from(reader)?, B::decode_from(reader)?))
    }
}

impl<A: Encodable, B: Encodable, C: Encodable> Encodable for (A, B, C) {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.0.encode_into(out);
        self.1.encode_into(out);
        self.2.encode_into(out);
    }
}

impl<A: Decodable, B: Decodable, C: Decodable> Decodable for (A, B, C) {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok((
            A::decode_from(reader)?,
            B::decode_from(reader)?,
            C::decode_from(reader)?,
        ))
    }
}

//---------------------------------------------------------------------------------------------------- Reference impl
impl<T: Encodable + ?Sized> Encodable for &T {
    #[inline]
    fn encode_into(&self, out: &mut Vec<u8>) {
        (**self).encode_into(out);
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Round-trip a value and assert the exact encoding.
    fn roundtrip<T>(value: T, expected: &[u8])
    where
        T: Encodable + Decodable + PartialEq + std::fmt::Debug,
    {
        let bytes = serialize(&value);
        assert_eq!(bytes, expected);
        assert_eq!(deserialize::<T>(&bytes).unwrap(), value);
    }

    #[test]
    fn integers_are_little_endian() {
        roundtrip(0x01u8, &[1]);
        roundtrip(0x0102u16, &[2, 1]);
        roundtrip(0x0102_0304u32, &[4, 3, 2, 1]);
        roundtrip(0x0102_0304_0506_0708u64, &[8, 7, 6, 5, 4, 3, 2, 1]);
        roundtrip(-1i32, &[255, 255, 255, 255]);
        roundtrip(-2i64, &[254, 255, 255, 255, 255, 255, 255, 255]);
        roundtrip(true, &[1]);
        roundtrip(false, &[0]);
    }

    #[test]
    fn compact_size_width_boundaries() {
        for (size, expected) in [
            (0u64, vec![0u8]),
            (252, vec![252]),
            (253, vec![253, 253, 0]),
            (0xFFFF, vec![253, 255, 255]),
            (0x1_0000, vec![254, 0, 0, 1, 0]),
            (0xFFFF_FFFF, vec![254, 255, 255, 255, 255]),
            (0x1_0000_0000, vec![255, 0, 0, 0, 0, 1, 0, 0, 0]),
        ] {
            let mut out = Vec::new();
            write_compact_size(&mut out, size);
            assert_eq!(out, expected);
            assert_eq!(Reader::new(&out).compact_size().unwrap(), size);
        }
    }

    #[test]
    fn strings_and_vectors_are_length_prefixed() {
        roundtrip("tx".to_string(), &[2, b't', b'x']);
        roundtrip(String::new(), &[0]);
        roundtrip(vec![1u8, 2, 3], &[3, 1, 2, 3]);
        roundtrip(vec![0x0102u16, 0x0304], &[2, 2, 1, 4, 3]);
    }

    #[test]
    fn pair_encoding_is_plain_concatenation() {
        let tag = "owner";
        let hash = [7u8; 20];
        let pair = serialize(&(tag, hash));

        let mut concatenated = serialize(tag);
        concatenated.extend_from_slice(&serialize(&hash));
        assert_eq!(pair, concatenated);

        // The suffix can be decoded after peeling the tag off.
        let mut reader = Reader::new(&pair);
        assert_eq!(String::decode_from(&mut reader).unwrap(), "owner");
        assert_eq!(<[u8; 20]>::decode_from(&mut reader).unwrap(), hash);
        assert!(reader.is_empty());
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert!(matches!(
            deserialize::<u32>(&[1, 2]),
            Err(DecodeError::UnexpectedEnd { wanted: 4, remaining: 2 })
        ));

        // A length prefix pointing past the end must not allocate.
        assert!(matches!(
            deserialize::<Vec<u8>>(&[255, 255, 255, 255, 255, 255, 255, 255, 255]),
            Err(DecodeError::OversizedLength { .. })
        ));

        assert!(matches!(
            deserialize::<String>(&[5, b'a']),
            Err(DecodeError::OversizedLength { length: 5, .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = serialize(&42u32);
        bytes.extend_from_slice(&[9, 9, 9]);
        assert_eq!(deserialize::<u32>(&bytes).unwrap(), 42);
    }
}
