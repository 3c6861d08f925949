// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Upper bound on a single decoded collection. Decoding a length prefix
/// above this limit fails before any allocation happens.
pub const MAX_ALLOC: u64 = 5 << 20;

/// A type that can be written to the canonical wire format: fixed-width
/// little-endian integers, u64 length prefixes for collections.
pub trait Encodable {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error>;
}

/// A type that can be read back from the canonical wire format.
pub trait Decodable: Sized {
    fn decode<R: Read>(r: &mut R) -> Result<Self, Error>;
}

/// Encodes a value into a byte vector.
pub fn to_vec<T: Encodable>(value: &T) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    value.encode(&mut buf)?;
    Ok(buf)
}

/// Decodes a value from a byte slice, requiring every byte to be consumed.
pub fn from_slice<T: Decodable>(bytes: &[u8]) -> Result<T, Error> {
    let mut r = bytes;
    let value = T::decode(&mut r)?;
    if !r.is_empty() {
        return Err(Error::InvalidLength {
            expected: bytes.len() - r.len(),
            actual: bytes.len(),
        });
    }
    Ok(value)
}

impl Encodable for u8 {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        Ok(w.write_u8(*self)?)
    }
}

impl Decodable for u8 {
    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        Ok(r.read_u8()?)
    }
}

impl Encodable for u16 {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        Ok(w.write_u16::<LittleEndian>(*self)?)
    }
}

impl Decodable for u16 {
    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        Ok(r.read_u16::<LittleEndian>()?)
    }
}

impl Encodable for u32 {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        Ok(w.write_u32::<LittleEndian>(*self)?)
    }
}

impl Decodable for u32 {
    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        Ok(r.read_u32::<LittleEndian>()?)
    }
}

impl Encodable for u64 {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        Ok(w.write_u64::<LittleEndian>(*self)?)
    }
}

impl Decodable for u64 {
    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        Ok(r.read_u64::<LittleEndian>()?)
    }
}

impl Encodable for i64 {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        Ok(w.write_i64::<LittleEndian>(*self)?)
    }
}

impl Decodable for i64 {
    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        Ok(r.read_i64::<LittleEndian>()?)
    }
}

impl Encodable for bool {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        Ok(w.write_u8(u8::from(*self))?)
    }
}

impl Decodable for bool {
    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        match r.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::InvalidValue(format!("invalid bool byte {}", other))),
        }
    }
}

impl<const N: usize> Encodable for [u8; N] {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        Ok(w.write_all(self)?)
    }
}

impl<const N: usize> Decodable for [u8; N] {
    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        let mut buf = [0u8; N];
        r.read_exact(&mut buf)?;
        Ok(buf)
    }
}

// Vec<u8> goes through the element impl, which produces the same bytes
// as a raw length-prefixed write.
impl<T: Encodable> Encodable for Vec<T> {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        (self.len() as u64).encode(w)?;
        for item in self {
            item.encode(w)?;
        }
        Ok(())
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        let len = u64::decode(r)?;
        if len > MAX_ALLOC {
            return Err(Error::AllocLimit(len));
        }
        let mut items = Vec::with_capacity(len.min(4096) as usize);
        for _ in 0..len {
            items.push(T::decode(r)?);
        }
        Ok(items)
    }
}

impl Encodable for String {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        (self.len() as u64).encode(w)?;
        Ok(w.write_all(self.as_bytes())?)
    }
}

impl Decodable for String {
    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        let bytes = Vec::<u8>::decode(r)?;
        String::from_utf8(bytes).map_err(|e| Error::InvalidValue(e.to_string()))
    }
}

impl<T: Encodable> Encodable for Option<T> {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        match self {
            Some(v) => {
                true.encode(w)?;
                v.encode(w)
            }
            None => false.encode(w),
        }
    }
}

impl<T: Decodable> Decodable for Option<T> {
    fn decode<R: Read>(r: &mut R) -> Result<Self, Error> {
        if bool::decode(r)? {
            Ok(Some(T::decode(r)?))
        } else {
            Ok(None)
        }
    }
}
