//! This module provides an implementation of the variable integer encoding specified in the
//! [protobuf encoding documentation](https://developers.google.com/protocol-buffers/docs/encoding).
//!
//! By convention the From<I> and Into<I> traits are implemented for the integer types the wire
//! format traffics in.  They will silently truncate and it is up to higher level code to unpack to
//! full v64 and check for overflow when casting.

use super::Error;
use super::Packable;
use super::Unpackable;

use std::convert::TryInto;

////////////////////////////////////////////// Varint //////////////////////////////////////////////

/// v64 is the type of a variable integer encoding.  It can represent any value of 64-bits or
/// fewer.  The encoding follows the protocol buffer spec, which means that negative numbers will
/// always serialize to ten bytes.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct v64 {
    x: u64,
}

impl From<u32> for v64 {
    fn from(x: u32) -> v64 {
        v64 { x: x as u64 }
    }
}

impl TryInto<u32> for v64 {
    type Error = Error;

    fn try_into(self) -> Result<u32, Error> {
        match self.x.try_into() {
            Ok(x) => Ok(x),
            Err(_) => Err(Error::UnsignedOverflow { value: self.x }),
        }
    }
}

impl From<u64> for v64 {
    fn from(x: u64) -> v64 {
        v64 { x }
    }
}

#[allow(clippy::from_over_into)]
impl Into<u64> for v64 {
    fn into(self) -> u64 {
        self.x
    }
}

impl From<i64> for v64 {
    fn from(x: i64) -> v64 {
        v64 { x: x as u64 }
    }
}

#[allow(clippy::from_over_into)]
impl Into<i64> for v64 {
    fn into(self) -> i64 {
        self.x as i64
    }
}

impl From<usize> for v64 {
    fn from(x: usize) -> v64 {
        // unwrap because we assume and test this is safe
        let x: u64 = x.try_into().unwrap();
        v64 { x }
    }
}

#[allow(clippy::from_over_into)]
impl Into<usize> for v64 {
    fn into(self) -> usize {
        // unwrap because we assume and test this is safe
        let x: usize = self.x.try_into().unwrap();
        x
    }
}

impl Packable for v64 {
    fn pack_sz(&self) -> usize {
        // or with 1 so that zero takes one byte rather than zero
        let bits = 64 - (self.x | 1).leading_zeros() as usize;
        (bits + 6) / 7
    }

    fn pack(&self, out: &mut [u8]) {
        let mut x: u64 = self.x;
        let mut idx: usize = 0;
        while x >= 128 {
            out[idx] = (x & 127) as u8 | 128;
            x >>= 7;
            idx += 1;
        }
        out[idx] = x as u8;
    }
}

impl<'a> Unpackable<'a> for v64 {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let bytes: usize = if buf.len() < 10 { buf.len() } else { 10 };
        let mut ret = 0u64;
        let mut idx = 0;
        let mut shl = 0;
        while idx < bytes && buf[idx] & 128 != 0 {
            ret |= (buf[idx] as u64 & 127) << shl;
            idx += 1;
            shl += 7;
        }
        if idx >= bytes {
            // every considered byte had the continuation bit set
            if buf.len() >= 10 {
                Err(Error::VarintOverflow { bytes })
            } else {
                Err(Error::BufferTooShort {
                    required: buf.len() + 1,
                    had: buf.len(),
                })
            }
        } else {
            ret |= (buf[idx] as u64 & 127) << shl;
            idx += 1;
            let ret: v64 = ret.into();
            Ok((ret, &buf[idx..]))
        }
    }
}

///////////////////////////////////////////// mod tests ////////////////////////////////////////////
