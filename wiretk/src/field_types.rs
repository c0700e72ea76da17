#![allow(non_camel_case_types)]

// We allow non-CamelCase types here because we want the struct names to appear as close to they do
// in the proto documentation and official implementation.  Thus, `int64` is how we represent the
// type of `i64`.

use std::convert::TryInto;

use varbuf::{stack_pack, v64, Unpackable, Unpacker};

use super::*;

/////////////////////////////////////////////// int64 //////////////////////////////////////////////

#[derive(Clone, Debug, Default)]
pub struct int64(i64);

impl<'a> FieldType<'a> for int64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    type Native = i64;

    fn from_native(x: Self::Native) -> Self {
        Self(x)
    }

    fn into_native(self) -> Self::Native {
        self.0
    }
}

impl<'a> FieldPackHelper<'a, int64> for i64 {
    fn field_pack_sz(&self, tag: &Tag) -> usize {
        let v: v64 = v64::from(*self);
        stack_pack(tag).pack(v).pack_sz()
    }

    fn field_pack(&self, tag: &Tag, out: &mut [u8]) {
        let v: v64 = v64::from(*self);
        stack_pack(tag).pack(v).into_slice(out);
    }
}

impl<'a> FieldUnpackHelper<'a, int64> for i64 {
    fn merge_field(&mut self, proto: int64) {
        *self = proto.into();
    }
}

impl From<int64> for i64 {
    fn from(f: int64) -> i64 {
        f.0
    }
}

impl<'a> Unpackable<'a> for int64 {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (v, buf) = v64::unpack(buf)?;
        let x: i64 = v.into();
        Ok((int64(x), buf))
    }
}

////////////////////////////////////////////// sint64 //////////////////////////////////////////////

#[derive(Clone, Debug, Default)]
pub struct sint64(i64);

impl<'a> FieldType<'a> for sint64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    type Native = i64;

    fn from_native(x: Self::Native) -> Self {
        Self(x)
    }

    fn into_native(self) -> Self::Native {
        self.0
    }
}

impl<'a> FieldPackHelper<'a, sint64> for i64 {
    fn field_pack_sz(&self, tag: &Tag) -> usize {
        let v: v64 = v64::from(zigzag(*self));
        stack_pack(tag).pack(v).pack_sz()
    }

    fn field_pack(&self, tag: &Tag, out: &mut [u8]) {
        let v: v64 = v64::from(zigzag(*self));
        stack_pack(tag).pack(v).into_slice(out);
    }
}

impl<'a> FieldUnpackHelper<'a, sint64> for i64 {
    fn merge_field(&mut self, proto: sint64) {
        *self = proto.into();
    }
}

impl From<sint64> for i64 {
    fn from(f: sint64) -> i64 {
        f.0
    }
}

impl<'a> Unpackable<'a> for sint64 {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (v, buf) = v64::unpack(buf)?;
        let x: i64 = unzigzag(v.into());
        Ok((sint64(x), buf))
    }
}

////////////////////////////////////////////// message /////////////////////////////////////////////

#[derive(Clone, Debug, Default)]
pub struct message<M>(M);

impl<M> message<M> {
    pub fn unwrap_message(self) -> M {
        self.0
    }
}

impl<'a, M> FieldType<'a> for message<M> {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;

    type Native = M;

    fn from_native(msg: M) -> Self {
        Self(msg)
    }

    fn into_native(self) -> Self::Native {
        self.0
    }
}

impl<'a, M> Unpackable<'a> for message<M>
where
    M: Unpackable<'a>,
    <M as Unpackable<'a>>::Error: From<varbuf::Error> + From<Error>,
{
    type Error = M::Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Self::Error> {
        let mut up = Unpacker::new(buf);
        let v: v64 = match up.unpack() {
            Ok(v) => v,
            Err(e) => {
                return Err(e.into());
            }
        };
        let length: u64 = v.into();
        let length: usize = match length.try_into() {
            Ok(x) => x,
            Err(_) => {
                return Err(Error::InvalidLength { length }.into());
            }
        };
        let rem = up.remain();
        if rem.len() < length {
            return Err(Error::BufferTooShort {
                required: length,
                had: rem.len(),
            }
            .into());
        }
        let body: &'b [u8] = &rem[..length];
        let rem: &'b [u8] = &rem[length..];
        let (m, trailing): (M, &'a [u8]) = <M as Unpackable<'a>>::unpack(body)?;
        // a Message consumes its entire body
        debug_assert!(trailing.is_empty());
        Ok((Self(m), rem))
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use super::*;

    // expect is the body of the field, without the one-byte tag.
    fn helper_test<'a, T, H>(value: H, expect: &'a [u8])
    where
        T: Clone + FieldType<'a> + Unpackable<'a>,
        H: Debug + Default + Eq + From<T> + FieldPackHelper<'a, T> + FieldUnpackHelper<'a, T>,
    {
        let tag = Tag {
            field_number: FieldNumber::must(1),
            wire_type: T::WIRE_TYPE,
        };
        // pack_sz
        assert_eq!(1 + expect.len(), value.field_pack_sz(&tag));
        // pack
        let mut output: Vec<u8> = vec![0; 1 + expect.len()];
        value.field_pack(&tag, &mut output);
        assert_eq!(expect, &output[1..]);
        // unpack
        let mut up = Unpacker::new(expect);
        let unpacked: T = match up.unpack() {
            Ok(x) => x,
            Err(_) => {
                panic!("up.unpack() failed");
            }
        };
        let mut field = H::default();
        field.merge_field(unpacked.clone());
        assert_eq!(value, field);
    }

    #[test]
    fn int64() {
        helper_test::<int64, i64>(
            i64::MIN,
            &[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 1],
        );
        helper_test::<int64, i64>(
            -1,
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 1],
        );
        helper_test::<int64, i64>(0, &[0]);
        helper_test::<int64, i64>(1, &[1]);
        helper_test::<int64, i64>(
            i64::MAX,
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f],
        );
    }

    #[test]
    fn sint64() {
        helper_test::<sint64, i64>(
            i64::MIN,
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 1],
        );
        helper_test::<sint64, i64>(-1, &[1]);
        helper_test::<sint64, i64>(0, &[0]);
        helper_test::<sint64, i64>(1, &[2]);
        helper_test::<sint64, i64>(
            i64::MAX,
            &[0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 1],
        );
    }

    #[test]
    fn vec_append_and_option_last_one_wins() {
        let mut repeated: Vec<i64> = Vec::new();
        repeated.merge_field(int64::from_native(1));
        repeated.merge_field(int64::from_native(2));
        repeated.merge_field(int64::from_native(3));
        assert_eq!(vec![1, 2, 3], repeated);
        let mut singular: Option<i64> = None;
        singular.merge_field(int64::from_native(1));
        singular.merge_field(int64::from_native(2));
        assert_eq!(Some(2), singular);
    }
}
