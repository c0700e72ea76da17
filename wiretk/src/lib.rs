#![doc = include_str!("../README.md")]

pub mod field_types;
pub mod skip;
pub mod zigzag;

pub use skip::skip;
pub use zigzag::unzigzag;
pub use zigzag::zigzag;

use varbuf::{stack_pack, v64, Packable, Unpackable, Unpacker};

/////////////////////////////////////////////// Error //////////////////////////////////////////////

/// Error captures the possible error conditions for packing and unpacking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// BufferTooShort indicates that there was a need to pack or unpack more bytes than were
    /// available in the underlying memory.
    BufferTooShort { required: usize, had: usize },
    /// BufferTooSmall indicates that a destination buffer cannot hold the serialized message.
    BufferTooSmall { required: usize, had: usize },
    /// InvalidFieldNumber indicates that the field is not a user-assignable field.
    InvalidFieldNumber {
        field_number: u32,
        what: &'static str,
    },
    /// UnhandledWireType indicates that the wire type is not understood by this implementation.
    UnhandledWireType { wire_type: u32 },
    /// TagTooLarge indicates the tag would overflow a 32-bit number.
    TagTooLarge { tag: u64 },
    /// VarintOverflow indicates that a varint field did not terminate with a number < 128.
    VarintOverflow { bytes: usize },
    /// UnsignedOverflow indicates that a value will not fit its intended (unsigned) target.
    UnsignedOverflow { value: u64 },
    /// SignedOverflow indicates that a value will not fit its intended (signed) target.
    SignedOverflow { value: i64 },
    /// InvalidLength indicates a length prefix that cannot index the host's memory.
    InvalidLength { length: u64 },
    /// WireTypeMismatch indicates a known field encoded with the wrong wire type.
    WireTypeMismatch { field_number: u32, wire_type: u32 },
    /// UnexpectedEndOfGroup indicates an end-group tag without a matching start-group.
    UnexpectedEndOfGroup,
    /// MessageTooLarge indicates input larger than the configured decode ceiling.
    MessageTooLarge { size: usize, limit: usize },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BufferTooShort { required, had } => {
                write!(f, "buffer too short:  expected {}, had {}", required, had)
            }
            Error::BufferTooSmall { required, had } => {
                write!(f, "buffer too small:  needed {}, had {}", required, had)
            }
            Error::InvalidFieldNumber { field_number, what } => {
                write!(f, "invalid field_number={}: {}", field_number, what)
            }
            Error::UnhandledWireType { wire_type } => write!(
                f,
                "wire_type={} not handled by this implementation",
                wire_type
            ),
            Error::TagTooLarge { tag } => write!(f, "tag={} overflows 32-bits", tag),
            Error::VarintOverflow { bytes } => {
                write!(f, "varint did not fit in space={} bytes", bytes)
            }
            Error::UnsignedOverflow { value } => {
                write!(f, "unsigned integer cannot hold value={}", value)
            }
            Error::SignedOverflow { value } => {
                write!(f, "signed integer cannot hold value={}", value)
            }
            Error::InvalidLength { length } => {
                write!(f, "length={} is not addressable", length)
            }
            Error::WireTypeMismatch {
                field_number,
                wire_type,
            } => {
                write!(
                    f,
                    "field_number={} does not accept wire_type={}",
                    field_number, wire_type
                )
            }
            Error::UnexpectedEndOfGroup => {
                write!(f, "end-group tag without matching start-group")
            }
            Error::MessageTooLarge { size, limit } => {
                write!(f, "message of size={} exceeds limit={}", size, limit)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<varbuf::Error> for Error {
    fn from(x: varbuf::Error) -> Self {
        match x {
            varbuf::Error::BufferTooShort { required, had } => {
                Error::BufferTooShort { required, had }
            }
            varbuf::Error::VarintOverflow { bytes } => Error::VarintOverflow { bytes },
            varbuf::Error::UnsignedOverflow { value } => Error::UnsignedOverflow { value },
            varbuf::Error::SignedOverflow { value } => Error::SignedOverflow { value },
        }
    }
}

///////////////////////////////////////////// WireType /////////////////////////////////////////////

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WireType {
    /// Varint is wire type 0.  The payload is a single v64.
    Varint,
    /// SixtyFour represents wire type 1.  The payload is a single u64.
    SixtyFour,
    /// LengthDelimited represents wire type 2.  The payload depends upon how the system interprets
    /// the field number.
    LengthDelimited,
    /// StartGroup represents wire type 3.  Deprecated by protobuf, but the skipper must still
    /// recognize it to step over fields emitted by older encoders.
    StartGroup,
    /// EndGroup represents wire type 4.  Valid only where a matching start-group is open.
    EndGroup,
    /// ThirtyTwo represents wire type 5.  The payload is a single u32.
    ThirtyTwo,
}

impl WireType {
    pub fn new(tag_bits: u32) -> Result<WireType, Error> {
        match tag_bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::SixtyFour),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::ThirtyTwo),
            _ => Err(Error::UnhandledWireType {
                wire_type: tag_bits,
            }),
        }
    }

    /// `tag_bits` returns the WireType's contribution to the tag, suitable for bit-wise or'ing with
    /// the FieldNumber.
    pub fn tag_bits(&self) -> u32 {
        match self {
            WireType::Varint => 0,
            WireType::SixtyFour => 1,
            WireType::LengthDelimited => 2,
            WireType::StartGroup => 3,
            WireType::EndGroup => 4,
            WireType::ThirtyTwo => 5,
        }
    }
}

//////////////////////////////////////////// FieldNumber ///////////////////////////////////////////

pub const FIRST_FIELD_NUMBER: u32 = 1;
pub const LAST_FIELD_NUMBER: u32 = (1 << 29) - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldNumber {
    field_number: u32,
}

impl FieldNumber {
    pub fn must(field_number: u32) -> FieldNumber {
        FieldNumber::new(field_number).unwrap()
    }

    pub fn new(field_number: u32) -> Result<FieldNumber, Error> {
        if field_number < FIRST_FIELD_NUMBER {
            return Err(Error::InvalidFieldNumber {
                field_number,
                what: "field number must be positive integer",
            });
        }
        if field_number > LAST_FIELD_NUMBER {
            return Err(Error::InvalidFieldNumber {
                field_number,
                what: "field number too large",
            });
        }
        Ok(FieldNumber { field_number })
    }
}

#[allow(clippy::from_over_into)]
impl Into<u32> for FieldNumber {
    fn into(self) -> u32 {
        self.field_number
    }
}

impl std::cmp::PartialEq<u32> for FieldNumber {
    fn eq(&self, other: &u32) -> bool {
        self.field_number == *other
    }
}

//////////////////////////////////////////////// Tag ///////////////////////////////////////////////

#[derive(Clone, Debug)]
pub struct Tag {
    pub field_number: FieldNumber,
    pub wire_type: WireType,
}

#[macro_export]
macro_rules! tag {
    ($field_number:literal, $wire_type:ident) => {
        $crate::Tag {
            field_number: $crate::FieldNumber::must($field_number),
            wire_type: $crate::WireType::$wire_type,
        }
    };
}

impl Tag {
    fn v64(&self) -> v64 {
        let f: u32 = self.field_number.into();
        let w: u32 = self.wire_type.tag_bits();
        let t: u32 = (f << 3) | w;
        t.into()
    }
}

impl Packable for Tag {
    fn pack_sz(&self) -> usize {
        let v = self.v64();
        v.pack_sz()
    }

    fn pack(&self, buf: &mut [u8]) {
        let v = self.v64();
        v.pack(buf);
    }
}

impl<'a> Unpackable<'a> for Tag {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let mut up = Unpacker::new(buf);
        let tag: v64 = up.unpack()?;
        let tag: u64 = tag.into();
        if tag > u32::MAX as u64 {
            return Err(Error::TagTooLarge { tag });
        }
        let tag: u32 = tag as u32;
        let f: u32 = tag >> 3;
        let w: u32 = tag & 7;
        let field_number = FieldNumber::new(f)?;
        let wire_type = WireType::new(w)?;
        Ok((
            Tag {
                field_number,
                wire_type,
            },
            up.remain(),
        ))
    }
}

///////////////////////////////////////////// FieldType ////////////////////////////////////////////

/// A FieldType names one encodable proto type and binds it to the native type it packs from and
/// unpacks to.
pub trait FieldType<'a>: Sized {
    const WIRE_TYPE: WireType;

    type Native;

    fn from_native(x: Self::Native) -> Self;

    fn into_native(self) -> Self::Native;
}

///////////////////////////////// FieldPackHelper/FieldUnpackHelper ////////////////////////////////

/// FieldPackHelper packs a tagged field from a native value.
pub trait FieldPackHelper<'a, T: FieldType<'a>> {
    /// The size of encoding self with the given tag.
    fn field_pack_sz(&self, tag: &Tag) -> usize;
    /// Pack the tag into the output buffer.
    fn field_pack(&self, tag: &Tag, out: &mut [u8]);
}

/// FieldUnpackHelper merges decoded fields into a native value.
pub trait FieldUnpackHelper<'a, T: FieldType<'a>> {
    /// Merge the proto into self.
    fn merge_field(&mut self, proto: T);
}

impl<'a, T: FieldType<'a>, F: FieldPackHelper<'a, T>> FieldPackHelper<'a, T> for Vec<F> {
    fn field_pack_sz(&self, tag: &Tag) -> usize {
        self.iter().map(|f| f.field_pack_sz(tag)).sum()
    }

    fn field_pack(&self, tag: &Tag, out: &mut [u8]) {
        let mut out = out;
        for f in self {
            let sz = f.field_pack_sz(tag);
            f.field_pack(tag, &mut out[..sz]);
            out = &mut out[sz..];
        }
    }
}

impl<'a, T: FieldType<'a>, F: FieldUnpackHelper<'a, T> + Default> FieldUnpackHelper<'a, T>
    for Vec<F>
{
    fn merge_field(&mut self, proto: T) {
        // every occurrence appends, contiguous or not
        let mut f = F::default();
        f.merge_field(proto);
        self.push(f);
    }
}

impl<'a, T: FieldType<'a>, F: FieldPackHelper<'a, T>> FieldPackHelper<'a, T> for Option<F> {
    fn field_pack_sz(&self, tag: &Tag) -> usize {
        if let Some(f) = self {
            f.field_pack_sz(tag)
        } else {
            0
        }
    }

    fn field_pack(&self, tag: &Tag, out: &mut [u8]) {
        if let Some(f) = self {
            f.field_pack(tag, out)
        }
    }
}

impl<'a, T: FieldType<'a>, F: FieldUnpackHelper<'a, T> + Default> FieldUnpackHelper<'a, T>
    for Option<F>
{
    fn merge_field(&mut self, proto: T) {
        // singular fields are last-one-wins
        let mut f = F::default();
        f.merge_field(proto);
        *self = Some(f);
    }
}

//////////////////////////////////////////// FieldPacker ///////////////////////////////////////////

/// FieldPacker adapts a (tag, native value) pair to [Packable].
pub struct FieldPacker<'a, 'b, T: FieldType<'a>, F: FieldPackHelper<'a, T>> {
    tag: Tag,
    field_value: &'b F,
    _phantom: std::marker::PhantomData<&'a T>,
}

impl<'a, 'b, T: FieldType<'a>, F: FieldPackHelper<'a, T>> FieldPacker<'a, 'b, T, F> {
    pub fn new(tag: Tag, field_value: &'b F, field_type: std::marker::PhantomData<&'a T>) -> Self {
        Self {
            tag,
            field_value,
            _phantom: field_type,
        }
    }
}

impl<'a, 'b, T: FieldType<'a>, F: FieldPackHelper<'a, T>> Packable for FieldPacker<'a, 'b, T, F> {
    fn pack_sz(&self) -> usize {
        self.field_value.field_pack_sz(&self.tag)
    }

    fn pack(&self, out: &mut [u8]) {
        self.field_value.field_pack(&self.tag, out)
    }
}

////////////////////////////////////////////// Message /////////////////////////////////////////////

/// A Message is a self-describing record that packs to, and unpacks from, the tag/length/value
/// wire format.
pub trait Message<'a>: Default + Packable + Unpackable<'a, Error = Error> {}

////////////////////////////////////////////// Builder /////////////////////////////////////////////

/// Builder accumulates tagged fields into a raw byte buffer.  It makes no attempt to order fields
/// or reject duplicates, which makes it equally useful for composing messages by hand and for
/// manufacturing the adversarial inputs a decoder has to survive.
#[derive(Clone, Debug, Default)]
pub struct Builder {
    buffer: Vec<u8>,
}

impl Builder {
    pub fn push<'a, T, const N: u32>(&mut self, field_value: T::Native) -> &mut Self
    where
        T: FieldType<'a> + 'a,
        T::Native: FieldPackHelper<'a, T> + 'a,
    {
        let tag = Tag {
            field_number: FieldNumber::must(N),
            wire_type: T::WIRE_TYPE,
        };
        let packer = FieldPacker::new(tag, &field_value, std::marker::PhantomData::<&T>);
        stack_pack(packer).append_to_vec(&mut self.buffer);
        self
    }

    pub fn append(&mut self, buffer: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(buffer);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}

///////////////////////////////////////////// mod tests ////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use varbuf::{stack_pack, Unpackable};

    use super::field_types::int64;
    use super::*;

    #[test]
    fn wire_type_round_trip() {
        for bits in 0..6 {
            let wt = WireType::new(bits).unwrap();
            assert_eq!(bits, wt.tag_bits(), "human got wire type {} wrong?", bits);
        }
        assert_eq!(
            Err(Error::UnhandledWireType { wire_type: 6 }),
            WireType::new(6)
        );
        assert_eq!(
            Err(Error::UnhandledWireType { wire_type: 7 }),
            WireType::new(7)
        );
    }

    #[test]
    fn field_number_limits() {
        assert!(FieldNumber::new(0).is_err());
        assert!(FieldNumber::new(1).is_ok());
        assert!(FieldNumber::new(LAST_FIELD_NUMBER).is_ok());
        assert!(FieldNumber::new(LAST_FIELD_NUMBER + 1).is_err());
    }

    #[test]
    fn tag_golden_bytes() {
        let got = stack_pack(tag!(1, Varint)).to_vec();
        assert_eq!(&[0x08], got.as_slice(), "human got tag encoder wrong?");
        let got = stack_pack(tag!(2, LengthDelimited)).to_vec();
        assert_eq!(&[0x12], got.as_slice(), "human got tag encoder wrong?");
        let got = stack_pack(tag!(16, Varint)).to_vec();
        assert_eq!(
            &[0x80, 0x01],
            got.as_slice(),
            "human got tag encoder wrong?"
        );
    }

    #[test]
    fn tag_unpack() {
        let (tag, rem) = Tag::unpack(&[0x12, 0xff]).unwrap();
        assert_eq!(tag.field_number, 2u32);
        assert_eq!(WireType::LengthDelimited, tag.wire_type);
        assert_eq!(&[0xff], rem);
    }

    #[test]
    fn tag_unpack_rejects_field_number_zero() {
        let got = Tag::unpack(&[0x00]);
        assert_eq!(
            Err(Error::InvalidFieldNumber {
                field_number: 0,
                what: "field number must be positive integer",
            }),
            got.map(|_| ()),
        );
    }

    #[test]
    fn tag_unpack_rejects_large_tags() {
        // (1 << 35) as a varint
        let got = Tag::unpack(&[128, 128, 128, 128, 128, 1]);
        assert_eq!(Err(Error::TagTooLarge { tag: 1 << 35 }), got.map(|_| ()));
    }

    #[test]
    fn builder() {
        let mut builder = Builder::default();
        builder.push::<int64, 1>(5);
        builder.append(&[0xde, 0xad]);
        assert_eq!(&[0x08, 0x05, 0xde, 0xad], builder.as_bytes());
    }
}
