//! Step over a field payload without interpreting it.  This is what keeps old decoders usable
//! against messages from newer schemas: a field number the decoder does not recognize still
//! carries enough wire-type information to be measured and discarded.

use varbuf::{v64, Unpacker};

use crate::{Error, Tag, WireType};

/// Skip the payload of a field bearing `wire_type`, returning the number of bytes consumed from
/// the front of `buf`.  The cursor and the group-nesting depth advance together: start-group
/// raises the depth, end-group lowers it, and the walk ends when the depth returns to zero.  An
/// end-group with no start-group open is an error, as is a payload that outruns the buffer.
pub fn skip(wire_type: WireType, buf: &[u8]) -> Result<usize, Error> {
    let mut up = Unpacker::new(buf);
    let mut wire_type = wire_type;
    let mut depth: u32 = 0;
    loop {
        match wire_type {
            WireType::Varint => {
                let _: v64 = up.unpack()?;
            }
            WireType::SixtyFour => {
                let _: u64 = up.unpack()?;
            }
            WireType::LengthDelimited => {
                let v: v64 = up.unpack()?;
                let length: u64 = v.into();
                let length: usize = match usize::try_from(length) {
                    Ok(x) => x,
                    Err(_) => {
                        return Err(Error::InvalidLength { length });
                    }
                };
                if up.remain().len() < length {
                    return Err(Error::BufferTooShort {
                        required: length,
                        had: up.remain().len(),
                    });
                }
                up.advance(length);
            }
            WireType::StartGroup => {
                depth += 1;
            }
            WireType::EndGroup => {
                if depth == 0 {
                    return Err(Error::UnexpectedEndOfGroup);
                }
                depth -= 1;
            }
            WireType::ThirtyTwo => {
                let _: u32 = up.unpack()?;
            }
        }
        if depth == 0 {
            break;
        }
        let tag: Tag = up.unpack()?;
        wire_type = tag.wire_type;
    }
    Ok(buf.len() - up.remain().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_varint() {
        assert_eq!(Ok(2), skip(WireType::Varint, &[0x96, 0x01, 0xaa]));
        assert_eq!(Ok(1), skip(WireType::Varint, &[0x05]));
    }

    #[test]
    fn skip_varint_truncated() {
        assert_eq!(
            Err(Error::BufferTooShort { required: 1, had: 0 }),
            skip(WireType::Varint, &[]),
        );
    }

    #[test]
    fn skip_fixed_widths() {
        assert_eq!(Ok(8), skip(WireType::SixtyFour, &[0u8; 9]));
        assert_eq!(Ok(4), skip(WireType::ThirtyTwo, &[0u8; 9]));
        assert_eq!(
            Err(Error::BufferTooShort { required: 8, had: 3 }),
            skip(WireType::SixtyFour, &[0u8; 3]),
        );
        assert_eq!(
            Err(Error::BufferTooShort { required: 4, had: 3 }),
            skip(WireType::ThirtyTwo, &[0u8; 3]),
        );
    }

    #[test]
    fn skip_length_delimited() {
        assert_eq!(
            Ok(4),
            skip(WireType::LengthDelimited, &[0x03, 0x01, 0x02, 0x03, 0x09]),
        );
        assert_eq!(Ok(1), skip(WireType::LengthDelimited, &[0x00]));
        assert_eq!(
            Err(Error::BufferTooShort { required: 5, had: 2 }),
            skip(WireType::LengthDelimited, &[0x05, 0x01, 0x02]),
        );
    }

    #[test]
    fn skip_group() {
        // field 1 varint, then the end-group tag
        assert_eq!(Ok(3), skip(WireType::StartGroup, &[0x08, 0x05, 0x0c]));
        // empty group
        assert_eq!(Ok(1), skip(WireType::StartGroup, &[0x0c]));
    }

    #[test]
    fn skip_nested_group() {
        // start of field 1's group, its end, then the outer end
        assert_eq!(Ok(3), skip(WireType::StartGroup, &[0x0b, 0x0c, 0x0c]));
        // inner group wraps a length-delimited field
        assert_eq!(
            Ok(6),
            skip(
                WireType::StartGroup,
                &[0x0b, 0x12, 0x01, 0xff, 0x0c, 0x0c, 0x08],
            ),
        );
    }

    #[test]
    fn skip_group_truncated() {
        assert_eq!(
            Err(Error::BufferTooShort { required: 1, had: 0 }),
            skip(WireType::StartGroup, &[0x08]),
        );
    }

    #[test]
    fn skip_unmatched_end_group() {
        assert_eq!(Err(Error::UnexpectedEndOfGroup), skip(WireType::EndGroup, &[]));
    }
}
