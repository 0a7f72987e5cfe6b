use super::{Decode, DecodeError, Encode, EncodeError};
use bytes::{Buf, BufMut};

/// The largest value representable by the QUIC variable-length integer encoding: 2^62 - 1.
pub const MAX_VARINT: u64 = (1 << 62) - 1;

#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
#[error("value exceeds the 62-bit varint range")]
pub struct BoundsExceeded;

/// A QUIC-style variable-length integer in `[0, 2^62)`.
///
/// Encoded as 1, 2, 4, or 8 bytes; the top two bits of the first byte select
/// the length and the remaining bits hold the value, big-endian. The shortest
/// form that fits the value is always chosen on encode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct VarInt(u64);

impl VarInt {
    pub const MAX: VarInt = VarInt(MAX_VARINT);
    pub const ZERO: VarInt = VarInt(0);

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for VarInt {
    type Error = BoundsExceeded;

    fn try_from(v: u64) -> Result<Self, Self::Error> {
        if v > MAX_VARINT {
            return Err(BoundsExceeded);
        }
        Ok(Self(v))
    }
}

impl From<VarInt> for u64 {
    fn from(v: VarInt) -> Self {
        v.0
    }
}

impl Decode for VarInt {
    fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
        Self::decode_remaining(r, 1)?;

        let first = r.chunk()[0];
        let tag = first >> 6;
        let len = 1usize << tag;

        Self::decode_remaining(r, len)?;

        let mut buf = [0u8; 8];
        r.copy_to_slice(&mut buf[..len]);

        // Mask off the length-tag bits from the first byte.
        buf[0] &= 0x3f;

        let value = match len {
            1 => buf[0] as u64,
            2 => u16::from_be_bytes([buf[0], buf[1]]) as u64,
            4 => u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64,
            8 => u64::from_be_bytes(buf),
            _ => unreachable!("1 << tag with tag in 0..=3 is always 1, 2, 4, or 8"),
        };

        Ok(VarInt(value))
    }
}

impl Encode for VarInt {
    fn encode<W: BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        let v = self.0;

        if v <= 0x3f {
            Self::encode_remaining(w, 1)?;
            w.put_u8(v as u8);
        } else if v <= 0x3fff {
            Self::encode_remaining(w, 2)?;
            w.put_u16(0x4000 | v as u16);
        } else if v <= 0x3fff_ffff {
            Self::encode_remaining(w, 4)?;
            w.put_u32(0x8000_0000 | v as u32);
        } else {
            debug_assert!(v <= MAX_VARINT);
            Self::encode_remaining(w, 8)?;
            w.put_u64(0xc000_0000_0000_0000 | v);
        }

        Ok(())
    }
}

impl Encode for u64 {
    fn encode<W: BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        VarInt::try_from(*self)?.encode(w)
    }
}

impl Decode for u64 {
    fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
        Ok(VarInt::decode(r)?.into_inner())
    }
}

impl Encode for usize {
    fn encode<W: BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for usize {
    fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let v = u64::decode(r)?;
        usize::try_from(v).map_err(|_| DecodeError::BoundsExceeded(BoundsExceeded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn shortest_form_roundtrip() {
        let cases = [0u64, 1, 0x3f, 0x40, 0x3fff, 0x4000, 0x3fff_ffff, 0x4000_0000, MAX_VARINT];

        for v in cases {
            let mut buf = BytesMut::new();
            v.encode(&mut buf).unwrap();
            let len = buf.len();
            assert!(matches!(len, 1 | 2 | 4 | 8));
            let decoded = u64::decode(&mut buf).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn first_byte_selects_length() {
        let mut buf = BytesMut::new();
        0x3fu64.encode(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![0x3f]);

        let mut buf = BytesMut::new();
        0x40u64.encode(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![0x40, 0x40]);
    }

    #[test]
    fn decode_needs_more() {
        let data = vec![0x80]; // tag selects a 4-byte form but only 1 byte is present
        let mut buf = bytes::Bytes::from(data);
        let err = u64::decode(&mut buf).unwrap_err();
        assert!(matches!(err, DecodeError::More(3)));
    }

    #[test]
    fn bounds_exceeded() {
        assert!(VarInt::try_from(MAX_VARINT + 1).is_err());
        assert!(VarInt::try_from(MAX_VARINT).is_ok());
    }
}
