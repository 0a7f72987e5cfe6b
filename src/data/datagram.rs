use crate::coding::{Decode, DecodeError, Encode, EncodeError, Extensions};
use crate::data::ObjectStatus;

/// The type byte of an [`Datagram`]: encodes whether extensions are present
/// and whether this object ends its group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DatagramType {
    NoEndOfGroupNoExtensions = 0x0,
    NoEndOfGroupWithExtensions = 0x1,
    EndOfGroupNoExtensions = 0x2,
    EndOfGroupWithExtensions = 0x3,
    StatusNoExtensions = 0x4,
    StatusWithExtensions = 0x5,
}

impl DatagramType {
    pub fn has_extensions(&self) -> bool {
        matches!(
            self,
            Self::NoEndOfGroupWithExtensions | Self::EndOfGroupWithExtensions | Self::StatusWithExtensions
        )
    }

    pub fn is_status(&self) -> bool {
        matches!(self, Self::StatusNoExtensions | Self::StatusWithExtensions)
    }

    pub fn is_end_of_group(&self) -> bool {
        matches!(self, Self::EndOfGroupNoExtensions | Self::EndOfGroupWithExtensions)
    }
}

impl Decode for DatagramType {
    fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x0 => Ok(Self::NoEndOfGroupNoExtensions),
            0x1 => Ok(Self::NoEndOfGroupWithExtensions),
            0x2 => Ok(Self::EndOfGroupNoExtensions),
            0x3 => Ok(Self::EndOfGroupWithExtensions),
            0x4 => Ok(Self::StatusNoExtensions),
            0x5 => Ok(Self::StatusWithExtensions),
            _ => Err(DecodeError::InvalidDatagramType),
        }
    }
}

impl Encode for DatagramType {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

/// A single object carried in its own UDP datagram.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Datagram {
    pub datagram_type: DatagramType,
    pub track_alias: u64,
    pub group_id: u64,
    pub object_id: u64,
    pub publisher_priority: u8,
    pub extensions: Option<Extensions>,
    pub status: Option<ObjectStatus>,
    pub payload: Option<bytes::Bytes>,
}

impl Decode for Datagram {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let datagram_type = DatagramType::decode(r)?;
        let track_alias = u64::decode(r)?;
        let group_id = u64::decode(r)?;
        let object_id = u64::decode(r)?;
        let publisher_priority = u8::decode(r)?;

        let extensions = match datagram_type.has_extensions() {
            true => Some(Extensions::decode(r)?),
            false => None,
        };

        let (status, payload) = if datagram_type.is_status() {
            (Some(ObjectStatus::decode(r)?), None)
        } else {
            (None, Some(r.copy_to_bytes(r.remaining())))
        };

        Ok(Self {
            datagram_type,
            track_alias,
            group_id,
            object_id,
            publisher_priority,
            extensions,
            status,
            payload,
        })
    }
}

impl Encode for Datagram {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.datagram_type.encode(w)?;
        self.track_alias.encode(w)?;
        self.group_id.encode(w)?;
        self.object_id.encode(w)?;
        self.publisher_priority.encode(w)?;

        if self.datagram_type.has_extensions() {
            match &self.extensions {
                Some(extensions) => extensions.encode(w)?,
                None => return Err(EncodeError::MissingField("extensions".to_string())),
            }
        }

        if self.datagram_type.is_status() {
            match &self.status {
                Some(status) => status.encode(w)?,
                None => return Err(EncodeError::MissingField("status".to_string())),
            }
        } else {
            match &self.payload {
                Some(payload) => {
                    Self::encode_remaining(w, payload.len())?;
                    w.put_slice(payload);
                }
                None => return Err(EncodeError::MissingField("payload".to_string())),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode_datagram_type() {
        let mut buf = BytesMut::new();
        for (dt, byte) in [
            (DatagramType::NoEndOfGroupNoExtensions, 0x00),
            (DatagramType::NoEndOfGroupWithExtensions, 0x01),
            (DatagramType::EndOfGroupNoExtensions, 0x02),
            (DatagramType::EndOfGroupWithExtensions, 0x03),
            (DatagramType::StatusNoExtensions, 0x04),
            (DatagramType::StatusWithExtensions, 0x05),
        ] {
            dt.encode(&mut buf).unwrap();
            assert_eq!(buf.to_vec(), vec![byte]);
            let decoded = DatagramType::decode(&mut buf).unwrap();
            assert_eq!(decoded, dt);
        }
    }

    #[test]
    fn encode_decode_datagram_without_extensions() {
        let mut buf = BytesMut::new();
        let msg = Datagram {
            datagram_type: DatagramType::NoEndOfGroupNoExtensions,
            track_alias: 12,
            group_id: 10,
            object_id: 1234,
            publisher_priority: 127,
            extensions: None,
            status: None,
            payload: Some(Bytes::from("payload")),
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(13, buf.len());
        let decoded = Datagram::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn encode_decode_datagram_with_extensions() {
        let mut buf = BytesMut::new();
        let mut extensions = Extensions::new();
        extensions.set_bytes(123, vec![0x00, 0x01, 0x02, 0x03]);

        let msg = Datagram {
            datagram_type: DatagramType::NoEndOfGroupWithExtensions,
            track_alias: 12,
            group_id: 10,
            object_id: 1234,
            publisher_priority: 127,
            extensions: Some(extensions),
            status: None,
            payload: Some(Bytes::from("payload")),
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(21, buf.len());
        let decoded = Datagram::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn encode_decode_status_datagram() {
        let mut buf = BytesMut::new();
        let msg = Datagram {
            datagram_type: DatagramType::StatusNoExtensions,
            track_alias: 12,
            group_id: 10,
            object_id: 1234,
            publisher_priority: 127,
            extensions: None,
            status: Some(ObjectStatus::EndOfTrack),
            payload: None,
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(7, buf.len());
        let decoded = Datagram::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn encode_missing_fields_errors() {
        let mut buf = BytesMut::new();

        let msg = Datagram {
            datagram_type: DatagramType::NoEndOfGroupWithExtensions,
            track_alias: 12,
            group_id: 10,
            object_id: 1234,
            publisher_priority: 127,
            extensions: None,
            status: None,
            payload: Some(Bytes::from("payload")),
        };
        assert!(matches!(
            msg.encode(&mut buf).unwrap_err(),
            EncodeError::MissingField(_)
        ));

        let msg = Datagram {
            datagram_type: DatagramType::NoEndOfGroupNoExtensions,
            track_alias: 12,
            group_id: 10,
            object_id: 1234,
            publisher_priority: 127,
            extensions: None,
            status: None,
            payload: None,
        };
        assert!(matches!(
            msg.encode(&mut buf).unwrap_err(),
            EncodeError::MissingField(_)
        ));
    }
}
