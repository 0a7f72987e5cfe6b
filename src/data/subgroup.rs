use crate::coding::{Decode, DecodeError, Encode, EncodeError, Extensions};
use crate::data::{ObjectStatus, StreamHeaderType};

/// The header of a subgroup stream: one per `(track_alias, group_id, subgroup_id)`.
///
/// `subgroup_id` is only present on the wire for [`StreamHeaderType`] variants
/// whose id is explicit (not zero, not first-object-id).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubgroupHeader {
    pub header_type: StreamHeaderType,
    pub track_alias: u64,
    pub group_id: u64,
    pub subgroup_id: Option<u64>,
    pub publisher_priority: u8,
}

impl SubgroupHeader {
    /// Decode the header body for a type already read off the stream by
    /// [`crate::data::StreamHeader`].
    pub fn decode<R: bytes::Buf>(header_type: StreamHeaderType, r: &mut R) -> Result<Self, DecodeError> {
        let track_alias = u64::decode(r)?;
        let group_id = u64::decode(r)?;
        let subgroup_id = match header_type.has_subgroup_id() {
            true => Some(u64::decode(r)?),
            false => None,
        };
        let publisher_priority = u8::decode(r)?;

        Ok(Self {
            header_type,
            track_alias,
            group_id,
            subgroup_id,
            publisher_priority,
        })
    }
}

impl Encode for SubgroupHeader {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.header_type.encode(w)?;
        self.track_alias.encode(w)?;
        self.group_id.encode(w)?;
        if self.header_type.has_subgroup_id() {
            match self.subgroup_id {
                Some(subgroup_id) => subgroup_id.encode(w)?,
                None => return Err(EncodeError::MissingField("subgroup_id".to_string())),
            }
        }
        self.publisher_priority.encode(w)?;

        Ok(())
    }
}

/// A single object within a subgroup stream.
///
/// `object_id_delta` is relative to the previous object in the subgroup (or
/// to the subgroup's starting id for the first object); callers track the
/// running total.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubgroupObject {
    pub object_id_delta: u64,
    pub extensions: Option<Extensions>,
    pub status: Option<ObjectStatus>,
    pub payload: Option<bytes::Bytes>,
}

impl SubgroupObject {
    pub fn decode<R: bytes::Buf>(header_type: StreamHeaderType, r: &mut R) -> Result<Self, DecodeError> {
        let object_id_delta = u64::decode(r)?;

        let extensions = match header_type.has_extension_headers() {
            true => Some(Extensions::decode(r)?),
            false => None,
        };

        let payload_length = usize::decode(r)?;
        let (status, payload) = if payload_length == 0 {
            (Some(ObjectStatus::decode(r)?), None)
        } else {
            Self::decode_remaining(r, payload_length)?;
            (None, Some(r.copy_to_bytes(payload_length)))
        };

        Ok(Self {
            object_id_delta,
            extensions,
            status,
            payload,
        })
    }

    pub fn encode<W: bytes::BufMut>(&self, header_type: StreamHeaderType, w: &mut W) -> Result<(), EncodeError> {
        self.object_id_delta.encode(w)?;

        if header_type.has_extension_headers() {
            match &self.extensions {
                Some(extensions) => extensions.encode(w)?,
                None => return Err(EncodeError::MissingField("extensions".to_string())),
            }
        }

        match &self.payload {
            Some(payload) => {
                payload.len().encode(w)?;
                Self::encode_remaining(w, payload.len())?;
                w.put_slice(payload);
            }
            None => {
                0usize.encode(w)?;
                match self.status {
                    Some(status) => status.encode(w)?,
                    None => return Err(EncodeError::MissingField("status".to_string())),
                }
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
    fn encode_decode_subgroup_header_explicit_id() {
        let mut buf = BytesMut::new();
        let header = SubgroupHeader {
            header_type: StreamHeaderType::SubgroupId,
            track_alias: 10,
            group_id: 0,
            subgroup_id: Some(1),
            publisher_priority: 100,
        };
        header.encode(&mut buf).unwrap();
        let decoded = SubgroupHeader::decode(StreamHeaderType::SubgroupId, &mut buf).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn encode_decode_subgroup_header_zero_id() {
        let mut buf = BytesMut::new();
        let header = SubgroupHeader {
            header_type: StreamHeaderType::SubgroupZeroId,
            track_alias: 10,
            group_id: 4,
            subgroup_id: None,
            publisher_priority: 10,
        };
        header.encode(&mut buf).unwrap();
        let decoded = SubgroupHeader::decode(StreamHeaderType::SubgroupZeroId, &mut buf).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn encode_decode_subgroup_object_with_payload() {
        let mut buf = BytesMut::new();
        let obj = SubgroupObject {
            object_id_delta: 0,
            extensions: None,
            status: None,
            payload: Some(Bytes::from("hello")),
        };
        obj.encode(StreamHeaderType::SubgroupZeroId, &mut buf).unwrap();
        let decoded = SubgroupObject::decode(StreamHeaderType::SubgroupZeroId, &mut buf).unwrap();
        assert_eq!(decoded, obj);
    }

    #[test]
    fn encode_decode_subgroup_object_with_status() {
        let mut buf = BytesMut::new();
        let obj = SubgroupObject {
            object_id_delta: 1,
            extensions: None,
            status: Some(ObjectStatus::EndOfGroup),
            payload: None,
        };
        obj.encode(StreamHeaderType::SubgroupZeroId, &mut buf).unwrap();
        let decoded = SubgroupObject::decode(StreamHeaderType::SubgroupZeroId, &mut buf).unwrap();
        assert_eq!(decoded, obj);
    }

    #[test]
    fn encode_decode_subgroup_object_with_extensions() {
        let mut buf = BytesMut::new();
        let mut extensions = Extensions::new();
        extensions.set_int(0x2, 7);
        let obj = SubgroupObject {
            object_id_delta: 0,
            extensions: Some(extensions),
            status: None,
            payload: Some(Bytes::from("x")),
        };
        obj.encode(StreamHeaderType::SubgroupZeroIdExt, &mut buf).unwrap();
        let decoded = SubgroupObject::decode(StreamHeaderType::SubgroupZeroIdExt, &mut buf).unwrap();
        assert_eq!(decoded, obj);
    }
}
