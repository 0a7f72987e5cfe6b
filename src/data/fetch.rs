use crate::coding::{Decode, DecodeError, Encode, EncodeError, Extensions};
use crate::data::{ObjectStatus, StreamHeaderType};

/// The header of a fetch stream: carries only the request id the objects
/// that follow answer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchHeader {
    pub header_type: StreamHeaderType,
    pub request_id: u64,
}

impl FetchHeader {
    pub fn decode<R: bytes::Buf>(header_type: StreamHeaderType, r: &mut R) -> Result<Self, DecodeError> {
        let request_id = u64::decode(r)?;
        Ok(Self { header_type, request_id })
    }
}

impl Encode for FetchHeader {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.header_type.encode(w)?;
        self.request_id.encode(w)?;
        Ok(())
    }
}

/// A single object within a fetch stream.
///
/// Unlike subgroup streams, fetch streams carry full `(group_id,
/// subgroup_id, object_id)` coordinates and extensions on every object,
/// since a fetch response can span groups and subgroups.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchObject {
    pub group_id: u64,
    pub subgroup_id: u64,
    pub object_id: u64,
    pub publisher_priority: u8,
    pub extensions: Extensions,
    pub status: Option<ObjectStatus>,
    pub payload: Option<bytes::Bytes>,
}

impl Decode for FetchObject {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let group_id = u64::decode(r)?;
        let subgroup_id = u64::decode(r)?;
        let object_id = u64::decode(r)?;
        let publisher_priority = u8::decode(r)?;
        let extensions = Extensions::decode(r)?;
        let payload_length = usize::decode(r)?;
        let (status, payload) = if payload_length == 0 {
            (Some(ObjectStatus::decode(r)?), None)
        } else {
            Self::decode_remaining(r, payload_length)?;
            (None, Some(r.copy_to_bytes(payload_length)))
        };

        Ok(Self {
            group_id,
            subgroup_id,
            object_id,
            publisher_priority,
            extensions,
            status,
            payload,
        })
    }
}

impl Encode for FetchObject {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.group_id.encode(w)?;
        self.subgroup_id.encode(w)?;
        self.object_id.encode(w)?;
        self.publisher_priority.encode(w)?;
        self.extensions.encode(w)?;

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
    fn encode_decode_fetch_header() {
        let mut buf = BytesMut::new();
        let header = FetchHeader {
            header_type: StreamHeaderType::Fetch,
            request_id: 10,
        };
        header.encode(&mut buf).unwrap();
        let decoded = FetchHeader::decode(StreamHeaderType::Fetch, &mut buf).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn encode_decode_fetch_object_with_payload() {
        let mut buf = BytesMut::new();
        let obj = FetchObject {
            group_id: 0,
            subgroup_id: 0,
            object_id: 4,
            publisher_priority: 20,
            extensions: Extensions::new(),
            status: None,
            payload: Some(Bytes::from("payload")),
        };
        obj.encode(&mut buf).unwrap();
        let decoded = FetchObject::decode(&mut buf).unwrap();
        assert_eq!(decoded, obj);
    }

    #[test]
    fn encode_decode_fetch_object_with_status() {
        let mut buf = BytesMut::new();
        let obj = FetchObject {
            group_id: 1,
            subgroup_id: 0,
            object_id: 0,
            publisher_priority: 20,
            extensions: Extensions::new(),
            status: Some(ObjectStatus::ObjectDoesNotExist),
            payload: None,
        };
        obj.encode(&mut buf).unwrap();
        let decoded = FetchObject::decode(&mut buf).unwrap();
        assert_eq!(decoded, obj);
    }
}
