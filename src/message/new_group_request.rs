use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Sent by the subscriber to ask the publisher to start a new group early,
/// ahead of whatever cadence the publisher would otherwise use.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewGroupRequest {
    /// The request ID of the Subscribe this refers to.
    pub request_id: u64,

    /// The track alias the publisher should roll over.
    pub track_alias: u64,
}

impl Decode for NewGroupRequest {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let request_id = u64::decode(r)?;
        let track_alias = u64::decode(r)?;
        Ok(Self { request_id, track_alias })
    }
}

impl Encode for NewGroupRequest {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.request_id.encode(w)?;
        self.track_alias.encode(w)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let msg = NewGroupRequest {
            request_id: 12345,
            track_alias: 6,
        };
        msg.encode(&mut buf).unwrap();
        let decoded = NewGroupRequest::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
