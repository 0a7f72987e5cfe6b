use crate::coding::{Decode, DecodeError, Encode, EncodeError, ReasonPhrase};

/// Sent by the publisher to reject a TrackStatus request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrackStatusError {
    /// The request ID of the TrackStatus this message is replying to.
    pub id: u64,

    pub error_code: u64,
    pub reason: ReasonPhrase,
}

impl Decode for TrackStatusError {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let error_code = u64::decode(r)?;
        let reason = ReasonPhrase::decode(r)?;

        Ok(Self { id, error_code, reason })
    }
}

impl Encode for TrackStatusError {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.error_code.encode(w)?;
        self.reason.encode(w)?;

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

        let msg = TrackStatusError {
            id: 12345,
            error_code: 0x2,
            reason: ReasonPhrase("no such track".to_string()),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = TrackStatusError::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
