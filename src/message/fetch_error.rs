use crate::coding::{Decode, DecodeError, Encode, EncodeError, ReasonPhrase};

/// Sent by the publisher to reject a `FETCH`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchError {
    /// The request ID of the FETCH this message is replying to.
    pub id: u64,

    /// An error code.
    pub code: u64,

    /// An optional, human-readable reason.
    pub reason: ReasonPhrase,
}

impl Decode for FetchError {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;

        let code = u64::decode(r)?;
        let reason = ReasonPhrase::decode(r)?;

        Ok(Self { id, code, reason })
    }
}

impl Encode for FetchError {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;

        self.code.encode(w)?;
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

        let msg = FetchError {
            id: 12345,
            code: 0x2,
            reason: ReasonPhrase("not found".to_string()),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = FetchError::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
