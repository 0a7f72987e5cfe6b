use crate::coding::{Decode, DecodeError, Encode, EncodeError, ReasonPhrase, TrackNamespace};

/// Sent by the publisher to reject a `SUBSCRIBE_NAMESPACE`.
/// https://www.ietf.org/archive/id/draft-ietf-moq-transport-14.html#name-subscribe_namespace_error
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeNamespaceError {
    /// The request ID of the SUBSCRIBE_NAMESPACE this message is replying to.
    pub id: u64,

    // Echo back the namespace prefix that was rejected.
    pub namespace_prefix: TrackNamespace,

    // An error code.
    pub code: u64,

    // An optional, human-readable reason.
    pub reason: ReasonPhrase,
}

impl Decode for SubscribeNamespaceError {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let namespace_prefix = TrackNamespace::decode(r)?;
        let code = u64::decode(r)?;
        let reason = ReasonPhrase::decode(r)?;

        Ok(Self {
            id,
            namespace_prefix,
            code,
            reason,
        })
    }
}

impl Encode for SubscribeNamespaceError {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.namespace_prefix.encode(w)?;
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

        let msg = SubscribeNamespaceError {
            id: 12345,
            namespace_prefix: crate::coding::TrackNamespace::from_utf8_path("path/prefix"),
            code: 0x2,
            reason: ReasonPhrase("unauthorized".to_string()),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = SubscribeNamespaceError::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
