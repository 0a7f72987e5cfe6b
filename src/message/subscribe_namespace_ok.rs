use crate::coding::{Decode, DecodeError, Encode, EncodeError, TrackNamespace};

/// Sent by the publisher to accept a `SUBSCRIBE_NAMESPACE`.
/// https://www.ietf.org/archive/id/draft-ietf-moq-transport-14.html#name-subscribe_namespace_ok
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeNamespaceOk {
    /// The request ID of the SUBSCRIBE_NAMESPACE this message is replying to.
    pub id: u64,

    // Echo back the namespace prefix that was subscribed to.
    pub namespace_prefix: TrackNamespace,
}

impl Decode for SubscribeNamespaceOk {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let namespace_prefix = TrackNamespace::decode(r)?;
        Ok(Self { id, namespace_prefix })
    }
}

impl Encode for SubscribeNamespaceOk {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.namespace_prefix.encode(w)?;
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

        let msg = SubscribeNamespaceOk {
            id: 12345,
            namespace_prefix: TrackNamespace::from_utf8_path("path/prefix"),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = SubscribeNamespaceOk::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
