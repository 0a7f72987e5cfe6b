use crate::coding::{Decode, DecodeError, Encode, EncodeError, Location, Parameters};

/// Sent by the subscriber to narrow or extend the range of an open SUBSCRIBE.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeUpdate {
    /// The request ID of the SUBSCRIBE this message is updating.
    pub id: u64,

    pub start_location: Location,
    /// The end group id, plus 1. A value of 0 means open-ended.
    pub end_group_id: u64,

    pub subscriber_priority: u8,

    pub params: Parameters,
}

impl Decode for SubscribeUpdate {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;

        let start_location = Location::decode(r)?;
        let end_group_id = u64::decode(r)?;

        let subscriber_priority = u8::decode(r)?;

        let params = Parameters::decode(r)?;

        Ok(Self {
            id,
            start_location,
            end_group_id,
            subscriber_priority,
            params,
        })
    }
}

impl Encode for SubscribeUpdate {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;

        self.start_location.encode(w)?;
        self.end_group_id.encode(w)?;

        self.subscriber_priority.encode(w)?;

        self.params.encode(w)?;

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

        let mut params = Parameters::new();
        params.push(crate::coding::Parameter::int(0x7c, 456).unwrap());

        let msg = SubscribeUpdate {
            id: 1000,
            start_location: Location::new(1, 1),
            end_group_id: 100000,
            subscriber_priority: 127,
            params,
        };
        msg.encode(&mut buf).unwrap();
        let decoded = SubscribeUpdate::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }
}
