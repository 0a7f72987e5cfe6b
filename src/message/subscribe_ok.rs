use crate::coding::{Decode, DecodeError, Encode, EncodeError, Location, Parameters};
use crate::message::GroupOrder;

/// Sent by the publisher to accept a Subscribe.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeOk {
    /// The request ID of the SUBSCRIBE this message is replying to
    pub id: u64,

    /// The time in milliseconds after which the subscription is no longer valid.
    pub expires: u64,

    /// Order groups will be delivered in
    pub group_order: GroupOrder,

    /// If content_exists, then largest_location is the location of the largest
    /// object available for this track
    pub content_exists: bool,
    pub largest_location: Option<Location>,

    pub params: Parameters,
}

impl Decode for SubscribeOk {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let expires = u64::decode(r)?;
        let group_order = GroupOrder::decode(r)?;
        let content_exists = bool::decode(r)?;
        let largest_location = match content_exists {
            true => Some(Location::decode(r)?),
            false => None,
        };
        let params = Parameters::decode(r)?;

        Ok(Self {
            id,
            expires,
            group_order,
            content_exists,
            largest_location,
            params,
        })
    }
}

impl Encode for SubscribeOk {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.expires.encode(w)?;
        self.group_order.encode(w)?;
        self.content_exists.encode(w)?;
        if self.content_exists {
            match &self.largest_location {
                Some(largest) => largest.encode(w)?,
                None => return Err(EncodeError::MissingField("largest_location".to_string())),
            }
        }
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

        let msg = SubscribeOk {
            id: 12345,
            expires: 3600,
            group_order: GroupOrder::Publisher,
            content_exists: true,
            largest_location: Some(Location::new(2, 3)),
            params: Parameters::new(),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = SubscribeOk::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn encode_missing_fields() {
        let mut buf = BytesMut::new();

        let msg = SubscribeOk {
            id: 12345,
            expires: 3600,
            group_order: GroupOrder::Publisher,
            content_exists: true,
            largest_location: None,
            params: Parameters::new(),
        };
        assert!(matches!(
            msg.encode(&mut buf).unwrap_err(),
            EncodeError::MissingField(_)
        ));
    }
}
