use crate::coding::{Decode, DecodeError, Encode, EncodeError, Location, Parameters};
use crate::message::GroupOrder;

/// Sent by the publisher to answer a TrackStatus request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrackStatusOk {
    /// The request ID of the TrackStatus this message is replying to.
    pub id: u64,

    pub group_order: GroupOrder,

    pub content_exists: bool,
    pub largest_location: Option<Location>,

    pub params: Parameters,
}

impl Decode for TrackStatusOk {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let group_order = GroupOrder::decode(r)?;
        let content_exists = bool::decode(r)?;
        let largest_location = match content_exists {
            true => Some(Location::decode(r)?),
            false => None,
        };
        let params = Parameters::decode(r)?;

        Ok(Self {
            id,
            group_order,
            content_exists,
            largest_location,
            params,
        })
    }
}

impl Encode for TrackStatusOk {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
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

        let msg = TrackStatusOk {
            id: 12345,
            group_order: GroupOrder::Publisher,
            content_exists: true,
            largest_location: Some(Location::new(2, 3)),
            params: Parameters::new(),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = TrackStatusOk::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn encode_missing_fields() {
        let mut buf = BytesMut::new();

        let msg = TrackStatusOk {
            id: 12345,
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
