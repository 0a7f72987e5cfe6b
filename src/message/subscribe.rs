use crate::coding::{Decode, DecodeError, Encode, EncodeError, Location, Parameters, TrackNamespace};
use crate::message::{FilterType, GroupOrder};

/// Sent by a subscriber to request a track's current and future objects.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subscribe {
    /// The request ID, echoed back in SUBSCRIBE_OK/SUBSCRIBE_ERROR.
    pub id: u64,

    /// The identifier the publisher should use for this track on the wire.
    pub track_alias: u64,

    pub track_namespace: TrackNamespace,
    pub track_name: String,

    pub subscriber_priority: u8,
    pub group_order: GroupOrder,

    pub filter_type: FilterType,

    /// Only present for `AbsoluteStart`/`AbsoluteRange` filter types.
    pub start_location: Option<Location>,
    /// Only present for the `AbsoluteRange` filter type.
    pub end_group_id: Option<u64>,

    pub params: Parameters,
}

impl Decode for Subscribe {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let track_alias = u64::decode(r)?;

        let track_namespace = TrackNamespace::decode(r)?;
        let track_name = String::decode(r)?;

        let subscriber_priority = u8::decode(r)?;
        let group_order = GroupOrder::decode(r)?;

        let filter_type = FilterType::decode(r)?;
        let (start_location, end_group_id) = match filter_type {
            FilterType::AbsoluteStart => (Some(Location::decode(r)?), None),
            FilterType::AbsoluteRange => (Some(Location::decode(r)?), Some(u64::decode(r)?)),
            _ => (None, None),
        };

        let params = Parameters::decode(r)?;

        Ok(Self {
            id,
            track_alias,
            track_namespace,
            track_name,
            subscriber_priority,
            group_order,
            filter_type,
            start_location,
            end_group_id,
            params,
        })
    }
}

impl Encode for Subscribe {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.track_alias.encode(w)?;

        self.track_namespace.encode(w)?;
        self.track_name.encode(w)?;

        self.subscriber_priority.encode(w)?;
        self.group_order.encode(w)?;

        self.filter_type.encode(w)?;
        match self.filter_type {
            FilterType::AbsoluteStart => {
                let start = self
                    .start_location
                    .ok_or_else(|| EncodeError::MissingField("start_location".to_string()))?;
                start.encode(w)?;
            }
            FilterType::AbsoluteRange => {
                let start = self
                    .start_location
                    .ok_or_else(|| EncodeError::MissingField("start_location".to_string()))?;
                start.encode(w)?;
                let end = self
                    .end_group_id
                    .ok_or_else(|| EncodeError::MissingField("end_group_id".to_string()))?;
                end.encode(w)?;
            }
            _ => {}
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
    fn encode_decode_next_group_start() {
        let mut buf = BytesMut::new();

        let msg = Subscribe {
            id: 12345,
            track_alias: 7,
            track_namespace: TrackNamespace::from_utf8_path("test/path/to/resource"),
            track_name: "audiotrack".to_string(),
            subscriber_priority: 127,
            group_order: GroupOrder::Publisher,
            filter_type: FilterType::NextGroupStart,
            start_location: None,
            end_group_id: None,
            params: Parameters::new(),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = Subscribe::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn encode_decode_absolute_range() {
        let mut buf = BytesMut::new();

        let msg = Subscribe {
            id: 12345,
            track_alias: 7,
            track_namespace: TrackNamespace::from_utf8_path("test/path/to/resource"),
            track_name: "audiotrack".to_string(),
            subscriber_priority: 127,
            group_order: GroupOrder::Descending,
            filter_type: FilterType::AbsoluteRange,
            start_location: Some(Location::new(12345, 67890)),
            end_group_id: Some(23456),
            params: Parameters::new(),
        };
        msg.encode(&mut buf).unwrap();
        let decoded = Subscribe::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn encode_missing_fields() {
        let mut buf = BytesMut::new();

        let msg = Subscribe {
            id: 12345,
            track_alias: 7,
            track_namespace: TrackNamespace::from_utf8_path("test/path/to/resource"),
            track_name: "audiotrack".to_string(),
            subscriber_priority: 127,
            group_order: GroupOrder::Publisher,
            filter_type: FilterType::AbsoluteStart,
            start_location: None,
            end_group_id: None,
            params: Parameters::new(),
        };
        assert!(matches!(
            msg.encode(&mut buf).unwrap_err(),
            EncodeError::MissingField(_)
        ));
    }
}
