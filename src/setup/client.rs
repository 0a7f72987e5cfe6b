use super::Versions;
use crate::coding::{Decode, DecodeError, Encode, EncodeError, Parameters};

/// `CLIENT_SETUP`: sent by the client on the control stream before
/// anything else, carrying the versions it supports in preferred order.
///
/// Until the matching [`super::Server`] arrives, no other control message
/// is permitted on the connection (§4.8).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Client {
    /// The list of supported versions in preferred order.
    pub versions: Versions,

    /// Setup parameters, e.g. `Path`, `EndpointId`.
    pub params: Parameters,
}

impl Decode for Client {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let typ = u64::decode(r)?;
        if typ != 0x40 {
            return Err(DecodeError::InvalidMessage(typ));
        }

        let _len = u64::decode(r)?;

        let versions = Versions::decode(r)?;
        let params = Parameters::decode(r)?;

        Ok(Self { versions, params })
    }
}

impl Encode for Client {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        0x40_u64.encode(w)?;

        // The length prefix needs the encoded body size up front, so
        // encode into a scratch buffer first.
        let mut buf = Vec::new();
        self.versions.encode(&mut buf)?;
        self.params.encode(&mut buf)?;

        (buf.len() as u64).encode(w)?;
        w.put_slice(&buf);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::parameter_types;
    use crate::coding::Parameter;
    use crate::setup::Version;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();
        let mut params = Parameters::new();
        params.push(Parameter::text(parameter_types::ENDPOINT_ID, "alice"));

        let client = Client {
            versions: [Version::DRAFT_14].into(),
            params,
        };

        client.encode(&mut buf).unwrap();
        let decoded = Client::decode(&mut buf).unwrap();
        assert_eq!(decoded, client);
    }

    #[test]
    fn rejects_wrong_message_type() {
        let mut buf = BytesMut::new();
        0x41_u64.encode(&mut buf).unwrap();
        0_u64.encode(&mut buf).unwrap();
        assert!(matches!(
            Client::decode(&mut buf),
            Err(DecodeError::InvalidMessage(0x41))
        ));
    }
}
