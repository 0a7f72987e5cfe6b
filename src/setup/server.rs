use super::Version;
use crate::coding::{Decode, DecodeError, Encode, EncodeError, Parameters};

/// `SERVER_SETUP`: the server's reply to [`super::Client`], choosing one
/// version out of the client's supported list.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Server {
    /// The version the server selected.
    pub version: Version,

    /// Setup parameters, e.g. `MaxRequestId`.
    pub params: Parameters,
}

impl Decode for Server {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let typ = u64::decode(r)?;
        if typ != 0x41 {
            return Err(DecodeError::InvalidMessage(typ));
        }

        let _len = u64::decode(r)?;

        let version = Version::decode(r)?;
        let params = Parameters::decode(r)?;

        Ok(Self { version, params })
    }
}

impl Encode for Server {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        0x41_u64.encode(w)?;

        let mut buf = Vec::new();
        self.version.encode(&mut buf)?;
        self.params.encode(&mut buf)?;

        (buf.len() as u64).encode(w)?;
        w.put_slice(&buf);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::ParameterType;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let mut params = Parameters::default();
        params.set_intvalue(ParameterType::MaxRequestId.into(), 1000);

        let server = Server {
            version: Version::DRAFT_14,
            params,
        };

        server.encode(&mut buf).unwrap();
        let decoded = Server::decode(&mut buf).unwrap();
        assert_eq!(decoded, server);
    }

    #[test]
    fn rejects_wrong_message_type() {
        let mut buf = BytesMut::new();
        0x40_u64.encode(&mut buf).unwrap();
        0_u64.encode(&mut buf).unwrap();
        assert!(matches!(
            Server::decode(&mut buf),
            Err(DecodeError::InvalidMessage(0x40))
        ));
    }
}
