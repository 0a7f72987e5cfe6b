use super::{Decode, DecodeError, Encode, EncodeError};
use bytes::Buf;

/// Well-known parameter types recognized by the control plane.
///
/// Unknown types are not an error: they are ignored on receipt and passed
/// through unchanged when a message is forwarded (e.g. by a relay).
pub mod parameter_types {
    pub const ROLE: u64 = 0x00;
    pub const PATH: u64 = 0x01;
    pub const ENDPOINT_ID: u64 = 0xf0;
}

/// A single `(type, value_bytes)` control parameter.
#[derive(Clone, Eq, PartialEq)]
pub struct Parameter {
    pub kind: u64,
    pub value: Vec<u8>,
}

impl Parameter {
    pub fn new(kind: u64, value: Vec<u8>) -> Self {
        Self { kind, value }
    }

    pub fn int(kind: u64, value: u64) -> Result<Self, EncodeError> {
        let mut buf = Vec::new();
        value.encode(&mut buf)?;
        Ok(Self { kind, value: buf })
    }

    pub fn text(kind: u64, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into().into_bytes(),
        }
    }

    pub fn as_int(&self) -> Result<u64, DecodeError> {
        u64::decode(&mut bytes::Bytes::from(self.value.clone()))
    }

    pub fn as_text(&self) -> Result<String, DecodeError> {
        Ok(String::from_utf8(self.value.clone())?)
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parameter({}, {} bytes)", self.kind, self.value.len())
    }
}

impl Decode for Parameter {
    fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let kind = u64::decode(r)?;
        let len = usize::decode(r)?;
        Self::decode_remaining(r, len)?;
        let mut value = vec![0; len];
        r.copy_to_slice(&mut value);
        Ok(Self { kind, value })
    }
}

impl Encode for Parameter {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.kind.encode(w)?;
        self.value.len().encode(w)?;
        Self::encode_remaining(w, self.value.len())?;
        w.put_slice(&self.value);
        Ok(())
    }
}

/// An ordered, count-prefixed list of control parameters.
///
/// Order is preserved (unlike the HashMap-backed schemes used elsewhere)
/// so that a relay can forward an unrecognized parameter byte-for-byte.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Parameters(pub Vec<Parameter>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, param: Parameter) {
        self.0.push(param);
    }

    pub fn get(&self, kind: u64) -> Option<&Parameter> {
        self.0.iter().find(|p| p.kind == kind)
    }

    pub fn has(&self, kind: u64) -> bool {
        self.get(kind).is_some()
    }

    /// Insert or replace the parameter carrying an integer value.
    pub fn set_intvalue(&mut self, kind: u64, value: u64) {
        let param = Parameter::int(kind, value).expect("u64 fits a varint");
        self.replace(param);
    }

    /// Insert or replace the parameter carrying a raw byte-string value.
    pub fn set_bytesvalue(&mut self, kind: u64, value: Vec<u8>) {
        self.replace(Parameter::new(kind, value));
    }

    pub fn get_intvalue(&self, kind: u64) -> Option<u64> {
        self.get(kind).and_then(|p| p.as_int().ok())
    }

    pub fn get_bytesvalue(&self, kind: u64) -> Option<&[u8]> {
        self.get(kind).map(|p| p.value.as_slice())
    }

    fn replace(&mut self, param: Parameter) {
        match self.0.iter_mut().find(|p| p.kind == param.kind) {
            Some(existing) => *existing = param,
            None => self.0.push(param),
        }
    }
}

impl std::ops::Deref for Parameters {
    type Target = [Parameter];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl Decode for Parameters {
    fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let count = usize::decode(r)?;
        let mut params = Vec::with_capacity(count);
        for _ in 0..count {
            params.push(Parameter::decode(r)?);
        }
        Ok(Self(params))
    }
}

impl Encode for Parameters {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.0.len().encode(w)?;
        for param in &self.0 {
            param.encode(w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode_empty() {
        let mut buf = BytesMut::new();
        let params = Parameters::new();
        params.encode(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![0x00]);
        let decoded = Parameters::decode(&mut buf).unwrap();
        assert_eq!(decoded, params);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut buf = BytesMut::new();

        let mut params = Parameters::new();
        params.push(Parameter::text(parameter_types::ENDPOINT_ID, "alice"));
        params.push(Parameter::int(parameter_types::ROLE, 1).unwrap());

        params.encode(&mut buf).unwrap();
        let decoded = Parameters::decode(&mut buf).unwrap();
        assert_eq!(decoded, params);

        assert_eq!(
            decoded.get(parameter_types::ENDPOINT_ID).unwrap().as_text().unwrap(),
            "alice"
        );
        assert_eq!(decoded.get(parameter_types::ROLE).unwrap().as_int().unwrap(), 1);
    }

    #[test]
    fn unknown_parameter_round_trips_untouched() {
        let mut buf = BytesMut::new();
        let mut params = Parameters::new();
        params.push(Parameter::new(0x99, vec![0xde, 0xad, 0xbe, 0xef]));
        params.encode(&mut buf).unwrap();
        let decoded = Parameters::decode(&mut buf).unwrap();
        assert_eq!(decoded, params);
    }
}
