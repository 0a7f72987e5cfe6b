use super::{Decode, DecodeError, Encode, EncodeError};
use bytes::Buf;
use std::fmt;

/// The extension tag that marks a nested, frozen KV block.
///
/// The MoQT drafts have moved this value around; we pin it here per the
/// object-extensions scheme described for this transport. It must be an
/// odd tag since its payload is length-prefixed bytes, not a bare varint.
pub const IMMUTABLE_EXTENSION_TAG: u64 = 0x0d;

/// Tag used to signal a gap in monotonically increasing group ids.
/// Carries a single varint: the number of skipped group ids.
pub const GROUP_GAP_EXTENSION_TAG: u64 = 0x02;

#[derive(Clone, Eq, PartialEq)]
pub enum ExtensionValue {
    Int(u64),
    Bytes(Vec<u8>),
}

impl fmt::Debug for ExtensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Bytes(b) => {
                let preview: Vec<String> = b.iter().take(16).map(|x| format!("{:02x}", x)).collect();
                write!(f, "[{}]", preview.join(" "))
            }
        }
    }
}

/// A single object extension: `(tag, value)`.
///
/// Even tags carry a bare varint; odd tags carry length-prefixed bytes.
#[derive(Clone, Eq, PartialEq)]
pub struct Extension {
    pub tag: u64,
    pub value: ExtensionValue,
}

impl Extension {
    pub fn new_int(tag: u64, value: u64) -> Self {
        Self {
            tag,
            value: ExtensionValue::Int(value),
        }
    }

    pub fn new_bytes(tag: u64, value: Vec<u8>) -> Self {
        Self {
            tag,
            value: ExtensionValue::Bytes(value),
        }
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}: {:?}}}", self.tag, self.value)
    }
}

impl Decode for Extension {
    fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let tag = u64::decode(r)?;
        if tag % 2 == 0 {
            let value = u64::decode(r)?;
            Ok(Self::new_int(tag, value))
        } else {
            let len = usize::decode(r)?;
            Self::decode_remaining(r, len)?;
            let mut buf = vec![0; len];
            r.copy_to_slice(&mut buf);
            Ok(Self::new_bytes(tag, buf))
        }
    }
}

impl Encode for Extension {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        match &self.value {
            ExtensionValue::Int(v) => {
                if self.tag % 2 != 0 {
                    return Err(EncodeError::InvalidValue);
                }
                self.tag.encode(w)?;
                (*v).encode(w)?;
            }
            ExtensionValue::Bytes(v) => {
                if self.tag % 2 == 0 {
                    return Err(EncodeError::InvalidValue);
                }
                self.tag.encode(w)?;
                v.len().encode(w)?;
                Self::encode_remaining(w, v.len())?;
                w.put_slice(v);
            }
        }
        Ok(())
    }
}

/// An object's extension headers: a byte-length-prefixed list of [`Extension`]s.
///
/// One entry may carry the reserved [`IMMUTABLE_EXTENSION_TAG`], whose bytes
/// are themselves an `Extensions` block. Nesting it a second level is a
/// protocol violation and is rejected eagerly on decode.
#[derive(Default, Clone, Eq, PartialEq)]
pub struct Extensions(pub Vec<Extension>);

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the extension with this tag.
    pub fn set(&mut self, ext: Extension) {
        if let Some(existing) = self.0.iter_mut().find(|e| e.tag == ext.tag) {
            *existing = ext;
        } else {
            self.0.push(ext);
        }
    }

    pub fn set_int(&mut self, tag: u64, value: u64) {
        self.set(Extension::new_int(tag, value));
    }

    pub fn set_bytes(&mut self, tag: u64, value: Vec<u8>) {
        self.set(Extension::new_bytes(tag, value));
    }

    pub fn get(&self, tag: u64) -> Option<&Extension> {
        self.0.iter().find(|e| e.tag == tag)
    }

    pub fn has(&self, tag: u64) -> bool {
        self.get(tag).is_some()
    }

    pub fn group_gap(&self) -> Option<u64> {
        match self.get(GROUP_GAP_EXTENSION_TAG) {
            Some(Extension { value: ExtensionValue::Int(v), .. }) => Some(*v),
            _ => None,
        }
    }

    /// Parse the nested immutable block, if present.
    ///
    /// Returns `NestedImmutableExtension` if the nested block itself
    /// contains the immutable tag.
    pub fn immutable(&self) -> Result<Option<Extensions>, DecodeError> {
        match self.get(IMMUTABLE_EXTENSION_TAG) {
            None => Ok(None),
            Some(Extension { value: ExtensionValue::Bytes(raw), .. }) => {
                let nested = Self::decode_entries(&mut bytes::Bytes::from(raw.clone()))?;
                if nested.iter().any(|e| e.tag == IMMUTABLE_EXTENSION_TAG) {
                    return Err(DecodeError::NestedImmutableExtension);
                }
                Ok(Some(Extensions(nested)))
            }
            Some(_) => Err(DecodeError::InvalidValue),
        }
    }

    /// Freeze `inner` into this extension set under the immutable tag.
    pub fn set_immutable(&mut self, inner: &Extensions) -> Result<(), EncodeError> {
        if inner.has(IMMUTABLE_EXTENSION_TAG) {
            return Err(EncodeError::InvalidValue);
        }
        let mut buf = Vec::new();
        for ext in &inner.0 {
            ext.encode(&mut buf)?;
        }
        self.set_bytes(IMMUTABLE_EXTENSION_TAG, buf);
        Ok(())
    }

    fn decode_entries<R: Buf>(r: &mut R) -> Result<Vec<Extension>, DecodeError> {
        let mut entries = Vec::new();
        while r.has_remaining() {
            entries.push(Extension::decode(r)?);
        }
        Ok(entries)
    }
}

impl Decode for Extensions {
    fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let length = usize::decode(r)?;
        Self::decode_remaining(r, length)?;

        if length == 0 {
            return Ok(Extensions::new());
        }

        let mut buf = vec![0u8; length];
        r.copy_to_slice(&mut buf);
        let mut body = bytes::Bytes::from(buf);

        let entries = Self::decode_entries(&mut body)?;

        // Eagerly validate the no-nested-immutable-block invariant.
        if let Some(immutable) = entries.iter().find(|e| e.tag == IMMUTABLE_EXTENSION_TAG) {
            if let ExtensionValue::Bytes(raw) = &immutable.value {
                let nested = Self::decode_entries(&mut bytes::Bytes::from(raw.clone()))?;
                if nested.iter().any(|e| e.tag == IMMUTABLE_EXTENSION_TAG) {
                    return Err(DecodeError::NestedImmutableExtension);
                }
            } else {
                return Err(DecodeError::InvalidValue);
            }
        }

        Ok(Extensions(entries))
    }
}

impl Encode for Extensions {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        let mut tmp = bytes::BytesMut::new();
        for ext in &self.0 {
            ext.encode(&mut tmp)?;
        }
        tmp.len().encode(w)?;
        Self::encode_remaining(w, tmp.len())?;
        w.put_slice(&tmp);
        Ok(())
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (i, ext) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", ext)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode_mixed() {
        let mut buf = BytesMut::new();

        let mut exts = Extensions::new();
        exts.set_int(0x2, 42);
        exts.set_bytes(0x3, vec![1, 2, 3]);

        exts.encode(&mut buf).unwrap();
        let decoded = Extensions::decode(&mut buf).unwrap();
        assert_eq!(decoded, exts);
        assert_eq!(decoded.get(0x2).unwrap().value, ExtensionValue::Int(42));
    }

    #[test]
    fn immutable_round_trips() {
        let mut inner = Extensions::new();
        inner.set_int(0x2, 7);

        let mut outer = Extensions::new();
        outer.set_bytes(0x5, vec![9, 9]);
        outer.set_immutable(&inner).unwrap();

        let mut buf = BytesMut::new();
        outer.encode(&mut buf).unwrap();
        let decoded = Extensions::decode(&mut buf).unwrap();
        assert_eq!(decoded, outer);

        let nested = decoded.immutable().unwrap().unwrap();
        assert_eq!(nested, inner);
    }

    #[test]
    fn nested_immutable_is_rejected() {
        let mut innermost = Extensions::new();
        innermost.set_int(0x2, 1);

        let mut middle = Extensions::new();
        middle.set_immutable(&innermost).unwrap();

        // Hand-construct an outer block whose immutable payload already
        // contains an immutable tag, bypassing `set_immutable`'s own check,
        // to exercise the decode-side rejection.
        let mut middle_bytes = Vec::new();
        for ext in &middle.0 {
            ext.encode(&mut middle_bytes).unwrap();
        }

        let mut outer = Extensions::new();
        outer.set_bytes(IMMUTABLE_EXTENSION_TAG, middle_bytes);

        let mut buf = BytesMut::new();
        outer.encode(&mut buf).unwrap();
        let err = Extensions::decode(&mut buf).unwrap_err();
        assert!(matches!(err, DecodeError::NestedImmutableExtension));
    }

    #[test]
    fn group_gap_helper() {
        let mut exts = Extensions::new();
        exts.set_int(GROUP_GAP_EXTENSION_TAG, 1758273156);
        assert_eq!(exts.group_gap(), Some(1758273156));
    }
}
