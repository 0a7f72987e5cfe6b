use bytes::BufMut;

/// A type that can be appended to the end of a byte buffer.
pub trait Encode {
    fn encode<W: BufMut>(&self, w: &mut W) -> Result<(), EncodeError>;

    /// Returns `EncodeError::More` if `w` doesn't have at least `required` bytes of write capacity.
    fn encode_remaining<W: BufMut>(w: &W, required: usize) -> Result<(), EncodeError> {
        let remaining = w.remaining_mut();
        if remaining < required {
            return Err(EncodeError::More(required - remaining));
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum EncodeError {
    #[error("field bounds exceeded: {0}")]
    FieldBoundsExceeded(String),

    #[error("invalid value")]
    InvalidValue,

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("more write capacity needed: {0}")]
    More(usize),

    #[error("message bounds exceeded")]
    MsgBoundsExceeded,

    #[error("varint bounds exceeded")]
    BoundsExceeded(#[from] super::BoundsExceeded),
}
