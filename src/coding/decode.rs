use bytes::Buf;

/// A type that can be parsed from the front of a byte buffer.
///
/// Implementations read exactly the bytes they need and leave the rest of
/// the buffer untouched on failure, with the exception of `DecodeError::More`
/// which indicates the buffer was a truncated prefix of a valid encoding.
pub trait Decode: Sized {
    fn decode<R: Buf>(r: &mut R) -> Result<Self, DecodeError>;

    /// Returns `DecodeError::More` if `r` doesn't have at least `required` bytes left.
    fn decode_remaining<R: Buf>(r: &R, required: usize) -> Result<(), DecodeError> {
        let remaining = r.remaining();
        if remaining < required {
            return Err(DecodeError::More(required - remaining));
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    /// The buffer is a valid but truncated prefix; this many more bytes are needed.
    #[error("more bytes needed: {0}")]
    More(usize),

    #[error("invalid message type: {0}")]
    InvalidMessage(u64),

    #[error("varint bounds exceeded")]
    BoundsExceeded(#[from] super::BoundsExceeded),

    #[error("invalid value")]
    InvalidValue,

    #[error("field bounds exceeded: {0}")]
    FieldBoundsExceeded(String),

    #[error("duplicate parameter: {0}")]
    DuplicateParameter(u64),

    #[error("key value pair length exceeded")]
    KeyValuePairLengthExceeded(),

    #[error("invalid datagram type")]
    InvalidDatagramType,

    #[error("invalid fetch type")]
    InvalidFetchType,

    #[error("invalid filter type")]
    InvalidFilterType,

    #[error("invalid group order")]
    InvalidGroupOrder,

    #[error("invalid header type")]
    InvalidHeaderType,

    #[error("invalid object status")]
    InvalidObjectStatus,

    #[error("invalid parameter")]
    InvalidParameter,

    #[error("missing parameter")]
    MissingParameter,

    #[error("nested immutable extensions are not allowed")]
    NestedImmutableExtension,

    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
