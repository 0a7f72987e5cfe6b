use crate::{coding, setup};

#[derive(thiserror::Error, Debug, Clone)]
pub enum SessionError {
    #[error("webtransport session: {0}")]
    Session(#[from] web_transport::SessionError),

    #[error("webtransport write: {0}")]
    Write(#[from] web_transport::WriteError),

    #[error("webtransport read: {0}")]
    Read(#[from] web_transport::ReadError),

    #[error("encode error: {0}")]
    Encode(#[from] coding::EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] coding::DecodeError),

    #[error("unsupported versions: client={0:?} server={1:?}")]
    Version(setup::Versions, setup::Versions),

    /// A control message arrived that the receiving side never sends
    /// (e.g. a publisher-only message on a connection acting purely as a
    /// subscriber). MoQT-14 sessions are symmetric, so this is reserved
    /// for messages that reference an unknown request id/track alias
    /// rather than an actual role split.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Some VarInt was too large and we were too lazy to handle it
    #[error("varint bounds exceeded")]
    BoundsExceeded(#[from] coding::BoundsExceeded),

    /// A duplicate ID was used
    #[error("duplicate")]
    Duplicate,

    /// The peer's `MAX_REQUEST_ID` was reached before a new request could
    /// be issued.
    #[error("requests blocked by peer's max_request_id")]
    RequestsBlocked,

    #[error("no such track")]
    NotFound,

    #[error("internal error")]
    Internal,

    #[error("wrong size")]
    WrongSize,
}

// Session Termination Error Codes from draft-ietf-moq-transport-14 Section 13.1.1
impl SessionError {
    /// An integer code that is sent over the wire.
    pub fn code(&self) -> u64 {
        match self {
            // PROTOCOL_VIOLATION (0x3)
            Self::ProtocolViolation(_) => 0x3,
            Self::Decode(_) => 0x3,
            Self::WrongSize => 0x3,
            // INTERNAL_ERROR (0x1)
            Self::Session(_) => 0x1,
            Self::Read(_) => 0x1,
            Self::Write(_) => 0x1,
            Self::Encode(_) => 0x1,
            Self::BoundsExceeded(_) => 0x1,
            Self::Internal => 0x1,
            Self::NotFound => 0x1,
            // VERSION_NEGOTIATION_FAILED (0x15)
            Self::Version(..) => 0x15,
            // DUPLICATE_TRACK_ALIAS (0x5)
            Self::Duplicate => 0x5,
            // REQUESTS_BLOCKED isn't a session termination code, it's answered
            // with its own control message, but give it a code in case it
            // ever needs to close the connection instead.
            Self::RequestsBlocked => 0x1a,
        }
    }
}
