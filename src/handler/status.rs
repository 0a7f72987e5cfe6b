//! Status enums and metrics shared by every track handler kind.

/// Track delivery mode: whether objects for this track travel over
/// datagrams or over per-group/subgroup unidirectional streams.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TrackMode {
    Datagram,
    Stream,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PublishStatus {
    PendingAnnounce,
    Ok,
    NoSubscribers,
    NotAnnounced,
    Error,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SubscribeStatus {
    PendingResponse,
    Ok,
    Paused,
    Error,
    NotSubscribed,
    SendingUnsubscribe,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FetchStatus {
    PendingResponse,
    Ok,
    CompletedByEndOfTrack,
    Cancelled,
    Error,
}

/// Outcome of [`crate::handler::PublishTrackHandler::publish_object`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PublishObjectStatus {
    Ok,
    NoSubscribers,
    ObjectPayloadLengthExceeded,
    ObjectContinuationDataNeeded,
    PreviousObjectNotCompleteMustStartNewGroup,
}

/// Per-track counters, readable at any time by the application.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackMetrics {
    pub objects_sent: u64,
    pub objects_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub flow_errors: u64,
    pub objects_expired: u64,
}
