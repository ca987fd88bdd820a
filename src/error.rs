use crate::models::{LinkId, QueryShape};

/// Everything that can go wrong between the feed view and the remote service.
///
/// Merging never fails; a merge against a link that is not in the window is a logged no-op and
/// has no variant here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The shape has never been populated; the caller has to fetch it first.
    #[error("no cached feed for {0:?}")]
    ShapeNotCached(QueryShape),
    #[error("gateway query failed: {0}")]
    GatewayQueryFailed(String),
    #[error("subscription to {channel} failed: {reason}")]
    SubscriptionDeliveryFailure {
        channel: &'static str,
        reason: String,
    },
    #[error("invalid page number {0:?}")]
    InvalidPage(String),
    #[error("unknown route {0:?}")]
    InvalidRoute(String),
    #[error("voting on {0:?} requires a signed-in session")]
    Unauthorized(LinkId),
    #[error("couldn't decode gateway payload: {0}")]
    Decode(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::GatewayQueryFailed(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
