use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub String);

#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteId(pub String);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub name: String,
}

/// A single vote. Inside a [`Link`]'s vote list the link reference is the owning link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: LinkId,
    pub url: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub posted_by: Option<UserRef>,
    #[serde(default)]
    pub votes: Vec<Vote>,
}

impl Link {
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderBy {
    #[serde(rename = "createdAt_DESC")]
    CreatedAtDesc,
}

/// The cache key: one window over the feed.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryShape {
    pub first: usize,
    pub skip: usize,
    pub order_by: Option<OrderBy>,
}

/// What the gateway returns for a feed query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedPage {
    pub links: Vec<Link>,
    pub count: usize,
}

/// The last known result for one [`QueryShape`].
///
/// `count` is the server's total collection size, not `links.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub shape: QueryShape,
    pub links: Vec<Link>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum ViewMode {
    /// Chronological, paginated.
    New,
    /// Ranked by votes, single window.
    Top,
}

/// A one-based page number. Only constructible from a positive integer.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageNumber(NonZeroUsize);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(NonZeroUsize::MIN);

    pub fn new(page: usize) -> Result<Self, Error> {
        NonZeroUsize::new(page)
            .map(PageNumber)
            .ok_or_else(|| Error::InvalidPage(page.to_string()))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    pub fn previous(self) -> Option<Self> {
        NonZeroUsize::new(self.get() - 1).map(PageNumber)
    }

    pub fn next(self) -> Self {
        PageNumber(self.0.saturating_add(1))
    }
}

impl FromStr for PageNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let page = s
            .parse::<usize>()
            .map_err(|_| Error::InvalidPage(s.to_string()))?;
        PageNumber::new(page).map_err(|_| Error::InvalidPage(s.to_string()))
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A vote pushed by the remote service. `votes` is the link's full post-vote list when the
/// payload carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteEvent {
    pub id: VoteId,
    pub link_id: LinkId,
    pub votes: Option<Vec<Vote>>,
}

/// Live events, decoded at the gateway boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    LinkCreated(Link),
    VoteCreated(VoteEvent),
}

/// The signed-in state of the person using the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    auth_token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Session { auth_token: None }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Session {
            auth_token: Some(token.into()),
        }
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Whether the vote control should be offered.
    pub fn can_vote(&self) -> bool {
        self.auth_token.is_some()
    }

    pub fn logout(&mut self) {
        self.auth_token = None;
    }
}
