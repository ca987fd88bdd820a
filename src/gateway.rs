use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::{FeedEvent, FeedPage, Link, LinkId, QueryShape, Session, Vote};

/// A live event channel. Dropping the receiver unsubscribes.
pub type Subscription = mpsc::Receiver<Result<FeedEvent>>;

/// Buffer size of each subscription channel.
pub const SUBSCRIPTION_BUFFER: usize = 64;

/// The authoritative vote list of a link right after a vote was cast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotedLink {
    pub id: LinkId,
    pub votes: Vec<Vote>,
}

/// The remote service the feed is read from and written to.
///
/// Every event arrives through one of the two global subscriptions; deciding whether an event is
/// relevant to what is on screen is the caller's job.
pub trait Gateway {
    /// One window of the feed plus the total number of links.
    fn feed(
        &self,
        shape: QueryShape,
    ) -> impl std::future::Future<Output = Result<FeedPage>> + Send;
    /// Links whose description or url contains `filter`. Not paginated.
    fn search(&self, filter: &str) -> impl std::future::Future<Output = Result<Vec<Link>>> + Send;
    fn post(
        &self,
        session: &Session,
        description: &str,
        url: &str,
    ) -> impl std::future::Future<Output = Result<Link>> + Send;
    fn vote(
        &self,
        session: &Session,
        link_id: &LinkId,
    ) -> impl std::future::Future<Output = Result<VotedLink>> + Send;
    /// Current votes of a single link, for vote events that don't carry them.
    fn link_votes(
        &self,
        link_id: &LinkId,
    ) -> impl std::future::Future<Output = Result<Vec<Vote>>> + Send;
    fn subscribe_links(&self) -> impl std::future::Future<Output = Result<Subscription>> + Send;
    fn subscribe_votes(&self) -> impl std::future::Future<Output = Result<Subscription>> + Send;
}

pub const FEED_QUERY: &str = "query FeedQuery($first: Int, $skip: Int, $orderBy: LinkOrderByInput) {
  feed(first: $first, skip: $skip, orderBy: $orderBy) {
    links { id createdAt url description postedBy { id name } votes { id user { id } } }
    count
  }
}";

pub const FEED_SEARCH_QUERY: &str = "query FeedSearchQuery($filter: String!) {
  feed(filter: $filter) {
    links { id createdAt url description postedBy { id name } votes { id user { id } } }
  }
}";

pub const LINK_VOTES_QUERY: &str = "query LinkVotesQuery($linkId: ID!) {
  link(id: $linkId) { id votes { id user { id } } }
}";

pub const POST_MUTATION: &str = "mutation PostMutation($description: String!, $url: String!) {
  post(description: $description, url: $url) {
    id createdAt url description postedBy { id name } votes { id user { id } }
  }
}";

pub const VOTE_MUTATION: &str = "mutation VoteMutation($linkId: ID!) {
  vote(linkId: $linkId) {
    id
    link { id votes { id user { id } } }
    user { id }
  }
}";

pub const NEW_LINKS_SUBSCRIPTION: &str = "subscription {
  newLink { id createdAt url description postedBy { id name } votes { id user { id } } }
}";

pub const NEW_VOTES_SUBSCRIPTION: &str = "subscription {
  newVote {
    id
    link { id votes { id user { id } } }
    user { id }
  }
}";
