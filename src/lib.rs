mod cache;
mod config;
mod controller;
mod display;
mod error;
mod gateway;
mod graphql;
mod memory;
mod merge;
mod models;
mod pagination;
mod route;
mod search;

pub use cache::FeedCache;
pub use config::{Config, DEFAULT_PAGE_SIZE};
pub use controller::{FeedController, FetchTicket, Navigation, ViewState};
pub use display::{render_link, render_links, render_view, time_since};
pub use error::{Error, Result};
pub use gateway::{
    Gateway, Subscription, VotedLink, FEED_QUERY, FEED_SEARCH_QUERY, LINK_VOTES_QUERY,
    NEW_LINKS_SUBSCRIPTION, NEW_VOTES_SUBSCRIPTION, POST_MUTATION, SUBSCRIPTION_BUFFER,
    VOTE_MUTATION,
};
pub use graphql::GraphqlGateway;
pub use memory::MemoryGateway;
pub use merge::{apply_created_link, apply_fresh_fetch, apply_vote};
pub use models::{
    FeedEntry, FeedEvent, FeedPage, Link, LinkId, OrderBy, PageNumber, QueryShape, Session,
    UserRef, ViewMode, Vote, VoteEvent, VoteId,
};
pub use pagination::{can_go_next, can_go_previous, order_for_display, Pagination, TOP_WINDOW};
pub use route::Route;
pub use search::SearchSession;
