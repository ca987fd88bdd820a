//! Rules for folding one incoming event into a cached feed window without refetching it.
//!
//! Every function here is total. Events can arrive twice (a mutation response and its own
//! subscription echo) and in any order across channels, so each rule is idempotent on its own.

use log::debug;

use crate::models::{FeedEntry, FeedPage, Link, LinkId, QueryShape, Vote};

/// Puts a newly created link at the head of the window and bumps the total.
///
/// A link whose id is already in the window leaves the entry untouched. The window never grows
/// past `shape.first`; the oldest link falls off the end.
pub fn apply_created_link(mut entry: FeedEntry, link: Link) -> FeedEntry {
    if entry.links.iter().any(|l| l.id == link.id) {
        debug!("Link {} already in {:?}, skipping", link.id, entry.shape);
        return entry;
    }
    entry.links.insert(0, link);
    entry.links.truncate(entry.shape.first);
    entry.count += 1;
    entry
}

/// Replaces the vote list of `link_id` with the server's post-vote list.
///
/// Vote counts only grow, so a list shorter than the one already held is an older snapshot that
/// arrived late and is ignored. Links outside the window are ignored too.
pub fn apply_vote(mut entry: FeedEntry, link_id: &LinkId, votes: Vec<Vote>) -> FeedEntry {
    match entry.links.iter_mut().find(|l| &l.id == link_id) {
        Some(link) if votes.len() < link.votes.len() => debug!(
            "Ignoring {} votes for {link_id}, already have {}",
            votes.len(),
            link.votes.len()
        ),
        Some(link) => link.votes = votes,
        None => debug!("Vote for {link_id} is outside {:?}", entry.shape),
    }
    entry
}

/// A freshly fetched page replaces whatever was there.
pub fn apply_fresh_fetch(
    _previous: Option<FeedEntry>,
    shape: QueryShape,
    page: FeedPage,
) -> FeedEntry {
    FeedEntry {
        shape,
        links: page.links,
        count: page.count,
    }
}
