//! Drives one feed view: resolves which window is on screen, reads it through the cache, and keeps
//! it live by merging subscription events into it.
//!
//! Only the window currently on screen is kept live. Windows visited earlier stay in the cache
//! as they were when the reader left them and are shown as-is on return; missed events are not
//! replayed.

use log::{debug, info, warn};

use crate::cache::FeedCache;
use crate::error::{Error, Result};
use crate::gateway::{Gateway, Subscription};
use crate::merge::{apply_created_link, apply_fresh_fetch, apply_vote};
use crate::models::{
    FeedEntry, FeedEvent, FeedPage, Link, LinkId, PageNumber, QueryShape, Session, ViewMode,
};
use crate::pagination::{can_go_next, can_go_previous, order_for_display, Pagination};
use crate::route::Route;

/// What the view is showing.
#[derive(Debug, PartialEq, Eq)]
pub enum ViewState<'a> {
    Loading,
    Ready(&'a FeedEntry),
    Failed(&'a Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Loading,
    Ready,
    Failed(Error),
}

/// An outstanding fetch for a window. Its result is only applied while that window is still the
/// one on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub shape: QueryShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The window was already cached and is ready.
    Cached,
    /// The window has to be fetched and handed to [`FeedController::complete_fetch`].
    Fetch(FetchTicket),
}

pub struct FeedController<G> {
    gateway: G,
    session: Session,
    pagination: Pagination,
    cache: FeedCache,
    view: Option<(ViewMode, PageNumber)>,
    active: Option<QueryShape>,
    status: Status,
    links: Option<Subscription>,
    votes: Option<Subscription>,
}

impl<G: Gateway> FeedController<G> {
    pub fn new(gateway: G, session: Session, pagination: Pagination) -> Self {
        FeedController {
            gateway,
            session,
            pagination,
            cache: FeedCache::new(),
            view: None,
            active: None,
            status: Status::Loading,
            links: None,
            votes: None,
        }
    }

    pub fn state(&self) -> ViewState<'_> {
        match &self.status {
            Status::Loading => ViewState::Loading,
            Status::Failed(err) => ViewState::Failed(err),
            Status::Ready => match self.active_entry() {
                Some(entry) => ViewState::Ready(entry),
                None => ViewState::Loading,
            },
        }
    }

    pub fn route(&self) -> Option<Route> {
        self.view.map(|(mode, page)| Route::for_view(mode, page))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn is_live(&self) -> bool {
        self.links.is_some() || self.votes.is_some()
    }

    fn active_entry(&self) -> Option<&FeedEntry> {
        self.active.and_then(|shape| self.cache.read(&shape).ok())
    }

    /// The on-screen window in display order; empty unless ready.
    pub fn visible_links(&self) -> Vec<Link> {
        match (self.state(), self.view) {
            (ViewState::Ready(entry), Some((mode, _))) => order_for_display(mode, &entry.links),
            _ => Vec::new(),
        }
    }

    /// How many links precede the first visible one in the whole feed.
    pub fn rank_offset(&self) -> usize {
        self.active.map_or(0, |shape| shape.skip)
    }

    /// Makes `(mode, page)` the active view. Cache hits are ready immediately. A page whose
    /// offset can't be addressed fails with `InvalidPage` and leaves the current view alone.
    pub fn begin_navigation(&mut self, mode: ViewMode, page: PageNumber) -> Result<Navigation> {
        let shape = self.pagination.shape_for(mode, page)?;
        self.view = Some((mode, page));
        self.active = Some(shape);
        if self.cache.contains(&shape) {
            debug!("{} served from cache", Route::for_view(mode, page));
            self.status = Status::Ready;
            Ok(Navigation::Cached)
        } else {
            debug!("{} not cached, fetching {shape:?}", Route::for_view(mode, page));
            self.status = Status::Loading;
            Ok(Navigation::Fetch(FetchTicket { shape }))
        }
    }

    /// Applies a fetch result. Returns `false` if the ticket is stale and the result was dropped.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, result: Result<FeedPage>) -> bool {
        if self.active != Some(ticket.shape) {
            debug!("Discarding stale response for {:?}", ticket.shape);
            return false;
        }
        match result {
            Ok(page) => {
                let previous = self.cache.read(&ticket.shape).ok().cloned();
                let entry = apply_fresh_fetch(previous, ticket.shape, page);
                self.cache.write(ticket.shape, entry);
                self.status = Status::Ready;
            }
            Err(err) => {
                warn!("Fetching {:?} failed: {err}", ticket.shape);
                self.status = Status::Failed(err);
            }
        }
        true
    }

    /// Shows `(mode, page)`, fetching it on a cache miss. Gateway failures end up in the view
    /// state; only an unaddressable page is returned as an error.
    pub async fn navigate(&mut self, mode: ViewMode, page: PageNumber) -> Result<()> {
        if let Navigation::Fetch(ticket) = self.begin_navigation(mode, page)? {
            let result = self.gateway.feed(ticket.shape).await;
            self.complete_fetch(ticket, result);
        }
        if self.status == Status::Ready {
            self.ensure_subscribed().await;
        }
        Ok(())
    }

    /// Navigates to a feed route; other routes aren't this controller's to show.
    pub async fn open(&mut self, route: Route) -> Result<()> {
        let (mode, page) = route
            .feed_view()
            .ok_or_else(|| Error::InvalidRoute(route.to_string()))?;
        self.navigate(mode, page).await
    }

    /// (Re)subscribes any channel that isn't live. Failures leave the channel down until the next
    /// navigation.
    async fn ensure_subscribed(&mut self) {
        if self.links.is_none() {
            match self.gateway.subscribe_links().await {
                Ok(sub) => self.links = Some(sub),
                Err(err) => warn!("Couldn't subscribe to new links: {err}"),
            }
        }
        if self.votes.is_none() {
            match self.gateway.subscribe_votes().await {
                Ok(sub) => self.votes = Some(sub),
                Err(err) => warn!("Couldn't subscribe to new votes: {err}"),
            }
        }
    }

    pub fn previous_page(&self) -> Option<PageNumber> {
        match self.view {
            Some((ViewMode::New, page)) if can_go_previous(page) => page.previous(),
            _ => None,
        }
    }

    pub fn next_page(&self) -> Option<PageNumber> {
        match (self.view, self.state()) {
            (Some((ViewMode::New, page)), ViewState::Ready(entry))
                if can_go_next(page, entry.count, self.pagination.page_size) =>
            {
                Some(page.next())
            }
            _ => None,
        }
    }

    /// Moves back one page. Returns `false` when already on the first page.
    pub async fn go_previous(&mut self) -> Result<bool> {
        match self.previous_page() {
            Some(page) => {
                self.navigate(ViewMode::New, page).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn go_next(&mut self) -> Result<bool> {
        match self.next_page() {
            Some(page) => {
                self.navigate(ViewMode::New, page).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Merges one live event into the on-screen window.
    pub async fn handle_event(&mut self, event: FeedEvent) {
        let Some(shape) = self.active.filter(|shape| self.cache.contains(shape)) else {
            debug!("No window on screen, dropping {event:?}");
            return;
        };
        match event {
            FeedEvent::LinkCreated(link) => {
                info!("New link {} ({})", link.id, link.url);
                self.cache
                    .update(&shape, |entry| apply_created_link(entry, link));
            }
            FeedEvent::VoteCreated(vote) => {
                let in_window = self
                    .cache
                    .read(&shape)
                    .map(|entry| entry.links.iter().any(|l| l.id == vote.link_id))
                    .unwrap_or(false);
                if !in_window {
                    debug!("Vote {:?} targets {} outside the window", vote.id, vote.link_id);
                    return;
                }
                let votes = match vote.votes {
                    Some(votes) => votes,
                    None => match self.gateway.link_votes(&vote.link_id).await {
                        Ok(votes) => votes,
                        Err(err) => {
                            warn!("Couldn't refresh votes of {}: {err}", vote.link_id);
                            return;
                        }
                    },
                };
                self.cache
                    .update(&shape, |entry| apply_vote(entry, &vote.link_id, votes));
            }
        }
    }

    /// Waits for the next live event and merges it. A channel that fails or closes is dropped
    /// until the next navigation. Returns `None` once no channel is live.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        loop {
            if !self.is_live() {
                return None;
            }
            let (channel, received) = tokio::select! {
                received = recv(&mut self.links) => ("newLink", received),
                received = recv(&mut self.votes) => ("newVote", received),
            };
            match received {
                Some(Ok(event)) => {
                    self.handle_event(event.clone()).await;
                    return Some(event);
                }
                Some(Err(err)) => warn!("{err}; dropping {channel} until next navigation"),
                None => warn!("{channel} subscription closed; dropping until next navigation"),
            }
            match channel {
                "newLink" => self.links = None,
                _ => self.votes = None,
            }
        }
    }

    /// Submits a new link, merges it into the first chronological page and shows that page.
    pub async fn submit_link(&mut self, description: &str, url: &str) -> Result<Link> {
        let link = self.gateway.post(&self.session, description, url).await?;
        info!("Submitted {} ({})", link.id, link.url);
        let first_page = self.pagination.shape_for(ViewMode::New, PageNumber::FIRST)?;
        let created = link.clone();
        self.cache
            .update(&first_page, |entry| apply_created_link(entry, created));
        self.navigate(ViewMode::New, PageNumber::FIRST).await?;
        Ok(link)
    }

    /// Votes for `link_id` and patches its vote list in the on-screen window.
    pub async fn vote(&mut self, link_id: &LinkId) -> Result<()> {
        if !self.session.can_vote() {
            return Err(Error::Unauthorized(link_id.clone()));
        }
        let voted = self.gateway.vote(&self.session, link_id).await?;
        info!("Voted for {} ({} votes)", voted.id, voted.votes.len());
        if let Some(shape) = self.active {
            self.cache
                .update(&shape, |entry| apply_vote(entry, &voted.id, voted.votes));
        }
        Ok(())
    }

    /// Tears the view down: unsubscribes and forgets the active window, so in-flight fetches are
    /// discarded on arrival. The cache survives.
    pub fn unmount(&mut self) {
        info!("Unmounting feed view");
        self.links = None;
        self.votes = None;
        self.active = None;
        self.view = None;
        self.status = Status::Loading;
    }
}

async fn recv(subscription: &mut Option<Subscription>) -> Option<Result<FeedEvent>> {
    match subscription {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
