//! An in-process [`Gateway`] that keeps the whole feed in memory.
//!
//! It behaves like the remote service as far as the client can tell: mutations require a signed-in
//! session, every created link and vote is broadcast to all subscribers (including the client that
//! caused it), and a person can vote for a link only once.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::error::{Error, Result};
use crate::gateway::{Gateway, Subscription, VotedLink, SUBSCRIPTION_BUFFER};
use crate::models::{
    FeedEvent, FeedPage, Link, LinkId, OrderBy, QueryShape, Session, UserRef, Vote, VoteEvent,
    VoteId,
};

#[derive(Debug, Default)]
struct Store {
    /// In creation order.
    links: Vec<Link>,
    voters: HashSet<(LinkId, String)>,
    next_id: u64,
    last_created: Option<DateTime<Utc>>,
    failure: Option<String>,
}

impl Store {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    // Strictly increasing so that ordering by creation time is total.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let created = match self.last_created {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_created = Some(created);
        created
    }

    fn check_available(&self) -> Result<()> {
        match &self.failure {
            Some(reason) => Err(Error::GatewayQueryFailed(reason.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct MemoryGateway {
    store: Arc<Mutex<Store>>,
    links_tx: broadcast::Sender<Link>,
    votes_tx: broadcast::Sender<VoteEvent>,
    vote_payloads: bool,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (links_tx, _) = broadcast::channel(SUBSCRIPTION_BUFFER);
        let (votes_tx, _) = broadcast::channel(SUBSCRIPTION_BUFFER);
        MemoryGateway {
            store: Arc::new(Mutex::new(Store::default())),
            links_tx,
            votes_tx,
            vote_payloads: true,
        }
    }

    /// Vote events will carry only the link id, not its updated vote list.
    pub fn without_vote_payloads(mut self) -> Self {
        self.vote_payloads = false;
        self
    }

    /// Adds existing links, oldest first, without notifying subscribers.
    pub async fn seed(&self, links: impl IntoIterator<Item = Link>) {
        let mut store = self.store.lock().await;
        for link in links {
            store.last_created = Some(
                store
                    .last_created
                    .map_or(link.created_at, |last| last.max(link.created_at)),
            );
            store.links.push(link);
        }
    }

    /// Makes every query and mutation fail with `reason` until cleared with `None`.
    pub async fn set_failure(&self, reason: Option<&str>) {
        self.store.lock().await.failure = reason.map(str::to_string);
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.links.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn require_user(session: &Session) -> Result<String> {
    session
        .auth_token()
        .map(str::to_string)
        .ok_or_else(|| Error::GatewayQueryFailed("Not authenticated".to_string()))
}

/// Forwards a broadcast into a per-subscriber channel until either side goes away.
fn forward<T, F>(mut rx: broadcast::Receiver<T>, channel: &'static str, decode: F) -> Subscription
where
    T: Clone + Send + 'static,
    F: Fn(T) -> FeedEvent + Send + 'static,
{
    let (tx, out) = mpsc::channel(SUBSCRIPTION_BUFFER);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => {
                    debug!("Subscriber to {channel} went away");
                    break;
                }
                received = rx.recv() => match received {
                    Ok(item) => {
                        if tx.send(Ok(decode(item))).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("Dropping {channel} subscriber: {err}");
                        let _ = tx
                            .send(Err(Error::SubscriptionDeliveryFailure {
                                channel,
                                reason: err.to_string(),
                            }))
                            .await;
                        break;
                    }
                },
            }
        }
    });
    out
}

impl Gateway for MemoryGateway {
    async fn feed(&self, shape: QueryShape) -> Result<FeedPage> {
        let store = self.store.lock().await;
        store.check_available()?;
        let mut links: Vec<&Link> = store.links.iter().collect();
        if shape.order_by == Some(OrderBy::CreatedAtDesc) {
            links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        Ok(FeedPage {
            links: links
                .into_iter()
                .skip(shape.skip)
                .take(shape.first)
                .cloned()
                .collect(),
            count: store.links.len(),
        })
    }

    async fn search(&self, filter: &str) -> Result<Vec<Link>> {
        let store = self.store.lock().await;
        store.check_available()?;
        Ok(store
            .links
            .iter()
            .filter(|l| l.description.contains(filter) || l.url.contains(filter))
            .cloned()
            .collect())
    }

    async fn post(&self, session: &Session, description: &str, url: &str) -> Result<Link> {
        let user = require_user(session)?;
        let link = {
            let mut store = self.store.lock().await;
            store.check_available()?;
            let link = Link {
                id: LinkId(store.next_id("link-")),
                url: url.to_string(),
                description: description.to_string(),
                created_at: store.next_timestamp(),
                posted_by: Some(UserRef { name: user }),
                votes: Vec::new(),
            };
            store.links.push(link.clone());
            link
        };
        info!("Posted {} ({})", link.id, link.url);
        // No subscribers is fine.
        let _ = self.links_tx.send(link.clone());
        Ok(link)
    }

    async fn vote(&self, session: &Session, link_id: &LinkId) -> Result<VotedLink> {
        let user = require_user(session)?;
        let (vote_id, votes) = {
            let mut store = self.store.lock().await;
            store.check_available()?;
            let index = store
                .links
                .iter()
                .position(|l| &l.id == link_id)
                .ok_or_else(|| Error::GatewayQueryFailed(format!("No such link: {link_id}")))?;
            if !store.voters.insert((link_id.clone(), user)) {
                return Err(Error::GatewayQueryFailed(format!(
                    "Already voted for link: {link_id}"
                )));
            }
            let vote_id = VoteId(store.next_id("vote-"));
            let link = &mut store.links[index];
            link.votes.push(Vote {
                id: vote_id.clone(),
            });
            (vote_id, link.votes.clone())
        };
        let _ = self.votes_tx.send(VoteEvent {
            id: vote_id,
            link_id: link_id.clone(),
            votes: self.vote_payloads.then(|| votes.clone()),
        });
        Ok(VotedLink {
            id: link_id.clone(),
            votes,
        })
    }

    async fn link_votes(&self, link_id: &LinkId) -> Result<Vec<Vote>> {
        let store = self.store.lock().await;
        store.check_available()?;
        store
            .links
            .iter()
            .find(|l| &l.id == link_id)
            .map(|l| l.votes.clone())
            .ok_or_else(|| Error::GatewayQueryFailed(format!("No such link: {link_id}")))
    }

    async fn subscribe_links(&self) -> Result<Subscription> {
        Ok(forward(
            self.links_tx.subscribe(),
            "newLink",
            FeedEvent::LinkCreated,
        ))
    }

    async fn subscribe_votes(&self) -> Result<Subscription> {
        Ok(forward(
            self.votes_tx.subscribe(),
            "newVote",
            FeedEvent::VoteCreated,
        ))
    }
}
