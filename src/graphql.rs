//! [`Gateway`] over HTTP: GraphQL queries and mutations as JSON POSTs, subscriptions as
//! GraphQL-over-SSE streams (one connection per subscription).

use futures::StreamExt;
use log::{debug, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::gateway::{
    Gateway, Subscription, VotedLink, FEED_QUERY, FEED_SEARCH_QUERY, LINK_VOTES_QUERY,
    NEW_LINKS_SUBSCRIPTION, NEW_VOTES_SUBSCRIPTION, POST_MUTATION, SUBSCRIPTION_BUFFER,
    VOTE_MUTATION,
};
use crate::models::{
    FeedEvent, FeedPage, Link, LinkId, QueryShape, Session, Vote, VoteEvent, VoteId,
};

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

impl<T> GraphqlResponse<T> {
    fn into_result(self) -> Result<T> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self.errors.into_iter().map(|e| e.message).collect();
            return Err(Error::GatewayQueryFailed(messages.join("; ")));
        }
        self.data
            .ok_or_else(|| Error::Decode("response carried no data".to_string()))
    }
}

#[derive(Deserialize)]
struct FeedData {
    feed: FeedPage,
}

#[derive(Deserialize)]
struct SearchFeed {
    links: Vec<Link>,
}

#[derive(Deserialize)]
struct SearchData {
    feed: SearchFeed,
}

#[derive(Deserialize)]
struct PostData {
    post: Link,
}

#[derive(Deserialize)]
struct LinkVotes {
    id: LinkId,
    #[serde(default)]
    votes: Option<Vec<Vote>>,
}

#[derive(Deserialize)]
struct VotePayload {
    #[serde(default)]
    id: Option<VoteId>,
    link: LinkVotes,
}

#[derive(Deserialize)]
struct VoteData {
    vote: VotePayload,
}

#[derive(Deserialize)]
struct LinkData {
    link: Option<LinkVotes>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewLinkData {
    new_link: Link,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewVoteData {
    new_vote: VotePayload,
}

fn decode_new_link(data: Value) -> Result<FeedEvent> {
    let data: NewLinkData = serde_json::from_value(data)?;
    Ok(FeedEvent::LinkCreated(data.new_link))
}

fn decode_new_vote(data: Value) -> Result<FeedEvent> {
    let data: NewVoteData = serde_json::from_value(data)?;
    let vote = data.new_vote;
    Ok(FeedEvent::VoteCreated(VoteEvent {
        id: vote
            .id
            .ok_or_else(|| Error::Decode("newVote without an id".to_string()))?,
        link_id: vote.link.id,
        votes: vote.link.votes,
    }))
}

/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseEvent {
    pub(crate) event: Option<String>,
    pub(crate) data: String,
}

/// Incremental `text/event-stream` parser; chunks may split events anywhere.
///
/// Lines end in `\n`, `\r\n` or a bare `\r`. Only the unfinished tail line is kept between
/// chunks and each byte is scanned once.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    line: Vec<u8>,
    after_cr: bool,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        let mut start = 0;
        for (i, &byte) in chunk.iter().enumerate() {
            if std::mem::take(&mut self.after_cr) && byte == b'\n' {
                start = i + 1;
                continue;
            }
            if byte == b'\n' || byte == b'\r' {
                self.line.extend_from_slice(&chunk[start..i]);
                let line = String::from_utf8_lossy(&self.line).into_owned();
                self.line.clear();
                events.extend(self.take_line(&line));
                self.after_cr = byte == b'\r';
                start = i + 1;
            }
        }
        self.line.extend_from_slice(&chunk[start..]);
        events
    }

    /// Feeds one complete line; a blank line dispatches the pending event.
    fn take_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if self.event.is_none() && self.data.is_empty() {
                return None;
            }
            return Some(SseEvent {
                event: self.event.take(),
                data: std::mem::take(&mut self.data).join("\n"),
            });
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => (),
        }
        None
    }
}

#[derive(Debug, Clone)]
pub struct GraphqlGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl GraphqlGateway {
    pub fn new(endpoint: impl Into<String>) -> Self {
        GraphqlGateway {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        session: Option<&Session>,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&GraphqlRequest { query, variables });
        if let Some(token) = session.and_then(Session::auth_token) {
            request = request.bearer_auth(token);
        }
        let body = request.send().await?.error_for_status()?.bytes().await?;
        let response: GraphqlResponse<T> = serde_json::from_slice(&body)?;
        response.into_result()
    }

    async fn subscribe(
        &self,
        channel: &'static str,
        query: &'static str,
        decode: fn(Value) -> Result<FeedEvent>,
    ) -> Result<Subscription> {
        let failure = |err: reqwest::Error| Error::SubscriptionDeliveryFailure {
            channel,
            reason: err.to_string(),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(failure)?
            .error_for_status()
            .map_err(failure)?;
        info!("Subscribed to {channel}");

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut decoder = SseDecoder::default();
            let reason = loop {
                let chunk = tokio::select! {
                    _ = tx.closed() => {
                        debug!("Unsubscribed from {channel}");
                        return;
                    }
                    chunk = stream.next() => chunk,
                };
                let bytes = match chunk {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(err)) => break err.to_string(),
                    None => break "stream ended".to_string(),
                };
                for event in decoder.push(&bytes) {
                    match event.event.as_deref() {
                        Some("complete") => {
                            let _ = tx
                                .send(Err(Error::SubscriptionDeliveryFailure {
                                    channel,
                                    reason: "completed by server".to_string(),
                                }))
                                .await;
                            return;
                        }
                        Some("next") | None => {
                            let decoded =
                                serde_json::from_str::<GraphqlResponse<Value>>(&event.data)
                                    .map_err(Error::from)
                                    .and_then(GraphqlResponse::into_result)
                                    .and_then(decode);
                            match decoded {
                                Ok(event) => {
                                    if tx.send(Ok(event)).await.is_err() {
                                        return;
                                    }
                                }
                                Err(err) => warn!("Skipping undecodable {channel} event: {err}"),
                            }
                        }
                        Some(other) => debug!("Ignoring {other} event on {channel}"),
                    }
                }
            };
            warn!("Subscription to {channel} failed: {reason}");
            let _ = tx
                .send(Err(Error::SubscriptionDeliveryFailure { channel, reason }))
                .await;
        });
        Ok(rx)
    }
}

impl Gateway for GraphqlGateway {
    async fn feed(&self, shape: QueryShape) -> Result<FeedPage> {
        let data: FeedData = self
            .execute(None, FEED_QUERY, serde_json::to_value(shape)?)
            .await?;
        Ok(data.feed)
    }

    async fn search(&self, filter: &str) -> Result<Vec<Link>> {
        let data: SearchData = self
            .execute(None, FEED_SEARCH_QUERY, json!({ "filter": filter }))
            .await?;
        Ok(data.feed.links)
    }

    async fn post(&self, session: &Session, description: &str, url: &str) -> Result<Link> {
        let data: PostData = self
            .execute(
                Some(session),
                POST_MUTATION,
                json!({ "description": description, "url": url }),
            )
            .await?;
        Ok(data.post)
    }

    async fn vote(&self, session: &Session, link_id: &LinkId) -> Result<VotedLink> {
        let data: VoteData = self
            .execute(Some(session), VOTE_MUTATION, json!({ "linkId": link_id }))
            .await?;
        let link = data.vote.link;
        let votes = link
            .votes
            .ok_or_else(|| Error::Decode(format!("vote on {} came back without votes", link.id)))?;
        Ok(VotedLink { id: link.id, votes })
    }

    async fn link_votes(&self, link_id: &LinkId) -> Result<Vec<Vote>> {
        let data: LinkData = self
            .execute(None, LINK_VOTES_QUERY, json!({ "linkId": link_id }))
            .await?;
        let link = data
            .link
            .ok_or_else(|| Error::GatewayQueryFailed(format!("No such link: {link_id}")))?;
        link.votes
            .ok_or_else(|| Error::Decode(format!("{link_id} came back without votes")))
    }

    async fn subscribe_links(&self) -> Result<Subscription> {
        self.subscribe("newLink", NEW_LINKS_SUBSCRIPTION, decode_new_link)
            .await
    }

    async fn subscribe_votes(&self) -> Result<Subscription> {
        self.subscribe("newVote", NEW_VOTES_SUBSCRIPTION, decode_new_vote)
            .await
    }
}
