use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use linkfeed::{
    Error, FeedController, FeedEvent, Gateway, GraphqlGateway, LinkId, OrderBy, PageNumber,
    Pagination, QueryShape, Session, ViewMode, ViewState,
};
use serde_json::{json, Value};
use warp::Filter;

fn link(id: &str, created_at: &str, votes: &[&str]) -> Value {
    json!({
        "id": id,
        "createdAt": created_at,
        "url": format!("https://{id}.example"),
        "description": format!("link {id}"),
        "postedBy": { "id": "u1", "name": "ada" },
        "votes": votes.iter().map(|v| json!({ "id": v, "user": { "id": "u2" } })).collect::<Vec<_>>(),
    })
}

fn respond(auth: Option<String>, body: &Value) -> Value {
    let query = body["query"].as_str().unwrap_or_default();
    let variables = &body["variables"];
    if query.contains("FeedQuery") {
        json!({ "data": { "feed": {
            "links": [
                link("l2", "2024-06-01T12:00:00Z", &[]),
                link("l1", "2024-06-01T11:00:00Z", &["v1"]),
            ],
            "count": 2,
        } } })
    } else if query.contains("FeedSearchQuery") {
        let filter = variables["filter"].as_str().unwrap_or_default();
        let links: Vec<Value> = ["l1", "l2"]
            .iter()
            .filter(|id| id.contains(filter))
            .map(|id| link(id, "2024-06-01T11:00:00Z", &[]))
            .collect();
        json!({ "data": { "feed": { "links": links } } })
    } else if query.contains("LinkVotesQuery") {
        json!({ "data": { "link": {
            "id": variables["linkId"],
            "votes": [{ "id": "v1" }, { "id": "v7" }],
        } } })
    } else if auth.as_deref() != Some("Bearer secret") {
        json!({ "data": null, "errors": [{ "message": "Not authenticated" }] })
    } else if query.contains("PostMutation") {
        json!({ "data": { "post": link("l9", "2024-06-01T13:00:00Z", &[]) } })
    } else if query.contains("VoteMutation") && variables["linkId"] == "bare" {
        json!({ "data": { "vote": { "id": "v8", "link": { "id": "bare" } } } })
    } else if query.contains("VoteMutation") {
        json!({ "data": { "vote": {
            "id": "v8",
            "link": { "id": variables["linkId"], "votes": [{ "id": "v1" }, { "id": "v8" }] },
            "user": { "id": "u3" },
        } } })
    } else {
        json!({ "data": null, "errors": [{ "message": format!("unexpected query {query}") }] })
    }
}

fn subscription_events(body: &Value) -> Vec<Value> {
    let query = body["query"].as_str().unwrap_or_default();
    if query.contains("newLink") {
        vec![json!({ "data": { "newLink": link("l3", "2024-06-01T12:30:00Z", &[]) } })]
    } else {
        // Carries no vote list; the client has to ask for it.
        vec![json!({ "data": { "newVote": { "id": "v7", "link": { "id": "l1" } } } })]
    }
}

/// Serves canned GraphQL responses and SSE subscriptions; returns the endpoint and a log of the
/// request bodies it received.
fn serve() -> (String, Arc<Mutex<Vec<Value>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));

    let sse = warp::post()
        .and(warp::path("graphql"))
        .and(warp::header::exact("accept", "text/event-stream"))
        .and(warp::body::json())
        .map(|body: Value| {
            let events = subscription_events(&body).into_iter().map(|payload| {
                Ok::<_, Infallible>(
                    warp::sse::Event::default()
                        .event("next")
                        .data(payload.to_string()),
                )
            });
            let stream = futures::stream::iter(events).chain(futures::stream::pending());
            warp::sse::reply(warp::sse::keep_alive().stream(stream))
        });

    let log = requests.clone();
    let graphql = warp::post()
        .and(warp::path("graphql"))
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::json())
        .map(move |auth: Option<String>, body: Value| {
            log.lock().unwrap().push(body.clone());
            warp::reply::json(&respond(auth, &body))
        });

    let (addr, server) = warp::serve(sse.or(graphql)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (format!("http://{addr}/graphql"), requests)
}

#[tokio::test]
async fn feed_query_sends_the_window_as_variables() {
    let (endpoint, requests) = serve();
    let gateway = GraphqlGateway::new(endpoint);
    let page = gateway
        .feed(QueryShape {
            first: 10,
            skip: 20,
            order_by: Some(OrderBy::CreatedAtDesc),
        })
        .await
        .unwrap();

    assert_eq!(page.count, 2);
    assert_eq!(page.links[0].id, LinkId("l2".to_string()));
    assert_eq!(page.links[1].vote_count(), 1);
    assert_eq!(
        requests.lock().unwrap()[0]["variables"],
        json!({ "first": 10, "skip": 20, "orderBy": "createdAt_DESC" })
    );
}

#[tokio::test]
async fn mutations_carry_the_session_token() {
    let (endpoint, _) = serve();
    let gateway = GraphqlGateway::new(endpoint);

    assert_eq!(
        gateway
            .post(&Session::anonymous(), "x", "https://x.example")
            .await,
        Err(Error::GatewayQueryFailed("Not authenticated".to_string()))
    );

    let session = Session::with_token("secret");
    let link = gateway
        .post(&session, "x", "https://x.example")
        .await
        .unwrap();
    assert_eq!(link.id, LinkId("l9".to_string()));

    let voted = gateway.vote(&session, &link.id).await.unwrap();
    assert_eq!(voted.id, link.id);
    assert_eq!(voted.votes.len(), 2);
}

#[tokio::test]
async fn vote_response_without_votes_is_a_decode_error() {
    let (endpoint, _) = serve();
    let gateway = GraphqlGateway::new(endpoint);
    let result = gateway
        .vote(&Session::with_token("secret"), &LinkId("bare".to_string()))
        .await;
    assert!(matches!(result, Err(Error::Decode(_))), "{result:?}");
}

#[tokio::test]
async fn search_is_a_plain_query() {
    let (endpoint, requests) = serve();
    let gateway = GraphqlGateway::new(endpoint);
    let links = gateway.search("1").await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(
        requests.lock().unwrap()[0]["variables"],
        json!({ "filter": "1" })
    );
}

#[tokio::test]
async fn subscriptions_decode_server_sent_events() {
    let (endpoint, _) = serve();
    let gateway = GraphqlGateway::new(endpoint);

    let mut links = gateway.subscribe_links().await.unwrap();
    match links.recv().await {
        Some(Ok(FeedEvent::LinkCreated(link))) => assert_eq!(link.id, LinkId("l3".to_string())),
        other => panic!("unexpected {other:?}"),
    }

    let mut votes = gateway.subscribe_votes().await.unwrap();
    match votes.recv().await {
        Some(Ok(FeedEvent::VoteCreated(vote))) => {
            assert_eq!(vote.link_id, LinkId("l1".to_string()));
            assert_eq!(vote.votes, None);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn live_view_over_http() {
    let (endpoint, _) = serve();
    let mut controller = FeedController::new(
        GraphqlGateway::new(endpoint),
        Session::with_token("secret"),
        Pagination::new(10),
    );
    controller
        .navigate(ViewMode::New, PageNumber::FIRST)
        .await
        .unwrap();
    assert!(controller.is_live());

    // One creation and one vote, in whichever order the channels deliver them.
    for _ in 0..2 {
        assert!(controller.next_event().await.is_some());
    }

    let ViewState::Ready(entry) = controller.state() else {
        panic!("expected a ready view");
    };
    let ids: Vec<&str> = entry.links.iter().map(|l| l.id.0.as_str()).collect();
    assert_eq!(ids, ["l3", "l2", "l1"]);
    assert_eq!(entry.count, 3);
    assert_eq!(entry.links[2].vote_count(), 2);

    controller.vote(&LinkId("l2".to_string())).await.unwrap();
    let ViewState::Ready(entry) = controller.state() else {
        panic!("expected a ready view");
    };
    assert_eq!(entry.links[1].vote_count(), 2);
}
