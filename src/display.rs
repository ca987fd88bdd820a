//! Plain-text rendering of feed rows.

use chrono::{DateTime, Utc};

use crate::controller::{FeedController, ViewState};
use crate::gateway::Gateway;
use crate::models::Link;

const MINUTE: i64 = 60 * 1000;
const HOUR: i64 = MINUTE * 60;
const DAY: i64 = HOUR * 24;
const MONTH: i64 = DAY * 30;
const YEAR: i64 = DAY * 365;

fn rounded(elapsed: i64, unit: i64) -> i64 {
    (elapsed as f64 / unit as f64).round() as i64
}

/// Coarse "how long ago", e.g. `3 h ago`.
pub fn time_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - created_at).num_milliseconds();
    if elapsed < MINUTE / 3 {
        "just now".to_string()
    } else if elapsed < MINUTE {
        "less than 1 min ago".to_string()
    } else if elapsed < HOUR {
        format!("{} min ago", rounded(elapsed, MINUTE))
    } else if elapsed < DAY {
        format!("{} h ago", rounded(elapsed, HOUR))
    } else if elapsed < MONTH {
        format!("{} days ago", rounded(elapsed, DAY))
    } else if elapsed < YEAR {
        format!("{} mo ago", rounded(elapsed, MONTH))
    } else {
        format!("{} years ago", rounded(elapsed, YEAR))
    }
}

/// Two lines per link: rank, description and url, then votes, author and age. `rank` is
/// one-based across the whole feed. Signed-in readers get a vote marker.
pub fn render_link(rank: usize, link: &Link, can_vote: bool, now: DateTime<Utc>) -> String {
    let marker = if can_vote { " ▲" } else { "" };
    let author = link
        .posted_by
        .as_ref()
        .map_or("Unknown", |user| user.name.as_str());
    format!(
        "{rank}.{marker} {} ({})\n    {} votes | by {author} {}  [{}]",
        link.description,
        link.url,
        link.vote_count(),
        time_since(link.created_at, now),
        link.id,
    )
}

/// Renders links starting at rank `offset + 1`.
pub fn render_links(links: &[Link], offset: usize, can_vote: bool, now: DateTime<Utc>) -> String {
    links
        .iter()
        .enumerate()
        .map(|(index, link)| render_link(offset + index + 1, link, can_vote, now))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The whole feed view as text, including page navigation hints.
pub fn render_view<G: Gateway>(controller: &FeedController<G>, now: DateTime<Utc>) -> String {
    let entry = match controller.state() {
        ViewState::Loading => return "Fetching".to_string(),
        ViewState::Failed(err) => return format!("Error: {err}"),
        ViewState::Ready(entry) => entry,
    };
    let title = controller
        .route()
        .map_or_else(String::new, |route| route.to_string());
    let mut out = format!("{title} ({} links in total)\n", entry.count);
    out.push_str(&render_links(
        &controller.visible_links(),
        controller.rank_offset(),
        controller.session().can_vote(),
        now,
    ));
    let mut hints = Vec::new();
    if let Some(page) = controller.previous_page() {
        hints.push(format!("previous: /new/{page}"));
    }
    if let Some(page) = controller.next_page() {
        hints.push(format!("next: /new/{page}"));
    }
    if !hints.is_empty() {
        out.push_str("\n\n");
        out.push_str(&hints.join(" | "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinkId, UserRef, Vote, VoteId};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn ages_are_coarse() {
        let ago = |d: Duration| time_since(now() - d, now());
        assert_eq!(ago(Duration::seconds(5)), "just now");
        assert_eq!(ago(Duration::seconds(40)), "less than 1 min ago");
        assert_eq!(ago(Duration::seconds(150)), "3 min ago");
        assert_eq!(ago(Duration::minutes(90)), "2 h ago");
        assert_eq!(ago(Duration::hours(50)), "2 days ago");
        assert_eq!(ago(Duration::days(75)), "3 mo ago");
        assert_eq!(ago(Duration::days(800)), "2 years ago");
    }

    #[test]
    fn rows_are_ranked_from_the_offset() {
        let links = vec![
            Link {
                id: LinkId("l1".into()),
                url: "https://a.example".into(),
                description: "A".into(),
                created_at: now() - Duration::hours(3),
                posted_by: Some(UserRef { name: "ada".into() }),
                votes: vec![Vote {
                    id: VoteId("v1".into()),
                }],
            },
            Link {
                id: LinkId("l2".into()),
                url: "https://b.example".into(),
                description: "B".into(),
                created_at: now(),
                posted_by: None,
                votes: Vec::new(),
            },
        ];
        assert_eq!(
            render_links(&links, 10, false, now()),
            "11. A (https://a.example)\n    1 votes | by ada 3 h ago  [l1]\n\
             12. B (https://b.example)\n    0 votes | by Unknown just now  [l2]"
        );
        assert!(render_link(1, &links[0], true, now()).starts_with("1. ▲ A"));
    }

    #[tokio::test]
    async fn view_shows_state_and_page_hints() {
        use crate::memory::MemoryGateway;
        use crate::models::{PageNumber, Session, ViewMode};
        use crate::pagination::Pagination;

        let gateway = MemoryGateway::new();
        let ada = Session::with_token("ada");
        for i in 0..3 {
            gateway
                .post(&ada, &format!("link {i}"), "https://x.example")
                .await
                .unwrap();
        }
        let mut controller =
            FeedController::new(gateway, Session::anonymous(), Pagination::new(2));
        assert_eq!(render_view(&controller, now()), "Fetching");

        controller
            .navigate(ViewMode::New, PageNumber::new(2).unwrap())
            .await
            .unwrap();
        let view = render_view(&controller, Utc::now());
        assert!(view.starts_with("/new/2 (3 links in total)\n3. link 0"));
        // round(3 / 2) = 2, so page 2 still offers a next page.
        assert!(view.ends_with("previous: /new/1 | next: /new/3"));

        controller.gateway().set_failure(Some("offline")).await;
        controller
            .navigate(ViewMode::Top, PageNumber::FIRST)
            .await
            .unwrap();
        assert_eq!(
            render_view(&controller, now()),
            "Error: gateway query failed: offline"
        );
    }
}
