//! Mapping between what the reader is looking at and which window of the feed to query.

use crate::error::{Error, Result};
use crate::models::{Link, OrderBy, PageNumber, QueryShape, ViewMode};

/// Window size for the vote-ranked view. Ranking happens client-side over this window.
pub const TOP_WINDOW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Pagination { page_size }
    }

    /// Links before the first one on `page`. Fails with `InvalidPage` when that doesn't fit in a
    /// `usize`.
    pub fn offset(&self, page: PageNumber) -> Result<usize> {
        (page.get() - 1)
            .checked_mul(self.page_size)
            .ok_or_else(|| Error::InvalidPage(page.to_string()))
    }

    pub fn shape_for(&self, mode: ViewMode, page: PageNumber) -> Result<QueryShape> {
        Ok(match mode {
            ViewMode::New => QueryShape {
                first: self.page_size,
                skip: self.offset(page)?,
                order_by: Some(OrderBy::CreatedAtDesc),
            },
            ViewMode::Top => QueryShape {
                first: TOP_WINDOW,
                skip: 0,
                order_by: None,
            },
        })
    }

    /// Inverse of [`Pagination::shape_for`]. `None` for shapes it never produces.
    pub fn page_for(&self, shape: &QueryShape) -> Option<(ViewMode, PageNumber)> {
        match shape.order_by {
            Some(OrderBy::CreatedAtDesc) => {
                if self.page_size == 0
                    || shape.first != self.page_size
                    || shape.skip % self.page_size != 0
                {
                    return None;
                }
                let page = PageNumber::new(shape.skip / self.page_size + 1).ok()?;
                Some((ViewMode::New, page))
            }
            None if shape.first == TOP_WINDOW && shape.skip == 0 => {
                Some((ViewMode::Top, PageNumber::FIRST))
            }
            None => None,
        }
    }
}

pub fn can_go_previous(page: PageNumber) -> bool {
    page.get() > 1
}

/// `page <= round(total / page_size)`, halves rounding up.
///
/// This is a rounding, not a ceiling, so it can disagree with the real last page: with 25 links
/// and 10 per page it still allows moving from page 3 to an empty page 4.
pub fn can_go_next(page: PageNumber, total: usize, page_size: usize) -> bool {
    if page_size == 0 {
        return false;
    }
    let pages = (total as f64 / page_size as f64).round() as usize;
    page.get() <= pages
}

/// Ranked view sorts by vote count, highest first, keeping fetch order among ties.
pub fn order_for_display(mode: ViewMode, links: &[Link]) -> Vec<Link> {
    let mut ordered = links.to_vec();
    if mode == ViewMode::Top {
        ordered.sort_by(|a, b| b.vote_count().cmp(&a.vote_count()));
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinkId, Vote, VoteId};
    use chrono::{TimeZone, Utc};

    fn page(n: usize) -> PageNumber {
        PageNumber::new(n).unwrap()
    }

    fn link(id: &str, votes: usize) -> Link {
        Link {
            id: LinkId(id.to_string()),
            url: format!("https://{id}.example"),
            description: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            posted_by: None,
            votes: (0..votes)
                .map(|i| Vote {
                    id: VoteId(format!("{id}-v{i}")),
                })
                .collect(),
        }
    }

    #[test]
    fn new_view_pages_through_the_feed() {
        let pagination = Pagination::new(10);
        assert_eq!(
            pagination.shape_for(ViewMode::New, page(1)).unwrap(),
            QueryShape {
                first: 10,
                skip: 0,
                order_by: Some(OrderBy::CreatedAtDesc)
            }
        );
        assert_eq!(pagination.shape_for(ViewMode::New, page(4)).unwrap().skip, 30);
    }

    #[test]
    fn pages_past_the_addressable_range_are_invalid() {
        let pagination = Pagination::new(10);
        let huge: PageNumber = "2000000000000000000".parse().unwrap();
        assert_eq!(
            pagination.shape_for(ViewMode::New, huge),
            Err(Error::InvalidPage("2000000000000000000".to_string()))
        );
        assert!(pagination.offset(huge).is_err());
        assert!(pagination.shape_for(ViewMode::Top, huge).is_ok());
        assert_eq!(pagination.offset(page(3)), Ok(20));
    }

    #[test]
    fn top_view_ignores_the_page() {
        let pagination = Pagination::new(10);
        let expected = QueryShape {
            first: 100,
            skip: 0,
            order_by: None,
        };
        assert_eq!(pagination.shape_for(ViewMode::Top, page(1)).unwrap(), expected);
        assert_eq!(pagination.shape_for(ViewMode::Top, page(7)).unwrap(), expected);
    }

    #[test]
    fn shape_round_trips_to_page() {
        let pagination = Pagination::new(5);
        for n in 1..=20 {
            let shape = pagination.shape_for(ViewMode::New, page(n)).unwrap();
            assert_eq!(pagination.page_for(&shape), Some((ViewMode::New, page(n))));
        }
        let top = pagination.shape_for(ViewMode::Top, page(1)).unwrap();
        assert_eq!(pagination.page_for(&top), Some((ViewMode::Top, page(1))));
    }

    #[test]
    fn foreign_shapes_have_no_page() {
        let pagination = Pagination::new(5);
        let odd = QueryShape {
            first: 5,
            skip: 3,
            order_by: Some(OrderBy::CreatedAtDesc),
        };
        assert_eq!(pagination.page_for(&odd), None);
        let unordered = QueryShape {
            first: 5,
            skip: 0,
            order_by: None,
        };
        assert_eq!(pagination.page_for(&unordered), None);
    }

    #[test]
    fn previous_only_past_the_first_page() {
        assert!(!can_go_previous(page(1)));
        assert!(can_go_previous(page(2)));
    }

    #[test]
    fn next_uses_rounded_page_count() {
        assert!(can_go_next(page(1), 25, 10));
        assert!(can_go_next(page(3), 25, 10));
        assert!(!can_go_next(page(4), 25, 10));
        // 24 / 10 rounds down to 2
        assert!(can_go_next(page(2), 24, 10));
        assert!(!can_go_next(page(3), 24, 10));
        assert!(!can_go_next(page(1), 0, 10));
        assert!(!can_go_next(page(1), 25, 0));
    }

    #[test]
    fn top_ranks_by_votes_stably() {
        let links = vec![link("a", 2), link("b", 2), link("c", 5)];
        let ranked: Vec<_> = order_for_display(ViewMode::Top, &links)
            .into_iter()
            .map(|l| l.id.0)
            .collect();
        assert_eq!(ranked, ["c", "a", "b"]);
    }

    #[test]
    fn ties_keep_fetch_order() {
        let links = vec![
            link("a", 1),
            link("b", 3),
            link("c", 1),
            link("d", 3),
            link("e", 0),
        ];
        let ranked: Vec<_> = order_for_display(ViewMode::Top, &links)
            .into_iter()
            .map(|l| l.id.0)
            .collect();
        assert_eq!(ranked, ["b", "d", "a", "c", "e"]);
    }

    #[test]
    fn new_view_keeps_server_order() {
        let links = vec![link("a", 0), link("b", 9)];
        assert_eq!(order_for_display(ViewMode::New, &links), links);
    }
}
