use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::models::{PageNumber, ViewMode};

/// Where the reader is in the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    New(PageNumber),
    Top,
    Search,
    Create,
    Login,
}

impl Route {
    /// The feed view behind this route, if it shows one.
    pub fn feed_view(&self) -> Option<(ViewMode, PageNumber)> {
        match self {
            Route::New(page) => Some((ViewMode::New, *page)),
            Route::Top => Some((ViewMode::Top, PageNumber::FIRST)),
            Route::Search | Route::Create | Route::Login => None,
        }
    }

    pub fn for_view(mode: ViewMode, page: PageNumber) -> Self {
        match mode {
            ViewMode::New => Route::New(page),
            ViewMode::Top => Route::Top,
        }
    }
}

impl FromStr for Route {
    type Err = Error;

    /// `/` and a bare `/new` land on the first page of the chronological feed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            [""] | ["new"] => Ok(Route::New(PageNumber::FIRST)),
            ["new", page] => Ok(Route::New(page.parse()?)),
            ["top"] => Ok(Route::Top),
            ["search"] => Ok(Route::Search),
            ["create"] => Ok(Route::Create),
            ["login"] => Ok(Route::Login),
            _ => Err(Error::InvalidRoute(s.to_string())),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::New(page) => write!(f, "/new/{page}"),
            Route::Top => f.write_str("/top"),
            Route::Search => f.write_str("/search"),
            Route::Create => f.write_str("/create"),
            Route::Login => f.write_str("/login"),
        }
    }
}
