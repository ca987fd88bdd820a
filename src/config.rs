use std::env;

use dotenv::dotenv;

use crate::error::{Error, Result};
use crate::models::Session;
use crate::pagination::Pagination;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Client settings, read from the environment (and a local `.env` file if there is one).
///
/// - `LINKFEED_ENDPOINT`: GraphQL endpoint URL, required
/// - `LINKFEED_PAGE_SIZE`: links per page of the chronological feed, default 10
/// - `LINKFEED_AUTH_TOKEN`: token of the signed-in user, if any
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub page_size: usize,
    pub auth_token: Option<String>,
}

impl Config {
    pub fn load_env_config() -> Result<Self> {
        // A missing .env file is fine.
        dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let endpoint = var("LINKFEED_ENDPOINT")
            .filter(|e| !e.is_empty())
            .ok_or_else(|| Error::Config("LINKFEED_ENDPOINT is not set".to_string()))?;
        let page_size = match var("LINKFEED_PAGE_SIZE") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| Error::Config(format!("invalid LINKFEED_PAGE_SIZE {raw:?}")))?,
            None => DEFAULT_PAGE_SIZE,
        };
        Ok(Config {
            endpoint,
            page_size,
            auth_token: var("LINKFEED_AUTH_TOKEN").filter(|t| !t.is_empty()),
        })
    }

    pub fn session(&self) -> Session {
        match &self.auth_token {
            Some(token) => Session::with_token(token.clone()),
            None => Session::anonymous(),
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page_size)
    }
}
