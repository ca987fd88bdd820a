use log::info;

use crate::error::Result;
use crate::gateway::Gateway;
use crate::models::Link;

/// Free-text search over the whole feed.
///
/// Each search is a one-shot query whose result replaces the previous one. Results are never
/// cached, paginated or kept live.
pub struct SearchSession<G> {
    gateway: G,
    filter: String,
    links: Vec<Link>,
}

impl<G: Gateway> SearchSession<G> {
    pub fn new(gateway: G) -> Self {
        SearchSession {
            gateway,
            filter: String::new(),
            links: Vec::new(),
        }
    }

    pub async fn execute(&mut self, filter: &str) -> Result<&[Link]> {
        let links = self.gateway.search(filter).await?;
        info!("Search {filter:?} matched {} links", links.len());
        self.filter = filter.to_string();
        self.links = links;
        Ok(&self.links)
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }
}
