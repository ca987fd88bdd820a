use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use env_logger::Env;
use linkfeed::{render_links, Config, GraphqlGateway, SearchSession};

#[derive(Parser, Debug)]
struct Args {
    /// Text to look for in link descriptions and URLs
    filter: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_env_config()?;

    let mut search = SearchSession::new(GraphqlGateway::new(&config.endpoint));
    let links = search.execute(&args.filter).await?;
    if links.is_empty() {
        println!("No links match {:?}", args.filter);
    } else {
        println!("{}", render_links(links, 0, false, Utc::now()));
    }
    Ok(())
}
