use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use env_logger::Env;
use linkfeed::{render_view, Config, FeedController, GraphqlGateway, LinkId, Route};

#[derive(Parser, Debug)]
struct Args {
    /// Id of the link to vote for
    #[arg(long)]
    link_id: String,

    /// Feed view to show the updated count in
    #[arg(long, default_value = "/")]
    route: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_env_config()?;
    let route: Route = args.route.parse()?;

    let mut controller = FeedController::new(
        GraphqlGateway::new(&config.endpoint),
        config.session(),
        config.pagination(),
    );
    controller.open(route).await?;
    controller.vote(&LinkId(args.link_id)).await?;

    println!("{}", render_view(&controller, Utc::now()));
    Ok(())
}
