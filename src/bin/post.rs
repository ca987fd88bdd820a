use anyhow::{bail, Result};
use chrono::Utc;
use clap::Parser;
use env_logger::Env;
use linkfeed::{render_view, Config, FeedController, GraphqlGateway};

#[derive(Parser, Debug)]
struct Args {
    /// A description for the link
    #[arg(long)]
    description: String,

    /// The URL for the link
    #[arg(long)]
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_env_config()?;
    if config.auth_token.is_none() {
        bail!("Submitting links requires LINKFEED_AUTH_TOKEN");
    }

    let mut controller = FeedController::new(
        GraphqlGateway::new(&config.endpoint),
        config.session(),
        config.pagination(),
    );
    let link = controller.submit_link(&args.description, &args.url).await?;

    println!("Submitted {}", link.id);
    println!("{}", render_view(&controller, Utc::now()));
    Ok(())
}
