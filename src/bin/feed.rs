use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use env_logger::Env;
use linkfeed::{render_view, Config, FeedController, GraphqlGateway, Route};
use log::{info, warn};

#[derive(Parser, Debug)]
struct Args {
    /// Feed view to show: `/new/<page>` or `/top`
    #[arg(long, default_value = "/")]
    route: String,

    /// Keep running and redraw the view whenever a link or vote comes in
    #[arg(long)]
    follow: bool,
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
    controller
        .open(route)
        .await
        .with_context(|| format!("couldn't open {route}"))?;
    println!("{}", render_view(&controller, Utc::now()));

    if args.follow {
        info!("Following live updates, Ctrl-C to stop");
        loop {
            let event = tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = controller.next_event() => event,
            };
            if event.is_none() {
                warn!("No live channel left");
                break;
            }
            println!("\n{}", render_view(&controller, Utc::now()));
        }
        controller.unmount();
    }
    Ok(())
}
