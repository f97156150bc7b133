use clap::Parser;
use freelance_ops::shell::cli::{self, Cli};
use freelance_ops::shell::config::AppConfig;
use freelance_ops::shell::context::AppContext;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.apply_to(AppConfig::from_env()?);
    let context = AppContext::open(config).await?;
    context.init().await?;

    let mut stdout = std::io::stdout().lock();
    let result = cli::run(cli.command, &context, &mut stdout).await;
    context.shutdown().await?;
    result
}
