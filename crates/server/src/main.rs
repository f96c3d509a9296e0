use clap::Parser;

use orthoassist_server::cli::{dispatch, Cli};

fn load_config() -> orthoassist_core::Config {
    orthoassist_core::config::load_dotenv();
    orthoassist_core::Config::from_env()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config();
    config.log_summary();

    dispatch(cli, config).await
}
