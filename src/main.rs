use chunkd::config::{self, Config};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let mut cfg = Config::load()?;
    let arg = std::env::args().nth(1);
    cfg.server.port = config::parse_port(arg.as_deref(), cfg.server.port);

    tracing::info!("Using port {}", cfg.server.port);

    chunkd::server::serve(cfg)
}
