use canary::{Config, Environment, Server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    init_tracing(config.environment);

    info!(
        port = config.port,
        environment = config.environment.as_str(),
        "starting canary"
    );

    let app = canary::app(&config);
    let addr = format!("0.0.0.0:{}", config.port);

    if let Err(e) = Server::bind(&addr).serve(app).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
}

/// Development gets a verbose, human-oriented sink; production gets compact
/// `info`-level output. `RUST_LOG` overrides either.
fn init_tracing(environment: Environment) {
    let default_filter = match environment {
        Environment::Development => "canary=debug,info",
        Environment::Production => "info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if environment.is_production() {
        builder.compact().init();
    } else {
        builder.pretty().init();
    }
}
