//! Tokengate - bearer-token issuance behind credential, origin and allowlist gates

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use tokengate::{
    cli::{Cli, Command},
    config::{AllowlistSource, Config, SecretBackend},
    forwarder::Allowlist,
    gateway::Gateway,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Command::CheckConfig) => check_config(&config),
        Some(Command::Serve) | None => run_server(config).await,
    }
}

/// Load configuration and apply CLI overrides
fn load_config(cli: &Cli) -> tokengate::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref host) = cli.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = cli.internal_port {
        config.server.internal_port = port;
    }
    Ok(config)
}

/// Validate configuration and print a summary with secrets redacted
fn check_config(config: &Config) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("❌ {e}");
        return ExitCode::FAILURE;
    }

    let allowlist = Allowlist::from_source(&config.forwarder.allowed_ips);
    let allowlist_shape = match config.forwarder.allowed_ips {
        AllowlistSource::List(_) => "list",
        AllowlistSource::Csv(_) => "comma-separated",
        AllowlistSource::Malformed(_) => "malformed",
    };

    println!("✅ Configuration is valid\n");
    println!(
        "Public listener:    {}:{}",
        config.server.host, config.server.port
    );
    println!(
        "Internal listener:  {}:{}",
        config.server.internal_host, config.server.internal_port
    );
    match config.secrets.backend {
        SecretBackend::Http => println!(
            "Signing secret:     {} in store '{}' at {} (timeout {:?})",
            config.secrets.key,
            config.secrets.store_id,
            config.secrets.endpoint,
            config.secrets.timeout
        ),
        SecretBackend::Env => println!(
            "Signing secret:     {} from process environment",
            config.secrets.key
        ),
    }
    println!(
        "Store credential:   {}",
        if config.secrets.auth_token.is_some() {
            "<redacted>"
        } else {
            "none"
        }
    );
    println!(
        "Credential gate:    {} / <redacted>",
        config.credentials.identifier
    );
    println!("Trusted origin:     {}", config.trusted_origin.identity);
    println!(
        "Forwarder:          {}{} (timeout {:?})",
        config.forwarder.internal_base_url.trim_end_matches('/'),
        config.forwarder.path,
        config.forwarder.timeout
    );
    println!(
        "Allowlist:          {} entr{} ({allowlist_shape})",
        allowlist.len(),
        if allowlist.len() == 1 { "y" } else { "ies" }
    );

    ExitCode::SUCCESS
}

/// Run the gateway server
async fn run_server(config: Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        internal_port = config.server.internal_port,
        "Starting Tokengate"
    );

    let gateway = match Gateway::new(config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = gateway.run().await {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gateway shutdown complete");
    ExitCode::SUCCESS
}
