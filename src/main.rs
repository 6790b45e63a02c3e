//! authz-sidecar - External authorization sidecar for a directory API

use std::sync::Arc;

use authz_sidecar::{
    cli::{generate_config, Cli, Commands},
    config::Config,
    handler::Handler,
    observability::init_tracing,
    provider::{GitHubProvider, Registry},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init { format, force } => {
            let filename = if format == "yaml" {
                "authz-sidecar.yaml"
            } else {
                "authz-sidecar.toml"
            };

            let path = std::path::Path::new(filename);
            if path.exists() && !force {
                eprintln!(
                    "Error: {} already exists. Use --force to overwrite.",
                    filename
                );
                std::process::exit(1);
            }

            let config = generate_config(&format);
            std::fs::write(filename, config)?;
            println!("Created configuration file: {}", filename);
        }

        Commands::Validate => match Config::from_file(&cli.config) {
            Ok(_) => {
                println!("Configuration is valid: {}", cli.config.display());
            }
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Run { host, port } => {
            let mut config = Config::from_file(&cli.config)?;

            if let Some(h) = host {
                config.server.host = h;
            }
            if let Some(p) = port {
                config.server.port = p;
            }

            let mut registry = Registry::new();
            registry.register(Arc::new(GitHubProvider::new()?));

            let host = config.server.host.clone();
            let port = config.server.port;
            let handler = Arc::new(Handler::new(registry, config));

            let state = Arc::new(AppState {
                handler,
                host,
                port,
            });

            server::run(state).await?;
        }
    }

    Ok(())
}
