//! CLI commands for the authorization sidecar.
//!
//! Available commands:
//! - `init` - Generate a new configuration file (TOML or YAML)
//! - `validate` - Validate configuration file syntax and semantics
//! - `run` - Start the Check endpoint
//!
//! # Example
//!
//! ```bash
//! authz-sidecar init
//! authz-sidecar validate
//! authz-sidecar run
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// External authorization sidecar: identity provider validation and
/// role-based policy for a directory API.
#[derive(Debug, Parser)]
#[command(name = "authz-sidecar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "authz-sidecar.toml")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output format (toml or yaml)
        #[arg(long, default_value = "toml")]
        format: String,

        /// Force overwrite existing file
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Validate configuration file
    Validate,

    /// Run the Check endpoint
    Run {
        /// Override listen host
        #[arg(long)]
        host: Option<String>,

        /// Override listen port
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Generate default configuration in either TOML or YAML format.
pub fn generate_config(format: &str) -> String {
    let toml = r#"# authz-sidecar configuration

default_provider = "github"
default_role = ""
user_deny_list = []

[server]
host = "127.0.0.1"
port = 8080

# [roles.admin]
# allowed_methods = ["*"]
# users = ["github:alice"]
# orgs = ["my-org"]

# [roles.reader]
# allowed_methods = ["/store.StoreService/Pull"]
# orgs = ["my-org"]
"#;

    if format == "yaml" {
        r#"# authz-sidecar configuration

default_provider: github
default_role: ""
user_deny_list: []

server:
  host: "127.0.0.1"
  port: 8080

# roles:
#   admin:
#     allowed_methods: ["*"]
#     users: ["github:alice"]
#     orgs: ["my-org"]
#   reader:
#     allowed_methods: ["/store.StoreService/Pull"]
#     orgs: ["my-org"]
"#
        .to_string()
    } else {
        toml.to_string()
    }
}
