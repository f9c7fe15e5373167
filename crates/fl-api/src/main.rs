//! CLI entry point for the FL admin API server.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use fl_core::Role;
use fl_graph::GraphClient;

use fl_api::auth::JwtValidator;
use fl_api::config::ApiConfig;
use fl_api::context::ApiContext;
use fl_api::external::{LogIdentityProvider, LogNotifier, SandboxGateway};
use fl_api::http::{self, AppState};
use fl_api::schema::build_schema;

#[derive(Parser)]
#[command(name = "fl-admin")]
#[command(about = "GraphQL API for the FL church admin portal")]
struct Cli {
    /// Config file prefix (default: fl-admin).
    #[arg(short, long, default_value = "fl-admin", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Override `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the GraphQL schema (SDL) and exit.
    Schema,
    /// Mint a signed token for local development.
    Token {
        #[arg(long)]
        sub: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Role claim such as `adminCouncil`. Repeatable.
        #[arg(long = "role")]
        roles: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();

    match cli.command {
        Command::Schema => {
            println!("{}", build_schema(None).sdl());
        }
        Command::Token { sub, email, roles } => {
            let config = ApiConfig::load(&cli.config)?;
            let validator = JwtValidator::new(&config.auth)?;
            let roles = roles
                .iter()
                .map(|r| r.parse::<Role>())
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", validator.issue(&sub, &email, &roles)?);
        }
        Command::Serve { bind } => {
            let config = ApiConfig::load(&cli.config)?;
            let validator = JwtValidator::new(&config.auth)?;

            let graph = GraphClient::connect(&config.neo4j).await?;
            graph.ensure_schema().await?;

            let context = ApiContext {
                graph,
                policy: config.policy.clone(),
                identity: Arc::new(LogIdentityProvider),
                notifier: Arc::new(LogNotifier),
                payments: Arc::new(SandboxGateway),
            };
            let state = AppState {
                schema: build_schema(Some(context)),
                validator,
            };

            let addr = bind.unwrap_or_else(|| config.server.bind.clone());
            http::serve(http::router(state, &config.server), &addr).await?;
        }
    }

    Ok(())
}
