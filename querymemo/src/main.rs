use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use querymemo::api::server::{ApiServer, ApiServerConfig};
use querymemo::api::JwtAuth;
use querymemo::backend::CommandBackend;
use querymemo_cache::{derive_key, QueryCacheConfig};

#[derive(Parser)]
#[command(name = "querymemo")]
#[command(about = "Query service with a query-identity result cache", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// JWT secret key (can also use JWT_SECRET env var)
        #[arg(long)]
        jwt_secret: Option<String>,

        /// Cache TTL in seconds (overrides QUERY_CACHE_TTL_SECS)
        #[arg(long)]
        ttl_secs: Option<u64>,

        /// Program answering queries; the query is appended as last argument
        #[arg(long)]
        backend: Option<PathBuf>,

        /// Extra arguments for the backend program
        #[arg(long = "backend-arg")]
        backend_args: Vec<String>,

        /// Working directory for the backend program
        #[arg(long, default_value = ".")]
        backend_dir: PathBuf,
    },

    /// Print the cache key a query maps to
    Key {
        /// Query text (trimmed before hashing)
        query: String,

        /// Requester scope
        #[arg(short, long, default_value = "")]
        scope: String,
    },

    /// Issue a requester token for local testing
    Token {
        /// Requester id (becomes the cache scope)
        requester: String,

        /// Token lifetime in hours
        #[arg(long, default_value = "24")]
        hours: i64,

        /// JWT secret key (can also use JWT_SECRET env var)
        #[arg(long)]
        jwt_secret: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "querymemo=info,querymemo_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            ref host,
            port,
            ref jwt_secret,
            ttl_secs,
            ref backend,
            ref backend_args,
            ref backend_dir,
        } => {
            let mut cache = QueryCacheConfig::from_env()?;
            if let Some(secs) = ttl_secs {
                cache.default_ttl = Duration::from_secs(secs);
            }

            let config = ApiServerConfig {
                host: host.clone(),
                port,
                jwt_secret: resolve_secret(jwt_secret),
                cache,
                ..ApiServerConfig::default()
            };

            let mut server = ApiServer::new(config);
            if let Some(program) = backend {
                server = server.with_backend(Arc::new(
                    CommandBackend::new(program)
                        .with_args(backend_args.clone())
                        .with_working_dir(backend_dir.clone()),
                ));
            }

            println!("Starting API server on {}:{}", host, port);
            server.start().await?;
        }

        Commands::Key { ref query, ref scope } => {
            let trimmed = query.trim();
            if trimmed.is_empty() {
                anyhow::bail!("Query text must not be empty");
            }
            println!("{}", derive_key(trimmed, scope));
        }

        Commands::Token {
            ref requester,
            hours,
            ref jwt_secret,
        } => {
            let auth = JwtAuth::new(&resolve_secret(jwt_secret));
            println!("{}", auth.issue(requester, Some(hours))?);
        }
    }

    Ok(())
}

fn resolve_secret(flag: &Option<String>) -> String {
    flag.clone()
        .or_else(|| std::env::var("JWT_SECRET").ok())
        .unwrap_or_else(|| {
            eprintln!(
                "Warning: Using default JWT secret. \
                 Set JWT_SECRET env var or --jwt-secret for production."
            );
            "default_secret_change_in_production".to_string()
        })
}
