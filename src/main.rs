use anyhow::Context;
use clap::{Parser, Subcommand};
use clinic_backend::app::ModuleRegistry;
use clinic_backend::config::Config;
use clinic_backend::{logging, metrics, server, storage};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "clinic_backend")]
#[command(about = "Clinic management API for staff, doctors and patients")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on, overriding PORT and the config file
        #[arg(long)]
        port: Option<u16>,
    },
    /// Create the configured super admin account if it does not exist
    SeedAdmin,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().context("failed to load configuration")?;
    let _guard = logging::init_logging(&config.logging)?;

    let store = storage::open_store(&config.database).await?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(metrics_port) = config.metrics.port {
                metrics::init_metrics(metrics_port);
            }

            let registry = ModuleRegistry::new(store, config.clone());
            match registry.staff().seed_super_admin(&config.super_admin).await {
                Ok(true) => info!("Super admin account created"),
                Ok(false) => {}
                Err(e) => warn!("Skipping super admin seeding: {}", e),
            }

            server::start_server(&config.server, registry).await?;
        }
        Commands::SeedAdmin => {
            if config.database.url.is_none() {
                warn!("No database configured; the seeded account will not outlive this process");
            }
            let registry = ModuleRegistry::new(store, config.clone());
            let created = registry.staff().seed_super_admin(&config.super_admin).await?;
            if created {
                println!("✅ Super admin created");
            } else {
                println!("Super admin already exists, nothing to do");
            }
        }
    }

    Ok(())
}
