use clap::{Parser, Subcommand};
use data_client::config::db::DbKind;
use data_client::extensions::accelerate::with_accelerate;
use data_client::logging::sanitize_db_url;
use data_client::{load, ClientError, ClientSettings, ExtensionChain};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "data-client")]
#[command(about = "Inspect and check the shared data-access client")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the configuration resolved from the environment
    Plan,
    /// Load the clients and run `SELECT 1` on each connection
    Ping,
}

fn plan(settings: &ClientSettings) -> Result<(), ClientError> {
    let chain = ExtensionChain::builder(settings.connection.log.clone())
        .observability(&settings.features)
        .accelerate(with_accelerate());
    let engine = DbKind::from_url(&settings.connection.url)?.engine_name();

    println!("env:            {:?}", settings.env);
    println!(
        "client cache:   {}",
        if settings.env.caches_clients() {
            "reuse"
        } else {
            "fresh per load"
        }
    );
    println!(
        "database:       {} ({engine})",
        sanitize_db_url(&settings.connection.url)
    );
    println!(
        "log:            {}{}",
        settings.connection.log.categories(),
        if settings.connection.log.is_explicit() {
            ""
        } else {
            " (default)"
        }
    );
    println!("extensions:     {}", chain.names().join(" -> "));
    match &settings.readonly_url {
        Some(url) => println!("readonly:       {}", sanitize_db_url(url)),
        None => println!("readonly:       primary"),
    }
    Ok(())
}

async fn select_one(conn: &DatabaseConnection) -> Result<(), ClientError> {
    let backend = conn.get_database_backend();
    conn.query_one(Statement::from_string(backend, "SELECT 1"))
        .await?;
    Ok(())
}

async fn ping(settings: &ClientSettings) -> Result<(), ClientError> {
    let clients = load(settings).await?;

    select_one(clients.primary.connection()).await?;
    info!("ping=primary ok");

    if clients.readonly.is_shared() {
        info!("ping=readonly shares primary");
    } else {
        select_one(clients.readonly.connection()).await?;
        info!("ping=readonly ok");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("data_client=info,client_cli=info,sqlx=warn")),
        )
        .init();

    let args = Args::parse();

    let settings = match ClientSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let result = match args.command {
        Command::Plan => plan(&settings),
        Command::Ping => ping(&settings).await,
    };

    if let Err(e) = result {
        eprintln!("data-client failed: {e}");
        std::process::exit(1);
    }
}
