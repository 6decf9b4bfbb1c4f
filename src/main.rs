use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rsk::{api, auth::GithubAuth, db};

#[derive(Parser)]
#[command(name = "rsk")]
#[command(about = "Risk-management record keeper")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the rsk server
    Serve {
        /// Port for HTTP
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Path to the SQLite database (defaults to the user data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print the version and exit
    Version,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "rsk=debug,tower_http=debug".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(port: u16, db_path: Option<PathBuf>) -> anyhow::Result<()> {
    let db = match db_path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;

    let app = api::create_router(db, GithubAuth::from_env());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("rsk listening on http://127.0.0.1:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port, db }) => serve(port, db).await?,
        Some(Commands::Version) => println!("{}", rsk::VERSION),
        // Default: start the server on the default port
        None => serve(8080, None).await?,
    }

    Ok(())
}
