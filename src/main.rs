use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use realmgate::config::{self, FileTokenSource};
use realmgate::control::ControlSurface;
use realmgate::listener;
use realmgate::mcp::McpServer;
use realmgate::resolver::RealmsClient;
use realmgate::state::GameState;
use realmgate_protocol::Listener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// The address the local listener binds. Clients connect here.
    #[arg(long, default_value = ":19132")]
    listen: String,

    /// Realm invite code, overriding the environment and file lookup.
    #[arg(long)]
    invite: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("failed to set up logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr and to the truncated log file. Stdout belongs to the
/// tool channel and must stay clean.
fn init_logging() -> anyhow::Result<()> {
    let file = std::fs::File::create(config::LOG_PATH)?;

    tracing_subscriber::registry()
        .with(LevelFilter::DEBUG)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let listen_addr = config::parse_listen_addr(&cli.listen)?;
    let invite = config::find_invite(cli.invite.as_deref())?;
    let tokens = Arc::new(FileTokenSource::load(config::TOKEN_PATH)?);

    let listener = Listener::bind(listen_addr).await?;
    info!(
        name = config::FRIENDLY_NAME,
        addr = %listener.local_addr()?,
        "listening for clients"
    );

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; shutting down");
                cancel.cancel();
            }
        });
    }

    let state = Arc::new(GameState::new());

    let listener_task = tokio::spawn(listener::run(
        listener,
        invite,
        RealmsClient::new(tokens),
        state.clone(),
        cancel.clone(),
    ));

    let mut server = McpServer::new(ControlSurface::new(state), cancel.clone());
    server.run_stdio().await?;

    cancel.cancel();
    let _ = listener_task.await;

    Ok(())
}
