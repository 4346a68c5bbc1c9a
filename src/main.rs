//! Waitline CLI
//!
//! Command-line front end for the queue dashboard:
//! - Watch the live event stream
//! - Poll queue statistics
//! - Acknowledge a notification
//! - Generate a config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use waitline::client::{
    build_http_client, AckClient, CsrfTokenSource, MetaTagToken, PollClient, StaticToken,
};
use waitline::config::{generate_default_config, Config};
use waitline::dashboard::{self, Dashboard};
use waitline::{
    DashboardSession, NotificationId, NotificationManager, QueueId, ReconnectPolicy,
    StreamTransport, UiEvent,
};

#[derive(Parser)]
#[command(name = "waitline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live dashboard for a queue server")]
#[command(long_about = "Waitline follows a queue server's live data stream, keeps your queue positions up to date and tells you when it is your turn.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Queue server URL, overrides the config file
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow the live stream. Type `ack` to dismiss a notification, `q` to quit
    Watch {
        /// Queues to show (default: every queue the stream reports)
        #[arg(short, long = "queue")]
        queues: Vec<String>,
        /// Stop when the stream drops instead of reconnecting
        #[arg(long)]
        no_reconnect: bool,
    },

    /// Fetch queue statistics once, or repeatedly with --interval-secs
    Poll {
        /// Show the summary of one queue you own
        #[arg(short, long)]
        queue: Option<String>,
        /// Repeat every N seconds until interrupted
        #[arg(short, long)]
        interval_secs: Option<u64>,
    },

    /// Mark a notification as read
    Ack {
        /// Notification id
        notification_id: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_ref());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(base_url) = cli.base_url {
        config.server.base_url = base_url;
    }

    waitline::telemetry::init_logging(&config.logging)?;
    tracing::info!("Waitline v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Watch {
            queues,
            no_reconnect,
        } => watch(&config, queues, no_reconnect).await,
        Commands::Poll {
            queue,
            interval_secs,
        } => poll(&config, queue, interval_secs).await,
        Commands::Ack { notification_id } => ack(&config, notification_id).await,
        Commands::Config { .. } => Ok(()),
    }
}

async fn watch(config: &Config, queues: Vec<String>, no_reconnect: bool) -> anyhow::Result<()> {
    let http = build_http_client(&config.http_settings())?;

    let ack = ack_client(config, http.clone());
    let notifications = NotificationManager::new(Arc::new(ack), config.notifications.delivery);

    let mut dashboard = Dashboard::new();
    for id in &queues {
        dashboard.mount(QueueId::new(id.as_str()));
    }

    let mut transport_config = config.transport_config();
    if no_reconnect {
        transport_config = transport_config.policy(ReconnectPolicy::Never);
    }
    tracing::info!(url = %transport_config.url, "Connecting to event stream");
    let (frames, transport) = StreamTransport::new(http, transport_config).spawn();

    let (ui_tx, ui_rx) = mpsc::channel(16);
    spawn_stdin_reader(ui_tx.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ui_tx.send(UiEvent::Quit).await;
        }
    });

    let mut session = DashboardSession::new(dashboard, notifications)
        .auto_mount(queues.is_empty())
        .ack_grace(config.request_timeout());
    println!("Waiting for updates. Type `ack` to dismiss a notification, `q` to quit.");

    let exit = session.run(frames, ui_rx, render).await;
    tracing::info!(exit = ?exit, frames = session.frames_processed(), "Session ended");

    // The receiver is gone, so the transport stops on its own
    match transport.await {
        Ok(exit) => tracing::debug!(exit = ?exit, "Event stream stopped"),
        Err(e) => tracing::warn!(error = %e, "Event stream task failed"),
    }

    Ok(())
}

async fn poll(config: &Config, queue: Option<String>, interval_secs: Option<u64>) -> anyhow::Result<()> {
    let http = build_http_client(&config.http_settings())?;
    let client = PollClient::new(http, config.server.base_url.clone(), config.request_timeout());
    let queue = queue.map(QueueId::new);

    let mut board = Dashboard::new();
    if queue.is_some() {
        board.mount_summary();
    }

    let Some(secs) = interval_secs else {
        poll_once(&client, queue.as_ref(), &mut board).await?;
        print!("{}", board);
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match poll_once(&client, queue.as_ref(), &mut board).await {
                    Ok(()) => print!("{}", board),
                    Err(e) => tracing::warn!(error = %e, "Poll failed"),
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Polling stopped");
                return Ok(());
            }
        }
    }
}

async fn poll_once(
    client: &PollClient,
    queue: Option<&QueueId>,
    board: &mut Dashboard,
) -> Result<(), waitline::PollError> {
    match queue {
        Some(id) => {
            let stats = client.fetch_dashboard_data(id).await?;
            dashboard::apply_dashboard_stats(board, &stats);
        }
        None => {
            for stats in client.fetch_queue_data().await? {
                if !board.contains(&stats.id) {
                    board.mount(stats.id.clone());
                }
                dashboard::apply_queue_stats(board, &stats);
            }
        }
    }
    Ok(())
}

async fn ack(config: &Config, notification_id: String) -> anyhow::Result<()> {
    let http = build_http_client(&config.http_settings())?;
    let client = ack_client(config, http);
    let id = NotificationId::new(notification_id);

    client
        .mark_as_read(&id)
        .await
        .with_context(|| format!("Failed to acknowledge notification {}", id))?;

    println!("Notification {} marked as read", id);
    Ok(())
}

fn ack_client(config: &Config, http: reqwest::Client) -> AckClient {
    let csrf: Arc<dyn CsrfTokenSource> = match &config.auth.csrf_token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => Arc::new(MetaTagToken::new(http.clone(), config.csrf_page_url())),
    };
    AckClient::new(
        http,
        config.server.base_url.clone(),
        csrf,
        config.request_timeout(),
    )
}

fn write_default_config(output: Option<&PathBuf>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Config written to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Map a line typed by the user to a session event
fn parse_command(line: &str) -> Option<UiEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "ack" | "ok" | "a" => Some(UiEvent::Acknowledge),
        "q" | "quit" | "exit" => Some(UiEvent::Quit),
        _ => None,
    }
}

/// Read commands on a plain thread; a blocked stdin read must not hold up
/// runtime shutdown
fn spawn_stdin_reader(tx: mpsc::Sender<UiEvent>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    break;
                }
            };

            match parse_command(&line) {
                Some(event) => {
                    if tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => eprintln!("Unknown command: {} (try `ack` or `q`)", line.trim()),
            }
        }
    });
}

fn render(session: &DashboardSession) {
    println!();
    if let Some(at) = session.last_frame_at() {
        println!("Updated {}", at.format("%H:%M:%S"));
    }
    print!("{}", session.dashboard());

    let modal = session.notifications().modal();
    if modal.is_visible() {
        println!();
        println!(">> {}", modal.message());
        println!("   Type `ack` to dismiss.");
    }
}
