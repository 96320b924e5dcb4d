//! Sentiment Chat - Terminal Client for the Market Assistant
//!
//! Interactive front end for one chat session against the dashboard
//! backend. Replies stream in as they are generated; dashboard data can be
//! pulled with slash commands.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (http://localhost:8001)
//! sentiment-chat
//!
//! # Another backend
//! sentiment-chat --base-url http://sentiment.internal:8001
//!
//! # With config file
//! sentiment-chat --config ~/.config/market-sentiment/chat.toml
//!
//! # Verbose logging (to stderr)
//! RUST_LOG=debug sentiment-chat
//! ```
//!
//! # Keys
//!
//! - `Ctrl-C`: stop the streaming reply, or quit when nothing is streaming
//! - `Ctrl-D`: quit

mod commands;
mod render;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use chat_core::{
    load_config, load_config_from_path, ChatBackend, ChatSession, ConfigOverrides,
    DashboardClient, DashboardError, SendOutcome, SessionState,
};
use commands::{Command, HELP};

/// How long to wait for a stopped exchange to let go when quitting
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Sentiment Chat - ask the market assistant from the terminal
#[derive(Parser, Debug)]
#[command(name = "sentiment-chat")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Backend base URL (overrides config file and environment)
    #[arg(short = 'u', long, value_name = "URL")]
    base_url: Option<String>,

    /// Chat endpoint path
    #[arg(long, value_name = "PATH")]
    chat_path: Option<String>,

    /// Connect timeout in milliseconds
    #[arg(long, value_name = "MS")]
    connect_timeout_ms: Option<u64>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "SENTIMENT_CHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "SENTIMENT_CHAT_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref url) = self.base_url {
            overrides = overrides.with_base_url(url.clone());
        }
        if let Some(ref path) = self.chat_path {
            overrides = overrides.with_chat_path(path.clone());
        }
        if let Some(ms) = self.connect_timeout_ms {
            overrides = overrides.with_connect_timeout_ms(ms);
        }
        overrides
    }
}

/// Initialize logging with the specified level
///
/// Logs go to stderr; stdout carries the conversation.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("chat_cli={level},chat_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// What the input loop should do next
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Terminal front end: one session, one dashboard client, async stdout
struct Client<B: ChatBackend + 'static> {
    session: ChatSession<B>,
    dashboard: DashboardClient,
    stdout: tokio::io::Stdout,
}

impl<B: ChatBackend + 'static> Client<B> {
    async fn print(&mut self, text: &str) -> Result<()> {
        self.stdout.write_all(text.as_bytes()).await?;
        self.stdout.flush().await?;
        Ok(())
    }

    async fn handle(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Send(text) => match self.session.send(&text) {
                SendOutcome::Started(id) => info!(exchange = %id, "Question sent"),
                SendOutcome::Rejected(reason) => {
                    self.print(&format!("(not sent: {reason}; /stop to interrupt)\n"))
                        .await?;
                }
            },
            Command::Stop => {
                if !self.session.stop() {
                    self.print("(nothing to stop)\n").await?;
                }
            }
            Command::New => self.session.new_conversation(),
            Command::Cards => {
                let out = match self.dashboard.sentiment_cards().await {
                    Ok(cards) => render::format_cards(&cards),
                    Err(e) => dashboard_error(&e),
                };
                self.print(&out).await?;
            }
            Command::Trending(commodity) => {
                let result = match commodity {
                    Some(ref c) => self.dashboard.trending_keywords_for(c).await,
                    None => self.dashboard.trending_keywords().await,
                };
                let out = match result {
                    Ok(keywords) => render::format_keywords(&keywords),
                    Err(e) => dashboard_error(&e),
                };
                self.print(&out).await?;
            }
            Command::Series(commodity) => {
                let out = match self.dashboard.time_series(&commodity).await {
                    Ok(points) => render::format_series(&commodity, &points),
                    Err(e) => dashboard_error(&e),
                };
                self.print(&out).await?;
            }
            Command::News(commodity) => {
                let out = match self.dashboard.news(&commodity).await {
                    Ok(articles) => render::format_news(&articles),
                    Err(e) => dashboard_error(&e),
                };
                self.print(&out).await?;
            }
            Command::Health => {
                let out = match self.dashboard.health().await {
                    Ok(health) => render::format_health(&health),
                    Err(e) => dashboard_error(&e),
                };
                self.print(&out).await?;
            }
            Command::Help => self.print(&format!("{HELP}\n")).await?,
            Command::Quit => return Ok(Flow::Quit),
            Command::MissingArgument(name) => {
                self.print(&format!("(/{name} needs a commodity name)\n"))
                    .await?;
            }
            Command::Unknown(name) => {
                self.print(&format!("(unknown command /{name}; try /help)\n"))
                    .await?;
            }
        }
        Ok(Flow::Continue)
    }

    /// Ctrl-C: stop a streaming reply, otherwise quit
    fn interrupt(&self) -> Flow {
        match self.session.state() {
            SessionState::Sending => {
                self.session.stop();
                Flow::Continue
            }
            SessionState::Cancelling => Flow::Continue,
            SessionState::Idle => Flow::Quit,
        }
    }

    async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let flow = tokio::select! {
                line = lines.next_line() => {
                    match line.context("Failed to read input")? {
                        Some(line) => match Command::parse(&line) {
                            Some(command) => self.handle(command).await?,
                            None => Flow::Continue,
                        },
                        // EOF
                        None => Flow::Quit,
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for Ctrl-C")?;
                    self.interrupt()
                }
            };

            if flow == Flow::Quit {
                break;
            }
        }

        if self.session.stop()
            && tokio::time::timeout(SHUTDOWN_GRACE, self.session.wait_idle())
                .await
                .is_err()
        {
            warn!("Exchange did not stop in time");
        }
        Ok(())
    }
}

fn dashboard_error(error: &DashboardError) -> String {
    warn!(error = %error, "Dashboard request failed");
    format!("(dashboard: {error})\n")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging first
    init_logging(&args.log_level);

    info!("Sentiment chat starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone())).await,
        None => load_config().await,
    }
    .context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        base_url = %config.backend.base_url,
        chat_path = %config.backend.chat_path,
        source = %config.source(),
        "Configuration loaded"
    );

    let session = ChatSession::from_config(&config).context("Failed to create chat session")?;
    let dashboard =
        DashboardClient::from_settings(&config.backend).context("Failed to create dashboard client")?;

    let renderer = tokio::spawn(render::run(session.subscribe()));

    let mut client = Client {
        session,
        dashboard,
        stdout: tokio::io::stdout(),
    };
    client.print("Market assistant ready. /help for commands.\n").await?;
    let result = client.run().await;

    // Dropping the session closes the event channel and ends the renderer
    drop(client);
    let _ = renderer.await;

    info!("Sentiment chat stopped");
    result
}
