//! rtcpass
//!
//! Serves `POST /agora-token`, or mints a single token from the command line.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use rtcpass_core::config::{Config, load_config};
use rtcpass_core::tracing_init::init_tracing;
use rtcpass_server::routes::{AppState, TokenRequestBody, Uid, build_router, issue_for};
use rtcpass_token::{ChecksumMode, Role};

#[derive(Parser, Debug)]
#[command(name = "rtcpass")]
#[command(version, about = "Join-token issuer for real-time audio/video channels")]
struct Cli {
    /// Path to a JSON settings file.
    #[arg(long, global = true, env = "RTCPASS_CONFIG")]
    config: Option<PathBuf>,

    /// Application identifier embedded in every token.
    #[arg(long, global = true, env = "AGORA_APP_ID")]
    app_id: Option<String>,

    /// Application secret used to sign tokens.
    #[arg(long, global = true, env = "AGORA_APP_CERTIFICATE", hide_env_values = true)]
    app_secret: Option<String>,

    /// Token lifetime in seconds.
    #[arg(long, global = true)]
    validity_secs: Option<u32>,

    /// Reserved checksum fields: `zeroed` or `crc32`.
    #[arg(long, global = true)]
    checksum_mode: Option<ChecksumMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP endpoint.
    Serve {
        /// Address to listen on.
        #[arg(long)]
        addr: Option<String>,

        /// Output logs as JSON (for structured log aggregation).
        #[arg(long)]
        log_json: bool,
    },
    /// Issue one token and print the response JSON.
    Issue {
        /// Channel to join.
        #[arg(long)]
        channel: String,

        /// Participant id; `0` allows any participant.
        #[arg(long, default_value = "0")]
        uid: String,

        /// `publisher` or `subscriber`.
        #[arg(long, default_value = "publisher")]
        role: Role,
    },
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(secs) = self.validity_secs {
            config.issuer.validity_secs = secs;
        }
        if let Some(mode) = self.checksum_mode {
            config.issuer.checksum_mode = mode;
        }
        if let Command::Serve { addr, log_json } = &self.command {
            if let Some(addr) = addr {
                config.server.addr.clone_from(addr);
            }
            config.server.log_json |= *log_json;
        }
        config.validate()?;
        Ok(config)
    }

    fn app_state(&self, config: &Config) -> anyhow::Result<AppState> {
        AppState::from_config(&config.issuer, self.app_id.clone(), self.app_secret.clone())
            .map_err(|e| {
                error!(error = %e, "Issuer is not configured");
                e.into()
            })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    match &cli.command {
        Command::Serve { .. } => {
            init_tracing("rtcpass_server=info,rtcpass_token=info,tower_http=info", config.server.log_json);
            let state = cli.app_state(&config)?;
            serve(&config, state).await
        }
        Command::Issue { channel, uid, role } => {
            init_tracing("warn", false);
            let state = cli.app_state(&config)?;
            issue_once(&state, channel, uid, *role)
        }
    }
}

async fn serve(config: &Config, state: AppState) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr,
        app_id = %state.issuer.app_id(),
        validity_secs = config.issuer.validity_secs,
        checksum_mode = %config.issuer.checksum_mode,
        "Starting rtcpass"
    );

    let app = build_router(state, &config.server.allowed_origins);
    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("rtcpass stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}

#[allow(clippy::print_stdout)]
fn issue_once(state: &AppState, channel: &str, uid: &str, role: Role) -> anyhow::Result<()> {
    let uid = uid.parse::<u64>().map_or_else(|_| Uid::Text(uid.to_string()), Uid::Number);
    let body = TokenRequestBody {
        channel_name: Some(channel.to_string()),
        uid: Some(uid),
        role: Some(role as i64),
    };
    let response = issue_for(&state.issuer, body)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
