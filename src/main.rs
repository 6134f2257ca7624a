use anyhow::Result;
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod health;
mod sources;

use crate::audio::{registry::SessionRegistry, voice::SongbirdVoice};
use crate::bot::{notifier::ChannelNotifier, MusicBot};
use crate::config::Config;
use crate::sources::YtDlpResolver;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jukebox_bot=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Starting Jukebox Bot v{}", env!("CARGO_PKG_VERSION"));

    // Container probe, no Discord login
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    // Load configuration
    let config = Arc::new(Config::load()?);
    info!("{}", config.summary());

    // Health endpoint runs with or without a token
    let port = config.port;
    let health_server = tokio::spawn(async move {
        let served = health::serve(port).await;
        if let Err(e) = &served {
            error!("❌ Health server stopped: {:?}", e);
        }
        served
    });

    let Some(token) = config.discord_token.clone() else {
        error!("❌ DISCORD_BOT_TOKEN is not set, only the health server will run");
        return health_server.await?;
    };

    // Voice manager, notices and the session registry
    let manager = Songbird::serenity();
    let http = Arc::new(Http::new(&token));

    let (registry, events) = SessionRegistry::new(
        Arc::new(SongbirdVoice::new(manager.clone())),
        Arc::new(YtDlpResolver::new(config.search_timeout)),
        Arc::new(ChannelNotifier::new(http)),
        config.session_settings(),
    );
    let registry = Arc::new(registry);
    tokio::spawn(registry.clone().run(events));

    // Minimal intents for prefix commands and voice
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // Build the client
    let handler = MusicBot::new(config.clone(), registry);
    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .register_songbird_with(manager)
        .await
        .map_err(|e| anyhow::anyhow!("Could not build the Discord client: {e}"))?;

    // Graceful shutdown
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Shutdown signal received, exiting...");
        std::process::exit(0);
    });

    // Start the bot
    info!("🚀 Logging in to Discord");
    if let Err(why) = client.start().await {
        error!("❌ Discord client stopped: {:?}", why);
        anyhow::bail!("Discord login failed: {why}");
    }

    Ok(())
}

/// Container probe: checks the external tools playback depends on.
async fn health_check() -> Result<()> {
    let mut tools = Vec::new();
    for (tool, flag) in REQUIRED_TOOLS {
        let ok = async_process::Command::new(tool)
            .arg(flag)
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false);
        tools.push((tool, ok));
    }

    check_tools(&tools)?;
    println!("OK");
    Ok(())
}

/// Binaries probed by `--health-check`, with their version flag.
const REQUIRED_TOOLS: [(&str, &str); 2] = [("yt-dlp", "--version"), ("ffmpeg", "-version")];

fn check_tools(results: &[(&str, bool)]) -> Result<()> {
    let missing: Vec<&str> = results
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(tool, _)| *tool)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("Missing dependencies: {}", missing.join(", "));
    }
}
