use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

use dota_audio::{
    audio::{IdleMonitor, PlayerRegistry},
    bot::DotaAudioBot,
    cache::{HttpFetcher, TrackCache},
    config::Config,
    voice::{transcode::Transcoder, SongbirdGateway},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dota_audio=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Starting dota-audio v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    info!("{}", config.summary());

    let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout)?);
    let cache = Arc::new(TrackCache::new(config.cache_dir.clone(), fetcher));

    let manager = Songbird::serenity();
    let transcoder = Transcoder::new(config.ffmpeg_path.clone(), config.loudnorm_filter.clone());
    let gateway = Arc::new(SongbirdGateway::new(manager.clone(), transcoder));

    let registry = Arc::new(PlayerRegistry::new(gateway.clone(), cache, config.volume()));
    let idle = Arc::new(IdleMonitor::new(registry.clone(), config.idle()));

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let config = Arc::new(config);
    let handler = DotaAudioBot::new(config.clone(), registry.clone(), idle.clone(), gateway);

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(manager)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Could not register Ctrl+C handler");
        info!("⚠️ Shutdown signal received, leaving voice channels...");

        idle.shutdown();
        registry.stop_all().await;
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot started");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    let ffmpeg = async_process::Command::new(&config.ffmpeg_path)
        .arg("-version")
        .output()
        .await?;

    if ffmpeg.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("ffmpeg at {} is not usable", config.ffmpeg_path);
    }
}
