mod app;
mod config;
mod lrc;
mod lyrics;
mod media;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use media::{NowPlaying, PlaybackState, TrackIdentity};

#[derive(Debug, Parser)]
#[command(name = "subtext", version, about = "Synchronized lyrics overlay engine")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch lyrics for a track and print the timed lines (headless).
    Fetch {
        title: String,
        artist: String,
        #[arg(long)]
        album: Option<String>,
    },
    /// Fetch lyrics and replay them against a synthetic playback clock.
    Follow {
        title: String,
        artist: String,
        #[arg(long)]
        album: Option<String>,
        /// Playback position to start from, in seconds.
        #[arg(long, default_value_t = 0)]
        from: u64,
        /// Stop after this many seconds (0 = run until interrupted).
        #[arg(long, default_value_t = 0)]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command {
        Command::Fetch { title, artist, album } => {
            let store = make_store(&cfg)?;
            let track = track_identity(title, artist, album);
            let deadline = Duration::from_secs(cfg.lyrics.request_timeout_secs);
            let timeline = store.resolve(&track, deadline).await?;
            print_lines(&timeline);
        }
        Command::Follow {
            title,
            artist,
            album,
            from,
            duration,
        } => {
            let store = make_store(&cfg)?;
            let track = track_identity(title, artist, album);

            let (tx, rx) = mpsc::channel(16);
            tx.send(NowPlaying {
                track,
                state: PlaybackState::Playing,
                elapsed: Duration::from_secs(from),
                updated_at: Instant::now(),
            })
            .await?;
            // The app runs until the snapshot stream closes.
            tokio::spawn(async move {
                if duration > 0 {
                    tokio::time::sleep(Duration::from_secs(duration)).await;
                } else {
                    std::future::pending::<()>().await;
                }
                drop(tx);
            });

            let app = app::App::new(store, app::display::StdoutDisplay::new(), &cfg.overlay);
            app.run(rx).await?;
        }
    }

    Ok(())
}

fn make_store(cfg: &config::Config) -> anyhow::Result<lyrics::LyricsStore> {
    let source = lyrics::remote::HttpLyricsSource::new(
        &cfg.lyrics.endpoint,
        Duration::from_secs(cfg.lyrics.request_timeout_secs),
    )?;
    Ok(lyrics::LyricsStore::new(
        Arc::new(source),
        cfg.lyrics.cache_capacity,
    ))
}

fn track_identity(title: String, artist: String, album: Option<String>) -> TrackIdentity {
    TrackIdentity {
        title,
        artist,
        album: album.unwrap_or_default(),
        store_id: 0,
    }
}

fn print_lines(timeline: &lrc::Timeline) {
    for line in timeline.lines() {
        let total = line.timestamp.as_millis();
        let minutes = total / 60_000;
        let seconds = (total % 60_000) / 1_000;
        let hundredths = (total % 1_000) / 10;
        println!("[{minutes:02}:{seconds:02}.{hundredths:02}] {}", line.text);
    }
}
