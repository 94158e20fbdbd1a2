use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use error::AppError;
use hlsdl_engine::hls::{HlsConfig, HlsVariantSelectionPolicy};
use hlsdl_engine::{DownloaderConfig, HlsDownloader, OnEvent};
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;

mod cli;
mod error;
mod utils;

use cli::{CliArgs, SelectPolicy};
use utils::progress::ProgressManager;
use utils::{format_bytes, format_duration};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

fn selection_policy(args: &CliArgs) -> HlsVariantSelectionPolicy {
    if let Some(bitrate) = args.bitrate {
        return HlsVariantSelectionPolicy::ClosestToBitrate(bitrate);
    }
    match args.select {
        SelectPolicy::HighestBitrate => HlsVariantSelectionPolicy::HighestBitrate,
        SelectPolicy::LowestBitrate => HlsVariantSelectionPolicy::LowestBitrate,
        SelectPolicy::HighestResolution => HlsVariantSelectionPolicy::HighestResolution,
    }
}

fn build_config(args: &CliArgs) -> Result<HlsConfig, AppError> {
    let download_config = {
        let mut builder = DownloaderConfig::builder()
            .with_timeout(Duration::from_secs(args.timeout))
            .with_connect_timeout(Duration::from_secs(args.connect_timeout))
            .with_read_timeout(Duration::from_secs(args.read_timeout))
            .with_headers(utils::parse_headers(&args.headers));

        if let Some(user_agent) = &args.user_agent {
            builder = builder.with_user_agent(user_agent.clone());
        }

        if args.no_proxy {
            info!("All proxy settings disabled (--no-proxy flag)");
            builder = builder.with_system_proxy(false);
        } else if let Some(proxy) = &args.proxy {
            info!(proxy = %proxy, "Using explicit proxy configuration for downloads");
            builder = builder.with_proxy(proxy.clone());
        }
        builder.build()
    };

    let mut builder = HlsConfig::builder()
        .with_base_config(download_config)
        .playlist_fetch_timeout(Duration::from_secs(args.playlist_timeout))
        .variant_selection_policy(selection_policy(args))
        .download_concurrency(args.concurrency)
        .segment_timeout(Duration::from_secs(args.segment_timeout))
        .segment_attempts(args.retries)
        .failure_threshold(args.failure_threshold)
        .ffmpeg_path(&args.ffmpeg)
        .assembly_timeout(Duration::from_secs(args.assembly_timeout));
    if let Some(parent) = &args.temp_dir {
        builder = builder.temp_dir_parent(parent);
    }

    let config = builder.build();
    config
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    Ok(config)
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("hlsdl.log")?;

    let (file_writer, _log_guard) = tracing_appender::non_blocking(log_file);
    let multi_writer = MakeWriterExt::and(std::io::stdout, file_writer);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(multi_writer)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    info!("hlsdl {} - HLS video-on-demand downloader", env!("CARGO_PKG_VERSION"));
    info!("==================================================================");

    let config = build_config(&args)?;
    info!(
        "HTTP timeout configuration: overall={}s, connect={}s, read={}s, playlist={}s, segment={}s",
        args.timeout,
        args.connect_timeout,
        args.read_timeout,
        args.playlist_timeout,
        args.segment_timeout
    );
    info!(
        concurrency = args.concurrency,
        attempts = args.retries,
        failure_threshold = args.failure_threshold,
        policy = ?config.playlist_config.variant_selection_policy,
        "Download configuration"
    );

    let downloader = HlsDownloader::new(config)?;

    if args.probe {
        let status = downloader.probe(&args.url).await?;
        if status.is_success() {
            info!(status = %status, "Playlist URL is reachable");
        } else {
            warn!(status = %status, "Playlist URL answered with a non-success status");
        }
    }

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling download");
            ctrl_c_token.cancel();
        }
    });

    let progress_manager = if args.show_progress {
        ProgressManager::new()
    } else {
        ProgressManager::new_disabled()
    };
    let on_event: OnEvent = Arc::new(move |event| progress_manager.handle_event(&event));

    let outcome = downloader
        .download(&args.url, &args.output, Some(on_event), cancel)
        .await?;

    info!(
        "Saved {} ({} of {} segments, {}) in {}",
        outcome.output.display(),
        outcome.downloaded_segments,
        outcome.total_segments,
        format_bytes(outcome.total_bytes),
        format_duration(outcome.elapsed)
    );
    if outcome.failed_segments > 0 {
        warn!(
            failed = outcome.failed_segments,
            "Output is missing segments that could not be downloaded"
        );
    }
    Ok(())
}
