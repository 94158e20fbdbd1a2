//! # hlsdl-engine
//!
//! Downloads a complete HLS (m3u8) video-on-demand stream into a single file.
//!
//! The pipeline fetches the playlist, picks a rendition when the playlist is
//! a master playlist, downloads every segment concurrently with bounded
//! retries, then stream-copies the segments into the output with ffmpeg.
//!
//! ```no_run
//! use hlsdl_engine::hls::{HlsConfig, HlsDownloader};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = HlsDownloader::new(HlsConfig::default())?;
//! let outcome = downloader
//!     .download(
//!         "https://example.com/master.m3u8",
//!         "video.mp4",
//!         None,
//!         CancellationToken::new(),
//!     )
//!     .await?;
//! println!("{} segments, {} bytes", outcome.downloaded_segments, outcome.total_bytes);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod hls;

#[cfg(test)]
pub(crate) mod test_utils;

pub use builder::DownloaderConfigBuilder;
pub use client::create_client;
pub use config::DownloaderConfig;
pub use error::DownloadError;

// Re-export the HLS entry points
pub use hls::{
    DownloadEvent, DownloadOutcome, HlsConfig, HlsDownloader, HlsDownloaderError, OnEvent,
    RunState,
};
