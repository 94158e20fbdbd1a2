// HLS VOD download pipeline

pub mod assembler;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod hls_downloader;
pub mod playlist;
pub mod scheduler;
pub mod segment;
pub mod selector;

// Re-exports for easier access
pub use assembler::{Assembler, FfmpegAssembler};
pub use config::{HlsConfig, HlsConfigBuilder, HlsVariantSelectionPolicy};
pub use coordinator::DownloadCoordinator;
pub use error::HlsDownloaderError;
pub use events::{DownloadEvent, DownloadOutcome, OnEvent, RunState};
pub use fetcher::{PlaylistFetcher, PlaylistSource};
pub use hls_downloader::HlsDownloader;
pub use playlist::{MediaPlaylist, PlaylistDocument, PlaylistKind, Segment, VariantDescriptor};
pub use segment::{HttpSegmentDownloader, SegmentDownloader, SegmentResult};
pub use selector::RenditionSelector;
