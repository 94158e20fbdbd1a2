use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectPolicy {
    HighestBitrate,
    LowestBitrate,
    HighestResolution,
}

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "HLS video-on-demand downloader",
    long_about = "Downloads a complete HLS (m3u8) stream into a single video file.\n\
                  \n\
                  Master playlists are resolved to one rendition (highest bandwidth by default),\n\
                  every segment is downloaded concurrently with retries, and the segments are\n\
                  stream-copied into the output with ffmpeg. Temporary files are always removed."
)]
pub struct CliArgs {
    /// Playlist URL
    #[arg(required = true, help = "URL of the master or media playlist (.m3u8)")]
    pub url: String,

    /// Output file
    #[arg(
        required = true,
        help = "Output video file; the container follows the extension (e.g. video.mp4)"
    )]
    pub output: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Overall timeout in seconds
    #[arg(
        long,
        default_value = "0",
        help = "Overall timeout in seconds for HTTP requests, body included (0 disables it)"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Read timeout in seconds
    #[arg(
        long,
        default_value = "30",
        help = "Read timeout in seconds (maximum time between receiving data chunks)"
    )]
    pub read_timeout: u64,

    #[arg(
        long,
        default_value = "15",
        help = "Timeout in seconds for each playlist request"
    )]
    pub playlist_timeout: u64,

    #[arg(
        long,
        default_value = "30",
        help = "Longest silence in seconds tolerated while a segment downloads (response head or between body chunks)"
    )]
    pub segment_timeout: u64,

    /// Number of concurrent segment downloads
    #[arg(
        short = 'c',
        long,
        default_value = "8",
        help = "Maximum number of concurrent segment downloads"
    )]
    pub concurrency: usize,

    /// Attempts per segment
    #[arg(
        long,
        default_value = "3",
        help = "Number of attempts per segment before it is recorded as failed"
    )]
    pub retries: u32,

    #[arg(
        long,
        default_value = "0.1",
        help = "Largest fraction of failed segments tolerated before the download is aborted"
    )]
    pub failure_threshold: f64,

    /// Custom HTTP headers for download requests
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    #[arg(long, help = "Override the User-Agent sent with every request")]
    pub user_agent: Option<String>,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(
        long,
        help = "Proxy server URL for downloads (e.g., \"http://proxy.example.com:8080\")"
    )]
    pub proxy: Option<String>,

    /// Disable all proxy settings for downloads
    #[arg(
        long,
        help = "Disable all proxy settings (including system proxy) for downloads"
    )]
    pub no_proxy: bool,

    #[arg(
        long,
        default_value = "ffmpeg",
        help = "Path to the ffmpeg executable used for assembly"
    )]
    pub ffmpeg: PathBuf,

    #[arg(
        long,
        default_value = "300",
        help = "Maximum time in seconds the assembly step may take"
    )]
    pub assembly_timeout: u64,

    #[arg(
        long,
        help = "Directory in which the temporary segment directory is created (default: system temp dir)"
    )]
    pub temp_dir: Option<PathBuf>,

    /// Rendition selection policy for master playlists
    #[arg(
        long,
        value_enum,
        default_value = "highest-bitrate",
        help = "How to pick a rendition from a master playlist"
    )]
    pub select: SelectPolicy,

    #[arg(
        long,
        value_name = "BPS",
        help = "Pick the rendition whose bandwidth is closest to this value (overrides --select)"
    )]
    pub bitrate: Option<u64>,

    #[arg(
        long,
        help = "Send a HEAD request to the playlist URL before downloading"
    )]
    pub probe: bool,

    /// Show progress bars for operations
    #[arg(
        short = 'P',
        long = "progress",
        default_value = "false",
        help = "Show a progress bar while downloading segments"
    )]
    pub show_progress: bool,
}
