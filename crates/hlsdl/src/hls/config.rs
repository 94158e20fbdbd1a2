use std::path::PathBuf;
use std::time::Duration;

use crate::DownloaderConfig;

// --- Top-Level Configuration ---
#[derive(Debug, Clone, Default)]
pub struct HlsConfig {
    /// Base downloader configuration
    pub base: DownloaderConfig,
    pub playlist_config: HlsPlaylistConfig,
    pub scheduler_config: HlsSchedulerConfig,
    pub fetcher_config: HlsFetcherConfig,
    pub assembler_config: HlsAssemblerConfig,
    pub output_config: HlsOutputConfig,
}

impl HlsConfig {
    pub fn builder() -> HlsConfigBuilder {
        HlsConfigBuilder::new()
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), super::HlsDownloaderError> {
        use super::HlsDownloaderError::ConfigError;

        if self.scheduler_config.download_concurrency == 0 {
            return Err(ConfigError("download concurrency must be at least 1".into()));
        }
        if self.fetcher_config.max_segment_attempts == 0 {
            return Err(ConfigError("segment attempts must be at least 1".into()));
        }
        if self.fetcher_config.segment_download_timeout.is_zero() {
            return Err(ConfigError("segment timeout must be non-zero".into()));
        }
        if self.playlist_config.max_attempts == 0 {
            return Err(ConfigError("playlist attempts must be at least 1".into()));
        }
        let threshold = self.output_config.failure_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError(format!(
                "failure threshold must be within 0.0..=1.0, got {threshold}"
            )));
        }
        Ok(())
    }
}

// --- Playlist Configuration ---
#[derive(Debug, Clone)]
pub struct HlsPlaylistConfig {
    pub playlist_fetch_timeout: Duration,
    /// Total attempts for a playlist request, including the first one
    pub max_attempts: u32,
    /// Base for exponential backoff between playlist attempts
    pub retry_delay_base: Duration,
    pub variant_selection_policy: HlsVariantSelectionPolicy,
}

impl Default for HlsPlaylistConfig {
    fn default() -> Self {
        Self {
            playlist_fetch_timeout: Duration::from_secs(15),
            max_attempts: 3,
            retry_delay_base: Duration::from_secs(1),
            variant_selection_policy: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HlsVariantSelectionPolicy {
    #[default]
    HighestBitrate, // Select the variant with the highest bandwidth
    LowestBitrate,
    ClosestToBitrate(u64), // Select variant closest to the specified bitrate
    HighestResolution,     // Largest WxH area; variants without resolution rank last
}

// --- Scheduler Configuration ---
#[derive(Debug, Clone)]
pub struct HlsSchedulerConfig {
    pub download_concurrency: usize, // Max concurrent segment downloads
}

impl Default for HlsSchedulerConfig {
    fn default() -> Self {
        Self {
            download_concurrency: 8,
        }
    }
}

// --- Fetcher Configuration ---
#[derive(Debug, Clone)]
pub struct HlsFetcherConfig {
    /// Longest silence tolerated per segment: before the response head and
    /// between body chunks. Not a bound on the whole transfer.
    pub segment_download_timeout: Duration,
    /// Total attempts per segment, including the first one
    pub max_segment_attempts: u32,
    pub segment_retry_delay_base: Duration, // Base for exponential backoff
    pub segment_retry_delay_max: Duration,
}

impl Default for HlsFetcherConfig {
    fn default() -> Self {
        Self {
            segment_download_timeout: Duration::from_secs(30),
            max_segment_attempts: 3,
            segment_retry_delay_base: Duration::from_secs(1),
            segment_retry_delay_max: Duration::from_secs(8),
        }
    }
}

impl HlsFetcherConfig {
    /// Delay after failed attempt `attempt` (1-based): `min(base * 2^(attempt-1), max)`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.segment_retry_delay_base
            .saturating_mul(factor)
            .min(self.segment_retry_delay_max)
    }
}

// --- Assembler Configuration ---
#[derive(Debug, Clone)]
pub struct HlsAssemblerConfig {
    /// Multiplexer executable; a bare name is looked up on PATH
    pub ffmpeg_path: PathBuf,
    pub assembly_timeout: Duration,
}

impl Default for HlsAssemblerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            assembly_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HlsOutputConfig {
    /// Fraction of segments allowed to fail before the run is abandoned
    pub failure_threshold: f64,
    /// Parent directory for the per-run working directory (system temp dir if None)
    pub temp_dir_parent: Option<PathBuf>,
}

impl Default for HlsOutputConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 0.10,
            temp_dir_parent: None,
        }
    }
}

/// Fluent builder for [`HlsConfig`].
#[derive(Debug, Clone, Default)]
pub struct HlsConfigBuilder {
    config: HlsConfig,
}

impl HlsConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_config(mut self, base_config: DownloaderConfig) -> Self {
        self.config.base = base_config;
        self
    }

    pub fn playlist_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.playlist_config.playlist_fetch_timeout = timeout;
        self
    }

    pub fn playlist_attempts(mut self, attempts: u32) -> Self {
        self.config.playlist_config.max_attempts = attempts;
        self
    }

    pub fn playlist_retry_delay(mut self, delay: Duration) -> Self {
        self.config.playlist_config.retry_delay_base = delay;
        self
    }

    pub fn variant_selection_policy(mut self, policy: HlsVariantSelectionPolicy) -> Self {
        self.config.playlist_config.variant_selection_policy = policy;
        self
    }

    /// Set maximum concurrent segment downloads.
    pub fn download_concurrency(mut self, concurrency: usize) -> Self {
        self.config.scheduler_config.download_concurrency = concurrency;
        self
    }

    pub fn segment_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetcher_config.segment_download_timeout = timeout;
        self
    }

    pub fn segment_attempts(mut self, attempts: u32) -> Self {
        self.config.fetcher_config.max_segment_attempts = attempts;
        self
    }

    /// Set base and cap of the per-segment exponential backoff.
    pub fn segment_retry_delay(mut self, base: Duration, max: Duration) -> Self {
        self.config.fetcher_config.segment_retry_delay_base = base;
        self.config.fetcher_config.segment_retry_delay_max = max;
        self
    }

    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.assembler_config.ffmpeg_path = path.into();
        self
    }

    pub fn assembly_timeout(mut self, timeout: Duration) -> Self {
        self.config.assembler_config.assembly_timeout = timeout;
        self
    }

    pub fn failure_threshold(mut self, fraction: f64) -> Self {
        self.config.output_config.failure_threshold = fraction;
        self
    }

    pub fn temp_dir_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.config.output_config.temp_dir_parent = Some(parent.into());
        self
    }

    pub fn build(self) -> HlsConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = HlsFetcherConfig::default();
        assert_eq!(config.retry_delay(1), Duration::from_secs(1));
        assert_eq!(config.retry_delay(2), Duration::from_secs(2));
        assert_eq!(config.retry_delay(3), Duration::from_secs(4));
        assert_eq!(config.retry_delay(4), Duration::from_secs(8));
        assert_eq!(config.retry_delay(10), Duration::from_secs(8));
        assert_eq!(config.retry_delay(100), Duration::from_secs(8));
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = HlsConfig::default();
        assert_eq!(config.fetcher_config.max_segment_attempts, 3);
        assert_eq!(config.playlist_config.max_attempts, 3);
        assert_eq!(config.scheduler_config.download_concurrency, 8);
        assert_eq!(config.assembler_config.assembly_timeout, Duration::from_secs(300));
        assert_eq!(config.output_config.failure_threshold, 0.10);
        assert_eq!(
            config.playlist_config.variant_selection_policy,
            HlsVariantSelectionPolicy::HighestBitrate
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let config = HlsConfig::builder().download_concurrency(0).build();
        assert!(config.validate().is_err());

        let config = HlsConfig::builder().failure_threshold(1.5).build();
        assert!(config.validate().is_err());

        let config = HlsConfig::builder().segment_attempts(0).build();
        assert!(config.validate().is_err());

        let config = HlsConfig::builder().segment_timeout(Duration::ZERO).build();
        assert!(config.validate().is_err());
    }
}
