// HLS Assembler: stream-copies the downloaded segments into one container by
// driving an external ffmpeg concat-demuxer process.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::hls::HlsDownloaderError;
use crate::hls::config::HlsAssemblerConfig;

pub const MANIFEST_FILE_NAME: &str = "concat.txt";

#[async_trait]
pub trait Assembler: Send + Sync {
    /// Joins `files`, in the given order, into `output`. `work_dir` is scratch
    /// space owned by the caller for the duration of the call.
    async fn assemble(
        &self,
        files: &[PathBuf],
        work_dir: &Path,
        output: &Path,
    ) -> Result<(), HlsDownloaderError>;
}

pub struct FfmpegAssembler {
    ffmpeg_path: PathBuf,
    timeout: Duration,
}

impl FfmpegAssembler {
    pub fn new(config: &HlsAssemblerConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            timeout: config.assembly_timeout,
        }
    }

    fn command(&self, manifest: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-hide_banner")
            .args(["-loglevel", "error"])
            .args(["-f", "concat"])
            .args(["-safe", "0"])
            .arg("-i")
            .arg(manifest)
            .args(["-c", "copy"])
            .arg("-y")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Renders a concat-demuxer manifest, one `file '<path>'` line per entry.
pub fn build_manifest(files: &[PathBuf]) -> String {
    let mut manifest = String::new();
    for file in files {
        // Inside single quotes the demuxer only understands '\'' for a quote.
        let escaped = file.to_string_lossy().replace('\'', r"'\''");
        manifest.push_str("file '");
        manifest.push_str(&escaped);
        manifest.push_str("'\n");
    }
    manifest
}

#[async_trait]
impl Assembler for FfmpegAssembler {
    async fn assemble(
        &self,
        files: &[PathBuf],
        work_dir: &Path,
        output: &Path,
    ) -> Result<(), HlsDownloaderError> {
        let absolute = files
            .iter()
            .map(std::path::absolute)
            .collect::<Result<Vec<_>, _>>()?;
        let manifest_path = work_dir.join(MANIFEST_FILE_NAME);
        tokio::fs::write(&manifest_path, build_manifest(&absolute)).await?;
        debug!(path = %manifest_path.display(), entries = absolute.len(), "Wrote concat manifest");

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!(
            tool = %self.ffmpeg_path.display(),
            segments = absolute.len(),
            output = %output.display(),
            "Starting assembly"
        );

        let child = self
            .command(&manifest_path, output)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => HlsDownloaderError::ToolNotFoundError {
                    tool: self.ffmpeg_path.clone(),
                },
                _ => HlsDownloaderError::from(e),
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let result = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                error!(timeout = ?self.timeout, "Assembly process timed out");
                return Err(HlsDownloaderError::AssemblyTimeout {
                    timeout: self.timeout,
                });
            }
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            error!(status = %result.status, stderr = %stderr, "Assembly process failed");
            return Err(HlsDownloaderError::AssemblyError {
                exit_code: result.status.code(),
                stderr,
            });
        }

        info!(output = %output.display(), "Assembly finished");
        Ok(())
    }
}
