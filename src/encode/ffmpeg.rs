use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::Frame;
use crate::foundation::error::{BirdviewError, BirdviewResult};

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw RGB frames to its stdin.
///
/// Output is MPEG-4 Part 2 tagged `mp4v` in yuv420p.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    cfg: Option<SinkConfig>,
    last_idx: Option<u64>,
}

impl std::fmt::Debug for FfmpegSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegSink")
            .field("opts", &self.opts)
            .field("cfg", &self.cfg)
            .field("last_idx", &self.last_idx)
            .finish_non_exhaustive()
    }
}

impl FfmpegSink {
    /// Create an idle sink; `ffmpeg` is spawned in `begin`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            last_idx: None,
        }
    }

    /// Destination MP4 path.
    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }
}

pub(crate) fn validate_sink_config(cfg: &SinkConfig) -> BirdviewResult<()> {
    if !cfg.fps.is_finite() || cfg.fps <= 0.0 {
        return Err(BirdviewError::validation("fps must be positive"));
    }
    if cfg.size.is_empty() {
        return Err(BirdviewError::validation(
            "ffmpeg sink width/height must be non-zero",
        ));
    }
    if !cfg.size.width.is_multiple_of(2) || !cfg.size.height.is_multiple_of(2) {
        return Err(BirdviewError::validation(
            "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
        ));
    }
    Ok(())
}

pub(crate) fn encoder_args(cfg: &SinkConfig, out_path: &Path, overwrite: bool) -> Vec<String> {
    let mut args: Vec<String> = vec![if overwrite { "-y" } else { "-n" }.to_string()];
    args.extend(
        [
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
        ]
        .map(String::from),
    );
    args.push(cfg.size.to_string());
    // Input framerate goes before `-i` for rawvideo.
    args.push("-r".to_string());
    args.push(format!("{}", cfg.fps));
    args.extend(
        [
            "-i", "pipe:0", "-an", "-c:v", "mpeg4", "-tag:v", "mp4v", "-q:v", "3", "-pix_fmt",
            "yuv420p",
        ]
        .map(String::from),
    );
    args.push(out_path.display().to_string());
    args
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> BirdviewResult<()> {
        validate_sink_config(&cfg)?;

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(BirdviewError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(BirdviewError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut child = Command::new("ffmpeg")
            .args(encoder_args(&cfg, &self.opts.out_path, self.opts.overwrite))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BirdviewError::encode(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BirdviewError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| BirdviewError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &Frame) -> BirdviewResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| BirdviewError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(BirdviewError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }

        if frame.width() != cfg.size.width || frame.height() != cfg.size.height {
            return Err(BirdviewError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}",
                frame.width(),
                frame.height(),
                cfg.size
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(BirdviewError::encode("ffmpeg sink is already finalized"));
        };
        stdin.write_all(frame.as_raw()).map_err(|e| {
            BirdviewError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.last_idx = Some(idx);
        Ok(())
    }

    fn end(&mut self) -> BirdviewResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| BirdviewError::encode("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            BirdviewError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| BirdviewError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| BirdviewError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(BirdviewError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        self.cfg = None;
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> BirdviewResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
