use std::{
    io::{BufReader, ErrorKind, Read},
    path::{Path, PathBuf},
    process::{Child, ChildStdout, Command, ExitStatus, Stdio},
    thread::JoinHandle,
};

use crate::{
    foundation::{
        core::{Frame, FrameSize},
        error::{BirdviewError, BirdviewResult},
    },
    source::{FrameSource, SourceFrame, SourceInfo, SourceKind},
};

/// Stream properties reported by `ffprobe`.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoProbe {
    /// Path that was probed.
    pub source_path: PathBuf,
    /// Native frame size.
    pub size: FrameSize,
    /// Nominal frame rate (0 when unknown).
    pub fps: f64,
    /// Frame count from the container, or `duration * fps` when absent.
    pub total_frames: Option<u64>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Probe the first video stream of `source_path` with `ffprobe`.
pub fn probe_video(source_path: &Path) -> BirdviewResult<VideoProbe> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| BirdviewError::frame_source(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(BirdviewError::frame_source(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe_json(source_path, &out.stdout)
}

pub(crate) fn parse_probe_json(source_path: &Path, json: &[u8]) -> BirdviewResult<VideoProbe> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| {
            BirdviewError::frame_source(format!("ffprobe json parse failed: {e}"))
        })?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| BirdviewError::frame_source("no video stream found"))?;

    let width = stream
        .width
        .ok_or_else(|| BirdviewError::frame_source("missing video width from ffprobe"))?;
    let height = stream
        .height
        .ok_or_else(|| BirdviewError::frame_source("missing video height from ffprobe"))?;
    let size = FrameSize::new(width, height)?;

    let fps = [stream.avg_frame_rate.as_deref(), stream.r_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(parse_ff_ratio)
        .find(|f| *f > 0.0)
        .unwrap_or(0.0);

    let total_frames = stream
        .nb_frames
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .or_else(|| {
            let duration = parsed
                .format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(|s| s.parse::<f64>().ok())?;
            (duration > 0.0 && fps > 0.0).then(|| (duration * fps).round() as u64)
        });

    Ok(VideoProbe {
        source_path: source_path.to_path_buf(),
        size,
        fps,
        total_frames,
    })
}

fn parse_ff_ratio(s: &str) -> Option<f64> {
    let mut parts = s.split('/');
    let a = parts.next()?.trim().parse::<f64>().ok()?;
    let b = match parts.next() {
        Some(b) => b.trim().parse::<f64>().ok()?,
        None => 1.0,
    };
    if b == 0.0 {
        return None;
    }
    Some(a / b)
}

/// Frames decoded from a video file by a streaming `ffmpeg` child process.
///
/// A decoder that exits with a failure status is reported as one decode error
/// carrying its stderr, after which the source is exhausted.
pub struct VideoStreamSource {
    info: SourceInfo,
    size: FrameSize,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    pulled: u64,
}

impl std::fmt::Debug for VideoStreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoStreamSource")
            .field("info", &self.info)
            .field("pulled", &self.pulled)
            .finish_non_exhaustive()
    }
}

impl VideoStreamSource {
    /// Probe `path` and start decoding it to raw RGB frames.
    pub fn open(path: &Path) -> BirdviewResult<Self> {
        if !path.is_file() {
            return Err(BirdviewError::frame_source(format!(
                "unable to open video file: {}",
                path.display()
            )));
        }
        let probe = probe_video(path)?;

        let child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BirdviewError::frame_source(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let info = SourceInfo {
            kind: SourceKind::Video,
            description: path.display().to_string(),
            nominal_fps: (probe.fps > 0.0).then_some(probe.fps),
            total_frames: probe.total_frames,
            native_size: Some(probe.size),
            unreadable_entries: Vec::new(),
        };
        Self::from_decoder(info, probe.size, child)
    }

    /// Wrap an already spawned decoder writing `size` rgb24 frames to its stdout.
    pub(crate) fn from_decoder(
        info: SourceInfo,
        size: FrameSize,
        mut child: Child,
    ) -> BirdviewResult<Self> {
        let stdout = child.stdout.take().ok_or_else(|| {
            BirdviewError::frame_source("failed to open ffmpeg stdout (unexpected)")
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            BirdviewError::frame_source("failed to open ffmpeg stderr (unexpected)")
        })?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        Ok(Self {
            info,
            size,
            child: Some(child),
            stdout: Some(BufReader::new(stdout)),
            stderr_drain: Some(stderr_drain),
            pulled: 0,
        })
    }

    /// Wait for the decoder after its stdout closed; `Some` when it exited with a failure.
    fn finish(&mut self) -> Option<BirdviewError> {
        drop(self.stdout.take());
        let mut child = self.child.take()?;
        let status = child.wait();
        let stderr_bytes = self.join_stderr();
        match status {
            Ok(status) => decoder_failure(status, &stderr_bytes),
            Err(e) => Some(BirdviewError::decode(format!(
                "failed to wait for ffmpeg decoder: {e}"
            ))),
        }
    }

    fn join_stderr(&mut self) -> Vec<u8> {
        self.stderr_drain
            .take()
            .and_then(|handle| handle.join().ok())
            .and_then(Result::ok)
            .unwrap_or_default()
    }

    fn release(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.join_stderr();
    }
}

fn decoder_failure(status: ExitStatus, stderr: &[u8]) -> Option<BirdviewError> {
    if status.success() {
        return None;
    }
    Some(BirdviewError::decode(format!(
        "ffmpeg decoder exited with status {status}: {}",
        String::from_utf8_lossy(stderr).trim()
    )))
}

impl FrameSource for VideoStreamSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Option<BirdviewResult<SourceFrame>> {
        let stdout = self.stdout.as_mut()?;
        let mut buf = vec![0u8; self.size.rgb8_len()];
        match read_full(stdout, &mut buf) {
            Ok(0) => self.finish().map(Err),
            Ok(n) if n < buf.len() => {
                let truncated = format!(
                    "truncated frame {}: got {n} of {} bytes",
                    self.pulled + 1,
                    buf.len()
                );
                Some(Err(match self.finish() {
                    Some(failure) => BirdviewError::decode(format!("{truncated}; {failure}")),
                    None => BirdviewError::decode(truncated),
                }))
            }
            Ok(_) => {
                self.pulled += 1;
                let label = format!("frame {}", self.pulled);
                Some(
                    Frame::from_raw(self.size.width, self.size.height, buf)
                        .map(|frame| SourceFrame { frame, label })
                        .ok_or_else(|| BirdviewError::decode("frame buffer size mismatch")),
                )
            }
            Err(e) => {
                self.release();
                Some(Err(BirdviewError::decode(format!(
                    "failed to read frame {} from ffmpeg: {e}",
                    self.pulled + 1
                ))))
            }
        }
    }
}

impl Drop for VideoStreamSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Read until `buf` is full or EOF; returns the number of bytes read.
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
#[path = "../../tests/unit/source/stream.rs"]
mod tests;
