use bytes::Bytes;
use image::RgbImage;
use mediaform_core::AppError;
use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;
use tempfile::NamedTempFile;

type StderrDrain = JoinHandle<io::Result<Vec<u8>>>;

fn spawn_stderr_drain(child: &mut Child) -> Option<StderrDrain> {
    let mut stderr = child.stderr.take()?;
    Some(std::thread::spawn(move || {
        let mut stderr_bytes = Vec::new();
        stderr.read_to_end(&mut stderr_bytes)?;
        Ok(stderr_bytes)
    }))
}

fn collect_stderr(drain: Option<StderrDrain>) -> String {
    drain
        .and_then(|handle| handle.join().ok())
        .and_then(Result::ok)
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default()
}

fn spawn_error(ffmpeg_path: &str, err: io::Error) -> AppError {
    AppError::Internal(format!("failed to spawn {}: {}", ffmpeg_path, err))
}

fn reap(child: &mut Child) {
    if let Ok(None) = child.try_wait() {
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// Streams decoded RGB24 frames out of an ffmpeg child process.
///
/// The child is killed if the reader is dropped before `finish`.
pub(crate) struct FrameReader {
    child: Child,
    stdout: ChildStdout,
    stderr_drain: Option<StderrDrain>,
    width: u32,
    height: u32,
    frame_len: usize,
    frames_read: u64,
    _input: NamedTempFile,
}

impl FrameReader {
    pub(crate) fn spawn(
        ffmpeg_path: &str,
        data: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Self, AppError> {
        let mut input = tempfile::Builder::new()
            .prefix("mediaform-src-")
            .suffix(".mp4")
            .tempfile()?;
        input.write_all(data)?;
        input.flush()?;

        let mut child = Command::new(ffmpeg_path)
            .args(["-nostdin", "-loglevel", "error", "-noautorotate", "-i"])
            .arg(input.path())
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(ffmpeg_path, e))?;

        let stderr_drain = spawn_stderr_drain(&mut child);
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                reap(&mut child);
                return Err(AppError::Internal("failed to open ffmpeg stdout".to_string()));
            }
        };

        Ok(Self {
            child,
            stdout,
            stderr_drain,
            width,
            height,
            frame_len: width as usize * height as usize * 3,
            frames_read: 0,
            _input: input,
        })
    }

    /// Next frame, or `None` once the stream ends on a frame boundary
    pub(crate) fn next_frame(&mut self) -> Result<Option<RgbImage>, AppError> {
        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(AppError::DecodeFailed(format!(
                        "failed reading decoded frames: {}",
                        e
                    )))
                }
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < buf.len() {
            return Err(AppError::DecodeFailed(format!(
                "truncated frame {} ({} of {} bytes)",
                self.frames_read,
                filled,
                buf.len()
            )));
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.width, self.height, buf)
            .map(Some)
            .ok_or_else(|| AppError::Internal("frame buffer size mismatch".to_string()))
    }

    pub(crate) fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Wait for the decoder and surface a non-zero exit as `DecodeFailed`
    pub(crate) fn finish(mut self) -> Result<(), AppError> {
        let status = self.child.wait()?;
        let stderr = collect_stderr(self.stderr_drain.take());
        if !status.success() {
            return Err(AppError::DecodeFailed(format!(
                "ffmpeg decoder exited with {}: {}",
                status, stderr
            )));
        }
        Ok(())
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        reap(&mut self.child);
    }
}

/// Feeds RGB24 frames into an ffmpeg H.264/MP4 encoder writing a temp file.
///
/// Odd dimensions are padded to even for yuv420p. The child is killed if
/// the writer is dropped before `finish`.
pub(crate) struct FrameWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<StderrDrain>,
    output: NamedTempFile,
    frames_written: u64,
}

impl FrameWriter {
    pub(crate) fn spawn(
        ffmpeg_path: &str,
        width: u32,
        height: u32,
        frame_rate: f32,
    ) -> Result<Self, AppError> {
        let output = tempfile::Builder::new()
            .prefix("mediaform-out-")
            .suffix(".mp4")
            .tempfile()?;

        let mut child = Command::new(ffmpeg_path)
            .args(["-y", "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{}x{}", width, height)])
            .args(["-r", &format!("{}", frame_rate)])
            .args(["-i", "pipe:0", "-an"])
            .args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"])
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-threads", "1"])
            .args(["-fflags", "+bitexact", "-flags:v", "+bitexact", "-map_metadata", "-1"])
            .args(["-movflags", "+faststart", "-f", "mp4"])
            .arg(output.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(ffmpeg_path, e))?;

        let stderr_drain = spawn_stderr_drain(&mut child);
        let stdin = child.stdin.take();
        if stdin.is_none() {
            reap(&mut child);
            return Err(AppError::Internal("failed to open ffmpeg stdin".to_string()));
        }

        Ok(Self {
            child,
            stdin,
            stderr_drain,
            output,
            frames_written: 0,
        })
    }

    pub(crate) fn write_frame(&mut self, frame: &RgbImage) -> Result<(), AppError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AppError::Internal("ffmpeg encoder already closed".to_string()))?;
        if let Err(e) = stdin.write_all(frame.as_raw()) {
            self.stdin = None;
            let _ = self.child.wait();
            let stderr = collect_stderr(self.stderr_drain.take());
            return Err(AppError::Internal(format!(
                "ffmpeg encoder rejected frame {}: {} {}",
                self.frames_written, e, stderr
            )));
        }
        self.frames_written += 1;
        Ok(())
    }

    /// Close the input, wait for the encoder and return the MP4 bytes
    pub(crate) fn finish(mut self) -> Result<Bytes, AppError> {
        drop(self.stdin.take());
        let status = self.child.wait()?;
        let stderr = collect_stderr(self.stderr_drain.take());
        if !status.success() {
            return Err(AppError::Internal(format!(
                "ffmpeg encoder exited with {}: {}",
                status, stderr
            )));
        }
        let bytes = std::fs::read(self.output.path())?;
        Ok(Bytes::from(bytes))
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        drop(self.stdin.take());
        reap(&mut self.child);
    }
}
