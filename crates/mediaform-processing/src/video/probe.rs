use mediaform_core::AppError;
use std::io::Write;
use std::process::Command;

/// Stream facts read from ffprobe
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f32>,
    pub frame_count: Option<u64>,
}

/// Probe the first video stream of an in-memory container
pub(crate) fn probe_video(ffprobe_path: &str, data: &[u8]) -> Result<VideoInfo, AppError> {
    let mut temp_file = tempfile::Builder::new()
        .prefix("mediaform-probe-")
        .suffix(".mp4")
        .tempfile()?;
    temp_file.write_all(data)?;
    temp_file.flush()?;

    let start = std::time::Instant::now();
    let output = Command::new(ffprobe_path)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "v:0",
        ])
        .arg(temp_file.path())
        .output()
        .map_err(|e| AppError::Internal(format!("failed to execute {}: {}", ffprobe_path, e)))?;

    if !output.status.success() {
        return Err(AppError::DecodeFailed(format!(
            "ffprobe failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let info = parse_probe_output(&output.stdout)?;
    tracing::debug!(
        width = info.width,
        height = info.height,
        frame_rate = ?info.frame_rate,
        frame_count = ?info.frame_count,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Video probed"
    );
    Ok(info)
}

fn parse_probe_output(stdout: &[u8]) -> Result<VideoInfo, AppError> {
    let probe_data: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| AppError::DecodeFailed(format!("unreadable ffprobe output: {}", e)))?;

    let stream = probe_data["streams"]
        .get(0)
        .ok_or_else(|| AppError::DecodeFailed("no video stream found".to_string()))?;

    let dimension = |name: &str| {
        stream[name]
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .ok_or_else(|| AppError::DecodeFailed(format!("video stream has no {}", name)))
    };

    Ok(VideoInfo {
        width: dimension("width")?,
        height: dimension("height")?,
        frame_rate: stream["r_frame_rate"]
            .as_str()
            .or_else(|| stream["avg_frame_rate"].as_str())
            .and_then(parse_frame_rate),
        frame_count: stream["nb_frames"]
            .as_str()
            .and_then(|n| n.parse::<u64>().ok()),
    })
}

/// Parse "30000/1001" or "25" style rates; zero or malformed gives None
fn parse_frame_rate(raw: &str) -> Option<f32> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f32 = num.trim().parse().ok()?;
            let den: f32 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
