//! Track model and media metadata probe.
//!
//! Playback needs the video geometry and frame rate before the first
//! frame arrives: the decoder pipe emits bare RGB bytes with no framing,
//! so the reader must already know how many bytes make one frame. The
//! probe runs `ffprobe` once per track and parses its JSON report.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use serde::Deserialize;

use crate::{CantaraError, Result};

/// Fallback frame rate when the container carries no rate hint.
const DEFAULT_FRAME_RATE: &str = "30/1";

/// Metadata for one playable track.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Path to the media file on disk.
    pub path: PathBuf,
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Video frame rate in frames per second.
    pub fps: f64,
    /// Total duration in seconds.
    pub duration: f64,
}

impl Track {
    /// Byte length of one decoded RGB24 frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

#[derive(Deserialize)]
struct ProbeReport {
    streams: Vec<ProbeStream>,
    format: ProbeFormat,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: String,
}

/// Probe a media file for geometry, frame rate and duration.
///
/// Spawns `ffprobe` with a JSON report and reads the first video stream.
/// Files without a video stream are rejected; a missing frame-rate hint
/// falls back to 30 fps.
pub fn probe_track(path: &Path) -> Result<Track> {
    debug!("probing {}", path.display());
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|e| CantaraError::ProbeError(format!("failed to spawn ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(CantaraError::ProbeError(format!(
            "ffprobe exited with {} probing {}",
            output.status,
            path.display()
        )));
    }

    parse_probe(path, &output.stdout)
}

/// Parse an ffprobe JSON report into a [`Track`]. Factored out of
/// [`probe_track`] so fixtures can exercise it without ffprobe installed.
fn parse_probe(path: &Path, report: &[u8]) -> Result<Track> {
    let report: ProbeReport = serde_json::from_slice(report)
        .map_err(|e| CantaraError::ProbeError(format!("malformed ffprobe report: {}", e)))?;

    let video = report
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| {
            CantaraError::ProbeError(format!("no video stream in {}", path.display()))
        })?;

    let width = video
        .width
        .ok_or_else(|| CantaraError::ProbeError("video stream missing width".to_string()))?;
    let height = video
        .height
        .ok_or_else(|| CantaraError::ProbeError("video stream missing height".to_string()))?;

    let rate = video.r_frame_rate.as_deref().unwrap_or(DEFAULT_FRAME_RATE);
    let fps = parse_frame_rate(rate)
        .ok_or_else(|| CantaraError::ProbeError(format!("bad frame rate {:?}", rate)))?;

    let duration: f64 = report
        .format
        .duration
        .parse()
        .map_err(|_| CantaraError::ProbeError("bad duration field".to_string()))?;

    Ok(Track {
        path: path.to_path_buf(),
        width,
        height,
        fps,
        duration,
    })
}

/// Parse an ffprobe rational frame rate such as `30000/1001`.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 || num <= 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => rate.trim().parse().ok().filter(|f: &f64| *f > 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const REPORT: &str = r#"{
        "streams": [
            {"codec_type": "audio", "sample_rate": "44100"},
            {"codec_type": "video", "width": 1280, "height": 720,
             "r_frame_rate": "30000/1001"}
        ],
        "format": {"duration": "212.480000"}
    }"#;

    #[test]
    fn parses_ntsc_frame_rate() {
        assert_relative_eq!(parse_frame_rate("30000/1001").unwrap(), 29.97, epsilon = 1e-2);
        assert_relative_eq!(parse_frame_rate("25/1").unwrap(), 25.0);
        assert_relative_eq!(parse_frame_rate("24").unwrap(), 24.0);
        assert!(parse_frame_rate("30/0").is_none());
        assert!(parse_frame_rate("garbage").is_none());
    }

    #[test]
    fn parses_full_report() {
        let track = parse_probe(Path::new("song.mp4"), REPORT.as_bytes()).unwrap();
        assert_eq!(track.width, 1280);
        assert_eq!(track.height, 720);
        assert_relative_eq!(track.fps, 30000.0 / 1001.0);
        assert_relative_eq!(track.duration, 212.48);
        assert_eq!(track.frame_len(), 1280 * 720 * 3);
    }

    #[test]
    fn skips_non_video_streams() {
        let report = r#"{
            "streams": [{"codec_type": "audio"}],
            "format": {"duration": "10.0"}
        }"#;
        let err = parse_probe(Path::new("voice.mp3"), report.as_bytes()).unwrap_err();
        assert!(matches!(err, CantaraError::ProbeError(_)));
    }

    #[test]
    fn missing_rate_defaults_to_thirty() {
        let report = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 480}],
            "format": {"duration": "5.5"}
        }"#;
        let track = parse_probe(Path::new("clip.mp4"), report.as_bytes()).unwrap();
        assert_relative_eq!(track.fps, 30.0);
    }
}
