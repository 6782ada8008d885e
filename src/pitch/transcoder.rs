//! Synchronous ffmpeg transcode producing a pitch-shifted artifact.

use std::path::Path;
use std::process::{Command, Stdio};

use log::{debug, info};
use tempfile::TempPath;

use super::filter::filter_chain;
use crate::{CantaraError, Result};

/// Run a pitch-shift transcode of `source` and return the artifact path.
///
/// The audio stream is re-encoded through the shift filter chain while
/// the video stream is copied untouched, so the output keeps the exact
/// frame timing of the source. The artifact is a temporary file deleted
/// automatically when the returned [`TempPath`] is dropped.
///
/// Blocks until ffmpeg exits. Callers that need the UI to stay live run
/// this on a worker thread and deliver the result as an event.
pub fn run_shift(source: &Path, semitones: i32) -> Result<TempPath> {
    let chain = filter_chain(semitones);
    if chain.is_noop() {
        return Err(CantaraError::ConfigError(
            "zero-semitone shift needs no transcode".to_string(),
        ));
    }

    let output = tempfile::Builder::new()
        .prefix("cantara-shift-")
        .suffix(".mp4")
        .tempfile()
        .map_err(CantaraError::Io)?
        .into_temp_path();

    let filter = format!("[0:a]{}[audio]", chain.render());
    debug!("shift filter graph: {}", filter);

    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(source)
        .arg("-filter_complex")
        .arg(&filter)
        .args(["-map", "0:v", "-map", "[audio]"])
        .args(["-c:v", "copy", "-c:a", "aac", "-b:a", "192k"])
        .arg(&output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| CantaraError::TranscodeError(format!("failed to spawn ffmpeg: {}", e)))?;

    if !status.success() {
        // Dropping `output` here removes the partial artifact.
        return Err(CantaraError::TranscodeError(format!(
            "ffmpeg exited with {} shifting {}",
            status,
            source.display()
        )));
    }

    info!(
        "shifted {} by {} semitones -> {}",
        source.display(),
        chain.semitones(),
        output.display()
    );
    Ok(output)
}
