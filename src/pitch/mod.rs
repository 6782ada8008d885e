//! Pitch-Shift Transcoder
//!
//! Changes the musical pitch of a track without changing its tempo by
//! running the source file through an ffmpeg audio filter graph. The
//! filter chain construction is a pure function (unit-testable without
//! spawning ffmpeg); the transcode itself re-encodes only the audio
//! stream and copies the video stream untouched.

mod filter;
mod transcoder;

pub use filter::{filter_chain, pitch_ratio, tempo_factor, FilterChain, FilterStage};
pub use transcoder::run_shift;
