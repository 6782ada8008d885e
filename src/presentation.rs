//! Presentation Layer seam.
//!
//! The engine never draws anything itself. Frames, status text, meter
//! readings and scores are pushed through [`PresentationSink`]; the
//! embedding application decides how to marshal them onto its UI
//! thread. Workers call the sink directly, so implementations must be
//! thread-safe.

use crate::frames::VideoFrame;
use crate::score::ScoreResult;

/// Receiver for everything the engine wants shown to the operator.
///
/// All methods have no-op defaults so a sink only implements what it
/// displays.
pub trait PresentationSink: Send + Sync {
    /// One decoded video frame, delivered at playback pace.
    fn frame(&self, _frame: VideoFrame) {}

    /// Human-readable status line (loading, playing, errors).
    fn status(&self, _text: &str) {}

    /// Live microphone level in dBFS, floored at -60.
    fn meter_db(&self, _db: f32) {}

    /// Final score for the track that just ended.
    fn score(&self, _result: ScoreResult) {}

    /// The playlist is exhausted; nothing left to play.
    fn session_complete(&self) {}
}

/// Sink that drops everything. Useful headless and in tests.
pub struct NullSink;

impl PresentationSink for NullSink {}
