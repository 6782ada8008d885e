//! Karaoke Media Synchronization & Scoring Engine
//!
//! A playback engine for live karaoke sessions. It plays a video track,
//! shifts its musical pitch without changing tempo, paces decoded video
//! frames against an audio-authoritative playback clock, samples the
//! singer's microphone and reduces the captured energy to a 0-100 score
//! at the end of each track.
//!
//! # Features
//! - ffmpeg-based pitch-shift transcoding (tempo preserved, video copied)
//! - Raw RGB frame streaming from an ffmpeg decoder pipe
//! - Audio-authoritative playback clock with pause/seek/rate control
//! - Microphone energy sampling with a live dB meter
//! - End-of-track vocal scoring and playlist advancement
//!
//! # Crate feature flags
//! - `remote` (default): Loopback remote-control listener (`remote`)
//! - `playback` (opt-in): Rodio-backed playback clock (enables optional `rodio` dep)
//! - `microphone` (opt-in): Live vocal capture (enables optional `cpal` dep)
//!
//! # Quick start
//! ## Score a captured energy series
//! ```
//! use cantara::score::score_series;
//! let series = vec![0.4_f32; 64];
//! let result = score_series(&series);
//! assert!(result.scored);
//! assert!(result.points <= 100);
//! ```
//!
//! ## Drive a session against a scripted clock
//! ```no_run
//! use cantara::clock::ManualClock;
//! use cantara::presentation::NullSink;
//! use cantara::session::SessionController;
//! use cantara::store::{MemoryStore, QueuedSong};
//! use std::sync::Arc;
//!
//! let mut store = MemoryStore::new("Karaoke Night");
//! store.enqueue(QueuedSong::new("intro.mp4", "Alex", 0));
//! let mut session = SessionController::new(
//!     Box::new(ManualClock::new()),
//!     Box::new(store),
//!     Arc::new(NullSink),
//! );
//! session.load_next().unwrap();
//! session.play().unwrap();
//! ```

#![warn(missing_docs)]

// Domain modules (hardware-facing ones are feature-gated for modular use)
pub mod clock; // Playback Clock Adapter
pub mod frames; // Frame Stream Reader
pub mod media; // Track model & metadata probe
pub mod mic; // Vocal Sampler
pub mod pitch; // Pitch-Shift Transcoder
pub mod presentation; // Presentation Layer seam
#[cfg(feature = "remote")]
pub mod remote; // Remote Control Channel
pub mod score; // Vocal Scorer
pub mod session; // Session Controller
pub mod store; // Event/Playlist Store interface

/// Error types for karaoke engine operations
#[derive(thiserror::Error, Debug)]
pub enum CantaraError {
    /// Metadata probe failed (missing ffprobe or malformed media)
    #[error("Probe error: {0}")]
    ProbeError(String),

    /// Pitch-shift transcode failed (missing ffmpeg or non-zero exit)
    #[error("Transcode error: {0}")]
    TranscodeError(String),

    /// IO error from filesystem, pipe or socket
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio device error (playback or capture)
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid configuration or operation for the current state
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Remote-control protocol violation
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for CantaraError {
    fn from(msg: String) -> Self {
        CantaraError::Other(msg)
    }
}

impl From<&str> for CantaraError {
    fn from(msg: &str) -> Self {
        CantaraError::Other(msg.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, CantaraError>;

// Public API exports
pub use clock::{ClockState, ManualClock, PlaybackClock};
pub use frames::{FrameReader, VideoFrame};
pub use media::{probe_track, Track};
pub use mic::EnergySeries;
pub use pitch::{filter_chain, FilterChain};
pub use presentation::{NullSink, PresentationSink};
pub use score::{score_series, ScoreResult, ScoreTier};
pub use session::{SessionController, SessionState};
pub use store::{EventStore, MemoryStore, QueuedSong};

#[cfg(feature = "playback")]
pub use clock::RodioClock;
#[cfg(feature = "microphone")]
pub use mic::VocalSampler;
#[cfg(feature = "remote")]
pub use remote::{RemoteCommand, RemoteListener};
