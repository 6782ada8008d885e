//! Playback Clock Adapter
//!
//! The audio engine owns playback timing authoritatively: every other
//! component asks the clock whether the track is still playing and how
//! far along it is. [`PlaybackClock`] is the seam; [`RodioClock`] backs
//! it with a real audio device (feature `playback`) and [`ManualClock`]
//! is a scripted clock for driving the session from tests.

use std::path::Path;

use crate::Result;

/// Coarse playback state reported by the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// No media loaded.
    Idle,
    /// Media loaded and advancing.
    Playing,
    /// Media loaded, position frozen.
    Paused,
    /// Playback reached the end of the media.
    Ended,
    /// Playback was stopped by the operator.
    Stopped,
    /// The audio backend failed.
    Error,
}

/// Audio-authoritative playback clock.
///
/// One instance is reused across tracks via [`load`](Self::load) rather
/// than recreated per track.
pub trait PlaybackClock {
    /// Replace the loaded media. Resets position to zero and leaves the
    /// clock paused until [`play`](Self::play).
    fn load(&mut self, path: &Path) -> Result<()>;
    /// Start or resume playback.
    fn play(&mut self) -> Result<()>;
    /// Freeze playback, keeping the position.
    fn pause(&mut self) -> Result<()>;
    /// Stop playback. Position is no longer meaningful afterwards.
    fn stop(&mut self) -> Result<()>;
    /// Jump to an absolute position in seconds.
    fn seek(&mut self, seconds: f64) -> Result<()>;
    /// Change the playback rate (1.0 = normal speed).
    fn set_rate(&mut self, factor: f64) -> Result<()>;
    /// Current position in seconds of media time.
    fn position_seconds(&self) -> f64;
    /// Total duration in seconds, if the backend knows it.
    fn duration_seconds(&self) -> f64;
    /// Current coarse state.
    fn state(&self) -> ClockState;
}

mod manual {
    use super::{ClockState, PlaybackClock};
    use crate::Result;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    struct Inner {
        path: Option<PathBuf>,
        state: ClockState,
        position: f64,
        duration: f64,
        rate: f64,
    }

    /// Scripted clock for tests and dry runs.
    ///
    /// Cloning yields a handle to the same clock, so a test can hand one
    /// clone to the session and keep another to advance time with
    /// [`advance`](ManualClock::advance).
    #[derive(Clone)]
    pub struct ManualClock {
        inner: Arc<Mutex<Inner>>,
    }

    impl ManualClock {
        /// New idle clock with nothing loaded.
        pub fn new() -> Self {
            ManualClock {
                inner: Arc::new(Mutex::new(Inner {
                    path: None,
                    state: ClockState::Idle,
                    position: 0.0,
                    duration: 0.0,
                    rate: 1.0,
                })),
            }
        }

        /// Script the duration the clock reports for the loaded media.
        pub fn set_duration(&self, seconds: f64) {
            self.inner.lock().duration = seconds;
        }

        /// Advance media time while playing. Crossing the duration flips
        /// the clock to `Ended`, the way a real engine reports it.
        pub fn advance(&self, seconds: f64) {
            let mut inner = self.inner.lock();
            if inner.state != ClockState::Playing {
                return;
            }
            inner.position += seconds * inner.rate;
            if inner.duration > 0.0 && inner.position >= inner.duration {
                inner.position = inner.duration;
                inner.state = ClockState::Ended;
            }
        }

        /// Path given to the last [`load`](PlaybackClock::load) call.
        pub fn loaded_path(&self) -> Option<PathBuf> {
            self.inner.lock().path.clone()
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl PlaybackClock for ManualClock {
        fn load(&mut self, path: &Path) -> Result<()> {
            let mut inner = self.inner.lock();
            inner.path = Some(path.to_path_buf());
            inner.position = 0.0;
            inner.state = ClockState::Paused;
            Ok(())
        }

        fn play(&mut self) -> Result<()> {
            self.inner.lock().state = ClockState::Playing;
            Ok(())
        }

        fn pause(&mut self) -> Result<()> {
            let mut inner = self.inner.lock();
            if inner.state == ClockState::Playing {
                inner.state = ClockState::Paused;
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            let mut inner = self.inner.lock();
            inner.state = ClockState::Stopped;
            Ok(())
        }

        fn seek(&mut self, seconds: f64) -> Result<()> {
            let mut inner = self.inner.lock();
            inner.position = seconds.max(0.0);
            Ok(())
        }

        fn set_rate(&mut self, factor: f64) -> Result<()> {
            self.inner.lock().rate = factor;
            Ok(())
        }

        fn position_seconds(&self) -> f64 {
            self.inner.lock().position
        }

        fn duration_seconds(&self) -> f64 {
            self.inner.lock().duration
        }

        fn state(&self) -> ClockState {
            self.inner.lock().state
        }
    }
}

pub use manual::ManualClock;

#[cfg(feature = "playback")]
mod rodio_clock {
    use super::{ClockState, PlaybackClock};
    use crate::{CantaraError, Result};
    use log::debug;
    use rodio::source::Source;
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Source wrapper counting consumed samples so the clock can report
    /// media position without help from the decoder.
    struct TickingSource<S> {
        inner: S,
        samples: Arc<AtomicU64>,
        ended: Arc<AtomicBool>,
    }

    impl<S> Iterator for TickingSource<S>
    where
        S: Source<Item = i16>,
    {
        type Item = i16;

        fn next(&mut self) -> Option<i16> {
            match self.inner.next() {
                Some(sample) => {
                    self.samples.fetch_add(1, Ordering::Relaxed);
                    Some(sample)
                }
                None => {
                    self.ended.store(true, Ordering::Release);
                    None
                }
            }
        }
    }

    impl<S> Source for TickingSource<S>
    where
        S: Source<Item = i16>,
    {
        fn current_frame_len(&self) -> Option<usize> {
            self.inner.current_frame_len()
        }

        fn channels(&self) -> u16 {
            self.inner.channels()
        }

        fn sample_rate(&self) -> u32 {
            self.inner.sample_rate()
        }

        fn total_duration(&self) -> Option<Duration> {
            self.inner.total_duration()
        }
    }

    /// Playback clock backed by a rodio sink on the default output device.
    pub struct RodioClock {
        // Keeps the output device alive for the lifetime of the clock.
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sink: Option<Sink>,
        path: Option<PathBuf>,
        duration: f64,
        base_seconds: f64,
        samples: Arc<AtomicU64>,
        ended: Arc<AtomicBool>,
        stopped: bool,
        rate: f64,
        samples_per_second: f64,
    }

    impl RodioClock {
        /// Open the default audio output device.
        pub fn new() -> Result<Self> {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| CantaraError::AudioDeviceError(format!("no output device: {}", e)))?;
            Ok(RodioClock {
                _stream: stream,
                handle,
                sink: None,
                path: None,
                duration: 0.0,
                base_seconds: 0.0,
                samples: Arc::new(AtomicU64::new(0)),
                ended: Arc::new(AtomicBool::new(false)),
                stopped: false,
                rate: 1.0,
                samples_per_second: 1.0,
            })
        }

        /// Build a fresh sink playing `path` from `offset` seconds in.
        fn start_at(&mut self, path: &Path, offset: f64) -> Result<()> {
            let file = File::open(path).map_err(CantaraError::Io)?;
            let decoder = Decoder::new(BufReader::new(file)).map_err(|e| {
                CantaraError::AudioDeviceError(format!(
                    "cannot decode {}: {}",
                    path.display(),
                    e
                ))
            })?;

            let channels = decoder.channels();
            let sample_rate = decoder.sample_rate();
            self.samples_per_second = f64::from(sample_rate) * f64::from(channels);
            if let Some(total) = decoder.total_duration() {
                self.duration = total.as_secs_f64();
            }

            self.samples = Arc::new(AtomicU64::new(0));
            self.ended = Arc::new(AtomicBool::new(false));
            let source = TickingSource {
                inner: decoder.skip_duration(Duration::from_secs_f64(offset)),
                samples: Arc::clone(&self.samples),
                ended: Arc::clone(&self.ended),
            };

            if let Some(old) = self.sink.take() {
                old.stop();
            }
            let sink = Sink::try_new(&self.handle)
                .map_err(|e| CantaraError::AudioDeviceError(format!("sink: {}", e)))?;
            sink.set_speed(self.rate as f32);
            sink.pause();
            sink.append(source);

            self.sink = Some(sink);
            self.base_seconds = offset;
            self.stopped = false;
            debug!("clock loaded {} at {:.2}s", path.display(), offset);
            Ok(())
        }
    }

    impl PlaybackClock for RodioClock {
        fn load(&mut self, path: &Path) -> Result<()> {
            self.duration = 0.0;
            self.start_at(path, 0.0)?;
            self.path = Some(path.to_path_buf());
            Ok(())
        }

        fn play(&mut self) -> Result<()> {
            match &self.sink {
                Some(sink) => {
                    sink.play();
                    Ok(())
                }
                None => Err(CantaraError::ConfigError("no media loaded".to_string())),
            }
        }

        fn pause(&mut self) -> Result<()> {
            if let Some(sink) = &self.sink {
                sink.pause();
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
            self.stopped = true;
            Ok(())
        }

        fn seek(&mut self, seconds: f64) -> Result<()> {
            let path = self
                .path
                .clone()
                .ok_or_else(|| CantaraError::ConfigError("no media loaded".to_string()))?;
            let was_playing = self.state() == ClockState::Playing;
            self.start_at(&path, seconds.max(0.0))?;
            if was_playing {
                self.play()?;
            }
            Ok(())
        }

        fn set_rate(&mut self, factor: f64) -> Result<()> {
            self.rate = factor;
            if let Some(sink) = &self.sink {
                sink.set_speed(factor as f32);
            }
            Ok(())
        }

        fn position_seconds(&self) -> f64 {
            let consumed = self.samples.load(Ordering::Relaxed) as f64 / self.samples_per_second;
            self.base_seconds + consumed
        }

        fn duration_seconds(&self) -> f64 {
            self.duration
        }

        fn state(&self) -> ClockState {
            if self.stopped {
                return ClockState::Stopped;
            }
            match &self.sink {
                None => ClockState::Idle,
                Some(sink) => {
                    if self.ended.load(Ordering::Acquire) && sink.empty() {
                        ClockState::Ended
                    } else if sink.is_paused() {
                        ClockState::Paused
                    } else {
                        ClockState::Playing
                    }
                }
            }
        }
    }
}

#[cfg(feature = "playback")]
pub use rodio_clock::RodioClock;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::path::Path;

    #[test]
    fn manual_clock_walks_the_state_machine() {
        let mut clock = ManualClock::new();
        assert_eq!(clock.state(), ClockState::Idle);

        clock.load(Path::new("song.mp4")).unwrap();
        clock.set_duration(180.0);
        assert_eq!(clock.state(), ClockState::Paused);
        assert_relative_eq!(clock.position_seconds(), 0.0);

        clock.play().unwrap();
        clock.advance(10.0);
        assert_eq!(clock.state(), ClockState::Playing);
        assert_relative_eq!(clock.position_seconds(), 10.0);

        clock.pause().unwrap();
        clock.advance(10.0);
        assert_relative_eq!(clock.position_seconds(), 10.0, epsilon = 1e-9);

        clock.play().unwrap();
        clock.advance(500.0);
        assert_eq!(clock.state(), ClockState::Ended);
        assert_relative_eq!(clock.position_seconds(), 180.0);
    }

    #[test]
    fn manual_clock_respects_rate() {
        let mut clock = ManualClock::new();
        clock.load(Path::new("song.mp4")).unwrap();
        clock.set_duration(100.0);
        clock.set_rate(2.0).unwrap();
        clock.play().unwrap();
        clock.advance(5.0);
        assert_relative_eq!(clock.position_seconds(), 10.0);
    }

    #[test]
    fn manual_clock_handles_share_state() {
        let mut clock = ManualClock::new();
        let handle = clock.clone();
        clock.load(Path::new("a.mp4")).unwrap();
        assert_eq!(handle.loaded_path().unwrap(), Path::new("a.mp4"));
    }
}
