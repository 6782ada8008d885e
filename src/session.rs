//! Session Controller
//!
//! The state machine tying the engine together: load a track, resolve
//! the requested pitch shift, play it while pumping frames and sampling
//! the microphone, score the take at end of track and advance the
//! playlist. Workers report back through a bounded event channel that
//! the control thread drains with [`SessionController::pump`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use log::{info, warn};
use tempfile::TempPath;

use crate::clock::{ClockState, PlaybackClock};
use crate::frames::FrameReader;
use crate::media::{probe_track, Track};
use crate::mic::EnergySeries;
use crate::pitch::run_shift;
use crate::presentation::PresentationSink;
use crate::score::score_series;
use crate::store::{EventStore, QueuedSong};
use crate::{CantaraError, Result};

/// Semitone shift bounds.
const SHIFT_MIN: i32 = -12;
/// Upper semitone bound.
const SHIFT_MAX: i32 = 12;

/// Event channel depth; workers emit at most a handful of events per track.
const EVENT_QUEUE_DEPTH: usize = 16;

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded.
    Idle,
    /// A track is loaded at shift zero.
    Loaded,
    /// A pitch-shift transcode is in flight.
    ShiftPending,
    /// Track loaded with its shift resolved, ready to play.
    Ready,
    /// Audio and frames are running.
    Playing,
    /// Frozen mid-track.
    Paused,
    /// Operator stopped playback before the end.
    Stopped,
    /// End-of-track reduction is running.
    Scoring,
}

/// Worker-to-control-thread notifications.
enum EngineEvent {
    /// The transcode worker finished, successfully or not.
    ShiftFinished {
        semitones: i32,
        result: Result<TempPath>,
    },
    /// The frame pump exited. `natural` means the stream drained on its
    /// own rather than being stopped.
    TrackEnded { natural: bool },
}

/// Function producing track metadata for a media file.
type Prober = Box<dyn Fn(&Path) -> Result<Track> + Send>;

/// Function running one pitch-shift transcode.
type Shifter = Arc<dyn Fn(&Path, i32) -> Result<TempPath> + Send + Sync>;

struct CurrentTrack {
    song: QueuedSong,
    meta: Track,
    shift: i32,
    /// At most one non-source artifact exists per track; dropping the
    /// previous one deletes its file.
    artifact: Option<TempPath>,
    scored: bool,
}

impl CurrentTrack {
    fn active_path(&self) -> PathBuf {
        match &self.artifact {
            Some(artifact) => artifact.to_path_buf(),
            None => self.meta.path.clone(),
        }
    }
}

/// Drives one karaoke session from playlist start to exhaustion.
pub struct SessionController {
    clock: Box<dyn PlaybackClock>,
    store: Box<dyn EventStore>,
    sink: Arc<dyn PresentationSink>,
    reader: FrameReader,
    state: SessionState,
    current: Option<CurrentTrack>,
    series: EnergySeries,
    playing: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    processing_pitch: Arc<AtomicBool>,
    pending_shift: Option<i32>,
    events_tx: mpsc::SyncSender<EngineEvent>,
    events_rx: mpsc::Receiver<EngineEvent>,
    prober: Prober,
    shifter: Shifter,
    video_enabled: bool,
    #[cfg(feature = "microphone")]
    sampler: Option<crate::mic::VocalSampler>,
}

impl SessionController {
    /// New idle session over the given clock, store and sink.
    pub fn new(
        clock: Box<dyn PlaybackClock>,
        store: Box<dyn EventStore>,
        sink: Arc<dyn PresentationSink>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::sync_channel(EVENT_QUEUE_DEPTH);
        SessionController {
            clock,
            store,
            sink,
            reader: FrameReader::new(),
            state: SessionState::Idle,
            current: None,
            series: EnergySeries::new(),
            playing: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            processing_pitch: Arc::new(AtomicBool::new(false)),
            pending_shift: None,
            events_tx,
            events_rx,
            prober: Box::new(probe_track),
            shifter: Arc::new(|path, semitones| run_shift(path, semitones)),
            video_enabled: true,
            #[cfg(feature = "microphone")]
            sampler: None,
        }
    }

    /// Replace the metadata source. Headless deployments and tests use
    /// this to avoid spawning the probe tool.
    pub fn set_prober(&mut self, prober: impl Fn(&Path) -> Result<Track> + Send + 'static) {
        self.prober = Box::new(prober);
    }

    /// Replace the transcode runner.
    pub fn set_shifter(
        &mut self,
        shifter: impl Fn(&Path, i32) -> Result<TempPath> + Send + Sync + 'static,
    ) {
        self.shifter = Arc::new(shifter);
    }

    /// Disable the video frame pipeline (audio-only deployment).
    pub fn set_video_enabled(&mut self, enabled: bool) {
        self.video_enabled = enabled;
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Shift of the loaded track, zero when none is loaded.
    pub fn current_shift(&self) -> i32 {
        self.current.as_ref().map_or(0, |t| t.shift)
    }

    /// Path playback actually uses: the shift artifact when one exists,
    /// the source file otherwise.
    pub fn processed_path(&self) -> Option<PathBuf> {
        self.current.as_ref().map(|t| t.active_path())
    }

    /// True while the frame loop is authorized to run.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Pull the next unplayed song from the store and load it.
    ///
    /// Returns false when the playlist is exhausted; the sink gets a
    /// session-complete signal and the session goes idle.
    pub fn load_next(&mut self) -> Result<bool> {
        match self.store.next_unplayed() {
            Some(song) => {
                self.load(song)?;
                Ok(true)
            }
            None => {
                self.state = SessionState::Idle;
                self.current = None;
                self.sink.session_complete();
                Ok(false)
            }
        }
    }

    /// Load one song: probe metadata, reset shift and captured energy.
    ///
    /// A failed probe keeps the previously loaded track, if any.
    pub fn load(&mut self, song: QueuedSong) -> Result<()> {
        let meta = (self.prober)(&song.path).map_err(|e| {
            self.sink.status(&format!("cannot load {}: {}", song.path.display(), e));
            e
        })?;

        self.clock.load(&meta.path)?;
        self.series.reset();
        self.pending_shift = None;
        info!(
            "loaded {} ({}x{} @ {:.2} fps, {:.1}s)",
            meta.path.display(),
            meta.width,
            meta.height,
            meta.fps,
            meta.duration
        );
        self.sink
            .status(&format!("loaded {}", song.path.display()));
        self.current = Some(CurrentTrack {
            song,
            meta,
            shift: 0,
            artifact: None,
            scored: false,
        });
        self.state = SessionState::Loaded;
        Ok(())
    }

    /// Request a pitch shift for the loaded track.
    ///
    /// A request made while the track is playing or paused stops
    /// playback first: the transcode reads the source file the running
    /// decoders are tied to, and the shifted artifact replaces the
    /// loaded media anyway. Shift zero resolves immediately by falling
    /// back to the source file. Otherwise a transcode worker starts; a
    /// request arriving while one is in flight is queued and started
    /// when the current one finishes, never run concurrently. Only the
    /// newest queued request survives, zero included.
    pub fn request_shift(&mut self, semitones: i32) -> Result<()> {
        if !(SHIFT_MIN..=SHIFT_MAX).contains(&semitones) {
            return Err(CantaraError::ConfigError(format!(
                "shift {} outside [{}, {}]",
                semitones, SHIFT_MIN, SHIFT_MAX
            )));
        }
        if self.current.is_none() {
            return Err(CantaraError::ConfigError("no track loaded".to_string()));
        }
        if matches!(self.state, SessionState::Playing | SessionState::Paused) {
            self.stop()?;
        }

        if self.processing_pitch.load(Ordering::Acquire) {
            info!("shift {} queued behind the running transcode", semitones);
            self.pending_shift = Some(semitones);
            return Ok(());
        }

        let Some(track) = self.current.as_mut() else {
            return Err(CantaraError::ConfigError("no track loaded".to_string()));
        };
        if semitones == 0 {
            track.shift = 0;
            track.artifact = None;
            let source = track.meta.path.clone();
            self.clock.load(&source)?;
            self.state = SessionState::Ready;
            return Ok(());
        }

        // Only the control thread flips this on; the worker's completion
        // is also handled here, so load-then-store cannot race.
        self.processing_pitch.store(true, Ordering::Release);
        let source = track.meta.path.clone();
        let shifter = Arc::clone(&self.shifter);
        let events_tx = self.events_tx.clone();
        self.state = SessionState::ShiftPending;
        self.sink
            .status(&format!("shifting by {} semitones...", semitones));
        thread::spawn(move || {
            let result = shifter(&source, semitones);
            let _ = events_tx.send(EngineEvent::ShiftFinished { semitones, result });
        });
        Ok(())
    }

    /// Start or resume playback.
    pub fn play(&mut self) -> Result<()> {
        match self.state {
            SessionState::Paused => {
                self.paused.store(false, Ordering::Release);
                self.clock.play()?;
                self.state = SessionState::Playing;
                return Ok(());
            }
            SessionState::Loaded | SessionState::Ready => {}
            other => {
                return Err(CantaraError::ConfigError(format!(
                    "cannot play from {:?}",
                    other
                )))
            }
        }

        let track = self
            .current
            .as_mut()
            .ok_or_else(|| CantaraError::ConfigError("no track loaded".to_string()))?;
        track.scored = false;
        let path = track.active_path();
        let meta = track.meta.clone();
        let performer = track.song.performer.clone();

        self.series.reset();
        self.playing.store(true, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        self.clock.play()?;

        if self.video_enabled {
            let events_tx = self.events_tx.clone();
            let started = self.reader.start(
                &path,
                &meta,
                Arc::clone(&self.playing),
                Arc::clone(&self.paused),
                Arc::clone(&self.sink),
                move |natural| {
                    let _ = events_tx.send(EngineEvent::TrackEnded { natural });
                },
            );
            // Audio keeps going without video; end of track still comes
            // from the clock.
            if let Err(e) = started {
                warn!("frame decoder unavailable, playing audio only: {}", e);
            }
        }

        self.start_sampler();
        self.state = SessionState::Playing;
        if performer.is_empty() {
            self.sink.status("playing");
        } else {
            self.sink.status(&format!("now singing: {}", performer));
        }
        Ok(())
    }

    /// Freeze playback, keeping position and captured energy.
    pub fn pause(&mut self) -> Result<()> {
        if self.state != SessionState::Playing {
            return Ok(());
        }
        self.paused.store(true, Ordering::Release);
        self.clock.pause()?;
        self.state = SessionState::Paused;
        Ok(())
    }

    /// Stop playback without scoring; the track stays marked unplayed.
    pub fn stop(&mut self) -> Result<()> {
        if !matches!(self.state, SessionState::Playing | SessionState::Paused) {
            return Ok(());
        }
        self.playing.store(false, Ordering::Release);
        self.clock.stop()?;
        self.reader.stop();
        self.stop_sampler();
        self.state = SessionState::Stopped;
        self.sink.status("stopped");
        Ok(())
    }

    /// Jump to an absolute position in seconds.
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        self.clock.seek(seconds)
    }

    /// Change the playback rate.
    pub fn set_rate(&mut self, factor: f64) -> Result<()> {
        self.clock.set_rate(factor)
    }

    /// Drain worker events and poll the clock for end of track.
    ///
    /// The control loop calls this regularly; all state transitions
    /// triggered by workers happen here, on the control thread.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
        if self.state == SessionState::Playing && self.clock.state() == ClockState::Ended {
            self.finish_track();
        }
    }

    fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::ShiftFinished { semitones, result } => {
                self.processing_pitch.store(false, Ordering::Release);
                self.apply_shift_result(semitones, result);
                if let Some(queued) = self.pending_shift.take() {
                    if let Err(e) = self.request_shift(queued) {
                        warn!("queued shift {} failed to start: {}", queued, e);
                    }
                }
            }
            EngineEvent::TrackEnded { natural } => {
                if natural && self.state == SessionState::Playing {
                    self.finish_track();
                }
            }
        }
    }

    fn apply_shift_result(&mut self, semitones: i32, result: Result<TempPath>) {
        let Some(track) = self.current.as_mut() else {
            return;
        };
        match result {
            Ok(artifact) => {
                let path = artifact.to_path_buf();
                // Replacing the slot drops and deletes the previous artifact.
                track.artifact = Some(artifact);
                track.shift = semitones;
                if let Err(e) = self.clock.load(&path) {
                    warn!("cannot load shifted artifact: {}", e);
                }
                self.state = SessionState::Ready;
                self.sink
                    .status(&format!("shift {} ready", semitones));
            }
            Err(e) => {
                warn!("shift {} failed: {}", semitones, e);
                track.shift = 0;
                track.artifact = None;
                let source = track.meta.path.clone();
                if let Err(e) = self.clock.load(&source) {
                    warn!("cannot reload source after failed shift: {}", e);
                }
                self.state = SessionState::Ready;
                self.sink
                    .status(&format!("shift failed, playing unshifted: {}", e));
            }
        }
    }

    /// End-of-track transition: score, persist, advance.
    ///
    /// The scored flag is set before anything else so a second trigger
    /// for the same track instance cannot score twice.
    fn finish_track(&mut self) {
        let (song_id, duration) = {
            let Some(track) = self.current.as_mut() else {
                return;
            };
            if track.scored {
                return;
            }
            track.scored = true;
            (track.song.id, track.meta.duration)
        };

        self.state = SessionState::Scoring;
        self.playing.store(false, Ordering::Release);
        self.reader.stop();
        self.stop_sampler();
        if let Err(e) = self.clock.stop() {
            warn!("clock stop at end of track: {}", e);
        }

        let position = self.clock.position_seconds();
        let played_seconds = if position > 0.0 { position } else { duration };

        let result = score_series(&self.series.take());
        self.sink.score(result);
        let persisted = result.scored.then_some(result.points);
        self.store.mark_played(song_id, played_seconds, persisted);
        info!(
            "track {} finished after {:.1}s, score {:?}",
            song_id, played_seconds, persisted
        );

        match self.load_next() {
            Ok(true) => {
                if let Err(e) = self.play() {
                    warn!("autoplay of next track failed: {}", e);
                }
            }
            Ok(false) => {}
            Err(e) => warn!("loading next track failed: {}", e),
        }
    }

    #[cfg(feature = "microphone")]
    fn start_sampler(&mut self) {
        if self.sampler.is_some() {
            return;
        }
        match crate::mic::VocalSampler::start(self.series.clone(), Arc::clone(&self.sink)) {
            Ok(sampler) => self.sampler = Some(sampler),
            // Scoring degrades to "unscored" when the mic is missing.
            Err(e) => warn!("microphone unavailable, take will be unscored: {}", e),
        }
    }

    #[cfg(not(feature = "microphone"))]
    fn start_sampler(&mut self) {}

    #[cfg(feature = "microphone")]
    fn stop_sampler(&mut self) {
        if let Some(mut sampler) = self.sampler.take() {
            sampler.stop();
        }
    }

    #[cfg(not(feature = "microphone"))]
    fn stop_sampler(&mut self) {}

    /// Handle for feeding captured energy from an external source.
    pub fn energy_series(&self) -> EnergySeries {
        self.series.clone()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.playing.store(false, Ordering::Release);
        self.reader.stop();
        self.stop_sampler();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::presentation::NullSink;
    use crate::store::MemoryStore;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn test_meta(path: &Path) -> Track {
        Track {
            path: path.to_path_buf(),
            width: 640,
            height: 480,
            fps: 30.0,
            duration: 180.0,
        }
    }

    fn headless_session(store: MemoryStore) -> (SessionController, ManualClock) {
        let clock = ManualClock::new();
        let handle = clock.clone();
        let mut session = SessionController::new(
            Box::new(clock),
            Box::new(store),
            Arc::new(NullSink),
        );
        session.set_prober(|p| Ok(test_meta(p)));
        session.set_video_enabled(false);
        (session, handle)
    }

    fn pump_until<F: Fn(&SessionController) -> bool>(
        session: &mut SessionController,
        cond: F,
    ) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond(session) {
            assert!(Instant::now() < deadline, "condition never reached");
            session.pump();
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn load_resets_shift_and_state() {
        let mut store = MemoryStore::new("test");
        store.enqueue(QueuedSong::new("a.mp4", "A", 0));
        let (mut session, _) = headless_session(store);

        assert!(session.load_next().unwrap());
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.current_shift(), 0);
        assert_eq!(session.processed_path().unwrap(), Path::new("a.mp4"));
    }

    #[test]
    fn play_requires_a_loaded_track() {
        let (mut session, _) = headless_session(MemoryStore::new("test"));
        assert!(session.play().is_err());
    }

    #[test]
    fn concurrent_shift_requests_are_serialized() {
        let mut store = MemoryStore::new("test");
        store.enqueue(QueuedSong::new("a.mp4", "A", 0));
        let (mut session, _) = headless_session(store);
        session.load_next().unwrap();

        let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let in_flight = Arc::new(AtomicUsize::new(0));
        {
            let calls = Arc::clone(&calls);
            let in_flight = Arc::clone(&in_flight);
            session.set_shifter(move |_, semitones| {
                let depth = in_flight.fetch_add(1, Ordering::SeqCst);
                assert_eq!(depth, 0, "two transcodes ran concurrently");
                thread::sleep(Duration::from_millis(30));
                calls.lock().push(semitones);
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(tempfile::NamedTempFile::new().unwrap().into_temp_path())
            });
        }

        session.request_shift(3).unwrap();
        assert_eq!(session.state(), SessionState::ShiftPending);
        // Second request while the first is in flight gets queued.
        session.request_shift(5).unwrap();

        pump_until(&mut session, |s| {
            s.state() == SessionState::Ready && s.current_shift() == 5
        });
        assert_eq!(*calls.lock(), vec![3, 5]);
    }

    #[test]
    fn repeated_shifts_leave_one_artifact() {
        let mut store = MemoryStore::new("test");
        store.enqueue(QueuedSong::new("a.mp4", "A", 0));
        let (mut session, _) = headless_session(store);
        session.load_next().unwrap();
        session.set_shifter(|_, _| {
            Ok(tempfile::NamedTempFile::new().unwrap().into_temp_path())
        });

        session.request_shift(2).unwrap();
        pump_until(&mut session, |s| s.state() == SessionState::Ready);
        let first = session.processed_path().unwrap();
        assert!(first.exists());

        session.request_shift(4).unwrap();
        pump_until(&mut session, |s| {
            s.state() == SessionState::Ready && s.current_shift() == 4
        });
        let second = session.processed_path().unwrap();
        assert!(second.exists());
        assert!(!first.exists(), "superseded artifact must be deleted");
        assert_ne!(first, second);
    }

    #[test]
    fn midplay_shift_stops_playback_before_transcoding() {
        let mut store = MemoryStore::new("test");
        store.enqueue(QueuedSong::new("a.mp4", "A", 0));
        let (mut session, clock) = headless_session(store);
        session.load_next().unwrap();
        clock.set_duration(180.0);
        session.set_shifter(|_, _| {
            Ok(tempfile::NamedTempFile::new().unwrap().into_temp_path())
        });

        session.play().unwrap();
        clock.advance(5.0);
        session.request_shift(3).unwrap();

        // The frame loop loses its authorization before the job starts.
        assert!(!session.is_playing());
        assert_eq!(session.state(), SessionState::ShiftPending);

        pump_until(&mut session, |s| {
            s.state() == SessionState::Ready && s.current_shift() == 3
        });

        // The shifted track still plays through to scoring.
        session.play().unwrap();
        clock.advance(500.0);
        session.pump();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn zero_shift_while_transcoding_is_queued() {
        let mut store = MemoryStore::new("test");
        store.enqueue(QueuedSong::new("a.mp4", "A", 0));
        let (mut session, _) = headless_session(store);
        session.load_next().unwrap();

        let artifacts = Arc::new(parking_lot::Mutex::new(Vec::new()));
        {
            let artifacts = Arc::clone(&artifacts);
            session.set_shifter(move |_, _| {
                thread::sleep(Duration::from_millis(30));
                let artifact = tempfile::NamedTempFile::new().unwrap().into_temp_path();
                artifacts.lock().push(artifact.to_path_buf());
                Ok(artifact)
            });
        }

        session.request_shift(3).unwrap();
        session.request_shift(0).unwrap();
        // The zero must wait behind the running job, not resolve early.
        assert_eq!(session.state(), SessionState::ShiftPending);

        pump_until(&mut session, |s| {
            s.state() == SessionState::Ready && s.current_shift() == 0
        });
        assert_eq!(session.processed_path().unwrap(), Path::new("a.mp4"));
        let artifacts = artifacts.lock();
        assert_eq!(artifacts.len(), 1, "only the first request transcodes");
        assert!(!artifacts[0].exists(), "stale artifact must be deleted");
    }

    #[test]
    fn failed_shift_falls_back_to_source() {
        let mut store = MemoryStore::new("test");
        store.enqueue(QueuedSong::new("a.mp4", "A", 0));
        let (mut session, clock) = headless_session(store);
        session.load_next().unwrap();
        session.set_shifter(|_, _| Err(CantaraError::TranscodeError("boom".to_string())));

        session.request_shift(7).unwrap();
        pump_until(&mut session, |s| s.state() == SessionState::Ready);
        assert_eq!(session.current_shift(), 0);
        assert_eq!(session.processed_path().unwrap(), Path::new("a.mp4"));
        assert_eq!(clock.loaded_path().unwrap(), Path::new("a.mp4"));
    }

    #[test]
    fn zero_shift_resolves_without_a_worker() {
        let mut store = MemoryStore::new("test");
        store.enqueue(QueuedSong::new("a.mp4", "A", 0));
        let (mut session, _) = headless_session(store);
        session.load_next().unwrap();
        session.set_shifter(|_, _| panic!("zero shift must not transcode"));

        session.request_shift(0).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.processed_path().unwrap(), Path::new("a.mp4"));
    }

    #[test]
    fn out_of_range_shift_is_rejected() {
        let mut store = MemoryStore::new("test");
        store.enqueue(QueuedSong::new("a.mp4", "A", 0));
        let (mut session, _) = headless_session(store);
        session.load_next().unwrap();
        assert!(session.request_shift(13).is_err());
        assert!(session.request_shift(-13).is_err());
    }

    #[test]
    fn pause_and_resume_keep_position() {
        let mut store = MemoryStore::new("test");
        store.enqueue(QueuedSong::new("a.mp4", "A", 0));
        let (mut session, clock) = headless_session(store);
        session.load_next().unwrap();
        clock.set_duration(180.0);

        session.play().unwrap();
        clock.advance(30.0);
        session.pause().unwrap();
        assert_eq!(session.state(), SessionState::Paused);

        session.play().unwrap();
        assert_eq!(session.state(), SessionState::Playing);
        clock.advance(1.0);
        assert!((31.0 - clock.position_seconds()).abs() < 1e-9);
    }

    #[test]
    fn stop_does_not_score() {
        let mut store = MemoryStore::new("test");
        store.enqueue(QueuedSong::new("a.mp4", "A", 0));
        let (mut session, clock) = headless_session(store);
        session.load_next().unwrap();
        clock.set_duration(180.0);
        session.play().unwrap();
        clock.advance(10.0);

        session.stop().unwrap();
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(!session.is_playing());
        session.pump();
        assert_eq!(session.state(), SessionState::Stopped);
    }
}
