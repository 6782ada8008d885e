//! End-to-end session runs against a scripted clock and an in-memory
//! playlist: natural end of track must score exactly once, persist the
//! played duration, and advance to the next song.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use cantara::clock::{ManualClock, PlaybackClock};
use cantara::media::Track;
use cantara::presentation::PresentationSink;
use cantara::score::ScoreResult;
use cantara::session::{SessionController, SessionState};
use cantara::store::{EventStore, MemoryStore, QueuedSong};

/// Store handle shared between the session and the test assertions.
#[derive(Clone)]
struct SharedStore {
    inner: Arc<Mutex<MemoryStore>>,
    mark_calls: Arc<AtomicUsize>,
}

impl SharedStore {
    fn new(store: MemoryStore) -> Self {
        SharedStore {
            inner: Arc::new(Mutex::new(store)),
            mark_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl EventStore for SharedStore {
    fn next_unplayed(&mut self) -> Option<QueuedSong> {
        self.inner.lock().next_unplayed()
    }

    fn mark_played(&mut self, song_id: u64, played_seconds: f64, score: Option<u32>) {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.lock().mark_played(song_id, played_seconds, score);
    }
}

#[derive(Default)]
struct RecordingSink {
    scores: Mutex<Vec<ScoreResult>>,
    complete: AtomicUsize,
}

impl PresentationSink for RecordingSink {
    fn score(&self, result: ScoreResult) {
        self.scores.lock().push(result);
    }

    fn session_complete(&self) {
        self.complete.fetch_add(1, Ordering::SeqCst);
    }
}

fn session_over(
    store: SharedStore,
    sink: Arc<RecordingSink>,
) -> (SessionController, ManualClock) {
    let clock = ManualClock::new();
    let handle = clock.clone();
    let mut session = SessionController::new(Box::new(clock), Box::new(store), sink);
    session.set_video_enabled(false);
    session.set_prober(|path| {
        Ok(Track {
            path: path.to_path_buf(),
            width: 640,
            height: 480,
            fps: 30.0,
            duration: 180.0,
        })
    });
    (session, handle)
}

#[test]
fn natural_end_scores_once_and_completes() {
    let mut playlist = MemoryStore::new("friday-night");
    let song_id = playlist.enqueue(QueuedSong::new("finale.mp4", "Sam", 0));
    let store = SharedStore::new(playlist);
    let sink = Arc::new(RecordingSink::default());

    let (mut session, clock) = session_over(store.clone(), Arc::clone(&sink));
    assert!(session.load_next().unwrap());
    clock.set_duration(180.0);

    session.play().unwrap();
    assert_eq!(session.state(), SessionState::Playing);

    // Simulate a sung take so the score counts.
    let series = session.energy_series();
    for _ in 0..64 {
        series.push(900.0);
    }

    clock.advance(179.6);
    session.pump();
    assert_eq!(session.state(), SessionState::Playing, "not over yet");

    clock.advance(0.4);
    session.pump();

    // One scoring pass, one mark_played, playlist exhausted.
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(store.mark_calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.scores.lock().len(), 1);
    assert!(sink.scores.lock()[0].scored);
    assert_eq!(sink.complete.load(Ordering::SeqCst), 1);

    let record = store.inner.lock().playback_record(song_id).unwrap();
    assert!(
        (record.0 - 180.0).abs() < 1.0,
        "played_seconds {} should be about 180",
        record.0
    );
    assert!(record.1.is_some(), "a sung take persists a score");

    // Pumping again after the transition must not score a second time.
    session.pump();
    session.pump();
    assert_eq!(store.mark_calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.scores.lock().len(), 1);
}

#[test]
fn finished_track_autoplays_the_next_one() {
    let mut playlist = MemoryStore::new("friday-night");
    let first = playlist.enqueue(QueuedSong::new("opener.mp4", "Sam", 0));
    let second = playlist.enqueue(QueuedSong::new("closer.mp4", "Ana", 1));
    let store = SharedStore::new(playlist);
    let sink = Arc::new(RecordingSink::default());

    let (mut session, clock) = session_over(store.clone(), Arc::clone(&sink));
    session.load_next().unwrap();
    clock.set_duration(180.0);
    session.play().unwrap();

    clock.advance(200.0);
    session.pump();

    // The second track is already playing from the top.
    assert_eq!(session.state(), SessionState::Playing);
    assert_eq!(clock.loaded_path().unwrap(), Path::new("closer.mp4"));
    assert!((clock.position_seconds() - 0.0).abs() < 1e-9);
    assert_eq!(store.inner.lock().remaining(), 1);

    clock.advance(200.0);
    session.pump();

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(store.mark_calls.load(Ordering::SeqCst), 2);
    assert_eq!(sink.complete.load(Ordering::SeqCst), 1);

    // Neither take had vocals, so both persist without a score.
    let first_record = store.inner.lock().playback_record(first).unwrap();
    let second_record = store.inner.lock().playback_record(second).unwrap();
    assert!(first_record.1.is_none());
    assert!(second_record.1.is_none());
}

#[test]
fn operator_stop_leaves_the_song_unplayed() {
    let mut playlist = MemoryStore::new("friday-night");
    playlist.enqueue(QueuedSong::new("opener.mp4", "Sam", 0));
    let store = SharedStore::new(playlist);
    let sink = Arc::new(RecordingSink::default());

    let (mut session, clock) = session_over(store.clone(), Arc::clone(&sink));
    session.load_next().unwrap();
    clock.set_duration(180.0);
    session.play().unwrap();
    clock.advance(42.0);

    session.stop().unwrap();
    session.pump();

    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(store.mark_calls.load(Ordering::SeqCst), 0);
    assert!(sink.scores.lock().is_empty());
    assert_eq!(store.inner.lock().remaining(), 1);
}
