//! Event/Playlist Store interface.
//!
//! The store is an external collaborator owning the playlist for one
//! karaoke event. The engine never reorders it; it only asks for the
//! next unplayed entry and writes back played time and score.
//! [`MemoryStore`] is the in-process implementation used by the CLI and
//! the tests; a database-backed store plugs in through the same trait.

use std::path::{Path, PathBuf};

use log::info;

/// One playlist entry: a media file queued for a performer.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedSong {
    /// Store-assigned identifier, unique within the event.
    pub id: u64,
    /// Media file to play.
    pub path: PathBuf,
    /// Who is singing this one.
    pub performer: String,
    /// Playlist position; lower plays first.
    pub order: u32,
}

impl QueuedSong {
    /// New entry awaiting an id from the store.
    pub fn new(path: impl Into<PathBuf>, performer: impl Into<String>, order: u32) -> Self {
        QueuedSong {
            id: 0,
            path: path.into(),
            performer: performer.into(),
            order,
        }
    }
}

/// Playlist persistence consumed by the session controller.
pub trait EventStore: Send {
    /// Lowest-ordered entry not yet played, if any.
    fn next_unplayed(&mut self) -> Option<QueuedSong>;

    /// Record that a song finished: how long it played and its score.
    /// `score` is `None` when the take could not be scored.
    fn mark_played(&mut self, song_id: u64, played_seconds: f64, score: Option<u32>);
}

struct Entry {
    song: QueuedSong,
    played: bool,
    played_seconds: f64,
    score: Option<u32>,
}

/// In-memory playlist for one event.
pub struct MemoryStore {
    event_name: String,
    next_id: u64,
    entries: Vec<Entry>,
}

impl MemoryStore {
    /// Empty playlist for the named event.
    pub fn new(event_name: impl Into<String>) -> Self {
        MemoryStore {
            event_name: event_name.into(),
            next_id: 1,
            entries: Vec::new(),
        }
    }

    /// The event this playlist belongs to.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Append a song and return its assigned id.
    pub fn enqueue(&mut self, mut song: QueuedSong) -> u64 {
        song.id = self.next_id;
        self.next_id += 1;
        let id = song.id;
        self.entries.push(Entry {
            song,
            played: false,
            played_seconds: 0.0,
            score: None,
        });
        id
    }

    /// Queue a song by path with a default performer slot.
    pub fn enqueue_path(&mut self, path: &Path) -> u64 {
        let order = self.entries.len() as u32;
        self.enqueue(QueuedSong::new(path, "", order))
    }

    /// Number of entries not yet played.
    pub fn remaining(&self) -> usize {
        self.entries.iter().filter(|e| !e.played).count()
    }

    /// Played-back record for a song, `(played_seconds, score)`.
    pub fn playback_record(&self, song_id: u64) -> Option<(f64, Option<u32>)> {
        self.entries
            .iter()
            .find(|e| e.song.id == song_id && e.played)
            .map(|e| (e.played_seconds, e.score))
    }

    /// Performers ranked by their best scored take, highest first.
    /// Unscored takes do not rank.
    pub fn rankings(&self) -> Vec<(String, u32)> {
        let mut best: Vec<(String, u32)> = Vec::new();
        for entry in &self.entries {
            let Some(score) = entry.score else { continue };
            match best.iter_mut().find(|(p, _)| *p == entry.song.performer) {
                Some((_, s)) => *s = (*s).max(score),
                None => best.push((entry.song.performer.clone(), score)),
            }
        }
        best.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        best
    }
}

impl EventStore for MemoryStore {
    fn next_unplayed(&mut self) -> Option<QueuedSong> {
        self.entries
            .iter()
            .filter(|e| !e.played)
            .min_by_key(|e| (e.song.order, e.song.id))
            .map(|e| e.song.clone())
    }

    fn mark_played(&mut self, song_id: u64, played_seconds: f64, score: Option<u32>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.song.id == song_id) {
            entry.played = true;
            entry.played_seconds = played_seconds;
            entry.score = score;
            info!(
                "{}: marked {} played after {:.1}s, score {:?}",
                self.event_name,
                entry.song.path.display(),
                played_seconds,
                score
            );
        }
    }
}
