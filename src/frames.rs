//! Frame Stream Reader
//!
//! Spawns an ffmpeg decoder emitting raw RGB24 frames on its stdout and
//! pumps them to the presentation sink at the track's nominal frame
//! rate. The pipe carries no framing, so one frame is exactly
//! `width*height*3` bytes and a short read means the stream is over.
//!
//! Video pacing is best-effort wall-clock sleep at `1/fps`; audio stays
//! the authoritative clock and small drift is tolerated.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::media::Track;
use crate::presentation::PresentationSink;
use crate::{CantaraError, Result};

/// Poll interval while paused, and the bound on how long a cleared
/// playing flag can keep the loop alive.
const PAUSE_POLL: Duration = Duration::from_millis(50);

/// One decoded RGB24 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Interleaved RGB bytes, `width * height * 3` of them.
    pub data: Vec<u8>,
}

/// Owns the decoder subprocess and the worker pumping its output.
pub struct FrameReader {
    child: Arc<Mutex<Option<Child>>>,
    worker: Option<JoinHandle<()>>,
    alive: Arc<AtomicBool>,
}

impl FrameReader {
    /// New reader with no decoder running.
    pub fn new() -> Self {
        FrameReader {
            child: Arc::new(Mutex::new(None)),
            worker: None,
            alive: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while the pump worker is running.
    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Claim the single worker slot. False means one is already alive.
    fn try_activate(&self) -> bool {
        !self.alive.swap(true, Ordering::AcqRel)
    }

    /// Spawn the decoder for `path` and start pumping frames.
    ///
    /// Starting while a previous worker is still alive is a no-op, so a
    /// rapid pause/play cannot stack two readers on one pipe. The
    /// `playing` flag is the loop's sole authorization: clearing it
    /// stops frame delivery within one poll interval. `on_end(true)`
    /// fires when the stream ran out on its own, `on_end(false)` when
    /// the loop exited because the flag was cleared.
    pub fn start<F>(
        &mut self,
        path: &std::path::Path,
        track: &Track,
        playing: Arc<AtomicBool>,
        paused: Arc<AtomicBool>,
        sink: Arc<dyn PresentationSink>,
        on_end: F,
    ) -> Result<()>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        if !self.try_activate() {
            debug!("frame reader already active, start ignored");
            return Ok(());
        }

        let mut child = Command::new("ffmpeg")
            .arg("-i")
            .arg(path)
            .args(["-f", "image2pipe", "-pix_fmt", "rgb24", "-vcodec", "rawvideo", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                self.alive.store(false, Ordering::Release);
                CantaraError::Other(format!("failed to spawn frame decoder: {}", e))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            self.alive.store(false, Ordering::Release);
            CantaraError::Other("frame decoder has no stdout".to_string())
        })?;
        *self.child.lock() = Some(child);

        let width = track.width;
        let height = track.height;
        let fps = track.fps;
        let alive = Arc::clone(&self.alive);
        let child_slot = Arc::clone(&self.child);
        self.worker = Some(thread::spawn(move || {
            let natural = pump_frames(stdout, width, height, fps, &playing, &paused, &*sink);
            if let Some(mut child) = child_slot.lock().take() {
                let _ = child.kill();
                let _ = child.wait();
            }
            alive.store(false, Ordering::Release);
            debug!("frame pump exited, natural end: {}", natural);
            on_end(natural);
        }));
        Ok(())
    }

    /// Kill the decoder and wait for the pump worker to exit.
    ///
    /// The caller clears the `playing` flag first; killing the decoder
    /// unblocks a read stuck mid-frame so the join is bounded.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.lock().take() {
            if let Err(e) = child.kill() {
                warn!("failed to kill frame decoder: {}", e);
            }
            let _ = child.wait();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read fixed-size frames from `reader` and deliver them at `fps` pace.
///
/// Returns true when the stream ended with a short read (natural end of
/// track), false when the `playing` flag was cleared.
fn pump_frames<R: Read>(
    mut reader: R,
    width: u32,
    height: u32,
    fps: f64,
    playing: &AtomicBool,
    paused: &AtomicBool,
    sink: &dyn PresentationSink,
) -> bool {
    let frame_len = width as usize * height as usize * 3;
    let interval = Duration::from_secs_f64(1.0 / fps.max(1.0));
    let mut buf = vec![0u8; frame_len];

    loop {
        if !playing.load(Ordering::Acquire) {
            return false;
        }
        if paused.load(Ordering::Acquire) {
            thread::sleep(PAUSE_POLL);
            continue;
        }
        if reader.read_exact(&mut buf).is_err() {
            // Short read or killed decoder. If the flag is still set the
            // pipe drained on its own and the track is over.
            return playing.load(Ordering::Acquire);
        }
        sink.frame(VideoFrame {
            width,
            height,
            data: buf.clone(),
        });
        thread::sleep(interval);
    }
}
