//! cpal-backed microphone capture worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info, warn};
use parking_lot::Mutex;

use super::{block_rms, clamp_gain, rms_to_db, EnergySeries, BLOCK_SIZE, DEFAULT_GAIN, SAMPLE_RATE};
use crate::presentation::PresentationSink;
use crate::{CantaraError, Result};

/// One microphone stream system-wide; the device is exclusive.
static MIC_IN_USE: AtomicBool = AtomicBool::new(false);

/// Live microphone capture feeding an [`EnergySeries`].
///
/// A worker thread owns the cpal stream (the stream handle is not
/// `Send`, the sampler handle is). Each 2048-sample block becomes one
/// energy sample in the series plus one dB reading on the presentation
/// meter. `stop` is idempotent and releases the device.
pub struct VocalSampler {
    shutdown: Arc<AtomicBool>,
    gain: Arc<Mutex<f32>>,
    worker: Option<JoinHandle<()>>,
}

impl VocalSampler {
    /// Open the default input device and start capturing into `series`.
    ///
    /// Fails with [`CantaraError::AudioDeviceError`] when another
    /// sampler is already open or the device cannot be started.
    pub fn start(series: EnergySeries, sink: Arc<dyn PresentationSink>) -> Result<Self> {
        if MIC_IN_USE.swap(true, Ordering::AcqRel) {
            return Err(CantaraError::AudioDeviceError(
                "microphone already in use".to_string(),
            ));
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let gain = Arc::new(Mutex::new(DEFAULT_GAIN));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);

        let worker = {
            let shutdown = Arc::clone(&shutdown);
            let gain = Arc::clone(&gain);
            thread::spawn(move || {
                match capture_loop(series, sink, gain, &shutdown, ready_tx) {
                    Ok(()) => info!("microphone capture stopped"),
                    Err(e) => error!("microphone capture failed: {}", e),
                }
                MIC_IN_USE.store(false, Ordering::Release);
            })
        };

        // The worker reports whether the stream actually opened.
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(VocalSampler {
                shutdown,
                gain,
                worker: Some(worker),
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(CantaraError::AudioDeviceError(
                    "capture worker died during startup".to_string(),
                ))
            }
        }
    }

    /// Adjust the input gain, clamped into [1, 10].
    pub fn set_gain(&self, gain: f32) {
        *self.gain.lock() = clamp_gain(gain);
    }

    /// Current input gain.
    pub fn gain(&self) -> f32 {
        *self.gain.lock()
    }

    /// Close the stream and release the device. Safe to call twice.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for VocalSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs on the capture worker; owns the cpal stream for its lifetime.
fn capture_loop(
    series: EnergySeries,
    sink: Arc<dyn PresentationSink>,
    gain: Arc<Mutex<f32>>,
    shutdown: &AtomicBool,
    ready_tx: mpsc::SyncSender<Result<()>>,
) -> Result<()> {
    let stream = match build_stream(series, sink, gain) {
        Ok(stream) => stream,
        Err(e) => {
            let msg = e.to_string();
            let _ = ready_tx.send(Err(e));
            return Err(CantaraError::AudioDeviceError(msg));
        }
    };
    if let Err(e) = stream.play() {
        let msg = format!("cannot start capture: {}", e);
        let _ = ready_tx.send(Err(CantaraError::AudioDeviceError(msg.clone())));
        return Err(CantaraError::AudioDeviceError(msg));
    }
    let _ = ready_tx.send(Ok(()));

    while !shutdown.load(Ordering::Acquire) {
        thread::sleep(Duration::from_millis(50));
    }
    drop(stream);
    Ok(())
}

fn build_stream(
    series: EnergySeries,
    sink: Arc<dyn PresentationSink>,
    gain: Arc<Mutex<f32>>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CantaraError::AudioDeviceError("no input device".to_string()))?;
    let supported = device
        .default_input_config()
        .map_err(|e| CantaraError::AudioDeviceError(format!("no input config: {}", e)))?;
    info!(
        "capturing from {:?} ({:?})",
        device.name().unwrap_or_else(|_| "unknown".to_string()),
        supported.sample_format()
    );

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut block = BlockAccumulator::new(series, sink, gain);
    let err_cb = |e| warn!("input stream error: {}", e);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| block.feed(data),
            err_cb,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let converted: Vec<f32> =
                    data.iter().map(|&s| f32::from(s) / 32_768.0).collect();
                block.feed(&converted);
            },
            err_cb,
            None,
        ),
        other => {
            return Err(CantaraError::AudioDeviceError(format!(
                "unsupported input sample format {:?}",
                other
            )))
        }
    }
    .map_err(|e| CantaraError::AudioDeviceError(format!("cannot open capture: {}", e)))?;

    Ok(stream)
}

/// Regroups callback buffers into fixed-size energy blocks.
struct BlockAccumulator {
    buf: Vec<f32>,
    series: EnergySeries,
    sink: Arc<dyn PresentationSink>,
    gain: Arc<Mutex<f32>>,
}

impl BlockAccumulator {
    fn new(series: EnergySeries, sink: Arc<dyn PresentationSink>, gain: Arc<Mutex<f32>>) -> Self {
        BlockAccumulator {
            buf: Vec::with_capacity(BLOCK_SIZE * 2),
            series,
            sink,
            gain,
        }
    }

    fn feed(&mut self, data: &[f32]) {
        self.buf.extend_from_slice(data);
        while self.buf.len() >= BLOCK_SIZE {
            let rest = self.buf.split_off(BLOCK_SIZE);
            let gain = *self.gain.lock();
            let rms = block_rms(&self.buf, gain);
            self.series.push(rms);
            self.sink.meter_db(rms_to_db(rms));
            self.buf = rest;
        }
    }
}
