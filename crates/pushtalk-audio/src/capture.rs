//! Audio capture service: owns a microphone line and drives one capture
//! session end-to-end, via cpal's `DeviceTrait`/`StreamTrait` on a named
//! `audio-capture` thread. No device-hotplug restart loop or silence
//! detector — those belong to an always-on VAD pipeline, not a single
//! press-to-release capture session.

use crate::device::DeviceManager;
use crate::format::{bytes_for_duration_ms, BLOCK_ALIGN, SAMPLE_RATE_HZ};
use crate::ring_buffer::RingBuffer;
use crate::validator::AudioValidator;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use parking_lot::Mutex;
use pushtalk_foundation::{AudioError, Publisher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CaptureErrorEvent {
    pub reason: String,
    pub at: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    pub chunk_ms: u64,
    pub max_duration_ms: u64,
    pub shutdown_join_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chunk_ms: 20,
            max_duration_ms: 60_000,
            shutdown_join_timeout: Duration::from_millis(500),
        }
    }
}

struct SessionRecord {
    id: Uuid,
    active: Arc<AtomicBool>,
    canceled: Arc<AtomicBool>,
    buffer: Arc<RingBuffer>,
    worker: Option<JoinHandle<()>>,
}

/// Owns the OS audio line for the lifetime of a single capture session.
/// Sits below [`pushtalk_foundation::CaptureStateMachine`], which
/// prevents a second session from ever being started concurrently;
/// this service additionally refuses `start_session` on its own so it can
/// be used standalone in tests.
pub struct AudioCaptureService {
    devices: DeviceManager,
    device_name: Option<String>,
    config: CaptureConfig,
    errors: Arc<Publisher<CaptureErrorEvent>>,
    current: Mutex<Option<SessionRecord>>,
    finished: Mutex<Option<SessionRecord>>,
}

impl AudioCaptureService {
    pub fn new(device_name: Option<String>, config: CaptureConfig) -> Self {
        Self {
            devices: DeviceManager::new(),
            device_name,
            config,
            errors: Arc::new(Publisher::new()),
            current: Mutex::new(None),
            finished: Mutex::new(None),
        }
    }

    pub fn error_events(&self) -> &Publisher<CaptureErrorEvent> {
        &self.errors
    }

    pub fn start_session(&self) -> Result<Uuid, AudioError> {
        let mut current = self.current.lock();
        if current.is_some() {
            return Err(AudioError::AlreadyActive);
        }

        let id = Uuid::new_v4();
        let capacity = bytes_for_duration_ms(self.config.max_duration_ms) + BLOCK_ALIGN as usize;
        let buffer = Arc::new(RingBuffer::new(capacity));
        let active = Arc::new(AtomicBool::new(true));

        let device = self.devices.open(self.device_name.as_deref())?;
        let worker = spawn_worker(
            device,
            buffer.clone(),
            active.clone(),
            self.config,
            self.errors.clone(),
        )?;

        *current = Some(SessionRecord {
            id,
            active,
            canceled: Arc::new(AtomicBool::new(false)),
            buffer,
            worker: Some(worker),
        });
        Ok(id)
    }

    /// Flips `active` to false and joins the worker. The session moves to
    /// the "finished" slot, where `read_all` can retrieve it.
    pub fn stop_session(&self, id: Uuid) -> Result<(), AudioError> {
        let mut record = {
            let mut current = self.current.lock();
            match current.take() {
                Some(r) if r.id == id => r,
                Some(other) => {
                    *current = Some(other);
                    return Err(AudioError::StillActive);
                }
                None => return Err(AudioError::StillActive),
            }
        };
        record.active.store(false, Ordering::SeqCst);
        if let Some(handle) = record.worker.take() {
            let _ = handle.join();
        }
        *self.finished.lock() = Some(record);
        Ok(())
    }

    /// Flips `active` to false, marks `canceled`, and discards the buffer.
    pub fn cancel_session(&self) -> Option<Uuid> {
        let mut record = self.current.lock().take()?;
        let id = record.id;
        record.active.store(false, Ordering::SeqCst);
        record.canceled.store(true, Ordering::SeqCst);
        if let Some(handle) = record.worker.take() {
            let _ = handle.join();
        }
        record.buffer.clear();
        *self.finished.lock() = Some(record);
        Some(id)
    }

    /// Returns the validated PCM snapshot, consuming the finished session.
    pub fn read_all(&self, id: Uuid, validator: &AudioValidator) -> Result<Vec<u8>, AudioError> {
        if let Some(current) = self.current.lock().as_ref() {
            if current.id == id {
                return Err(AudioError::StillActive);
            }
        }
        let mut finished = self.finished.lock();
        match finished.take() {
            Some(record) if record.id == id => {
                if record.canceled.load(Ordering::SeqCst) {
                    return Err(AudioError::Canceled);
                }
                let pcm = record.buffer.snapshot_and_clear();
                validator
                    .validate(&pcm)
                    .map_err(|reason| AudioError::InvalidAudio {
                        reason: format!("{reason:?}"),
                    })?;
                Ok(pcm)
            }
            other => {
                *finished = other;
                Err(AudioError::StillActive)
            }
        }
    }

    /// Process-level shutdown: flips `active` under lock, then joins the
    /// worker outside the lock with a bounded timeout.
    pub fn shutdown(&self) {
        let record = self.current.lock().take();
        if let Some(mut record) = record {
            record.active.store(false, Ordering::SeqCst);
            if let Some(handle) = record.worker.take() {
                let deadline = Instant::now() + self.config.shutdown_join_timeout;
                while !handle.is_finished() && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(5));
                }
                if !handle.is_finished() {
                    tracing::warn!("audio-capture worker overran shutdown join timeout");
                }
                let _ = handle.join();
            }
        }
    }
}

fn spawn_worker(
    device: cpal::Device,
    buffer: Arc<RingBuffer>,
    active: Arc<AtomicBool>,
    config: CaptureConfig,
    errors: Arc<Publisher<CaptureErrorEvent>>,
) -> Result<JoinHandle<()>, AudioError> {
    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::LineUnavailable(e.to_string()))?;
    let sample_format = supported.sample_format();
    let stream_config: StreamConfig = StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(SAMPLE_RATE_HZ),
        buffer_size: cpal::BufferSize::Default,
    };

    let chunk_bytes = bytes_for_duration_ms(config.chunk_ms);
    let hard_stop_bytes = bytes_for_duration_ms(config.max_duration_ms);

    thread::Builder::new()
        .name("audio-capture".to_string())
        .spawn(move || {
            run_capture_loop(
                device,
                stream_config,
                sample_format,
                buffer,
                active,
                chunk_bytes,
                hard_stop_bytes,
                errors,
            )
        })
        .map_err(|e| AudioError::Fatal(format!("failed to spawn audio-capture thread: {e}")))
}

fn run_capture_loop(
    device: cpal::Device,
    stream_config: StreamConfig,
    sample_format: SampleFormat,
    buffer: Arc<RingBuffer>,
    active: Arc<AtomicBool>,
    chunk_bytes: usize,
    hard_stop_bytes: usize,
    errors: Arc<Publisher<CaptureErrorEvent>>,
) {
    let written = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let written_cb = written.clone();
    let buffer_cb = buffer.clone();
    let active_cb = active.clone();
    let err_flag = Arc::new(AtomicBool::new(false));
    let err_flag_cb = err_flag.clone();

    let err_fn = move |err: cpal::StreamError| {
        tracing::error!(%err, "audio stream error");
        err_flag_cb.store(true, Ordering::SeqCst);
    };

    let stream_result = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _| {
                if !active_cb.load(Ordering::SeqCst) {
                    return;
                }
                let bytes: Vec<u8> = data.iter().flat_map(|s| s.to_le_bytes()).collect();
                written_cb.fetch_add(bytes.len(), Ordering::Relaxed);
                buffer_cb.write(&bytes);
            },
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| {
                if !active_cb.load(Ordering::SeqCst) {
                    return;
                }
                let bytes: Vec<u8> = data
                    .iter()
                    .flat_map(|s| ((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16).to_le_bytes())
                    .collect();
                written_cb.fetch_add(bytes.len(), Ordering::Relaxed);
                buffer_cb.write(&bytes);
            },
            err_fn,
            None,
        ),
        other => {
            errors.publish(&CaptureErrorEvent {
                reason: format!("unsupported sample format: {other:?}"),
                at: Instant::now(),
            });
            return;
        }
    };

    let stream = match stream_result {
        Ok(s) => s,
        Err(e) => {
            errors.publish(&CaptureErrorEvent {
                reason: format!("failed to build input stream: {e}"),
                at: Instant::now(),
            });
            return;
        }
    };

    if let Err(e) = stream.play() {
        errors.publish(&CaptureErrorEvent {
            reason: format!("failed to start input stream: {e}"),
            at: Instant::now(),
        });
        return;
    }

    let poll_interval = Duration::from_millis(chunk_bytes as u64 * 1000 / crate::format::BYTE_RATE as u64 + 1);
    while active.load(Ordering::SeqCst) {
        if err_flag.load(Ordering::SeqCst) {
            errors.publish(&CaptureErrorEvent {
                reason: "audio line error during capture".to_string(),
                at: Instant::now(),
            });
            break;
        }
        if written.load(Ordering::Relaxed) >= hard_stop_bytes {
            active.store(false, Ordering::SeqCst);
            break;
        }
        thread::sleep(poll_interval);
    }

    drop(stream);
}
