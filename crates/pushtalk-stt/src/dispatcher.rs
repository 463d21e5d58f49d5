//! Parallel STT dispatcher. Rust has no direct analogue of a
//! Java `ThreadPoolExecutor`, so the bounded core/max/queue executor is
//! built directly on `std::thread` + `crossbeam_channel`'s bounded queue,
//! the same primitives the capture worker and key-hook listener in this
//! workspace use for their own dedicated threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};
use pushtalk_foundation::SttError;

use crate::engine::SttEngine;
use crate::types::{EngineResult, EnginePair};

const CORE_THREADS: usize = 2;
const MAX_THREADS: usize = 4;
const QUEUE_CAPACITY: usize = 100;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Bounded executor sized 2 core / 4 max / queue 100, threads named
/// `stt-0`.. `stt-3`. `CORE_THREADS` workers run from the start; additional
/// workers up to `MAX_THREADS` are spawned lazily the first time `submit`
/// observes the queue non-empty, mirroring a `ThreadPoolExecutor`'s
/// core/max distinction without keeping idle threads around for the
/// common single-session case.
pub struct SttExecutor {
    sender: Sender<Job>,
    receiver: crossbeam_channel::Receiver<Job>,
    spawned: AtomicUsize,
}

impl SttExecutor {
    pub fn new() -> Self {
        let (sender, receiver) = bounded::<Job>(QUEUE_CAPACITY);
        for index in 0..CORE_THREADS {
            spawn_worker(index, receiver.clone());
        }
        Self {
            sender,
            receiver,
            spawned: AtomicUsize::new(CORE_THREADS),
        }
    }

    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<(), SttError> {
        if !self.receiver.is_empty() {
            let spawned = self.spawned.load(Ordering::SeqCst);
            if spawned < MAX_THREADS
                && self
                    .spawned
                    .compare_exchange(spawned, spawned + 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                spawn_worker(spawned, self.receiver.clone());
            }
        }
        self.sender
            .try_send(Box::new(job))
            .map_err(|_| SttError::ConcurrencyLimit)
    }
}

fn spawn_worker(index: usize, receiver: crossbeam_channel::Receiver<Job>) {
    std::thread::Builder::new()
        .name(format!("stt-{index}"))
        .spawn(move || {
            for job in receiver.iter() {
                job();
            }
        })
        .expect("spawn stt worker thread");
}

impl Default for SttExecutor {
    fn default() -> Self {
        Self::new()
    }
}

enum Slot {
    Primary,
    Secondary,
}

/// Runs both engines concurrently against the same PCM and blocks up to
/// `deadline`. The dispatcher never inspects the text it collects —
/// reconciliation is a separate concern.
pub fn transcribe_both(
    executor: &SttExecutor,
    primary: Option<Arc<dyn SttEngine>>,
    secondary: Option<Arc<dyn SttEngine>>,
    pcm: Arc<Vec<u8>>,
    deadline: Duration,
) -> Result<EnginePair, SttError> {
    let (tx, rx) = bounded::<(Slot, Option<EngineResult>)>(2);
    let mut submitted = 0usize;

    if let Some(engine) = primary {
        submitted += 1;
        let pcm = pcm.clone();
        let tx = tx.clone();
        executor.submit(move || {
            let started = Instant::now();
            let result = engine.transcribe(&pcm).ok().map(|mut r| {
                r.duration_ms = started.elapsed().as_millis() as u32;
                r
            });
            let _ = tx.send((Slot::Primary, result));
        })?;
    }

    if let Some(engine) = secondary {
        submitted += 1;
        let pcm = pcm.clone();
        let tx = tx.clone();
        executor.submit(move || {
            let started = Instant::now();
            let result = engine.transcribe(&pcm).ok().map(|mut r| {
                r.duration_ms = started.elapsed().as_millis() as u32;
                r
            });
            let _ = tx.send((Slot::Secondary, result));
        })?;
    }
    drop(tx);

    if submitted == 0 {
        return Err(SttError::Unavailable("no engines enabled".to_string()));
    }

    let mut pair = EnginePair::default();
    let deadline_at = Instant::now() + deadline;
    let mut received = 0usize;
    while received < submitted {
        let remaining = deadline_at.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match rx.recv_timeout(remaining) {
            Ok((Slot::Primary, result)) => {
                pair.primary = result;
                received += 1;
            }
            Ok((Slot::Secondary, result)) => {
                pair.secondary = result;
                received += 1;
            }
            Err(_) => break,
        }
    }

    if pair.primary.is_none() && pair.secondary.is_none() {
        if received == 0 && Instant::now() >= deadline_at {
            return Err(SttError::Timeout(deadline));
        }
        return Err(SttError::TranscriptionFailed("both engines failed".to_string()));
    }

    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EngineResult;
    use pushtalk_foundation::SttError as Err_;
    use std::thread;

    struct StubEngine {
        name: &'static str,
        delay: Duration,
        outcome: Result<&'static str, ()>,
        failure_events: pushtalk_foundation::events::Publisher<crate::events::EngineFailureEvent>,
    }

    impl SttEngine for StubEngine {
        fn name(&self) -> &str {
            self.name
        }
        fn initialize(&self) -> Result<(), Err_> {
            Ok(())
        }
        fn close(&self) -> Result<(), Err_> {
            Ok(())
        }
        fn transcribe(&self, _pcm: &[u8]) -> Result<EngineResult, Err_> {
            thread::sleep(self.delay);
            match self.outcome {
                Ok(text) => Ok(EngineResult {
                    text: text.to_string(),
                    confidence: 1.0,
                    tokens: vec![],
                    duration_ms: 0,
                    engine_name: self.name.to_string(),
                    raw_json: None,
                }),
                Err(()) => Err(Err_::TranscriptionFailed("stub engine failed".to_string())),
            }
        }
        fn failure_events(&self) -> &pushtalk_foundation::events::Publisher<crate::events::EngineFailureEvent> {
            &self.failure_events
        }
    }

    #[test]
    fn both_succeed_populates_both_fields() {
        let executor = SttExecutor::new();
        let primary: Arc<dyn SttEngine> = Arc::new(StubEngine {
            name: "primary",
            delay: Duration::from_millis(1),
            outcome: Ok("hello"),
            failure_events: Default::default(),
        });
        let secondary: Arc<dyn SttEngine> = Arc::new(StubEngine {
            name: "secondary",
            delay: Duration::from_millis(1),
            outcome: Ok("hola"),
            failure_events: Default::default(),
        });
        let pair = transcribe_both(
            &executor,
            Some(primary),
            Some(secondary),
            Arc::new(vec![0u8; 10]),
            Duration::from_secs(2),
        )
        .unwrap();
        assert_eq!(pair.primary.unwrap().text, "hello");
        assert_eq!(pair.secondary.unwrap().text, "hola");
    }

    #[test]
    fn one_failing_engine_leaves_the_other_populated() {
        let executor = SttExecutor::new();
        let primary: Arc<dyn SttEngine> = Arc::new(StubEngine {
            name: "primary",
            delay: Duration::from_millis(1),
            outcome: Err(()),
            failure_events: Default::default(),
        });
        let secondary: Arc<dyn SttEngine> = Arc::new(StubEngine {
            name: "secondary",
            delay: Duration::from_millis(1),
            outcome: Ok("hola"),
            failure_events: Default::default(),
        });
        let pair = transcribe_both(
            &executor,
            Some(primary),
            Some(secondary),
            Arc::new(vec![0u8; 10]),
            Duration::from_secs(2),
        )
        .unwrap();
        assert!(pair.primary.is_none());
        assert_eq!(pair.secondary.unwrap().text, "hola");
    }

    #[test]
    fn both_failing_is_transcription_failed() {
        let executor = SttExecutor::new();
        let primary: Arc<dyn SttEngine> = Arc::new(StubEngine {
            name: "primary",
            delay: Duration::from_millis(1),
            outcome: Err(()),
            failure_events: Default::default(),
        });
        let secondary: Arc<dyn SttEngine> = Arc::new(StubEngine {
            name: "secondary",
            delay: Duration::from_millis(1),
            outcome: Err(()),
            failure_events: Default::default(),
        });
        let result = transcribe_both(
            &executor,
            Some(primary),
            Some(secondary),
            Arc::new(vec![0u8; 10]),
            Duration::from_secs(2),
        );
        assert!(matches!(result, Err(Err_::TranscriptionFailed(_))));
    }

    #[test]
    fn deadline_elapsing_with_no_results_is_a_timeout() {
        let executor = SttExecutor::new();
        let primary: Arc<dyn SttEngine> = Arc::new(StubEngine {
            name: "primary",
            delay: Duration::from_millis(200),
            outcome: Ok("too late"),
            failure_events: Default::default(),
        });
        let result = transcribe_both(
            &executor,
            Some(primary),
            None,
            Arc::new(vec![0u8; 10]),
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(Err_::Timeout(_))));
    }
}
