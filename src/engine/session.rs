//! Session lifecycle: one capture worker thread and its mailbox.
//!
//! The engine holds at most one session. Restart is stop-then-start, never
//! overlapping: the previous worker is joined and its backend released
//! before a new stream is opened. Stopping is cooperative; the stop flag is
//! checked between blocking reads, so the worst-case stop latency is one
//! block's capture duration.

use crate::backend::{CaptureBackend, CaptureOptions, PulseCapture};
use crate::config::EngineConfig;
use crate::engine::detect::PeakDetector;
use crate::engine::mailbox::PeakMailbox;
use crate::error::VuError;
use crate::lock_or_recover;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use tracing::{debug, warn};

/// Peak metering engine with start/stop/restart lifecycle.
pub struct VuEngine {
    session: Option<Session>,
}

struct Session {
    channels: usize,
    mailbox: Arc<PeakMailbox>,
    stop: Arc<AtomicBool>,
    fault: Arc<Mutex<Option<VuError>>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl VuEngine {
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Start metering a PulseAudio source. An already-active session is
    /// stopped first. On error nothing of the new session survives.
    pub fn start(
        &mut self,
        options: &CaptureOptions,
        config: &EngineConfig,
    ) -> Result<(), VuError> {
        options.validate()?;
        let options = options.clone();
        let capture_config = config.clone();
        self.start_with_backend(config, move || {
            PulseCapture::open(&options, &capture_config)
                .map(|backend| Box::new(backend) as Box<dyn CaptureBackend>)
        })
    }

    /// Start a session over an arbitrary backend.
    ///
    /// The opener runs on the worker thread (PulseAudio handles are not
    /// `Send`), but open failures are still reported synchronously from
    /// this call.
    pub fn start_with_backend(
        &mut self,
        config: &EngineConfig,
        open: impl FnOnce() -> Result<Box<dyn CaptureBackend>, VuError> + Send + 'static,
    ) -> Result<(), VuError> {
        config.validate()?;
        self.stop();

        let channels = config.channels;
        let mailbox = Arc::new(PeakMailbox::new(channels));
        let stop = Arc::new(AtomicBool::new(false));
        let fault = Arc::new(Mutex::new(None));

        // All per-session buffers are allocated here and handed to the
        // worker; they die with it on join.
        let block = vec![0i32; config.samples_per_block()];
        let detector = PeakDetector::new(channels);
        let amplitudes = vec![0.0f32; channels];

        let (ready_tx, ready_rx) = mpsc::channel();
        let worker_mailbox = Arc::clone(&mailbox);
        let worker_stop = Arc::clone(&stop);
        let worker_fault = Arc::clone(&fault);

        let worker = thread::Builder::new()
            .name("vu-capture".into())
            .spawn(move || {
                let backend = match open() {
                    Ok(backend) => backend,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        worker_mailbox.close();
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                capture_loop(
                    backend,
                    block,
                    detector,
                    amplitudes,
                    &worker_mailbox,
                    &worker_stop,
                    &worker_fault,
                );
            })
            .map_err(|err| VuError::OutOfResources(err.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                debug!(
                    channels,
                    sample_rate = config.sample_rate,
                    block_size = config.block_size,
                    "capture session started"
                );
                self.session = Some(Session {
                    channels,
                    mailbox,
                    stop,
                    fault,
                    worker: Some(worker),
                });
                Ok(())
            }
            Ok(Err(err)) => {
                let _ = worker.join();
                Err(err)
            }
            Err(_) => {
                let _ = worker.join();
                Err(VuError::OutOfResources(
                    "capture worker exited before opening the stream".into(),
                ))
            }
        }
    }

    /// Stop the active session, if any. Idempotent. Blocks until the worker
    /// has exited; the bound is one blocking read, `block_size /
    /// sample_rate` seconds.
    pub fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.stop.store(true, Ordering::Relaxed);
        session.mailbox.close();
        if let Some(worker) = session.worker.take() {
            if worker.join().is_err() {
                warn!("capture worker panicked");
            }
        }
        debug!("capture session stopped");
    }

    /// Copy the latest unread amplitudes into `into`.
    ///
    /// Returns 0 when no session is active or nothing is unread, otherwise
    /// the session's channel count even when `into` is smaller. Safe to
    /// call on a redraw tick.
    pub fn query_peak(&self, into: &mut [f32]) -> usize {
        match &self.session {
            Some(session) => session.mailbox.try_take(into),
            None => 0,
        }
    }

    /// Block until the next update is published or the session ends.
    /// Returns immediately when no session is active.
    pub fn wait_for_update(&self) {
        if let Some(session) = &self.session {
            session.mailbox.wait_for_update();
        }
    }

    /// True when an unread update is waiting.
    pub fn peak_available(&self) -> bool {
        self.session
            .as_ref()
            .map_or(false, |session| session.mailbox.peak_available())
    }

    /// True while a session is running and its worker has not shut down.
    pub fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .map_or(false, |session| !session.mailbox.is_closed())
    }

    /// Channel count of the current session, 0 when none.
    pub fn channels(&self) -> usize {
        self.session.as_ref().map_or(0, |session| session.channels)
    }

    /// The read error that ended the session, if any.
    pub fn fault(&self) -> Option<VuError> {
        let session = self.session.as_ref()?;
        lock_or_recover(&session.fault, "session fault").clone()
    }
}

impl Default for VuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VuEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker body: read one block, detect, publish, until stopped or the read
/// fails. The blocking read runs outside every lock. Closes the mailbox on
/// all exit paths so no consumer is left waiting.
fn capture_loop(
    mut backend: Box<dyn CaptureBackend>,
    mut block: Vec<i32>,
    mut detector: PeakDetector,
    mut amplitudes: Vec<f32>,
    mailbox: &PeakMailbox,
    stop: &AtomicBool,
    fault: &Mutex<Option<VuError>>,
) {
    while !stop.load(Ordering::Relaxed) {
        if let Err(err) = backend.read_block(&mut block) {
            warn!("audio read failed, ending session: {err}");
            *lock_or_recover(fault, "session fault") = Some(err);
            break;
        }
        detector.detect(&block, &mut amplitudes);
        mailbox.publish(&amplitudes);
    }
    mailbox.close();
}
