//! Effects Engine - Main Entry Point
//!
//! The Engine owns the processing thread and the channels around it.
//! Encoded batches go in, processed batches come out in the same order.
//!
//! # Architecture
//!
//! ```text
//!  submit(bytes) ──bounded──▶ stomp-audio thread ──unbounded──▶ output()
//!                                   │  ProcessorChain
//!                                   ▼
//!  controls().execute(cmd) ──▶ shared effect state ──▶ events (poll_event)
//! ```
//!
//! Control commands never queue behind audio. They act on the shared
//! parameters directly, and the next sample processed sees the change.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, warn};

use stomp_dsp::ProcessorChain;

use crate::config::EngineConfig;
use crate::controls::{build_chain, Controls};
use crate::error::{EngineError, EngineResult};
use crate::message::Event;

/// Messages for the processing thread
enum Message {
    /// One encoded batch of little-endian 16-bit samples
    Batch(Vec<u8>),

    /// Finish queued batches, then exit
    Shutdown,
}

/// The main effects engine
///
/// Lives on the caller's thread and feeds the processing thread through
/// channels.
pub struct Engine {
    /// Channel for sending batches to the processing thread
    input_sender: Sender<Message>,

    /// Processed batches, in submission order
    output_receiver: Receiver<Vec<u8>>,

    /// Channel for receiving events from controls and the processing thread
    event_receiver: Receiver<Event>,

    /// Handle to the processing thread
    audio_thread: Option<JoinHandle<()>>,

    /// Flag to signal shutdown
    shutdown_flag: Arc<AtomicBool>,

    /// Whether the processing thread is alive
    is_running: Arc<AtomicBool>,

    /// Batches processed so far
    processed: Arc<AtomicU64>,

    controls: Controls,

    config: EngineConfig,
}

impl Engine {
    /// Create an engine with the default chain
    pub fn new() -> EngineResult<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with a custom configuration
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        let (input_sender, input_receiver) = bounded::<Message>(config.channel_capacity);
        let (output_sender, output_receiver) = unbounded::<Vec<u8>>();
        let (event_sender, event_receiver) = unbounded::<Event>();

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let is_running = Arc::new(AtomicBool::new(true));
        let processed = Arc::new(AtomicU64::new(0));

        let (chain, controls) =
            build_chain(&config, event_sender.clone(), Arc::clone(&is_running))?;
        info!("Chain: {}", chain.names().join(" -> "));

        let shutdown_clone = Arc::clone(&shutdown_flag);
        let running_clone = Arc::clone(&is_running);
        let processed_clone = Arc::clone(&processed);

        let audio_thread = thread::Builder::new()
            .name("stomp-audio".into())
            .spawn(move || {
                Self::audio_thread_main(
                    chain,
                    input_receiver,
                    output_sender,
                    event_sender,
                    shutdown_clone,
                    processed_clone,
                );
                running_clone.store(false, Ordering::SeqCst);
            })
            .map_err(|e| EngineError::ThreadSpawn(e.to_string()))?;

        Ok(Self {
            input_sender,
            output_receiver,
            event_receiver,
            audio_thread: Some(audio_thread),
            shutdown_flag,
            is_running,
            processed,
            controls,
            config,
        })
    }

    /// Queue an encoded batch, blocking while the input channel is full
    pub fn submit(&self, bytes: Vec<u8>) -> EngineResult<()> {
        if !self.is_running() {
            return Err(EngineError::NotRunning);
        }
        self.input_sender
            .send(Message::Batch(bytes))
            .map_err(|_| EngineError::ChannelSendError)
    }

    /// Receiver of processed batches
    pub fn output(&self) -> &Receiver<Vec<u8>> {
        &self.output_receiver
    }

    /// Wait for the next processed batch
    pub fn recv_output(&self, timeout: Duration) -> EngineResult<Option<Vec<u8>>> {
        match self.output_receiver.recv_timeout(timeout) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::ChannelRecvError),
        }
    }

    /// Receiver of events from controls and the processing thread
    pub fn events(&self) -> &Receiver<Event> {
        &self.event_receiver
    }

    /// Poll for events (non-blocking)
    pub fn poll_event(&self) -> Option<Event> {
        self.event_receiver.try_recv().ok()
    }

    /// Wait for an event with a timeout
    pub fn wait_event(&self, timeout: Duration) -> Option<Event> {
        self.event_receiver.recv_timeout(timeout).ok()
    }

    /// Handle for effect controls; cheap to clone onto other threads
    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Number of batches the processing thread has handled
    pub fn processed_batches(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    /// Get current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process every queued batch, then stop the processing thread.
    ///
    /// Output already produced stays readable from [`Engine::output`].
    pub fn shutdown(&mut self) -> EngineResult<()> {
        let Some(handle) = self.audio_thread.take() else {
            return Err(EngineError::NotRunning);
        };
        let _ = self.input_sender.send(Message::Shutdown);
        handle.join().map_err(|_| EngineError::ThreadPanicked)
    }

    /// Processing thread main loop
    fn audio_thread_main(
        mut chain: ProcessorChain,
        input_receiver: Receiver<Message>,
        output_sender: Sender<Vec<u8>>,
        event_sender: Sender<Event>,
        shutdown_flag: Arc<AtomicBool>,
        processed: Arc<AtomicU64>,
    ) {
        info!("Processing thread started");
        let _ = event_sender.send(Event::Started);

        while !shutdown_flag.load(Ordering::SeqCst) {
            match input_receiver.recv_timeout(Duration::from_millis(16)) {
                Ok(Message::Batch(bytes)) => {
                    match chain.process_encoded(&bytes) {
                        Ok(output) => {
                            if output_sender.send(output).is_err() {
                                debug!("Output receiver dropped");
                            }
                        }
                        Err(e) => {
                            // Undecodable input is skipped before any effect runs.
                            // A failure inside the chain leaves earlier effects advanced.
                            warn!("Skipping batch of {} bytes: {}", bytes.len(), e);
                            let _ = event_sender.send(Event::error(e));
                        }
                    }
                    processed.fetch_add(1, Ordering::SeqCst);
                }
                Ok(Message::Shutdown) => {
                    info!("Shutdown requested");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    error!("Input channel disconnected");
                    break;
                }
            }
        }

        let _ = event_sender.send(Event::Stopped);
        info!(
            "Processing thread stopped after {} batches",
            processed.load(Ordering::SeqCst)
        );
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Signal shutdown
        self.shutdown_flag.store(true, Ordering::SeqCst);

        let _ = self.input_sender.send(Message::Shutdown);

        if let Some(handle) = self.audio_thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EffectKind;
    use crate::message::{Command, Step};
    use stomp_dsp::{decode, encode};

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn test_engine_creation() {
        let engine = Engine::new();
        assert!(engine.is_ok());
    }

    #[test]
    fn test_engine_shutdown() {
        let engine = Engine::new().unwrap();
        drop(engine); // Should shutdown cleanly
    }

    #[test]
    fn test_invalid_config() {
        let config = EngineConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            Engine::with_config(config),
            Err(EngineError::ConfigError(_))
        ));
    }

    #[test]
    fn test_started_event() {
        let engine = Engine::new().unwrap();
        assert_eq!(engine.wait_event(TIMEOUT), Some(Event::Started));
    }

    #[test]
    fn test_empty_chain_passes_through() {
        let engine = Engine::with_config(EngineConfig {
            chain: vec![],
            ..Default::default()
        })
        .unwrap();
        let input = encode(&[1, -2, 300, i16::MIN]);
        engine.submit(input.clone()).unwrap();
        assert_eq!(engine.recv_output(TIMEOUT).unwrap(), Some(input));
    }

    #[test]
    fn test_batches_keep_order() {
        let mut engine = Engine::with_config(EngineConfig::single(EffectKind::Distortion)).unwrap();
        for i in 0..10i16 {
            engine.submit(encode(&[i, i + 1])).unwrap();
        }
        engine.shutdown().unwrap();
        assert!(!engine.is_running());
        assert_eq!(engine.processed_batches(), 10);

        // Unity amplification with no clip is a passthrough
        let outputs: Vec<Vec<i16>> = engine
            .output()
            .try_iter()
            .map(|bytes| decode(&bytes).unwrap())
            .collect();
        assert_eq!(outputs.len(), 10);
        for (i, batch) in outputs.iter().enumerate() {
            assert_eq!(batch, &vec![i as i16, i as i16 + 1]);
        }
    }

    #[test]
    fn test_odd_batch_is_skipped() {
        let mut engine = Engine::with_config(EngineConfig::single(EffectKind::Loop)).unwrap();
        engine.submit(vec![1, 2, 3]).unwrap();
        engine.submit(encode(&[5])).unwrap();
        engine.shutdown().unwrap();

        let outputs: Vec<Vec<u8>> = engine.output().try_iter().collect();
        assert_eq!(outputs.len(), 1);

        let events: Vec<Event> = std::iter::from_fn(|| engine.poll_event()).collect();
        assert!(events.iter().any(|e| matches!(e, Event::Error { .. })));
        assert_eq!(events.last(), Some(&Event::Stopped));
    }

    #[test]
    fn test_events_drain_through_receiver() {
        let mut engine = Engine::with_config(EngineConfig::single(EffectKind::Loop)).unwrap();
        let events = engine.events().clone();
        engine.controls().execute(Command::Loop).unwrap();
        engine.shutdown().unwrap();

        let drained: Vec<Event> = events.try_iter().collect();
        assert!(drained.contains(&Event::Started));
        assert!(drained.contains(&Event::LoopStateChanged {
            state: "Recording first loop".into()
        }));
        assert_eq!(drained.last(), Some(&Event::Stopped));
        // Nothing left queued for later readers
        assert_eq!(engine.poll_event(), None);
    }

    #[test]
    fn test_submit_after_shutdown() {
        let mut engine = Engine::new().unwrap();
        engine.shutdown().unwrap();
        assert!(matches!(
            engine.submit(encode(&[1])),
            Err(EngineError::NotRunning)
        ));
        assert!(matches!(engine.shutdown(), Err(EngineError::NotRunning)));
    }

    #[test]
    fn test_controls_from_another_thread() {
        let engine = Engine::with_config(EngineConfig::single(EffectKind::Reverb)).unwrap();
        let controls = engine.controls().clone();
        thread::spawn(move || controls.execute(Command::StepDecay(Step::Down)))
            .join()
            .unwrap()
            .unwrap();

        let mut decay = None;
        while let Some(event) = engine.wait_event(TIMEOUT) {
            if let Event::DecayChanged { decay: d } = event {
                decay = Some(d);
                break;
            }
        }
        assert!((decay.unwrap() - 0.89).abs() < 1e-9);
    }

    #[test]
    fn test_request_state() {
        let engine = Engine::new().unwrap();
        match engine.controls().execute(Command::RequestState).unwrap() {
            Event::StateUpdate {
                is_running, effects, ..
            } => {
                assert!(is_running);
                assert_eq!(effects.len(), 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
