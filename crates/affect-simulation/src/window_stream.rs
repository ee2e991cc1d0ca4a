//! Online window driver
//!
//! A periodic window-ready timer grabs and clears a live session and hands
//! the snapshot to an extraction thread. Samples pushed by a collector (or the
//! built-in simulator feed) and the grab share one lock, so a sample lands in
//! exactly one window.

use crate::signal_patterns::ArousalPattern;
use crate::wearable_simulator::{WearableConfig, WearableSimulator};
use affect_core::{
    config_error, AffectResult, FeatureVector, SessionBuffers, WindowSnapshot,
};
use affect_processing::{ExtractionConfig, WindowAssembler};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::{interval, interval_at, Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Live session shared between a collector and the window driver
pub type SharedSession = Arc<Mutex<SessionBuffers>>;

/// Fresh, empty shared session
pub fn shared_session() -> SharedSession {
    Arc::new(Mutex::new(SessionBuffers::new()))
}

/// Take every buffer of a shared session under its lock
pub async fn grab_window(session: &SharedSession) -> WindowSnapshot {
    session.lock().await.grab_window()
}

/// Configuration for the online driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub extraction: ExtractionConfig,
    /// Wall-clock seconds between window-ready signals, `None` for the window size
    pub window_period: Option<f64>,
    /// Simulated data fed into the session, `None` when an external collector pushes samples
    pub simulator: Option<WearableConfig>,
    /// Wall-clock seconds between simulator feeds
    pub feed_period: f64,
    /// Seconds of signal generated per feed
    pub feed_chunk: f64,
    /// Outcomes buffered per subscriber
    pub buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            window_period: None,
            simulator: Some(WearableConfig::default()),
            feed_period: 0.25,
            feed_chunk: 0.25,
            buffer_size: 16,
        }
    }
}

/// Shortest timer period accepted, in seconds
pub const MIN_PERIOD: f64 = 0.001;
/// Longest timer period accepted, in seconds (one day)
pub const MAX_PERIOD: f64 = 86_400.0;

/// Timer period within `[MIN_PERIOD, MAX_PERIOD]`; `Duration` panics outside it
fn period_duration(seconds: f64) -> Duration {
    let seconds = if seconds.is_nan() {
        MAX_PERIOD
    } else {
        seconds.clamp(MIN_PERIOD, MAX_PERIOD)
    };
    Duration::from_secs_f64(seconds)
}

impl StreamConfig {
    fn window_seconds(&self) -> f64 {
        self.window_period
            .unwrap_or(self.extraction.window_size as f64)
    }

    /// Effective window-ready period
    pub fn window_period(&self) -> Duration {
        period_duration(self.window_seconds())
    }

    pub fn feed_period(&self) -> Duration {
        period_duration(self.feed_period)
    }

    pub fn validate(&self) -> AffectResult<()> {
        self.extraction.validate()?;

        let in_range = |seconds: f64| (MIN_PERIOD..=MAX_PERIOD).contains(&seconds);
        if !in_range(self.window_seconds()) {
            return Err(config_error!(
                "window period must be between {} and {} s, got {}",
                MIN_PERIOD,
                MAX_PERIOD,
                self.window_seconds()
            ));
        }
        if !in_range(self.feed_period) {
            return Err(config_error!(
                "feed period must be between {} and {} s, got {}",
                MIN_PERIOD,
                MAX_PERIOD,
                self.feed_period
            ));
        }
        if !(self.feed_chunk > 0.0 && self.feed_chunk.is_finite()) {
            return Err(config_error!("feed chunk must be positive, got {}", self.feed_chunk));
        }
        if self.buffer_size == 0 {
            return Err(config_error!("stream buffer size must be at least 1"));
        }
        Ok(())
    }
}

/// Result of one online window
#[derive(Debug, Clone)]
pub enum WindowOutcome {
    Features(FeatureVector),
    /// The window could not be computed; the caller may skip it
    Failed { session_id: Uuid, message: String },
}

/// Commands for controlling the stream
#[derive(Debug, Clone)]
pub enum StreamCommand {
    Start,
    /// Stop windowing, drop buffered samples and restart the simulated clock
    Stop,
    Pause,
    Resume,
    SetPattern(ArousalPattern),
    /// End the driver task
    Shutdown,
}

/// Stream statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamStats {
    pub is_running: bool,
    pub windows_grabbed: u64,
    /// Seconds of signal produced by the simulator feed
    pub simulated_seconds: f64,
}

/// Timer-driven window extraction over a live session
pub struct LiveWindowStream {
    config: StreamConfig,
    session: SharedSession,
    simulator: Option<WearableSimulator>,
    outcome_sender: broadcast::Sender<WindowOutcome>,
    control_receiver: mpsc::Receiver<StreamCommand>,
    control_sender: mpsc::Sender<StreamCommand>,
    stats: StreamStats,
}

impl LiveWindowStream {
    pub fn new(config: StreamConfig, session: SharedSession) -> AffectResult<Self> {
        config.validate()?;

        let simulator = match &config.simulator {
            Some(sim_config) => Some(WearableSimulator::new(sim_config.clone())?),
            None => None,
        };
        let (outcome_sender, _) = broadcast::channel(config.buffer_size);
        let (control_sender, control_receiver) = mpsc::channel(32);

        Ok(LiveWindowStream {
            config,
            session,
            simulator,
            outcome_sender,
            control_receiver,
            control_sender,
            stats: StreamStats::default(),
        })
    }

    /// Get a receiver for window outcomes
    pub fn subscribe(&self) -> broadcast::Receiver<WindowOutcome> {
        self.outcome_sender.subscribe()
    }

    /// Get control sender for sending commands
    pub fn control_handle(&self) -> mpsc::Sender<StreamCommand> {
        self.control_sender.clone()
    }

    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Drive the stream until a `Shutdown` command arrives
    pub async fn run(&mut self) -> AffectResult<()> {
        let window_period = self.config.window_period();
        let mut window_timer = interval_at(Instant::now() + window_period, window_period);
        let mut feed_timer = interval(self.config.feed_period());

        let (snapshot_sender, snapshot_receiver) = mpsc::channel(self.config.buffer_size);
        spawn_extraction_worker(
            self.config.extraction.clone(),
            snapshot_receiver,
            self.outcome_sender.clone(),
        );

        info!(
            window_period_ms = window_period.as_millis() as u64,
            simulated = self.simulator.is_some(),
            "window stream ready"
        );

        loop {
            tokio::select! {
                _ = feed_timer.tick(), if self.simulator.is_some() => {
                    if self.stats.is_running {
                        self.feed().await?;
                    }
                }

                _ = window_timer.tick() => {
                    if self.stats.is_running {
                        let snapshot = grab_window(&self.session).await;
                        self.stats.windows_grabbed += 1;
                        if snapshot_sender.send(snapshot).await.is_err() {
                            warn!("extraction worker stopped, ending window stream");
                            break;
                        }
                    }
                }

                command = self.control_receiver.recv() => {
                    match command {
                        Some(StreamCommand::Start) => {
                            self.stats.is_running = true;
                            info!("window stream started");
                        }
                        Some(StreamCommand::Stop) => {
                            self.stats.is_running = false;
                            self.stats.windows_grabbed = 0;
                            self.stats.simulated_seconds = 0.0;
                            self.session.lock().await.clear();
                            if let Some(sim) = self.simulator.as_mut() {
                                sim.reset_time();
                            }
                            info!("window stream stopped");
                        }
                        Some(StreamCommand::Pause) => {
                            self.stats.is_running = false;
                            info!("window stream paused");
                        }
                        Some(StreamCommand::Resume) => {
                            self.stats.is_running = true;
                            info!("window stream resumed");
                        }
                        Some(StreamCommand::SetPattern(pattern)) => {
                            if let Some(sim) = self.simulator.as_mut() {
                                sim.set_pattern(pattern);
                            }
                            info!(pattern = pattern.description(), "arousal pattern updated");
                        }
                        Some(StreamCommand::Shutdown) | None => {
                            info!("window stream shut down");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn feed(&mut self) -> AffectResult<()> {
        if let Some(sim) = self.simulator.as_mut() {
            let mut session = self.session.lock().await;
            sim.fill(&mut session, self.config.feed_chunk)?;
            self.stats.simulated_seconds += self.config.feed_chunk;
        }
        Ok(())
    }
}

/// Run feature extraction for grabbed windows on a dedicated thread
///
/// The assembler keeps FFT plans and detrending matrices between windows and
/// lives on this thread for its whole lifetime.
fn spawn_extraction_worker(
    config: ExtractionConfig,
    mut snapshots: mpsc::Receiver<WindowSnapshot>,
    outcomes: broadcast::Sender<WindowOutcome>,
) {
    std::thread::spawn(move || {
        let mut assembler = match WindowAssembler::new(config) {
            Ok(assembler) => assembler,
            Err(e) => {
                warn!(error = %e, "could not build window assembler");
                return;
            }
        };

        while let Some(snapshot) = snapshots.blocking_recv() {
            let outcome = match assembler.assemble(&snapshot) {
                Ok(vector) => {
                    debug!(session = %snapshot.session_id, "window features ready");
                    WindowOutcome::Features(vector)
                }
                Err(e) => {
                    warn!(session = %snapshot.session_id, error = %e, "window feature extraction failed");
                    WindowOutcome::Failed {
                        session_id: snapshot.session_id,
                        message: e.to_string(),
                    }
                }
            };

            // No subscribers is not an error
            let _ = outcomes.send(outcome);
        }
    });
}

/// Helper function to create and start a stream in the background
pub async fn start_window_stream(
    config: StreamConfig,
) -> AffectResult<(
    broadcast::Receiver<WindowOutcome>,
    mpsc::Sender<StreamCommand>,
    SharedSession,
)> {
    let mut stream = LiveWindowStream::new(config, shared_session())?;
    let outcome_receiver = stream.subscribe();
    let control_sender = stream.control_handle();
    let session = stream.session();

    tokio::spawn(async move {
        if let Err(e) = stream.run().await {
            warn!(error = %e, "window stream error");
        }
    });

    Ok((outcome_receiver, control_sender, session))
}
