//! End-to-end usage of the affect feature pipeline
//!
//! Runs batch extraction over a simulated recording, computes the physical
//! stillness index of its accelerometer, then drives the online window
//! stream for a few accelerated windows.

use affect_core::{Channel, FeatureLabel};
use affect_processing::{
    stillness_index_vector, ExtractionConfig, StillnessMode, WindowAssembler,
};
use affect_simulation::{
    start_window_stream, ArousalPattern, StreamCommand, StreamConfig, WearableConfig,
    WearableSimulator, WindowOutcome,
};
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    batch_example()?;
    stillness_example()?;
    live_example().await?;

    info!("all examples completed");
    Ok(())
}

/// Example 1: labelled batch windows over a 60 s stress-onset recording
fn batch_example() -> anyhow::Result<()> {
    let pattern = ArousalPattern::Ramp {
        start_level: 0.1,
        end_level: 0.9,
        duration: 60.0,
    };
    let mut simulator = WearableSimulator::new(WearableConfig {
        pattern,
        seed: Some(2024),
        ..Default::default()
    })?;
    let recording = simulator.recording(60.0)?;

    // Baseline for the first half, stress afterwards
    let labels: Vec<FeatureLabel> = (0..60)
        .map(|second| FeatureLabel::Binary(second >= 30))
        .collect();

    let mut assembler = WindowAssembler::new(ExtractionConfig::wesad())?;
    let vectors = assembler.batch_labeled(&recording, &labels)?;

    info!(
        windows = vectors.len(),
        features = assembler.vector_len(),
        "batch extraction finished"
    );
    for vector in vectors.iter().step_by(4) {
        let eda_mean = vector.values()[assembler.vector_len() - 21];
        info!(
            start_second = ?vector.start_second(),
            label = ?vector.label(),
            eda_mean,
            "window"
        );
    }

    let json = ExtractionConfig::wesad().to_json()?;
    info!(bytes = json.len(), "configuration exported");
    Ok(())
}

/// Example 2: stillness of a calm and an agitated wearer
fn stillness_example() -> anyhow::Result<()> {
    for (name, level) in [("calm", 0.0), ("agitated", 1.0)] {
        let mut simulator = WearableSimulator::new(WearableConfig {
            pattern: ArousalPattern::Constant { level },
            seed: Some(7),
            ..Default::default()
        })?;
        let recording = simulator.recording(10.0)?;

        let axes = [
            recording.readings(Channel::AccX).to_vec(),
            recording.readings(Channel::AccY).to_vec(),
            recording.readings(Channel::AccZ).to_vec(),
        ];
        let index = stillness_index_vector(&axes, 8, StillnessMode::Corrected)?;
        info!(wearer = name, average = index.average, max = index.max, "stillness index");
    }
    Ok(())
}

/// Example 3: online windows, five simulated seconds every half second
async fn live_example() -> anyhow::Result<()> {
    let config = StreamConfig {
        window_period: Some(0.5),
        simulator: Some(WearableConfig {
            seed: Some(99),
            ..Default::default()
        }),
        feed_period: 0.05,
        feed_chunk: 0.5,
        ..Default::default()
    };

    let (mut outcomes, control, _session) = start_window_stream(config).await?;
    control.send(StreamCommand::Start).await?;
    control
        .send(StreamCommand::SetPattern(ArousalPattern::Stressor {
            on_duration: 10.0,
            off_duration: 5.0,
            level: 0.85,
        }))
        .await?;

    for _ in 0..3 {
        match timeout(Duration::from_secs(5), outcomes.recv()).await?? {
            WindowOutcome::Features(vector) => {
                info!(features = vector.len(), session = ?vector.session_id(), "live window");
            }
            WindowOutcome::Failed { message, .. } => warn!(%message, "live window skipped"),
        }
    }

    control.send(StreamCommand::Shutdown).await?;
    Ok(())
}
