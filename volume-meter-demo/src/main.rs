mod meter_display;

use std::sync::Arc;
use std::time::Duration;

use volume_meter_core::{
    CaptureSource, DetectorConfig, MeterError, PumpedDelivery, ReplaySource, SharedDetectorConfig,
    VolumeBroadcaster,
};

use meter_display::{swelling_tone, MeterDisplay};

const SAMPLE_RATE: f32 = 48000.0;
const FRAME_LENGTH: usize = 1024;

/// Usage: `volume-meter-demo [config.json]`
fn main() -> Result<(), MeterError> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path).map_err(|e| {
                MeterError::ConfigurationFailed(format!("failed to read {}: {}", path, e))
            })?;
            DetectorConfig::from_json(&json)?
        }
        None => DetectorConfig::default(),
    };
    log::info!("metering with floor {} dB", config.minimum_decibels);

    // Notifications are marshalled onto this thread via pump().
    let delivery = Arc::new(PumpedDelivery::new());
    let broadcaster = Arc::new(VolumeBroadcaster::with_delivery(
        Arc::new(SharedDetectorConfig::new(config)?),
        delivery.clone(),
    ));

    let display = MeterDisplay::new();
    let _subscription = broadcaster.subscribe(display.clone());

    let frame_period = Duration::from_secs_f32(FRAME_LENGTH as f32 / SAMPLE_RATE);
    let signal = swelling_tone(SAMPLE_RATE, 2.0);
    let mut source = ReplaySource::from_signal(&signal, FRAME_LENGTH, frame_period)?;
    source.start(broadcaster.clone())?;

    while !display.is_finished() {
        delivery.pump_timeout(Duration::from_millis(100));
    }
    source.stop()?;

    let diagnostics = broadcaster.diagnostics();
    log::info!(
        "buffers: {} received, {} emitted, {} empty; {} volume events shed",
        diagnostics.buffers_received,
        diagnostics.snapshots_emitted,
        diagnostics.empty_buffers_dropped,
        delivery.dropped_jobs()
    );
    Ok(())
}
