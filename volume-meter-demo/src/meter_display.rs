use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use volume_meter_core::{VolumeObserver, VolumeSnapshot};

const BAR_WIDTH: usize = 40;

/// VolumeObserver that renders each reading as a text bar.
pub struct MeterDisplay {
    finished: AtomicBool,
}

impl MeterDisplay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            finished: AtomicBool::new(false),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl VolumeObserver for MeterDisplay {
    fn on_volume(&self, snapshot: &VolumeSnapshot) {
        let filled = (snapshot.level * BAR_WIDTH as f32).round() as usize;
        println!(
            "{} [{:<width$}] {:>7.2} dB  {:.3}",
            snapshot.timestamp.format("%H:%M:%S%.3f"),
            "#".repeat(filled.min(BAR_WIDTH)),
            snapshot.decibels,
            snapshot.level,
            width = BAR_WIDTH
        );
    }

    fn on_completed(&self) {
        log::info!("volume stream completed");
        self.finished.store(true, Ordering::SeqCst);
    }
}

/// A 440 Hz tone whose amplitude swells from silence to full scale and back.
pub fn swelling_tone(sample_rate: f32, seconds: f32) -> Vec<f32> {
    let total = (sample_rate * seconds) as usize;
    (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate;
            let envelope = (std::f32::consts::PI * i as f32 / total as f32).sin();
            envelope * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect()
}
