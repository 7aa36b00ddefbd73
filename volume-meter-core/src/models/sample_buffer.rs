use super::error::MeterError;

/// A borrowed view over one channel of captured audio.
///
/// The capture source owns the memory; the view is only valid for the
/// duration of the callback that delivers it. `frame_length` samples are
/// read starting at index 0 and advancing `stride` samples per frame, so an
/// interleaved block can be metered without copying.
#[derive(Debug, Clone, Copy)]
pub struct SampleBuffer<'a> {
    samples: &'a [f32],
    frame_length: usize,
    stride: usize,
}

impl<'a> SampleBuffer<'a> {
    /// Create a view with an explicit layout.
    ///
    /// Fails if `stride` is zero or if `samples` is too short to hold
    /// `frame_length` frames at that stride.
    pub fn new(samples: &'a [f32], frame_length: usize, stride: usize) -> Result<Self, MeterError> {
        if stride == 0 {
            return Err(MeterError::InvalidLayout("stride must be at least 1".into()));
        }
        if frame_length > 0 {
            let last_index = (frame_length - 1)
                .checked_mul(stride)
                .ok_or_else(|| MeterError::InvalidLayout("frame layout overflows".into()))?;
            if last_index >= samples.len() {
                return Err(MeterError::InvalidLayout(format!(
                    "{} frames at stride {} need {} samples, got {}",
                    frame_length,
                    stride,
                    last_index + 1,
                    samples.len()
                )));
            }
        }
        Ok(Self {
            samples,
            frame_length,
            stride,
        })
    }

    /// A mono buffer using every sample.
    pub fn contiguous(samples: &'a [f32]) -> Self {
        Self {
            samples,
            frame_length: samples.len(),
            stride: 1,
        }
    }

    /// One channel out of an interleaved block `[c0, c1, .., c0, c1, ..]`.
    ///
    /// Trailing samples that don't form a whole frame are ignored.
    pub fn interleaved_channel(
        samples: &'a [f32],
        channels: usize,
        channel: usize,
    ) -> Result<Self, MeterError> {
        if channels == 0 {
            return Err(MeterError::InvalidLayout("channel count must be at least 1".into()));
        }
        if channel >= channels {
            return Err(MeterError::InvalidLayout(format!(
                "channel {} out of range for {} channels",
                channel, channels
            )));
        }
        let frame_length = samples.len() / channels;
        let offset = if frame_length == 0 { &samples[..0] } else { &samples[channel..] };
        Self::new(offset, frame_length, channels)
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.frame_length == 0
    }

    /// The `frame_length` samples this view covers, in order.
    pub fn frames(&self) -> impl Iterator<Item = f32> + 'a {
        self.samples
            .iter()
            .step_by(self.stride)
            .take(self.frame_length)
            .copied()
    }
}
