//! Audio data model (spec §3 "Audio frame", "VAD window").

/// Canonical outbound transport unit: 320 samples / 640 bytes / 20ms at 16kHz.
pub const FRAME_BYTES: usize = 640;

/// One VAD decision unit: 512 samples.
pub const WINDOW_SAMPLES: usize = 512;

/// A contiguous block of signed 16-bit little-endian PCM, mono, 16kHz.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
}

impl AudioFrame {
    #[must_use]
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        Self { samples }
    }

    #[must_use]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.samples.len() * 2);
        for s in &self.samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }
}

/// Exactly 512 samples, plus a normalized float view in `[-1, 1]` — one VAD
/// decision.
#[derive(Debug, Clone)]
pub struct VadWindow {
    pub samples: [i16; WINDOW_SAMPLES],
}

impl VadWindow {
    /// Build a window from a slice; panics if `slice.len() != WINDOW_SAMPLES`
    /// (callers only ever construct these from a rolling buffer that has
    /// already checked length, per spec §4.3).
    #[must_use]
    pub fn from_slice(slice: &[i16]) -> Self {
        assert_eq!(slice.len(), WINDOW_SAMPLES, "VAD window must be exactly 512 samples");
        let mut samples = [0i16; WINDOW_SAMPLES];
        samples.copy_from_slice(slice);
        Self { samples }
    }

    /// Normalized `[-1, 1]` float view, used by neural VAD models.
    #[must_use]
    pub fn as_normalized_f32(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| f32::from(s) / f32::from(i16::MAX)).collect()
    }

    #[must_use]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(WINDOW_SAMPLES * 2);
        for s in &self.samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }
}

/// Rolling buffer that accumulates raw samples and yields fixed-size
/// windows, per spec §4.3 "keeps two rolling buffers (raw int16 and
/// normalized float32) ... whenever >= 512 samples are available extracts
/// the next window."
#[derive(Debug, Default)]
pub struct WindowAccumulator {
    pending: Vec<i16>,
}

impl WindowAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, frame: &AudioFrame) {
        self.pending.extend_from_slice(&frame.samples);
    }

    /// Drain as many complete 512-sample windows as are currently available.
    pub fn drain_windows(&mut self) -> Vec<VadWindow> {
        let mut windows = Vec::new();
        while self.pending.len() >= WINDOW_SAMPLES {
            let window = VadWindow::from_slice(&self.pending[..WINDOW_SAMPLES]);
            self.pending.drain(..WINDOW_SAMPLES);
            windows.push(window);
        }
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_le_bytes() {
        let frame = AudioFrame {
            samples: vec![1, -1, 1000, -1000],
        };
        let bytes = frame.to_le_bytes();
        let back = AudioFrame::from_le_bytes(&bytes);
        assert_eq!(back.samples, frame.samples);
    }

    #[test]
    fn window_accumulator_yields_one_window_at_exactly_512() {
        let mut acc = WindowAccumulator::new();
        let frame = AudioFrame {
            samples: vec![0i16; WINDOW_SAMPLES],
        };
        acc.push_frame(&frame);
        let windows = acc.drain_windows();
        assert_eq!(windows.len(), 1);
        assert!(acc.drain_windows().is_empty());
    }

    #[test]
    fn window_accumulator_holds_partial_remainder() {
        let mut acc = WindowAccumulator::new();
        acc.push_frame(&AudioFrame {
            samples: vec![0i16; WINDOW_SAMPLES + 100],
        });
        let windows = acc.drain_windows();
        assert_eq!(windows.len(), 1);
        acc.push_frame(&AudioFrame {
            samples: vec![0i16; WINDOW_SAMPLES - 100],
        });
        let windows = acc.drain_windows();
        assert_eq!(windows.len(), 1);
    }

    #[test]
    fn normalized_view_is_in_range() {
        let window = VadWindow::from_slice(&[i16::MAX; WINDOW_SAMPLES]);
        let normalized = window.as_normalized_f32();
        assert!((normalized[0] - 1.0).abs() < 0.001);
    }
}
