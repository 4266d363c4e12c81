//! Typed audio chunk handed out by the delay buffer's read path.

/// A contiguous block of mono PCM samples at a known sample rate.
///
/// Allocated on the non-RT side; the render callback uses the `_into`
/// read variants instead.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Mono f32 samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 16000, 44100, 48000).
    pub sample_rate: u32,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Returns the duration of this chunk in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Returns true if the chunk contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns true if every sample is exactly zero (an underrun window).
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn duration_follows_sample_rate() {
        let chunk = AudioChunk::new(vec![0.0; 24_000], 48_000);
        assert_relative_eq!(chunk.duration_secs(), 0.5);
    }

    #[test]
    fn silence_detection() {
        assert!(AudioChunk::new(vec![0.0; 16], 16_000).is_silent());
        assert!(!AudioChunk::new(vec![0.0, 0.1], 16_000).is_silent());
        assert!(AudioChunk::new(vec![], 16_000).is_empty());
    }
}
