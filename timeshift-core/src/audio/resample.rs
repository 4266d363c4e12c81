//! Sample-rate conversion for the ingest path.
//!
//! Capture runs at whatever rate the device reports; the delay buffer runs
//! at one fixed configured rate. `RateConverter` bridges the two on the
//! non-RT ingest thread, where allocation is allowed. When the rates
//! already match it degrades to a passthrough and never touches rubato.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::error::{Result, TimeshiftError};

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when capture rate == buffer rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Pending input carried between calls until a full rubato chunk exists.
    pending: Vec<f32>,
    /// Input samples rubato consumes per process call.
    chunk_size: usize,
    /// Pre-allocated rubato output: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// # Errors
    /// `TimeshiftError::AudioDevice` if rubato rejects the ratio.
    pub fn new(capture_rate: u32, buffer_rate: u32, chunk_size: usize) -> Result<Self> {
        if capture_rate == buffer_rate {
            return Ok(Self {
                resampler: None,
                pending: Vec::new(),
                chunk_size,
                output_buf: Vec::new(),
            });
        }

        let ratio = f64::from(buffer_rate) / f64::from(capture_rate);
        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio, no dynamic adjustment
            PolynomialDegree::Cubic,
            chunk_size,
            1, // mono
        )
        .map_err(|e| TimeshiftError::AudioDevice(format!("resampler init: {e}")))?;

        let output_buf = vec![vec![0f32; resampler.output_frames_max()]; 1];

        tracing::info!(capture_rate, buffer_rate, chunk_size, "ingest resampling enabled");

        Ok(Self {
            resampler: Some(resampler),
            pending: Vec::new(),
            chunk_size,
            output_buf,
        })
    }

    /// Feed captured samples, returning buffer-rate output (possibly empty
    /// while a partial rubato chunk accumulates). Passthrough mode returns
    /// the input unchanged.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            return samples.to_vec();
        };

        self.pending.extend_from_slice(samples);

        let mut out = Vec::new();
        let mut consumed = 0;
        while self.pending.len() - consumed >= self.chunk_size {
            let input = &self.pending[consumed..consumed + self.chunk_size];
            match resampler.process_into_buffer(&[input], &mut self.output_buf, None) {
                Ok((_, produced)) => out.extend_from_slice(&self.output_buf[0][..produced]),
                Err(e) => tracing::error!("resampler process error: {e}"),
            }
            consumed += self.chunk_size;
        }
        if consumed > 0 {
            self.pending.copy_within(consumed.., 0);
            self.pending.truncate(self.pending.len() - consumed);
        }
        out
    }

    /// Returns `true` when no rate conversion occurs.
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_identity() {
        let mut rc = RateConverter::new(48_000, 48_000, 960).unwrap();
        assert!(rc.is_passthrough());
        let samples: Vec<f32> = (0..480).map(|i| i as f32 * 0.001).collect();
        assert_eq!(rc.process(&samples), samples);
    }

    #[test]
    fn downsample_3_to_1_length() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        assert!(!rc.is_passthrough());
        let out = rc.process(&vec![0.0f32; 960]);
        assert!(!out.is_empty(), "expected non-empty output");
        // 960 input samples at 48 kHz come out near 320 at 16 kHz.
        assert!(
            (out.len() as isize - 320).unsigned_abs() <= 10,
            "output len={}",
            out.len()
        );
    }

    #[test]
    fn partial_chunk_accumulates_silently() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        assert!(rc.process(&vec![0.0f32; 500]).is_empty());
        // Second push crosses the chunk boundary and flushes.
        assert!(!rc.process(&vec![0.0f32; 500]).is_empty());
    }
}
