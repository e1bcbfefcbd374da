//! Halton-sequence sub-pixel jitter for temporal anti-aliasing
//!
//! The TXAA stage offsets the sample position of each frame by a point from
//! a low-discrepancy sequence. Bases 2 and 3 give the x/y coordinates; the
//! sequence repeats every 16 frames.

use bytemuck::{Pod, Zeroable};

/// Number of jitter samples before the sequence wraps
pub const JITTER_SAMPLE_COUNT: usize = 16;

/// Value of the Halton sequence with the given base at `index`.
///
/// Deterministic for the same inputs. `index` is 1-based: index 0 is 0.0,
/// `halton_sequence_at(1, 3)` is 1/3, `halton_sequence_at(2, 3)` is 2/3.
pub fn halton_sequence_at(index: u32, base: u32) -> f32 {
    let mut f = 1.0f32;
    let mut r = 0.0f32;
    let mut i = index;
    while i > 0 {
        f /= base as f32;
        r += f * (i % base) as f32;
        i /= base;
    }
    r
}

/// Precomputed 16-entry jitter sequence in the [-0.5, 0.5] square
#[derive(Debug, Clone, PartialEq)]
pub struct JitterSequence {
    samples: [[f32; 2]; JITTER_SAMPLE_COUNT],
}

impl JitterSequence {
    /// Standard TXAA sequence: Halton base 2 for x, base 3 for y, centered
    pub fn txaa() -> Self {
        let mut samples = [[0.0f32; 2]; JITTER_SAMPLE_COUNT];
        for (i, sample) in samples.iter_mut().enumerate() {
            let index = (i + 1) as u32;
            *sample = [
                halton_sequence_at(index, 2) - 0.5,
                halton_sequence_at(index, 3) - 0.5,
            ];
        }
        Self { samples }
    }

    /// Jitter offset for the given frame counter (wraps every 16 frames)
    pub fn at(&self, frame: u64) -> [f32; 2] {
        self.samples[(frame % JITTER_SAMPLE_COUNT as u64) as usize]
    }
}

/// Per-frame time/jitter uniform block.
///
/// Layout matches the `Time` descriptor binding consumed by the compute and
/// post-process shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TimeUniformBlock {
    /// Seconds since application start
    pub elapsed_secs: f32,
    /// Delta of the last frame in milliseconds
    pub frame_delta_ms: f32,
    /// Sub-pixel jitter offset for the current frame
    pub jitter: [f32; 2],
}

#[cfg(test)]
#[path = "jitter_tests.rs"]
mod tests;
