/// Tests for the Halton sequence generator and the TXAA jitter table

use super::*;

const EPSILON: f32 = 1e-4;

// ============================================================================
// Tests: Halton sequence values
// ============================================================================

#[test]
fn test_halton_base_3_first_values() {
    assert!((halton_sequence_at(1, 3) - 1.0 / 3.0).abs() < EPSILON);
    assert!((halton_sequence_at(2, 3) - 2.0 / 3.0).abs() < EPSILON);
    assert!((halton_sequence_at(3, 3) - 1.0 / 9.0).abs() < EPSILON);
    assert!((halton_sequence_at(4, 3) - 4.0 / 9.0).abs() < EPSILON);
}

#[test]
fn test_halton_base_2_first_values() {
    assert!((halton_sequence_at(1, 2) - 0.5).abs() < EPSILON);
    assert!((halton_sequence_at(2, 2) - 0.25).abs() < EPSILON);
    assert!((halton_sequence_at(3, 2) - 0.75).abs() < EPSILON);
    assert!((halton_sequence_at(4, 2) - 0.125).abs() < EPSILON);
}

#[test]
fn test_halton_index_zero_is_zero() {
    assert_eq!(halton_sequence_at(0, 2), 0.0);
    assert_eq!(halton_sequence_at(0, 3), 0.0);
}

#[test]
fn test_halton_is_deterministic() {
    for index in 0..64 {
        assert_eq!(
            halton_sequence_at(index, 3),
            halton_sequence_at(index, 3)
        );
    }
}

#[test]
fn test_halton_stays_in_unit_interval() {
    for base in [2, 3] {
        for index in 1..256 {
            let value = halton_sequence_at(index, base);
            assert!(value > 0.0 && value < 1.0, "h({}, {}) = {}", index, base, value);
        }
    }
}

// ============================================================================
// Tests: Jitter sequence
// ============================================================================

#[test]
fn test_txaa_sequence_is_centered() {
    let sequence = JitterSequence::txaa();
    for frame in 0..JITTER_SAMPLE_COUNT as u64 {
        let [x, y] = sequence.at(frame);
        assert!(x >= -0.5 && x <= 0.5);
        assert!(y >= -0.5 && y <= 0.5);
    }
}

#[test]
fn test_txaa_sequence_wraps_after_16_frames() {
    let sequence = JitterSequence::txaa();
    assert_eq!(sequence.at(0), sequence.at(16));
    assert_eq!(sequence.at(5), sequence.at(21));
}

#[test]
fn test_txaa_first_sample_matches_halton() {
    let sequence = JitterSequence::txaa();
    let [x, y] = sequence.at(0);
    assert!((x - (halton_sequence_at(1, 2) - 0.5)).abs() < EPSILON);
    assert!((y - (halton_sequence_at(1, 3) - 0.5)).abs() < EPSILON);
}

#[test]
fn test_txaa_samples_are_distinct() {
    let sequence = JitterSequence::txaa();
    for a in 0..JITTER_SAMPLE_COUNT as u64 {
        for b in (a + 1)..JITTER_SAMPLE_COUNT as u64 {
            assert_ne!(sequence.at(a), sequence.at(b));
        }
    }
}
