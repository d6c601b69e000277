//! Event alignment
//!
//! Shifts a trial's time axis so the last TONE sample sits at t = 0.

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{Phase, Trial};

/// Return a copy of the trial with time measured from the last tone sample
pub fn align_to_last_tone(trial: &Trial) -> AnalysisResult<Trial> {
    let mut aligned = trial.clone();
    align_in_place(&mut aligned)?;
    Ok(aligned)
}

/// Shift the trial in place. Returns the offset that was subtracted.
pub fn align_in_place(trial: &mut Trial) -> AnalysisResult<f64> {
    let offset = trial
        .last_tone_time()
        .ok_or(AnalysisError::MissingPhase(Phase::Tone))?;
    if offset != 0.0 {
        for sample in &mut trial.samples {
            sample.time -= offset;
        }
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::trial_from;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_last_tone_becomes_zero() {
        let trial = trial_from(
            1,
            &[
                (0.0, 1.0, Phase::Pre),
                (100.0, 1.0, Phase::Tone),
                (150.0, 1.0, Phase::Tone),
                (200.0, 1.0, Phase::Trace),
            ],
        );
        let aligned = align_to_last_tone(&trial).unwrap();
        assert_eq!(aligned.times(), vec![-150.0, -50.0, 0.0, 50.0]);
        assert_eq!(aligned.last_tone_time(), Some(0.0));
        // Original untouched
        assert_eq!(trial.times(), vec![0.0, 100.0, 150.0, 200.0]);
    }

    #[test]
    fn test_no_tone_fails() {
        let trial = trial_from(1, &[(0.0, 1.0, Phase::Pre), (10.0, 1.0, Phase::Post)]);
        assert!(matches!(
            align_to_last_tone(&trial),
            Err(AnalysisError::MissingPhase(Phase::Tone))
        ));
    }

    proptest! {
        #[test]
        fn prop_alignment_is_idempotent(
            gaps in prop::collection::vec(0.0f64..100.0, 2..40),
            tone_at in 0usize..40,
        ) {
            let mut t = 0.0;
            let rows: Vec<_> = gaps
                .iter()
                .enumerate()
                .map(|(i, dt)| {
                    t += dt;
                    let phase = if i == tone_at % gaps.len() { Phase::Tone } else { Phase::Pre };
                    (t, 1.0, phase)
                })
                .collect();
            let once = align_to_last_tone(&trial_from(1, &rows)).unwrap();
            let twice = align_to_last_tone(&once).unwrap();
            prop_assert_eq!(once.times(), twice.times());
        }
    }
}
