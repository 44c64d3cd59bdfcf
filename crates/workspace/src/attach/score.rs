//! Attachment quality score

use std::f64::consts::PI;

use shared::{classify, reference, Result};

/// Score in `0.0..=1.0` for joining an `a`-gon to a `b`-gon at `fold_angle`.
///
/// Starts from the base stability of the pair's class and loses up to half of
/// it as the fold drifts from the reference fold for the pair.
pub fn attachment_score(a: u32, b: u32, fold_angle: f64) -> Result<f64> {
    let reference = reference::reference_fold_angle(a, b)?;
    let base = classify::classify(&[a, b]).base_stability();
    let deviation = ((fold_angle - reference).abs() / PI).min(1.0);
    Ok(base * (1.0 - 0.5 * deviation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PolyformError;

    #[test]
    fn test_reference_fold_scores_base_stability() {
        let fold = reference::reference_fold_angle(3, 3).unwrap();
        assert!((attachment_score(3, 3, fold).unwrap() - 0.95).abs() < 1e-12);
        let fold = reference::reference_fold_angle(3, 4).unwrap();
        assert!((attachment_score(3, 4, fold).unwrap() - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_deviation_lowers_score() {
        let fold = reference::reference_fold_angle(4, 4).unwrap();
        let good = attachment_score(4, 4, fold).unwrap();
        let worse = attachment_score(4, 4, fold + 0.5).unwrap();
        let worst = attachment_score(4, 4, fold + 10.0).unwrap();
        assert!(good > worse);
        assert!(worse > worst);
        assert!((worst - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_sides() {
        assert_eq!(
            attachment_score(3, 1, 0.0).unwrap_err(),
            PolyformError::InvalidSideCount(1)
        );
    }
}
