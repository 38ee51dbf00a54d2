//! Ordinal grades.
//!
//! * Bad-channel grade: fixed tiering of the bad-lead count.
//! * Alpha grade: letter grade from percentiles of the current batch, so the
//!   same alpha value can earn different letters in different recordings.
use serde::Serialize;

use crate::config::GradeConfig;
use crate::error::{QualityError, Result};

/// Bad-channel grade, lower is better.
///
/// | bad leads | grade |
/// |---|---|
/// | 0 | 1 |
/// | 1–2 | 2 |
/// | 3–4 | 3 |
/// | 5+ | 4 |
pub fn grade_bads(n_bad: usize) -> u8 {
    match n_bad {
        0 => 1,
        1..=2 => 2,
        3..=4 => 3,
        _ => 4,
    }
}

/// Alpha letter grade, `A` best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AlphaGrade {
    A,
    B,
    C,
    D,
    F,
}

impl AlphaGrade {
    pub fn as_char(&self) -> char {
        match self {
            AlphaGrade::A => 'A',
            AlphaGrade::B => 'B',
            AlphaGrade::C => 'C',
            AlphaGrade::D => 'D',
            AlphaGrade::F => 'F',
        }
    }
}

impl std::fmt::Display for AlphaGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// `p`-th percentile of `sorted`, linear interpolation between order
/// statistics at rank `p/100 · (n − 1)` (numpy's default).
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Percentile thresholds computed once over a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaGrader {
    /// Threshold values matching `GradeConfig::cutoffs`, best first.
    thresholds: [f64; 4],
}

impl AlphaGrader {
    /// Compute thresholds over every value of the batch.
    ///
    /// Fails on an empty batch or any non-finite value.
    pub fn fit(values: &[f64], cfg: &GradeConfig) -> Result<Self> {
        if values.is_empty() {
            return Err(QualityError::Configuration("cannot grade an empty batch".into()));
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(QualityError::Configuration(format!("non-finite alpha value {v}")));
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mut thresholds = [0.0; 4];
        for (t, &p) in thresholds.iter_mut().zip(&cfg.cutoffs) {
            *t = percentile_sorted(&sorted, p).unwrap_or(0.0);
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> [f64; 4] {
        self.thresholds
    }

    pub fn grade(&self, value: f64) -> AlphaGrade {
        const LETTERS: [AlphaGrade; 4] = [AlphaGrade::A, AlphaGrade::B, AlphaGrade::C, AlphaGrade::D];
        self.thresholds
            .iter()
            .zip(LETTERS)
            .find(|(&t, _)| value >= t)
            .map(|(_, g)| g)
            .unwrap_or(AlphaGrade::F)
    }
}

/// Letter grade of every value relative to the whole batch.
pub fn grade_alpha_batch(values: &[f64], cfg: &GradeConfig) -> Result<Vec<AlphaGrade>> {
    let grader = AlphaGrader::fit(values, cfg)?;
    Ok(values.iter().map(|&v| grader.grade(v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_grade_tiers_are_monotonic() {
        let grades: Vec<u8> = (0..10).map(grade_bads).collect();
        assert_eq!(grades, vec![1, 2, 2, 3, 3, 4, 4, 4, 4, 4]);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&v, 0.0), Some(1.0));
        assert_eq!(percentile_sorted(&v, 50.0), Some(3.0));
        assert_eq!(percentile_sorted(&v, 100.0), Some(5.0));
        approx::assert_abs_diff_eq!(percentile_sorted(&v, 85.0).unwrap(), 4.4, epsilon = 1e-12);
        assert_eq!(percentile_sorted(&[], 50.0), None);
    }

    #[test]
    fn grades_over_uniform_batch() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let grades = grade_alpha_batch(&values, &GradeConfig::default()).unwrap();
        assert_eq!(grades[99], AlphaGrade::A);
        // 85th percentile of 0..=99 is 84.15.
        assert_eq!(grades[85], AlphaGrade::A);
        assert_eq!(grades[84], AlphaGrade::B);
        assert_eq!(grades[0], AlphaGrade::F);
        assert_eq!(grades.iter().filter(|g| **g == AlphaGrade::F).count(), 40);
    }

    #[test]
    fn same_value_graded_relative_to_batch() {
        let cfg = GradeConfig::default();
        let low_batch = grade_alpha_batch(&[0.1, 0.2, 0.3, 1.0], &cfg).unwrap();
        let high_batch = grade_alpha_batch(&[1.0, 2.0, 3.0, 4.0], &cfg).unwrap();
        assert_eq!(low_batch[3], AlphaGrade::A);
        assert_eq!(high_batch[0], AlphaGrade::F);
    }

    #[test]
    fn raising_one_value_never_lowers_its_grade() {
        let cfg = GradeConfig::default();
        let mut values = vec![0.3, 1.2, 0.7, 2.5, 0.9, 1.8, 0.1, 1.1];
        let mut last = grade_alpha_batch(&values, &cfg).unwrap()[2];
        for step in 1..40 {
            values[2] = 0.7 + step as f64 * 0.1;
            let g = grade_alpha_batch(&values, &cfg).unwrap()[2];
            assert!(g <= last, "grade fell from {last} to {g} at {}", values[2]);
            last = g;
        }
        assert_eq!(last, AlphaGrade::A);
    }

    #[test]
    fn empty_or_nan_batch_rejected() {
        assert!(grade_alpha_batch(&[], &GradeConfig::default()).is_err());
        assert!(grade_alpha_batch(&[1.0, f64::NAN], &GradeConfig::default()).is_err());
    }
}
