//! Per-epoch metrics, grading and the ranked table.
//!
//! Rows are ordered by bad-channel grade ascending, then relative alpha
//! power descending.  The sort is stable, so full ties keep epoch order.
use serde::Serialize;

use crate::bad_leads::BadLeadSet;
use crate::config::GradeConfig;
use crate::error::Result;
use crate::grading::{grade_bads, AlphaGrade, AlphaGrader};
use crate::reference::ReferenceId;

/// Metrics of one epoch before batch grading.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEpochMetrics {
    pub index: usize,
    pub start_sec: f32,
    pub sync_score: f64,
    pub alpha_power: f64,
    pub bad_leads: BadLeadSet,
}

/// One graded row of a [`RankedEpochTable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochMetrics {
    pub index: usize,
    pub start_sec: f32,
    pub sync_score: f64,
    pub alpha_power: f64,
    pub bad_leads: BadLeadSet,
    pub n_bad: usize,
    /// 1 (no bad leads) to 4.
    pub bad_grade: u8,
    pub alpha_grade: AlphaGrade,
}

/// Graded epochs of one run, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEpochTable {
    pub reference: ReferenceId,
    pub epoch_dur: f32,
    pub rows: Vec<EpochMetrics>,
}

impl RankedEpochTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row of the epoch with the given index.
    pub fn by_index(&self, index: usize) -> Option<&EpochMetrics> {
        self.rows.iter().find(|r| r.index == index)
    }
}

/// Grade every epoch against the whole batch and sort.
///
/// An empty batch gives an empty table.
pub fn rank(
    raw: Vec<RawEpochMetrics>,
    reference: ReferenceId,
    epoch_dur: f32,
    grading: &GradeConfig,
) -> Result<RankedEpochTable> {
    if raw.is_empty() {
        return Ok(RankedEpochTable { reference, epoch_dur, rows: Vec::new() });
    }
    let alphas: Vec<f64> = raw.iter().map(|m| m.alpha_power).collect();
    let grader = AlphaGrader::fit(&alphas, grading)?;
    tracing::debug!(thresholds = ?grader.thresholds(), "alpha grade thresholds");

    let mut rows: Vec<EpochMetrics> = raw
        .into_iter()
        .map(|m| {
            let n_bad = m.bad_leads.len();
            EpochMetrics {
                index: m.index,
                start_sec: m.start_sec,
                sync_score: m.sync_score,
                alpha_power: m.alpha_power,
                alpha_grade: grader.grade(m.alpha_power),
                bad_grade: grade_bads(n_bad),
                n_bad,
                bad_leads: m.bad_leads,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        a.bad_grade
            .cmp(&b.bad_grade)
            .then_with(|| b.alpha_power.total_cmp(&a.alpha_power))
    });
    Ok(RankedEpochTable { reference, epoch_dur, rows })
}

/// First `n` rows whose synchrony score is below `limit`.
pub fn select_best(table: &RankedEpochTable, limit: f64, n: usize) -> Vec<&EpochMetrics> {
    table.rows.iter().filter(|r| r.sync_score < limit).take(n).collect()
}
