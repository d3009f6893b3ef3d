//! How far a group is from KPI 5.0 and how many papers of each tier would
//! close the distance

use crate::kpi::{KPI_MAX, KpiRow};
use crate::records::JournalTier;
use serde::Serialize;

/// Absorbs float noise such as 3.0 / 0.6 = 5.000000000000001
const EPSILON: f64 = 1e-9;

/// Papers of one tier that would close the gap on their own
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TierRequirement {
    pub tier: JournalTier,
    pub label: &'static str,
    pub score: f64,
    pub papers: u32,
}

/// Distance between a group's current score total and KPI 5.0
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GapPlan {
    Achieved {
        required_total: f64,
        current_total: f64,
    },
    Needed {
        required_total: f64,
        current_total: f64,
        gap: f64,
        papers: Vec<TierRequirement>,
    },
}

impl GapPlan {
    pub fn is_achieved(&self) -> bool {
        matches!(self, GapPlan::Achieved { .. })
    }

    /// Zero when achieved
    pub fn gap(&self) -> f64 {
        match self {
            GapPlan::Achieved { .. } => 0.0,
            GapPlan::Needed { gap, .. } => *gap,
        }
    }

    pub fn required_total(&self) -> f64 {
        match self {
            GapPlan::Achieved { required_total, .. } | GapPlan::Needed { required_total, .. } => {
                *required_total
            }
        }
    }
}

/// Score total a group needs for KPI 5.0: `(target * headcount) / 100`
///
/// A headcount of zero counts as one.
pub fn required_total(headcount: u32, target: u32) -> f64 {
    (target as f64 * headcount.max(1) as f64) / 100.0
}

/// Plans the papers still needed for a raw score total.
///
/// # Arguments
/// * `current_total` - Sum of publication scores credited to the group
/// * `headcount` - Staff in the group, zero counts as one
/// * `target` - Percentage target for the group
///
/// # Returns
/// * `GapPlan` - `Achieved` when the total covers the requirement, otherwise
///   the gap and a per-tier paper count
pub fn plan(current_total: f64, headcount: u32, target: u32) -> GapPlan {
    let required = required_total(headcount, target);
    let gap = (required - current_total).max(0.0);

    if gap <= EPSILON {
        return GapPlan::Achieved {
            required_total: required,
            current_total,
        };
    }

    let papers = JournalTier::ALL
        .iter()
        .map(|tier| TierRequirement {
            tier: *tier,
            label: tier.label(),
            score: tier.score(),
            papers: (gap / tier.score() - EPSILON).ceil() as u32,
        })
        .collect();

    GapPlan::Needed {
        required_total: required,
        current_total,
        gap,
        papers,
    }
}

/// Gap plan for a KPI table row.
///
/// A row whose displayed KPI is already 5.00 is achieved even when its raw
/// total sits a rounding step below the requirement.
pub fn plan_for(row: &KpiRow) -> GapPlan {
    if row.kpi >= KPI_MAX {
        return GapPlan::Achieved {
            required_total: required_total(row.headcount, row.target),
            current_total: row.total_score,
        };
    }
    plan(row.total_score, row.headcount, row.target)
}
