//! Cumulative-contribution ranking of records within one partition.
use crate::config::{RankConfig, TieBreak};
use crate::types::{MagnitudeField, RankedRecord, Record, TopFlag};
use std::cmp::Ordering;

/// Result of ranking one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Ranked records in the same order as the input.
    pub records: Vec<RankedRecord>,
    /// Sum of absolute magnitudes over the partition.
    pub total: f64,
}

impl Ranking {
    /// True when the partition has no magnitude to distribute (no records or
    /// all zero). Percentages are then 0 and no record is flagged.
    pub fn is_degenerate(&self) -> bool {
        self.total == 0.0
    }

    /// Records in ranking order (largest magnitude first).
    pub fn by_rank(&self) -> Vec<&RankedRecord> {
        let mut out: Vec<&RankedRecord> = self.records.iter().collect();
        out.sort_by_key(|r| r.rank);
        out
    }
}

/// Rank `records` by descending absolute `field` and flag the top contributors.
///
/// A record gets [`TopFlag::Cumulative`] when the running sum up to and
/// including it stays within `top_share` of the total, and [`TopFlag::Large`]
/// (overriding) when its own magnitude exceeds `large_change_threshold`.
/// Equal magnitudes are ordered according to `cfg.tie_break`.
pub fn rank(records: &[Record], field: MagnitudeField, cfg: &RankConfig) -> Ranking {
    let magnitudes: Vec<f64> = records.iter().map(|r| r.magnitude(field)).collect();
    let total: f64 = magnitudes.iter().sum();

    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        magnitudes[b]
            .partial_cmp(&magnitudes[a])
            .unwrap_or(Ordering::Equal)
            .then_with(|| match cfg.tie_break {
                TieBreak::InputIndex => Ordering::Equal,
                TieBreak::ContractId => records[a].contract_id.cmp(&records[b].contract_id),
            })
            .then_with(|| a.cmp(&b))
    });

    let cutoff = cfg.top_share * total;
    let mut slots: Vec<Option<RankedRecord>> = vec![None; records.len()];
    let mut cumulative = 0.0;
    for (rank, &idx) in order.iter().enumerate() {
        let magnitude = magnitudes[idx];
        cumulative += magnitude;
        let (cumulative_pct, mut flag) = if total > 0.0 {
            let pct = 100.0 * cumulative / total;
            let flag = if cumulative <= cutoff { TopFlag::Cumulative } else { TopFlag::None };
            (pct, flag)
        } else {
            (0.0, TopFlag::None)
        };
        if magnitude > cfg.large_change_threshold {
            flag = TopFlag::Large;
        }
        slots[idx] = Some(RankedRecord {
            record: records[idx].clone(),
            cumulative,
            cumulative_pct,
            flag,
            rank,
        });
    }

    Ranking {
        records: slots.into_iter().flatten().collect(),
        total,
    }
}
