use crate::config::{EffectField, RankConfig, ReportConfig};
use crate::effects::classify;
use crate::ranking::{rank, Ranking};
use crate::types::{
    BreakdownRow, MagnitudeField, MarketRow, Record, SummaryRow, TopChangeRow, TopFlag,
};
use crate::util::{average, fiscal_period, round2, to_millions};
use chrono::Local;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Fiscal period stamped on every market row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub quarter: String,
}

impl Period {
    /// Period of the configured reporting date, or of today.
    pub fn for_config(cfg: &ReportConfig) -> Self {
        let date = cfg.reporting_date.unwrap_or_else(|| Local::now().date_naive());
        let (year, quarter) = fiscal_period(date);
        Period { year, quarter: quarter.to_string() }
    }
}

/// Everything the pipeline needs besides the records themselves.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub ranking: RankConfig,
    pub effects: Vec<EffectField>,
    pub top_n: usize,
    pub period: Period,
}

impl BuildOptions {
    pub fn from_config(cfg: &ReportConfig) -> Self {
        BuildOptions {
            ranking: cfg.ranking,
            effects: cfg.effects.clone(),
            top_n: cfg.top_n,
            period: Period::for_config(cfg),
        }
    }
}

/// Inclusion predicate from the configured entry-type filter.
pub fn entry_type_filter(cfg: &ReportConfig) -> impl Fn(&Record) -> bool {
    let wanted = cfg.filter.value.trim().to_string();
    move |r: &Record| r.entry_type.trim() == wanted
}

/// All tables produced for one market.
#[derive(Debug, Clone)]
pub struct MarketBundle {
    pub market: String,
    pub ranking: Ranking,
    /// One row per record, input order.
    pub rows: Vec<MarketRow>,
    /// Ranking order, largest absolute change first.
    pub breakdown: Vec<BreakdownRow>,
    pub summary: SummaryRow,
}

impl MarketBundle {
    /// No filtered records, or all changes zero.
    pub fn is_degenerate(&self) -> bool {
        self.ranking.is_degenerate()
    }
}

#[derive(Debug, Clone)]
pub struct MarketReport {
    /// In first-seen order of markets across the unfiltered input.
    pub markets: Vec<MarketBundle>,
    pub top_positive: Vec<TopChangeRow>,
    pub top_negative: Vec<TopChangeRow>,
    /// Effect column names carried by the top views, in configured order.
    pub effect_columns: Vec<String>,
    pub filtered_records: usize,
}

impl MarketReport {
    pub fn market(&self, name: &str) -> Option<&MarketBundle> {
        self.markets.iter().find(|m| m.market == name)
    }

    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        self.markets.iter().map(|m| m.summary.clone()).collect()
    }

    pub fn degenerate_markets(&self) -> Vec<&str> {
        self.markets
            .iter()
            .filter(|m| m.is_degenerate())
            .map(|m| m.market.as_str())
            .collect()
    }
}

/// Distinct market values in first-seen order.
pub fn unique_markets(records: &[Record]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.market.as_str()))
        .map(|r| r.market.clone())
        .collect()
}

/// Filter, partition by market, rank, classify and summarise.
///
/// Markets are enumerated from the unfiltered `records`, so a market whose
/// rows are all filtered out still gets an (empty, degenerate) bundle.
pub fn build_market_report<F>(records: &[Record], include: F, opts: &BuildOptions) -> MarketReport
where
    F: Fn(&Record) -> bool,
{
    let markets = unique_markets(records);
    let filtered: Vec<Record> = records.iter().filter(|r| include(r)).cloned().collect();
    info!(
        markets = markets.len(),
        kept = filtered.len(),
        dropped = records.len() - filtered.len(),
        "building market report"
    );

    let mut groups: HashMap<&str, Vec<Record>> = HashMap::new();
    for r in &filtered {
        groups.entry(r.market.as_str()).or_default().push(r.clone());
    }

    let bundles: Vec<MarketBundle> = markets
        .iter()
        .map(|m| {
            let group = groups.remove(m.as_str()).unwrap_or_default();
            build_market(m, &group, opts)
        })
        .collect();

    MarketReport {
        top_positive: top_changes(&filtered, &opts.effects, opts.top_n, true),
        top_negative: top_changes(&filtered, &opts.effects, opts.top_n, false),
        effect_columns: opts.effects.iter().map(|e| e.name.clone()).collect(),
        filtered_records: filtered.len(),
        markets: bundles,
    }
}

fn build_market(market: &str, records: &[Record], opts: &BuildOptions) -> MarketBundle {
    let ranking = rank(records, MagnitudeField::Change, &opts.ranking);
    if ranking.is_degenerate() {
        warn!(market, records = records.len(), "no change to rank; contributions set to 0%");
    }

    let rows: Vec<MarketRow> = ranking
        .records
        .iter()
        .map(|rr| {
            let r = &rr.record;
            let mut row = MarketRow {
                prior_m: r.prior.map(to_millions),
                current_m: r.current.map(to_millions),
                impact_m: r.change.map(to_millions),
                financial_year: opts.period.year,
                financial_quarter: opts.period.quarter.clone(),
                class_of_business: r.class_of_business.clone(),
                market: r.market.clone(),
                bupa: r.bupa.clone(),
                treaty_number: r.contract_id.clone(),
                treaty_name: r.contract_name.clone(),
                tbc: rr.flag,
                ..MarketRow::default()
            };
            row.set_effects(&classify(r, &opts.effects));
            row
        })
        .collect();

    let breakdown: Vec<BreakdownRow> = ranking
        .by_rank()
        .into_iter()
        .map(|rr| BreakdownRow {
            contract_id: rr.record.contract_id.clone(),
            bupa: rr.record.bupa.clone(),
            abs_change: rr.record.magnitude(MagnitudeField::Change),
            cumulative: rr.cumulative,
            cumulative_pct: rr.cumulative_pct,
            flag: rr.flag,
        })
        .collect();

    let summary = summarize(market, records, &rows);
    debug!(market, contracts = summary.total_contracts, "market done");

    MarketBundle {
        market: market.to_string(),
        ranking,
        rows,
        breakdown,
        summary,
    }
}

/// Per-market statistics. Money figures are taken from the rounded
/// million-unit values of the market sheet; missing values and blank
/// identifiers are skipped.
pub fn summarize(market: &str, records: &[Record], rows: &[MarketRow]) -> SummaryRow {
    let impacts: Vec<f64> = rows.iter().filter_map(|r| r.impact_m).collect();
    let currents: Vec<f64> = rows.iter().filter_map(|r| r.current_m).collect();
    let priors: Vec<f64> = rows.iter().filter_map(|r| r.prior_m).collect();

    SummaryRow {
        market: market.to_string(),
        total_contracts: rows.len(),
        unique_legal_partners: count_distinct(records.iter().map(|r| r.legal_partner.as_str())),
        total_contracts_distinct: count_distinct(records.iter().map(|r| r.contract_id.as_str())),
        total_change_m: impacts.iter().sum(),
        avg_change_m: average(&impacts),
        avg_current_m: average(&currents),
        avg_prior_m: average(&priors),
        positive_changes: impacts.iter().filter(|v| **v > 0.0).count(),
        negative_changes: impacts.iter().filter(|v| **v < 0.0).count(),
    }
}

/// Distinct non-blank values.
fn count_distinct<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<HashSet<&str>>()
        .len()
}

/// The `n` largest (or smallest) records by change. Records without a change
/// value are left out; equal changes keep input order.
pub fn top_changes(
    records: &[Record],
    effects: &[EffectField],
    n: usize,
    largest: bool,
) -> Vec<TopChangeRow> {
    let mut with_change: Vec<(f64, &Record)> = records
        .iter()
        .filter_map(|r| r.change.map(|c| (c, r)))
        .collect();
    with_change.sort_by(|a, b| {
        let ord = a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal);
        if largest {
            ord.reverse()
        } else {
            ord
        }
    });
    with_change
        .into_iter()
        .take(n)
        .map(|(_, r)| TopChangeRow::new(r, effects))
        .collect()
}

/// Run-level figures written next to the sheets.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub filtered_records: usize,
    pub markets: usize,
    pub degenerate_markets: Vec<String>,
    pub flagged_top: usize,
    pub flagged_large: usize,
    pub total_change_m: f64,
    pub financial_year: i32,
    pub financial_quarter: String,
}

pub fn generate_summary(total_rows: usize, report: &MarketReport, period: &Period) -> RunSummary {
    let flags = report
        .markets
        .iter()
        .flat_map(|m| m.ranking.records.iter().map(|r| r.flag));
    let (mut flagged_top, mut flagged_large) = (0usize, 0usize);
    for f in flags {
        match f {
            TopFlag::Cumulative => flagged_top += 1,
            TopFlag::Large => flagged_large += 1,
            TopFlag::None => {}
        }
    }
    RunSummary {
        total_rows,
        filtered_records: report.filtered_records,
        markets: report.markets.len(),
        degenerate_markets: report.degenerate_markets().into_iter().map(str::to_string).collect(),
        flagged_top,
        flagged_large,
        total_change_m: round2(report.markets.iter().map(|m| m.summary.total_change_m).sum()),
        financial_year: period.year,
        financial_quarter: period.quarter.clone(),
    }
}
