use crate::error::{ReportError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

/// Run configuration. Every field has a default, so an empty JSON object (or
/// no config file at all) reproduces the standard quarterly report.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportConfig {
    pub columns: ColumnMap,
    pub filter: FilterCfg,
    pub effects: Vec<EffectField>,
    pub ranking: RankConfig,
    pub top_n: usize,
    /// Date used for the Financial Year / Quarter columns; today when absent.
    pub reporting_date: Option<NaiveDate>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMap::default(),
            filter: FilterCfg::default(),
            effects: default_effects(),
            ranking: RankConfig::default(),
            top_n: 250,
            reporting_date: None,
        }
    }
}

impl ReportConfig {
    /// Load from a JSON file, then validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReportError::Config(format!("{}: {}", path.display(), e)))?;
        let cfg: ReportConfig = serde_json::from_str(&text)
            .map_err(|e| ReportError::Config(format!("{}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.ranking.validate()?;
        if self.effects.is_empty() {
            return Err(ReportError::Config("effect list is empty".into()));
        }
        for e in &self.effects {
            if e.name.trim().is_empty() || e.label.trim().is_empty() {
                return Err(ReportError::Config(format!(
                    "effect field needs both a name and a label (got {:?} / {:?})",
                    e.name, e.label
                )));
            }
        }
        Ok(())
    }

    /// Every column the input must carry, in a stable order.
    pub fn required_columns(&self) -> Vec<&str> {
        let c = &self.columns;
        let mut cols = vec![
            c.market.as_str(),
            c.contract_id.as_str(),
            c.contract_name.as_str(),
            c.legal_partner.as_str(),
            c.bupa.as_str(),
            c.class_of_business.as_str(),
            c.prior.as_str(),
            c.current.as_str(),
            c.change.as_str(),
            self.filter.column.as_str(),
        ];
        cols.extend(self.effects.iter().map(|e| e.name.as_str()));
        cols
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColumnMap {
    pub market: String,
    pub contract_id: String,
    pub contract_name: String,
    pub legal_partner: String,
    pub bupa: String,
    pub class_of_business: String,
    pub prior: String,
    pub current: String,
    pub change: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            market: "Business Unit".into(),
            contract_id: "Contract TD".into(),
            contract_name: "Contract Name".into(),
            legal_partner: "Legal Partner TD".into(),
            bupa: "BUPA".into(),
            class_of_business: "Class of Business".into(),
            prior: "HFC as at Q1.2025 in OPT1".into(),
            current: "HFC as at Q2.2025 in OPT1".into(),
            change: "Change in HFC Q(2.2025 –1.2025) in OPT1".into(),
        }
    }
}

/// Keep only rows whose `column` equals `value` (after trimming).
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterCfg {
    pub column: String,
    pub value: String,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            column: "Entry Code Accounting Principle TD".into(),
            value: "Result".into(),
        }
    }
}

/// An effect column and the label it gets in the report.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EffectField {
    pub name: String,
    pub label: String,
}

impl EffectField {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self { name: name.into(), label: label.into() }
    }
}

pub fn default_effects() -> Vec<EffectField> {
    vec![
        EffectField::new("TUs", "True Up (TU)"),
        EffectField::new("Change Prognosis", "Change in Prognosis (∆Prog)"),
    ]
}

/// How records with equal magnitude are ordered when ranking.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Earlier input row ranks first.
    #[default]
    InputIndex,
    /// Lower contract id ranks first, then input index. Makes flags
    /// independent of input row order when contract ids are unique.
    ContractId,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RankConfig {
    /// Share of total absolute change covered by `X` flags (inclusive).
    pub top_share: f64,
    /// Absolute change strictly above this gets `XX`.
    pub large_change_threshold: f64,
    pub tie_break: TieBreak,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            top_share: 0.8,
            large_change_threshold: 200_000.0,
            tie_break: TieBreak::InputIndex,
        }
    }
}

impl RankConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.top_share > 0.0 && self.top_share <= 1.0) {
            return Err(ReportError::Config(format!(
                "top_share must be in (0, 1], got {}",
                self.top_share
            )));
        }
        if !(self.large_change_threshold >= 0.0) {
            return Err(ReportError::Config(format!(
                "large_change_threshold must be non-negative, got {}",
                self.large_change_threshold
            )));
        }
        Ok(())
    }
}
