use crate::config::EffectField;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use tabled::Tabled;

/// Money columns a record can be ranked or sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnitudeField {
    Prior,
    Current,
    Change,
}

/// One contract/market observation after ingestion.
///
/// Money values are in base currency units. `change` is expected to equal
/// `current - prior` but ingestion only reports mismatches.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub market: String,
    pub contract_id: String,
    pub contract_name: String,
    pub legal_partner: String,
    pub bupa: String,
    pub class_of_business: String,
    pub entry_type: String,
    pub prior: Option<f64>,
    pub current: Option<f64>,
    pub change: Option<f64>,
    /// Effect column name -> parsed value. `None` when the cell was blank or
    /// not recognizably numeric.
    pub effects: HashMap<String, Option<f64>>,
}

impl Record {
    pub fn value(&self, field: MagnitudeField) -> Option<f64> {
        match field {
            MagnitudeField::Prior => self.prior,
            MagnitudeField::Current => self.current,
            MagnitudeField::Change => self.change,
        }
    }

    /// Absolute value used for ranking; missing values count as zero.
    pub fn magnitude(&self, field: MagnitudeField) -> f64 {
        self.value(field).map(f64::abs).unwrap_or(0.0)
    }

    pub fn effect(&self, name: &str) -> Option<f64> {
        self.effects.get(name).copied().flatten()
    }
}

/// Top-contributor marker attached to a ranked record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TopFlag {
    #[default]
    None,
    /// Within the cumulative top share of the market's absolute change.
    Cumulative,
    /// Absolute change above the large-change threshold.
    Large,
}

impl TopFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopFlag::None => "",
            TopFlag::Cumulative => "X",
            TopFlag::Large => "XX",
        }
    }
}

impl fmt::Display for TopFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TopFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    pub record: Record,
    /// Running sum of absolute magnitude in ranking order, including this record.
    pub cumulative: f64,
    /// `cumulative` as a percentage (0-100) of the partition total.
    pub cumulative_pct: f64,
    pub flag: TopFlag,
    /// Zero-based position in ranking order.
    pub rank: usize,
}

/// One classified effect of a record, ready for an `Effect n` slot.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectEntry {
    /// 1..=4
    pub slot: usize,
    pub label: String,
    /// Raw value / 1e6, rounded to two decimals.
    pub impact_m: f64,
    /// Left blank for the analyst to fill in.
    pub kind: String,
}

/// Per-record row of a market sheet.
///
/// Column order is part of the contract with the renderer: the Check Effect
/// formula references `Total impact` and the four `Impact n` columns by position.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct MarketRow {
    #[serde(rename = "Technical Result Previous Quarter (m€)")]
    pub prior_m: Option<f64>,
    #[serde(rename = "Technical Result Current Quarter (m€)")]
    pub current_m: Option<f64>,
    #[serde(rename = "Total impact (m€)")]
    pub impact_m: Option<f64>,
    #[serde(rename = "Check Effect")]
    pub check_effect: String,
    #[serde(rename = "Financial Year")]
    pub financial_year: i32,
    #[serde(rename = "Financial Quarter")]
    pub financial_quarter: String,
    #[serde(rename = "CAP")]
    pub cap: String,
    #[serde(rename = "Class of Business")]
    pub class_of_business: String,
    #[serde(rename = "Market")]
    pub market: String,
    #[serde(rename = "BUPA Name")]
    pub bupa: String,
    #[serde(rename = "Treaty Number")]
    pub treaty_number: String,
    #[serde(rename = "Treaty Name")]
    pub treaty_name: String,
    #[serde(rename = "CoB")]
    pub cob: String,
    #[serde(rename = "Effect 1")]
    pub effect_1: String,
    #[serde(rename = "Type 1")]
    pub type_1: String,
    #[serde(rename = "Impact 1 (m€)")]
    pub impact_1: Option<f64>,
    #[serde(rename = "Effect 2")]
    pub effect_2: String,
    #[serde(rename = "Type 2")]
    pub type_2: String,
    #[serde(rename = "Impact 2 (m€)")]
    pub impact_2: Option<f64>,
    #[serde(rename = "Effect 3")]
    pub effect_3: String,
    #[serde(rename = "Type 3")]
    pub type_3: String,
    #[serde(rename = "Impact 3 (m€)")]
    pub impact_3: Option<f64>,
    #[serde(rename = "Effect 4")]
    pub effect_4: String,
    #[serde(rename = "Type 4")]
    pub type_4: String,
    #[serde(rename = "Impact 4 (m€)")]
    pub impact_4: Option<f64>,
    #[serde(rename = "Comments")]
    pub comments: String,
    #[serde(rename = "TBC")]
    pub tbc: TopFlag,
}

impl MarketRow {
    pub const HEADERS: [&'static str; 27] = [
        "Technical Result Previous Quarter (m€)",
        "Technical Result Current Quarter (m€)",
        "Total impact (m€)",
        "Check Effect",
        "Financial Year",
        "Financial Quarter",
        "CAP",
        "Class of Business",
        "Market",
        "BUPA Name",
        "Treaty Number",
        "Treaty Name",
        "CoB",
        "Effect 1",
        "Type 1",
        "Impact 1 (m€)",
        "Effect 2",
        "Type 2",
        "Impact 2 (m€)",
        "Effect 3",
        "Type 3",
        "Impact 3 (m€)",
        "Effect 4",
        "Type 4",
        "Impact 4 (m€)",
        "Comments",
        "TBC",
    ];

    /// Copy classified effects into their numbered slots; unused slots stay blank.
    pub fn set_effects(&mut self, effects: &[EffectEntry]) {
        for e in effects {
            let (label, kind, impact) = match e.slot {
                1 => (&mut self.effect_1, &mut self.type_1, &mut self.impact_1),
                2 => (&mut self.effect_2, &mut self.type_2, &mut self.impact_2),
                3 => (&mut self.effect_3, &mut self.type_3, &mut self.impact_3),
                4 => (&mut self.effect_4, &mut self.type_4, &mut self.impact_4),
                _ => continue,
            };
            *label = e.label.clone();
            *kind = e.kind.clone();
            *impact = Some(e.impact_m);
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct BreakdownRow {
    #[serde(rename = "Contract ID")]
    #[tabled(rename = "Contract ID")]
    pub contract_id: String,
    #[serde(rename = "BUPA Name")]
    #[tabled(rename = "BUPA Name")]
    pub bupa: String,
    #[serde(rename = "Absolute HFC Change")]
    #[tabled(rename = "Absolute HFC Change")]
    pub abs_change: f64,
    #[serde(rename = "Cumulative Contribution")]
    #[tabled(rename = "Cumulative Contribution")]
    pub cumulative: f64,
    #[serde(rename = "Cumulative Percentage")]
    #[tabled(rename = "Cumulative Percentage")]
    pub cumulative_pct: f64,
    #[serde(rename = "Top 80% Contributor")]
    #[tabled(rename = "Top 80% Contributor")]
    pub flag: TopFlag,
}

impl BreakdownRow {
    pub const HEADERS: [&'static str; 6] = [
        "Contract ID",
        "BUPA Name",
        "Absolute HFC Change",
        "Cumulative Contribution",
        "Cumulative Percentage",
        "Top 80% Contributor",
    ];
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct SummaryRow {
    #[serde(rename = "Market")]
    #[tabled(rename = "Market")]
    pub market: String,
    #[serde(rename = "Total Contracts")]
    #[tabled(rename = "Total Contracts")]
    pub total_contracts: usize,
    #[serde(rename = "Unique Legal Partners")]
    #[tabled(rename = "Unique Legal Partners")]
    pub unique_legal_partners: usize,
    #[serde(rename = "Total CNs")]
    #[tabled(rename = "Total CNs")]
    pub total_contracts_distinct: usize,
    #[serde(rename = "Total HFC Change")]
    #[tabled(rename = "Total HFC Change")]
    pub total_change_m: f64,
    #[serde(rename = "Average HFC Change")]
    #[tabled(rename = "Average HFC Change")]
    pub avg_change_m: f64,
    #[serde(rename = "Average HFC Current Quarter")]
    #[tabled(rename = "Average HFC Current Quarter")]
    pub avg_current_m: f64,
    #[serde(rename = "Average HFC Previous Quarter")]
    #[tabled(rename = "Average HFC Previous Quarter")]
    pub avg_prior_m: f64,
    #[serde(rename = "Positive HFC Changes")]
    #[tabled(rename = "Positive HFC Changes")]
    pub positive_changes: usize,
    #[serde(rename = "Negative HFC Changes")]
    #[tabled(rename = "Negative HFC Changes")]
    pub negative_changes: usize,
}

impl SummaryRow {
    pub const HEADERS: [&'static str; 10] = [
        "Market",
        "Total Contracts",
        "Unique Legal Partners",
        "Total CNs",
        "Total HFC Change",
        "Average HFC Change",
        "Average HFC Current Quarter",
        "Average HFC Previous Quarter",
        "Positive HFC Changes",
        "Negative HFC Changes",
    ];
}

/// Full filtered record as shown in the global top positive/negative views.
///
/// Effect columns depend on the configured taxonomy, so the CSV layout comes
/// from [`TopChangeRow::headers`] and [`TopChangeRow::cells`].
#[derive(Debug, Tabled, Clone, PartialEq)]
pub struct TopChangeRow {
    #[tabled(rename = "Market")]
    pub market: String,
    #[tabled(rename = "Contract ID")]
    pub contract_id: String,
    #[tabled(rename = "Contract Name")]
    pub contract_name: String,
    #[tabled(rename = "Legal Partner")]
    pub legal_partner: String,
    #[tabled(rename = "BUPA")]
    pub bupa: String,
    #[tabled(rename = "Class of Business")]
    pub class_of_business: String,
    #[tabled(rename = "Previous Quarter", display_with = "display_opt")]
    pub prior: Option<f64>,
    #[tabled(rename = "Current Quarter", display_with = "display_opt")]
    pub current: Option<f64>,
    #[tabled(rename = "Change", display_with = "display_opt")]
    pub change: Option<f64>,
    #[tabled(rename = "Entry Type")]
    pub entry_type: String,
    /// Effect column name and raw value, in configured order.
    #[tabled(skip)]
    pub effects: Vec<(String, Option<f64>)>,
}

impl TopChangeRow {
    const FIXED_HEADERS: [&'static str; 10] = [
        "Market",
        "Contract ID",
        "Contract Name",
        "Legal Partner",
        "BUPA",
        "Class of Business",
        "Previous Quarter",
        "Current Quarter",
        "Change",
        "Entry Type",
    ];

    pub fn new(r: &Record, fields: &[EffectField]) -> Self {
        TopChangeRow {
            market: r.market.clone(),
            contract_id: r.contract_id.clone(),
            contract_name: r.contract_name.clone(),
            legal_partner: r.legal_partner.clone(),
            bupa: r.bupa.clone(),
            class_of_business: r.class_of_business.clone(),
            prior: r.prior,
            current: r.current,
            change: r.change,
            entry_type: r.entry_type.clone(),
            effects: fields
                .iter()
                .map(|f| (f.name.clone(), r.effect(&f.name)))
                .collect(),
        }
    }

    /// Header row: the fixed columns followed by one column per effect.
    pub fn headers(effect_columns: &[String]) -> Vec<String> {
        Self::FIXED_HEADERS
            .iter()
            .map(|h| h.to_string())
            .chain(effect_columns.iter().cloned())
            .collect()
    }

    /// Cell values in [`TopChangeRow::headers`] order; missing numbers are blank.
    pub fn cells(&self) -> Vec<String> {
        let num = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        let mut out = vec![
            self.market.clone(),
            self.contract_id.clone(),
            self.contract_name.clone(),
            self.legal_partner.clone(),
            self.bupa.clone(),
            self.class_of_business.clone(),
            num(self.prior),
            num(self.current),
            num(self.change),
            self.entry_type.clone(),
        ];
        out.extend(self.effects.iter().map(|(_, v)| num(*v)));
        out
    }
}

fn display_opt(v: &Option<f64>) -> String {
    v.map(|x| format!("{:.2}", x)).unwrap_or_default()
}
