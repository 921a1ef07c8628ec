use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::types::Record;
use crate::util::{normalize_header, parse_f64_safe};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Tolerance (base units) for `change == current - prior`.
const CHANGE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    /// Money cells that were present but not numeric; loaded as missing.
    pub unparsed_amounts: usize,
    /// Rows whose change differs from current - prior.
    pub change_mismatches: usize,
}

pub fn load_and_clean(path: impl AsRef<Path>, cfg: &ReportConfig) -> Result<(Vec<Record>, LoadReport)> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ReportError::Ingestion(format!("{}: {}", path.display(), e)))?;
    load_from_reader(file, cfg)
}

/// Read records from CSV text. Headers are normalized before lookup, and every
/// column in [`ReportConfig::required_columns`] must be present.
pub fn load_from_reader<R: Read>(reader: R, cfg: &ReportConfig) -> Result<(Vec<Record>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::Fields).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let columns = ColumnIndex::new(&headers, cfg)?;

    let mut report = LoadReport::default();
    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        report.total_rows += 1;
        let record = columns.build(&row, &mut report);
        if let (Some(p), Some(c), Some(ch)) = (record.prior, record.current, record.change) {
            if (ch - (c - p)).abs() > CHANGE_TOLERANCE {
                report.change_mismatches += 1;
                debug!(contract = %record.contract_id, market = %record.market, "change differs from current - prior");
            }
        }
        records.push(record);
    }

    if report.change_mismatches > 0 {
        warn!(rows = report.change_mismatches, "change column does not equal current - prior");
    }
    if report.unparsed_amounts > 0 {
        warn!(cells = report.unparsed_amounts, "non-numeric money cells treated as missing");
    }
    Ok((records, report))
}

/// Position of every configured column in the header row.
struct ColumnIndex {
    market: usize,
    contract_id: usize,
    contract_name: usize,
    legal_partner: usize,
    bupa: usize,
    class_of_business: usize,
    prior: usize,
    current: usize,
    change: usize,
    entry_type: usize,
    effects: Vec<(String, usize)>,
}

impl ColumnIndex {
    fn new(headers: &StringRecord, cfg: &ReportConfig) -> Result<Self> {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            by_name.entry(normalize_header(h)).or_insert(i);
        }

        let missing: Vec<String> = cfg
            .required_columns()
            .into_iter()
            .filter(|c| !by_name.contains_key(*c))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(ReportError::Schema { missing });
        }

        let at = |name: &str| by_name[name];
        let c = &cfg.columns;
        Ok(Self {
            market: at(&c.market),
            contract_id: at(&c.contract_id),
            contract_name: at(&c.contract_name),
            legal_partner: at(&c.legal_partner),
            bupa: at(&c.bupa),
            class_of_business: at(&c.class_of_business),
            prior: at(&c.prior),
            current: at(&c.current),
            change: at(&c.change),
            entry_type: at(&cfg.filter.column),
            effects: cfg.effects.iter().map(|e| (e.name.clone(), at(&e.name))).collect(),
        })
    }

    fn build(&self, row: &StringRecord, report: &mut LoadReport) -> Record {
        let text = |i: usize| row.get(i).unwrap_or("").to_string();
        let mut amount = |i: usize| {
            let cell = row.get(i);
            let parsed = parse_f64_safe(cell);
            if parsed.is_none() && cell.is_some_and(|s| !s.trim().is_empty()) {
                report.unparsed_amounts += 1;
            }
            parsed
        };
        let prior = amount(self.prior);
        let current = amount(self.current);
        let change = amount(self.change);

        Record {
            market: text(self.market),
            contract_id: text(self.contract_id),
            contract_name: text(self.contract_name),
            legal_partner: text(self.legal_partner),
            bupa: text(self.bupa),
            class_of_business: text(self.class_of_business),
            entry_type: text(self.entry_type),
            prior,
            current,
            change,
            effects: self
                .effects
                .iter()
                .map(|(name, i)| (name.clone(), parse_f64_safe(row.get(*i))))
                .collect(),
        }
    }
}
