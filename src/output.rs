// Report renderer: turns the pipeline tables into one CSV file per sheet,
// a JSON run summary, and console previews.
use crate::error::{ReportError, Result};
use crate::reports::MarketReport;
use crate::types::{BreakdownRow, MarketRow, SummaryRow, TopChangeRow};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::{debug, info};

/// Spreadsheet tab names are limited to 31 characters.
pub const SHEET_NAME_LIMIT: usize = 31;
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Write `rows` under an explicit header row, so a sheet with no rows still
/// carries its column names.
pub fn write_csv<H, T>(path: &Path, headers: &[H], rows: &[T]) -> Result<()>
where
    H: AsRef<str>,
    T: Serialize,
{
    let out_err = |e: csv::Error| ReportError::Output(format!("{}: {}", path.display(), e));
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(out_err)?;
    wtr.write_record(headers.iter().map(AsRef::<str>::as_ref))
        .map_err(out_err)?;
    for r in rows {
        wtr.serialize(r).map_err(out_err)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Spreadsheet column letter for a zero-based index (0 -> A, 26 -> AA).
pub fn column_letter(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Check Effect formula for a 1-based sheet row: total impact minus the four
/// effect impacts, with columns resolved from [`MarketRow::HEADERS`].
pub fn check_effect_formula(sheet_row: usize) -> String {
    let col = |name: &str| {
        let idx = MarketRow::HEADERS
            .iter()
            .position(|h| *h == name)
            .unwrap_or_default();
        format!("{}{}", column_letter(idx), sheet_row)
    };
    let mut formula = format!("={}", col("Total impact (m€)"));
    for n in 1..=4 {
        formula.push('-');
        formula.push_str(&col(&format!("Impact {n} (m€)")));
    }
    formula
}

/// Hands out unique, valid sheet names.
#[derive(Debug, Default)]
pub struct SheetNames {
    used: HashSet<String>,
}

impl SheetNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// `base` cleaned and truncated to the sheet limit; a ` (n)` suffix is
    /// added when the result is already taken.
    pub fn allocate(&mut self, base: &str) -> String {
        let clean: String = base
            .chars()
            .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
            .collect();
        let clean = if clean.trim().is_empty() { "Sheet".to_string() } else { clean };
        let mut name = truncate_chars(&clean, SHEET_NAME_LIMIT);
        let mut n = 2;
        while self.used.contains(&name.to_lowercase()) {
            let suffix = format!(" ({n})");
            name = format!(
                "{}{}",
                truncate_chars(&clean, SHEET_NAME_LIMIT - suffix.chars().count()),
                suffix
            );
            n += 1;
        }
        if name != base {
            debug!(market = base, sheet = %name, "sheet name adjusted");
        }
        self.used.insert(name.to_lowercase());
        name
    }

    pub fn market(&mut self, market: &str) -> String {
        self.allocate(market)
    }

    pub fn breakdown(&mut self, market: &str) -> String {
        self.allocate(&format!("Breakdown - {market}"))
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Write every sheet of `report` into `out_dir` and return the files written.
///
/// Sheets: one per market, one breakdown per market, `Summary`, and the two
/// global top-change views.
pub fn write_report(out_dir: &Path, report: &MarketReport) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;
    let mut names = SheetNames::new();
    let mut written = Vec::new();
    let mut emit = |sheet: String| {
        let path = out_dir.join(format!("{sheet}.csv"));
        written.push(path.clone());
        path
    };

    for bundle in &report.markets {
        let rows: Vec<MarketRow> = bundle
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| MarketRow {
                // header is sheet row 1
                check_effect: check_effect_formula(i + 2),
                ..r.clone()
            })
            .collect();
        write_csv(&emit(names.market(&bundle.market)), &MarketRow::HEADERS, &rows)?;
        write_csv(
            &emit(names.breakdown(&bundle.market)),
            &BreakdownRow::HEADERS,
            &bundle.breakdown,
        )?;
    }

    write_csv(&emit(names.allocate("Summary")), &SummaryRow::HEADERS, &report.summary_rows())?;
    let top_headers = TopChangeRow::headers(&report.effect_columns);
    for (sheet, rows) in [
        ("Top Positive HFC Changes", &report.top_positive),
        ("Top Negative HFC Changes", &report.top_negative),
    ] {
        let cells: Vec<Vec<String>> = rows.iter().map(TopChangeRow::cells).collect();
        write_csv(&emit(names.allocate(sheet)), &top_headers, &cells)?;
    }

    info!(files = written.len(), dir = %out_dir.display(), "report written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_still_writes_headers() {
        use crate::config::ReportConfig;
        use crate::reports::{build_market_report, BuildOptions};

        let opts = BuildOptions::from_config(&ReportConfig::default());
        let report = build_market_report(&[], |_| true, &opts);
        let dir = tempfile::tempdir().unwrap();
        write_report(dir.path(), &report).unwrap();

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("Summary.csv").trim_end(), SummaryRow::HEADERS.join(","));
        let top = read("Top Positive HFC Changes.csv");
        assert_eq!(top.lines().count(), 1);
        assert!(top.trim_end().ends_with(",Entry Type,TUs,Change Prognosis"));
        assert_eq!(read("Top Negative HFC Changes.csv").lines().count(), 1);
    }

    #[test]
    fn column_letters_roll_over() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn check_formula_targets_impact_columns() {
        assert_eq!(check_effect_formula(2), "=C2-P2-S2-V2-Y2");
        assert_eq!(check_effect_formula(17), "=C17-P17-S17-V17-Y17");
    }

    #[test]
    fn sheet_names_are_truncated_and_unique() {
        let mut names = SheetNames::new();
        let long = "A very long market name that exceeds the limit";
        let first = names.market(long);
        assert_eq!(first.chars().count(), SHEET_NAME_LIMIT);
        let second = names.market(long);
        assert_ne!(first, second);
        assert!(second.ends_with(" (2)"));
        assert_eq!(second.chars().count(), SHEET_NAME_LIMIT);

        let b = names.breakdown(long);
        assert!(b.starts_with("Breakdown - "));
        assert!(b.chars().count() <= SHEET_NAME_LIMIT);
    }

    #[test]
    fn invalid_characters_are_replaced() {
        let mut names = SheetNames::new();
        assert_eq!(names.market("EMEA/North: Re?"), "EMEA_North_ Re_");
        assert_eq!(names.market("summary"), "summary");
        assert_eq!(names.allocate("Summary"), "Summary (2)");
    }
}
