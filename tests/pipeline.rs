use hfc_report::loader::load_from_reader;
use hfc_report::output::write_report;
use hfc_report::*;
use chrono::NaiveDate;
use std::collections::HashSet;

const INPUT: &str = "\
´Business Unit´,Contract TD,Contract Name,Legal Partner TD,BUPA,Class of Business,HFC as at Q1.2025 in OPT1,HFC as at Q2.2025 in OPT1,Change in HFC Q(2.2025 –1.2025) in OPT1,Entry Code Accounting Principle TD,TUs,Change Prognosis
Spain,S1,Treaty S1,LP1,Acme Re,Life,1000000,1300000,300000,Result,100000,200000
Spain,S2,Treaty S2,LP2,Beta Ins,Life,500000,400000,-100000,Result,0,-500000
Spain,S3,Treaty S3,LP2,Beta Ins,P&C,0,50000,50000,Result,TRUE,
Spain,S4,Treaty S4,LP3,Gamma,P&C,0,50000,50000,Result,,
Italy,I1,Treaty I1,LP9,Delta,Life,0,0,0,Result,,
Germany,G1,Treaty G1,LP7,Omega,Life,0,900000,900000,Plan,,
Spain,S5,Treaty S5,LP1,Acme Re,Life,0,1000,1000,Plan,,
";

fn config() -> ReportConfig {
    ReportConfig {
        reporting_date: NaiveDate::from_ymd_opt(2025, 7, 15),
        top_n: 3,
        ..ReportConfig::default()
    }
}

fn build() -> (Vec<Record>, MarketReport) {
    let cfg = config();
    let (records, _) = load_from_reader(INPUT.as_bytes(), &cfg).unwrap();
    let report = build_market_report(&records, entry_type_filter(&cfg), &BuildOptions::from_config(&cfg));
    (records, report)
}

#[test]
fn end_to_end_market_tables() {
    let (_, report) = build();
    let names: Vec<&str> = report.markets.iter().map(|m| m.market.as_str()).collect();
    assert_eq!(names, vec!["Spain", "Italy", "Germany"]);
    assert_eq!(report.filtered_records, 5);

    let spain = report.market("Spain").unwrap();
    let flags: Vec<&str> = spain.rows.iter().map(|r| r.tbc.as_str()).collect();
    assert_eq!(flags, vec!["XX", "X", "", ""]);

    let s1 = &spain.rows[0];
    assert_eq!(s1.financial_year, 2025);
    assert_eq!(s1.financial_quarter, "Q2");
    assert_eq!(s1.effect_1, "Change in Prognosis (∆Prog)");
    assert_eq!(s1.impact_1, Some(0.2));
    assert_eq!(s1.effect_2, "True Up (TU)");
    assert_eq!(s1.impact_2, Some(0.1));

    let s2 = &spain.rows[1];
    assert_eq!(s2.effect_1, "Change in Prognosis (∆Prog)");
    assert_eq!(s2.impact_1, Some(-0.5));
    assert_eq!(s2.effect_2, "");

    // boolean-looking effect cell never counts
    assert_eq!(spain.rows[2].effect_1, "");

    let summary = &spain.summary;
    assert_eq!(summary.total_contracts, 4);
    assert_eq!(summary.unique_legal_partners, 3);
    assert_eq!(summary.positive_changes, 3);
    assert_eq!(summary.negative_changes, 1);
}

#[test]
fn degenerate_markets_are_explicit() {
    let (_, report) = build();
    let italy = report.market("Italy").unwrap();
    assert!(italy.is_degenerate());
    assert_eq!(italy.breakdown[0].cumulative_pct, 0.0);
    assert_eq!(italy.breakdown[0].flag, TopFlag::None);

    let germany = report.market("Germany").unwrap();
    assert!(germany.rows.is_empty());
    assert_eq!(report.degenerate_markets(), vec!["Italy", "Germany"]);
}

#[test]
fn partition_is_lossless() {
    let (records, report) = build();
    let filtered: HashSet<&str> = records
        .iter()
        .filter(|r| r.entry_type == "Result")
        .map(|r| r.contract_id.as_str())
        .collect();
    let partitioned: Vec<&str> = report
        .markets
        .iter()
        .flat_map(|m| m.rows.iter().map(|r| r.treaty_number.as_str()))
        .collect();
    assert_eq!(partitioned.len(), filtered.len());
    assert_eq!(partitioned.iter().copied().collect::<HashSet<_>>(), filtered);
}

#[test]
fn global_top_views_ignore_filtered_out_rows() {
    let (_, report) = build();
    let pos: Vec<&str> = report.top_positive.iter().map(|r| r.contract_id.as_str()).collect();
    assert_eq!(pos, vec!["S1", "S3", "S4"]);
    let neg: Vec<&str> = report.top_negative.iter().map(|r| r.contract_id.as_str()).collect();
    assert_eq!(neg, vec!["S2", "I1", "S3"]);
}

#[test]
fn breakdown_is_sorted_by_absolute_change() {
    let (_, report) = build();
    let spain = report.market("Spain").unwrap();
    let changes: Vec<f64> = spain.breakdown.iter().map(|b| b.abs_change).collect();
    assert_eq!(changes, vec![300_000.0, 100_000.0, 50_000.0, 50_000.0]);
    let pcts: Vec<f64> = spain.breakdown.iter().map(|b| b.cumulative_pct).collect();
    assert_eq!(pcts, vec![60.0, 80.0, 90.0, 100.0]);
}

#[test]
fn renderer_writes_every_sheet() {
    let (_, report) = build();
    let dir = tempfile::tempdir().unwrap();
    let files = write_report(dir.path(), &report).unwrap();
    // market + breakdown per market, then summary and the two top views
    assert_eq!(files.len(), 3 * 2 + 3);
    assert!(files.iter().all(|f| f.exists()));

    let spain = std::fs::read_to_string(dir.path().join("Spain.csv")).unwrap();
    let mut lines = spain.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("Technical Result Previous Quarter (m€),"));
    assert!(header.ends_with(",Comments,TBC"));
    let first = lines.next().unwrap();
    assert!(first.contains("=C2-P2-S2-V2-Y2"));
    assert!(first.ends_with(",XX"));

    let germany = std::fs::read_to_string(dir.path().join("Germany.csv")).unwrap();
    assert_eq!(germany.lines().count(), 1);

    let summary = std::fs::read_to_string(dir.path().join("Summary.csv")).unwrap();
    assert_eq!(summary.lines().count(), 4);
    assert!(dir.path().join("Breakdown - Spain.csv").exists());

    let top = std::fs::read_to_string(dir.path().join("Top Positive HFC Changes.csv")).unwrap();
    let header = top.lines().next().unwrap();
    assert!(header.starts_with("Market,Contract ID,"));
    assert!(header.ends_with(",Entry Type,TUs,Change Prognosis"));
}

#[test]
fn missing_market_column_is_a_schema_error() {
    let input = INPUT.replacen("´Business Unit´", "Region", 1);
    let err = load_from_reader(input.as_bytes(), &config()).unwrap_err();
    match err {
        ReportError::Schema { missing } => assert_eq!(missing, vec!["Business Unit".to_string()]),
        other => panic!("unexpected error: {other}"),
    }
}
