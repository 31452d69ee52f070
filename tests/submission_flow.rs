use carbon_footprint::calculator::SubmissionForm;
use carbon_footprint::chart::{ChartOutcome, chart_data};
use carbon_footprint::report::{history_table, layout_report, PageSetup};
use carbon_footprint::{AppConfig, FootprintService, LedgerSnapshot, SubmitError, ValidationError};
use chrono::NaiveDate;
use std::fs;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn form(name: &str, year: &str, efficiency: &str) -> SubmissionForm {
    SubmissionForm {
        name: Some(name.to_string()),
        year: Some(year.to_string()),
        electricity: Some("100".to_string()),
        gas: Some("50".to_string()),
        fuel: Some("0".to_string()),
        waste: Some("10".to_string()),
        recycling: Some("50".to_string()),
        kilometers: Some("200".to_string()),
        efficiency: Some(efficiency.to_string()),
    }
}

#[test]
fn accepted_submission_is_recorded_and_reported() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::rooted_at(dir.path());
    let service = FootprintService::new(config.clone()).unwrap();

    let outcome = service.submit(&form("Acme", "2024", "20")).unwrap();
    assert!((outcome.record.total_co2 - 61.08).abs() < 1e-9);

    let snapshot = service.load_all().unwrap();
    assert_eq!(snapshot.complete_records(), vec![outcome.record.clone()]);

    let report = outcome.report.expect("report is written even without a chart");
    assert_eq!(report, config.report_dir.join("Acme_2024_report.pdf"));
    assert!(report.exists());

    // Without system fonts the chart may fail; that only adds a notice.
    match &outcome.chart {
        ChartOutcome::Rendered(path) => assert!(path.exists()),
        ChartOutcome::Failed(_) => assert!(!outcome.notices.is_empty()),
        ChartOutcome::Skipped(reason) => panic!("unexpected skip: {}", reason),
    }
}

#[test]
fn zero_efficiency_is_rejected_before_append() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let service = FootprintService::new(AppConfig::rooted_at(dir.path())).unwrap();

    let result = service.submit(&form("Acme", "2024", "0"));
    assert!(matches!(
        result,
        Err(SubmitError::Validation(ValidationError::NonPositiveEfficiency))
    ));
    assert!(service.load_all().unwrap().rows().is_empty());
}

#[test]
fn repeated_submissions_accumulate() {
    let dir = tempfile::tempdir().unwrap();
    let service = FootprintService::new(AppConfig::rooted_at(dir.path())).unwrap();

    service.submit(&form("Zed", "2023", "20")).unwrap();
    service.submit(&form("Acme", "2024", "20")).unwrap();
    service.submit(&form("Acme", "2024", "10")).unwrap();

    let snapshot = service.load_all().unwrap();
    assert_eq!(snapshot.rows().len(), 3);

    let ordered: Vec<String> = history_table(&snapshot)
        .iter()
        .map(|r| format!("{} {}", r.name, r.year))
        .collect();
    assert_eq!(ordered, vec!["Acme 2024", "Acme 2024", "Zed 2023"]);

    // Chart bars follow year order and do not change between renders.
    let first = chart_data(&snapshot).unwrap();
    let second = chart_data(&service.load_all().unwrap()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].label, "Zed (2023)");
}

#[test]
fn non_numeric_total_is_left_out_of_the_report_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::rooted_at(dir.path());
    let service = FootprintService::new(config.clone()).unwrap();

    let outcome = service.submit(&form("Acme", "2024", "20")).unwrap();
    let mut ledger = fs::read_to_string(&config.ledger_path).unwrap();
    ledger.push_str("Broken,2024,1,1,1,not-a-number\n");
    fs::write(&config.ledger_path, ledger).unwrap();

    let snapshot = service.load_all().unwrap();
    assert_eq!(snapshot.rows().len(), 2);

    let layout = layout_report(
        &outcome.record,
        Ok(&snapshot),
        None,
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        &PageSetup::default(),
    );
    assert!(!layout.texts().any(|t| t == "Broken"));
    assert!(layout.texts().any(|t| t == "Average Total CO2: 61.08 kg"));

    let report = service.build_report(&outcome.record).unwrap();
    assert!(report.exists());
}

#[test]
fn removed_ledger_reads_as_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::rooted_at(dir.path());
    let service = FootprintService::new(config.clone()).unwrap();
    fs::remove_file(&config.ledger_path).unwrap();

    assert_eq!(service.load_all().unwrap(), LedgerSnapshot::NoData);
    assert!(matches!(service.render_chart(), ChartOutcome::Skipped(_)));
}

#[test]
fn unreadable_ledger_is_surfaced_as_a_notice() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::rooted_at(dir.path());
    // A header line that is not UTF-8 can be appended to but not read back.
    fs::write(&config.ledger_path, b"\xff\xfe\n").unwrap();
    let service = FootprintService::new(config.clone()).unwrap();

    let outcome = service.submit(&form("Acme", "2024", "20")).unwrap();
    assert!(service.load_all().is_err());
    assert!(
        outcome
            .notices
            .iter()
            .any(|n| n.starts_with("Historical data could not be read"))
    );
    let report = outcome.report.expect("report is still written");
    assert!(report.exists());
}

#[test]
fn ledger_path_that_is_a_directory_still_yields_a_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::rooted_at(dir.path());
    config.ledger_path = dir.path().join("ledger_dir");
    fs::create_dir_all(&config.ledger_path).unwrap();
    let service = FootprintService::new(config.clone()).unwrap();

    let record = service
        .compute(&form("Acme", "2024", "20").parse().unwrap())
        .unwrap();
    assert!(service.load_all().is_err());
    let report = service.build_report(&record).unwrap();
    assert_eq!(report, config.report_dir.join("Acme_2024_report.pdf"));
}
