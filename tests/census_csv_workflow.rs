//! Integration tests for the census CSV workflow
//!
//! A synthetic tract table is written to a temporary file, loaded back, and
//! pushed through all three analyses.

use std::io::Write;

use tempfile::NamedTempFile;
use tract_appreciation::{
    analyze_home_value_trend, analyze_poverty_regression, analyze_power_law, AppreciationError,
    CensusTable, DataError, StudyConfig, StudyRng,
};

const HEADER: &str = "GISJOIN,STATE,TRACTA,poverty_rate,race_white,race_asian_pacific_islander,\
housing_occupied,occupancy_rate,total_housing_units,median_home_value_1990,2019-23_value,\
home_value_ratio_2019_23_to_1990";

/// Write `n` synthetic tracts plus two incomplete rows.
fn write_census_csv(n: usize, seed: u64) -> NamedTempFile {
    let mut rng = StudyRng::with_seed(seed);
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();

    for i in 0..n {
        let poverty = rng.uniform(0.02, 0.4);
        let white = rng.uniform(0.2, 0.9);
        let asian = rng.uniform(0.0, 0.3);
        let occupied = rng.uniform(400.0, 3000.0).round();
        let occupancy = rng.uniform(0.85, 0.99);
        let total = (occupied / occupancy).round() + rng.uniform(0.0, 20.0).round();
        let value_1990 = rng.uniform(80_000.0, 400_000.0).round();
        let ratio = 1.5 * (1.0 - rng.f64()).powf(-1.0 / 2.0) - 0.6 * poverty;
        let value_2023 = (value_1990 * ratio).round();
        writeln!(
            file,
            "\"G06{:07}\",California,{:06},{},{},{},{},{},{},{},{},{}",
            i,
            i * 100,
            poverty,
            white,
            asian,
            occupied,
            occupancy,
            total,
            value_1990,
            value_2023,
            value_2023 / value_1990
        )
        .unwrap();
    }
    writeln!(file, "G069999998,California,999998,0.1,0.5,0.1,,0.9,100,150000,,").unwrap();
    writeln!(file, "G069999999,California,999999,0.1,0.5,0.1,90,0.9,100,,,NA").unwrap();
    file.flush().unwrap();
    file
}

/// Test scenario: loading, column access and row filtering
#[test]
fn test_load_census_table() {
    let file = write_census_csv(40, 1);
    let table = CensusTable::from_path(file.path()).unwrap();

    assert_eq!(table.len(), 42);
    assert_eq!(table.headers().len(), 12);
    assert_eq!(table.appreciation_ratios().unwrap().len(), 40);

    let panel = table.home_value_panel().unwrap();
    assert_eq!(panel.len(), 81);
    assert_eq!(panel.years.iter().filter(|&&y| y == 1990.0).count(), 41);

    let frame = table
        .regression_frame("home_value_ratio_2019_23_to_1990", &["poverty_rate", "housing_occupied"])
        .unwrap();
    assert_eq!(frame.len(), 40);
    assert_eq!(frame.dropped_rows, 2);
}

/// Test scenario: a missing file surfaces as an I/O error
#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = CensusTable::from_path(dir.path().join("absent.csv"));
    assert!(matches!(result, Err(DataError::Io { .. })));
}

/// Test scenario: the analyses run end to end on the loaded table
#[test]
fn test_analyses_on_census_table() {
    let file = write_census_csv(120, 7);
    let table = CensusTable::from_path(file.path()).unwrap();
    let config = StudyConfig::quick().with_seed(42);

    let ratios = table.appreciation_ratios().unwrap();
    let power_law = analyze_power_law(&ratios, &config).unwrap();
    assert_eq!(power_law.summary.count, 120);
    assert!(power_law.model.alpha > 1.0);
    assert!((0.0..=1.0).contains(&power_law.test.p_value));
    assert_eq!(power_law.test.null_distribution.len(), config.monte_carlo_replicates);

    let panel = table.home_value_panel().unwrap();
    let trend = analyze_home_value_trend(&panel.years, &panel.values, &config).unwrap();
    assert_eq!(trend.curve.points, vec![1990.0, 2021.0]);
    assert!(trend.curve.estimates[1] > trend.curve.estimates[0]);

    let regression = analyze_poverty_regression(&table, &config).unwrap();
    assert_eq!(regression.fit.names.len(), 8);
    assert_eq!(regression.fit.names[1], "poverty_rate");
    assert_eq!(regression.dropped_rows, 2);
    assert_eq!(regression.permutation.permuted.len(), config.permutations);
    assert!(regression.to_string().contains("Permutation p-value"));
}

/// Test scenario: the trend curve round-trips through CSV
#[test]
fn test_trend_curve_csv_export() {
    let file = write_census_csv(30, 3);
    let table = CensusTable::from_path(file.path()).unwrap();
    let panel = table.home_value_panel().unwrap();
    let trend = analyze_home_value_trend(&panel.years, &panel.values, &StudyConfig::quick().with_seed(5))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("curve.csv");
    trend.write_csv_file(&path).unwrap();

    let exported = CensusTable::from_path(&path).unwrap();
    assert_eq!(exported.headers(), &["year", "estimate", "lower", "upper"]);
    let years: Vec<f64> = exported.numeric_column("year").unwrap().into_iter().flatten().collect();
    assert_eq!(years, vec![1990.0, 2021.0]);
    let lower = exported.numeric_column("lower").unwrap();
    let upper = exported.numeric_column("upper").unwrap();
    for (l, u) in lower.iter().zip(&upper) {
        assert!(l.unwrap() <= u.unwrap());
    }
}

/// Test scenario: a table without the regression columns fails cleanly
#[test]
fn test_missing_regression_column() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "home_value_ratio_2019_23_to_1990,poverty_rate").unwrap();
    writeln!(file, "2.0,0.1").unwrap();
    let table = CensusTable::from_path(file.path()).unwrap();

    match analyze_poverty_regression(&table, &StudyConfig::quick()) {
        Err(AppreciationError::DataError(DataError::MissingColumn { name })) => {
            assert_eq!(name, "race_white");
        }
        other => panic!("Expected MissingColumn, got {:?}", other),
    }
}
