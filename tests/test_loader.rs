//! Integration tests for file ingestion and dataset transformations

use explainml::dataset::{sanitize_column_name, ColumnKind, DataLoader};
use explainml::prelude::*;
use std::io::Write;

fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_sanitize_column_name() {
    assert_eq!(sanitize_column_name("Fare ($)"), "Fare____");
    assert_eq!(sanitize_column_name("already_clean_1"), "already_clean_1");
}

#[test]
fn test_tsv_is_read_with_tabs() {
    let file = write_file(".tsv", "a\tb\n1\tx\n2\ty\n3\tx\n");
    let dataset = DataLoader::new().load(file.path()).unwrap();
    assert_eq!(dataset.n_cols(), 2);
    assert_eq!(dataset.column("a").unwrap().kind(), ColumnKind::Numeric);
    assert_eq!(dataset.column("b").unwrap().kind(), ColumnKind::Categorical);
}

#[test]
fn test_raw_names_kept_when_asked() {
    let file = write_file(".csv", "my col,y\n1,0\n2,1\n");
    let dataset = DataLoader::new().with_sanitize_names(false).load(file.path()).unwrap();
    assert!(dataset.column("my col").is_some());
}

#[test]
fn test_loaded_csv_diagnoses_end_to_end() {
    let mut csv = String::from("Passenger Age,Fare,Sex,Survived\n");
    for i in 0..60 {
        let age = 18 + (i * 7) % 50;
        let fare = 5.0 + ((i * 13) % 40) as f64 * 1.5;
        let sex = if i % 2 == 0 { "male" } else { "female" };
        let survived = usize::from(i % 3 == 0);
        csv.push_str(&format!("{},{},{},{}\n", age, fare, sex, survived));
    }
    let file = write_file(".csv", &csv);

    let dataset = DataLoader::new().load(file.path()).unwrap();
    assert!(dataset.column("Passenger_Age").is_some());

    let pipeline = DiagnosisPipeline::new(DiagnosisConfig::new().with_n_estimators(10));
    let bundle = pipeline.run(&dataset, "Survived", &NullSink).unwrap();
    assert_eq!(bundle.task_type, TaskType::Classification);
    assert!(bundle.leaderboard.is_some());
    assert!(
        bundle.fairness.iter().any(|f| f.attribute == "Sex"),
        "binary text column should be scanned for fairness"
    );
}

#[test]
fn test_drop_missing_target_and_split() {
    let dataset = Dataset::new(vec![
        Column::from_f64("x", &[1.0, 2.0, 3.0]),
        Column::numeric("y", vec![Some(0.0), None, Some(1.0)]),
    ])
    .unwrap();
    let (clean, dropped) = dataset.drop_missing_target("y").unwrap();
    assert_eq!(dropped, 1);
    assert_eq!(clean.n_rows(), 2);

    let (features, target) = clean.split_target("y").unwrap();
    assert_eq!(features.column_names(), vec!["x"]);
    assert_eq!(target.name(), "y");
    assert_eq!(dataset.n_rows(), 3, "source dataset is untouched");
}
