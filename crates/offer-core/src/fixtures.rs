//! Test data shared by the unit tests: full-schema CSVs and a one-split forest.

use crate::model::{ForestArtifact, ForestModel, TreeArrays};
use crate::schema::{FEAT_COLS, SCHEMA_VERSION};

use std::fs;
use std::sync::OnceLock;
use tempfile::TempDir;

pub fn feature_names() -> Vec<String> {
    FEAT_COLS.iter().map(|s| s.to_string()).collect()
}

pub fn feature_names_static() -> &'static [String] {
    static NAMES: OnceLock<Vec<String>> = OnceLock::new();
    NAMES.get_or_init(feature_names)
}

pub fn csv_header() -> String {
    format!(",{},target", FEAT_COLS.join(","))
}

/// `recurrence` carries `split`; feature `k` is written as `"{k}.5"`.
pub fn csv_row(key: &str, split: f64) -> String {
    let mut cells = vec![key.to_string(), split.to_string()];
    cells.extend((1..FEAT_COLS.len()).map(|k| format!("{k}.5")));
    cells.push("1".to_string());
    cells.join(",")
}

pub fn write_dataset(dir: &TempDir, name: &str, rows: &[(&str, f64)]) {
    let mut body = csv_header();
    body.push('\n');
    for (key, split) in rows {
        body.push_str(&csv_row(key, *split));
        body.push('\n');
    }
    fs::write(dir.path().join(format!("{name}.csv")), body).unwrap();
}

pub fn data_dir(train: &[(&str, f64)], test: &[(&str, f64)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(&dir, "train", train);
    write_dataset(&dir, "test", test);
    dir
}

/// Splits on `recurrence <= 0.5`: left (0.8, 0.2, 0.0), right (0.0, 0.25, 0.75).
pub fn artifact_with_names(feature_names: Vec<String>) -> ForestArtifact {
    ForestArtifact {
        schema_version: SCHEMA_VERSION,
        n_classes: 3,
        feature_names,
        trees: vec![TreeArrays {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![0.5, -2.0, -2.0],
            value: vec![vec![5.0, 3.0, 2.0], vec![8.0, 2.0, 0.0], vec![0.0, 1.0, 3.0]],
        }],
    }
}

pub fn artifact() -> ForestArtifact {
    artifact_with_names(feature_names())
}

pub fn forest_with_names(feature_names: Vec<String>) -> ForestModel {
    ForestModel::from_artifact(&artifact_with_names(feature_names)).unwrap()
}

pub fn forest() -> ForestModel {
    forest_with_names(feature_names())
}
