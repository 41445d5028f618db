// crates/offer-core/src/inference.rs
use crate::locator::{DataLocator, DatasetName, LocatorError};
use crate::model::{ProbaModel, N_CLASSES};
use crate::schema::{
    ensure_feature_schema, output_columns, SchemaError, FEAT_COLS, INDEX_COLS, PROB_COLS,
    TARGET_COLS,
};
use crate::table::DisplayTable;
use crate::util::now_us;

use ndarray::Array2;
use polars::prelude::*;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Locate(#[from] LocatorError),

    #[error("dataset {dataset} has no column {column:?}")]
    MissingColumn {
        dataset: DatasetName,
        column: &'static str,
    },

    #[error("feature schema mismatch")]
    Schema(#[from] SchemaError),

    #[error("feature {column:?} of sample {row} is not a finite number: {value:?}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("assemble output table")]
    Frame(#[from] PolarsError),

    #[error("model prediction failed: {0:#}")]
    Model(anyhow::Error),

    #[error("model returned {got_rows}x{got_cols} probabilities for {rows} samples, expected {} per sample", N_CLASSES)]
    ModelShape {
        rows: usize,
        got_rows: usize,
        got_cols: usize,
    },
}

/// Result of one customer lookup.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The customer has no rows in any dataset.
    NoData,
    Found(Prediction),
}

impl Outcome {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Outcome::NoData)
    }

    pub fn into_table(self) -> Option<DisplayTable> {
        match self {
            Outcome::NoData => None,
            Outcome::Found(p) => Some(p.table),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Prediction {
    /// Transposed: one column per sample, one row per field.
    pub table: DisplayTable,
    /// `(n_samples, N_CLASSES)`, rows in display-column order.
    pub probabilities: Array2<f64>,
    /// Stage timings, microseconds.
    pub locate_us: u64,
    pub predict_us: u64,
}

impl Prediction {
    pub fn n_samples(&self) -> usize {
        self.probabilities.nrows()
    }
}

/// `"<dataset>_sample_no: <n>"`, `n` being the position in the
/// concatenated frame.
pub fn sample_label(dataset: &str, n: usize) -> String {
    format!("{dataset}_sample_no: {n}")
}

/// Looks `customer_id` up in every dataset and scores the matching rows.
pub fn run_model(
    model: &dyn ProbaModel,
    locator: &DataLocator,
    customer_id: &str,
) -> Result<Outcome, InferenceError> {
    let t_locate = Instant::now();
    let mut parts = Vec::with_capacity(DatasetName::ALL.len());
    for ds in DatasetName::ALL {
        let df = locator.load_customer_data(customer_id, ds)?;
        ensure_columns(&df, ds)?;
        parts.push(df.lazy());
    }
    let mut df = concat_lf_diagonal(parts, UnionArgs::default())?.collect()?;
    let locate_us = now_us(t_locate);

    if df.height() == 0 {
        return Ok(Outcome::NoData);
    }

    ensure_feature_schema(model.feature_names())?;

    let t_predict = Instant::now();
    let x = feature_matrix(&df)?;
    let proba = model.predict_proba(x.view()).map_err(InferenceError::Model)?;
    let (got_rows, got_cols) = proba.dim();
    if (got_rows, got_cols) != (x.nrows(), N_CLASSES) {
        return Err(InferenceError::ModelShape {
            rows: x.nrows(),
            got_rows,
            got_cols,
        });
    }
    let predict_us = now_us(t_predict);

    for (k, name) in PROB_COLS.iter().enumerate() {
        let values: Vec<String> = proba.column(k).iter().map(f64::to_string).collect();
        df.with_column(Series::new((*name).into(), values))?;
    }

    let out = df.select(output_columns())?;
    let labels = out
        .column("dataset")?
        .str()?
        .into_iter()
        .enumerate()
        .map(|(n, ds)| sample_label(ds.unwrap_or_default(), n))
        .collect();

    Ok(Outcome::Found(Prediction {
        table: DisplayTable::from_frame(out, labels)?,
        probabilities: proba,
        locate_us,
        predict_us,
    }))
}

/// Every dataset must carry the index, feature and target columns, whether
/// or not the customer has rows in it.
fn ensure_columns(df: &DataFrame, dataset: DatasetName) -> Result<(), InferenceError> {
    let required = INDEX_COLS.iter().chain(&FEAT_COLS).chain(&TARGET_COLS);
    match required.copied().find(|c| df.get_column_index(c).is_none()) {
        Some(column) => Err(InferenceError::MissingColumn { dataset, column }),
        None => Ok(()),
    }
}

/// `FEAT_COLS` in order, one row per sample.
fn feature_matrix(df: &DataFrame) -> Result<Array2<f64>, InferenceError> {
    let mut x = Array2::zeros((df.height(), FEAT_COLS.len()));
    for (j, column) in FEAT_COLS.iter().enumerate() {
        let cells = df.column(column)?.str()?;
        for (row, v) in cells.into_iter().enumerate() {
            let v = v.unwrap_or_default();
            x[[row, j]] = v
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| InferenceError::NonNumeric {
                    column: column.to_string(),
                    row,
                    value: v.to_string(),
                })?;
        }
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::schema::INDEX_COLS;

    #[test]
    fn test_unknown_customer_is_no_data() {
        let dir = fixtures::data_dir(&[("A1-O1-0", 0.0)], &[("B2-O1-0", 1.0)]);
        let model = fixtures::forest();
        let loc = DataLocator::new(dir.path());

        let out = run_model(&model, &loc, "ZZZ").unwrap();
        assert!(out.is_no_data());
        assert!(out.into_table().is_none());
    }

    #[test]
    fn test_single_train_match_layout() {
        let dir = fixtures::data_dir(&[("A1-O2-0", 0.0), ("B7-O2-0", 1.0)], &[("B7-O3-0", 1.0)]);
        let model = fixtures::forest();
        let loc = DataLocator::new(dir.path());

        let out = run_model(&model, &loc, "A1").unwrap();
        let Outcome::Found(p) = out else {
            panic!("expected a prediction");
        };
        assert_eq!(p.n_samples(), 1);
        assert_eq!(p.table.columns(), &["train_sample_no: 0".to_string()]);
        assert_eq!(p.table.n_rows(), 4 + 47 + 3 + 1);

        let rows: Vec<&str> = p.table.index().iter().map(String::as_str).collect();
        assert_eq!(rows, output_columns());
        assert_eq!(&rows[..4], &INDEX_COLS);

        let col = "train_sample_no: 0";
        assert_eq!(p.table.get("dataset", col), Some("train"));
        assert_eq!(p.table.get("customer_id", col), Some("A1"));
        assert_eq!(p.table.get("offer_id", col), Some("O2"));
        assert_eq!(p.table.get("order", col), Some("0"));
        assert_eq!(p.table.get("target", col), Some("1"));
    }

    #[test]
    fn test_probabilities_are_distributions() {
        let dir = fixtures::data_dir(
            &[("A1-O1-0", 0.0), ("A1-O2-1", 1.0)],
            &[("A1-O3-0", 0.25), ("C3-O3-0", 1.0)],
        );
        let model = fixtures::forest();
        let loc = DataLocator::new(dir.path());

        let Outcome::Found(p) = run_model(&model, &loc, "A1").unwrap() else {
            panic!("expected a prediction");
        };
        assert_eq!(p.n_samples(), 3);
        for probs in p.probabilities.rows() {
            assert!(probs.iter().all(|x| (0.0..=1.0).contains(x)));
            assert!((probs.sum() - 1.0).abs() < 1e-9);
        }

        // recurrence 0.0 -> left leaf, 1.0 -> right leaf
        assert!((p.probabilities[[0, 0]] - 0.8).abs() < 1e-12);
        assert!((p.probabilities[[1, 2]] - 0.75).abs() < 1e-12);

        let shown = p.table.get("prob_c0", "train_sample_no: 0").unwrap();
        assert!((shown.parse::<f64>().unwrap() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_labels_follow_concatenated_position() {
        let dir = fixtures::data_dir(
            &[("A1-O1-0", 0.0), ("A1-O2-1", 1.0)],
            &[("A1-O3-0", 0.0)],
        );
        let model = fixtures::forest();
        let loc = DataLocator::new(dir.path());

        let table = run_model(&model, &loc, "A1").unwrap().into_table().unwrap();
        assert_eq!(
            table.columns(),
            &[
                "train_sample_no: 0".to_string(),
                "train_sample_no: 1".to_string(),
                "test_sample_no: 2".to_string(),
            ]
        );
        assert_eq!(table.get("offer_id", "test_sample_no: 2"), Some("O3"));
    }

    #[test]
    fn test_feature_values_pass_through_unchanged() {
        let dir = fixtures::data_dir(&[("A1-O1-0", 0.0)], &[]);
        let model = fixtures::forest();
        let loc = DataLocator::new(dir.path());

        let table = run_model(&model, &loc, "A1").unwrap().into_table().unwrap();
        // fixtures write feature k as "k.5" except the split feature
        assert_eq!(table.get("amount", "train_sample_no: 0"), Some("2.5"));
        assert_eq!(table.get("income_100k_120k", "train_sample_no: 0"), Some("46.5"));
    }

    #[test]
    fn test_model_schema_mismatch_fails() {
        let dir = fixtures::data_dir(&[("A1-O1-0", 0.0)], &[]);
        let mut names = fixtures::feature_names();
        names.swap(3, 4);
        let model = fixtures::forest_with_names(names);
        let loc = DataLocator::new(dir.path());

        let err = run_model(&model, &loc, "A1").unwrap_err();
        assert!(matches!(
            err,
            InferenceError::Schema(SchemaError::Name { position: 3, .. })
        ));
    }

    #[test]
    fn test_schema_is_not_checked_for_no_data() {
        let dir = fixtures::data_dir(&[("A1-O1-0", 0.0)], &[]);
        let model = fixtures::forest_with_names(vec!["only_one".into()]);
        let loc = DataLocator::new(dir.path());
        assert!(run_model(&model, &loc, "ZZZ").unwrap().is_no_data());
    }

    #[test]
    fn test_non_numeric_feature_fails() {
        let dir = tempfile::tempdir().unwrap();
        let header = fixtures::csv_header();
        let mut row = fixtures::csv_row("A1-O1-0", 0.0);
        row = row.replacen(",2.5,", ",,", 1);
        std::fs::write(dir.path().join("train.csv"), format!("{header}\n{row}\n")).unwrap();
        std::fs::write(dir.path().join("test.csv"), format!("{header}\n")).unwrap();

        let model = fixtures::forest();
        let loc = DataLocator::new(dir.path());
        match run_model(&model, &loc, "A1") {
            Err(InferenceError::NonNumeric { column, row, value }) => {
                assert_eq!(column, "amount");
                assert_eq!(row, 0);
                assert_eq!(value, "");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_missing_test_dataset_is_an_error_not_no_data() {
        let dir = fixtures::data_dir(&[("A1-O1-0", 0.0)], &[]);
        std::fs::remove_file(dir.path().join("test.csv")).unwrap();
        let model = fixtures::forest();
        let loc = DataLocator::new(dir.path());

        assert!(matches!(
            run_model(&model, &loc, "ZZZ"),
            Err(InferenceError::Locate(LocatorError::Read {
                dataset: DatasetName::Test,
                ..
            }))
        ));
    }

    #[test]
    fn test_dataset_missing_feature_column_fails() {
        let dir = fixtures::data_dir(&[("A1-O1-0", 0.0)], &[]);
        let header = fixtures::csv_header().replacen(",amount,", ",", 1);
        let row = fixtures::csv_row("A1-O2-0", 0.0).replacen(",2.5,", ",", 1);
        std::fs::write(dir.path().join("test.csv"), format!("{header}\n{row}\n")).unwrap();

        let model = fixtures::forest();
        let loc = DataLocator::new(dir.path());
        match run_model(&model, &loc, "A1") {
            Err(InferenceError::MissingColumn { dataset, column }) => {
                assert_eq!(dataset, DatasetName::Test);
                assert_eq!(column, "amount");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_dataset_missing_target_fails_without_matching_rows() {
        let dir = fixtures::data_dir(&[("A1-O1-0", 0.0)], &[]);
        let header = fixtures::csv_header();
        let header = header.strip_suffix(",target").unwrap();
        std::fs::write(dir.path().join("test.csv"), format!("{header}\n")).unwrap();

        let model = fixtures::forest();
        let loc = DataLocator::new(dir.path());
        assert!(matches!(
            run_model(&model, &loc, "A1"),
            Err(InferenceError::MissingColumn {
                dataset: DatasetName::Test,
                column: "target"
            })
        ));
    }

    #[derive(Debug)]
    struct Lopsided;

    impl ProbaModel for Lopsided {
        fn feature_names(&self) -> &[String] {
            fixtures::feature_names_static()
        }
        fn n_classes(&self) -> usize {
            2
        }
        fn predict_proba(&self, x: ndarray::ArrayView2<'_, f64>) -> anyhow::Result<Array2<f64>> {
            Ok(Array2::from_elem((x.nrows(), 2), 0.5))
        }
    }

    #[test]
    fn test_model_output_shape_is_checked() {
        let dir = fixtures::data_dir(&[("A1-O1-0", 0.0)], &[]);
        let loc = DataLocator::new(dir.path());
        assert!(matches!(
            run_model(&Lopsided, &loc, "A1"),
            Err(InferenceError::ModelShape { rows: 1, got_rows: 1, got_cols: 2 })
        ));
    }
}
