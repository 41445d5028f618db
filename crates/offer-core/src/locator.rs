// crates/offer-core/src/locator.rs
use crate::key::{parse_composite_key, KeyError};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetName {
    Train,
    Test,
}

impl DatasetName {
    /// Lookup order: train rows come first in the concatenated output.
    pub const ALL: [DatasetName; 2] = [DatasetName::Train, DatasetName::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetName::Train => "train",
            DatasetName::Test => "test",
        }
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum LocatorError {
    /// File missing, unreadable, or not well-formed CSV. Never reported as
    /// "customer not found".
    #[error("read dataset {dataset} at {}", .path.display())]
    Read {
        dataset: DatasetName,
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("dataset {dataset} has no columns besides the row key")]
    NoColumns { dataset: DatasetName },

    #[error("dataset {dataset} data row {row}")]
    MalformedKey {
        dataset: DatasetName,
        row: usize,
        #[source]
        source: KeyError,
    },

    #[error("reshape dataset {dataset}")]
    Frame {
        dataset: DatasetName,
        #[source]
        source: PolarsError,
    },
}

/// Reads `<data_dir>/<dataset>.csv` and pulls out one customer's rows.
#[derive(Debug, Clone)]
pub struct DataLocator {
    data_dir: PathBuf,
}

impl DataLocator {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn dataset_path(&self, dataset: DatasetName) -> PathBuf {
        self.data_dir.join(format!("{dataset}.csv"))
    }

    /// All rows of `customer_id` in `dataset`.
    ///
    /// Output columns: the file's named columns in file order, then
    /// `customer_id`, `offer_id`, `order`, `dataset`. The raw key column (the
    /// first one) is dropped. Every row key in the file is validated,
    /// matching or not. Cells are kept as text exactly as written.
    pub fn load_customer_data(
        &self,
        customer_id: &str,
        dataset: DatasetName,
    ) -> Result<DataFrame, LocatorError> {
        let path = self.dataset_path(dataset);

        // schema inference over zero rows reads every column as String
        let raw = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.clone()))
            .and_then(|r| r.finish())
            .map_err(|source| LocatorError::Read {
                dataset,
                path,
                source,
            })?;

        if raw.width() < 2 {
            return Err(LocatorError::NoColumns { dataset });
        }

        let frame_err = |source| LocatorError::Frame { dataset, source };
        let (df, n_rows) = split_row_keys(raw, dataset)?;
        let df = df
            .lazy()
            .filter(col("customer_id").eq(lit(customer_id)))
            .collect()
            .map_err(frame_err)?;

        tracing::debug!(
            dataset = %dataset,
            customer_id,
            file_rows = n_rows,
            rows = df.height(),
            "load_customer_data"
        );
        Ok(df)
    }
}

/// Replaces the leading key column with `customer_id`, `offer_id`, `order`
/// and appends the `dataset` tag.
fn split_row_keys(
    mut df: DataFrame,
    dataset: DatasetName,
) -> Result<(DataFrame, usize), LocatorError> {
    let frame_err = |source| LocatorError::Frame { dataset, source };
    let n = df.height();

    let key_col = df.get_columns()[0].name().clone();
    let mut customers = Vec::with_capacity(n);
    let mut offers = Vec::with_capacity(n);
    let mut orders = Vec::with_capacity(n);
    {
        let keys = df.column(&key_col).and_then(|c| c.str()).map_err(frame_err)?;
        for (row, raw) in keys.into_iter().enumerate() {
            let key = parse_composite_key(raw.unwrap_or_default())
                .map_err(|source| LocatorError::MalformedKey { dataset, row, source })?;
            customers.push(key.customer_id);
            offers.push(key.offer_id);
            orders.push(key.order);
        }
    }

    df = df.drop(&key_col).map_err(frame_err)?;
    df.with_column(Series::new("customer_id".into(), customers))
        .and_then(|df| df.with_column(Series::new("offer_id".into(), offers)))
        .and_then(|df| df.with_column(Series::new("order".into(), orders)))
        .and_then(|df| df.with_column(Series::new("dataset".into(), vec![dataset.as_str(); n])))
        .map_err(frame_err)?;
    Ok((df, n))
}
