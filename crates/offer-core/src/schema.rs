// crates/offer-core/src/schema.rs
use thiserror::Error;

/// Bumped whenever `FEAT_COLS` changes. Model artifacts carry the version
/// they were fitted against.
pub const SCHEMA_VERSION: u32 = 1;

pub const INDEX_COLS: [&str; 4] = ["dataset", "customer_id", "offer_id", "order"];

/// Model input, in fit order.
pub const FEAT_COLS: [&str; 47] = [
    "recurrence",
    "time",
    "amount",
    "total_trans_amount",
    "total_trans_count",
    "avg_trans_amount",
    "time_after_last_trans",
    "web",
    "mobile",
    "social",
    "was_null_profile",
    "oft_bogo",
    "oft_discount",
    "dfc_5",
    "dfc_10",
    "delta_3",
    "delta_4",
    "delta_5",
    "delta_7",
    "delta_10",
    "rw_0",
    "rw_2",
    "rw_3",
    "rw_5",
    "rw_10",
    "member_new",
    "member_old",
    "gen_F",
    "gen_O",
    "age_18_23",
    "age_24_29",
    "age_30_35",
    "age_36_41",
    "age_42_47",
    "age_48_53",
    "age_53_59",
    "age_60_65",
    "age_66_71",
    "age_72_77",
    "age_78_83",
    "age_84_101",
    "income_30k_40k",
    "income_40k_50k",
    "income_50k_60k",
    "income_60k_75k",
    "income_75k_100k",
    "income_100k_120k",
];

pub const PROB_COLS: [&str; 3] = ["prob_c0", "prob_c1", "prob_c2"];

pub const TARGET_COLS: [&str; 1] = ["target"];

/// Column order of the pre-transpose output table.
pub fn output_columns() -> Vec<&'static str> {
    INDEX_COLS
        .iter()
        .chain(FEAT_COLS.iter())
        .chain(PROB_COLS.iter())
        .chain(TARGET_COLS.iter())
        .copied()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("model expects {got} features, serving schema has {expected}")]
    Length { expected: usize, got: usize },

    #[error("feature #{position} mismatch: serving schema has {expected:?}, model has {got:?}")]
    Name {
        position: usize,
        expected: String,
        got: String,
    },

    #[error("model artifact schema_version={got}, serving schema_version={expected}")]
    Version { expected: u32, got: u32 },
}

/// Checks that `model_features` is exactly `FEAT_COLS`, order included.
pub fn ensure_feature_schema<S: AsRef<str>>(model_features: &[S]) -> Result<(), SchemaError> {
    if model_features.len() != FEAT_COLS.len() {
        return Err(SchemaError::Length {
            expected: FEAT_COLS.len(),
            got: model_features.len(),
        });
    }
    for (position, (want, got)) in FEAT_COLS.iter().zip(model_features).enumerate() {
        if *want != got.as_ref() {
            return Err(SchemaError::Name {
                position,
                expected: want.to_string(),
                got: got.as_ref().to_string(),
            });
        }
    }
    Ok(())
}

pub fn ensure_schema_version(got: u32) -> Result<(), SchemaError> {
    if got != SCHEMA_VERSION {
        return Err(SchemaError::Version {
            expected: SCHEMA_VERSION,
            got,
        });
    }
    Ok(())
}
