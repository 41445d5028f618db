//! Customer offer lookup: locate a customer's pre-processed rows, score them
//! with the fitted forest, and lay the result out for display.

pub mod config;
pub mod inference;
pub mod key;
pub mod locator;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod util;

#[cfg(test)]
mod fixtures;

pub use inference::{run_model, InferenceError, Outcome, Prediction};
pub use locator::{DataLocator, DatasetName};
pub use model::{ForestModel, ProbaModel};
pub use pipeline::AppCore;
