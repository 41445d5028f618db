// crates/offer-core/src/key.rs
use thiserror::Error;

/// Separator used when the preprocessing step packed the row key.
pub const KEY_DELIMITER: char = '-';

/// `customer_id-offer_id-order`, as stored in the unnamed index column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeKey {
    pub customer_id: String,
    pub offer_id: String,
    pub order: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed row key {raw:?}: expected 3 '-'-separated parts, got {parts}")]
pub struct KeyError {
    pub raw: String,
    pub parts: usize,
}

pub fn parse_composite_key(raw: &str) -> Result<CompositeKey, KeyError> {
    let mut it = raw.split(KEY_DELIMITER);
    match (it.next(), it.next(), it.next(), it.next()) {
        (Some(customer_id), Some(offer_id), Some(order), None) => Ok(CompositeKey {
            customer_id: customer_id.to_string(),
            offer_id: offer_id.to_string(),
            order: order.to_string(),
        }),
        _ => Err(KeyError {
            raw: raw.to_string(),
            parts: raw.split(KEY_DELIMITER).count(),
        }),
    }
}
