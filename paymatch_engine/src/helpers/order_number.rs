use chrono::{DateTime, Utc};
use rand::Rng;

use crate::db_types::OrderNumber;

/// Generates an order number: the UTC creation time as `YYYYMMDDHHMMSS` followed by six random decimal digits.
///
/// These are not guaranteed to be unique. Storage enforces uniqueness and the ledger draws a new number on conflict.
pub fn new_order_number(now: DateTime<Utc>) -> OrderNumber {
    let suffix = rand::thread_rng().gen_range(0..1_000_000u32);
    OrderNumber(format!("{}{suffix:06}", now.format("%Y%m%d%H%M%S")))
}
