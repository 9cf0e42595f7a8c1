use chrono::Utc;

/// Current wall-clock time as epoch milliseconds.
///
/// All persisted timestamps (order_date, last_adjustment_update) use this
/// representation so SQLite and Postgres rows read back identically.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
