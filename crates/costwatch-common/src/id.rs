//! Snowflake ids for teams, records, anomalies and insights.

use snowflake::SnowflakeIdBucket;
use std::sync::{Mutex, MutexGuard};

const DEFAULT_MACHINE: i32 = 1;
const DEFAULT_NODE: i32 = 1;

static BUCKET: Mutex<Option<SnowflakeIdBucket>> = Mutex::new(None);

fn bucket() -> MutexGuard<'static, Option<SnowflakeIdBucket>> {
    BUCKET.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sets the machine and node parts of future ids. Both must be in `0..=31`.
///
/// Calling this is optional; without it ids use machine 1, node 1.
pub fn init(machine_id: i32, node_id: i32) {
    *bucket() = Some(SnowflakeIdBucket::new(machine_id, node_id));
}

/// Next id as a decimal string.
pub fn next_id() -> String {
    bucket()
        .get_or_insert_with(|| SnowflakeIdBucket::new(DEFAULT_MACHINE, DEFAULT_NODE))
        .get_id()
        .to_string()
}
