//! Bounded exponential-backoff retry around statement execution, so a short
//! write burst from the scanner thread doesn't fail a concurrent
//! user-facing read. Grounded in `original_source/src/db_utils.h`'s
//! `dbutils_blocking_step`/`dbutils_exec` contract, whose backoff constants
//! aren't present in the retrieved source — the schedule below is this
//! implementation's own choice, recorded in DESIGN.md.

use std::thread;
use std::time::{Duration, Instant};

use rusqlite::{Connection, ErrorCode};

use crate::error::CoreError;

const INITIAL_BACKOFF: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_millis(200);
const TOTAL_BUDGET: Duration = Duration::from_secs(5);

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Retries `op` on BUSY/LOCKED with exponential backoff until `TOTAL_BUDGET`
/// elapses, then surfaces [`CoreError::StoreBusy`].
pub fn with_retry<T>(mut op: impl FnMut() -> rusqlite::Result<T>) -> Result<T, CoreError> {
    let start = Instant::now();
    let mut backoff = INITIAL_BACKOFF;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_busy(&e) => {
                if start.elapsed() >= TOTAL_BUDGET {
                    return Err(CoreError::StoreBusy { attempts });
                }
                thread::sleep(backoff);
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// `exec(query)`: run a statement with no result rows, retrying on BUSY.
pub fn exec(conn: &Connection, sql: &str) -> Result<usize, CoreError> {
    with_retry(|| conn.execute(sql, []))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn succeeds_immediately_when_op_succeeds() {
        let result: Result<i32, CoreError> = with_retry(|| Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn propagates_non_busy_errors_without_retry() {
        let mut calls = 0;
        let result: Result<(), CoreError> = with_retry(|| {
            calls += 1;
            Err(rusqlite::Error::InvalidQuery)
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
