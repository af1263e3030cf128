//! The error taxonomy the core uses to decide how to react to a failure:
//! retry locally, report in the protocol envelope, close the connection, or
//! refuse to start.

use thiserror::Error;

/// A classified failure. Wire handlers match on this to decide whether to
/// keep serving, abort the response, or refuse startup outright.
#[derive(Debug, Error)]
pub enum CoreError {
    /// BUSY/LOCKED on the store, surfaced only once the retry budget
    /// ([`crate::store::retry`]) is exhausted.
    #[error("store busy: retry budget exhausted after {attempts} attempts")]
    StoreBusy { attempts: u32 },

    /// Bad predicate, bad URI, oversized LIKE pattern, bad ESCAPE clause.
    /// Reported in the protocol envelope with a non-zero errorcode; the
    /// connection stays open.
    #[error("malformed client request: {0}")]
    ClientMalformed(String),

    /// TLV length overrun, bad type width, nesting too deep. The connection
    /// is closed after a best-effort diagnostic.
    #[error("malformed TLV framing: {0}")]
    ProtocolFraming(String),

    /// Schema version mismatch or corrupt catalog. Fatal at startup.
    #[error("catalog integrity error: {0}")]
    Integrity(String),

    /// A collaborator outside the core's scope (scanner, transcoder)
    /// failed. Logged; the handler returns a 500-class protocol error.
    #[error("external collaborator failed: {0}")]
    External(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Catch-all for rusqlite errors that don't fit a more specific bucket.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// The numeric `errorcode` carried in the TLV/XML status envelope.
    /// 0 means success; these are otherwise arbitrary but stable within
    /// this implementation.
    pub fn wire_code(&self) -> u32 {
        match self {
            CoreError::StoreBusy { .. } => 503,
            CoreError::ClientMalformed(_) => 400,
            CoreError::ProtocolFraming(_) => 400,
            CoreError::Integrity(_) => 500,
            CoreError::External(_) => 500,
            CoreError::Sqlite(_) => 500,
            CoreError::Io(_) => 500,
        }
    }

    /// Whether the connection should be closed after reporting this error.
    /// `ClientMalformed` keeps the connection open (per §7); everything
    /// else is presumed unrecoverable for the current exchange.
    pub fn closes_connection(&self) -> bool {
        !matches!(self, CoreError::ClientMalformed(_) | CoreError::StoreBusy { .. })
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
