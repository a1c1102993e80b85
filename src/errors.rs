//! Error types for the PEWS client.
//!
//! Uses `thiserror` for library-style error definitions. Every variant here
//! corresponds to one row of the error-disposition table: the poll loop
//! matches on these to decide whether to skip a tick, schedule a tide
//! refresh, or surface the failure.

use thiserror::Error;

/// Errors that can occur while fetching or decoding PEWS snapshots.
#[derive(Error, Debug)]
pub enum PewsError {
    /// HTTP transport failure (connect refused, TLS, DNS, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-200 response from the data endpoint.
    #[error("PEWS endpoint returned HTTP {0}")]
    HttpStatus(u16),

    /// Request exceeded the 1-second timeout budget.
    #[error("request timed out")]
    Timeout,

    /// The `ST` tide-sync header was missing or unparseable.
    #[error("tide header missing or unparseable, keeping previous tide")]
    TideStale,

    /// Fewer bits were available than the header/trailer require.
    #[error("frame too short: need at least {needed} bits, got {got}")]
    FrameTooShort { needed: usize, got: usize },

    /// The header bit pattern matched none of the three phase rules.
    #[error("header bits do not decode to a known phase")]
    PhaseUndecodable,

    /// A decoded station frame was smaller than the established table.
    #[error("decoded station table shrank to {got} entries (had {had})")]
    StationTableShrink { had: usize, got: usize },

    /// A bit range was requested outside the buffer, or `lo > hi`.
    ///
    /// On a well-formed frame this indicates a decoder bug rather than a
    /// transient condition, so callers generally do not retry on it.
    #[error("bit index out of range: [{lo}, {hi}) over {len} bits")]
    OutOfRange { lo: usize, hi: usize, len: usize },

    /// The escaped earthquake message did not decode to valid UTF-8.
    #[error("earthquake message is not valid UTF-8: {0}")]
    InvalidMessage(#[from] std::string::FromUtf8Error),

    /// A numeric field reconstructed from bit-packed digits failed to parse.
    #[error("failed to parse numeric field: {0}")]
    InvalidNumericField(#[from] std::num::ParseIntError),

    /// Writing a decoded snapshot to the output sink failed.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
