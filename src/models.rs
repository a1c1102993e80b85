//! Data model for decoded PEWS snapshots.
//!
//! These structures are the target shapes for the frame decoder in
//! [`crate::decoder`]; the poll loop in [`crate::poll`] is the only thing
//! that mutates [`PollState`] across ticks.

use serde::Serialize;

/// Earthquake-alert level carried in the MMI frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Normal = 1,
    Alert = 2,
    Warning = 3,
}

impl Phase {
    /// Decode phase from header bits 1 and 2.
    ///
    /// Preserves the upstream check order exactly: bit 1 is consulted
    /// first, and whenever bit 2 is set the Warning branch wins regardless
    /// of bit 1's value.
    #[must_use]
    pub fn from_header_bits(bit1: bool, bit2: bool) -> Self {
        if !bit1 {
            Phase::Normal
        } else if !bit2 {
            Phase::Alert
        } else {
            Phase::Warning
        }
    }
}

/// A persistent entry in the station table.
#[derive(Debug, Clone, Serialize)]
pub struct Station {
    /// Insertion-order index, stable across polls.
    pub idx: u16,
    /// Looked up from the static station table at `idx`; `None` in
    /// simulation mode or when `idx` exceeds the table.
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Latest instrumental intensity (0..15); `None` until first assigned.
    pub mmi: Option<u8>,
}

/// An earthquake record, present only while `phase > Normal`.
#[derive(Debug, Clone, Serialize)]
pub struct EqkRecord {
    pub origin_lat: f64,
    pub origin_lon: f64,
    /// Reserved for the unimplemented upstream grid projection
    /// (`fn_parseX`). Always `None`.
    pub origin_x: Option<f64>,
    /// Reserved for the unimplemented upstream grid projection
    /// (`fn_parseY`). Always `None`.
    pub origin_y: Option<f64>,
    pub eqk_mag: f64,
    pub eqk_dep: f64,
    /// Unix milliseconds.
    pub eqk_time: i64,
    pub eqk_id: i64,
    pub eqk_max: u8,
    pub eqk_max_area: Vec<String>,
    pub eqk_str: String,
}

/// How an earthquake record relates to the previously emitted one for the
/// same tick sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EqkTransition {
    /// First sighting of this event (`Normal -> non-Normal`).
    New,
    /// Same or escalated phase for an event already in progress.
    Updated,
    /// Phase returned to `Normal`.
    Cleared,
}

/// An earthquake record paired with its transition kind for this tick.
#[derive(Debug, Clone, Serialize)]
pub struct EqkEvent {
    pub transition: EqkTransition,
    pub phase: Phase,
    pub record: Option<EqkRecord>,
}

/// One tick's decoded output: the full station table plus any in-progress
/// earthquake event.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub stations: Vec<Station>,
    pub event: Option<EqkEvent>,
}

/// Process-wide poll state. Owned exclusively by the poll loop; every other
/// component in this crate is a pure function over its inputs.
#[derive(Debug, Clone)]
pub struct PollState {
    pub stations: Vec<Station>,
    pub phase: Phase,
    pub current_eqk_id: Option<i64>,
}

impl Default for PollState {
    fn default() -> Self {
        Self {
            stations: Vec::new(),
            phase: Phase::Normal,
            current_eqk_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_decode_matches_upstream_check_order() {
        assert_eq!(Phase::from_header_bits(false, false), Phase::Normal);
        assert_eq!(Phase::from_header_bits(false, true), Phase::Normal);
        assert_eq!(Phase::from_header_bits(true, false), Phase::Alert);
        assert_eq!(Phase::from_header_bits(true, true), Phase::Warning);
    }
}
