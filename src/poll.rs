//! The poll loop: ties the tide estimator, fetcher, and decoder together
//! into a per-second tick that advances [`PollState`].
//!
//! This is the only place in the crate that owns mutable state; every
//! other module here is a pure function (or close to it) over its inputs.
//! See §4.5/§5 of the design notes for the ordering guarantees a single
//! tick must preserve: `.b` parse precedes `.s` fetch, which precedes
//! station-table replacement, which precedes MMI attachment, which
//! precedes event emission.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::PewsClient;
use crate::decoder::{self, HEADER_LEN, HEADER_LEN_SIM};
use crate::errors::PewsError;
use crate::models::{EqkEvent, EqkTransition, Phase, PollState, Snapshot, Station};
use crate::output::Sink;
use crate::stations::{MIN_STATION_TABLE_SIZE, STATION_NAMES};
use crate::tide::TideEstimator;

/// Tide refreshes this often in the absence of other triggers.
const TIDE_REFRESH_INTERVAL_TICKS: u64 = 60;

/// What a tick produced, beyond a plain snapshot-or-skip.
///
/// `run_live` needs to distinguish a 5xx (which §7 says must schedule a
/// tide refresh on its own, not just after a run of skips) from an
/// ordinary 404/timeout/undecodable-header skip.
pub enum TickOutcome {
    /// A snapshot was decoded and is ready to emit.
    Snapshot(Snapshot),
    /// Tick skipped; nothing to emit, no special action needed.
    Skipped,
    /// Tick skipped because of a server error; the caller should schedule
    /// a tide refresh regardless of the consecutive-skip count.
    SkippedForceTideRefresh,
}

/// Run one tick: fetch `.b` (and `.s` when required), decode, advance
/// `state`, and return the resulting disposition.
///
/// Returns [`TickOutcome::Skipped`] or [`TickOutcome::SkippedForceTideRefresh`]
/// for dispositions that should skip this tick without producing output
/// (404, timeout, undecodable header, frame-too-short, 5xx) rather than
/// propagating an error — those are expected steady-state conditions, not
/// failures. An `Err` means a decode bug or a non-skippable HTTP failure.
///
/// # Errors
///
/// Returns an error for any [`PewsError`] not covered by the skip
/// dispositions in the error table (non-404/5xx HTTP statuses, etc.).
pub fn tick(
    client: &PewsClient,
    state: &mut PollState,
    p_time: &str,
    header_len: usize,
) -> Result<TickOutcome, PewsError> {
    let bytes = match client.fetch_mmi(p_time) {
        Ok(b) => b,
        Err(PewsError::HttpStatus(404)) | Err(PewsError::Timeout) => {
            debug!("snapshot not yet published for {p_time}, skipping tick");
            return Ok(TickOutcome::Skipped);
        }
        Err(PewsError::HttpStatus(code)) if (500..600).contains(&code) => {
            warn!("server error {code} fetching {p_time}, skipping tick");
            return Ok(TickOutcome::SkippedForceTideRefresh);
        }
        Err(e) => return Err(e),
    };

    let frame = match decoder::decode_mmi_frame(&bytes, header_len) {
        Ok(f) => f,
        Err(PewsError::PhaseUndecodable) => {
            warn!("header bits undecodable for {p_time}, skipping tick");
            return Ok(TickOutcome::Skipped);
        }
        Err(PewsError::FrameTooShort { needed, got }) => {
            warn!("frame too short for {p_time} (needed {needed} bits, got {got}), skipping tick");
            return Ok(TickOutcome::Skipped);
        }
        Err(e) => return Err(e),
    };

    if frame.sta_flag || state.stations.len() < MIN_STATION_TABLE_SIZE {
        match client.fetch_station(p_time) {
            Ok(station_bytes) => match decoder::decode_station_frame(&station_bytes) {
                Ok(positions) if positions.len() >= MIN_STATION_TABLE_SIZE => {
                    state.stations = positions
                        .into_iter()
                        .enumerate()
                        .map(|(idx, (lat, lon))| Station {
                            idx: idx as u16,
                            name: STATION_NAMES.get(idx).map(|s| (*s).to_string()),
                            lat,
                            lon,
                            mmi: None,
                        })
                        .collect();
                }
                Ok(positions) => {
                    warn!(
                        "decoded station table too small ({} < {MIN_STATION_TABLE_SIZE}), keeping previous",
                        positions.len()
                    );
                }
                Err(e) => warn!("station frame decode failed: {e}"),
            },
            Err(e) => warn!("station frame fetch failed: {e}"),
        }
    }

    for (idx, &mmi) in frame.mmi.iter().enumerate() {
        if let Some(station) = state.stations.get_mut(idx) {
            station.mmi = Some(mmi);
        }
    }

    let event = transition_event(state, frame.phase, frame.eqk);

    Ok(TickOutcome::Snapshot(Snapshot {
        stations: state.stations.clone(),
        event,
    }))
}

/// Compare the new phase/record against `state` and classify the
/// transition, updating `state.phase`/`state.current_eqk_id` in place.
///
/// Returns `None` only for a Normal-to-Normal tick with nothing to report.
fn transition_event(
    state: &mut PollState,
    new_phase: Phase,
    record: Option<crate::models::EqkRecord>,
) -> Option<EqkEvent> {
    let prev_phase = state.phase;
    state.phase = new_phase;

    let transition = match (prev_phase, new_phase) {
        (Phase::Normal, Phase::Normal) => return None,
        (Phase::Normal, _) => EqkTransition::New,
        (_, Phase::Normal) => {
            state.current_eqk_id = None;
            EqkTransition::Cleared
        }
        (_, _) => {
            if let Some(r) = &record {
                if let Some(prev_id) = state.current_eqk_id {
                    if prev_id != r.eqk_id {
                        warn!(
                            "eqk_id changed mid-event: {} -> {}",
                            prev_id, r.eqk_id
                        );
                    }
                }
            }
            EqkTransition::Updated
        }
    };

    if let Some(r) = &record {
        state.current_eqk_id = Some(r.eqk_id);
    }

    Some(EqkEvent {
        transition,
        phase: new_phase,
        record,
    })
}

/// Run the continuous live poll loop until the process is interrupted.
///
/// Drives one [`tick`] per second, refreshing tide every
/// [`TIDE_REFRESH_INTERVAL_TICKS`] ticks, immediately after two consecutive
/// skipped ticks, or immediately on a 5xx, and writes every produced
/// [`Snapshot`] to `sink`.
///
/// A failed bootstrap tide refresh is logged and not fatal: the estimator
/// keeps its default tide (1.0s) and the loop proceeds, matching the
/// `TideStale` disposition used for every later refresh.
///
/// # Errors
///
/// Returns an error if [`tick`] surfaces a non-skippable error.
pub fn run_live(client: &PewsClient, sink: &mut dyn Sink) -> Result<(), PewsError> {
    let mut tide = TideEstimator::new();
    if let Err(e) = tide.refresh(client.inner()) {
        warn!("initial tide refresh failed, starting from default tide: {e}");
    }

    let mut state = PollState::default();
    let mut tick_count: u64 = 0;
    let mut consecutive_skips: u64 = 0;

    loop {
        let tick_start = std::time::Instant::now();
        let p_time = tide.p_time();

        let mut force_tide_refresh = false;
        match tick(client, &mut state, &p_time, HEADER_LEN) {
            Ok(TickOutcome::Snapshot(snapshot)) => {
                consecutive_skips = 0;
                sink.emit(&snapshot)?;
            }
            Ok(TickOutcome::Skipped) => {
                consecutive_skips += 1;
            }
            Ok(TickOutcome::SkippedForceTideRefresh) => {
                consecutive_skips += 1;
                force_tide_refresh = true;
            }
            Err(e) => return Err(e),
        }

        tick_count += 1;
        if force_tide_refresh
            || tick_count % TIDE_REFRESH_INTERVAL_TICKS == 0
            || consecutive_skips >= 2
        {
            if let Err(e) = tide.refresh(client.inner()) {
                warn!("tide refresh failed, keeping previous tide: {e}");
            } else {
                info!("tide refreshed to {:.3}s", tide.tide());
            }
            consecutive_skips = 0;
        }

        let elapsed = tick_start.elapsed();
        if let Some(remaining) = Duration::from_secs(1).checked_sub(elapsed) {
            thread::sleep(remaining);
        }
    }
}

/// Run a single simulated tick against a replay `.b`/`.s` prefix and emit
/// the resulting snapshot.
///
/// Simulation mode uses [`HEADER_LEN_SIM`] rather than the live
/// [`HEADER_LEN`]; station names are always `None` here (the static
/// station-name table is only meaningful for the real network's fixed
/// station ordering, which a replay fixture need not follow).
///
/// # Errors
///
/// Returns an error for any non-skippable fetch or decode failure.
pub fn run_simulation(
    client: &PewsClient,
    url_prefix: &str,
    sink: &mut dyn Sink,
) -> Result<(), PewsError> {
    let mmi_bytes = client.fetch_url(&format!("{url_prefix}.b"))?;
    let station_bytes = client.fetch_url(&format!("{url_prefix}.s")).ok();
    simulate_tick(&mmi_bytes, station_bytes.as_deref(), sink)
}

/// Run a single simulated tick against a local directory containing a
/// captured `snapshot.b` (and, when staF is set, `snapshot.s`) pair, and
/// emit the resulting snapshot.
///
/// Otherwise identical to [`run_simulation`]; this is the offline
/// (`--dir`) counterpart to the HTTP-replay (`--url`) path.
///
/// # Errors
///
/// Returns [`PewsError::Io`] if `snapshot.b` cannot be read, or a decode
/// error for any non-skippable malformed frame.
pub fn run_simulation_from_dir(
    dir: &std::path::Path,
    sink: &mut dyn Sink,
) -> Result<(), PewsError> {
    let mmi_bytes = std::fs::read(dir.join("snapshot.b"))?;
    let station_bytes = std::fs::read(dir.join("snapshot.s")).ok();
    simulate_tick(&mmi_bytes, station_bytes.as_deref(), sink)
}

/// Shared decode/state-machine path for both simulation sources.
fn simulate_tick(
    mmi_bytes: &[u8],
    station_bytes: Option<&[u8]>,
    sink: &mut dyn Sink,
) -> Result<(), PewsError> {
    let mut state = PollState::default();
    let frame = decoder::decode_mmi_frame(mmi_bytes, HEADER_LEN_SIM)?;

    if frame.sta_flag || state.stations.len() < MIN_STATION_TABLE_SIZE {
        if let Some(station_bytes) = station_bytes {
            if let Ok(positions) = decoder::decode_station_frame(station_bytes) {
                if positions.len() >= MIN_STATION_TABLE_SIZE {
                    state.stations = positions
                        .into_iter()
                        .enumerate()
                        .map(|(idx, (lat, lon))| Station {
                            idx: idx as u16,
                            name: None,
                            lat,
                            lon,
                            mmi: None,
                        })
                        .collect();
                }
            }
        }
    }

    for (idx, &mmi) in frame.mmi.iter().enumerate() {
        if let Some(station) = state.stations.get_mut(idx) {
            station.mmi = Some(mmi);
        }
    }

    let event = transition_event(&mut state, frame.phase, frame.eqk);
    sink.emit(&Snapshot {
        stations: state.stations,
        event,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EqkRecord;

    fn sample_record(id: i64) -> EqkRecord {
        EqkRecord {
            origin_lat: 36.5,
            origin_lon: 127.25,
            origin_x: None,
            origin_y: None,
            eqk_mag: 4.8,
            eqk_dep: 10.0,
            eqk_time: 0,
            eqk_id: id,
            eqk_max: 4,
            eqk_max_area: vec!["Gyeongnam".to_string()],
            eqk_str: "test".to_string(),
        }
    }

    #[test]
    fn normal_to_normal_produces_no_event() {
        let mut state = PollState::default();
        let event = transition_event(&mut state, Phase::Normal, None);
        assert!(event.is_none());
        assert_eq!(state.phase, Phase::Normal);
    }

    #[test]
    fn normal_to_alert_is_new() {
        let mut state = PollState::default();
        let event = transition_event(&mut state, Phase::Alert, Some(sample_record(1))).unwrap();
        assert_eq!(event.transition, EqkTransition::New);
        assert_eq!(state.current_eqk_id, Some(1));
    }

    #[test]
    fn alert_to_warning_is_updated() {
        let mut state = PollState::default();
        state.phase = Phase::Alert;
        state.current_eqk_id = Some(1);
        let event = transition_event(&mut state, Phase::Warning, Some(sample_record(1))).unwrap();
        assert_eq!(event.transition, EqkTransition::Updated);
    }

    #[test]
    fn warning_to_normal_is_cleared() {
        let mut state = PollState::default();
        state.phase = Phase::Warning;
        state.current_eqk_id = Some(1);
        let event = transition_event(&mut state, Phase::Normal, None).unwrap();
        assert_eq!(event.transition, EqkTransition::Cleared);
        assert!(state.current_eqk_id.is_none());
    }

    #[test]
    fn self_loop_keeps_same_id_as_updated() {
        let mut state = PollState::default();
        state.phase = Phase::Alert;
        state.current_eqk_id = Some(7);
        let event = transition_event(&mut state, Phase::Alert, Some(sample_record(7))).unwrap();
        assert_eq!(event.transition, EqkTransition::Updated);
        assert_eq!(state.current_eqk_id, Some(7));
    }
}
