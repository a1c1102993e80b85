//! Output sinks for decoded snapshots.
//!
//! Mirrors the reference CLI's `Format`/`write_events` split, but operates
//! on [`Snapshot`]/[`EqkEvent`] instead of GeoJSON features: a small `Sink`
//! trait lets `live`/`tail` share one rendering path across human-readable,
//! JSON, and NDJSON output.

use std::io::{self, Write};

use serde::Serialize;

use crate::models::{EqkEvent, EqkTransition, Phase, Snapshot};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const RED: &str = "\x1b[91m";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default).
    #[default]
    Human,
    /// JSON array.
    Json,
    /// Newline-delimited JSON (one object per line).
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Something a decoded snapshot can be written to, once per tick.
pub trait Sink {
    /// Write one tick's snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying write fails.
    fn emit(&mut self, snapshot: &Snapshot) -> io::Result<()>;
}

/// A sink that writes a chosen [`Format`] to any [`Write`] implementor.
pub struct WriterSink<W: Write> {
    writer: W,
    format: Format,
}

impl<W: Write> WriterSink<W> {
    #[must_use]
    pub fn new(writer: W, format: Format) -> Self {
        Self { writer, format }
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn emit(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        match self.format {
            Format::Human => write_human(&mut self.writer, snapshot),
            Format::Json => write_json(&mut self.writer, snapshot),
            Format::Ndjson => write_ndjson(&mut self.writer, snapshot),
        }
    }
}

fn phase_color(phase: Phase) -> &'static str {
    match phase {
        Phase::Normal => GREEN,
        Phase::Alert => YELLOW,
        Phase::Warning => RED,
    }
}

fn transition_label(transition: EqkTransition) -> &'static str {
    match transition {
        EqkTransition::New => "NEW",
        EqkTransition::Updated => "UPDATED",
        EqkTransition::Cleared => "CLEARED",
    }
}

/// Write one tick in human-readable format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    let active = snapshot.stations.iter().filter(|s| s.mmi.unwrap_or(0) > 0).count();
    writeln!(
        writer,
        "{DIM}stations={}{RESET} {BOLD}active={active}{RESET}",
        snapshot.stations.len()
    )?;

    if let Some(event) = &snapshot.event {
        let color = phase_color(event.phase);
        let label = transition_label(event.transition);
        write!(writer, "{color}{BOLD}[{label}]{RESET} phase={:?}", event.phase)?;
        if let Some(record) = &event.record {
            writeln!(
                writer,
                " M{:.1} depth={:.1}km id={} max={} regions={:?} \"{}\"",
                record.eqk_mag,
                record.eqk_dep,
                record.eqk_id,
                record.eqk_max,
                record.eqk_max_area,
                record.eqk_str
            )?;
        } else {
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonSnapshot<'a> {
    stations: &'a [crate::models::Station],
    event: Option<&'a EqkEvent>,
}

/// Write one tick as a pretty-printed JSON object.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    let view = JsonSnapshot {
        stations: &snapshot.stations,
        event: snapshot.event.as_ref(),
    };
    let json = serde_json::to_string_pretty(&view)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write one tick as a single line of JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, snapshot: &Snapshot) -> io::Result<()> {
    let view = JsonSnapshot {
        stations: &snapshot.stations,
        event: snapshot.event.as_ref(),
    };
    let json = serde_json::to_string(&view)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Station;

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            stations: vec![Station {
                idx: 0,
                name: Some("Seoul".into()),
                lat: 37.5,
                lon: 127.0,
                mmi: Some(0),
            }],
            event: None,
        }
    }

    #[test]
    fn format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("ndjson".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn human_writer_emits_station_count() {
        let mut buf = Vec::new();
        write_human(&mut buf, &empty_snapshot()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("stations=1"));
    }

    #[test]
    fn ndjson_writer_emits_single_line() {
        let mut buf = Vec::new();
        write_ndjson(&mut buf, &empty_snapshot()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"lat\":37.5"));
    }

    #[test]
    fn writer_sink_dispatches_on_format() {
        let mut buf = Vec::new();
        {
            let mut sink = WriterSink::new(&mut buf, Format::Json);
            sink.emit(&empty_snapshot()).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"stations\""));
    }
}
