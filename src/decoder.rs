//! MMI-frame and station-frame decoding.
//!
//! This is the heart of the client: turning a raw `.b`/`.s` byte buffer into
//! the header flags, the per-station intensity stream, and — when an event
//! is in progress — the earthquake trailer. The decoder is stateless; the
//! poll loop in [`crate::poll`] is the only thing that remembers anything
//! across ticks.

use crate::bitview::BitView;
use crate::errors::PewsError;
use crate::escape::{legacy_escape, unquote_bytes};
use crate::models::{EqkRecord, Phase};
use crate::stations::REGIONS;

/// Header length in bytes for live frames.
pub const HEADER_LEN: usize = 4;

/// Header length in bytes for simulation-mode frames.
pub const HEADER_LEN_SIM: usize = 1;

/// Length, in bytes, of the trailing earthquake message.
pub const MAX_EQK_STR_LEN: usize = 60;

/// Length, in bits, of the fixed-width earthquake info trailer.
pub const MAX_EQK_INFO_LEN: usize = 120;

/// Eight consecutive one-bits: the nibble-stream group separator.
const NIBBLE_SENTINEL: &str = "11111111";

/// The all-ones bitmap meaning "no specific region, see message instead".
const AREA_ALL_SET: &str = "11111111111111111";

/// A decoded MMI (`.b`) frame.
#[derive(Debug, Clone)]
pub struct MmiFrame {
    /// Station-table refresh requested (header bit 0).
    pub sta_flag: bool,
    pub phase: Phase,
    /// MMI nibble per station, in station-index order.
    pub mmi: Vec<u8>,
    /// Present only when `phase > Phase::Normal`.
    pub eqk: Option<EqkRecord>,
}

/// Decode a `.b` MMI frame.
///
/// `header_len` is [`HEADER_LEN`] for live frames or [`HEADER_LEN_SIM`] for
/// simulation-mode frames; it changes only the length of the header slice,
/// not the bit positions consulted within it.
///
/// # Errors
///
/// Returns [`PewsError::FrameTooShort`] if `bytes` is shorter than the
/// header, or shorter than the earthquake trailer demands when `phase >
/// Phase::Normal`.
pub fn decode_mmi_frame(bytes: &[u8], header_len: usize) -> Result<MmiFrame, PewsError> {
    let header_bits = header_len * 8;
    if bytes.len() < header_len {
        return Err(PewsError::FrameTooShort {
            needed: header_bits,
            got: bytes.len() * 8,
        });
    }

    let view = BitView::from_bytes(bytes);
    let sta_flag = view.bits(0, 1)? == 1;
    let bit1 = view.bits(1, 2)? == 1;
    let bit2 = view.bits(2, 3)? == 1;
    let phase = Phase::from_header_bits(bit1, bit2);

    let total_bits = view.len();
    let body_start = header_bits;
    let body_len = total_bits - body_start;
    let body = view.slice(body_start, total_bits)?;
    let mmi = decode_mmi_nibbles(&body);

    let eqk = if phase > Phase::Normal {
        Some(decode_eqk_trailer(bytes, &view, body_start, body_len)?)
    } else {
        None
    };

    Ok(MmiFrame {
        sta_flag,
        phase,
        mmi,
        eqk,
    })
}

/// Split the body bit-string on the sentinel byte and read 4-bit nibbles.
///
/// Within each group produced by the split, the first 8 bits are sentinel
/// remainder / header padding and are discarded; the rest is read as
/// successive 4-bit MMI nibbles, concatenated across groups in order.
fn decode_mmi_nibbles(body: &str) -> Vec<u8> {
    let mut nibbles = Vec::new();
    for group in body.split(NIBBLE_SENTINEL) {
        if group.len() < 8 {
            continue;
        }
        let data = group[8..].as_bytes();
        for chunk in data.chunks(4) {
            if chunk.len() < 4 {
                break;
            }
            if let Ok(s) = std::str::from_utf8(chunk) {
                if let Ok(v) = u8::from_str_radix(s, 2) {
                    nibbles.push(v);
                }
            }
        }
    }
    nibbles
}

/// Decode the earthquake trailer occupying the last
/// `MAX_EQK_STR_LEN * 8 + MAX_EQK_INFO_LEN` bits of the body, plus the
/// message trailer occupying the last `MAX_EQK_STR_LEN` bytes of the raw
/// buffer.
fn decode_eqk_trailer(
    bytes: &[u8],
    view: &BitView<'_>,
    body_start: usize,
    body_len: usize,
) -> Result<EqkRecord, PewsError> {
    let trailer_width = MAX_EQK_STR_LEN * 8 + MAX_EQK_INFO_LEN;
    if body_len < trailer_width {
        return Err(PewsError::FrameTooShort {
            needed: trailer_width,
            got: body_len,
        });
    }
    if bytes.len() < MAX_EQK_STR_LEN {
        return Err(PewsError::FrameTooShort {
            needed: MAX_EQK_STR_LEN * 8,
            got: bytes.len() * 8,
        });
    }

    let t = body_start + body_len - trailer_width;

    let origin_lat = 30.0 + (view.bits(t, t + 10)? as f64) / 100.0;
    let origin_lon = 124.0 + (view.bits(t + 10, t + 20)? as f64) / 100.0;
    let eqk_mag = (view.bits(t + 20, t + 27)? as f64) / 10.0;
    let eqk_dep = (view.bits(t + 27, t + 37)? as f64) / 10.0;
    let eqk_time = (view.bits(t + 37, t + 59)? as i64) * 1000;
    // bits [t+59, t+69) are unused padding between eqk_time and eqk_id.
    let id_field = view.bits(t + 69, t + 95)?;
    // The upstream client string-concatenates "20" with the decimal field
    // rather than adding 2e10; for field=0 this yields 200, not
    // 20_000_000_000. Preserve that exactly for wire compatibility.
    let eqk_id: i64 = format!("20{id_field}").parse()?;
    let eqk_max = view.bits(t + 95, t + 99)? as u8;
    let area_str = view.slice(t + 99, t + 116)?;
    let eqk_max_area = decode_regions(&area_str);

    let msg_bytes = &bytes[bytes.len() - MAX_EQK_STR_LEN..];
    let escaped = legacy_escape(msg_bytes);
    let raw = unquote_bytes(&escaped);
    let eqk_str = String::from_utf8(raw)?;

    Ok(EqkRecord {
        origin_lat,
        origin_lon,
        origin_x: None,
        origin_y: None,
        eqk_mag,
        eqk_dep,
        eqk_time,
        eqk_id,
        eqk_max,
        eqk_max_area,
        eqk_str,
    })
}

/// Decode the 17-bit affected-region bitmap into region names.
fn decode_regions(area_str: &str) -> Vec<String> {
    if area_str == AREA_ALL_SET {
        return vec!["-".to_string()];
    }

    area_str
        .char_indices()
        .filter(|(_, c)| *c == '1')
        .filter_map(|(i, _)| REGIONS.get(i).map(|name| (*name).to_string()))
        .collect()
}

/// Decode a `.s` station frame into `(lat, lon)` pairs in insertion order.
///
/// Consumes the buffer in 20-bit blocks; a trailing partial block (buffer
/// length not a multiple of 20 bits) is truncated rather than rejected.
///
/// # Errors
///
/// Only fails if bit access itself is out of range, which cannot happen for
/// any well-formed call given the bounds computed here.
pub fn decode_station_frame(bytes: &[u8]) -> Result<Vec<(f64, f64)>, PewsError> {
    let view = BitView::from_bytes(bytes);
    let count = view.len() / 20;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let off = i * 20;
        let lat = 30.0 + (view.bits(off, off + 10)? as f64) / 100.0;
        let lon = 120.0 + (view.bits(off + 10, off + 20)? as f64) / 100.0;
        out.push((lat, lon));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_nibbles(bits: &mut String, values: &[u8]) {
        for v in values {
            bits.push_str(&format!("{v:04b}"));
        }
    }

    #[test]
    fn header_only_frame_decodes_empty_mmi_and_no_event() {
        let bytes = [0x00u8, 0x00, 0x00, 0x00];
        let frame = decode_mmi_frame(&bytes, HEADER_LEN).unwrap();
        assert_eq!(frame.phase, Phase::Normal);
        assert!(!frame.sta_flag);
        assert!(frame.mmi.is_empty());
        assert!(frame.eqk.is_none());
    }

    #[test]
    fn normal_tick_decodes_ninety_nine_zero_nibbles() {
        let mut bits = String::from("00000000"); // skipped sentinel remainder
        push_nibbles(&mut bits, &[0u8; 99]);
        bits.push_str(NIBBLE_SENTINEL);
        let body_bytes = bits_to_bytes(&bits);

        let mut bytes = vec![0x00, 0x00, 0x00, 0x00];
        bytes.extend(body_bytes);

        let frame = decode_mmi_frame(&bytes, HEADER_LEN).unwrap();
        assert_eq!(frame.phase, Phase::Normal);
        assert_eq!(frame.mmi.len(), 99);
        assert!(frame.mmi.iter().all(|&m| m == 0));
        assert!(frame.eqk.is_none());
    }

    #[test]
    fn sta_flag_bit_is_read_from_header() {
        let bytes = [0x80u8, 0x00, 0x00, 0x00];
        let frame = decode_mmi_frame(&bytes, HEADER_LEN).unwrap();
        assert!(frame.sta_flag);
        assert_eq!(frame.phase, Phase::Normal);
    }

    fn bits_to_bytes(bits: &str) -> Vec<u8> {
        let mut padded = bits.to_string();
        while padded.len() % 8 != 0 {
            padded.push('0');
        }
        padded
            .as_bytes()
            .chunks(8)
            .map(|c| u8::from_str_radix(std::str::from_utf8(c).unwrap(), 2).unwrap())
            .collect()
    }

    /// Build a 600-bit earthquake trailer matching the layout in
    /// `decode_eqk_trailer`, encoding the values from end-to-end scenario 3.
    fn eqk_trailer_bits() -> String {
        let mut bits = String::new();
        bits.push_str(&format!("{:010b}", 650u32)); // origin_lat 36.50 -> (36.50-30)*100
        bits.push_str(&format!("{:010b}", 325u32)); // origin_lon 127.25 -> (127.25-124)*100
        bits.push_str(&format!("{:07b}", 48u32)); // eqk_mag 4.8 -> 48
        bits.push_str(&format!("{:010b}", 100u32)); // eqk_dep 10.0 -> 100
        // The 22-bit eqk_time field caps at 4_194_303; a real Unix-seconds
        // value would overflow it, so this exercises the `raw * 1000`
        // arithmetic with an in-range value rather than a literal timestamp.
        bits.push_str(&format!("{:022b}", 1_234_567u64));
        bits.push_str(&"0".repeat(10)); // padding [59,69)
        bits.push_str(&format!("{:026b}", 42u64)); // eqk_id field -> "20" + "42" = 2042
        bits.push_str(&format!("{:04b}", 4u32)); // eqk_max
        bits.push_str("00000000000000010"); // 17-bit region bitmap -> Gyeongnam
        bits.push_str(&"0".repeat(4)); // remaining padding to 120 bits
        assert_eq!(bits.len(), MAX_EQK_INFO_LEN);
        bits.push_str(&"0".repeat(MAX_EQK_STR_LEN * 8));
        bits
    }

    #[test]
    fn phase_two_onset_decodes_expected_eqk_fields() {
        // header byte: bit0=0 (staF), bit1=1, bit2=0 -> phase 2 (Alert)
        let header = [0b0100_0000u8, 0x00, 0x00, 0x00];
        let trailer_bits = eqk_trailer_bits();
        let mut body_bits = String::from("00000000");
        body_bits.push_str(&trailer_bits);
        let mut bytes = header.to_vec();
        bytes.extend(bits_to_bytes(&body_bits));

        // Overwrite the last 60 bytes with the literal message, space-padded
        // to fill the fixed-width trailer, so eqk_str exercises the
        // byte-tail path independent of the bit trailer.
        let msg = "규모 4.8 지진";
        let escaped = legacy_escape(msg.as_bytes());
        let raw = unquote_bytes(&escaped);
        assert_eq!(raw, msg.as_bytes());
        let tail_start = bytes.len() - MAX_EQK_STR_LEN;
        let mut padded = msg.as_bytes().to_vec();
        padded.resize(MAX_EQK_STR_LEN, b' ');
        bytes[tail_start..].copy_from_slice(&padded);

        let frame = decode_mmi_frame(&bytes, HEADER_LEN).unwrap();
        assert_eq!(frame.phase, Phase::Alert);
        let eqk = frame.eqk.expect("phase > Normal must carry an EqkRecord");
        assert!((eqk.origin_lat - 36.50).abs() < 1e-9);
        assert!((eqk.origin_lon - 127.25).abs() < 1e-9);
        assert!((eqk.eqk_mag - 4.8).abs() < 1e-9);
        assert!((eqk.eqk_dep - 10.0).abs() < 1e-9);
        assert_eq!(eqk.eqk_time, 1_234_567_000);
        assert_eq!(eqk.eqk_id, 2042);
        assert_eq!(eqk.eqk_max, 4);
        assert_eq!(eqk.eqk_max_area, vec!["Gyeongnam".to_string()]);
        assert_eq!(eqk.eqk_str.trim_end(), msg);
    }

    #[test]
    fn all_ones_region_bitmap_decodes_to_dash() {
        assert_eq!(decode_regions(AREA_ALL_SET), vec!["-".to_string()]);
    }

    #[test]
    fn eqk_id_zero_field_preserves_string_concat_bug() {
        let id_field = 0u64;
        let eqk_id: i64 = format!("20{id_field}").parse().unwrap();
        assert_eq!(eqk_id, 200);
    }

    #[test]
    fn station_frame_truncates_partial_trailing_block() {
        // 41 bits: two full 20-bit stations plus a dangling bit, truncated.
        let mut bits = String::new();
        bits.push_str(&"0".repeat(20));
        bits.push_str(&"1".repeat(20));
        bits.push('1');
        let bytes = bits_to_bytes(&bits);

        let stations = decode_station_frame(&bytes).unwrap();
        assert_eq!(stations.len(), 2);
        assert!((stations[0].0 - 30.0).abs() < 1e-9);
        assert!((stations[0].1 - 120.0).abs() < 1e-9);
    }
}
