//! Static reference data: seismometer station names and administrative
//! regions.
//!
//! Neither table is part of the wire format's design — they are lookup
//! inputs supplied by the operator of a deployed PEWS network. The decoder
//! never inspects their contents, only their length (station names are
//! looked up by `idx`; regions are indexed by bit position in the 17-bit
//! affected-area field).

/// Station names in insertion order, indexed by `Station::idx`.
///
/// A real deployment would source this from the KMA's published seismometer
/// roster; this table is a representative placeholder of the same shape
/// (99+ entries) so the decoder has real indices to resolve against.
pub const STATION_NAMES: &[&str] = &[
    "Seoul", "Chuncheon", "Gangneung", "Sokcho", "Wonju", "Cheorwon", "Inje", "Daegwallyeong",
    "Donghae", "Taebaek", "Suwon", "Incheon", "Ganghwa", "Yangpyeong", "Icheon", "Paju", "Dongducheon",
    "Osan", "Anseong", "Pocheon", "Daejeon", "Cheongju", "Chungju", "Boeun", "Chupungnyeong",
    "Buyeo", "Geumsan", "Seosan", "Boryeong", "Cheonan", "Asan", "Gongju", "Nonsan", "Daecheon",
    "Daegu", "Busan", "Ulsan", "Changwon", "Jinju", "Tongyeong", "Geochang", "Hapcheon", "Miryang",
    "Sancheong", "Geoje", "Namhae", "Uiryeong", "Gimhae", "Yangsan", "Pohang", "Gumi", "Andong",
    "Yeongju", "Mungyeong", "Yeongdeok", "Uljin", "Yeongcheon", "Gyeongju", "Cheongsong", "Uiseong",
    "Bonghwa", "Gwangju", "Mokpo", "Yeosu", "Suncheon", "Jeonju", "Gunsan", "Iksan", "Jeongeup",
    "Namwon", "Jangsu", "Gochang", "Haenam", "Wando", "Heuksando", "Gangjin", "Goheung", "Naju",
    "Hampyeong", "Jeju", "Seogwipo", "Seongsan", "Gosan", "Sancheon", "Uljeongsan", "Baengnyeongdo",
    "Ulleungdo", "Dokdo", "Chuja", "Gapado", "Geoncheonbong", "Maehwasan", "Deogyusan", "Jirisan",
    "Hallasan", "Seoraksan", "Odaesan", "Chiaksan", "Sobaeksan", "Songnisan", "Bukhansan", "Gwanaksan",
];

/// The 17 affected-area regions, ordered for the region-bitmap bit index.
pub const REGIONS: &[&str] = &[
    "Seoul",
    "Busan",
    "Daegu",
    "Incheon",
    "Gwangju",
    "Daejeon",
    "Ulsan",
    "Sejong",
    "Gyeonggi",
    "Gangwon",
    "Chungbuk",
    "Chungnam",
    "Jeonbuk",
    "Jeonnam",
    "Gyeongbuk",
    "Gyeongnam",
    "Jeju",
];

/// Minimum station table size below which a decoded table is considered
/// corrupt or partial and must not replace an established table.
pub const MIN_STATION_TABLE_SIZE: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_table_meets_minimum_size() {
        assert!(STATION_NAMES.len() >= 99);
    }

    #[test]
    fn region_table_has_seventeen_entries() {
        assert_eq!(REGIONS.len(), 17);
    }
}
