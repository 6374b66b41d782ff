//! csv export of the filtered readings

use std::fmt::Write;

use crate::domain::Reading;

pub const CSV_HEADER: &str = "ts,temp,ph,nh3,dox,farm,pond";
pub const EXPORT_FILENAME: &str = "current-farm.csv";

/// header plus one row per reading, `None` when there is nothing to export.
/// fields are not quoted; catalog labels never contain commas
pub fn to_csv(readings: &[Reading]) -> Option<String> {
    if readings.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(CSV_HEADER.len() + readings.len() * 80);
    out.push_str(CSV_HEADER);
    for r in readings {
        let _ = write!(
            out,
            "\n{},{},{},{},{},{},{}",
            r.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            r.temperature,
            r.ph,
            r.ammonia,
            r.dissolved_oxygen,
            r.farm_id,
            r.pond_label
        );
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading(pond: &str) -> Reading {
        Reading {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap(),
            temperature: 25.31,
            ph: 7.02,
            ammonia: 0.2,
            dissolved_oxygen: 7.45,
            farm_id: "farm-b".into(),
            pond_label: pond.into(),
        }
    }

    #[test]
    fn nothing_to_export() {
        assert!(to_csv(&[]).is_none());
    }

    #[test]
    fn header_then_one_row_per_reading() {
        let csv = to_csv(&[reading("Pond B1"), reading("Pond B3")]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].split(',').collect::<Vec<_>>(), ["ts", "temp", "ph", "nh3", "dox", "farm", "pond"]);
        assert_eq!(lines[1], "2024-05-01T06:00:00.000Z,25.31,7.02,0.2,7.45,farm-b,Pond B1");
        assert!(lines.iter().all(|l| l.split(',').count() == 7));
    }
}
