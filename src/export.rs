use std::fmt::Write;

use crate::clock::Sample;

pub const CSV_HEADER: &str = "Time(s),pH,Temperature(°C)";

/// Render recorded samples as CSV text, one row per sample
pub fn to_csv(samples: &[Sample]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + samples.len() * 24);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for sample in samples {
        // Writing into a String cannot fail
        let _ = writeln!(out, "{},{},{}", sample.time, sample.ph, sample.temperature);
    }
    out
}
