/// Readings shown beside the beaker, derived from a snapshot

use serde::Serialize;

use crate::reaction::ReactionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    Normal,
    Elevated,
    High,
}

pub fn ph_label(ph: f64) -> &'static str {
    if ph <= 2.0 {
        "Strongly Acidic"
    } else if ph <= 4.0 {
        "Moderately Acidic"
    } else if ph < 7.0 {
        "Weakly Acidic"
    } else if ph == 7.0 {
        "Neutral"
    } else if ph <= 10.0 {
        "Weakly Basic"
    } else if ph <= 12.0 {
        "Moderately Basic"
    } else {
        "Strongly Basic"
    }
}

/// Coarser three-way split used when describing the solution in words
pub fn ph_category(ph: f64) -> &'static str {
    if ph < 6.5 {
        "Acidic"
    } else if ph > 7.5 {
        "Basic"
    } else {
        "Neutral"
    }
}

pub fn temperature_status(temperature: f64) -> &'static str {
    if temperature > 90.0 {
        "Very hot/Near boiling"
    } else if temperature > 60.0 {
        "Hot"
    } else if temperature > 30.0 {
        "Heated"
    } else {
        "Room temperature"
    }
}

pub fn pressure_level(pressure: f64) -> PressureLevel {
    if pressure > 1.5 {
        PressureLevel::High
    } else if pressure > 1.2 {
        PressureLevel::Elevated
    } else {
        PressureLevel::Normal
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Readings {
    pub ph_label: &'static str,
    pub ph_category: &'static str,
    pub temperature_status: &'static str,
    pub pressure_level: PressureLevel,
    pub color_hex: &'static str,
}

impl Readings {
    pub fn from_snapshot(snapshot: &ReactionSnapshot) -> Self {
        Readings {
            ph_label: ph_label(snapshot.ph),
            ph_category: ph_category(snapshot.ph),
            temperature_status: temperature_status(snapshot.temperature),
            pressure_level: pressure_level(snapshot.pressure),
            color_hex: snapshot.color.hex(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ph_bands() {
        assert_eq!(ph_label(1.0), "Strongly Acidic");
        assert_eq!(ph_label(4.0), "Moderately Acidic");
        assert_eq!(ph_label(5.5), "Weakly Acidic");
        assert_eq!(ph_label(7.0), "Neutral");
        assert_eq!(ph_label(8.5), "Weakly Basic");
        assert_eq!(ph_label(11.5), "Moderately Basic");
        assert_eq!(ph_label(13.0), "Strongly Basic");
        assert_eq!(ph_category(6.9), "Neutral");
        assert_eq!(ph_category(5.5), "Acidic");
    }

    #[test]
    fn test_temperature_and_pressure() {
        assert_eq!(temperature_status(20.0), "Room temperature");
        assert_eq!(temperature_status(45.0), "Heated");
        assert_eq!(temperature_status(100.0), "Very hot/Near boiling");
        assert_eq!(pressure_level(1.0), PressureLevel::Normal);
        assert_eq!(pressure_level(1.3), PressureLevel::Elevated);
        assert_eq!(pressure_level(2.0), PressureLevel::High);
    }
}
