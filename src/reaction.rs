/// Reaction state derivation for the virtual beaker
/// Maps the labels dropped into the beaker to pH, volume, concentration and reaction type

use serde::{Deserialize, Serialize};

const ACID_KEYWORDS: [&str; 5] = ["hcl", "hydrochloric", "nitric", "nitrate", "acid"];
const BASE_KEYWORDS: [&str; 6] = ["naoh", "sodium", "carbonate", "base", "hydroxide", "chloride"];
const INDICATOR_KEYWORDS: [&str; 2] = ["indicator", "universal"];

pub const ROOM_TEMPERATURE: f64 = 20.0;
pub const BOILING_POINT: f64 = 100.0;
pub const ATMOSPHERIC_PRESSURE: f64 = 1.0;
pub const MAX_CONCENTRATION: f64 = 5.0;

/// Stirring above this speed (rpm) keeps the solution bubbling
pub const BUBBLING_STIR_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReactionType {
    None,
    Neutralization,
    Precipitation,
    GasEvolution,
    Distillation,
}

impl ReactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReactionType::None => "none",
            ReactionType::Neutralization => "neutralization",
            ReactionType::Precipitation => "precipitation",
            ReactionType::GasEvolution => "gas-evolution",
            ReactionType::Distillation => "distillation",
        }
    }
}

/// Display color of the liquid in the beaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidColor {
    Water,
    Red,
    Blue,
    Green,
}

impl LiquidColor {
    pub fn hex(self) -> &'static str {
        match self {
            LiquidColor::Water => "#60A5FA",
            LiquidColor::Red => "#EF4444",
            LiquidColor::Blue => "#3B82F6",
            LiquidColor::Green => "#10B981",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LiquidColor::Water => "light blue",
            LiquidColor::Red => "red",
            LiquidColor::Blue => "blue",
            LiquidColor::Green => "green",
        }
    }
}

/// Bench dials. Values outside the documented ranges are clamped by `clamped`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Controls {
    /// mol/L, 0.1 to 5.0
    pub concentration: f64,
    /// percent, 0 to 100
    pub heating_power: f64,
    /// rpm, 0 to 1000
    pub stirring_speed: f64,
}

impl Default for Controls {
    fn default() -> Self {
        Controls {
            concentration: 1.0,
            heating_power: 0.0,
            stirring_speed: 0.0,
        }
    }
}

impl Controls {
    pub fn clamped(self) -> Self {
        Controls {
            concentration: clamp_or(self.concentration, 0.1, MAX_CONCENTRATION, 1.0),
            heating_power: clamp_or(self.heating_power, 0.0, 100.0, 0.0),
            stirring_speed: clamp_or(self.stirring_speed, 0.0, 1000.0, 0.0),
        }
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

/// Full simulated state of the beaker at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionSnapshot {
    pub components: Vec<String>,
    pub ph: f64,
    pub temperature: f64,
    pub color: LiquidColor,
    pub volume: f64,
    pub concentration: f64,
    pub pressure: f64,
    pub reaction_progress: f64,
    pub reaction_type: ReactionType,
    pub is_boiling: bool,
    pub is_bubbling: bool,
    pub has_gas_evolution: bool,
    pub has_precipitate: bool,
}

impl Default for ReactionSnapshot {
    fn default() -> Self {
        ReactionSnapshot {
            components: Vec::new(),
            ph: 7.0,
            temperature: ROOM_TEMPERATURE,
            color: LiquidColor::Water,
            volume: 0.0,
            concentration: 0.0,
            pressure: ATMOSPHERIC_PRESSURE,
            reaction_progress: 0.0,
            reaction_type: ReactionType::None,
            is_boiling: false,
            is_bubbling: false,
            has_gas_evolution: false,
            has_precipitate: false,
        }
    }
}

impl ReactionSnapshot {
    pub fn has_indicator(&self) -> bool {
        self.components.iter().any(|c| is_indicator(c))
    }
}

/// Keyword classification of a single label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelClass {
    pub acid: bool,
    pub base: bool,
    pub indicator: bool,
}

pub fn classify(label: &str) -> LabelClass {
    let lower = label.to_lowercase();
    LabelClass {
        acid: matches_any(&lower, &ACID_KEYWORDS),
        base: matches_any(&lower, &BASE_KEYWORDS),
        indicator: matches_any(&lower, &INDICATOR_KEYWORDS),
    }
}

fn matches_any(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| lower.contains(k))
}

fn is_indicator(label: &str) -> bool {
    classify(label).indicator
}

/// Volume (mL) one dose of the labelled component adds to the beaker
pub fn component_volume(label: &str) -> f64 {
    let lower = label.to_lowercase();
    let indicator = matches_any(&lower, &INDICATOR_KEYWORDS);
    if lower.contains("water") && !indicator {
        100.0
    } else if indicator {
        5.0
    } else if lower.contains("hcl") || lower.contains("naoh") {
        50.0
    } else {
        10.0
    }
}

/// Estimated pH from the acid/base imbalance, saturating at 1 and 13
pub fn estimate_ph(acid_count: usize, base_count: usize) -> f64 {
    let ph = if acid_count > base_count {
        (7.0 - (acid_count - base_count) as f64 * 1.5).max(1.0)
    } else if base_count > acid_count {
        (7.0 + (base_count - acid_count) as f64 * 1.5).min(13.0)
    } else {
        7.0
    };
    ph.clamp(0.0, 14.0)
}

/// Acid/base mixing is checked before silver/chloride, so a mixture that
/// satisfies both (silver nitrate reads as an acid, sodium chloride as a base)
/// never reaches precipitation.
pub fn classify_reaction(components: &[String], acid_count: usize, base_count: usize) -> ReactionType {
    if acid_count > 0 && base_count > 0 {
        if acid_count == base_count {
            ReactionType::Neutralization
        } else {
            ReactionType::GasEvolution
        }
    } else {
        let lowered: Vec<String> = components.iter().map(|c| c.to_lowercase()).collect();
        let has_silver = lowered.iter().any(|c| c.contains("silver"));
        let has_chloride = lowered.iter().any(|c| c.contains("chloride"));
        if has_silver && has_chloride {
            ReactionType::Precipitation
        } else {
            ReactionType::None
        }
    }
}

pub fn is_bubbling(has_gas_evolution: bool, stirring_speed: f64) -> bool {
    stirring_speed > BUBBLING_STIR_THRESHOLD || has_gas_evolution
}

/// Recompute the snapshot for `components`.
/// Temperature, pressure and progress belong to the clock and are carried over
/// from `previous`, as is the color when no indicator is in the beaker.
pub fn derive(components: &[String], controls: &Controls, previous: &ReactionSnapshot) -> ReactionSnapshot {
    let mut acid_count = 0usize;
    let mut base_count = 0usize;
    let mut has_indicator = false;
    let mut volume = 0.0;

    for label in components {
        let class = classify(label);
        if class.acid {
            acid_count += 1;
        }
        if class.base {
            base_count += 1;
        }
        has_indicator |= class.indicator;
        volume += component_volume(label);
    }

    let ph = estimate_ph(acid_count, base_count);
    let reaction_type = classify_reaction(components, acid_count, base_count);
    let has_gas_evolution = reaction_type == ReactionType::GasEvolution;
    let has_precipitate = reaction_type == ReactionType::Precipitation;

    let reactive = (acid_count + base_count) as f64;
    let concentration = if volume > 0.0 {
        (reactive / (volume / 100.0).max(1.0)).min(MAX_CONCENTRATION)
    } else {
        0.0
    };

    let color = if has_indicator {
        indicator_color(ph)
    } else {
        previous.color
    };

    ReactionSnapshot {
        components: components.to_vec(),
        ph,
        temperature: previous.temperature,
        color,
        volume,
        concentration,
        pressure: previous.pressure,
        reaction_progress: previous.reaction_progress,
        reaction_type,
        is_boiling: previous.temperature >= BOILING_POINT,
        is_bubbling: is_bubbling(has_gas_evolution, controls.stirring_speed),
        has_gas_evolution,
        has_precipitate,
    }
}

fn indicator_color(ph: f64) -> LiquidColor {
    if ph < 7.0 {
        LiquidColor::Red
    } else if ph > 7.0 {
        LiquidColor::Blue
    } else {
        LiquidColor::Green
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn derive_fresh(items: &[&str]) -> ReactionSnapshot {
        derive(&labels(items), &Controls::default(), &ReactionSnapshot::default())
    }

    #[test]
    fn test_unreactive_mixture_is_neutral() {
        let snap = derive_fresh(&["Distilled Water", "Glass Beaker", "Mystery Powder"]);
        assert_eq!(snap.ph, 7.0);
        assert_eq!(snap.reaction_type, ReactionType::None);
        assert!(!snap.has_gas_evolution);
        assert!(!snap.has_precipitate);
    }

    #[test]
    fn test_hcl_and_naoh_neutralize() {
        let snap = derive_fresh(&["HCl (Hydrochloric Acid)", "NaOH (Sodium Hydroxide)"]);
        assert_eq!(snap.volume, 100.0);
        assert_eq!(snap.ph, 7.0);
        assert_eq!(snap.reaction_type, ReactionType::Neutralization);
        assert!(!snap.has_gas_evolution);
        assert!(!snap.has_precipitate);
        assert_eq!(snap.concentration, 2.0);
    }

    #[test]
    fn test_acid_excess_is_gas_evolution() {
        let snap = derive_fresh(&["HCl (Hydrochloric Acid)", "Nitric Acid", "NaOH (Sodium Hydroxide)"]);
        assert_eq!(snap.reaction_type, ReactionType::GasEvolution);
        assert!(snap.has_gas_evolution);
        assert!(snap.is_bubbling);
        assert_eq!(snap.ph, 5.5);
    }

    #[test]
    fn test_ph_saturates() {
        let acids: Vec<&str> = std::iter::repeat("HCl").take(40).collect();
        assert_eq!(derive_fresh(&acids).ph, 1.0);
        let bases: Vec<&str> = std::iter::repeat("NaOH").take(40).collect();
        assert_eq!(derive_fresh(&bases).ph, 13.0);
        assert_eq!(derive_fresh(&["HCl", "HCl"]).ph, 4.0);
    }

    #[test]
    fn test_silver_nitrate_and_salt_shadowed_by_neutralization() {
        let snap = derive_fresh(&["AgNO₃ (Silver Nitrate)", "NaCl (Sodium Chloride)"]);
        assert_eq!(snap.reaction_type, ReactionType::Neutralization);
        assert!(!snap.has_precipitate);
    }

    #[test]
    fn test_silver_and_chloride_without_acid_precipitate() {
        let snap = derive_fresh(&["Silver Foil", "Potassium Chloride"]);
        assert_eq!(snap.reaction_type, ReactionType::Precipitation);
        assert!(snap.has_precipitate);
        assert!(!snap.has_gas_evolution);
    }

    #[test]
    fn test_label_counts_once_per_set() {
        let class = classify("NaCl (Sodium Chloride)");
        assert!(class.base);
        assert!(!class.acid);
        assert_eq!(derive_fresh(&["NaCl (Sodium Chloride)"]).ph, 8.5);
    }

    #[test]
    fn test_volume_heuristic_and_order() {
        assert_eq!(component_volume("Distilled Water"), 100.0);
        assert_eq!(component_volume("Universal Indicator"), 5.0);
        assert_eq!(component_volume("Indicator water"), 5.0);
        assert_eq!(component_volume("NaOH (Base)"), 50.0);
        assert_eq!(component_volume("Sodium Carbonate"), 10.0);

        let forward = derive_fresh(&["Distilled Water", "HCl", "Universal Indicator", "Salt"]);
        let backward = derive_fresh(&["Salt", "Universal Indicator", "HCl", "Distilled Water"]);
        assert_eq!(forward.volume, 165.0);
        assert_eq!(forward.volume, backward.volume);
    }

    #[test]
    fn test_color_follows_indicator_or_carries_forward() {
        let acidic = derive_fresh(&["HCl", "Universal Indicator"]);
        assert_eq!(acidic.color, LiquidColor::Red);
        let basic = derive_fresh(&["NaOH", "Universal Indicator"]);
        assert_eq!(basic.color, LiquidColor::Blue);
        let neutral = derive_fresh(&["HCl", "NaOH", "Universal Indicator"]);
        assert_eq!(neutral.color, LiquidColor::Green);

        let previous = ReactionSnapshot {
            color: LiquidColor::Red,
            ..ReactionSnapshot::default()
        };
        let carried = derive(&labels(&["NaOH"]), &Controls::default(), &previous);
        assert_eq!(carried.color, LiquidColor::Red);
    }

    #[test]
    fn test_clock_fields_carried_over() {
        let previous = ReactionSnapshot {
            temperature: 100.0,
            pressure: 1.4,
            reaction_progress: 30.0,
            ..ReactionSnapshot::default()
        };
        let snap = derive(&labels(&["HCl"]), &Controls::default(), &previous);
        assert_eq!(snap.temperature, 100.0);
        assert!(snap.is_boiling);
        assert_eq!(snap.pressure, 1.4);
        assert_eq!(snap.reaction_progress, 30.0);
    }

    #[test]
    fn test_stirring_makes_bubbles() {
        let controls = Controls {
            stirring_speed: 200.0,
            ..Controls::default()
        };
        let snap = derive(&labels(&["Distilled Water"]), &controls, &ReactionSnapshot::default());
        assert!(snap.is_bubbling);
        assert!(!snap.has_gas_evolution);
    }

    #[test]
    fn test_controls_clamped() {
        let c = Controls {
            concentration: 9.0,
            heating_power: -5.0,
            stirring_speed: f64::NAN,
        }
        .clamped();
        assert_eq!(c.concentration, 5.0);
        assert_eq!(c.heating_power, 0.0);
        assert_eq!(c.stirring_speed, 0.0);
    }

    #[test]
    fn test_reaction_type_serializes_kebab_case() {
        let json = serde_json::to_string(&ReactionType::GasEvolution).unwrap();
        assert_eq!(json, "\"gas-evolution\"");
        assert_eq!(ReactionType::GasEvolution.as_str(), "gas-evolution");
    }
}
