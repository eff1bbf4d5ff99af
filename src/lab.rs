use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::catalog::{self, Category};
use crate::clock::{ExperimentClock, Sample};
use crate::error::LabError;
use crate::export;
use crate::reaction::{classify, derive, is_bubbling, Controls, ReactionSnapshot, ReactionType};

/// Short user-facing message raised by a lab action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum Notice {
    AcidAdded,
    BaseAdded,
    WaterAdded,
    IndicatorAdded,
    ComponentAdded(String),
    Neutralization,
    GasEvolution,
    Precipitate,
    Boiling,
    BeakerPlaced,
    BurnerReady,
    DropperSelected,
    Started,
    Paused,
    Reset,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::AcidAdded => write!(f, "Added acid - pH decreased!"),
            Notice::BaseAdded => write!(f, "Added base - pH increased!"),
            Notice::WaterAdded => write!(f, "Added water - solution diluted!"),
            Notice::IndicatorAdded => write!(f, "Added indicator - watch the color!"),
            Notice::ComponentAdded(label) => write!(f, "Added {label}"),
            Notice::Neutralization => write!(f, "Neutralization reaction!"),
            Notice::GasEvolution => write!(f, "Gas bubbles forming!"),
            Notice::Precipitate => write!(f, "A precipitate is forming!"),
            Notice::Boiling => write!(f, "Solution is boiling!"),
            Notice::BeakerPlaced => write!(f, "New beaker added to workspace!"),
            Notice::BurnerReady => write!(f, "Bunsen burner ready - use the heating dial"),
            Notice::DropperSelected => write!(f, "Using dropper for precise measurements!"),
            Notice::Started => write!(f, "Experiment started"),
            Notice::Paused => write!(f, "Experiment paused"),
            Notice::Reset => write!(f, "Experiment reset"),
        }
    }
}

/// Owns the beaker. Drops, dial changes, ticks and resets all go through here.
#[derive(Debug, Clone)]
pub struct Lab {
    snapshot: ReactionSnapshot,
    controls: Controls,
    clock: ExperimentClock,
}

impl Default for Lab {
    fn default() -> Self {
        Lab::new(crate::clock::DEFAULT_TICK)
    }
}

impl Lab {
    pub fn new(tick: Duration) -> Self {
        Lab {
            snapshot: ReactionSnapshot::default(),
            controls: Controls::default(),
            clock: ExperimentClock::new(tick),
        }
    }

    pub fn snapshot(&self) -> &ReactionSnapshot {
        &self.snapshot
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn set_controls(&mut self, controls: Controls) -> Controls {
        self.controls = controls.clamped();
        self.snapshot.is_bubbling = is_bubbling(self.snapshot.has_gas_evolution, self.controls.stirring_speed);
        self.controls
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn interval(&self) -> Duration {
        self.clock.interval()
    }

    /// Simulated time since the last reset
    pub fn elapsed(&self) -> Duration {
        self.clock.interval().mul_f64(self.clock.ticks() as f64)
    }

    pub fn samples(&self) -> &[Sample] {
        self.clock.samples()
    }

    pub fn export_csv(&self) -> String {
        export::to_csv(self.clock.samples())
    }

    pub fn add_component(&mut self, label: &str) -> Vec<Notice> {
        let before = self.snapshot.reaction_type;
        let mut components = self.snapshot.components.clone();
        components.push(label.to_string());
        self.snapshot = derive(&components, &self.controls, &self.snapshot);
        debug!(
            label,
            ph = self.snapshot.ph,
            reaction = self.snapshot.reaction_type.as_str(),
            "component added"
        );

        let mut notices = vec![added_notice(label)];
        let after = self.snapshot.reaction_type;
        if after != before {
            match after {
                ReactionType::Neutralization => notices.push(Notice::Neutralization),
                ReactionType::GasEvolution => notices.push(Notice::GasEvolution),
                ReactionType::Precipitation => notices.push(Notice::Precipitate),
                ReactionType::None | ReactionType::Distillation => {}
            }
        }
        notices
    }

    pub fn drop_equipment(&mut self, id: &str) -> Result<Vec<Notice>, LabError> {
        let item = catalog::find(id).ok_or_else(|| LabError::UnknownEquipment { id: id.to_string() })?;
        if item.category.is_chemical() {
            return Ok(self.add_component(item.display_name));
        }
        let notice = match item.category {
            Category::Heating => Notice::BurnerReady,
            Category::Tool => Notice::DropperSelected,
            _ => Notice::BeakerPlaced,
        };
        Ok(vec![notice])
    }

    pub fn start(&mut self) -> Notice {
        self.clock.start();
        Notice::Started
    }

    pub fn pause(&mut self) -> Notice {
        self.clock.pause();
        Notice::Paused
    }

    /// Back to the initial beaker with an empty history. Dials keep their setting.
    pub fn reset(&mut self) -> Notice {
        self.snapshot = ReactionSnapshot::default();
        self.clock.reset();
        Notice::Reset
    }

    pub fn tick<R: Rng>(&mut self, rng: &mut R) -> Vec<Notice> {
        let Some(next) = self.clock.tick(&self.snapshot, &self.controls, rng) else {
            return Vec::new();
        };
        let started_boiling = next.is_boiling && !self.snapshot.is_boiling;
        self.snapshot = next;
        if started_boiling {
            vec![Notice::Boiling]
        } else {
            Vec::new()
        }
    }
}

fn added_notice(label: &str) -> Notice {
    let class = classify(label);
    if class.indicator {
        Notice::IndicatorAdded
    } else if class.acid && !class.base {
        Notice::AcidAdded
    } else if class.base && !class.acid {
        Notice::BaseAdded
    } else if label.to_lowercase().contains("water") {
        Notice::WaterAdded
    } else {
        Notice::ComponentAdded(label.to_string())
    }
}
