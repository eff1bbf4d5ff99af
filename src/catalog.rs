use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Acid,
    Base,
    Salt,
    Solvent,
    Indicator,
    Glassware,
    Heating,
    Tool,
}

impl Category {
    /// Chemicals go into the beaker; apparatus stays on the bench
    pub fn is_chemical(self) -> bool {
        matches!(
            self,
            Category::Acid | Category::Base | Category::Salt | Category::Solvent | Category::Indicator
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Equipment {
    pub id: &'static str,
    pub category: Category,
    pub display_name: &'static str,
    pub display_color: &'static str,
    /// mol/L
    pub concentration: Option<f64>,
    /// mL per dose
    pub volume: Option<f64>,
}

pub fn catalog() -> &'static [Equipment] {
    &CATALOG
}

pub fn find(id: &str) -> Option<&'static Equipment> {
    CATALOG.iter().find(|e| e.id == id)
}

static CATALOG: [Equipment; 11] = [
    Equipment {
        id: "hcl-acid",
        category: Category::Acid,
        display_name: "HCl (Hydrochloric Acid)",
        display_color: "#EF4444",
        concentration: Some(1.0),
        volume: Some(50.0),
    },
    Equipment {
        id: "nitric-acid",
        category: Category::Acid,
        display_name: "HNO₃ (Nitric Acid)",
        display_color: "#F97316",
        concentration: Some(1.0),
        volume: Some(10.0),
    },
    Equipment {
        id: "naoh-base",
        category: Category::Base,
        display_name: "NaOH (Sodium Hydroxide)",
        display_color: "#3B82F6",
        concentration: Some(1.0),
        volume: Some(50.0),
    },
    Equipment {
        id: "sodium-carbonate",
        category: Category::Base,
        display_name: "Na₂CO₃ (Sodium Carbonate)",
        display_color: "#E5E7EB",
        concentration: Some(0.5),
        volume: Some(10.0),
    },
    Equipment {
        id: "silver-nitrate",
        category: Category::Salt,
        display_name: "AgNO₃ (Silver Nitrate)",
        display_color: "#D1D5DB",
        concentration: Some(0.1),
        volume: Some(10.0),
    },
    Equipment {
        id: "sodium-chloride",
        category: Category::Salt,
        display_name: "NaCl (Sodium Chloride)",
        display_color: "#F3F4F6",
        concentration: Some(0.5),
        volume: Some(10.0),
    },
    Equipment {
        id: "distilled-water",
        category: Category::Solvent,
        display_name: "Distilled Water",
        display_color: "#60A5FA",
        concentration: None,
        volume: Some(100.0),
    },
    Equipment {
        id: "universal-indicator",
        category: Category::Indicator,
        display_name: "Universal Indicator",
        display_color: "#A855F7",
        concentration: None,
        volume: Some(5.0),
    },
    Equipment {
        id: "glass-beaker",
        category: Category::Glassware,
        display_name: "Glass Beaker",
        display_color: "#9CA3AF",
        concentration: None,
        volume: None,
    },
    Equipment {
        id: "bunsen-burner",
        category: Category::Heating,
        display_name: "Bunsen Burner",
        display_color: "#F59E0B",
        concentration: None,
        volume: None,
    },
    Equipment {
        id: "dropper",
        category: Category::Tool,
        display_name: "Dropper",
        display_color: "#8B5CF6",
        concentration: None,
        volume: None,
    },
];
