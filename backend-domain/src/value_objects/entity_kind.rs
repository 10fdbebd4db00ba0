// Entity kind value object

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Character,
    Corporation,
    Alliance,
    ShipType,
    SolarSystem,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Character => "character",
            EntityKind::Corporation => "corporation",
            EntityKind::Alliance => "alliance",
            EntityKind::ShipType => "ship_type",
            EntityKind::SolarSystem => "solar_system",
        }
    }

    pub fn display_word(&self) -> &'static str {
        match self {
            EntityKind::Character => "Character",
            EntityKind::Corporation => "Corporation",
            EntityKind::Alliance => "Alliance",
            EntityKind::ShipType => "Type",
            EntityKind::SolarSystem => "System",
        }
    }

    /// Static kinds resolve from the local static-data tables,
    /// volatile kinds go through the external bulk lookup API.
    pub fn is_static(&self) -> bool {
        matches!(self, EntityKind::ShipType | EntityKind::SolarSystem)
    }

    pub fn placeholder(&self, id: u64) -> String {
        format!("Unknown {} ({})", self.display_word(), id)
    }
}
