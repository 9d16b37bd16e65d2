//! Static emission factors (kg CO2e per unit), the last network-free step
//! of the fallback chain.

use common::ActivityType;
use std::collections::HashMap;

/// Default factors, one per known activity.
pub const STANDARD_FACTORS: [(ActivityType, f64); 5] = [
    (ActivityType::CarKm, 0.21),
    (ActivityType::PublicTransportKm, 0.08),
    (ActivityType::ElectricityKwh, 0.85),
    (ActivityType::MeatMeals, 2.5),
    (ActivityType::PlasticItems, 0.06),
];

/// Read-only activity → factor table.
#[derive(Debug, Clone)]
pub struct LocalFactorTable {
    factors: HashMap<ActivityType, f64>,
}

impl LocalFactorTable {
    pub fn standard() -> Self {
        Self {
            factors: STANDARD_FACTORS.into_iter().collect(),
        }
    }

    pub fn factor(&self, activity: &ActivityType) -> Option<f64> {
        self.factors.get(activity).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ActivityType, &f64)> {
        self.factors.iter()
    }
}

impl Default for LocalFactorTable {
    fn default() -> Self {
        Self::standard()
    }
}
