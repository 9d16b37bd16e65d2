//! Emission calculator.
//!
//! Resolves an activity to a CO2e mass by trying, in order:
//! 1. the provider estimate,
//! 2. grid intensity (electricity only),
//! 3. the local factor table.
//!
//! Steps run strictly one after another; a later source is only consulted
//! when every earlier one produced nothing usable. Every path yields an
//! [`EmissionEstimate`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{ActivityRecord, ActivityType, CalculationMethod, EmissionEstimate};
use tracing::debug;

use crate::factors::LocalFactorTable;
use crate::gateway::ThirdPartyGateway;

/// Round to 3 decimals, halves away from zero on the scaled value.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub struct EmissionCalculator {
    gateway: Arc<ThirdPartyGateway>,
    factors: LocalFactorTable,
}

impl EmissionCalculator {
    pub fn new(gateway: Arc<ThirdPartyGateway>) -> Self {
        Self {
            gateway,
            factors: LocalFactorTable::standard(),
        }
    }

    pub async fn calculate_emission(&self, record: &ActivityRecord) -> EmissionEstimate {
        let activity = &record.activity_type;
        let quantity = record.quantity;

        if !quantity.is_finite() || quantity < 0.0 {
            debug!("Rejecting {} quantity {}", activity, quantity);
            return EmissionEstimate::new(0.0, CalculationMethod::InvalidInput);
        }

        if let Some(kg) = self
            .gateway
            .estimate_provider_kg(activity, quantity, record.occurred_at)
            .await
        {
            if kg.is_finite() && kg >= 0.0 {
                return EmissionEstimate::new(round3(kg), CalculationMethod::ProviderEstimate);
            }
            debug!("Ignoring provider estimate {} for {}", kg, activity);
        }

        if *activity == ActivityType::ElectricityKwh {
            if let Some(intensity) = self
                .gateway
                .get_grid_intensity(record.region.as_deref())
                .await
            {
                if intensity.is_finite() && intensity > 0.0 {
                    // gCO2/kWh × kWh → g, then to kg.
                    let kg = quantity * intensity / 1000.0;
                    return EmissionEstimate::new(round3(kg), CalculationMethod::GridIntensity);
                }
            }
        }

        match self.factors.factor(activity) {
            Some(factor) => {
                EmissionEstimate::new(round3(quantity * factor), CalculationMethod::LocalFactor)
            }
            None => {
                debug!("No emission factor for {}", activity);
                EmissionEstimate::new(0.0, CalculationMethod::UnknownType)
            }
        }
    }

    /// Mass only, for callers that do not record the method.
    pub async fn calculate_emission_kg(
        &self,
        activity: impl Into<ActivityType>,
        quantity: f64,
        occurred_at: Option<DateTime<Utc>>,
    ) -> f64 {
        let mut record = ActivityRecord::new(activity, quantity);
        record.occurred_at = occurred_at;
        self.calculate_emission(&record).await.emission_kg
    }
}
