//! Emission entry resolution.
//!
//! Turns a draft entry (habit-derived or manual) into the figure a caller
//! persists. Unlike the calculator this is fallible: a draft must carry
//! either a direct mass or something to calculate one from.

use chrono::{DateTime, Utc};
use common::{ActivityRecord, ActivityType, CalculationMethod, Error, Result};
use serde::{Deserialize, Serialize};

use crate::calculator::EmissionCalculator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Habit,
    Manual,
}

/// An entry as submitted, before its mass is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub source: EntrySource,
    #[serde(default)]
    pub activity_type: Option<ActivityType>,
    #[serde(default)]
    pub quantity: Option<f64>,
    /// Caller-supplied mass; skips calculation when present.
    #[serde(default)]
    pub emission_kg: Option<f64>,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// An entry ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntry {
    pub source: EntrySource,
    pub activity_type: Option<ActivityType>,
    pub quantity: Option<f64>,
    pub emission_kg: f64,
    pub method: CalculationMethod,
    pub occurred_at: DateTime<Utc>,
    pub region: Option<String>,
    pub notes: Option<String>,
}

impl EntryDraft {
    /// Entry mirroring a logged habit.
    pub fn from_habit(
        activity: impl Into<ActivityType>,
        quantity: f64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: EntrySource::Habit,
            activity_type: Some(activity.into()),
            quantity: Some(quantity),
            emission_kg: None,
            occurred_at,
            region: None,
            notes: None,
        }
    }

    pub fn manual(occurred_at: DateTime<Utc>) -> Self {
        Self {
            source: EntrySource::Manual,
            activity_type: None,
            quantity: None,
            emission_kg: None,
            occurred_at,
            region: None,
            notes: None,
        }
    }

    pub fn activity(mut self, activity: impl Into<ActivityType>, quantity: f64) -> Self {
        self.activity_type = Some(activity.into());
        self.quantity = Some(quantity);
        self
    }

    pub fn direct_kg(mut self, kg: f64) -> Self {
        self.emission_kg = Some(kg);
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl EmissionCalculator {
    /// Resolve a draft's mass: the direct figure when given (recorded as
    /// `local_factor`), otherwise a calculated estimate.
    pub async fn resolve_entry(&self, draft: EntryDraft) -> Result<ResolvedEntry> {
        let region = trimmed(draft.region);
        let notes = trimmed(draft.notes);

        let (emission_kg, method) = match draft.emission_kg {
            Some(kg) => {
                if !kg.is_finite() || kg < 0.0 {
                    return Err(Error::InvalidEntry(format!(
                        "emission kg must be a number >= 0, got {kg}"
                    )));
                }
                (kg, CalculationMethod::LocalFactor)
            }
            None => {
                let (Some(activity), Some(quantity)) = (draft.activity_type.clone(), draft.quantity)
                else {
                    return Err(Error::InvalidEntry(
                        "activity type and quantity required when emission kg is omitted".into(),
                    ));
                };
                let record = ActivityRecord {
                    activity_type: activity,
                    quantity,
                    occurred_at: Some(draft.occurred_at),
                    region: region.clone(),
                };
                let estimate = self.calculate_emission(&record).await;
                (estimate.emission_kg, estimate.method)
            }
        };

        Ok(ResolvedEntry {
            source: draft.source,
            activity_type: draft.activity_type,
            quantity: draft.quantity,
            emission_kg,
            method,
            occurred_at: draft.occurred_at,
            region,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::stubs::StubIntensity;
    use crate::gateway::ThirdPartyGateway;
    use common::EcoConfig;
    use std::sync::Arc;

    fn calculator(intensity: Option<f64>) -> (EmissionCalculator, Arc<StubIntensity>) {
        let grid = StubIntensity::returning(intensity);
        let gateway = ThirdPartyGateway::new(&EcoConfig::default(), grid.clone());
        (EmissionCalculator::new(Arc::new(gateway)), grid)
    }

    #[tokio::test]
    async fn test_habit_entry_is_calculated() {
        let (calc, _) = calculator(None);
        let entry = calc
            .resolve_entry(EntryDraft::from_habit("meat_meals", 3.0, Utc::now()))
            .await
            .expect("habit entry resolves");

        assert_eq!(entry.source, EntrySource::Habit);
        assert_eq!(entry.emission_kg, 7.5);
        assert_eq!(entry.method, CalculationMethod::LocalFactor);
    }

    #[tokio::test]
    async fn test_manual_entry_passes_region_to_grid_lookup() {
        let (calc, grid) = calculator(Some(200.0));
        let entry = calc
            .resolve_entry(
                EntryDraft::manual(Utc::now())
                    .activity("electricity_kwh", 5.0)
                    .region(" 13 ")
                    .notes("  heater  "),
            )
            .await
            .unwrap();

        assert_eq!(entry.emission_kg, 1.0);
        assert_eq!(entry.method, CalculationMethod::GridIntensity);
        assert_eq!(entry.region.as_deref(), Some("13"));
        assert_eq!(entry.notes.as_deref(), Some("heater"));
        assert_eq!(*grid.regions.lock().unwrap(), vec![Some("13".to_string())]);
    }

    #[tokio::test]
    async fn test_direct_kg_skips_calculation() {
        let (calc, grid) = calculator(Some(200.0));
        let entry = calc
            .resolve_entry(EntryDraft::manual(Utc::now()).direct_kg(12.5).notes("   "))
            .await
            .unwrap();

        assert_eq!(entry.emission_kg, 12.5);
        assert_eq!(entry.method, CalculationMethod::LocalFactor);
        assert!(entry.notes.is_none());
        assert_eq!(grid.calls(), 0);
    }

    #[tokio::test]
    async fn test_draft_without_kg_or_activity_is_rejected() {
        let (calc, _) = calculator(None);
        let err = calc
            .resolve_entry(EntryDraft::manual(Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEntry(_)));
    }

    #[tokio::test]
    async fn test_negative_direct_kg_is_rejected() {
        let (calc, _) = calculator(None);
        let err = calc
            .resolve_entry(EntryDraft::manual(Utc::now()).direct_kg(-1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEntry(_)));
    }
}
