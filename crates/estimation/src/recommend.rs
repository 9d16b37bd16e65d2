//! Recommendation rules.
//!
//! Turns per-activity totals for a date range, plus the current weather,
//! into a list of tips with the evidence that triggered each one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{ActivityType, WeatherSnapshot};
use serde::{Deserialize, Serialize};

use crate::gateway::ThirdPartyGateway;

pub const CAR_KM_THRESHOLD: f64 = 60.0;
pub const ELECTRICITY_KWH_THRESHOLD: f64 = 40.0;
pub const MEAT_MEALS_THRESHOLD: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    Low,
    Medium,
    High,
    Positive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityTotal {
    pub total_value: f64,
    pub total_kg: f64,
}

/// Sums of logged quantity and emission per activity.
#[derive(Debug, Clone, Default)]
pub struct HabitTotals {
    totals: HashMap<ActivityType, ActivityTotal>,
}

impl HabitTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, activity: ActivityType, value: f64, emission_kg: f64) {
        let total = self.totals.entry(activity).or_default();
        total.total_value += value;
        total.total_kg += emission_kg;
    }

    pub fn get(&self, activity: &ActivityType) -> Option<ActivityTotal> {
        self.totals.get(activity).copied()
    }

    fn value_of(&self, activity: &ActivityType) -> f64 {
        self.get(activity).map(|t| t.total_value).unwrap_or(0.0)
    }
}

impl FromIterator<(ActivityType, f64, f64)> for HabitTotals {
    fn from_iter<I: IntoIterator<Item = (ActivityType, f64, f64)>>(iter: I) -> Self {
        let mut totals = HabitTotals::new();
        for (activity, value, kg) in iter {
            totals.add(activity, value, kg);
        }
        totals
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    pub title: String,
    pub body: String,
    pub impact: Impact,
    pub why: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitEvidence {
    pub car_km: Option<ActivityTotal>,
    pub electricity_kwh: Option<ActivityTotal>,
    pub meat_meals: Option<ActivityTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub habits: HabitEvidence,
    pub weather: Option<WeatherSnapshot>,
    pub range: DateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub weather: Option<WeatherSnapshot>,
    pub tips: Vec<Tip>,
    pub evidence: Evidence,
}

fn tip(title: &str, body: String, impact: Impact, why: String) -> Tip {
    Tip {
        title: title.to_string(),
        body,
        impact,
        why: vec![why],
    }
}

pub fn build_recommendations(
    totals: &HabitTotals,
    weather: Option<WeatherSnapshot>,
    range: DateRange,
) -> RecommendationSet {
    let mut tips = Vec::new();

    let car_km = totals.value_of(&ActivityType::CarKm);
    if car_km > CAR_KM_THRESHOLD {
        tips.push(tip(
            "Cut down car travel",
            "Your weekly car travel is high. Try public transport or carpooling for at least 2 trips this week.".into(),
            Impact::High,
            format!(
                "Car travel in range: {} km (threshold: {} km)",
                car_km.round(),
                CAR_KM_THRESHOLD
            ),
        ));
    }

    let kwh = totals.value_of(&ActivityType::ElectricityKwh);
    if kwh > ELECTRICITY_KWH_THRESHOLD {
        tips.push(tip(
            "Reduce electricity usage",
            "Consider switching off standby devices and using LED bulbs to reduce kWh usage.".into(),
            Impact::Medium,
            format!(
                "Electricity usage in range: {} kWh (threshold: {} kWh)",
                kwh.round(),
                ELECTRICITY_KWH_THRESHOLD
            ),
        ));
    }

    let meals = totals.value_of(&ActivityType::MeatMeals);
    if meals > MEAT_MEALS_THRESHOLD {
        tips.push(tip(
            "Try a plant-based day",
            "Replacing 1-2 meat meals per week can significantly reduce your footprint.".into(),
            Impact::Medium,
            format!(
                "Meat meals in range: {} (threshold: {})",
                meals.round(),
                MEAT_MEALS_THRESHOLD
            ),
        ));
    }

    if let Some(w) = &weather {
        let observed = format!(
            "Weather from OpenWeather: {} at {}°C in {}",
            w.condition, w.temp_c, w.city
        );
        match w.condition.as_str() {
            "Clear" | "Clouds" => tips.push(tip(
                "Weather looks good for walking/cycling",
                format!(
                    "It's {}°C in {}. Consider walking or cycling for short trips today.",
                    w.temp_c, w.city
                ),
                Impact::Low,
                observed,
            )),
            "Rain" | "Thunderstorm" => tips.push(tip(
                "Rainy weather: plan low-carbon indoors",
                "If you skip walking today due to rain, try reducing electricity use indoors (shorter showers, switch off standby devices).".into(),
                Impact::Low,
                observed,
            )),
            _ => {}
        }
    }

    if tips.is_empty() {
        tips.push(tip(
            "Great job!",
            "Your recent activity looks balanced. Keep logging habits to get smarter insights.".into(),
            Impact::Positive,
            "No major high-impact signals detected in the selected date range.".into(),
        ));
    }

    let habits = HabitEvidence {
        car_km: totals.get(&ActivityType::CarKm),
        electricity_kwh: totals.get(&ActivityType::ElectricityKwh),
        meat_meals: totals.get(&ActivityType::MeatMeals),
    };

    RecommendationSet {
        weather: weather.clone(),
        tips,
        evidence: Evidence {
            habits,
            weather,
            range,
        },
    }
}

impl ThirdPartyGateway {
    /// Recommendations using the configured city's current weather.
    pub async fn recommendations_for(
        &self,
        totals: &HabitTotals,
        range: DateRange,
    ) -> RecommendationSet {
        let weather = self.weather_for_city(None).await;
        build_recommendations(totals, weather, range)
    }
}
