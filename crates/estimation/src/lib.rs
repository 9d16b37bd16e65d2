//! Emission estimation crate.
//!
//! Resolves activities to CO2e through a provider/grid/factor fallback chain
//! and fronts the third-party APIs with short-lived caches.

pub mod cache;
pub mod calculator;
pub mod conditions;
pub mod entry;
pub mod factors;
pub mod gateway;
pub mod goals;
pub mod recommend;

pub use cache::{TtlCache, NEGATIVE_TTL, POSITIVE_TTL};
pub use calculator::{round3, EmissionCalculator};
pub use conditions::{
    validate_coordinates, Coordinates, LocationConditions, MapLocation, NearbyConditions,
    DEFAULT_LOCATIONS,
};
pub use entry::{EntryDraft, EntrySource, ResolvedEntry};
pub use factors::{LocalFactorTable, STANDARD_FACTORS};
pub use gateway::{ConditionsSource, EstimateSource, IntensitySource, ThirdPartyGateway};
pub use goals::{
    evaluate_goal_progress, AlertDecision, AlertSkipReason, Goal, GoalAlert, GoalEvaluation,
    GoalProgress, GoalStatus,
};
pub use recommend::{build_recommendations, DateRange, HabitTotals, Impact, RecommendationSet, Tip};
