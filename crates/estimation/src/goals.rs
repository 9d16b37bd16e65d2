//! Emission goals: keep total CO2e at or under `max_kg` within a period.

use chrono::{DateTime, Utc};
use common::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Achieved,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub title: String,
    pub max_kg: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: GoalStatus,
    pub alerts_enabled: bool,
    #[serde(default)]
    pub alert_email: Option<String>,
    #[serde(default)]
    pub last_alert_at: Option<DateTime<Utc>>,
}

impl Goal {
    pub fn new(
        title: impl Into<String>,
        max_kg: f64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Self> {
        let title = title.into().trim().to_string();
        let len = title.chars().count();
        if !(3..=120).contains(&len) {
            return Err(Error::InvalidGoal("title must be 3-120 characters".into()));
        }
        if !max_kg.is_finite() || max_kg < 0.0 {
            return Err(Error::InvalidGoal("max kg must be a number >= 0".into()));
        }
        if end_date <= start_date {
            return Err(Error::InvalidGoal("end date must be after start date".into()));
        }

        Ok(Self {
            title,
            max_kg,
            start_date,
            end_date,
            status: GoalStatus::Active,
            alerts_enabled: true,
            alert_email: None,
            last_alert_at: None,
        })
    }

    pub fn with_alert_email(mut self, email: &str) -> Self {
        let email = email.trim().to_lowercase();
        self.alert_email = (!email.is_empty()).then_some(email);
        self
    }

    pub fn without_alerts(mut self) -> Self {
        self.alerts_enabled = false;
        self
    }

    /// Period over which emissions count toward the goal so far.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start_date, now.min(self.end_date))
    }

    pub fn overlaps(&self, other: &Goal) -> bool {
        self.start_date < other.end_date && self.end_date > other.start_date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub current_kg: f64,
    pub max_kg: f64,
    pub remaining_kg: f64,
    pub exceeded: bool,
    pub status: GoalStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Alert email content; delivery belongs to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalAlert {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSkipReason {
    AlertsDisabled,
    NotExceeded,
    NoEmail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertDecision {
    Compose(GoalAlert),
    NotSent(AlertSkipReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalEvaluation {
    pub progress: GoalProgress,
    pub alert: AlertDecision,
}

/// Update `goal` for `current_kg` emitted so far and decide on an alert.
///
/// Status only settles once the period is over; before that a manually set
/// status is left alone.
pub fn evaluate_goal_progress(
    goal: &mut Goal,
    current_kg: f64,
    now: DateTime<Utc>,
    fallback_email: Option<&str>,
) -> GoalEvaluation {
    let remaining_kg = (goal.max_kg - current_kg).max(0.0);
    let exceeded = current_kg > goal.max_kg;

    if now >= goal.end_date {
        goal.status = if exceeded {
            GoalStatus::Failed
        } else {
            GoalStatus::Achieved
        };
    }

    let alert = if !goal.alerts_enabled {
        AlertDecision::NotSent(AlertSkipReason::AlertsDisabled)
    } else if !exceeded {
        AlertDecision::NotSent(AlertSkipReason::NotExceeded)
    } else {
        let to = goal
            .alert_email
            .clone()
            .or_else(|| fallback_email.map(|e| e.trim().to_string()))
            .filter(|e| !e.is_empty());
        match to {
            Some(to) => {
                goal.last_alert_at = Some(now);
                AlertDecision::Compose(GoalAlert {
                    to,
                    subject: format!("EcoTrack Goal Alert: {}", goal.title),
                    text: format!(
                        "Your emissions for this goal period have exceeded the target.\n\n\
                         Goal: {}\nTarget (max): {} kg CO2e\nCurrent: {:.2} kg CO2e\nRemaining: {:.2} kg CO2e\n",
                        goal.title, goal.max_kg, current_kg, remaining_kg
                    ),
                })
            }
            None => AlertDecision::NotSent(AlertSkipReason::NoEmail),
        }
    };

    GoalEvaluation {
        progress: GoalProgress {
            current_kg,
            max_kg: goal.max_kg,
            remaining_kg,
            exceeded,
            status: goal.status,
            start_date: goal.start_date,
            end_date: goal.end_date,
        },
        alert,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn march() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = DateTime::parse_from_rfc3339("2026-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        (start, start + Duration::days(31))
    }

    fn goal(max_kg: f64) -> Goal {
        let (start, end) = march();
        Goal::new("March budget", max_kg, start, end).expect("valid goal")
    }

    #[test]
    fn test_goal_validation() {
        let (start, end) = march();
        assert!(Goal::new("ok", 10.0, start, end).is_err());
        assert!(Goal::new("Budget", -1.0, start, end).is_err());
        assert!(Goal::new("Budget", 10.0, end, start).is_err());
        assert!(Goal::new("Budget", 10.0, start, start).is_err());
    }

    #[test]
    fn test_window_is_capped_at_end_date() {
        let g = goal(50.0);
        let mid = g.start_date + Duration::days(10);
        assert_eq!(g.window(mid), (g.start_date, mid));
        assert_eq!(g.window(g.end_date + Duration::days(3)), (g.start_date, g.end_date));
    }

    #[test]
    fn test_overlap() {
        let a = goal(50.0);
        let mut b = goal(50.0);
        b.start_date = a.end_date;
        b.end_date = a.end_date + Duration::days(30);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&goal(10.0)));
    }

    #[test]
    fn test_active_goal_within_budget() {
        let mut g = goal(50.0);
        let now = g.start_date + Duration::days(5);
        let eval = evaluate_goal_progress(&mut g, 20.0, now, Some("me@example.com"));

        assert_eq!(eval.progress.remaining_kg, 30.0);
        assert!(!eval.progress.exceeded);
        assert_eq!(eval.progress.status, GoalStatus::Active);
        assert_eq!(eval.alert, AlertDecision::NotSent(AlertSkipReason::NotExceeded));
    }

    #[test]
    fn test_period_end_settles_status() {
        let mut achieved = goal(50.0);
        let after = achieved.end_date;
        evaluate_goal_progress(&mut achieved, 50.0, after, None);
        assert_eq!(achieved.status, GoalStatus::Achieved);

        let mut failed = goal(50.0).without_alerts();
        let eval = evaluate_goal_progress(&mut failed, 50.5, after, None);
        assert_eq!(failed.status, GoalStatus::Failed);
        assert_eq!(eval.alert, AlertDecision::NotSent(AlertSkipReason::AlertsDisabled));
    }

    #[test]
    fn test_manual_status_kept_before_end() {
        let mut g = goal(50.0);
        g.status = GoalStatus::Achieved;
        let now = g.start_date + Duration::days(1);
        evaluate_goal_progress(&mut g, 1.0, now, None);
        assert_eq!(g.status, GoalStatus::Achieved);
    }

    #[test]
    fn test_exceeded_goal_composes_alert() {
        let mut g = goal(10.0).with_alert_email("  Me@Example.com ");
        let now = g.start_date + Duration::days(2);
        let eval = evaluate_goal_progress(&mut g, 12.5, now, Some("fallback@example.com"));

        let AlertDecision::Compose(alert) = eval.alert else {
            panic!("expected an alert");
        };
        assert_eq!(alert.to, "me@example.com");
        assert_eq!(alert.subject, "EcoTrack Goal Alert: March budget");
        assert!(alert.text.contains("Target (max): 10 kg CO2e"));
        assert!(alert.text.contains("Current: 12.50 kg CO2e"));
        assert!(alert.text.contains("Remaining: 0.00 kg CO2e"));
        assert_eq!(g.last_alert_at, Some(now));
    }

    #[test]
    fn test_alert_falls_back_to_account_email() {
        let mut g = goal(10.0);
        let now = g.start_date + Duration::days(2);
        let eval = evaluate_goal_progress(&mut g, 11.0, now, Some("user@example.com"));
        assert!(matches!(eval.alert, AlertDecision::Compose(ref a) if a.to == "user@example.com"));

        let mut g = goal(10.0);
        let eval = evaluate_goal_progress(&mut g, 11.0, now, None);
        assert_eq!(eval.alert, AlertDecision::NotSent(AlertSkipReason::NoEmail));
        assert!(g.last_alert_at.is_none());
    }
}
