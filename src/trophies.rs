use serde::Serialize;

use crate::models::DailyRecord;

/// Predicate over the date-sorted history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrophyRule {
    /// Score spread over the last `days` records stays within `max_spread`.
    SteadyScores { days: usize, max_spread: f64 },
    /// Each of the last `steps` transitions is a strict score increase.
    RisingScores { steps: usize },
    BountyAtLeast(f64),
    TimeSpentAtLeast(f64),
}

impl TrophyRule {
    pub fn is_met(&self, history: &[DailyRecord]) -> bool {
        match *self {
            TrophyRule::SteadyScores { days, max_spread } => {
                if days == 0 || history.len() < days {
                    return false;
                }
                let recent = &history[history.len() - days..];
                let max = recent.iter().map(|r| r.score).fold(f64::MIN, f64::max);
                let min = recent.iter().map(|r| r.score).fold(f64::MAX, f64::min);
                max - min <= max_spread
            }
            TrophyRule::RisingScores { steps } => {
                if history.len() < steps + 1 {
                    return false;
                }
                history[history.len() - (steps + 1)..]
                    .windows(2)
                    .all(|pair| pair[1].score > pair[0].score)
            }
            TrophyRule::BountyAtLeast(threshold) => history.iter().any(|r| r.bounty >= threshold),
            TrophyRule::TimeSpentAtLeast(threshold) => {
                history.iter().any(|r| r.time_spent >= threshold)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trophy {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub rule: TrophyRule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrophyStatus {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub unlocked: bool,
}

pub fn default_trophies() -> Vec<Trophy> {
    vec![
        Trophy {
            id: "consistency",
            name: "Consistency King",
            icon: "👑",
            description: "Keep your score within 20 points across the last 7 entries",
            rule: TrophyRule::SteadyScores {
                days: 7,
                max_spread: 20.0,
            },
        },
        Trophy {
            id: "continuous_improvement",
            name: "Continuous Improvement",
            icon: "📈",
            description: "Raise your score three entries in a row",
            rule: TrophyRule::RisingScores { steps: 3 },
        },
        Trophy {
            id: "bounty_hunter",
            name: "Bounty Hunter",
            icon: "💰",
            description: "Earn a bounty of 1000 or more in a single day",
            rule: TrophyRule::BountyAtLeast(1000.0),
        },
        Trophy {
            id: "marathon",
            name: "Marathon",
            icon: "🏃",
            description: "Spend 300 minutes or more in a single day",
            rule: TrophyRule::TimeSpentAtLeast(300.0),
        },
    ]
}

/// Evaluates every trophy against `history`, which must already be sorted by date.
pub fn evaluate(trophies: &[Trophy], history: &[DailyRecord]) -> Vec<TrophyStatus> {
    trophies
        .iter()
        .map(|trophy| TrophyStatus {
            id: trophy.id.to_string(),
            name: trophy.name.to_string(),
            icon: trophy.icon.to_string(),
            description: trophy.description.to_string(),
            unlocked: trophy.rule.is_met(history),
        })
        .collect()
}
