use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Writes whole amounts as JSON integers (`95`, not `95.0`) so rewritten logs
/// keep the shape they were typed in; fractional values stay floats.
fn serialize_amount<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_amount")]
    pub score: f64,
    #[serde(serialize_with = "serialize_amount")]
    pub time_spent: f64,
    #[serde(serialize_with = "serialize_amount")]
    pub bounty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, score: f64, time_spent: f64, bounty: f64) -> Self {
        Self {
            date,
            score,
            time_spent,
            bounty,
            notes: None,
        }
    }

    pub fn value(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Score => self.score,
            Quantity::TimeSpent => self.time_spent,
            Quantity::Bounty => self.bounty,
        }
    }
}

/// The three measured quantities, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Score,
    TimeSpent,
    Bounty,
}

impl Quantity {
    pub const ALL: [Quantity; 3] = [Quantity::Score, Quantity::TimeSpent, Quantity::Bounty];

    pub fn label(&self) -> &'static str {
        match self {
            Quantity::Score => "Score",
            Quantity::TimeSpent => "Time",
            Quantity::Bounty => "Bounty",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Quantity::Score => "pts",
            Quantity::TimeSpent => "min",
            Quantity::Bounty => "USD",
        }
    }
}

/// Present, past and future values for one quantity.
///
/// `present` is `None` when the log has no entry for today. `past` is the most
/// recent defined moving average (0 before the window fills) and `future` the
/// rounded target derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelfTriplet {
    pub present: Option<f64>,
    pub past: f64,
    pub future: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelfMetrics {
    pub score: SelfTriplet,
    pub time_spent: SelfTriplet,
    pub bounty: SelfTriplet,
    pub todays_entry: Option<DailyRecord>,
    /// True once the history holds at least one full window.
    pub baseline_ready: bool,
}

impl SelfMetrics {
    pub fn get(&self, quantity: Quantity) -> &SelfTriplet {
        match quantity {
            Quantity::Score => &self.score,
            Quantity::TimeSpent => &self.time_spent,
            Quantity::Bounty => &self.bounty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub ordinal: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranking {
    pub present: Placement,
    pub past: Placement,
    pub future: Placement,
}

/// Ranking of a triplet whose present value may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripletRanking {
    pub present: Option<Placement>,
    pub past: Placement,
    pub future: Placement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WinTally {
    pub wins: usize,
    pub losses: usize,
}

impl WinTally {
    pub fn is_perfect(&self) -> bool {
        self.losses == 0 && self.wins == Quantity::ALL.len()
    }
}
