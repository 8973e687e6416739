use crate::models::{DailyRecord, Placement, Quantity, Ranking, SelfTriplet, TripletRanking, WinTally};

pub fn place_label(ordinal: usize) -> String {
    match ordinal {
        1 => "1st".to_string(),
        2 => "2nd".to_string(),
        3 => "3rd".to_string(),
        other => format!("{other}th"),
    }
}

/// Places each value by the first position it occupies in a descending copy.
///
/// Equal values share the better placement.
pub fn placements(values: &[f64]) -> Vec<Placement> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    values
        .iter()
        .map(|value| {
            let ordinal = sorted
                .iter()
                .position(|candidate| candidate == value)
                .map(|index| index + 1)
                .unwrap_or(values.len());
            Placement {
                ordinal,
                label: place_label(ordinal),
            }
        })
        .collect()
}

pub fn rank(present: f64, past: f64, future: f64) -> Ranking {
    let mut placed = placements(&[present, past, future]).into_iter();
    let mut next = || placed.next().unwrap_or_else(|| Placement { ordinal: 3, label: place_label(3) });
    Ranking {
        present: next(),
        past: next(),
        future: next(),
    }
}

/// Ranks the displayed values of a triplet. Without an entry today only past
/// and future compete, so a missing day never takes a podium slot.
pub fn rank_triplet(triplet: &SelfTriplet) -> TripletRanking {
    let past = triplet.past.round();
    let future = triplet.future;

    match triplet.present {
        Some(present) => {
            let ranking = rank(present, past, future);
            TripletRanking {
                present: Some(ranking.present),
                past: ranking.past,
                future: ranking.future,
            }
        }
        None => {
            let placed = placements(&[past, future]);
            TripletRanking {
                present: None,
                past: placed[0].clone(),
                future: placed[1].clone(),
            }
        }
    }
}

/// Counts the quantities where today's entry matched or beat the past average.
pub fn wins(entry: &DailyRecord, past_score: f64, past_time: f64, past_bounty: f64) -> usize {
    [
        (entry.score, past_score),
        (entry.time_spent, past_time),
        (entry.bounty, past_bounty),
    ]
    .iter()
    .filter(|(present, past)| present >= past)
    .count()
}

pub fn tally(entry: Option<&DailyRecord>, past_score: f64, past_time: f64, past_bounty: f64) -> WinTally {
    let total = Quantity::ALL.len();
    let won = entry
        .map(|entry| wins(entry, past_score, past_time, past_bounty))
        .unwrap_or(0);
    WinTally {
        wins: won,
        losses: total - won,
    }
}
