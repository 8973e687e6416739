use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::DashboardError;
use crate::metrics;
use crate::models::{DailyRecord, Placement, Quantity, SelfMetrics, TripletRanking, WinTally};
use crate::ranking;
use crate::trophies::{self, TrophyStatus};

/// Chart data for one quantity, aligned to the date-sorted history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<NaiveDate>,
    pub present: Vec<f64>,
    pub past: Vec<Option<f64>>,
    pub future: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityCard {
    pub quantity: Quantity,
    pub label: String,
    pub unit: String,
    pub present: Option<f64>,
    /// Rounded baseline; `None` until the first window fills.
    pub past: Option<f64>,
    pub past_average: f64,
    pub future: Option<f64>,
    pub ranking: TripletRanking,
    pub chart: ChartSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleReport {
    pub tally: WinTally,
    pub perfect_victory: bool,
    pub headline: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub today: NaiveDate,
    pub record_count: usize,
    pub window_size: usize,
    pub target_multiplier: f64,
    pub today_logged: bool,
    pub baseline_ready: bool,
    pub cards: Vec<QuantityCard>,
    pub battle: BattleReport,
    pub trophies: Vec<TrophyStatus>,
}

pub fn chart_series(sorted: &[DailyRecord], quantity: Quantity, config: &EngineConfig) -> ChartSeries {
    let present = metrics::series(sorted, quantity);
    let past = metrics::moving_average(&present, config.window_size);
    let future = past
        .iter()
        .map(|value| value.map(|v| v * config.target_multiplier))
        .collect();

    ChartSeries {
        labels: sorted.iter().map(|record| record.date).collect(),
        present,
        past,
        future,
    }
}

fn battle_report(selves: &SelfMetrics, config: &EngineConfig, history_len: usize) -> BattleReport {
    let tally = ranking::tally(
        selves.todays_entry.as_ref(),
        selves.score.past,
        selves.time_spent.past,
        selves.bounty.past,
    );
    let perfect_victory = tally.is_perfect();
    let mut lines = Vec::new();

    let headline = match &selves.todays_entry {
        None => format!(
            "No entry logged for today. Past self takes all {} rounds by default.",
            tally.losses
        ),
        Some(_) if perfect_victory => {
            "Perfect victory! Present self matched or beat past self on every front.".to_string()
        }
        Some(_) => format!(
            "Present self won {} of {} rounds against past self.",
            tally.wins,
            tally.wins + tally.losses
        ),
    };

    if selves.todays_entry.is_some() {
        for quantity in Quantity::ALL {
            let triplet = selves.get(quantity);
            let present = triplet.present.unwrap_or_default();
            let diff = present - triplet.past;
            let verdict = if diff >= 0.0 { "won" } else { "lost" };
            let mut line = format!(
                "{}: {} {} vs past average {} ({}{}), {}",
                quantity.label(),
                format_value(present),
                quantity.unit(),
                format_value(triplet.past),
                if diff >= 0.0 { "+" } else { "-" },
                format_value(diff.abs()),
                verdict
            );
            if selves.baseline_ready && present >= triplet.future {
                let _ = write!(line, "; target {} reached", format_value(triplet.future));
            }
            lines.push(line);
        }
    }

    if !selves.baseline_ready {
        lines.push(format!(
            "Past self is still warming up: {} of {} days logged.",
            history_len, config.window_size
        ));
    }

    BattleReport {
        tally,
        perfect_victory,
        headline,
        lines,
    }
}

/// Derives everything the dashboard shows. Pure: no I/O, no clock.
pub fn build_dashboard(records: &[DailyRecord], today: NaiveDate, config: &EngineConfig) -> DashboardView {
    let sorted = metrics::sort_by_date(records);
    let selves = metrics::derive_self(&sorted, today, config);

    let cards = Quantity::ALL
        .iter()
        .map(|&quantity| {
            let triplet = selves.get(quantity);
            QuantityCard {
                quantity,
                label: quantity.label().to_string(),
                unit: quantity.unit().to_string(),
                present: triplet.present,
                past: selves.baseline_ready.then(|| triplet.past.round()),
                past_average: triplet.past,
                future: selves.baseline_ready.then_some(triplet.future),
                ranking: ranking::rank_triplet(triplet),
                chart: chart_series(&sorted, quantity, config),
            }
        })
        .collect();

    DashboardView {
        today,
        record_count: sorted.len(),
        window_size: config.window_size,
        target_multiplier: config.target_multiplier,
        today_logged: selves.todays_entry.is_some(),
        baseline_ready: selves.baseline_ready,
        cards,
        battle: battle_report(&selves, config, sorted.len()),
        trophies: trophies::evaluate(&trophies::default_trophies(), &sorted),
    }
}

pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_value).unwrap_or_else(|| "N/A".to_string())
}

fn medal(ordinal: usize) -> &'static str {
    match ordinal {
        1 => "🥇",
        2 => "🥈",
        3 => "🥉",
        _ => "",
    }
}

fn cell(value: Option<f64>, place: Option<&Placement>) -> String {
    match place {
        Some(place) => format!(
            "{} ({} {})",
            format_optional(value),
            medal(place.ordinal),
            place.label
        ),
        None => format_optional(value),
    }
}

pub fn render_markdown(view: &DashboardView, trend_days: usize) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Past vs Present vs Future Self");
    let _ = writeln!(
        output,
        "Generated for {} from {} daily entries ({}-day window, {}% target)",
        view.today,
        view.record_count,
        view.window_size,
        format_value(((view.target_multiplier - 1.0) * 1000.0).round() / 10.0)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Rankings");
    let _ = writeln!(
        output,
        "| | Present Self | Past Self ({}d Avg) | Future Self (Target) |",
        view.window_size
    );
    let _ = writeln!(output, "|---|---|---|---|");
    for card in &view.cards {
        let _ = writeln!(
            output,
            "| {} ({}) | {} | {} | {} |",
            card.label,
            card.unit,
            cell(card.present, card.ranking.present.as_ref()),
            cell(card.past, Some(&card.ranking.past)),
            cell(card.future, Some(&card.ranking.future)),
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Battle Report");
    let _ = writeln!(output, "{}", view.battle.headline);
    if !view.battle.lines.is_empty() {
        let _ = writeln!(output);
        for line in &view.battle.lines {
            let _ = writeln!(output, "- {line}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trophy Case");
    for trophy in &view.trophies {
        let _ = writeln!(
            output,
            "- {} {}: {} ({})",
            if trophy.unlocked { trophy.icon.as_str() } else { "🔒" },
            trophy.name,
            if trophy.unlocked { "unlocked" } else { "locked" },
            trophy.description
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Trend");
    let Some(first) = view.cards.first() else {
        return output;
    };
    if first.chart.labels.is_empty() {
        let _ = writeln!(output, "No entries logged yet.");
        return output;
    }

    let _ = write!(output, "| Date |");
    for card in &view.cards {
        let _ = write!(output, " {} | {} Avg | {} Target |", card.label, card.label, card.label);
    }
    let _ = writeln!(output);
    let _ = write!(output, "|---|");
    for _ in &view.cards {
        let _ = write!(output, "---|---|---|");
    }
    let _ = writeln!(output);

    let len = first.chart.labels.len();
    for index in len.saturating_sub(trend_days)..len {
        let _ = write!(output, "| {} |", first.chart.labels[index]);
        for card in &view.cards {
            let _ = write!(
                output,
                " {} | {} | {} |",
                format_value(card.chart.present[index]),
                card.chart.past[index].map(format_value).unwrap_or_else(|| "--".to_string()),
                card.chart.future[index].map(format_value).unwrap_or_else(|| "--".to_string()),
            );
        }
        let _ = writeln!(output);
    }

    output
}

/// Replacement view shown instead of the dashboard when loading fails.
pub fn render_error(error: &DashboardError) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Error loading data.");
    let hint = match error {
        DashboardError::SourceUnavailable { .. } => "Check that the data source exists and is reachable.",
        DashboardError::MalformedData(_) => "Check that the data source is a valid JSON array of daily entries.",
        DashboardError::InvalidConfig(_) => "Check the window and target settings.",
    };
    let _ = writeln!(output, "{hint}");
    let _ = writeln!(output);
    let _ = writeln!(output, "```");
    let _ = writeln!(output, "{error}");
    let _ = writeln!(output, "```");
    output
}
