use crate::history::SavedRound;
use crate::problem::DifficultyId;
use crate::util::{mean, round1};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;

/// Rounds considered when charting response times
pub const STATS_ROUND_LIMIT: usize = 100;

pub const OVERALL: &str = "overall";

/// Mean response time for one category of one round
#[derive(Debug, Clone, PartialEq)]
pub struct StatsPoint {
    pub session_id: i64,
    pub session_date: DateTime<Local>,
    pub category: String,
    pub average_time: f64,
    pub difficulty: DifficultyId,
}

/// One line on the response-time chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub category: String,
    pub label: String,
    /// (1-based session index, average seconds)
    pub points: Vec<(f64, f64)>,
}

pub fn category_label(category: &str) -> String {
    match category {
        OVERALL => "Overall Mean".to_string(),
        "mixed" => "Mixed".to_string(),
        other => category
            .parse::<crate::problem::Operation>()
            .map(|op| op.label().to_string())
            .unwrap_or_else(|_| other.to_string()),
    }
}

/// Per-round, per-category mean response times plus an overall mean, oldest round first
pub fn collect_stats_points(rounds: &[SavedRound]) -> Vec<StatsPoint> {
    let mut points = Vec::new();

    for saved in rounds {
        let record = &saved.record;
        if record.attempts.is_empty() {
            continue;
        }

        let mut by_category: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for attempt in &record.attempts {
            by_category
                .entry(attempt.category.to_string())
                .or_default()
                .push(f64::from(attempt.time_taken_secs));
        }

        let point = |category: String, times: &[f64]| StatsPoint {
            session_id: saved.id,
            session_date: record.created_at,
            category,
            average_time: round1(mean(times).unwrap_or(0.0)),
            difficulty: record.difficulty,
        };

        for (category, times) in &by_category {
            points.push(point(category.clone(), times));
        }

        let all: Vec<f64> = record
            .attempts
            .iter()
            .map(|a| f64::from(a.time_taken_secs))
            .collect();
        points.push(point(OVERALL.to_string(), &all));
    }

    points.sort_by_key(|p| p.session_date);
    points
}

/// Group points into chart lines: categories alphabetical with the overall mean last
pub fn chart_series(points: &[StatsPoint]) -> Vec<ChartSeries> {
    let mut sessions: Vec<i64> = points.iter().map(|p| p.session_id).collect();
    sessions.sort_unstable();
    sessions.dedup();

    let mut categories: Vec<&str> = points.iter().map(|p| p.category.as_str()).collect();
    categories.sort_by(|a, b| match (*a == OVERALL, *b == OVERALL) {
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        _ => a.cmp(b),
    });
    categories.dedup();

    categories
        .into_iter()
        .map(|category| {
            let points = sessions
                .iter()
                .enumerate()
                .filter_map(|(idx, session)| {
                    points
                        .iter()
                        .find(|p| p.session_id == *session && p.category == category)
                        .map(|p| ((idx + 1) as f64, p.average_time))
                })
                .collect();
            ChartSeries {
                category: category.to_string(),
                label: category_label(category),
                points,
            }
        })
        .collect()
}
