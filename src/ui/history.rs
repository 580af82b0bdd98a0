use chrono::{DateTime, Local};
use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};
use tallr::{
    history::{EntryStatus, HistoryItem},
    session::DrillMode,
};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::App;

/// "3 minutes ago" style label for when a round was played
pub fn humanize_age(created_at: DateTime<Local>, now: DateTime<Local>) -> String {
    let elapsed = (now - created_at).to_std().unwrap_or_default();
    HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past)
}

fn status_marker(status: EntryStatus) -> (&'static str, Style) {
    match status {
        EntryStatus::Pending => ("…", Style::default().fg(Color::Yellow)),
        EntryStatus::Confirmed(_) => ("✓", Style::default().fg(Color::Green)),
        EntryStatus::LocalOnly => ("local", Style::default().fg(Color::Gray)),
    }
}

fn drill_label(item: &HistoryItem) -> String {
    match item.record.mode {
        DrillMode::WorkingMemory => "working memory".to_string(),
        DrillMode::Operations => item.record.operations.iter().map(|op| op.symbol()).join(" "),
    }
}

/// Pure presenter for a single history row
pub fn present_row(item: &HistoryItem, now: DateTime<Local>) -> Row<'static> {
    let record = &item.record;
    let (marker, marker_style) = status_marker(item.status);

    let accuracy_color = if record.accuracy >= 90 {
        Color::Green
    } else if record.accuracy >= 70 {
        Color::Yellow
    } else {
        Color::Red
    };

    Row::new(vec![
        Cell::from(humanize_age(record.created_at, now)),
        Cell::from(record.score.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format!("{}/{}", record.correct, record.attempted)),
        Cell::from(format!("{}%", record.accuracy)).style(Style::default().fg(accuracy_color)),
        Cell::from(format!("{:.1}", record.pace)),
        Cell::from(record.difficulty.to_string()),
        Cell::from(drill_label(item)),
        Cell::from(marker).style(marker_style),
    ])
}

/// Attempt-by-attempt breakdown of one round
fn detail_lines(item: &HistoryItem) -> Vec<Line<'static>> {
    let record = &item.record;
    let mut lines = vec![
        Line::from(Span::styled(
            record.created_at.format("%Y-%m-%d %H:%M").to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(
            "{}s of {}s played",
            record.time_taken_secs, record.duration_secs
        )),
        Line::default(),
    ];

    if record.attempts.is_empty() {
        lines.push(Line::from(Span::styled(
            "No answers submitted",
            Style::default().fg(Color::Gray),
        )));
        return lines;
    }

    for attempt in &record.attempts {
        let (answer, style) = if attempt.is_correct {
            (attempt.answer.to_string(), Style::default().fg(Color::Green))
        } else {
            (
                format!("{} (was {})", attempt.user_answer, attempt.answer),
                Style::default().fg(Color::Red),
            )
        };
        lines.push(Line::from(vec![
            Span::raw(format!("{} = ", attempt.prompt)),
            Span::styled(answer, style),
            Span::styled(
                format!("  {}s", attempt.time_taken_secs),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]));
    }
    lines
}

/// Render the recent history screen
pub fn render_history(app: &App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Table and detail
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let title = Paragraph::new(format!("Recent rounds ({})", app.history.len()))
        .block(Block::default().borders(Borders::ALL).title("History"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if app.history.is_empty() {
        let no_data = Paragraph::new("No rounds yet. Finish a round to see it here.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        let now = Local::now();
        let selected = app.history.selected_index();
        let table_height = body[0].height.saturating_sub(3) as usize;
        let offset = selected
            .map(|idx| (idx + 1).saturating_sub(table_height))
            .unwrap_or(0);

        let header = Row::new(vec![
            "When", "Score", "Correct", "Acc", "Pace", "Level", "Drill", "",
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = app
            .history
            .items()
            .iter()
            .enumerate()
            .skip(offset)
            .take(table_height)
            .map(|(idx, item)| {
                let row = present_row(item, now);
                if Some(idx) == selected {
                    row.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    row
                }
            })
            .collect();

        let widths = [
            Constraint::Min(14),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(9),
            Constraint::Min(10),
            Constraint::Length(5),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Rounds"))
            .column_spacing(1);
        f.render_widget(table, body[0]);

        let detail = app.history.selected().map(detail_lines).unwrap_or_default();
        let detail = Paragraph::new(detail)
            .block(Block::default().borders(Borders::ALL).title("Answers"))
            .wrap(Wrap { trim: true });
        f.render_widget(detail, body[1]);
    }

    let instructions = Paragraph::new("(↑/↓) select  (b/esc) back  (q) quit")
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tallr::{
        history::{AttemptRecord, RoundRecord},
        problem::{Category, DifficultyId, Operation},
    };

    fn item(status: EntryStatus, mode: DrillMode) -> HistoryItem {
        HistoryItem {
            local_id: 1,
            status,
            record: RoundRecord {
                duration_secs: 60,
                time_taken_secs: 60,
                difficulty: DifficultyId::Sparks,
                mode,
                operations: vec![Operation::Addition, Operation::Square],
                correct: 1,
                attempted: 2,
                score: 3,
                accuracy: 50,
                pace: 1.0,
                attempts: vec![
                    AttemptRecord {
                        prompt: "2 + 3".into(),
                        answer: 5,
                        user_answer: 5,
                        category: Category::Single(Operation::Addition),
                        is_correct: true,
                        time_taken_secs: 2,
                    },
                    AttemptRecord {
                        prompt: "4²".into(),
                        answer: 16,
                        user_answer: 8,
                        category: Category::Single(Operation::Square),
                        is_correct: false,
                        time_taken_secs: 5,
                    },
                ],
                created_at: Local::now(),
            },
        }
    }

    #[test]
    fn test_humanize_age_past() {
        let now = Local::now();
        let text = humanize_age(now - Duration::hours(2), now);
        assert!(text.contains("hour"), "unexpected age label: {text}");
    }

    #[test]
    fn test_humanize_age_future_timestamp_does_not_panic() {
        let now = Local::now();
        assert!(!humanize_age(now + Duration::minutes(5), now).is_empty());
    }

    #[test]
    fn test_status_markers() {
        assert_eq!(status_marker(EntryStatus::Pending).0, "…");
        assert_eq!(status_marker(EntryStatus::Confirmed(4)).0, "✓");
        assert_eq!(status_marker(EntryStatus::LocalOnly).0, "local");
    }

    #[test]
    fn test_drill_label() {
        assert_eq!(
            drill_label(&item(EntryStatus::Pending, DrillMode::Operations)),
            "+ ²"
        );
        assert_eq!(
            drill_label(&item(EntryStatus::Pending, DrillMode::WorkingMemory)),
            "working memory"
        );
    }

    #[test]
    fn test_detail_lines_list_attempts() {
        let lines = detail_lines(&item(EntryStatus::LocalOnly, DrillMode::Operations));
        let text: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        assert!(text.iter().any(|l| l.contains("2 + 3 = 5")));
        assert!(text.iter().any(|l| l.contains("8 (was 16)")));
    }
}
