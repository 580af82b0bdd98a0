pub mod charting;
pub mod history;
pub mod screen;
pub mod trends;

use std::time::Instant;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use tallr::{
    history::EntryStatus,
    problem::Operation,
    round::{Outcome, RoundStatus},
    session::DrillMode,
    util::format_clock,
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Attempts listed under the finished-round summary
const SUMMARY_ATTEMPTS: usize = 8;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.round.status() {
            RoundStatus::Idle => render_idle(self, area, buf),
            RoundStatus::Running => render_running(self, Instant::now(), area, buf),
            RoundStatus::Finished => render_finished(self, area, buf),
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "OFF"
    }
}

fn render_idle(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let config = app.round.config();
    let band = config.difficulty.band();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(area);

    let title = Paragraph::new(Span::styled(
        "tallr - mental arithmetic",
        bold_style.fg(Color::Magenta),
    ))
    .alignment(Alignment::Center);
    title.render(chunks[0], buf);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Duration    ", dim_style),
            Span::styled(format_clock(config.duration_secs), bold_style),
            Span::styled("   (←/→) ±15s  (↑/↓) ±1m", italic_style),
        ]),
        Line::from(vec![
            Span::styled("Difficulty  ", dim_style),
            Span::styled(
                format!("{} {}-{}", band.label, band.min, band.max),
                bold_style,
            ),
            Span::styled(format!("   {}  (d)", band.description), italic_style),
        ]),
        Line::default(),
    ];

    match config.mode {
        DrillMode::Operations => {
            lines.push(Line::from(vec![
                Span::styled("Operations  ", dim_style),
                Span::styled("(w) working memory instead", italic_style),
            ]));
            for (idx, op) in Operation::ALL.iter().enumerate() {
                let active = config.operations.contains(*op);
                let style = if active {
                    bold_style.fg(Color::Green)
                } else {
                    dim_style
                };
                lines.push(Line::from(vec![
                    Span::raw(format!("  ({}) ", idx + 1)),
                    Span::styled(
                        format!("[{}] {} {}", if active { "x" } else { " " }, op.symbol(), op.label()),
                        style,
                    ),
                ]));
            }
        }
        DrillMode::WorkingMemory => {
            lines.push(Line::from(vec![
                Span::styled("Mode        ", dim_style),
                Span::styled("Working memory", bold_style.fg(Color::Cyan)),
                Span::styled("   (w) operations instead", italic_style),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Operators   ", dim_style),
                Span::styled(config.working_memory_ops.to_string(), bold_style),
                Span::styled("   (+/-)", italic_style),
            ]));
        }
    }

    lines.push(Line::default());
    lines.push(Line::from(vec![
        Span::styled("Auto-submit ", dim_style),
        Span::styled(on_off(config.auto_submit), bold_style),
        Span::styled("   (a)", italic_style),
    ]));

    let profile = match (&app.identity, app.is_persisting()) {
        (Some(identity), true) => format!(
            "Signed in as {}",
            identity.name.as_deref().unwrap_or(&identity.email)
        ),
        (Some(_), false) => "History unavailable, rounds stay local".to_string(),
        (None, _) => "Not signed in, rounds stay local".to_string(),
    };
    lines.push(Line::from(Span::styled(profile, italic_style)));

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .render(chunks[1], buf);

    let legend = Paragraph::new(Span::styled(
        "(enter) start / (h)istory / (c)hart / (q)uit",
        italic_style,
    ));
    legend.render(chunks[2], buf);
}

fn render_running(app: &App, now: Instant, area: Rect, buf: &mut Buffer) {
    let round = &app.round;
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let prompt_style = match round.feedback(now) {
        Some(Outcome::Correct) => bold_style.fg(Color::Green),
        Some(Outcome::Wrong) => bold_style.fg(Color::Red),
        None => bold_style,
    };

    // nested expressions can outgrow one line
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_width = round.problem().prompt.width() as u16;
    let prompt_lines = prompt_width.div_ceil(max_chars_per_line).max(1);

    let padding = area.height.saturating_sub(prompt_lines + 5) / 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(padding.saturating_sub(2)),
            Constraint::Length(prompt_lines + 1),
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let clock_style = if round.time_left() <= 10 {
        bold_style.fg(Color::Red)
    } else {
        bold_style.fg(Color::Yellow)
    };
    let status = Paragraph::new(Line::from(vec![
        Span::styled(format_clock(round.time_left()), clock_style),
        Span::raw(format!(
            "   score {}   {}/{}   {}% acc   {:.1}/min",
            round.score(),
            round.correct(),
            round.attempted(),
            round.accuracy(),
            round.pace()
        )),
    ]))
    .alignment(Alignment::Center);
    status.render(chunks[0], buf);

    let prompt = Paragraph::new(Span::styled(round.problem().prompt.clone(), prompt_style))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    prompt.render(chunks[2], buf);

    let input = Paragraph::new(Line::from(vec![
        Span::styled("= ", italic_style),
        Span::styled(round.input().to_string(), bold_style.fg(Color::Cyan)),
        Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ]))
    .alignment(Alignment::Center);
    input.render(chunks[3], buf);

    let legend = Paragraph::new(Span::styled(
        if round.config().auto_submit {
            "(enter) submit / (tab) end round / (esc) cancel   auto-submit on"
        } else {
            "(enter) submit / (tab) end round / (esc) cancel"
        },
        italic_style,
    ));
    legend.render(chunks[5], buf);
}

fn render_finished(app: &App, area: Rect, buf: &mut Buffer) {
    let round = &app.round;
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_style = Style::default().fg(Color::Green);
    let red_style = Style::default().fg(Color::Red);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let latest = app.history.items().first();
    let pace = latest.map_or(round.pace(), |item| item.record.pace);

    let headline = Paragraph::new(Span::styled(
        format!("Score {}", round.score()),
        bold_style.fg(Color::Magenta),
    ))
    .alignment(Alignment::Center);
    headline.render(chunks[0], buf);

    let stats = Paragraph::new(Span::styled(
        format!(
            "{}/{} correct   {}% acc   {:.1}/min",
            round.correct(),
            round.attempted(),
            round.accuracy(),
            pace
        ),
        bold_style,
    ))
    .alignment(Alignment::Center);
    stats.render(chunks[1], buf);

    let (save_text, save_style) = match latest.map(|item| item.status) {
        Some(EntryStatus::Pending) => ("saving…", Style::default().fg(Color::Yellow)),
        Some(EntryStatus::Confirmed(_)) => ("saved to history", green_style),
        Some(EntryStatus::LocalOnly) | None => ("kept locally, not saved", italic_style),
    };
    Paragraph::new(Span::styled(save_text, save_style))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let attempts: Vec<Line> = round
        .attempts()
        .iter()
        .rev()
        .take(SUMMARY_ATTEMPTS)
        .map(|attempt| {
            if attempt.is_correct {
                Line::from(vec![
                    Span::raw(format!("{} = ", attempt.prompt)),
                    Span::styled(attempt.answer.to_string(), green_style),
                    Span::raw(format!("  {}s", attempt.time_taken_secs)),
                ])
            } else {
                Line::from(vec![
                    Span::raw(format!("{} = ", attempt.prompt)),
                    Span::styled(
                        attempt.user_answer.to_string(),
                        red_style.add_modifier(Modifier::CROSSED_OUT),
                    ),
                    Span::raw(" "),
                    Span::styled(attempt.answer.to_string(), green_style),
                    Span::raw(format!("  {}s", attempt.time_taken_secs)),
                ])
            }
        })
        .collect();
    Paragraph::new(attempts)
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    let legend = Paragraph::new(Span::styled(
        "(r)un it back / (x) reset / (h)istory / (c)hart / (q)uit",
        italic_style,
    ));
    legend.render(chunks[4], buf);
}
