use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition, Paragraph},
    Frame,
};
use tallr::stats::{chart_series, STATS_ROUND_LIMIT};

use crate::{
    ui::charting::{category_color, compute_chart_params, format_label},
    App,
};

/// Render mean response time per operation across recent rounds
pub fn render_trends(app: &App, f: &mut Frame) {
    let area = f.area();
    let bold_style = Style::default().add_modifier(Modifier::BOLD);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(area);

    let title = Paragraph::new(format!(
        "Mean seconds per answer, last {STATS_ROUND_LIMIT} rounds"
    ))
    .block(Block::default().borders(Borders::ALL).title("Trends"))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let series = chart_series(&app.stats_points);
    if series.is_empty() {
        let message = if app.is_persisting() {
            "No saved rounds yet. Finish a round to start a trend."
        } else {
            "Sign in with --email to keep history and see trends."
        };
        let no_data = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let (sessions, slowest) = compute_chart_params(&series);

        let datasets: Vec<Dataset> = series
            .iter()
            .map(|s| {
                Dataset::default()
                    .name(s.label.clone())
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(category_color(&s.category)))
                    .data(&s.points)
            })
            .collect();

        let chart = Chart::new(datasets)
            .block(Block::default().borders(Borders::ALL))
            .legend_position(Some(LegendPosition::TopLeft))
            .x_axis(
                Axis::default()
                    .title("round")
                    .bounds([1.0, sessions])
                    .labels(vec![
                        Span::styled("1", bold_style),
                        Span::styled(format_label(sessions), bold_style),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("seconds")
                    .bounds([0.0, slowest])
                    .labels(vec![
                        Span::styled("0", bold_style),
                        Span::styled(format_label(slowest), bold_style),
                    ]),
            );
        f.render_widget(chart, chunks[1]);
    }

    let instructions = Paragraph::new("(b/esc) back  (q) quit").alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}
