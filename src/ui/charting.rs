use ratatui::style::Color;
use tallr::stats::{ChartSeries, OVERALL};

/// Compute X (session index) and Y (seconds) bounds for the response-time chart
pub fn compute_chart_params(series: &[ChartSeries]) -> (f64, f64) {
    let mut sessions = 1.0;
    let mut slowest = 0.0;
    for &(x, y) in series.iter().flat_map(|s| s.points.iter()) {
        if x > sessions {
            sessions = x;
        }
        if y > slowest {
            slowest = y;
        }
    }

    (sessions, slowest.ceil().max(1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.1}")
    }
}

pub fn category_color(category: &str) -> Color {
    match category {
        "addition" => Color::Rgb(0x10, 0xb9, 0x81),
        "subtraction" => Color::Rgb(0x3b, 0x82, 0xf6),
        "multiplication" => Color::Rgb(0xf5, 0x9e, 0x0b),
        "division" => Color::Rgb(0xef, 0x44, 0x44),
        "square" => Color::Rgb(0x8b, 0x5c, 0xf6),
        OVERALL => Color::Rgb(0x63, 0x66, 0xf1),
        _ => Color::Gray,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: Vec<(f64, f64)>) -> ChartSeries {
        ChartSeries {
            category: OVERALL.into(),
            label: "Overall Mean".into(),
            points,
        }
    }

    #[test]
    fn test_compute_chart_params_empty() {
        let (x, y) = compute_chart_params(&[]);
        assert_eq!(x, 1.0);
        assert_eq!(y, 1.0);
    }

    #[test]
    fn test_compute_chart_params_bounds() {
        let (x, y) = compute_chart_params(&[
            series(vec![(1.0, 2.5), (2.0, 4.2)]),
            series(vec![(3.0, 1.0)]),
        ]);
        assert_eq!(x, 3.0);
        assert_eq!(y, 5.0);
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.23), "1.2");
    }

    #[test]
    fn test_category_colors() {
        assert_eq!(category_color(OVERALL), Color::Rgb(0x63, 0x66, 0xf1));
        assert_eq!(category_color("mixed"), Color::Gray);
    }
}
