pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Four points per correct answer, one off per miss, never below zero
pub fn score(correct: u32, attempted: u32) -> u32 {
    let incorrect = attempted.saturating_sub(correct);
    (correct * 4).saturating_sub(incorrect)
}

/// Whole-number percentage of correct answers
pub fn accuracy(correct: u32, attempted: u32) -> u32 {
    match attempted {
        0 => 0,
        _ => ((correct as f64 / attempted as f64) * 100.0).round() as u32,
    }
}

/// Correct answers per minute over the elapsed part of the round
pub fn live_pace(correct: u32, elapsed_secs: u32) -> f64 {
    match elapsed_secs {
        0 => 0.0,
        secs => round1(correct as f64 / secs as f64 * 60.0),
    }
}

/// Correct answers per minute over the configured round duration
pub fn final_pace(correct: u32, duration_secs: u32) -> f64 {
    match duration_secs {
        0 => 0.0,
        secs => correct as f64 / (secs as f64 / 60.0),
    }
}

/// `mm:ss` countdown label
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
