use crate::history::{AttemptRecord, RoundRecord};
use crate::keymap::AnswerInput;
use crate::problem::Problem;
use crate::session::RoundConfig;
use crate::util;
use chrono::Local;
use rand::{rngs::StdRng, SeedableRng};
use std::time::{Duration, Instant};

pub const FEEDBACK_DURATION: Duration = Duration::from_millis(500);
const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Wrong,
}

#[derive(Debug, Clone, Copy)]
struct Flash {
    outcome: Outcome,
    until: Instant,
}

/// Armed only while the round is running
#[derive(Debug, Clone, Copy)]
struct Countdown {
    next_tick: Instant,
}

/// One timed drill, from configuration through the final record
#[derive(Debug)]
pub struct Round {
    config: RoundConfig,
    status: RoundStatus,
    problem: Problem,
    problem_shown_at: Option<Instant>,
    attempted: u32,
    correct: u32,
    attempts: Vec<AttemptRecord>,
    time_left: u32,
    countdown: Option<Countdown>,
    finalized: bool,
    flash: Option<Flash>,
    input: AnswerInput,
    rng: StdRng,
}

impl Round {
    pub fn new(config: RoundConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: RoundConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: RoundConfig, mut rng: StdRng) -> Self {
        let problem = config.next_problem(&mut rng);
        Self {
            time_left: config.duration_secs,
            config,
            status: RoundStatus::Idle,
            problem,
            problem_shown_at: None,
            attempted: 0,
            correct: 0,
            attempts: Vec::new(),
            countdown: None,
            finalized: false,
            flash: None,
            input: AnswerInput::new(),
            rng,
        }
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    /// Configuration is frozen while a round runs. Returns false if the change was refused.
    pub fn update_config<F: FnOnce(&mut RoundConfig)>(&mut self, change: F) -> bool {
        if self.is_running() {
            return false;
        }
        change(&mut self.config);
        if self.status == RoundStatus::Idle {
            self.time_left = self.config.duration_secs;
            self.problem = self.config.next_problem(&mut self.rng);
        }
        true
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == RoundStatus::Running
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn attempted(&self) -> u32 {
        self.attempted
    }

    pub fn correct(&self) -> u32 {
        self.correct
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn input(&self) -> &str {
        self.input.value()
    }

    fn elapsed_secs(&self) -> u32 {
        self.config.duration_secs.saturating_sub(self.time_left)
    }

    pub fn score(&self) -> u32 {
        util::score(self.correct, self.attempted)
    }

    pub fn accuracy(&self) -> u32 {
        util::accuracy(self.correct, self.attempted)
    }

    pub fn pace(&self) -> f64 {
        util::live_pace(self.correct, self.elapsed_secs())
    }

    /// Current correct/wrong flash, if it has not expired yet
    pub fn feedback(&self, now: Instant) -> Option<Outcome> {
        self.flash
            .filter(|flash| now < flash.until)
            .map(|flash| flash.outcome)
    }

    fn clear_counters(&mut self) {
        self.attempted = 0;
        self.correct = 0;
        self.attempts.clear();
        self.flash = None;
        self.input.clear();
        self.time_left = self.config.duration_secs;
    }

    pub fn start(&mut self) -> bool {
        self.start_at(Instant::now())
    }

    /// Begin a round from idle, or run it back from finished
    pub fn start_at(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.finalized = false;
        self.clear_counters();
        self.problem = self.config.next_problem(&mut self.rng);
        self.problem_shown_at = Some(now);
        self.countdown = Some(Countdown {
            next_tick: now + COUNTDOWN_INTERVAL,
        });
        self.status = RoundStatus::Running;
        tracing::info!(
            duration = self.config.duration_secs,
            difficulty = %self.config.difficulty,
            mode = %self.config.mode,
            "round started"
        );
        true
    }

    /// One second of countdown. Yields the record when time runs out.
    pub fn tick(&mut self) -> Option<RoundRecord> {
        if !self.is_running() {
            return None;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            return self.finish();
        }
        None
    }

    /// Turn wall-clock progress into whole-second ticks
    pub fn advance_clock(&mut self, now: Instant) -> Option<RoundRecord> {
        if self.is_running() && self.time_left == 0 {
            return self.finish();
        }
        while let Some(countdown) = self.countdown {
            if now < countdown.next_tick {
                break;
            }
            self.countdown = Some(Countdown {
                next_tick: countdown.next_tick + COUNTDOWN_INTERVAL,
            });
            if let Some(record) = self.tick() {
                return Some(record);
            }
        }
        None
    }

    /// End the round and build its record. Fires at most once per round.
    pub fn finish(&mut self) -> Option<RoundRecord> {
        if !self.is_running() || self.finalized {
            return None;
        }
        self.finalized = true;
        self.status = RoundStatus::Finished;
        self.countdown = None;
        self.input.clear();

        let record = RoundRecord {
            duration_secs: self.config.duration_secs,
            time_taken_secs: self.elapsed_secs(),
            difficulty: self.config.difficulty,
            mode: self.config.mode,
            operations: self.config.operations.as_slice().to_vec(),
            correct: self.correct,
            attempted: self.attempted,
            score: self.score(),
            accuracy: self.accuracy(),
            pace: util::final_pace(self.correct, self.config.duration_secs),
            attempts: self.attempts.clone(),
            created_at: Local::now(),
        };
        tracing::info!(
            correct = record.correct,
            attempted = record.attempted,
            score = record.score,
            "round finished"
        );
        Some(record)
    }

    /// Abandon a running round without producing a record
    pub fn cancel(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.countdown = None;
        self.finalized = false;
        self.clear_counters();
        self.status = RoundStatus::Idle;
        tracing::debug!("round cancelled");
        true
    }

    /// Back to idle from a finished round, keeping the configuration
    pub fn reset(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.finalized = false;
        self.clear_counters();
        self.status = RoundStatus::Idle;
        true
    }

    pub fn submit(&mut self, answer: i64) -> Option<Outcome> {
        self.submit_at(answer, Instant::now())
    }

    pub fn submit_at(&mut self, answer: i64, now: Instant) -> Option<Outcome> {
        if !self.is_running() {
            return None;
        }
        let is_correct = answer == self.problem.answer;
        self.attempted += 1;
        if is_correct {
            self.correct += 1;
        }

        let time_taken_secs = self
            .problem_shown_at
            .map(|shown| now.saturating_duration_since(shown).as_secs_f64().round() as u32)
            .unwrap_or(0);

        let next = self.config.next_problem(&mut self.rng);
        let problem = std::mem::replace(&mut self.problem, next);
        self.attempts.push(AttemptRecord {
            prompt: problem.prompt,
            answer: problem.answer,
            user_answer: answer,
            category: problem.category,
            is_correct,
            time_taken_secs,
        });
        self.problem_shown_at = Some(now);
        self.input.clear();

        let outcome = if is_correct {
            Outcome::Correct
        } else {
            Outcome::Wrong
        };
        self.flash = Some(Flash {
            outcome,
            until: now + FEEDBACK_DURATION,
        });
        Some(outcome)
    }

    pub fn type_char(&mut self, c: char) -> Option<Outcome> {
        self.type_char_at(c, Instant::now())
    }

    /// Feed one key into the answer. Auto-submits when enabled and the answer matches.
    pub fn type_char_at(&mut self, c: char, now: Instant) -> Option<Outcome> {
        if !self.is_running() || !self.input.push(c) {
            return None;
        }
        if self.config.auto_submit && self.input.parse() == Some(self.problem.answer) {
            return self.submit_at(self.problem.answer, now);
        }
        None
    }

    pub fn backspace(&mut self) {
        if self.is_running() {
            self.input.backspace();
        }
    }

    pub fn submit_input(&mut self) -> Option<Outcome> {
        self.submit_input_at(Instant::now())
    }

    /// Submit the typed answer; malformed text is ignored and does not count
    pub fn submit_input_at(&mut self, now: Instant) -> Option<Outcome> {
        let answer = self.input.parse()?;
        self.submit_at(answer, now)
    }
}
