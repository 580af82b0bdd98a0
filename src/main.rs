mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::Instant,
};
use tallr::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, Identity},
    history::{RecentHistory, RoundRecord, RECENT_HISTORY_LIMIT},
    problem::{DifficultyId, Operation},
    round::{Round, RoundStatus},
    round_log,
    runtime::{CrosstermEventSource, FixedTicker, Runner, TrainerEvent},
    saver::{self, HistorySaver},
    session::{DrillMode, RoundConfig},
    stats::{collect_stats_points, StatsPoint, STATS_ROUND_LIMIT},
    store::{HistoryDb, HistoryStore},
};
use tracing_subscriber::EnvFilter;

/// sleek mental arithmetic tui with timed rounds and response-time analytics
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "A mental arithmetic trainer: timed rounds of generated problems, a nested-expression working-memory mode, and per-operation response-time history."
)]
pub struct Cli {
    /// round length, minutes part
    #[clap(short = 'm', long)]
    minutes: Option<u32>,

    /// round length, seconds part (0-59)
    #[clap(short = 's', long)]
    seconds: Option<u32>,

    /// operand range to draw from
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<DifficultyId>,

    /// operations to drill, comma separated
    #[clap(short = 'o', long = "ops", value_enum, value_delimiter = ',')]
    operations: Vec<Operation>,

    /// drill nested expressions with this many operators instead
    #[clap(short = 'w', long = "working-memory")]
    working_memory: Option<u8>,

    /// accept an answer as soon as it is typed correctly
    #[clap(long)]
    auto_submit: Option<bool>,

    /// sign in with this email so rounds are kept in history
    #[clap(long)]
    email: Option<String>,

    /// display name for the signed-in profile
    #[clap(long, requires = "email")]
    name: Option<String>,

    /// avatar url for the signed-in profile
    #[clap(long, requires = "email")]
    image: Option<String>,

    /// forget the signed-in profile
    #[clap(long, conflicts_with = "email")]
    sign_out: bool,

    /// do not read or write the history database this session
    #[clap(long)]
    local: bool,
}

impl Cli {
    /// Layer command-line flags over the persisted configuration
    fn apply(&self, config: &mut Config) {
        let mut round = config.round_config();
        if self.minutes.is_some() || self.seconds.is_some() {
            round.set_duration(
                self.minutes.unwrap_or(round.minutes()),
                self.seconds.unwrap_or(round.seconds()),
            );
        }
        if let Some(difficulty) = self.difficulty {
            round.difficulty = difficulty;
        }
        if let Ok(ops) = tallr::problem::OperationSet::new(self.operations.iter().copied()) {
            round.operations = ops;
            round.mode = DrillMode::Operations;
        }
        if let Some(ops) = self.working_memory {
            round.set_working_memory_ops(ops);
            round.mode = DrillMode::WorkingMemory;
        }
        if let Some(auto_submit) = self.auto_submit {
            round.auto_submit = auto_submit;
        }
        config.apply(&round);

        if let Some(email) = &self.email {
            config.identity = Some(Identity {
                email: email.clone(),
                name: self.name.clone(),
                image: self.image.clone(),
            });
        } else if self.sign_out {
            config.identity = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    Trainer,
    History,
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub round: Round,
    pub history: RecentHistory,
    pub view: View,
    pub identity: Option<Identity>,
    pub stats_points: Vec<StatsPoint>,
    reader: Option<HistoryDb>,
    saver: Option<HistorySaver>,
    round_log: Option<PathBuf>,
}

impl App {
    pub fn new(
        config: RoundConfig,
        identity: Option<Identity>,
        reader: Option<HistoryDb>,
        saver: Option<HistorySaver>,
        round_log: Option<PathBuf>,
    ) -> Self {
        let history = match reader.as_ref().map(|db| db.fetch_recent(RECENT_HISTORY_LIMIT)) {
            Some(Ok(rounds)) => RecentHistory::from_saved(rounds, RECENT_HISTORY_LIMIT),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "could not load history");
                RecentHistory::default()
            }
            None => RecentHistory::default(),
        };

        Self {
            round: Round::new(config),
            history,
            view: View::Trainer,
            identity,
            stats_points: Vec::new(),
            reader,
            saver,
            round_log,
        }
    }

    pub fn is_persisting(&self) -> bool {
        self.saver.is_some()
    }

    /// Show the round immediately, then hand it to the store in the background
    fn record_finished(&mut self, record: RoundRecord) {
        if let Some(path) = &self.round_log {
            if let Err(e) = round_log::append_round(path, &record) {
                tracing::warn!(error = %e, "could not append to round log");
            }
        }

        match &self.saver {
            Some(saver) => {
                let local_id = self.history.push_pending(record.clone());
                if !saver.submit(local_id, record) {
                    self.history.mark_local_only(local_id);
                }
            }
            None => {
                self.history.push_local(record);
            }
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        if let Some(record) = self.round.advance_clock(now) {
            self.record_finished(record);
        }
        if let Some(saver) = &self.saver {
            for outcome in saver.poll() {
                saver::reconcile(&mut self.history, outcome);
            }
        }
    }

    fn refresh_stats(&mut self) {
        self.stats_points = match &self.reader {
            Some(db) => match db.fetch_recent(STATS_ROUND_LIMIT) {
                Ok(rounds) => collect_stats_points(&rounds),
                Err(e) => {
                    tracing::warn!(error = %e, "could not load stats");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }

        match self.view {
            View::Trainer => match self.round.status() {
                RoundStatus::Running => {
                    self.running_key(key, now);
                    Flow::Continue
                }
                RoundStatus::Idle => self.idle_key(key, now),
                RoundStatus::Finished => self.finished_key(key, now),
            },
            View::History => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.history.select_previous();
                    Flow::Continue
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.history.select_next();
                    Flow::Continue
                }
                KeyCode::Char('q') => Flow::Quit,
                KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => {
                    self.view = View::Trainer;
                    Flow::Continue
                }
                _ => Flow::Continue,
            },
            View::Stats => match key.code {
                KeyCode::Char('q') => Flow::Quit,
                KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => {
                    self.view = View::Trainer;
                    Flow::Continue
                }
                _ => Flow::Continue,
            },
        }
    }

    fn running_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Char(c) => {
                self.round.type_char_at(c, now);
            }
            KeyCode::Backspace => self.round.backspace(),
            KeyCode::Enter => {
                self.round.submit_input_at(now);
            }
            KeyCode::Tab => {
                if let Some(record) = self.round.finish() {
                    self.record_finished(record);
                }
            }
            KeyCode::Esc => {
                self.round.cancel();
            }
            _ => {}
        }
    }

    /// Keys shared by the idle and finished screens
    fn menu_key(&mut self, key: KeyEvent) -> Option<Flow> {
        match key.code {
            KeyCode::Char('h') => self.view = View::History,
            KeyCode::Char('c') => {
                self.refresh_stats();
                self.view = View::Stats;
            }
            KeyCode::Char('q') | KeyCode::Esc => return Some(Flow::Quit),
            _ => return None,
        }
        Some(Flow::Continue)
    }

    fn idle_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        if let Some(flow) = self.menu_key(key) {
            return flow;
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.round.start_at(now);
            }
            KeyCode::Left => {
                self.round.update_config(|c| c.adjust_duration(-15));
            }
            KeyCode::Right => {
                self.round.update_config(|c| c.adjust_duration(15));
            }
            KeyCode::Down => {
                self.round.update_config(|c| c.adjust_duration(-60));
            }
            KeyCode::Up => {
                self.round.update_config(|c| c.adjust_duration(60));
            }
            KeyCode::Char('d') => {
                self.round
                    .update_config(|c| c.difficulty = c.difficulty.next());
            }
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                let op = Operation::ALL[idx];
                self.round.update_config(|c| {
                    c.toggle_operation(op);
                });
            }
            KeyCode::Char('w') => {
                self.round.update_config(|c| {
                    c.mode = match c.mode {
                        DrillMode::Operations => DrillMode::WorkingMemory,
                        DrillMode::WorkingMemory => DrillMode::Operations,
                    }
                });
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.round.update_config(|c| {
                    c.set_working_memory_ops(c.working_memory_ops.saturating_add(1))
                });
            }
            KeyCode::Char('-') => {
                self.round.update_config(|c| {
                    c.set_working_memory_ops(c.working_memory_ops.saturating_sub(1))
                });
            }
            KeyCode::Char('a') => {
                self.round.update_config(|c| c.auto_submit = !c.auto_submit);
            }
            _ => {}
        }
        Flow::Continue
    }

    fn finished_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        if let Some(flow) = self.menu_key(key) {
            return flow;
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char('r') => {
                self.round.start_at(now);
            }
            KeyCode::Char('x') => {
                self.round.reset();
            }
            _ => {}
        }
        Flow::Continue
    }

    /// Wait for in-flight saves so the last round is not lost
    pub fn shutdown(mut self) {
        if let Some(saver) = self.saver.take() {
            for outcome in saver.shutdown() {
                saver::reconcile(&mut self.history, outcome);
            }
        }
    }
}

/// Open the reader and the background saver, or run local-only
fn connect_history(
    identity: Option<&Identity>,
    local: bool,
) -> (Option<HistoryDb>, Option<HistorySaver>) {
    let (Some(identity), Some(path), false) = (identity, AppDirs::db_path(), local) else {
        tracing::info!("no profile signed in, history stays local");
        return (None, None);
    };

    let opened = HistoryDb::open(&path, identity)
        .and_then(|reader| HistoryDb::open(&path, identity).map(|writer| (reader, writer)));
    match opened {
        Ok((reader, writer)) => {
            tracing::info!(email = %identity.email, path = %path.display(), "history store ready");
            (Some(reader), Some(HistorySaver::spawn(writer)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "history store unavailable, running local-only");
            (None, None)
        }
    }
}

/// Log to a file; the terminal belongs to the UI
fn init_tracing() {
    let Some(path) = AppDirs::trace_log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    else {
        return;
    };

    let filter = EnvFilter::try_from_env("TALLR_LOG").unwrap_or_else(|_| EnvFilter::new("tallr=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_tracing();

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply(&mut config);

    let (reader, saver) = connect_history(config.identity.as_ref(), cli.local);
    let mut app = App::new(
        config.round_config(),
        config.identity.clone(),
        reader,
        saver,
        Some(AppDirs::round_log_path()),
    );

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    config.apply(app.round.config());
    if let Err(e) = config_store.save(&config) {
        tracing::warn!(error = %e, "could not save config");
    }
    app.shutdown();

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());

    loop {
        terminal.draw(|f| ui(app, f))?;

        match runner.step() {
            TrainerEvent::Tick(now) => app.on_tick(now),
            TrainerEvent::Resize => {}
            TrainerEvent::Key(key) => {
                let now = Instant::now();
                if app.handle_key(key, now) == Flow::Quit {
                    break;
                }
                app.on_tick(now);
            }
        }
    }

    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    let screen = ui::screen::current_screen(&app.view);
    screen.render(app, f);
}
