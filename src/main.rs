use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use kalima::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    game::{Game, GameOptions},
    runtime::{action_for_key, CrosstermEventSource, FixedTicker, GameEvent, Runner},
    selector::{self, Mode},
    stats::StatsRecord,
    storage::SqliteStore,
    ui::App,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 100;

/// daily arabic word-guessing puzzle for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Guess the five-letter Arabic word of the day in six tries. Progress and statistics are saved per user in a local SQLite database."
)]
pub struct Cli {
    /// play random words instead of the word of the day
    #[clap(short = 'r', long)]
    random: bool,

    /// path to the save database
    #[clap(long)]
    db: Option<PathBuf>,

    /// only accept listed and previously accepted words
    #[clap(long)]
    no_dictionary: bool,

    /// nickname stored in the player profile
    #[clap(short = 'n', long)]
    nickname: Option<String>,

    /// forget this player's saved game and statistics
    #[clap(long)]
    reset: bool,

    /// print statistics and exit
    #[clap(long)]
    stats: bool,

    /// write the effective options to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Command-line flags layered over the stored config.
    fn merge(&self, mut cfg: Config) -> Config {
        cfg.random_mode |= self.random;
        if self.no_dictionary {
            cfg.use_dictionary = false;
        }
        if self.nickname.is_some() {
            cfg.nickname = self.nickname.clone();
        }
        cfg
    }

    fn db_path(&self) -> PathBuf {
        self.db
            .clone()
            .or_else(AppDirs::db_path)
            .unwrap_or_else(|| PathBuf::from("kalima.db"))
    }
}

fn game_options(cfg: &Config) -> GameOptions {
    GameOptions {
        mode: if cfg.random_mode { Mode::Random } else { Mode::Daily },
        use_dictionary: cfg.use_dictionary,
        feedback_duration: Duration::from_millis(cfg.feedback_ms),
        nickname: cfg.nickname.clone(),
    }
}

/// Log to a file in the state directory; the terminal belongs to the UI.
fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_env("KALIMA_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn format_stats(stats: &StatsRecord) -> String {
    let mut out = format!(
        "played {}  win% {}  streak {}  max streak {}\n",
        stats.total_played,
        stats.win_percentage(),
        stats.current_streak,
        stats.max_streak
    );
    for (i, count) in stats.distribution.iter().enumerate() {
        out.push_str(&format!("{}: {}\n", i + 1, count));
    }
    out
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let config_store = FileConfigStore::new();
    let cfg = cli.merge(config_store.load());
    if cli.save_config {
        config_store.save(&cfg)?;
        info!(path = %config_store.path().display(), "saved config");
    }

    let db_path = cli.db_path();
    let store = SqliteStore::open(&db_path)?;
    info!(db = %db_path.display(), "opened save database");

    let mut game = Game::new(
        Box::new(store),
        game_options(&cfg),
        selector::today(),
        chrono::Local::now(),
    );

    if cli.reset {
        game.reset_user_data(chrono::Local::now())?;
    }
    if cli.stats {
        print!("{}", format_stats(&game.stats()));
        return Ok(());
    }
    if cli.reset {
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(game);
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        warn!(error = %err, "terminal loop failed");
    }
    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    while !app.should_quit {
        match runner.step() {
            GameEvent::Tick => app.on_tick(chrono::Local::now()),
            GameEvent::Resize => {}
            GameEvent::Key(key) => {
                if let Some(action) = action_for_key(&key) {
                    app.handle(action);
                }
            }
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }
    Ok(())
}
