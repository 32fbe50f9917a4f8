use chrono::{DateTime, Local, NaiveDate};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::evaluator::{apply_evaluation, evaluate, CellState, Evaluation, KeyStates};
use crate::feedback::{Feedback, Message, CHECKING_DURATION_MS, DEFAULT_DURATION_MS};
use crate::profile::{self, UserProfile};
use crate::selector::{word_of_day, Mode};
use crate::session::{load_session, save_session, session_entries, Phase, SessionState};
use crate::share::share_text;
use crate::stats::{load_stats, stats_entry_after, StatsRecord};
use crate::storage::{load_record, save_record, KvStore, RecordKind, StorageKey};
use crate::validity::{is_arabic_letter, Acceptance, Rejection, ValidityCache, ValidityPipeline};
use crate::words::WordList;
use crate::WORD_LENGTH;

#[derive(Debug, Clone)]
pub struct GameOptions {
    pub mode: Mode,
    pub use_dictionary: bool,
    pub feedback_duration: Duration,
    pub nickname: Option<String>,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Daily,
            use_dictionary: true,
            feedback_duration: Duration::from_millis(DEFAULT_DURATION_MS),
            nickname: None,
        }
    }
}

/// Result of pressing enter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Nothing to do: the game is over or a check is already running.
    Ignored,
    /// The guess is queued; call [`Game::resolve_pending`] to finish it.
    Pending,
    Accepted(Phase),
    Rejected(Rejection),
}

/// One player's game: the current puzzle, its history, and the stores behind it.
pub struct Game {
    store: Box<dyn KvStore>,
    daily: WordList,
    pipeline: ValidityPipeline,
    cache: ValidityCache,
    profile: UserProfile,
    mode: Mode,
    today: NaiveDate,
    state: SessionState,
    evaluations: Vec<Evaluation>,
    key_states: KeyStates,
    pending: Option<String>,
    invalid_guess: bool,
    feedback: Option<Feedback>,
    feedback_duration: Duration,
}

fn cache_key() -> StorageKey {
    StorageKey::global(RecordKind::ValidWordsCache)
}

impl Game {
    /// Open a game backed by `store`, restoring today's session when there is one.
    pub fn new(mut store: Box<dyn KvStore>, options: GameOptions, today: NaiveDate, now: DateTime<Local>) -> Self {
        let daily = WordList::daily();
        let valid = WordList::valid();
        let dictionary = options.use_dictionary.then(WordList::dictionary);
        let pipeline = ValidityPipeline::new(&valid.words, dictionary.as_ref().map(|d| d.words.as_slice()));
        let cache = load_record::<ValidityCache>(store.as_ref(), &cache_key()).unwrap_or_default();

        let mut profile = profile::get_or_create_profile(store.as_mut(), now);
        if options.nickname.is_some() && options.nickname != profile.nickname {
            if let Err(err) = profile::set_nickname(store.as_mut(), &mut profile, options.nickname.clone()) {
                warn!(error = %err, "failed to save nickname");
            }
        }

        let mut game = Self {
            store,
            daily,
            pipeline,
            cache,
            profile,
            mode: options.mode,
            today,
            state: SessionState::new("", None),
            evaluations: Vec::new(),
            key_states: KeyStates::new(),
            pending: None,
            invalid_guess: false,
            feedback: None,
            feedback_duration: options.feedback_duration,
        };
        game.start_round();
        game
    }

    fn todays_solution(&self) -> String {
        word_of_day(self.today, &self.daily).to_string()
    }

    /// Begin a round for the current mode. Daily rounds resume today's saved session.
    fn start_round(&mut self) {
        let user = Some(self.profile.user_id.clone());
        self.pending = None;
        self.invalid_guess = false;

        if self.mode == Mode::Daily {
            let today = self.todays_solution();
            if let Some(saved) = load_session(self.store.as_ref(), user.as_ref(), &today) {
                info!(guesses = saved.state.guesses.len(), over = saved.state.game_over, "restored session");
                self.state = saved.state;
                self.state.user_id = user;
                self.state.current_guess.clear();
                self.evaluations = saved.evaluations;
                self.key_states = saved.key_states;
                return;
            }
        }

        let solution = self.mode.selector().select(&self.daily, self.today).to_string();
        debug!(mode = ?self.mode, "starting new round");
        self.state = SessionState::new(&solution, user);
        self.evaluations.clear();
        self.key_states.clear();
    }

    fn show(&mut self, message: Message, duration: Duration) {
        self.feedback = Some(Feedback::new(message, duration));
    }

    pub fn type_letter(&mut self, letter: char) {
        if self.state.game_over || self.pending.is_some() || !is_arabic_letter(letter) {
            return;
        }
        self.invalid_guess = false;
        if self.state.current_guess.chars().count() < WORD_LENGTH {
            self.state.current_guess.push(letter);
        }
    }

    pub fn backspace(&mut self) {
        if self.state.game_over || self.pending.is_some() {
            return;
        }
        self.invalid_guess = false;
        self.state.current_guess.pop();
    }

    /// Queue the current guess for validation.
    ///
    /// Length is checked immediately; everything else happens in
    /// [`Game::resolve_pending`] so the caller can render the pending state.
    pub fn begin_submit(&mut self) -> Submission {
        if self.state.game_over || self.pending.is_some() {
            return Submission::Ignored;
        }
        if self.state.current_guess.chars().count() != WORD_LENGTH {
            self.invalid_guess = true;
            self.show(Message::InvalidLength, self.feedback_duration);
            return Submission::Rejected(Rejection::Length);
        }
        self.pending = Some(self.state.current_guess.clone());
        self.show(Message::Checking, Duration::from_millis(CHECKING_DURATION_MS));
        Submission::Pending
    }

    /// Run the queued validation and apply its outcome.
    pub fn resolve_pending(&mut self, now: DateTime<Local>) -> Submission {
        let Some(candidate) = self.pending.take() else {
            return Submission::Ignored;
        };

        match self.pipeline.check(&candidate, &self.cache) {
            Acceptance::Accepted { word, tier, cache } => {
                if cache {
                    self.remember(&word);
                    self.show(Message::NewWordAccepted, self.feedback_duration);
                } else {
                    self.feedback = None;
                }
                debug!(tier, "guess accepted");
                Submission::Accepted(self.apply_guess(&word, now))
            }
            Acceptance::Rejected(reason) => {
                self.invalid_guess = true;
                let message = match reason {
                    Rejection::Length => Message::InvalidLength,
                    Rejection::NotAWord => Message::NotInList,
                    Rejection::Unverified => Message::Unverified,
                };
                self.show(message, self.feedback_duration);
                Submission::Rejected(reason)
            }
        }
    }

    /// Validate and apply the current guess in one step.
    pub fn submit(&mut self, now: DateTime<Local>) -> Submission {
        match self.begin_submit() {
            Submission::Pending => self.resolve_pending(now),
            other => other,
        }
    }

    fn remember(&mut self, word: &str) {
        if self.cache.insert(word) {
            if let Err(err) = save_record(self.store.as_mut(), &cache_key(), &self.cache) {
                warn!(error = %err, "failed to save word cache");
            }
        }
    }

    fn apply_guess(&mut self, guess: &str, now: DateTime<Local>) -> Phase {
        let evaluation = evaluate(guess, &self.state.solution);
        apply_evaluation(&mut self.key_states, guess, &evaluation);
        self.evaluations.push(evaluation);
        let phase = self.state.record_guess(guess);

        match phase {
            Phase::Won => self.show(Message::Won, self.feedback_duration),
            Phase::Lost => self.show(Message::Lost, self.feedback_duration),
            _ => {}
        }

        if let Err(err) = self.persist(now) {
            warn!(error = %err, "failed to persist game");
        }
        phase
    }

    /// Save the session; when the game just ended, count it in the statistics
    /// in the same write.
    fn persist(&mut self, now: DateTime<Local>) -> crate::Result<()> {
        let today = self.todays_solution();
        let daily = self.mode == Mode::Daily && self.state.solution == today;

        if !(self.state.game_over && !self.state.stats_recorded) {
            if daily {
                save_session(self.store.as_mut(), &self.state, &self.evaluations, &today, now)?;
            }
            return Ok(());
        }

        let user = self.profile.user_id.clone();
        let (stats, stats_entry) = stats_entry_after(
            self.store.as_ref(),
            self.state.game_won,
            self.state.guesses.len(),
            Some(&user),
            now,
        )?;
        self.state.stats_recorded = true;

        let mut entries = Vec::new();
        if daily {
            entries = session_entries(&self.state, &self.evaluations, now)?;
        }
        entries.push(stats_entry);
        self.store.set_many(&entries)?;
        info!(won = self.state.game_won, played = stats.total_played, "game finished");
        Ok(())
    }

    /// Switch between the daily word and random words, starting a fresh round.
    pub fn toggle_mode(&mut self) {
        if self.pending.is_some() {
            return;
        }
        self.mode = self.mode.toggled();
        self.start_round();
        let message = match self.mode {
            Mode::Daily => Message::ModeDaily,
            Mode::Random => Message::ModeRandom,
        };
        self.show(message, self.feedback_duration);
    }

    /// Draw another random word once the current random round is over.
    /// Daily rounds only change with the calendar.
    pub fn next_round(&mut self) -> bool {
        if self.mode != Mode::Random || !self.state.game_over {
            return false;
        }
        self.start_round();
        self.feedback = None;
        true
    }

    /// Start the next day's puzzle once the calendar moves on.
    pub fn refresh_day(&mut self, today: NaiveDate) -> bool {
        if today == self.today || self.pending.is_some() {
            return false;
        }
        self.today = today;
        if self.mode == Mode::Daily {
            self.start_round();
            return true;
        }
        false
    }

    /// Drop expired feedback.
    pub fn tick(&mut self, now: Instant) {
        if self.feedback.as_ref().is_some_and(|f| f.is_expired(now)) {
            self.feedback = None;
        }
    }

    /// Forget this player's saved game and statistics and start over.
    ///
    /// The fresh session is written back so the legacy slot cannot resurrect
    /// the old one on the next launch.
    pub fn reset_user_data(&mut self, now: DateTime<Local>) -> crate::Result<()> {
        profile::clear_user_data(self.store.as_mut(), &self.profile.user_id)?;
        self.mode = Mode::Daily;
        let solution = self.todays_solution();
        self.state = SessionState::new(&solution, Some(self.profile.user_id.clone()));
        self.evaluations.clear();
        self.key_states.clear();
        self.pending = None;
        self.feedback = None;
        save_session(self.store.as_mut(), &self.state, &self.evaluations, &solution, now)?;
        Ok(())
    }

    pub fn needs_intro(&self) -> bool {
        profile::needs_intro(self.store.as_ref())
    }

    pub fn mark_intro_seen(&mut self) {
        if let Err(err) = profile::mark_intro_seen(self.store.as_mut()) {
            warn!(error = %err, "failed to save intro flag");
        }
    }

    pub fn guesses(&self) -> &[String] {
        &self.state.guesses
    }

    pub fn current_guess(&self) -> &str {
        &self.state.current_guess
    }

    pub fn evaluations(&self) -> &[Evaluation] {
        &self.evaluations
    }

    pub fn key_states(&self) -> &KeyStates {
        &self.key_states
    }

    pub fn key_state(&self, letter: char) -> Option<CellState> {
        self.key_states.get(&letter).copied()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_won(&self) -> bool {
        self.state.game_won
    }

    pub fn is_over(&self) -> bool {
        self.state.game_over
    }

    pub fn is_validating(&self) -> bool {
        self.pending.is_some()
    }

    /// Set after a rejected submission until the next edit.
    pub fn invalid_guess(&self) -> bool {
        self.invalid_guess
    }

    pub fn solution(&self) -> &str {
        &self.state.solution
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn cache(&self) -> &ValidityCache {
        &self.cache
    }

    pub fn session(&self) -> &SessionState {
        &self.state
    }

    pub fn stats(&self) -> StatsRecord {
        load_stats(self.store.as_ref(), Some(&self.profile.user_id))
    }

    /// Share text, once the game is over.
    pub fn share_text(&self) -> Option<String> {
        self.state
            .game_over
            .then(|| share_text(&self.evaluations, self.state.game_won))
    }
}
