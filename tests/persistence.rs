use chrono::{Local, NaiveDate};
use std::path::Path;
use tempfile::tempdir;

use kalima::evaluator::evaluate;
use kalima::game::{Game, GameOptions, Submission};
use kalima::selector::word_of_day;
use kalima::session::{session_entries, Phase, SessionState};
use kalima::storage::{KvStore, RecordKind, SqliteStore, StorageKey};
use kalima::words::WordList;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 14).unwrap()
}

fn open(path: &Path, date: NaiveDate) -> Game {
    let store = SqliteStore::open(path).unwrap();
    Game::new(Box::new(store), GameOptions::default(), date, Local::now())
}

fn play(game: &mut Game, word: &str) -> Submission {
    for c in word.chars() {
        game.type_letter(c);
    }
    game.submit(Local::now())
}

fn wrong_word(solution: &str) -> String {
    WordList::valid()
        .words
        .into_iter()
        .find(|w| w != solution)
        .unwrap()
}

#[test]
fn session_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("kalima.db");

    let mut game = open(&path, day());
    let wrong = wrong_word(game.solution());
    play(&mut game, &wrong);
    let user = game.profile().user_id.clone();
    drop(game);

    let game = open(&path, day());
    assert_eq!(game.profile().user_id, user);
    assert_eq!(game.guesses(), [wrong.clone()]);
    assert_eq!(game.evaluations().len(), 1);
    assert_eq!(game.phase(), Phase::InProgress);
    for c in wrong.chars() {
        assert!(game.key_state(c).is_some());
    }
}

#[test]
fn finished_game_counts_once_across_restarts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kalima.db");

    let mut game = open(&path, day());
    let solution = game.solution().to_string();
    assert_eq!(play(&mut game, &solution), Submission::Accepted(Phase::Won));
    drop(game);

    let mut game = open(&path, day());
    assert_eq!(game.phase(), Phase::Won);
    assert!(game.session().stats_recorded);
    assert_eq!(play(&mut game, &solution), Submission::Ignored);
    drop(game);

    let game = open(&path, day());
    let stats = game.stats();
    assert_eq!(stats.total_played, 1);
    assert_eq!(stats.wins, 1);
    assert_eq!(stats.distribution[0], 1);
    assert!(game.share_text().is_some());
}

#[test]
fn next_day_starts_fresh_and_keeps_stats() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kalima.db");

    let mut game = open(&path, day());
    let solution = game.solution().to_string();
    play(&mut game, &solution);
    drop(game);

    let tomorrow = day().succ_opt().unwrap();
    let mut game = open(&path, tomorrow);
    assert_eq!(game.phase(), Phase::NoSession);
    assert_eq!(game.solution(), word_of_day(tomorrow, &WordList::daily()));
    assert_eq!(game.stats().current_streak, 1);

    let wrong = wrong_word(game.solution());
    for _ in 0..kalima::MAX_GUESSES {
        play(&mut game, &wrong);
    }
    let stats = game.stats();
    assert_eq!(stats.total_played, 2);
    assert_eq!(stats.current_streak, 0);
    assert_eq!(stats.max_streak, 1);
    assert_eq!(stats.win_percentage(), 50);
}

#[test]
fn legacy_slot_is_restored() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kalima.db");
    let solution = word_of_day(day(), &WordList::daily()).to_string();
    let wrong = wrong_word(&solution);

    let mut state = SessionState::new(&solution, None);
    state.record_guess(&wrong);
    let evaluations = vec![evaluate(&wrong, &solution)];
    {
        let mut store = SqliteStore::open(&path).unwrap();
        store
            .set_many(&session_entries(&state, &evaluations, Local::now()).unwrap())
            .unwrap();
    }

    let game = open(&path, day());
    assert_eq!(game.guesses(), [wrong]);
}

#[test]
fn corrupt_session_starts_over() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kalima.db");

    let mut game = open(&path, day());
    let wrong = wrong_word(game.solution());
    play(&mut game, &wrong);
    let user = game.profile().user_id.clone();
    drop(game);

    {
        let mut store = SqliteStore::open(&path).unwrap();
        store
            .set(&StorageKey::for_user(RecordKind::GameState, &user), "{not json")
            .unwrap();
        store
            .set(&StorageKey::global(RecordKind::GameState), "{not json")
            .unwrap();
    }

    let game = open(&path, day());
    assert_eq!(game.phase(), Phase::NoSession);
    assert!(game.key_states().is_empty());
}

#[test]
fn cached_words_persist() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kalima.db");

    let mut game = open(&path, day());
    assert!(matches!(play(&mut game, "حمراء"), Submission::Accepted(_)));
    drop(game);

    let no_dictionary = GameOptions {
        use_dictionary: false,
        ..GameOptions::default()
    };
    let store = SqliteStore::open(&path).unwrap();
    let mut game = Game::new(Box::new(store), no_dictionary, day().succ_opt().unwrap(), Local::now());
    assert!(game.cache().contains("حمراء"));
    assert!(matches!(play(&mut game, "حمراء"), Submission::Accepted(_)));
}

#[test]
fn reset_forgets_progress() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kalima.db");

    let mut game = open(&path, day());
    let solution = game.solution().to_string();
    play(&mut game, &solution);
    game.reset_user_data(Local::now()).unwrap();
    drop(game);

    let game = open(&path, day());
    assert_eq!(game.phase(), Phase::NoSession);
    assert_eq!(game.stats().total_played, 0);
}
