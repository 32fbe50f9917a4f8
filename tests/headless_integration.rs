use std::sync::mpsc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use kalima::game::{Game, GameOptions};
use kalima::runtime::{action_for_key, FixedTicker, GameEvent, Runner, TestEventSource};
use kalima::session::Phase;
use kalima::storage::MemoryStore;
use kalima::ui::{App, View};
use kalima::words::WordList;

fn app() -> App {
    let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let game = Game::new(Box::new(MemoryStore::new()), GameOptions::default(), date, Local::now());
    App::new(game)
}

fn key(code: KeyCode) -> GameEvent {
    GameEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn send_word(tx: &mpsc::Sender<GameEvent>, word: &str) {
    for c in word.chars() {
        tx.send(key(KeyCode::Char(c))).unwrap();
    }
    tx.send(key(KeyCode::Enter)).unwrap();
}

/// Drive the app until `done` holds or the step budget runs out.
fn drive<E, T>(runner: &Runner<E, T>, app: &mut App, done: impl Fn(&App) -> bool)
where
    E: kalima::runtime::GameEventSource,
    T: kalima::runtime::Ticker,
{
    for _ in 0..200u32 {
        match runner.step() {
            GameEvent::Tick => app.on_tick(Local::now()),
            GameEvent::Resize => {}
            GameEvent::Key(key) => {
                if let Some(action) = action_for_key(&key) {
                    app.handle(action);
                }
            }
        }
        if done(app) {
            break;
        }
    }
}

#[test]
fn headless_win_flow() {
    let mut app = app();
    let solution = app.game.solution().to_string();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), FixedTicker::new(Duration::from_millis(5)));

    // first key dismisses the introduction
    tx.send(key(KeyCode::Esc)).unwrap();
    send_word(&tx, &solution);

    drive(&runner, &mut app, |app| app.game.is_over());

    assert_eq!(app.game.phase(), Phase::Won);
    assert_eq!(app.view, View::Stats);
    assert_eq!(app.game.stats().wins, 1);
    assert!(!app.should_quit);
}

#[test]
fn headless_rejected_guess_keeps_input() {
    let mut app = app();
    app.view = View::Board;

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), FixedTicker::new(Duration::from_millis(5)));
    send_word(&tx, "بلوزة");

    drive(&runner, &mut app, |app| app.game.invalid_guess() && !app.game.is_validating());

    assert!(app.game.guesses().is_empty());
    assert_eq!(app.game.current_guess(), "بلوزة");

    for _ in 0..5 {
        tx.send(key(KeyCode::Backspace)).unwrap();
    }
    drive(&runner, &mut app, |app| app.game.current_guess().is_empty());
    assert_eq!(app.game.current_guess(), "");
}

#[test]
fn headless_loss_then_quit() {
    let mut app = app();
    app.view = View::Board;
    let solution = app.game.solution().to_string();
    let wrong = WordList::valid()
        .words
        .into_iter()
        .find(|w| *w != solution)
        .unwrap();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), FixedTicker::new(Duration::from_millis(5)));

    for round in 1..=kalima::MAX_GUESSES {
        send_word(&tx, &wrong);
        drive(&runner, &mut app, |app| app.game.guesses().len() == round);
    }
    assert_eq!(app.game.phase(), Phase::Lost);

    // stats view, then board, then escape quits
    tx.send(key(KeyCode::Esc)).unwrap();
    tx.send(key(KeyCode::Esc)).unwrap();
    drive(&runner, &mut app, |app| app.should_quit);
    assert!(app.should_quit);
    assert_eq!(app.game.stats().total_played, 1);
}

#[test]
fn ctrl_c_quits_anywhere() {
    let mut app = app();
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), FixedTicker::new(Duration::from_millis(5)));
    tx.send(GameEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)))
        .unwrap();
    drive(&runner, &mut app, |app| app.should_quit);
    assert!(app.should_quit);
    assert_eq!(app.view, View::Intro);
}
