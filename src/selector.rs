use chrono::{Local, NaiveDate};
use rand::seq::SliceRandom;

use crate::words::WordList;

/// First day of the daily rotation; day 0 maps to the first listed word.
pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Today's date on the local calendar.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Position of `date` in the daily rotation.
///
/// Dates before the epoch wrap around the list instead of going negative.
pub fn day_index(date: NaiveDate, list_len: usize) -> usize {
    assert!(list_len > 0, "daily word list is empty");
    let days = date.signed_duration_since(epoch()).num_days();
    days.rem_euclid(list_len as i64) as usize
}

/// The solution for a calendar day.
pub fn word_of_day(date: NaiveDate, words: &WordList) -> &str {
    &words.words[day_index(date, words.words.len())]
}

/// Strategy for picking the solution of a new round
pub trait SolutionSelector {
    fn select<'a>(&self, words: &'a WordList, date: NaiveDate) -> &'a str;
}

/// Deterministic word of the day
pub struct DailySelector;

impl SolutionSelector for DailySelector {
    fn select<'a>(&self, words: &'a WordList, date: NaiveDate) -> &'a str {
        word_of_day(date, words)
    }
}

/// Uniform pick from the daily list, ignoring the date
pub struct RandomSelector;

impl SolutionSelector for RandomSelector {
    fn select<'a>(&self, words: &'a WordList, _date: NaiveDate) -> &'a str {
        let mut rng = rand::thread_rng();
        words
            .words
            .choose(&mut rng)
            .map(String::as_str)
            .expect("daily word list is empty")
    }
}

/// Which selector drives the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Daily,
    Random,
}

impl Mode {
    pub fn selector(self) -> Box<dyn SolutionSelector> {
        match self {
            Mode::Daily => Box::new(DailySelector),
            Mode::Random => Box::new(RandomSelector),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Mode::Daily => Mode::Random,
            Mode::Random => Mode::Daily,
        }
    }
}
