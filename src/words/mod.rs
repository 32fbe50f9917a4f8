use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::from_str;
use std::error::Error;

use crate::WORD_LENGTH;

static WORDS_DIR: Dir = include_dir!("src/words");

/// An embedded word list, as stored in `src/words/<name>.json`.
#[derive(Deserialize, Clone, Debug)]
pub struct WordList {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl WordList {
    /// Load a bundled list. A missing or undecodable list is a packaging
    /// error and aborts.
    pub fn new(file_name: &str) -> Self {
        read_word_list(format!("{file_name}.json")).expect("Unable to load bundled word list")
    }

    /// Canonical daily list. Never empty.
    pub fn daily() -> Self {
        let list = Self::new("daily");
        assert!(!list.words.is_empty(), "daily word list is empty");
        list
    }

    /// Canonical exact-match list of guessable words.
    pub fn valid() -> Self {
        Self::new("valid")
    }

    /// Reference dictionary, reduced to words of the playable length.
    pub fn dictionary() -> Self {
        let mut list = Self::new("dictionary");
        list.words.retain(|w| w.chars().count() == WORD_LENGTH);
        list.size = list.words.len() as u32;
        list
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }
}

fn read_word_list(file_name: String) -> Result<WordList, Box<dyn Error>> {
    let file = WORDS_DIR
        .get_file(&file_name)
        .ok_or_else(|| format!("word list {file_name} not found"))?;

    let file_as_str = file
        .contents_utf8()
        .ok_or("word list is not valid UTF-8")?;

    Ok(from_str(file_as_str)?)
}
