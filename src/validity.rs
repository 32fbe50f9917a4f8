//! Word acceptance pipeline.
//!
//! A candidate is normalized, screened by a coarse structure gate and then
//! offered to an ordered chain of tiers; the first tier with a verdict wins:
//!
//! 1. exact-match list
//! 2. local cache of previously accepted words
//! 3. reference dictionary (accepted words should be cached)
//! 4. in-order letter similarity against the list (accepted words should be cached)
//!
//! The similarity tier approximates shared roots and is intentionally loose.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

use crate::error::Result;
use crate::WORD_LENGTH;

/// Letters that almost every word contains at least one of: ا و ي م ل ن
const ESSENTIAL_LETTERS: [char; 6] = ['\u{0627}', '\u{0648}', '\u{064A}', '\u{0645}', '\u{0644}', '\u{0646}'];

/// Long-vowel carriers: ا و ي ى ة ؤ ئ
const VOWEL_LETTERS: [char; 7] = [
    '\u{0627}', '\u{0648}', '\u{064A}', '\u{0649}', '\u{0629}', '\u{0624}', '\u{0626}',
];

/// Letters that may not appear doubled: ك س ش ف
const NO_DOUBLE_LETTERS: [char; 4] = ['\u{0643}', '\u{0633}', '\u{0634}', '\u{0641}'];

/// Rare letters that may not open a word as a pair: ظ ذ ث غ
const RARE_LEADING_LETTERS: [char; 4] = ['\u{0638}', '\u{0630}', '\u{062B}', '\u{063A}'];

/// In-order alignment needed for a listed word to count as related.
pub const MATCH_THRESHOLD: usize = 3;
/// In-order alignment needed for a strong match.
pub const STRONG_MATCH_THRESHOLD: usize = 4;
/// Distinct strongly matching listed words needed to accept.
pub const REQUIRED_STRONG_MATCHES: usize = 2;

fn is_diacritic(c: char) -> bool {
    ('\u{064B}'..='\u{065F}').contains(&c)
}

pub fn is_arabic_letter(c: char) -> bool {
    ('\u{0621}'..='\u{064A}').contains(&c)
}

/// Strip diacritics and anything outside the Arabic letter block.
pub fn normalize_arabic_word(word: &str) -> String {
    word.chars()
        .filter(|c| !is_diacritic(*c))
        .filter(|c| is_arabic_letter(*c))
        .collect()
}

/// Coarse structural screen. Not a grammar.
pub fn is_likely_arabic_word(word: &str) -> bool {
    let letters: Vec<char> = word.chars().collect();
    if letters.is_empty() || !letters.iter().all(|c| is_arabic_letter(*c)) {
        return false;
    }
    if !letters.iter().any(|c| ESSENTIAL_LETTERS.contains(c)) {
        return false;
    }

    let has_vowel = letters.iter().any(|c| VOWEL_LETTERS.contains(c));
    let has_bad_double = letters
        .windows(2)
        .any(|pair| pair[0] == pair[1] && NO_DOUBLE_LETTERS.contains(&pair[0]));
    let has_rare_opening = letters.len() >= 2
        && RARE_LEADING_LETTERS.contains(&letters[0])
        && RARE_LEADING_LETTERS.contains(&letters[1]);

    has_vowel && !has_bad_double && !has_rare_opening
}

/// Number of letters of `candidate` that can be matched, in order, against `known`.
///
/// Greedy: each candidate letter takes the first occurrence after the furthest
/// position matched so far; letters with no such occurrence are skipped.
pub fn aligned_letters(candidate: &str, known: &str) -> usize {
    let known: Vec<char> = known.chars().collect();
    let mut next = 0;
    let mut matched = 0;
    for c in candidate.chars() {
        if let Some(offset) = known[next..].iter().position(|k| *k == c) {
            matched += 1;
            next += offset + 1;
        }
    }
    matched
}

/// Words accepted outside the exact list, remembered per device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidityCache {
    words: BTreeSet<String>,
}

impl ValidityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Returns true if the word was not cached before.
    pub fn insert(&mut self, word: &str) -> bool {
        self.words.insert(word.to_string())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// What a single tier concluded about a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Accept, and remember the word in the cache for next time.
    AcceptAndCache,
    Reject,
    /// No opinion; ask the next tier.
    Pass,
}

/// One stage of the acceptance chain
pub trait ValidityTier {
    fn name(&self) -> &'static str;
    fn check(&self, word: &str, cache: &ValidityCache) -> Result<Verdict>;
}

/// Length and structure gate.
pub struct StructureTier;

impl ValidityTier for StructureTier {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn check(&self, word: &str, _cache: &ValidityCache) -> Result<Verdict> {
        if word.chars().count() != WORD_LENGTH || !is_likely_arabic_word(word) {
            Ok(Verdict::Reject)
        } else {
            Ok(Verdict::Pass)
        }
    }
}

/// Canonical exact-match list.
pub struct ListTier {
    words: HashSet<String>,
}

impl ListTier {
    pub fn new<I: IntoIterator<Item = String>>(words: I) -> Self {
        Self {
            words: words.into_iter().collect(),
        }
    }
}

impl ValidityTier for ListTier {
    fn name(&self) -> &'static str {
        "list"
    }

    fn check(&self, word: &str, _cache: &ValidityCache) -> Result<Verdict> {
        Ok(if self.words.contains(word) {
            Verdict::Accept
        } else {
            Verdict::Pass
        })
    }
}

/// Previously accepted novel words.
pub struct CacheTier;

impl ValidityTier for CacheTier {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn check(&self, word: &str, cache: &ValidityCache) -> Result<Verdict> {
        Ok(if cache.contains(word) {
            Verdict::Accept
        } else {
            Verdict::Pass
        })
    }
}

/// The larger reference dictionary.
pub struct DictionaryTier {
    words: HashSet<String>,
}

impl DictionaryTier {
    pub fn new<I: IntoIterator<Item = String>>(words: I) -> Self {
        Self {
            words: words.into_iter().collect(),
        }
    }
}

impl ValidityTier for DictionaryTier {
    fn name(&self) -> &'static str {
        "dictionary"
    }

    fn check(&self, word: &str, _cache: &ValidityCache) -> Result<Verdict> {
        Ok(if self.words.contains(word) {
            Verdict::AcceptAndCache
        } else {
            Verdict::Pass
        })
    }
}

/// Shared-root approximation against the canonical list.
///
/// Accepts when at least one listed word aligns [`MATCH_THRESHOLD`] letters
/// in order and at least [`REQUIRED_STRONG_MATCHES`] listed words align
/// [`STRONG_MATCH_THRESHOLD`]. Every listed word is scanned.
pub struct SimilarityTier {
    words: Vec<String>,
}

impl SimilarityTier {
    pub fn new<I: IntoIterator<Item = String>>(words: I) -> Self {
        Self {
            words: words.into_iter().collect(),
        }
    }
}

impl ValidityTier for SimilarityTier {
    fn name(&self) -> &'static str {
        "similarity"
    }

    fn check(&self, word: &str, _cache: &ValidityCache) -> Result<Verdict> {
        let mut related = false;
        let mut strong = 0;
        for known in &self.words {
            let aligned = aligned_letters(word, known);
            related |= aligned >= MATCH_THRESHOLD;
            if aligned >= STRONG_MATCH_THRESHOLD {
                strong += 1;
            }
        }
        debug!(word, related, strong, "similarity scan");

        Ok(if related && strong >= REQUIRED_STRONG_MATCHES {
            Verdict::AcceptAndCache
        } else {
            Verdict::Reject
        })
    }
}

/// Why a candidate was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Wrong number of letters after normalization.
    Length,
    /// Failed a tier.
    NotAWord,
    /// A tier errored. Treated like `NotAWord` but reported separately.
    Unverified,
}

/// Final outcome of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    Accepted {
        /// Normalized form of the candidate.
        word: String,
        tier: &'static str,
        /// The caller should add the word to its [`ValidityCache`].
        cache: bool,
    },
    Rejected(Rejection),
}

impl Acceptance {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Acceptance::Accepted { .. })
    }
}

/// Ordered chain of tiers.
pub struct ValidityPipeline {
    tiers: Vec<Box<dyn ValidityTier>>,
}

impl ValidityPipeline {
    /// The standard chain. `dictionary` is `None` when the dictionary tier is disabled.
    pub fn new(listed: &[String], dictionary: Option<&[String]>) -> Self {
        let mut tiers: Vec<Box<dyn ValidityTier>> = vec![
            Box::new(StructureTier),
            Box::new(ListTier::new(listed.iter().cloned())),
            Box::new(CacheTier),
        ];
        if let Some(dictionary) = dictionary {
            tiers.push(Box::new(DictionaryTier::new(dictionary.iter().cloned())));
        }
        tiers.push(Box::new(SimilarityTier::new(listed.iter().cloned())));
        Self { tiers }
    }

    pub fn with_tiers(tiers: Vec<Box<dyn ValidityTier>>) -> Self {
        Self { tiers }
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Decide whether `candidate` may be played. Errors fail closed.
    pub fn check(&self, candidate: &str, cache: &ValidityCache) -> Acceptance {
        let word = normalize_arabic_word(candidate);
        if word.chars().count() != WORD_LENGTH {
            return Acceptance::Rejected(Rejection::Length);
        }

        for tier in &self.tiers {
            match tier.check(&word, cache) {
                Ok(Verdict::Pass) => continue,
                Ok(Verdict::Reject) => {
                    debug!(word = %word, tier = tier.name(), "rejected");
                    return Acceptance::Rejected(Rejection::NotAWord);
                }
                Ok(verdict) => {
                    debug!(word = %word, tier = tier.name(), "accepted");
                    return Acceptance::Accepted {
                        tier: tier.name(),
                        cache: verdict == Verdict::AcceptAndCache,
                        word,
                    };
                }
                Err(err) => {
                    warn!(word = %word, tier = tier.name(), error = %err, "validity tier failed");
                    return Acceptance::Rejected(Rejection::Unverified);
                }
            }
        }

        Acceptance::Rejected(Rejection::NotAWord)
    }
}
