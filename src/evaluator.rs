use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Outcome for one letter of a guess.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Correct,
    Present,
    Absent,
}

impl CellState {
    fn rank(self) -> u8 {
        match self {
            CellState::Absent => 0,
            CellState::Present => 1,
            CellState::Correct => 2,
        }
    }

    /// Keep whichever of the two carries more information about the letter.
    pub fn best(self, other: CellState) -> CellState {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

/// Per-letter outcomes of one guess, aligned with its letters.
pub type Evaluation = Vec<CellState>;

/// Best known state of every letter guessed so far.
pub type KeyStates = BTreeMap<char, CellState>;

/// Score `guess` against `solution`.
///
/// Exact matches are taken first so that a repeated letter is never credited
/// more often than it occurs in the solution.
///
/// # Panics
/// Panics if the two words differ in length.
pub fn evaluate(guess: &str, solution: &str) -> Evaluation {
    let guess: Vec<char> = guess.chars().collect();
    let solution: Vec<char> = solution.chars().collect();
    assert_eq!(
        guess.len(),
        solution.len(),
        "guess and solution must have the same length"
    );

    let mut result = vec![CellState::Absent; guess.len()];
    let mut remaining: HashMap<char, usize> = HashMap::new();

    for (i, (&g, &s)) in guess.iter().zip(&solution).enumerate() {
        if g == s {
            result[i] = CellState::Correct;
        } else {
            *remaining.entry(s).or_insert(0) += 1;
        }
    }

    for (i, g) in guess.iter().enumerate() {
        if result[i] == CellState::Correct {
            continue;
        }
        if let Some(count) = remaining.get_mut(g) {
            if *count > 0 {
                *count -= 1;
                result[i] = CellState::Present;
            }
        }
    }

    result
}

/// True when every letter is in place.
pub fn is_solved(evaluation: &[CellState]) -> bool {
    evaluation.iter().all(|s| *s == CellState::Correct)
}

/// Fold one scored guess into the keyboard state.
pub fn apply_evaluation(keys: &mut KeyStates, guess: &str, evaluation: &[CellState]) {
    for (letter, state) in guess.chars().zip(evaluation) {
        keys.entry(letter)
            .and_modify(|known| *known = known.best(*state))
            .or_insert(*state);
    }
}

/// Rebuild the keyboard state from the full guess history, in order.
///
/// Live play and restore-from-storage both go through here.
pub fn key_states<'a, I>(history: I) -> KeyStates
where
    I: IntoIterator<Item = (&'a str, &'a [CellState])>,
{
    history
        .into_iter()
        .fold(KeyStates::new(), |mut keys, (guess, evaluation)| {
            apply_evaluation(&mut keys, guess, evaluation);
            keys
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use CellState::*;

    fn credited(evaluation: &[CellState], guess: &str, letter: char) -> usize {
        guess
            .chars()
            .zip(evaluation)
            .filter(|(c, s)| *c == letter && **s != Absent)
            .count()
    }

    #[test]
    fn identical_guess_is_all_correct() {
        assert_eq!(evaluate("مدرسة", "مدرسة"), vec![Correct; 5]);
        assert!(is_solved(&evaluate("مدرسة", "مدرسة")));
    }

    #[test]
    fn disjoint_guess_is_all_absent() {
        assert_eq!(evaluate("abcde", "fghij"), vec![Absent; 5]);
    }

    #[test]
    fn tutorial_example() {
        // solution مدرسة: م in place, س present elsewhere, ك absent
        let evaluation = evaluate("مسكين", "مدرسة");
        assert_eq!(evaluation[0], Correct);
        assert_eq!(evaluation[1], Present);
        assert_eq!(evaluation[2], Absent);
        assert!(!is_solved(&evaluation));
    }

    #[test]
    fn duplicate_guess_letters_not_over_credited() {
        // one 'a' in the solution: only the exact match is credited
        let evaluation = evaluate("aabca", "xaxxx");
        assert_eq!(evaluation, vec![Absent, Correct, Absent, Absent, Absent]);
    }

    #[test]
    fn exact_match_takes_priority_over_earlier_present() {
        let evaluation = evaluate("llxxl", "abcdl");
        assert_eq!(evaluation, vec![Absent, Absent, Absent, Absent, Correct]);
    }

    #[test]
    fn duplicate_solution_letters_credited_up_to_count() {
        let evaluation = evaluate("ssxxs", "asbsc");
        assert_eq!(evaluation, vec![Present, Correct, Absent, Absent, Absent]);
    }

    /// Every five-letter word over `alphabet`.
    fn all_words(alphabet: &[char]) -> Vec<String> {
        (0..alphabet.len().pow(5))
            .map(|mut n| {
                (0..5)
                    .map(|_| {
                        let c = alphabet[n % alphabet.len()];
                        n /= alphabet.len();
                        c
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn never_credits_more_than_solution_count() {
        let alphabet = ['a', 'b', 'c'];
        let words = all_words(&alphabet);
        assert_eq!(words.len(), 243);
        for solution in &words {
            for guess in &words {
                let evaluation = evaluate(guess, solution);
                for letter in alphabet {
                    let in_solution = solution.chars().filter(|c| *c == letter).count();
                    let in_guess = guess.chars().filter(|c| *c == letter).count();
                    assert_eq!(
                        credited(&evaluation, guess, letter),
                        in_solution.min(in_guess),
                        "{guess} vs {solution}"
                    );
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn mismatched_lengths_panic() {
        evaluate("abc", "abcd");
    }

    #[test]
    fn key_state_present_not_downgraded() {
        let keys = key_states([
            ("axxxx", &[Present, Absent, Absent, Absent, Absent][..]),
            ("yyyya", &[Absent, Absent, Absent, Absent, Absent][..]),
        ]);
        assert_eq!(keys[&'a'], Present);
    }

    #[test]
    fn key_state_upgrades_to_correct() {
        let keys = key_states([
            ("axxxx", &[Present, Absent, Absent, Absent, Absent][..]),
            ("xaxxx", &[Absent, Correct, Absent, Absent, Absent][..]),
        ]);
        assert_eq!(keys[&'a'], Correct);
        assert_eq!(keys[&'x'], Absent);
    }

    #[test]
    fn incremental_and_replayed_key_states_match() {
        let solution = "مدرسة";
        let guesses = ["مكتبة", "سيارة", "مدرسة"];
        let evaluations: Vec<Evaluation> = guesses.iter().map(|g| evaluate(g, solution)).collect();

        let mut live = KeyStates::new();
        for (g, e) in guesses.iter().zip(&evaluations) {
            apply_evaluation(&mut live, g, e);
        }
        let replayed = key_states(guesses.iter().copied().zip(evaluations.iter().map(Vec::as_slice)));
        assert_eq!(live, replayed);
        assert_eq!(replayed[&'م'], Correct);
    }

    #[test]
    fn cell_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Present).unwrap(), "\"present\"");
        let back: CellState = serde_json::from_str("\"correct\"").unwrap();
        assert_eq!(back, Correct);
    }
}
