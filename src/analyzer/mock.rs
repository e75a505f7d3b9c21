use rand::seq::SliceRandom;
use rand::Rng;

use super::{Miscue, MiscueVerdict};

/// Spoken text that makes the local analyzer invent a miscue.
pub const SIMULATE_ERROR: &str = "simulate_error";

const SUBSTITUTIONS: &[(&str, &str)] =
    &[("quick", "quack"), ("bird", "beard"), ("strong", "string")];
const DEFAULT_SUBSTITUTE: &str = "want";
const PHONEME_PLACEHOLDER: &str = "/.../";

/// Local stand-in for the remote analyzer. Only [`SIMULATE_ERROR`] yields a
/// miscue; the picked word depends solely on `reference` and `rng`.
pub fn verdict<R: Rng + ?Sized>(spoken: &str, reference: &str, rng: &mut R) -> MiscueVerdict {
    if spoken != SIMULATE_ERROR {
        return MiscueVerdict::Correct;
    }

    let words = reference_words(reference);
    let Some(word) = words.choose(rng) else {
        return MiscueVerdict::Correct;
    };

    let substitute = substitute_for(word);
    MiscueVerdict::Miscue(Miscue {
        expected_word: word.to_string(),
        spoken_word: substitute.to_string(),
        phonetic_hint: PHONEME_PLACEHOLDER.to_string(),
        feedback_script: format!(
            "Close! You said '{substitute}'. This word is '{word}'. Let's try that word again: {word}."
        ),
    })
}

/// Words of a line with surrounding punctuation trimmed.
pub fn reference_words(reference: &str) -> Vec<&str> {
    reference
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .filter(|w| !w.is_empty())
        .collect()
}

fn substitute_for(word: &str) -> &'static str {
    let lower = word.to_lowercase();
    SUBSTITUTIONS
        .iter()
        .find(|(expected, _)| *expected == lower)
        .map(|(_, substitute)| *substitute)
        .unwrap_or(DEFAULT_SUBSTITUTE)
}
