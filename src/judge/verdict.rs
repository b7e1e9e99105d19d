//! Free-text judge answers to positional verdicts and semantic winners.
//!
//! Precedence, applied to the trimmed, uppercased answer:
//!
//! 1. contains `A` but not `B` -> first slot
//! 2. contains `B` but not `A` -> second slot
//! 3. starts with `A` -> first slot
//! 4. starts with `B` -> second slot
//! 5. anything else -> tie
//!
//! Note that "contains" is a plain character test, so words in the reason
//! ("BETTER", "CLEAR") take part in it. Answers that mention both letters
//! fall back to the leading letter.

use super::types::{Presentation, Verdict, Winner};

pub fn parse_verdict(raw: &str) -> Verdict {
    let text = raw.trim().to_uppercase();
    let has_a = text.contains('A');
    let has_b = text.contains('B');

    match (has_a, has_b) {
        (true, false) => Verdict::First,
        (false, true) => Verdict::Second,
        _ if text.starts_with('A') => Verdict::First,
        _ if text.starts_with('B') => Verdict::Second,
        _ => Verdict::Tie,
    }
}

/// Map a positional verdict to the variant that occupied that slot.
pub fn resolve_winner(verdict: Verdict, presentation: Presentation) -> Winner {
    match verdict {
        Verdict::First => presentation.first().into(),
        Verdict::Second => presentation.second().into(),
        Verdict::Tie => Winner::Tie,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_a_present() {
        assert_eq!(parse_verdict("A"), Verdict::First);
        assert_eq!(parse_verdict("  a \n"), Verdict::First);
        assert_eq!(parse_verdict("Option A: it is clearer"), Verdict::First);
    }

    #[test]
    fn only_b_present() {
        assert_eq!(parse_verdict("B"), Verdict::Second);
        assert_eq!(parse_verdict("b - more concise"), Verdict::Second);
    }

    #[test]
    fn both_present_leading_letter_wins() {
        assert_eq!(parse_verdict("A is better than B"), Verdict::First);
        assert_eq!(parse_verdict("B, because A misses the date"), Verdict::Second);
        assert_eq!(parse_verdict("AB"), Verdict::First);
    }

    #[test]
    fn both_present_neither_leading_is_tie() {
        assert_eq!(parse_verdict("Summary B beats summary A"), Verdict::Tie);
        assert_eq!(parse_verdict("Prefer B over A"), Verdict::Tie);
    }

    #[test]
    fn neither_present_is_tie() {
        assert_eq!(parse_verdict(""), Verdict::Tie);
        assert_eq!(parse_verdict("   "), Verdict::Tie);
        assert_eq!(parse_verdict("Tie"), Verdict::Tie);
        assert_eq!(parse_verdict("I'm not sure"), Verdict::Tie);
        assert_eq!(parse_verdict("none"), Verdict::Tie);
    }

    #[test]
    fn reason_words_count_as_letters() {
        // "ARE" supplies an A, so the leading B decides.
        assert_eq!(parse_verdict("Both are fine"), Verdict::Second);
        // "CANNOT" supplies the only letter.
        assert_eq!(parse_verdict("I cannot decide"), Verdict::First);
    }

    #[test]
    fn winner_follows_presentation() {
        assert_eq!(
            resolve_winner(parse_verdict("A"), Presentation::ConciseFirst),
            Winner::Concise
        );
        assert_eq!(
            resolve_winner(parse_verdict("A"), Presentation::BaselineFirst),
            Winner::Baseline
        );
        assert_eq!(
            resolve_winner(Verdict::Second, Presentation::BaselineFirst),
            Winner::Concise
        );
        assert_eq!(
            resolve_winner(Verdict::Second, Presentation::ConciseFirst),
            Winner::Baseline
        );
        assert_eq!(resolve_winner(Verdict::Tie, Presentation::ConciseFirst), Winner::Tie);
    }
}
