//! Metaphone phonetic encoding
//!
//! Reduces an English word to a consonant skeleton so that differently
//! spelled but similar sounding words share a code:
//! "Stephane"/"Stiefen" → `STFN`, "Michael"/"Michel" → `MXL`,
//! "Cook"/"Cooke" → `KK`.
//!
//! Codes use the letters `A-Z` plus `0` for the "th" sound. Input that has no
//! ASCII letters at all (e.g. "1999") encodes to itself so numbers remain
//! searchable through phonetic fields.

fn is_vowel(c: char) -> bool {
    matches!(c, 'A' | 'E' | 'I' | 'O' | 'U')
}

/// Encode one word.
///
/// # Example
///
/// ```
/// use quarry_search::phonetic::metaphone;
///
/// assert_eq!(metaphone("Stephane"), metaphone("Stiefen"));
/// assert_eq!(metaphone("thumb"), "0M");
/// ```
pub fn metaphone(word: &str) -> String {
    let mut w: Vec<char> = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if w.is_empty() {
        return word.to_string();
    }

    // Initial letter exceptions
    match (w.first().copied(), w.get(1).copied()) {
        (Some('A'), Some('E'))
        | (Some('G'), Some('N'))
        | (Some('K'), Some('N'))
        | (Some('P'), Some('N'))
        | (Some('W'), Some('R')) => {
            w.remove(0);
        }
        (Some('X'), _) => w[0] = 'S',
        (Some('W'), Some('H')) => {
            w.remove(1);
        }
        _ => {}
    }

    let at = |i: usize| -> Option<char> { w.get(i).copied() };
    let len = w.len();
    let mut code = String::with_capacity(len);

    for i in 0..len {
        let c = w[i];
        let prev = if i > 0 { at(i - 1) } else { None };
        let next = at(i + 1);
        let next2 = at(i + 2);

        // Doubled letters collapse, except C
        if prev == Some(c) && c != 'C' {
            continue;
        }

        match c {
            'A' | 'E' | 'I' | 'O' | 'U' => {
                if i == 0 {
                    code.push(c);
                }
            }
            'B' => {
                // Silent in a trailing "MB"
                if !(i + 1 == len && prev == Some('M')) {
                    code.push('B');
                }
            }
            'C' => {
                if next == Some('I') && next2 == Some('A') {
                    code.push('X');
                } else if next == Some('H') {
                    code.push(if prev == Some('S') { 'K' } else { 'X' });
                } else if matches!(next, Some('I' | 'E' | 'Y')) {
                    if prev != Some('S') {
                        code.push('S');
                    }
                } else {
                    code.push('K');
                }
            }
            'D' => {
                if next == Some('G') && matches!(next2, Some('E' | 'Y' | 'I')) {
                    code.push('J');
                } else {
                    code.push('T');
                }
            }
            'G' => {
                if next == Some('H') && !next2.is_some_and(is_vowel) {
                    // Silent in "GH" unless a vowel follows
                } else if next == Some('N')
                    && (i + 2 == len
                        || (next2 == Some('E') && at(i + 3) == Some('D') && i + 4 == len))
                {
                    // Silent in trailing "GN" / "GNED"
                } else if prev == Some('D') && matches!(next, Some('I' | 'E' | 'Y')) {
                    // Already voiced by the "DG" rule
                } else if matches!(next, Some('I' | 'E' | 'Y')) && prev != Some('G') {
                    code.push('J');
                } else {
                    code.push('K');
                }
            }
            'H' => {
                let after_modifier = matches!(prev, Some('C' | 'S' | 'P' | 'T' | 'G'));
                if !after_modifier && next.is_some_and(is_vowel) {
                    code.push('H');
                }
            }
            'K' => {
                if prev != Some('C') {
                    code.push('K');
                }
            }
            'P' => code.push(if next == Some('H') { 'F' } else { 'P' }),
            'Q' => code.push('K'),
            'S' => {
                if next == Some('H') || (next == Some('I') && matches!(next2, Some('O' | 'A'))) {
                    code.push('X');
                } else {
                    code.push('S');
                }
            }
            'T' => {
                if next == Some('I') && matches!(next2, Some('O' | 'A')) {
                    code.push('X');
                } else if next == Some('H') {
                    code.push('0');
                } else if !(next == Some('C') && next2 == Some('H')) {
                    code.push('T');
                }
            }
            'V' => code.push('F'),
            'W' | 'Y' => {
                if next.is_some_and(is_vowel) {
                    code.push(c);
                }
            }
            'X' => code.push_str("KS"),
            'Z' => code.push('S'),
            other => code.push(other),
        }
    }

    code
}

/// Encode every token, dropping duplicates while preserving order.
pub fn encode_tokens(tokens: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let encoded = metaphone(token);
        if !encoded.is_empty() && !out.contains(&encoded) {
            out.push(encoded);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spelling_variants_share_codes() {
        assert_eq!(metaphone("Stephane"), "STFN");
        assert_eq!(metaphone("Stiefen"), "STFN");
        assert_eq!(metaphone("Michael"), "MXL");
        assert_eq!(metaphone("Michel"), "MXL");
        assert_eq!(metaphone("Cook"), "KK");
        assert_eq!(metaphone("Cooke"), "KK");
    }

    #[test]
    fn test_initial_exceptions() {
        assert_eq!(metaphone("knight"), "NT");
        assert_eq!(metaphone("wright"), "RT");
        assert_eq!(metaphone("xavier"), "SFR");
        assert_eq!(metaphone("whale"), "WL");
        assert_eq!(metaphone("aeon"), "EN");
    }

    #[test]
    fn test_consonant_rules() {
        assert_eq!(metaphone("phone"), "FN");
        assert_eq!(metaphone("thumb"), "0M");
        assert_eq!(metaphone("school"), "SKL");
        assert_eq!(metaphone("judge"), "JJ");
        assert_eq!(metaphone("nation"), "NXN");
        assert_eq!(metaphone("box"), "BKS");
        assert_eq!(metaphone("science"), "SNS");
    }

    #[test]
    fn test_doubled_letters_collapse() {
        assert_eq!(metaphone("Beatles"), metaphone("Beattles"));
        assert_eq!(metaphone("Phillip"), "FLP");
        assert_eq!(metaphone("Filip"), "FLP");
    }

    #[test]
    fn test_non_alphabetic_passthrough() {
        assert_eq!(metaphone("1999"), "1999");
        assert_eq!(metaphone(""), "");
    }

    #[test]
    fn test_encode_tokens_dedupes() {
        let tokens = vec!["cook".to_string(), "cooke".to_string(), "michel".to_string()];
        assert_eq!(encode_tokens(&tokens), vec!["KK", "MXL"]);
    }
}
