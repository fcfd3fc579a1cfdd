//! Password mutation rule interpreter
//!
//! A rule is a compact string of opcodes applied left to right against a
//! working copy of the password:
//!
//! | Opcode | Operands          | Effect                                   |
//! |--------|-------------------|------------------------------------------|
//! | `:`    | none              | no-op                                    |
//! | `l`    | none              | lowercase whole string                   |
//! | `u`    | none              | uppercase whole string                   |
//! | `c`    | none              | uppercase first character                |
//! | `r`    | none              | reverse                                  |
//! | `d`    | none              | duplicate (append to itself)             |
//! | `s`    | chars `a`, `b`    | replace every `a` with `b`               |
//! | `@`    | char `a`          | delete every `a`                         |
//! | `^`    | char `a`          | prepend `a`                              |
//! | `$`    | run until space   | append the run verbatim (`$2023`)        |
//! | `<`    | digit run         | keep that many leading characters        |
//! | `>`    | digit run         | drop that many leading characters        |
//!
//! The interpreter is deliberately forgiving: malformed or unrecognized
//! opcodes are skipped so a single bad rule line cannot abort a
//! multi-million-candidate run. Strict syntax checking lives in
//! [`crate::catalog::RuleCatalog::validate_rule`].

/// Apply a mutation rule to a password, returning the transformed candidate.
///
/// Pure function of its two inputs; operates on characters, so non-ASCII
/// candidates survive intact.
pub fn apply(password: &str, rule: &str) -> String {
    let mut result = password.to_string();
    let ops: Vec<char> = rule.chars().collect();
    let mut i = 0;

    while i < ops.len() {
        match ops[i] {
            ':' => {}
            'l' => result = result.to_lowercase(),
            'u' => result = result.to_uppercase(),
            'c' => result = capitalize(&result),
            'r' => result = result.chars().rev().collect(),
            'd' => {
                let original = result.clone();
                result.push_str(&original);
            }
            's' if i + 2 < ops.len() => {
                let (from, to) = (ops[i + 1], ops[i + 2]);
                result = result
                    .chars()
                    .map(|c| if c == from { to } else { c })
                    .collect();
                i += 2;
            }
            '@' if i + 1 < ops.len() => {
                let purge = ops[i + 1];
                result.retain(|c| c != purge);
                i += 1;
            }
            '^' if i + 1 < ops.len() => {
                result.insert(0, ops[i + 1]);
                i += 1;
            }
            '$' if i + 1 < ops.len() => {
                // Multi-character suffixes run until the next space or end
                let mut j = i + 1;
                while j < ops.len() && ops[j] != ' ' {
                    j += 1;
                }
                result.extend(&ops[i + 1..j]);
                i = j - 1;
            }
            '<' if i + 1 < ops.len() => {
                if let Some((n, j)) = digit_run(&ops, i + 1) {
                    result = result.chars().take(n).collect();
                    i = j - 1;
                }
            }
            '>' if i + 1 < ops.len() => {
                if let Some((n, j)) = digit_run(&ops, i + 1) {
                    result = result.chars().skip(n).collect();
                    i = j - 1;
                }
            }
            // Unknown opcode or truncated operand run: skip
            _ => {}
        }

        // Opcodes may be separated by single spaces
        if i + 1 < ops.len() && ops[i + 1] == ' ' {
            i += 1;
        }
        i += 1;
    }

    result
}

/// Uppercase only the first character, leaving the rest untouched.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parse a run of ASCII digits starting at `start`, returning the value and
/// the index one past the run. `None` when no digits are present.
fn digit_run(ops: &[char], start: usize) -> Option<(usize, usize)> {
    let mut j = start;
    while j < ops.len() && ops[j].is_ascii_digit() {
        j += 1;
    }
    if j == start {
        return None;
    }
    let n: usize = ops[start..j]
        .iter()
        .collect::<String>()
        .parse()
        .unwrap_or(usize::MAX);
    Some((n, j))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_noop() {
        assert_eq!(apply("password", ":"), "password");
    }

    #[test]
    fn test_case_opcodes() {
        assert_eq!(apply("password", "u"), "PASSWORD");
        assert_eq!(apply("PASSWORD", "l"), "password");
        assert_eq!(apply("password", "c"), "Password");
    }

    #[test]
    fn test_reverse_and_duplicate() {
        assert_eq!(apply("password", "r"), "drowssap");
        assert_eq!(apply("password", "d"), "passwordpassword");
    }

    #[test]
    fn test_substitute() {
        assert_eq!(apply("password", "sa@"), "p@ssword");
        assert_eq!(apply("banana", "san"), "bnnnnn");
    }

    #[test]
    fn test_purge_prepend_append() {
        assert_eq!(apply("password", "@s"), "paword");
        assert_eq!(apply("password", "^!"), "!password");
        assert_eq!(apply("password", "$123"), "password123");
        assert_eq!(apply("password", "$2023"), "password2023");
    }

    #[test]
    fn test_truncate_and_skip() {
        assert_eq!(apply("password", "<5"), "passw");
        assert_eq!(apply("password", ">2"), "ssword");
        assert_eq!(apply("abc", "<10"), "abc");
        assert_eq!(apply("abc", ">10"), "");
    }

    #[test]
    fn test_compound_rules() {
        assert_eq!(apply("password", "csa@"), "P@ssword");
        assert_eq!(apply("password", "u$!"), "PASSWORD!");
        // Space-separated opcodes: the `$` run stops at the space
        assert_eq!(apply("password", "sa@ $2023"), "p@ssword2023");
    }

    #[test]
    fn test_malformed_rules_are_best_effort() {
        // Unknown opcode skipped
        assert_eq!(apply("password", "z"), "password");
        // Truncated operand runs skipped
        assert_eq!(apply("password", "s"), "password");
        assert_eq!(apply("password", "sa"), "password");
        assert_eq!(apply("password", "<x"), "password");
        // Valid prefix still applies
        assert_eq!(apply("password", "u@"), "PASSWORD");
    }

    #[test]
    fn test_unicode_candidates() {
        assert_eq!(apply("pässword", "u"), "PÄSSWORD");
        assert_eq!(apply("köln", "r"), "nlök");
        assert_eq!(apply("köln", "<2"), "kö");
    }

    #[test]
    fn test_empty_password() {
        assert_eq!(apply("", "c"), "");
        assert_eq!(apply("", "d$1"), "1");
    }

    proptest! {
        #[test]
        fn prop_noop_is_identity(word in ".*") {
            prop_assert_eq!(apply(&word, ":"), word);
        }

        #[test]
        fn prop_never_panics(word in ".*", rule in ".*") {
            let _ = apply(&word, &rule);
        }

        #[test]
        fn prop_duplicate_doubles_length(word in "[a-z]{0,32}") {
            prop_assert_eq!(apply(&word, "d").len(), word.len() * 2);
        }
    }
}
