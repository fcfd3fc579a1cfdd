//! Candidate generation strategies
//!
//! A strategy is a named, lazy producer of candidate passwords plus a
//! best-effort size estimate computed once at construction. The set of
//! strategy kinds is closed, so [`Strategy`] is a tagged enum rather than an
//! open trait hierarchy: the scheduler and combiner match it exhaustively.
//!
//! Sequences are single-pass: calling [`Strategy::generate`] again starts a
//! fresh pass. Rule application is unified on rule strings everywhere; a
//! dictionary transform is just a rule string fed through [`crate::rule`].

use crate::error::{CrackError, CrackResult};
use crate::rule;
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Boxed lazy candidate sequence. `Send` so a parallel worker can own one.
pub type CandidateIter = Box<dyn Iterator<Item = String> + Send>;

/// A candidate-generation strategy.
pub enum Strategy {
    /// Words from a wordlist file, optionally mutated by rule strings
    Dictionary(DictionaryStrategy),
    /// Exhaustive charset product over a length range
    BruteForce(BruteForceStrategy),
    /// An in-memory word set mutated by rule strings
    RuleBased(RuleBasedStrategy),
    /// A positional mask of placeholders and literals
    Mask(MaskStrategy),
    /// Concatenation of child strategies
    Combination(CombinationStrategy),
}

impl Strategy {
    /// Human-readable strategy name.
    pub fn name(&self) -> &str {
        match self {
            Strategy::Dictionary(s) => &s.name,
            Strategy::BruteForce(s) => &s.name,
            Strategy::RuleBased(s) => &s.name,
            Strategy::Mask(s) => &s.name,
            Strategy::Combination(s) => &s.name,
        }
    }

    /// Best-effort candidate count, computed once at construction.
    ///
    /// Exact for brute-force and mask strategies; approximate
    /// (words x transforms) for dictionary and rule-based ones; the sum of
    /// children for combinations.
    pub fn estimated_count(&self) -> u64 {
        match self {
            Strategy::Dictionary(s) => s.estimated,
            Strategy::BruteForce(s) => s.estimated,
            Strategy::RuleBased(s) => s.estimated,
            Strategy::Mask(s) => s.estimated,
            Strategy::Combination(s) => s.estimated,
        }
    }

    /// Start a fresh candidate pass.
    pub fn generate(&self) -> CandidateIter {
        match self {
            Strategy::Dictionary(s) => s.generate(),
            Strategy::BruteForce(s) => s.generate(),
            Strategy::RuleBased(s) => s.generate(),
            Strategy::Mask(s) => s.generate(),
            Strategy::Combination(s) => s.generate(),
        }
    }
}

/// Count the lines of a wordlist without retaining its contents.
fn count_lines(path: &Path) -> CrackResult<u64> {
    let file = fs::File::open(path)
        .map_err(|e| CrackError::wordlist(path.display().to_string(), e.to_string()))?;
    let mut reader = BufReader::new(file);
    let mut count = 0u64;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => count += 1,
            Err(e) => {
                return Err(CrackError::wordlist(
                    path.display().to_string(),
                    e.to_string(),
                ))
            }
        }
    }
    Ok(count)
}

/// Dictionary strategy: streams a wordlist file line by line, yielding each
/// word followed by its rule-string mutations (mutations equal to the
/// original word are skipped).
pub struct DictionaryStrategy {
    name: String,
    path: PathBuf,
    transforms: Vec<String>,
    max_words: Option<usize>,
    estimated: u64,
}

impl DictionaryStrategy {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        transforms: Vec<String>,
        max_words: Option<usize>,
    ) -> CrackResult<Strategy> {
        let path = path.into();
        if !path.is_file() {
            return Err(CrackError::wordlist(
                path.display().to_string(),
                "file not found",
            ));
        }

        let line_count = count_lines(&path)?;
        let word_count = match max_words {
            Some(max) => line_count.min(max as u64),
            None => line_count,
        };
        let estimated = word_count.saturating_mul(transforms.len().max(1) as u64);

        Ok(Strategy::Dictionary(Self {
            name: name.into(),
            path,
            transforms,
            max_words,
            estimated,
        }))
    }

    fn generate(&self) -> CandidateIter {
        match fs::File::open(&self.path) {
            Ok(file) => Box::new(DictionaryIter {
                reader: Some(BufReader::new(file)),
                path: self.path.clone(),
                transforms: self.transforms.clone(),
                max_words: self.max_words,
                words_read: 0,
                pending: Vec::new(),
            }),
            Err(e) => {
                warn!("Cannot open wordlist {}: {}", self.path.display(), e);
                Box::new(std::iter::empty())
            }
        }
    }
}

struct DictionaryIter {
    reader: Option<BufReader<fs::File>>,
    path: PathBuf,
    transforms: Vec<String>,
    max_words: Option<usize>,
    words_read: usize,
    // Mutations of the current word, yielded after the word itself
    pending: Vec<String>,
}

impl Iterator for DictionaryIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if !self.pending.is_empty() {
                return Some(self.pending.remove(0));
            }

            let reader = self.reader.as_mut()?;
            if let Some(max) = self.max_words {
                if self.words_read >= max {
                    self.reader = None;
                    return None;
                }
            }

            let mut buf = Vec::new();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(_) => {
                    // Tolerant decoding: invalid bytes are replaced, not fatal
                    let word = String::from_utf8_lossy(&buf).trim().to_string();
                    if word.is_empty() {
                        continue;
                    }
                    self.words_read += 1;

                    for transform in &self.transforms {
                        let mutated = rule::apply(&word, transform);
                        if mutated != word {
                            self.pending.push(mutated);
                        }
                    }
                    return Some(word);
                }
                Err(e) => {
                    warn!("Error reading wordlist {}: {}", self.path.display(), e);
                    self.reader = None;
                    return None;
                }
            }
        }
    }
}

/// Brute-force strategy: every string over a charset for every length in
/// `[min_length, max_length]`, wrapped in an optional fixed prefix/suffix.
pub struct BruteForceStrategy {
    name: String,
    charset: Vec<char>,
    min_length: usize,
    max_length: usize,
    prefix: String,
    suffix: String,
    estimated: u64,
}

impl BruteForceStrategy {
    pub fn new(
        name: impl Into<String>,
        charset: &str,
        min_length: usize,
        max_length: usize,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> CrackResult<Strategy> {
        if charset.is_empty() {
            return Err(CrackError::config("charset must not be empty"));
        }
        if min_length > max_length {
            return Err(CrackError::config("min_length must be <= max_length"));
        }

        let charset: Vec<char> = charset.chars().collect();
        let mut estimated: u64 = 0;
        for length in min_length..=max_length {
            let space = (charset.len() as u64)
                .checked_pow(length as u32)
                .unwrap_or(u64::MAX);
            estimated = estimated.saturating_add(space);
        }

        Ok(Strategy::BruteForce(Self {
            name: name.into(),
            charset,
            min_length,
            max_length,
            prefix: prefix.into(),
            suffix: suffix.into(),
            estimated,
        }))
    }

    fn generate(&self) -> CandidateIter {
        Box::new(BruteForceIter {
            charset: self.charset.clone(),
            length: self.min_length,
            max_length: self.max_length,
            indices: vec![0; self.min_length],
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            done: false,
        })
    }
}

struct BruteForceIter {
    charset: Vec<char>,
    length: usize,
    max_length: usize,
    indices: Vec<usize>,
    prefix: String,
    suffix: String,
    done: bool,
}

impl Iterator for BruteForceIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done || self.length > self.max_length {
            return None;
        }

        let mut candidate =
            String::with_capacity(self.prefix.len() + self.length + self.suffix.len());
        candidate.push_str(&self.prefix);
        for &i in &self.indices {
            candidate.push(self.charset[i]);
        }
        candidate.push_str(&self.suffix);

        // Odometer increment, rightmost position varies fastest
        let mut pos = self.length;
        loop {
            if pos == 0 {
                self.length += 1;
                if self.length > self.max_length {
                    self.done = true;
                } else {
                    self.indices = vec![0; self.length];
                }
                break;
            }
            pos -= 1;
            self.indices[pos] += 1;
            if self.indices[pos] < self.charset.len() {
                break;
            }
            self.indices[pos] = 0;
        }

        Some(candidate)
    }
}

/// Rule-based strategy: yields each base word followed by every rule-string
/// mutation of it that differs from the original.
pub struct RuleBasedStrategy {
    name: String,
    words: Vec<String>,
    rules: Vec<String>,
    estimated: u64,
}

impl RuleBasedStrategy {
    pub fn new(name: impl Into<String>, words: Vec<String>, rules: Vec<String>) -> Strategy {
        let estimated = (words.len() as u64).saturating_mul(rules.len() as u64);
        Strategy::RuleBased(Self {
            name: name.into(),
            words,
            rules,
            estimated,
        })
    }

    fn generate(&self) -> CandidateIter {
        let words = self.words.clone();
        let rules = self.rules.clone();
        Box::new(words.into_iter().flat_map(move |word| {
            let mut batch = Vec::with_capacity(rules.len() + 1);
            batch.push(word.clone());
            for r in &rules {
                let mutated = rule::apply(&word, r);
                if mutated != word {
                    batch.push(mutated);
                }
            }
            batch
        }))
    }
}

/// One mask position: a literal character or a charset to iterate.
#[derive(Debug, Clone)]
enum MaskToken {
    Literal(char),
    Charset(Vec<char>),
}

impl MaskToken {
    fn chars(&self) -> Vec<char> {
        match self {
            MaskToken::Literal(c) => vec![*c],
            MaskToken::Charset(set) => set.clone(),
        }
    }

    fn len(&self) -> usize {
        match self {
            MaskToken::Literal(_) => 1,
            MaskToken::Charset(set) => set.len(),
        }
    }
}

/// Mask strategy: a positional template of `?d ?l ?u ?s ?a ?h ?H`
/// placeholders, caller-registered custom placeholders, and literal
/// characters, expanded as the cartesian product across positions.
pub struct MaskStrategy {
    name: String,
    tokens: Vec<MaskToken>,
    estimated: u64,
}

impl MaskStrategy {
    pub fn new(
        name: impl Into<String>,
        mask: &str,
        custom_charsets: Option<&HashMap<char, String>>,
    ) -> CrackResult<Strategy> {
        let tokens = Self::parse_mask(mask, custom_charsets)?;
        let mut estimated: u64 = 1;
        for token in &tokens {
            estimated = estimated.saturating_mul(token.len() as u64);
        }

        Ok(Strategy::Mask(Self {
            name: name.into(),
            tokens,
            estimated,
        }))
    }

    fn builtin_charset(placeholder: char) -> Option<&'static str> {
        match placeholder {
            'd' => Some("0123456789"),
            'l' => Some("abcdefghijklmnopqrstuvwxyz"),
            'u' => Some("ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
            's' => Some("!@#$%^&*()_+-=[]{}|;:,.<>?/~`"),
            'a' => Some(
                " !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`\
                 abcdefghijklmnopqrstuvwxyz{|}~",
            ),
            'h' => Some("0123456789abcdef"),
            'H' => Some("0123456789ABCDEF"),
            _ => None,
        }
    }

    fn parse_mask(
        mask: &str,
        custom_charsets: Option<&HashMap<char, String>>,
    ) -> CrackResult<Vec<MaskToken>> {
        let chars: Vec<char> = mask.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] == '?' && i + 1 < chars.len() {
                let placeholder = chars[i + 1];
                let charset = custom_charsets
                    .and_then(|m| m.get(&placeholder))
                    .map(|s| s.chars().collect::<Vec<char>>())
                    .or_else(|| {
                        Self::builtin_charset(placeholder).map(|s| s.chars().collect())
                    })
                    .ok_or_else(|| {
                        CrackError::config(format!("invalid mask placeholder: ?{placeholder}"))
                    })?;
                tokens.push(MaskToken::Charset(charset));
                i += 2;
            } else {
                tokens.push(MaskToken::Literal(chars[i]));
                i += 1;
            }
        }

        Ok(tokens)
    }

    fn generate(&self) -> CandidateIter {
        let positions: Vec<Vec<char>> = self.tokens.iter().map(MaskToken::chars).collect();
        Box::new(MaskIter {
            indices: vec![0; positions.len()],
            positions,
            done: false,
        })
    }
}

struct MaskIter {
    positions: Vec<Vec<char>>,
    indices: Vec<usize>,
    done: bool,
}

impl Iterator for MaskIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        if self.positions.iter().any(|p| p.is_empty()) {
            self.done = true;
            return None;
        }

        let candidate: String = self
            .positions
            .iter()
            .zip(&self.indices)
            .map(|(position, &i)| position[i])
            .collect();

        let mut pos = self.positions.len();
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.indices[pos] += 1;
            if self.indices[pos] < self.positions[pos].len() {
                break;
            }
            self.indices[pos] = 0;
        }

        Some(candidate)
    }
}

/// Combination strategy: concatenates its children, first to last.
pub struct CombinationStrategy {
    name: String,
    children: Vec<Strategy>,
    estimated: u64,
}

impl CombinationStrategy {
    pub fn new(name: impl Into<String>, children: Vec<Strategy>) -> Strategy {
        let estimated = children
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.estimated_count()));
        Strategy::Combination(Self {
            name: name.into(),
            children,
            estimated,
        })
    }

    fn generate(&self) -> CandidateIter {
        // Children already degrade internally (a failing child's stream ends
        // early with a logged warning), so concatenation never aborts the
        // siblings that follow.
        let iters: Vec<CandidateIter> = self.children.iter().map(Strategy::generate).collect();
        Box::new(iters.into_iter().flatten())
    }
}
