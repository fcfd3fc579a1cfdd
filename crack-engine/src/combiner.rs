//! Merging of candidate sequences
//!
//! A combiner takes several candidate sources (typically
//! [`Strategy::generate`](crate::strategy::Strategy::generate) outputs) and
//! merges them into one sequence under a chosen mode. `chain` and
//! `interleave` stream; `cartesian` and `zip` need random access and
//! materialize every source first, which bounds them to small sources.

use crate::error::{CrackError, CrackResult};
use crate::strategy::CandidateIter;
use serde::{Deserialize, Serialize};

/// How sources are merged into one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMode {
    /// Source 1 fully, then source 2, ...
    Chain,
    /// Concatenated cartesian product, rightmost source varies fastest
    Cartesian,
    /// Index-wise concatenation, stopping at the shortest source
    Zip,
    /// Round-robin, one item per still-active source per round
    Interleave,
}

/// Predicate applied to candidates by [`FilteredPasswordCombiner`].
pub type CandidateFilter = Box<dyn Fn(&str) -> bool + Send>;

/// Merge function supplied to [`CustomCombiner`].
pub type MergeFn = Box<dyn FnOnce(Vec<CandidateIter>) -> CandidateIter + Send>;

/// Combines candidate sources under a [`MergeMode`].
///
/// Sources are single-pass, so combining consumes the combiner.
#[derive(Default)]
pub struct PasswordCombiner {
    sources: Vec<CandidateIter>,
    mode: Option<MergeMode>,
}

impl PasswordCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate source.
    pub fn add_source(&mut self, source: CandidateIter) {
        self.sources.push(source);
    }

    /// Set the merge mode.
    pub fn set_mode(&mut self, mode: MergeMode) {
        self.mode = Some(mode);
    }

    /// Merge the sources, optionally capped at `limit` candidates.
    ///
    /// Fails with a configuration error before producing any output when no
    /// sources have been added or no mode has been set.
    pub fn combine(self, limit: Option<usize>) -> CrackResult<CandidateIter> {
        if self.sources.is_empty() {
            return Err(CrackError::config("no password sources have been added"));
        }
        let Some(mode) = self.mode else {
            return Err(CrackError::config("no combination mode has been set"));
        };

        let merged: CandidateIter = match mode {
            MergeMode::Chain => Box::new(self.sources.into_iter().flatten()),
            MergeMode::Cartesian => {
                let lists: Vec<Vec<String>> =
                    self.sources.into_iter().map(Iterator::collect).collect();
                Box::new(CartesianIter::new(lists))
            }
            MergeMode::Zip => {
                let lists: Vec<Vec<String>> =
                    self.sources.into_iter().map(Iterator::collect).collect();
                let shortest = lists.iter().map(Vec::len).min().unwrap_or(0);
                Box::new((0..shortest).map(move |i| {
                    lists.iter().map(|list| list[i].as_str()).collect::<String>()
                }))
            }
            MergeMode::Interleave => Box::new(InterleaveIter {
                sources: self.sources,
                next_source: 0,
            }),
        };

        Ok(cap(merged, limit))
    }
}

fn cap(iter: CandidateIter, limit: Option<usize>) -> CandidateIter {
    match limit {
        Some(limit) => Box::new(iter.take(limit)),
        None => iter,
    }
}

struct CartesianIter {
    lists: Vec<Vec<String>>,
    indices: Vec<usize>,
    done: bool,
}

impl CartesianIter {
    fn new(lists: Vec<Vec<String>>) -> Self {
        // An empty source empties the whole product
        let done = lists.iter().any(Vec::is_empty);
        let indices = vec![0; lists.len()];
        Self {
            lists,
            indices,
            done,
        }
    }
}

impl Iterator for CartesianIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }

        let candidate: String = self
            .lists
            .iter()
            .zip(&self.indices)
            .map(|(list, &i)| list[i].as_str())
            .collect();

        let mut pos = self.lists.len();
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.indices[pos] += 1;
            if self.indices[pos] < self.lists[pos].len() {
                break;
            }
            self.indices[pos] = 0;
        }

        Some(candidate)
    }
}

struct InterleaveIter {
    sources: Vec<CandidateIter>,
    next_source: usize,
}

impl Iterator for InterleaveIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.sources.is_empty() {
            if self.next_source >= self.sources.len() {
                self.next_source = 0;
            }
            match self.sources[self.next_source].next() {
                Some(candidate) => {
                    self.next_source += 1;
                    return Some(candidate);
                }
                None => {
                    // Exhausted sources drop out of the rotation
                    self.sources.remove(self.next_source);
                }
            }
        }
        None
    }
}

/// A combiner that additionally filters the merged stream through a list of
/// predicates; a candidate is kept only when every predicate accepts it.
/// The limit applies to the post-filter stream.
#[derive(Default)]
pub struct FilteredPasswordCombiner {
    inner: PasswordCombiner,
    filters: Vec<CandidateFilter>,
}

impl FilteredPasswordCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, source: CandidateIter) {
        self.inner.add_source(source);
    }

    pub fn set_mode(&mut self, mode: MergeMode) {
        self.inner.set_mode(mode);
    }

    /// Add a predicate; candidates failing it are dropped.
    pub fn add_filter(&mut self, filter: impl Fn(&str) -> bool + Send + 'static) {
        self.filters.push(Box::new(filter));
    }

    pub fn combine(self, limit: Option<usize>) -> CrackResult<CandidateIter> {
        // The base pipeline runs uncapped; the limit counts surviving items
        let base = self.inner.combine(None)?;
        let filters = self.filters;
        let filtered = base.filter(move |candidate| filters.iter().all(|f| f(candidate)));
        Ok(cap(Box::new(filtered), limit))
    }
}

/// A combiner whose merge logic is supplied by the caller instead of a mode.
#[derive(Default)]
pub struct CustomCombiner {
    sources: Vec<CandidateIter>,
    merge: Option<MergeFn>,
}

impl CustomCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, source: CandidateIter) {
        self.sources.push(source);
    }

    /// Set the merge function that turns the sources into one stream.
    pub fn set_merge_fn(
        &mut self,
        merge: impl FnOnce(Vec<CandidateIter>) -> CandidateIter + Send + 'static,
    ) {
        self.merge = Some(Box::new(merge));
    }

    pub fn combine(self, limit: Option<usize>) -> CrackResult<CandidateIter> {
        if self.sources.is_empty() {
            return Err(CrackError::config("no password sources have been added"));
        }
        let Some(merge) = self.merge else {
            return Err(CrackError::config("no custom merge function has been set"));
        };

        Ok(cap(merge(self.sources), limit))
    }
}
