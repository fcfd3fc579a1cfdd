//! Crack Engine - Candidate generation and attack scheduling
//!
//! This crate provides the core pipeline for credential testing: mutation
//! rules, rule-file management, candidate generation strategies, stream
//! combiners, and the scheduler that drives candidates through a pluggable
//! protocol checker.

pub mod catalog;
pub mod combiner;
pub mod error;
pub mod generator;
pub mod rule;
pub mod scheduler;
pub mod strategy;

pub use error::{CrackError, CrackResult};

pub use rule::apply as apply_rule;

pub use catalog::{RuleCatalog, DEFAULT_RULES_DIR};

pub use generator::{Complexity, RuleGenerator};

pub use strategy::{
    BruteForceStrategy, CandidateIter, CombinationStrategy, DictionaryStrategy, MaskStrategy,
    RuleBasedStrategy, Strategy,
};

pub use combiner::{CustomCombiner, FilteredPasswordCombiner, MergeMode, PasswordCombiner};

pub use scheduler::{
    AttackOutcome, AttackScheduler, CredentialChecker, StopHandle,
};

// Boundary types shared with protocol checkers
pub use crack_common::{StatusSnapshot, TargetInfo};
