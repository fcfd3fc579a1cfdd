//! Rule catalog synthesis
//!
//! Generates mutation-rule files at three complexity levels by sampling from
//! fixed opcode pools. Randomness comes from an injected seedable source so
//! generated catalogs are reproducible in tests; the rule interpreter itself
//! stays deterministic and takes no random source.

use crate::catalog::user_rules_dir;
use crate::error::{CrackError, CrackResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Complexity level for a generated rule catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    /// Single-opcode case changes, substitutions and affixes
    Basic,
    /// Mix of basic and advanced rules
    Medium,
    /// Composed multi-opcode rules with numeric/special/year suffixes
    Advanced,
}

const CASE_MODIFIERS: &[&str] = &[":", "l", "u", "c"];
const TRANSFORMATIONS: &[&str] = &["r", "d"];
const SUBSTITUTIONS: &[&str] = &[
    "sa@", "sa4", "sb8", "sb6", "sc(", "se3", "sg6", "sg9", "sh#", "si1", "si!", "si|", "sl1",
    "sl|", "so0", "ss5", "ss$", "st7", "st+",
];
const AFFIXES: &[&str] = &[
    "^1", "^!", "^.", "^_", "$1", "$!", "$.", "$_", "$123", "$2023",
];
const TRUNCATIONS: &[&str] = &["<5", "<6", "<7", "<8", ">1", ">2"];
const PURGES: &[&str] = &["@a", "@e", "@i", "@o", "@u", "@s"];

const NUMBERS: &[&str] = &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
const SPECIAL_CHARS: &[&str] = &["!", "@", "#", "$", "%", "&", "*", "?", ".", "-", "_", "+"];
const YEARS: &[&str] = &[
    "19", "20", "2000", "2020", "2021", "2022", "2023", "2024", "23", "24",
];

/// Generator for password mutation rule files.
pub struct RuleGenerator {
    rng: StdRng,
    user_dir: PathBuf,
}

impl RuleGenerator {
    /// Create a generator seeded from the OS entropy source, writing into
    /// the standard user rules directory.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            user_dir: user_rules_dir().unwrap_or_else(|| PathBuf::from("rules")),
        }
    }

    /// Create a generator with a fixed seed for reproducible output.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            user_dir: user_rules_dir().unwrap_or_else(|| PathBuf::from("rules")),
        }
    }

    /// Override the directory generated rule files are written to.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_dir = dir.into();
        self
    }

    /// Generate basic single-transformation rules.
    ///
    /// The output always leads with the standard case modifiers and simple
    /// transformations, padded with sampled substitutions and affixes.
    /// Duplicates are acceptable.
    pub fn generate_basic_rules(&mut self, count: usize) -> Vec<String> {
        let mut rules: Vec<String> = Vec::new();

        rules.extend(CASE_MODIFIERS.iter().map(|r| r.to_string()));
        rules.extend(TRANSFORMATIONS.iter().map(|r| r.to_string()));

        rules.extend(self.sample(SUBSTITUTIONS, count / 2));
        rules.extend(self.sample(AFFIXES, count / 2));

        while rules.len() < count {
            let case = self.pick(CASE_MODIFIERS);
            let affix = self.pick(AFFIXES);
            rules.push(format!("{case}{affix}"));
        }

        rules.truncate(count);
        rules
    }

    /// Generate advanced composed rules (2-3 pooled opcodes plus numeric,
    /// special-character and year suffixes).
    pub fn generate_advanced_rules(&mut self, count: usize) -> Vec<String> {
        let mut rules: Vec<String> = Vec::new();

        rules.extend(self.sample(SUBSTITUTIONS, 5));

        for _ in 0..(count / 4).min(5) {
            let n = self.rng.gen_range(2..=3);
            rules.push(self.sample(SUBSTITUTIONS, n).concat());
        }

        for _ in 0..(count / 4).min(5) {
            let case = self.pick(CASE_MODIFIERS);
            let sub = self.pick(SUBSTITUTIONS);
            rules.push(format!("{case}{sub}"));
        }

        rules.extend(self.sample(NUMBERS, 3).iter().map(|n| format!("${n}")));
        rules.extend(self.sample(YEARS, 3).iter().map(|y| format!("${y}")));
        rules.extend(self.sample(SPECIAL_CHARS, 3).iter().map(|c| format!("${c}")));

        for _ in 0..(count / 4).min(5) {
            let n = self.rng.gen_range(1..=2);
            let subs = self.sample(SUBSTITUTIONS, n).concat();
            let suffix = format!("${}", self.pick(NUMBERS));
            rules.push(format!("{subs}{suffix}"));
        }

        while rules.len() < count {
            let mut components = String::new();

            if self.rng.gen_bool(0.5) {
                components.push_str(&self.pick(CASE_MODIFIERS));
            }
            if self.rng.gen_bool(0.7) {
                let n = self.rng.gen_range(1..=3);
                components.push_str(&self.sample(SUBSTITUTIONS, n).concat());
            }
            if self.rng.gen_bool(0.7) {
                let pool = if self.rng.gen_bool(0.5) {
                    NUMBERS
                } else {
                    SPECIAL_CHARS
                };
                components.push('$');
                components.push_str(&self.pick(pool));
            }

            if !components.is_empty() {
                rules.push(components);
            }
        }

        rules.truncate(count);
        rules
    }

    /// Generate truncation and purge rules for trimming long candidates.
    pub fn generate_trim_rules(&mut self, count: usize) -> Vec<String> {
        let mut rules = self.sample(TRUNCATIONS, count);
        rules.extend(self.sample(PURGES, count.saturating_sub(rules.len())));
        rules.truncate(count.max(1));
        rules
    }

    /// Generate a rule file at the requested complexity and write it to the
    /// output directory, creating the directory if needed. Returns the path
    /// of the written file.
    pub fn generate_rule_file(
        &mut self,
        filename: &str,
        complexity: Complexity,
        count: usize,
        description: &str,
    ) -> CrackResult<PathBuf> {
        let (rules, default_description) = match complexity {
            Complexity::Basic => (
                self.generate_basic_rules(count),
                "Basic password mutation rules for common transformations",
            ),
            Complexity::Advanced => (
                self.generate_advanced_rules(count),
                "Advanced password mutation rules with complex transformations",
            ),
            Complexity::Medium => {
                let basic_count = count / 3;
                let mut rules = self.generate_basic_rules(basic_count);
                rules.extend(self.generate_advanced_rules(count - basic_count));
                (rules, "Medium complexity password mutation rules")
            }
        };

        let description = if description.is_empty() {
            default_description
        } else {
            description
        };

        self.create_custom_rule_file(filename, &rules, description)
    }

    /// Write an explicit list of rules as a categorized rule file.
    ///
    /// Writes are not atomic; a crash mid-write can leave a partial file.
    /// Generated catalogs are regenerable, so that is acceptable here.
    pub fn create_custom_rule_file(
        &self,
        filename: &str,
        rules: &[String],
        description: &str,
    ) -> CrackResult<PathBuf> {
        let filename = if filename.ends_with(".rule") {
            filename.to_string()
        } else {
            format!("{filename}.rule")
        };

        fs::create_dir_all(&self.user_dir).map_err(|e| CrackError::RuleFileWrite {
            path: self.user_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let path = self.user_dir.join(&filename);
        let write = |path: &PathBuf| -> std::io::Result<()> {
            let mut file = fs::File::create(path)?;
            writeln!(file, "# Generated rule file: {filename}")?;
            if !description.is_empty() {
                writeln!(file, "# {description}")?;
            }
            writeln!(file, "# Generated by the crackpoint rule generator")?;
            writeln!(file)?;

            for (category, members) in categorize_rules(rules) {
                writeln!(file, "# {category}")?;
                for rule in members {
                    writeln!(file, "{rule}")?;
                }
                writeln!(file)?;
            }
            Ok(())
        };

        write(&path).map_err(|e| CrackError::RuleFileWrite {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        info!("Created rule file {} with {} rules", path.display(), rules.len());
        Ok(path)
    }

    fn pick(&mut self, pool: &[&str]) -> String {
        pool.choose(&mut self.rng)
            .copied()
            .unwrap_or_default()
            .to_string()
    }

    fn sample(&mut self, pool: &[&str], n: usize) -> Vec<String> {
        pool.choose_multiple(&mut self.rng, n.min(pool.len()))
            .map(|r| r.to_string())
            .collect()
    }
}

impl Default for RuleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Bucket rules for display and file layout, in a fixed section order.
fn categorize_rules(rules: &[String]) -> Vec<(&'static str, Vec<String>)> {
    let mut basic = Vec::new();
    let mut substitutions = Vec::new();
    let mut prefixes = Vec::new();
    let mut suffixes = Vec::new();
    let mut combined = Vec::new();
    let mut advanced = Vec::new();

    for rule in rules {
        if matches!(rule.as_str(), ":" | "l" | "u" | "c" | "r" | "d") {
            basic.push(rule.clone());
        } else if rule.starts_with('s') && rule.chars().count() == 3 {
            substitutions.push(rule.clone());
        } else if rule.starts_with('^') {
            prefixes.push(rule.clone());
        } else if rule.starts_with('$') {
            suffixes.push(rule.clone());
        } else if rule.len() > 1 && matches!(rule.chars().next(), Some('l' | 'u' | 'c')) {
            combined.push(rule.clone());
        } else {
            advanced.push(rule.clone());
        }
    }

    [
        ("Basic transformations", basic),
        ("Character substitutions", substitutions),
        ("Prefixes", prefixes),
        ("Suffixes", suffixes),
        ("Combined transformations", combined),
        ("Advanced transformations", advanced),
    ]
    .into_iter()
    .filter(|(_, members)| !members.is_empty())
    .collect()
}
