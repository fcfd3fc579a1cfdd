//! Rule file discovery, parsing and validation
//!
//! Rule files are plain text, one rule per line, blank lines ignored, lines
//! starting with `#` treated as comments, conventional extension `.rule`.
//! Files are discovered across an ordered list of search directories
//! (program defaults first, then the user directory, then an optional
//! caller-supplied directory); the first directory containing a given
//! filename wins.

use crate::error::{CrackError, CrackResult};
use crate::rule;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Program-default rules directory, relative to the working directory.
pub const DEFAULT_RULES_DIR: &str = "resources/rules";

/// The user rules directory (`~/.crackpoint/rules`), if a home directory
/// can be determined.
pub fn user_rules_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".crackpoint").join("rules"))
}

/// Catalog of mutation-rule files across prioritized search directories.
pub struct RuleCatalog {
    directories: Vec<PathBuf>,
}

impl RuleCatalog {
    /// Build a catalog from the standard search path: the program-default
    /// directory, the user directory, and an optional extra directory, each
    /// included only if it exists.
    pub fn new(extra_directory: Option<&Path>) -> Self {
        let mut directories = Vec::new();

        let default_dir = PathBuf::from(DEFAULT_RULES_DIR);
        if default_dir.is_dir() {
            directories.push(default_dir);
        }
        if let Some(user_dir) = user_rules_dir() {
            if user_dir.is_dir() {
                directories.push(user_dir);
            }
        }
        if let Some(extra) = extra_directory {
            if extra.is_dir() {
                directories.push(extra.to_path_buf());
            }
        }

        debug!("Rule search directories: {:?}", directories);
        Self { directories }
    }

    /// Build a catalog over an explicit set of directories, in priority order.
    pub fn with_directories(directories: Vec<PathBuf>) -> Self {
        Self { directories }
    }

    /// Resolve a rule file by name: the literal path first, then each search
    /// directory in priority order, then the same lookup with a `.rule`
    /// suffix appended.
    pub fn find_rule_file(&self, name: &str) -> Option<PathBuf> {
        let literal = Path::new(name);
        if literal.is_file() {
            return Some(literal.to_path_buf());
        }

        for directory in &self.directories {
            let candidate = directory.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if !name.ends_with(".rule") {
            return self.find_rule_file(&format!("{name}.rule"));
        }

        warn!("Rule file not found: {}", name);
        None
    }

    /// Parse a rule file into its rule strings, in file order.
    ///
    /// Fails soft: a missing or unreadable file logs a warning and yields an
    /// empty list, so one broken rule file cannot abort a run.
    pub fn parse_rule_file(&self, name: &str) -> Vec<String> {
        let Some(path) = self.find_rule_file(name) else {
            warn!("Cannot parse rule file, not found: {}", name);
            return Vec::new();
        };

        match fs::read(&path) {
            Ok(bytes) => {
                let rules: Vec<String> = String::from_utf8_lossy(&bytes)
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string)
                    .collect();
                debug!("Parsed {} rules from {}", rules.len(), path.display());
                rules
            }
            Err(e) => {
                warn!("Error reading rule file {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Strict syntax check: the rule must be composed entirely of recognized
    /// opcodes with well-formed operands. The interpreter itself is more
    /// forgiving; this pass exists for diagnostics and editors.
    pub fn validate_rule(&self, rule: &str) -> bool {
        self.check_rule(rule).is_ok()
    }

    /// Like [`validate_rule`](Self::validate_rule), but reports the offset of
    /// the first malformed opcode.
    pub fn check_rule(&self, rule: &str) -> CrackResult<()> {
        let ops: Vec<char> = rule.chars().collect();
        if ops.is_empty() {
            return Err(CrackError::InvalidRule {
                rule: rule.to_string(),
                position: 0,
            });
        }

        let invalid = |position: usize| CrackError::InvalidRule {
            rule: rule.to_string(),
            position,
        };

        let mut i = 0;
        while i < ops.len() {
            match ops[i] {
                ':' | 'l' | 'u' | 'c' | 'r' | 'd' => i += 1,
                ' ' => i += 1,
                's' => {
                    if i + 2 >= ops.len() || ops[i + 1] == ' ' || ops[i + 2] == ' ' {
                        return Err(invalid(i));
                    }
                    i += 3;
                }
                '@' | '^' => {
                    if i + 1 >= ops.len() || ops[i + 1] == ' ' {
                        return Err(invalid(i));
                    }
                    i += 2;
                }
                '$' => {
                    let mut j = i + 1;
                    while j < ops.len() && ops[j] != ' ' {
                        j += 1;
                    }
                    if j == i + 1 {
                        return Err(invalid(i));
                    }
                    i = j;
                }
                '<' | '>' => {
                    let mut j = i + 1;
                    while j < ops.len() && ops[j].is_ascii_digit() {
                        j += 1;
                    }
                    if j == i + 1 {
                        return Err(invalid(i));
                    }
                    i = j;
                }
                _ => return Err(invalid(i)),
            }
        }

        Ok(())
    }

    /// Aggregate all `*.rule` files across the search directories.
    ///
    /// Earlier directories win: a filename already seen is not overridden by
    /// a later directory.
    pub fn available_rule_files(&self) -> BTreeMap<String, PathBuf> {
        let mut files = BTreeMap::new();

        for directory in &self.directories {
            let entries = match fs::read_dir(directory) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Cannot list rule directory {}: {}", directory.display(), e);
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if name.ends_with(".rule") && path.is_file() {
                    files.entry(name.to_string()).or_insert(path);
                }
            }
        }

        files
    }

    /// Apply every rule from a rule file to one password.
    pub fn apply_rule_file(&self, password: &str, name: &str) -> Vec<String> {
        self.parse_rule_file(name)
            .iter()
            .map(|r| rule::apply(password, r))
            .collect()
    }

    /// Apply every rule from a rule file to every word in a wordlist.
    ///
    /// The wordlist is decoded tolerantly (invalid bytes replaced rather than
    /// failing the file); read errors log a warning and end the scan early.
    pub fn apply_rules_to_wordlist(&self, wordlist: &Path, rule_file: &str) -> Vec<String> {
        let rules = self.parse_rule_file(rule_file);
        let mut results = Vec::new();

        let file = match fs::File::open(wordlist) {
            Ok(file) => file,
            Err(e) => {
                warn!("Cannot open wordlist {}: {}", wordlist.display(), e);
                return results;
            }
        };

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let word = String::from_utf8_lossy(&buf).trim().to_string();
                    if word.is_empty() {
                        continue;
                    }
                    for r in &rules {
                        let mutated = rule::apply(&word, r);
                        if !mutated.is_empty() {
                            results.push(mutated);
                        }
                    }
                }
                Err(e) => {
                    warn!("Error reading wordlist {}: {}", wordlist.display(), e);
                    break;
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn catalog_with_file(contents: &str) -> (TempDir, RuleCatalog) {
        let dir = TempDir::new().unwrap();
        let mut file = fs::File::create(dir.path().join("test.rule")).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let catalog = RuleCatalog::with_directories(vec![dir.path().to_path_buf()]);
        (dir, catalog)
    }

    #[test]
    fn test_parse_strips_comments_and_blanks() {
        let (_dir, catalog) = catalog_with_file("# header\n\nc\nu\n  \n# tail\nsa@\n");
        assert_eq!(catalog.parse_rule_file("test.rule"), vec!["c", "u", "sa@"]);
    }

    #[test]
    fn test_find_appends_rule_extension() {
        let (_dir, catalog) = catalog_with_file("c\n");
        assert!(catalog.find_rule_file("test").is_some());
        assert!(catalog.find_rule_file("missing").is_none());
    }

    #[test]
    fn test_parse_missing_file_is_soft() {
        let catalog = RuleCatalog::with_directories(vec![]);
        assert!(catalog.parse_rule_file("nope.rule").is_empty());
    }

    #[test]
    fn test_first_directory_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("dup.rule"), "c\n").unwrap();
        fs::write(second.path().join("dup.rule"), "u\n").unwrap();
        fs::write(second.path().join("extra.rule"), "r\n").unwrap();

        let catalog = RuleCatalog::with_directories(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        let files = catalog.available_rule_files();

        assert_eq!(files.len(), 2);
        assert_eq!(files["dup.rule"], first.path().join("dup.rule"));
    }

    #[test]
    fn test_validate_accepts_well_formed_rules() {
        let catalog = RuleCatalog::with_directories(vec![]);
        for rule in [":", "l", "u", "c", "r", "d", "sa@", "@a", "^!", "$123", "<8", ">2",
                     "csa@$2023", "sa@ $2023", "u sa4 se3"] {
            assert!(catalog.validate_rule(rule), "expected valid: {rule}");
        }
    }

    #[test]
    fn test_validate_rejects_malformed_rules() {
        let catalog = RuleCatalog::with_directories(vec![]);
        for rule in ["", "z", "s", "sa", "@", "^", "$", "<", "<x", ">abc", "cx"] {
            assert!(!catalog.validate_rule(rule), "expected invalid: {rule}");
        }
    }

    #[test]
    fn test_check_rule_reports_position() {
        let catalog = RuleCatalog::with_directories(vec![]);
        match catalog.check_rule("cz") {
            Err(CrackError::InvalidRule { position, .. }) => assert_eq!(position, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_apply_rule_file() {
        let (_dir, catalog) = catalog_with_file("u\n$1\n");
        assert_eq!(
            catalog.apply_rule_file("password", "test"),
            vec!["PASSWORD", "password1"]
        );
    }

    #[test]
    fn test_apply_rules_to_wordlist() {
        let (dir, catalog) = catalog_with_file("c\n");
        let wordlist = dir.path().join("words.txt");
        fs::write(&wordlist, "alpha\n\nbeta\n").unwrap();

        assert_eq!(
            catalog.apply_rules_to_wordlist(&wordlist, "test"),
            vec!["Alpha", "Beta"]
        );
    }
}
