//! End-to-end pipeline tests: generated rule files feed strategies, strategies
//! feed the scheduler, and the scheduler drives a checker to the credential.

use async_trait::async_trait;
use crack_engine::scheduler::{AttackOutcome, AttackScheduler, CredentialChecker};
use crack_engine::strategy::{BruteForceStrategy, DictionaryStrategy, RuleBasedStrategy};
use crack_engine::{Complexity, CrackResult, RuleCatalog, RuleGenerator, TargetInfo};
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Accepts one known password, counting every attempt.
struct KnownPassword {
    secret: String,
    attempts: AtomicU64,
}

impl KnownPassword {
    fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            attempts: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl CredentialChecker for KnownPassword {
    async fn check(&self, candidate: &str, _target: &TargetInfo) -> CrackResult<bool> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Ok(candidate == self.secret)
    }
}

#[tokio::test]
async fn test_wordlist_with_rules_cracks_mutated_password() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let dir = tempfile::tempdir()?;

    // The target password is a rule mutation of a wordlist entry
    let wordlist = dir.path().join("common.txt");
    fs::write(&wordlist, "letmein\nqwerty\npassword\n")?;

    let generator = RuleGenerator::with_seed(7).with_output_dir(dir.path());
    let rules = vec!["c".to_string(), "sa@".to_string(), "c sa@ $1".to_string()];
    let rule_file = generator.create_custom_rule_file("leet", &rules, "leetspeak mutations")?;

    let catalog = RuleCatalog::with_directories(vec![dir.path().to_path_buf()]);
    let transforms = catalog.parse_rule_file(&rule_file.to_string_lossy());
    assert_eq!(transforms.len(), 3);
    for rule in &transforms {
        assert!(catalog.validate_rule(rule), "generated rule invalid: {rule}");
    }

    let strategy = DictionaryStrategy::new("common+leet", &wordlist, transforms, None)?;

    let checker = Arc::new(KnownPassword::new("P@ssword1"));
    let mut scheduler = AttackScheduler::new();
    scheduler.set_target(TargetInfo::new("127.0.0.1", 22, "ssh").with_username("root"));
    scheduler.set_checker(checker.clone());
    scheduler.add_strategy(strategy, 0);

    let outcome = scheduler.run_sequential().await;

    assert_eq!(outcome, AttackOutcome::Found("P@ssword1".to_string()));
    assert!(checker.attempts.load(Ordering::Relaxed) > 0);
    Ok(())
}

#[tokio::test]
async fn test_generated_rule_file_survives_catalog_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let mut generator = RuleGenerator::with_seed(42).with_output_dir(dir.path());
    let path = generator.generate_rule_file("session", Complexity::Medium, 24, "")?;
    assert!(path.is_file());

    let catalog = RuleCatalog::with_directories(vec![dir.path().to_path_buf()]);
    let rules = catalog.parse_rule_file("session.rule");

    assert_eq!(rules.len(), 24);
    for rule in &rules {
        assert!(catalog.validate_rule(rule), "generated rule invalid: {rule}");
    }
    Ok(())
}

#[tokio::test]
async fn test_parallel_attack_across_strategy_kinds() {
    let _ = tracing_subscriber::fmt::try_init();

    // The credential sits in the brute-force space, not the wordlist
    let checker = Arc::new(KnownPassword::new("zz"));
    let mut scheduler = AttackScheduler::new();
    scheduler.set_checker(checker);
    scheduler.add_strategy(
        RuleBasedStrategy::new(
            "words",
            vec!["alpha".to_string(), "beta".to_string()],
            vec!["u".to_string()],
        ),
        1,
    );
    scheduler.add_strategy(
        BruteForceStrategy::new("short", "xyz", 1, 2, "", "").unwrap(),
        0,
    );

    let outcome = scheduler.run_parallel().await;
    assert_eq!(outcome, AttackOutcome::Found("zz".to_string()));
}

#[tokio::test]
async fn test_priority_puts_cheap_strategy_first() {
    let checker = Arc::new(KnownPassword::new("BETA"));
    let mut scheduler = AttackScheduler::new();
    scheduler.set_checker(checker.clone());
    // Exhaustive search is low priority, the curated list runs first
    scheduler.add_strategy(
        BruteForceStrategy::new("exhaustive", "abcdefgh", 4, 4, "", "").unwrap(),
        -10,
    );
    scheduler.add_strategy(
        RuleBasedStrategy::new(
            "curated",
            vec!["alpha".to_string(), "beta".to_string()],
            vec!["u".to_string()],
        ),
        10,
    );

    let outcome = scheduler.run_sequential().await;

    assert_eq!(outcome, AttackOutcome::Found("BETA".to_string()));
    // Found within the curated list, before the exhaustive space
    assert!(checker.attempts.load(Ordering::Relaxed) <= 4);
}

#[tokio::test]
async fn test_status_snapshots_track_progress() {
    let dir = tempfile::tempdir().unwrap();
    let wordlist = dir.path().join("words.txt");
    fs::write(&wordlist, "one\ntwo\nthree\n").unwrap();

    let snapshots = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&snapshots);

    let mut scheduler = AttackScheduler::new();
    scheduler.set_checker(Arc::new(KnownPassword::new("nope")));
    scheduler.add_strategy(
        DictionaryStrategy::new("words", &wordlist, Vec::new(), None).unwrap(),
        0,
    );
    scheduler.set_status_callback(move |snapshot| sink.lock().unwrap().push(snapshot));

    let outcome = scheduler.run_sequential().await;
    assert_eq!(outcome, AttackOutcome::Exhausted);

    let snapshots = snapshots.lock().unwrap();
    let last = snapshots.last().expect("final snapshot emitted");
    assert!(last.finished);
    assert_eq!(last.tried, 3);
    assert_eq!(last.total, 3);
    assert!((last.percent - 100.0).abs() < f64::EPSILON);
}
