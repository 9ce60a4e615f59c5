use std::fs;

use tempfile::tempdir;

use jobhunt::HuntError;
use jobhunt::config::Config;

#[test]
fn explicit_file_overrides_only_what_it_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobhunt.toml");
    fs::write(
        &path,
        r#"
[sources]
enabled = ["rozee"]
max_jobs_per_source = 5

[cache]
ttl_seconds = 120
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.sources.enabled, vec!["rozee".to_string()]);
    assert_eq!(config.sources.max_jobs_per_source, 5);
    assert_eq!(config.cache.ttl_seconds, 120);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.sources.default_country, "Pakistan");
}

#[test]
fn missing_explicit_file_is_reported() {
    let dir = tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, HuntError::MissingConfig(_)));
}

#[test]
fn malformed_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[sources\nenabled = ").unwrap();
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, HuntError::Config(_)));
}

#[test]
fn out_of_range_threshold_fails_validation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobhunt.toml");
    fs::write(&path, "[scoring]\ninclusion_threshold = 1.5\n").unwrap();
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("inclusion_threshold"));
}

#[test]
fn unknown_source_name_fails_validation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("jobhunt.toml");
    fs::write(&path, "[sources]\nenabled = [\"monster\"]\n").unwrap();
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("monster"));
}
