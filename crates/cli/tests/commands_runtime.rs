use std::env;
use std::fs;

use tempfile::TempDir;

/// One test drives every command so the process environment is only set up
/// once; the config loader reads `CONFETTI_*` variables at each call.
#[tokio::test]
async fn commands_run_against_a_seeded_workspace() {
    let dir = TempDir::new().expect("tempdir");
    let content_dir = dir.path().join("content");
    fs::create_dir_all(&content_dir).expect("content dir");
    fs::write(
        content_dir.join("quizzes.json"),
        r#"[{"id": "q1", "question": "Which port does HTTPS use?",
             "options": ["80", "443"], "answer": 1}]"#,
    )
    .expect("seed quizzes");

    env::set_var("CONFETTI_SLACK_APP_TOKEN", "xapp-test");
    env::set_var("CONFETTI_SLACK_BOT_TOKEN", "xoxb-test");
    env::set_var("CONFETTI_CATALOG_DIR", content_dir.display().to_string());
    env::set_var("CONFETTI_STORE_PATH", dir.path().join("state.json").display().to_string());

    let doctor = confetti_cli::commands::doctor::run(true).await;
    let report: serde_json::Value = serde_json::from_str(&doctor).expect("doctor emits json");
    assert_eq!(report["overall_status"], "pass", "doctor report: {doctor}");

    let catalog = confetti_cli::commands::catalog::run();
    assert_eq!(catalog.exit_code, 0);
    assert!(catalog.output.contains("\"quiz\""));
    assert!(catalog.output.contains("1 items across"));

    let leaderboard = confetti_cli::commands::leaderboard::run(10).await;
    assert_eq!(leaderboard.exit_code, 0);
    assert!(leaderboard.output.contains("no engagement recorded yet"));

    let config_dump = confetti_cli::commands::config::run();
    assert!(config_dump.contains("xapp-…(redacted)"));
    assert!(!config_dump.contains("xapp-test"), "config dump never prints raw secrets");

    for var in [
        "CONFETTI_SLACK_APP_TOKEN",
        "CONFETTI_SLACK_BOT_TOKEN",
        "CONFETTI_CATALOG_DIR",
        "CONFETTI_STORE_PATH",
    ] {
        env::remove_var(var);
    }
}
