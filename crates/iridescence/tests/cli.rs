use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn iridescence(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_iridescence"))
        .args(args)
        .env("IRIDESCENCE_CONFIG", config)
        .env_remove("IRIDESCENCE_CONFIG_DIR")
        .env_remove("IRIDESCENCE_CHAT_ENDPOINT")
        .env("RUST_LOG", "off")
        .output()
        .expect("spawn iridescence")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn config_where_prints_the_env_override() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bg.toml");

    let output = iridescence(&config, &["config", "where"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), config.display().to_string());
}

#[test]
fn config_show_merges_file_and_flags() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bg.toml");
    fs::write(
        &config,
        "version = 1\n[background]\namplitude = 2.5\n[surface]\nid = \"desk\"\n",
    )
    .unwrap();

    let output = iridescence(&config, &["--speed", "0.25", "config", "show"]);
    assert!(output.status.success(), "{output:?}");
    let shown = stdout(&output);
    assert!(shown.contains("amplitude = 2.5"), "{shown}");
    assert!(shown.contains("speed = 0.25"), "{shown}");
    assert!(shown.contains("id = \"desk\""), "{shown}");
    assert!(shown.contains("size = \"1280x720\""), "{shown}");
}

#[test]
fn missing_config_shows_defaults() {
    let dir = TempDir::new().unwrap();
    let output = iridescence(&dir.path().join("absent.toml"), &["config", "show"]);
    assert!(output.status.success());
    let shown = stdout(&output);
    assert!(shown.contains("version = 1"), "{shown}");
    assert!(shown.contains("id = \"iridescence-bg\""), "{shown}");
}

#[test]
fn unsupported_version_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bg.toml");
    fs::write(&config, "version = 7\n").unwrap();

    let output = iridescence(&config, &["config", "show"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported config version"), "{stderr}");
}

#[test]
fn blank_chat_message_prints_notice() {
    let dir = TempDir::new().unwrap();
    let output = iridescence(&dir.path().join("bg.toml"), &["chat", "   "]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "Please enter a message.");
}

#[test]
fn unreachable_chat_backend_prints_notice() {
    let dir = TempDir::new().unwrap();
    let output = iridescence(
        &dir.path().join("bg.toml"),
        &["chat", "hello", "--endpoint", "http://127.0.0.1:1"],
    );
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "Error connecting to chatbot.");
}
