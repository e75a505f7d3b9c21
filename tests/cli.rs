use assert_cmd::Command;
use tempfile::TempDir;

fn readbuddy(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("readbuddy").unwrap();
    cmd.env_remove("GEMINI_API_KEY")
        .env("READBUDDY_LOG", "off")
        .arg("--config")
        .arg(config_dir.path().join("config.json"));
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn analyze_offline_simulated_error_reports_miscue() {
    let dir = TempDir::new().unwrap();
    let out = stdout_of(readbuddy(&dir).args([
        "analyze",
        "--offline",
        "--spoken",
        "simulate_error",
        "--reference",
        "The quick bird.",
    ]));

    let mut lines = out.lines();
    let verdict: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
    assert_eq!(verdict["isCorrect"], false);
    assert_eq!(verdict["phonemes"], "/.../");
    let word = verdict["word"].as_str().unwrap();
    assert!(["The", "quick", "bird"].contains(&word), "picked {word}");
    assert_eq!(lines.next(), Some("source: fallback"));
}

#[test]
fn analyze_offline_plain_reading_is_correct() {
    let dir = TempDir::new().unwrap();
    let out = stdout_of(readbuddy(&dir).args([
        "analyze",
        "--offline",
        "--spoken",
        "The bird sang.",
        "--reference",
        "The bird sang.",
    ]));
    assert!(out.starts_with(r#"{"isCorrect":true}"#));
}

#[test]
fn analyze_without_key_falls_back() {
    let dir = TempDir::new().unwrap();
    let out = stdout_of(readbuddy(&dir).args([
        "analyze",
        "--spoken",
        "hello",
        "--reference",
        "hello",
    ]));
    assert!(out.contains("source: fallback"));
}

#[test]
fn books_lists_the_library() {
    let dir = TempDir::new().unwrap();
    let out = stdout_of(readbuddy(&dir).arg("books"));
    assert_eq!(out.lines().count(), 3);
    assert!(out.contains("book1\tThe Little Red Fox\t4 lines\t3 questions"));
    assert!(out.contains("The Lost Kite"));
}

#[test]
fn process_audio_missing_input_fails_with_status() {
    let dir = TempDir::new().unwrap();
    let stderr = readbuddy(&dir)
        .args(["process-audio", "--input"])
        .arg(dir.path().join("absent.wav"))
        .arg("--output")
        .arg(dir.path().join("out.wav"))
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&stderr).contains("could not read the recording"));
    assert!(!dir.path().join("out.wav").exists());
}

#[test]
fn tui_refuses_non_tty_stdin() {
    let dir = TempDir::new().unwrap();
    readbuddy(&dir).write_stdin("").assert().failure();
}
