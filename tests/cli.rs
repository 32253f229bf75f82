use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn script(dir: &TempDir, source: &str) -> PathBuf {
    let path = dir.path().join("script.tt");
    fs::write(&path, source).expect("write script");
    path
}

fn tether(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tether").expect("binary");
    cmd.env_remove("RUST_LOG").env_remove("TETHER_TRACE");
    cmd.arg("--config").arg(dir.path().join("empty.toml"));
    fs::write(dir.path().join("empty.toml"), "").expect("write config");
    cmd
}

#[test]
fn successful_run_exits_zero() {
    let dir = TempDir::new().expect("tempdir");
    let path = script(&dir, "{0(1)3.=>'i} body, done\nprint 'i\ndone...\n");
    tether(&dir)
        .arg(&path)
        .assert()
        .success()
        .stdout("0\n1\n2\n");
}

#[test]
fn compile_error_exits_65() {
    let dir = TempDir::new().expect("tempdir");
    let path = script(&dir, "print (1\nprint )\n");
    let assert = tether(&dir).arg(&path).assert().code(65);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("[line 1] Error"), "{stderr}");
    assert!(stderr.contains("[line 2] Error at ')': Expect expression."), "{stderr}");
    assert_eq!(stderr.matches("[line 1] Error").count(), 1, "{stderr}");
    assert_eq!(stderr.matches("[line 2] Error").count(), 1, "{stderr}");
}

#[test]
fn runtime_error_exits_70() {
    let dir = TempDir::new().expect("tempdir");
    let path = script(&dir, "print 1\nprint 'missing\n");
    let assert = tether(&dir).arg(&path).assert().code(70).stdout("1\n");
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("Undefined variable 'missing'."), "{stderr}");
    assert!(stderr.contains("[line 2] in script"), "{stderr}");
}

#[test]
fn unreadable_script_exits_74() {
    let dir = TempDir::new().expect("tempdir");
    tether(&dir)
        .arg(dir.path().join("absent.tt"))
        .assert()
        .code(74);
}

#[test]
fn config_rewrites_and_limits_apply() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("tether.toml");
    fs::write(
        &config,
        "[vm]\narena_capacity = 1\n\n[[rewrites]]\nfrom = \"show\"\nto = \"print\"\n",
    )
    .expect("write config");

    let path = script(&dir, "'a = 5\nshow 'a\n");
    Command::cargo_bin("tether")
        .expect("binary")
        .arg("--config")
        .arg(&config)
        .arg(&path)
        .assert()
        .success()
        .stdout("5\n");

    let path = script(&dir, "'a = 5\n'b = 6\n");
    Command::cargo_bin("tether")
        .expect("binary")
        .arg("--config")
        .arg(&config)
        .arg(&path)
        .assert()
        .code(70);
}

#[test]
fn disassemble_prints_listing_without_running() {
    let dir = TempDir::new().expect("tempdir");
    let path = script(&dir, "top...\nprint 1\n");
    let assert = tether(&dir)
        .arg("--disassemble")
        .arg(&path)
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.starts_with("top:\n"), "{stdout}");
    assert!(stdout.contains("OP_PRINT"), "{stdout}");
    assert!(stdout.contains("OP_RETURN"), "{stdout}");
    assert!(!stdout.contains("\n1\n"), "{stdout}");
}

#[test]
fn repl_keeps_state_between_lines() {
    let dir = TempDir::new().expect("tempdir");
    let assert = tether(&dir)
        .write_stdin("'x = 2\nprint 'x * 21\n")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("42"), "{stdout}");
}
