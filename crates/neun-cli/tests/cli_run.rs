use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use std::fs;
use tempfile::tempdir;

const PAIR: &str = r#"
[simulation]
dt = 0.01
duration = 2.0
record_every = 10

[[neuron]]
name = "a"
model = "HH"
initial = { v = -75.0 }

[[neuron]]
name = "b"
model = "HH"

[[synapse]]
name = "gap"
kind = "electrical"
a = "a"
b = "b"
g_ab = -0.002
g_ba = -0.002

[[probe]]
label = "va"
neuron = "a"
variable = "v"

[[probe]]
label = "i"
synapse = "gap"
"#;

#[test]
fn run_writes_column_table() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = tmp.path().join("pair.toml");
    let out = tmp.path().join("pair.dat");
    fs::write(&config, PAIR)?;

    let mut cmd = Command::cargo_bin("neun")?;
    cmd.args([
        "run",
        config.to_str().expect("temp path to UTF-8"),
        "-o",
        out.to_str().expect("temp path to UTF-8"),
    ]);
    cmd.assert().success();

    let text = fs::read_to_string(&out)?;
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "# time va i");
    assert_eq!(lines.len(), 1 + 20);
    assert!(lines[1].starts_with("0.000000 "));
    assert!(lines[1].ends_with(" 0.020000"));
    Ok(())
}

#[test]
fn run_to_stdout_as_json() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = tmp.path().join("pair.toml");
    fs::write(&config, PAIR)?;

    let mut cmd = Command::cargo_bin("neun")?;
    cmd.args(["run", config.to_str().expect("temp path to UTF-8"), "--json"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"labels\""))
        .stdout(predicate::str::contains("\"va\""));
    Ok(())
}

#[test]
fn run_rejects_bad_config() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = tmp.path().join("bad.toml");
    fs::write(&config, PAIR.replace("b = \"b\"", "b = \"nobody\""))?;

    let mut cmd = Command::cargo_bin("neun")?;
    cmd.args(["run", config.to_str().expect("temp path to UTF-8")]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("'nobody' is not defined"));
    Ok(())
}

#[test]
fn run_missing_file_fails() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("neun")?;
    cmd.args(["run", "/definitely/not/here.toml"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("/definitely/not/here.toml"));
    Ok(())
}

#[test]
fn run_diffusion_pair() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = tmp.path().join("diffusion.toml");
    let out = tmp.path().join("diffusion.dat");
    let text = PAIR
        .replace("kind = \"electrical\"", "kind = \"diffusion\"")
        .replace("g_ab = -0.002", "g_ab = 1.0")
        .replace("g_ba = -0.002", "g_ba = 1.0\ntau = 2.0");
    fs::write(&config, text)?;

    let mut cmd = Command::cargo_bin("neun")?;
    cmd.args([
        "run",
        config.to_str().expect("temp path to UTF-8"),
        "-o",
        out.to_str().expect("temp path to UTF-8"),
    ]);
    cmd.assert().success();

    let text = fs::read_to_string(&out)?;
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "# time va i");
    assert_eq!(lines.len(), 1 + 20);
    // First recorded current: -10 * (1 - exp(-0.01 / 2))
    assert!(lines[1].ends_with(" -0.049875"));
    Ok(())
}
