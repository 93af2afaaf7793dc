use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn solesource_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_solesource"))
}

fn run_cli(args: &[String], envs: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(solesource_bin());
    cmd.args(args);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.output().expect("failed to execute solesource CLI")
}

fn parse_json_output(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json_start = stdout.find(|c| c == '{' || c == '[').unwrap_or_else(|| {
        panic!(
            "no JSON payload found in output\nstdout:\n{}\nstderr:\n{}",
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    });
    let mut deserializer = serde_json::Deserializer::from_str(&stdout[json_start..]);
    serde_json::Value::deserialize(&mut deserializer).unwrap_or_else(|err| {
        panic!(
            "failed to parse JSON output: {}\nstdout:\n{}\nstderr:\n{}",
            err,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

fn run_cli_json<T: DeserializeOwned>(args: &[String], envs: &[(&str, &str)]) -> T {
    let output = run_cli(args, envs);
    assert!(
        output.status.success(),
        "command failed: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_value(parse_json_output(&output)).unwrap_or_else(|err| {
        panic!(
            "failed to deserialize JSON output: {}\nstdout:\n{}",
            err,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn run_cli_json_error(args: &[String], envs: &[(&str, &str)]) -> serde_json::Value {
    let output = run_cli(args, envs);
    assert!(
        !output.status.success(),
        "command unexpectedly succeeded: {}\nstdout:\n{}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout)
    );
    assert_eq!(output.status.code(), Some(1));
    parse_json_output(&output)
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn write_answers(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write answers file");
    path
}

#[derive(Debug, Deserialize)]
struct EvaluateOutput {
    session_id: String,
    determination: Determination,
    answers: serde_json::Value,
    exports: Vec<ExportedFile>,
}

#[derive(Debug, Deserialize)]
struct Determination {
    code: String,
    title: String,
    score: Option<i32>,
    #[serde(default)]
    breakdown: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ExportedFile {
    path: PathBuf,
    media_type: String,
    bytes: usize,
}

const LIKELY_TOML: &str = r#"
amount = "10k_to_200k"
single_source = "yes"
justification = ["proprietary_technology"]
alternatives_researched = "yes"
price_reasonable = ["quote_comparison", "market_research"]
"#;

#[test]
fn test_evaluate_toml_json_output() {
    let home = TempDir::new().expect("create temp home");
    let home_str = home.path().to_string_lossy().to_string();
    let envs = [("SOLESOURCE_HOME", home_str.as_str()), ("RUST_LOG", "error")];

    let answers = write_answers(home.path(), "answers.toml", LIKELY_TOML);
    let output: EvaluateOutput = run_cli_json(
        &args(&["evaluate", answers.to_str().unwrap(), "--json"]),
        &envs,
    );

    assert_eq!(output.determination.code, "likely_sole_source");
    assert_eq!(output.determination.title, "Likely Sole Source");
    assert_eq!(output.determination.score, Some(9));
    assert!(!output.determination.breakdown.is_empty());
    assert_eq!(output.answers["amount"], "10k_to_200k");
    assert_eq!(output.session_id.len(), 36);
    assert!(output.exports.is_empty());
}

#[test]
fn test_evaluate_exemption_from_json_file() {
    let home = TempDir::new().expect("create temp home");
    let home_str = home.path().to_string_lossy().to_string();
    let envs = [("SOLESOURCE_HOME", home_str.as_str()), ("RUST_LOG", "error")];

    let answers = write_answers(
        home.path(),
        "answers.json",
        r#"{"amount": "under_10k", "single_source": "no"}"#,
    );
    let output: EvaluateOutput = run_cli_json(
        &args(&["evaluate", answers.to_str().unwrap(), "--json"]),
        &envs,
    );

    assert_eq!(output.determination.code, "delegated_authority");
    assert_eq!(output.determination.score, None);
    assert!(output.answers.get("single_source").is_none());
}

#[test]
fn test_config_disables_short_circuit() {
    let home = TempDir::new().expect("create temp home");
    fs::write(
        home.path().join("config.toml"),
        "[wizard]\nexemption_short_circuit = false\n",
    )
    .unwrap();
    let home_str = home.path().to_string_lossy().to_string();
    let envs = [("SOLESOURCE_HOME", home_str.as_str()), ("RUST_LOG", "error")];

    // Without the short-circuit every step must be answered.
    let answers = write_answers(home.path(), "answers.toml", "amount = \"under_10k\"\n");
    let error = run_cli_json_error(
        &args(&["evaluate", answers.to_str().unwrap(), "--json"]),
        &envs,
    );
    assert!(error["error"].as_str().unwrap().contains("step 2"));
}

#[test]
fn test_evaluate_writes_exports() {
    let home = TempDir::new().expect("create temp home");
    let home_str = home.path().to_string_lossy().to_string();
    let envs = [("SOLESOURCE_HOME", home_str.as_str()), ("RUST_LOG", "error")];

    let answers = write_answers(home.path(), "answers.toml", LIKELY_TOML);
    let report = home.path().join("out").join("report.txt");
    let document = home.path().join("out").join("report.pdf");
    let output: EvaluateOutput = run_cli_json(
        &args(&[
            "evaluate",
            answers.to_str().unwrap(),
            "--json",
            "--report",
            report.to_str().unwrap(),
            "--document",
            document.to_str().unwrap(),
        ]),
        &envs,
    );

    assert_eq!(output.exports.len(), 2);
    assert_eq!(output.exports[0].path, report);
    assert_eq!(output.exports[0].media_type, "text/plain");
    assert_eq!(output.exports[1].media_type, "application/pdf");

    let text = fs::read_to_string(&report).unwrap();
    assert!(text.starts_with("SOLE SOURCE DETERMINATION REPORT\n"));
    assert!(text.contains("Result: Likely Sole Source"));

    let pdf = fs::read(&document).unwrap();
    assert_eq!(pdf.len(), output.exports[1].bytes);
    assert!(pdf.starts_with(b"%PDF-1.4"));
}

#[test]
fn test_unknown_option_reports_helpful_json_error() {
    let home = TempDir::new().expect("create temp home");
    let home_str = home.path().to_string_lossy().to_string();
    let envs = [("SOLESOURCE_HOME", home_str.as_str()), ("RUST_LOG", "error")];

    let answers = write_answers(
        home.path(),
        "answers.toml",
        "amount = \"10k_to_200k\"\nsingle_source = \"maybe\"\n",
    );
    let error = run_cli_json_error(
        &args(&["evaluate", answers.to_str().unwrap(), "--json"]),
        &envs,
    );
    assert!(error["error"].as_str().unwrap().contains("maybe"));
    assert!(!error["suggestions"].as_array().unwrap().is_empty());
}

#[test]
fn test_none_with_price_methods_is_rejected() {
    let home = TempDir::new().expect("create temp home");
    let home_str = home.path().to_string_lossy().to_string();
    let envs = [("SOLESOURCE_HOME", home_str.as_str()), ("RUST_LOG", "error")];

    let answers = write_answers(
        home.path(),
        "answers.toml",
        r#"
amount = "10k_to_200k"
single_source = "yes"
justification = ["proprietary_technology"]
alternatives_researched = "yes"
price_reasonable = ["quote_comparison", "catalog_pricing", "none"]
"#,
    );
    let error = run_cli_json_error(
        &args(&["evaluate", answers.to_str().unwrap(), "--json"]),
        &envs,
    );
    assert!(error["error"].as_str().unwrap().contains("\"none\""));
    assert!(error["context"].as_str().unwrap().contains("catalog_pricing"));
    assert_eq!(error["suggestions"].as_array().unwrap().len(), 2);
}

#[test]
fn test_missing_answers_file() {
    let home = TempDir::new().expect("create temp home");
    let home_str = home.path().to_string_lossy().to_string();
    let envs = [("SOLESOURCE_HOME", home_str.as_str()), ("RUST_LOG", "error")];

    let missing = home.path().join("nope.toml");
    let error = run_cli_json_error(
        &args(&["evaluate", missing.to_str().unwrap(), "--json"]),
        &envs,
    );
    assert!(error["error"].as_str().unwrap().contains("File not found"));
}

#[test]
fn test_steps_and_config_json() {
    let home = TempDir::new().expect("create temp home");
    fs::write(
        home.path().join("config.toml"),
        r#"
[report]
organization = "Office of Purchasing"

[[catalog.price_methods]]
key = "independent_estimate"
label = "Independent cost estimate"
"#,
    )
    .unwrap();
    let home_str = home.path().to_string_lossy().to_string();
    let envs = [("SOLESOURCE_HOME", home_str.as_str()), ("RUST_LOG", "error")];

    let steps: serde_json::Value = run_cli_json(&args(&["steps", "--json"]), &envs);
    let list = steps["steps"].as_array().unwrap();
    assert_eq!(list.len(), 5);
    assert_eq!(list[0]["title"], "Step 1: Procurement Amount");
    let price_keys: Vec<&str> = list[4]["questions"][0]["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["key"].as_str().unwrap())
        .collect();
    assert_eq!(price_keys, vec!["independent_estimate", "none"]);

    let config: serde_json::Value = run_cli_json(&args(&["config", "--json"]), &envs);
    assert_eq!(config["home"], home_str.as_str());
    assert_eq!(config["config_file"]["exists"], true);
    assert_eq!(config["report"]["organization"], "Office of Purchasing");
    assert_eq!(config["catalog"]["price_methods"], 1);
    assert_eq!(config["catalog"]["overridden"], true);
}
