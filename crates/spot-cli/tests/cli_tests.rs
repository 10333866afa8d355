//! CLI integration tests

use serde_json::{json, Value};
use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn spotctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spotctl"))
        .args(args)
        .env_remove("SPOT_CATALOG")
        .env_remove("SPOT_CONFIG")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

fn catalog_file() -> NamedTempFile {
    let now = "2024-05-01T00:00:00Z";
    let spec = |name: &str, vcpu: u32| {
        json!({
            "instance_type": name,
            "vcpu": vcpu,
            "memory_gb": vcpu * 4,
            "architecture": "x86_64",
            "category": "general_purpose",
        })
    };
    let spot = |name: &str, savings: u8| {
        json!({
            "instance_type": name,
            "region": "us-east-1",
            "savings_percent": savings,
            "interruption_frequency": "very_low",
            "spot_price": 0.04,
            "on_demand_price": 0.12,
            "last_updated": now,
        })
    };
    let snapshot = json!({
        "cloud_provider": "aws",
        "specs": [spec("m5.large", 2), spec("m5.xlarge", 4), spec("c5.large", 2)],
        "spot_data": [spot("m5.large", 70), spot("m5.xlarge", 65), spot("c5.large", 60)],
        "price_history": {
            "m5.large": {
                "instance_type": "m5.large",
                "current_price": 0.04,
                "avg_price": 0.041,
                "min_price": 0.035,
                "max_price": 0.05,
                "std_dev": 0.004,
                "volatility": 0.1,
                "data_points": 24
            }
        }
    });

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(snapshot.to_string().as_bytes()).unwrap();
    file
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_cli_help() {
    let output = spotctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    for command in ["analyze", "zones", "forecast", "batch-prices", "families"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
    assert!(stdout.contains("--format"));
    assert!(stdout.contains("--catalog"));
}

#[test]
fn test_cli_version() {
    let output = spotctl(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("spotctl"));
}

#[test]
fn test_analyze_json_output() {
    let catalog = catalog_file();
    let path = catalog.path().to_str().unwrap();
    let output = spotctl(&["analyze", "--catalog", path, "--format", "json", "--top-n", "2"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let result = stdout_json(&output);
    assert_eq!(result["total_analyzed"], 3);
    let top = result["top_instances"].as_array().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["rank"], 1);
}

#[test]
fn test_analyze_table_output() {
    let catalog = catalog_file();
    let path = catalog.path().to_str().unwrap();
    let output = spotctl(&["analyze", "--catalog", path]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("m5.large"));
    assert!(stdout.contains("Top recommendation"));
}

#[test]
fn test_analyze_unsupported_cloud_fails() {
    let catalog = catalog_file();
    let path = catalog.path().to_str().unwrap();
    let output = spotctl(&["analyze", "--catalog", path, "--cloud", "gcp"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported cloud provider"));
}

#[test]
fn test_zones_falls_back_to_default_topology() {
    let catalog = catalog_file();
    let path = catalog.path().to_str().unwrap();
    let output = spotctl(&["zones", "c5.large", "--catalog", path, "--format", "json"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let result = stdout_json(&output);
    assert_eq!(result["region"], "us-east-1");
    let rankings = result["rankings"].as_array().unwrap();
    assert_eq!(rankings.len(), 3);
    assert!(rankings.iter().all(|r| r["price_predicted"] == true));
}

#[test]
fn test_batch_prices_reports_failures() {
    let catalog = catalog_file();
    let path = catalog.path().to_str().unwrap();
    let output = spotctl(&[
        "batch-prices",
        "m5.large",
        "z9.large",
        "--catalog",
        path,
        "--format",
        "json",
    ]);

    assert!(output.status.success());
    let result = stdout_json(&output);
    assert!(result["analyses"]["m5.large"].is_object());
    assert_eq!(result["failed"][0]["instance_type"], "z9.large");
}

#[test]
fn test_families_needs_no_catalog() {
    let output = spotctl(&["families", "c6i.xlarge", "--format", "json"]);

    assert!(output.status.success());
    let rows = stdout_json(&output);
    assert_eq!(rows[0]["family"], "c");
    assert_eq!(rows[0]["vcpus"], 4);
}

#[test]
fn test_invalid_command() {
    let output = spotctl(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error") || stderr.contains("invalid"));
}

#[test]
fn test_missing_catalog_file() {
    let output = spotctl(&["analyze", "--catalog", "/nonexistent/catalog.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load catalog"));
}

#[test]
fn test_forecast_uses_price_history() {
    let catalog = catalog_file();
    let path = catalog.path().to_str().unwrap();

    let output = spotctl(&["forecast", "m5.large", "--catalog", path, "--format", "json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let forecast = stdout_json(&output);
    assert_eq!(forecast["method"], "linear_trend");
    assert_eq!(forecast["trend_direction"], "stable");
    assert_eq!(forecast["current_price"], 0.04);

    let output = spotctl(&["forecast", "c5.large", "--catalog", path, "--format", "json"]);
    assert!(output.status.success());
    let placeholder = stdout_json(&output);
    assert_eq!(placeholder["method"], "heuristic");
    assert!(placeholder["predicted_price_24h"].is_null());
}

#[test]
fn test_analyze_enhanced_attaches_factors() {
    let catalog = catalog_file();
    let path = catalog.path().to_str().unwrap();
    let output = spotctl(&["analyze", "--catalog", path, "--format", "json", "--enhanced"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let result = stdout_json(&output);
    let top = result["top_instances"].as_array().unwrap();
    assert_eq!(top.len(), 3);
    for instance in top {
        let from_history = instance["enhanced"]["from_history"].as_bool().unwrap();
        assert_eq!(from_history, instance["specs"]["instance_type"] == "m5.large");
    }

    let plain = stdout_json(&spotctl(&["analyze", "--catalog", path, "--format", "json"]));
    assert!(plain["top_instances"][0].get("enhanced").is_none());
}
