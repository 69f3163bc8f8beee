// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Loading `acurast.json` from disk through validation, conversion and fees

use acurast_cli::config::Settings;
use acurast_cli::fees::{fee_analysis, FeeWarning};
use acurast_cli::project::{
    convert_config_to_job, load_raw_project, project_names, validate_config, ConfigError,
    ConvertError,
};
use serde_json::json;
use tempfile::TempDir;

use crate::common::project_json;

const NOW: u64 = 1_700_000_000_000;

fn write_projects(dir: &TempDir, projects: serde_json::Value) -> Settings {
    let settings = Settings::new(dir.path().to_path_buf());
    let content = serde_json::to_string_pretty(&json!({ "projects": projects })).unwrap();
    std::fs::write(settings.config_file(), content).unwrap();
    settings
}

#[test]
fn test_load_validate_convert() {
    let dir = TempDir::new().unwrap();
    let settings = write_projects(
        &dir,
        json!({
            "app": project_json("app", "dist/bundle.js"),
            "worker": project_json("worker", "ipfs://QmWorker"),
        }),
    );

    let mut names = project_names(&settings.config_file()).unwrap();
    names.sort();
    assert_eq!(names, vec!["app".to_string(), "worker".to_string()]);

    let raw = load_raw_project(&settings.config_file(), Some("app")).unwrap();
    let (config, notes) = validate_config(&raw, NOW).into_result().unwrap();
    assert!(notes.iter().all(|note| !note.message.is_empty()));

    let job = convert_config_to_job(&config, NOW).unwrap();
    assert_eq!(job.script, "dist/bundle.js");
    assert_eq!(job.schedule.start_time, NOW + 3_600_000);
    assert_eq!(job.schedule.duration, 10_000);
    assert_eq!(job.schedule.end_time, job.schedule.start_time + 10_001);
    assert_eq!(job.extra.requirements.slots, 1);
    assert_eq!(job.extra.requirements.reward, 100_000_000_000);
}

#[test]
fn test_multiple_projects_need_a_name() {
    let dir = TempDir::new().unwrap();
    let settings = write_projects(
        &dir,
        json!({
            "a": project_json("a", "a.js"),
            "b": project_json("b", "b.js"),
        }),
    );

    assert!(matches!(
        load_raw_project(&settings.config_file(), None),
        Err(ConfigError::ProjectNotSpecified(_))
    ));
    assert!(matches!(
        load_raw_project(&settings.config_file(), Some("c")),
        Err(ConfigError::ProjectNotFound(..))
    ));
}

#[test]
fn test_invalid_project_reports_issues() {
    let dir = TempDir::new().unwrap();
    let mut project = project_json("app", "app.js");
    project["numberOfReplicas"] = json!(0);
    project.as_object_mut().unwrap().remove("network");
    let settings = write_projects(&dir, json!({ "app": project }));

    let raw = load_raw_project(&settings.config_file(), None).unwrap();
    let outcome = validate_config(&raw, NOW);
    assert!(!outcome.is_valid());

    let paths: Vec<String> = outcome.issues.iter().map(|i| i.path_string()).collect();
    assert!(paths.contains(&"numberOfReplicas".to_string()));
    assert!(paths.contains(&"network".to_string()));
}

#[test]
fn test_fee_analysis_of_loaded_project() {
    let dir = TempDir::new().unwrap();
    let mut project = project_json("app", "app.js");
    project["numberOfReplicas"] = json!(2);
    project["execution"] = json!({
        "type": "interval",
        "intervalInMs": 60_000,
        "numberOfExecutions": 5
    });
    let settings = write_projects(&dir, json!({ "app": project }));

    let raw = load_raw_project(&settings.config_file(), None).unwrap();
    let (config, _) = validate_config(&raw, NOW).into_result().unwrap();
    let analysis = fee_analysis(&config, NOW).unwrap();

    assert_eq!(analysis.total_runs, 10);
    assert_eq!(analysis.max_cost_per_execution_per_replica, 500_000_000_000);
    assert_eq!(analysis.max_total_cost, 1_000_000_000_000);
    assert_eq!(analysis.max_total_cost_cacu, "1");
    // 0.1 cACU against a suggested ~0.032 cACU
    assert!(matches!(analysis.warning(), Some(FeeWarning::Overpaying(_))));
}

#[test]
fn test_oversized_schedule_is_rejected_not_wrapped() {
    let mut project = project_json("app", "app.js");
    project["execution"] = json!({
        "type": "interval",
        "intervalInMs": 1_000_000_000_000_000_000u64,
        "numberOfExecutions": 100
    });

    let (config, _) = validate_config(&project, NOW).into_result().unwrap();
    assert_eq!(
        convert_config_to_job(&config, NOW),
        Err(ConvertError::ScheduleOverflow(
            "execution.intervalInMs * execution.numberOfExecutions"
        ))
    );
    assert!(fee_analysis(&config, NOW).is_err());

    project["execution"] = json!({"type": "onetime", "maxExecutionTimeInMs": u64::MAX});
    let (config, _) = validate_config(&project, NOW).into_result().unwrap();
    assert_eq!(
        convert_config_to_job(&config, NOW),
        Err(ConvertError::ScheduleOverflow("execution.maxExecutionTimeInMs"))
    );

    project["execution"] = json!({"type": "onetime", "maxExecutionTimeInMs": 10_000});
    project["startAt"] = json!({"msFromNow": u64::MAX});
    let (config, _) = validate_config(&project, NOW).into_result().unwrap();
    assert_eq!(
        convert_config_to_job(&config, NOW),
        Err(ConvertError::ScheduleOverflow("startAt.msFromNow"))
    );
}

#[test]
fn test_oversized_total_cost_is_rejected() {
    let mut project = project_json("app", "app.js");
    project["numberOfReplicas"] = json!(64);
    project["maxCostPerExecution"] = json!(u64::MAX);
    project["execution"] = json!({
        "type": "interval",
        "intervalInMs": 1,
        "numberOfExecutions": 1u64 << 62
    });

    let (config, _) = validate_config(&project, NOW).into_result().unwrap();
    assert!(convert_config_to_job(&config, NOW).is_ok());
    assert_eq!(
        fee_analysis(&config, NOW),
        Err(ConvertError::CostOverflow("maxCostPerExecution"))
    );
}
