use std::fs;
use tempfile::TempDir;
use toy_coupler::adapters::{CsvSink, MemorySink, SingleProcess};
use toy_coupler::{CalendarKind, CouplerEngine, CouplerError, Date, DefinitionConfig, ToyModel};

const DEFINITION: &str = r#"
[simulation]
name = "toy-integration"
description = "ocean toy model on a small grid"

[[context]]
id = "ocn"

[context.calendar]
type = "gregorian"
time_origin = "1850-01-01"
start_date = "2020-01-01 00:00:00"

[context.variables]
toymodel_duration = "5d"
toymodel_timestep_duration = "1d"
toymodel_ni_glo = 4
toymodel_nj_glo = 3

[[context.domain]]
id = "domain"

[[context.field]]
id = "field2D_oce_to_atm"
freq_op = "2ts"
domain_ref = "domain"
"#;

fn definition(content: &str) -> DefinitionConfig {
    DefinitionConfig::from_toml_str(content).unwrap()
}

fn greg(s: &str) -> Date {
    Date::parse(CalendarKind::Gregorian, s).unwrap()
}

#[test]
fn test_five_daily_steps() {
    let sink = MemorySink::new();
    let report = ToyModel::new("ocn")
        .run(SingleProcess, &definition(DEFINITION), Box::new(sink.clone()))
        .unwrap();

    assert_eq!(report.iterations, 5);
    assert_eq!(report.start_date, greg("2020-01-01"));
    assert_eq!(report.end_date, greg("2020-01-06"));
    assert_eq!(report.final_date, greg("2020-01-06"));
    assert_eq!(report.final_date.to_string(), "2020-01-06 00:00:00");
    assert_eq!(report.calendar_drift_steps, 0);

    // freq_op = 2ts: steps 2 and 4
    assert_eq!(report.fields_sent, 2);
    let records = sink.records().unwrap();
    let steps: Vec<u64> = records.iter().map(|r| r.step).collect();
    assert_eq!(steps, vec![2, 4]);
    assert_eq!(records[0].date, greg("2020-01-03"));
    assert_eq!(records[1].date, greg("2020-01-05"));
    assert_eq!(records[0].block.shape, [4, 3, 1]);
    assert_eq!(records[0].block.values.len(), 12);
    assert_eq!(records[0].field_id, "field2D_oce_to_atm");
    assert_eq!(records[0].context_id, "ocn");
}

#[test]
fn test_every_step_without_freq_op() {
    let content = DEFINITION.replace("freq_op = \"2ts\"\n", "");
    let sink = MemorySink::new();
    let report = ToyModel::new("ocn")
        .run(SingleProcess, &definition(&content), Box::new(sink.clone()))
        .unwrap();

    assert_eq!(report.fields_sent, 5);
    assert_eq!(sink.records().unwrap().len(), 5);
}

#[test]
fn test_sub_daily_timestep() {
    let content = DEFINITION
        .replace("toymodel_duration = \"5d\"", "toymodel_duration = \"1d\"")
        .replace("toymodel_timestep_duration = \"1d\"", "toymodel_timestep_duration = \"1800s\"");
    let report = ToyModel::new("ocn")
        .run(SingleProcess, &definition(&content), Box::new(MemorySink::new()))
        .unwrap();

    assert_eq!(report.iterations, 48);
    assert_eq!(report.final_date, greg("2020-01-02"));
    assert_eq!(report.fields_sent, 24);
}

#[test]
fn test_monthly_steps_from_month_end_drift() {
    let content = DEFINITION
        .replace("start_date = \"2020-01-01 00:00:00\"", "start_date = \"2020-01-31\"")
        .replace("toymodel_duration = \"5d\"", "toymodel_duration = \"3mo\"")
        .replace("toymodel_timestep_duration = \"1d\"", "toymodel_timestep_duration = \"1mo\"");
    let report = ToyModel::new("ocn")
        .run(SingleProcess, &definition(&content), Box::new(MemorySink::new()))
        .unwrap();

    // repeated addition clamps to the 29th after February
    assert_eq!(report.end_date, greg("2020-04-30"));
    assert_eq!(report.final_date, greg("2020-05-29"));
    assert_eq!(report.iterations, 4);
    assert_eq!(report.calendar_drift_steps, 3);
}

#[test]
fn test_missing_variable() {
    let content = DEFINITION.replace("toymodel_duration = \"5d\"\n", "");
    let err = ToyModel::new("ocn")
        .run(SingleProcess, &definition(&content), Box::new(MemorySink::new()))
        .unwrap_err();

    match err {
        CouplerError::VariableNotFound { name } => assert_eq!(name, "toymodel_duration"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_malformed_timestep_variable() {
    let content = DEFINITION.replace("toymodel_timestep_duration = \"1d\"", "toymodel_timestep_duration = \"daily\"");
    let err = ToyModel::new("ocn")
        .run(SingleProcess, &definition(&content), Box::new(MemorySink::new()))
        .unwrap_err();
    assert!(matches!(err, CouplerError::MalformedInput { .. }), "{:?}", err);
}

#[test]
fn test_unknown_context() {
    let err = ToyModel::new("atm")
        .run(SingleProcess, &definition(DEFINITION), Box::new(MemorySink::new()))
        .unwrap_err();
    assert!(matches!(err, CouplerError::UnknownObject { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_engine_with_server_ranks() {
    let sink = MemorySink::new();
    let engine = CouplerEngine::new(definition(DEFINITION), ToyModel::new("ocn")).with_ranks(4);

    let report = engine.run(Box::new(sink.clone())).await.unwrap();
    assert_eq!(report.iterations, 5);
    assert_eq!(report.final_date, greg("2020-01-06"));
    assert_eq!(sink.records().unwrap().len(), 2);
}

#[tokio::test]
async fn test_engine_failure_releases_servers() {
    let engine = CouplerEngine::new(definition(DEFINITION), ToyModel::new("atm")).with_ranks(3);

    let err = engine.run(Box::new(MemorySink::new())).await.unwrap_err();
    assert!(matches!(err, CouplerError::UnknownObject { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_engine_writes_csv() {
    let dir = TempDir::new().unwrap();
    let sink = CsvSink::new(dir.path()).unwrap();
    let path = sink.file_path("ocn", "field2D_oce_to_atm");
    let engine = CouplerEngine::new(definition(DEFINITION), ToyModel::new("ocn")).with_ranks(2);

    engine.run(Box::new(sink)).await.unwrap();

    let content = fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "step,date,tile,i,j,k,value");
    // header + two writes of a 4x3 block
    assert_eq!(lines.len(), 1 + 2 * 12);
    assert!(lines[1].starts_with("2,2020-01-03 00:00:00,0,0,0,0,"));
    assert!(lines[24].starts_with("4,2020-01-05 00:00:00,0,3,2,0,"));
}

#[test]
fn test_definition_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("toy.toml");
    fs::write(&path, DEFINITION).unwrap();

    let config = DefinitionConfig::from_file(&path).unwrap();
    let report = ToyModel::new("ocn")
        .run(SingleProcess, &config, Box::new(MemorySink::new()))
        .unwrap();
    assert_eq!(report.iterations, 5);
}

#[test]
fn test_engine_ranks_do_not_depend_on_blocking_pool() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let engine = CouplerEngine::new(definition(DEFINITION), ToyModel::new("ocn")).with_ranks(16);

    let report = runtime
        .block_on(async {
            tokio::time::timeout(std::time::Duration::from_secs(30), engine.run(Box::new(MemorySink::new()))).await
        })
        .expect("a group larger than the blocking pool must still finish")
        .unwrap();
    assert_eq!(report.iterations, 5);
}
