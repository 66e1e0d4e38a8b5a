use anyhow::Result;
use chrono::{TimeZone, Utc};
use httpmock::prelude::*;
use tempfile::TempDir;
use users_etl::app::tasks::OutputSink;
use users_etl::core::runner::{DagRunState, TaskState};
use users_etl::{build_users_dag_with_sink, DagRunner, EtlError, LocalStorage, RunType, TomlConfig};

fn api_users() -> serde_json::Value {
    serde_json::json!([
        {
            "id": 1,
            "name": "Leanne Graham",
            "username": "Bret",
            "email": "Sincere@april.biz",
            "address": {
                "street": "Kulas Light",
                "suite": "Apt. 556",
                "city": "Gwenborough",
                "zipcode": "92998-3874",
                "geo": {"lat": "-37.3159", "lng": "81.1496"}
            },
            "phone": "1-770-736-8031 x56442",
            "website": "hildegard.org",
            "company": {"name": "Romaguera-Crona", "catchPhrase": "Multi-layered", "bs": "e-markets"}
        },
        {
            "id": 2,
            "name": "Ervin Howell",
            "username": "Antonette",
            "email": "Shanna@melissa.tv",
            "address": {
                "street": "Victor Plains",
                "suite": "Suite 879",
                "city": "Wisokyburgh",
                "zipcode": "90566-7771",
                "geo": {"lat": "-43.9509", "lng": "-34.4618"}
            },
            "phone": "010-692-6593 x09125",
            "website": "anastasia.net",
            "company": {"name": "Deckow-Crist", "catchPhrase": "Proactive", "bs": "synergize"}
        }
    ])
}

fn config_for(endpoint: &str, persist: bool) -> TomlConfig {
    let toml_content = format!(
        r#"
[dag]
dag_id = "users_etl_test"

[extract]
url = "{}"
timeout_seconds = 5

[load]
path = "exports/user.csv"
persist = {}
"#,
        endpoint, persist
    );
    TomlConfig::from_toml_str(&toml_content).unwrap()
}

#[tokio::test]
async fn test_end_to_end_users_dag() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start_async().await;
    let api_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(api_users());
        })
        .await;

    let config = config_for(&server.url("/users"), true);
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let (sink, buffer) = OutputSink::buffer();
    let dag = build_users_dag_with_sink(&config, storage, sink);

    let logical_date = Utc.with_ymd_and_hms(2021, 5, 12, 0, 0, 0).unwrap();
    let report = DagRunner::new(dag)
        .run(logical_date, RunType::Scheduled)
        .await?
        .into_result()?;

    api_mock.assert_async().await;
    assert_eq!(report.dag_id, "users_etl_test");
    assert_eq!(report.run_id, "scheduled__2021-05-12T00:00:00+00:00");
    assert_eq!(
        report.executed_task_ids(),
        vec!["extract_users", "transform_users", "load_users"]
    );

    let output = String::from_utf8(buffer.lock().unwrap().clone())?;
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("PhoneNumber"));
    assert!(lines[1].contains("Kulas Light, Apt. 556, Gwenborough"));
    assert!(lines[1].contains("Romaguera-Crona"));
    assert!(!lines[1].contains("catchPhrase"));
    assert!(lines[2].contains("Victor Plains, Suite 879, Wisokyburgh"));

    let csv = std::fs::read_to_string(temp_dir.path().join("exports/user.csv"))?;
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    assert_eq!(
        headers,
        vec!["ID", "Name", "Username", "Email", "Address", "PhoneNumber", "Company"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[1][4], "Victor Plains, Suite 879, Wisokyburgh");
    assert_eq!(&rows[1][6], "Deckow-Crist");

    Ok(())
}

#[tokio::test]
async fn test_path_is_not_written_unless_persistence_is_enabled() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(200).json_body(api_users());
        })
        .await;

    let config = config_for(&server.url("/users"), false);
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let (sink, buffer) = OutputSink::buffer();
    let dag = build_users_dag_with_sink(&config, storage, sink);

    let report = DagRunner::new(dag).run(Utc::now(), RunType::Manual).await?;

    assert!(report.is_success());
    assert!(!buffer.lock().unwrap().is_empty());
    assert!(!temp_dir.path().join("exports/user.csv").exists());
    Ok(())
}

#[tokio::test]
async fn test_empty_user_list_renders_empty_table() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(200).json_body(serde_json::json!([]));
        })
        .await;

    let config = config_for(&server.url("/users"), false);
    let (sink, buffer) = OutputSink::buffer();
    let dag = build_users_dag_with_sink(&config, LocalStorage::new(".".to_string()), sink);

    let report = DagRunner::new(dag).run(Utc::now(), RunType::Manual).await?;

    assert!(report.is_success());
    let output = String::from_utf8(buffer.lock().unwrap().clone())?;
    assert!(output.starts_with("Empty DataFrame"));
    Ok(())
}

#[tokio::test]
async fn test_api_failure_stops_before_transform_and_load() -> Result<()> {
    let server = MockServer::start_async().await;
    let api_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(500);
        })
        .await;

    let config = config_for(&server.url("/users"), false);
    let (sink, buffer) = OutputSink::buffer();
    let dag = build_users_dag_with_sink(&config, LocalStorage::new(".".to_string()), sink);

    let report = DagRunner::new(dag).run(Utc::now(), RunType::Manual).await?;

    api_mock.assert_async().await;
    assert_eq!(report.state, DagRunState::Failed);
    assert_eq!(report.task("extract_users").unwrap().state, TaskState::Failed);
    assert_eq!(report.task("transform_users").unwrap().state, TaskState::UpstreamFailed);
    assert_eq!(report.task("load_users").unwrap().state, TaskState::UpstreamFailed);
    assert!(buffer.lock().unwrap().is_empty());

    let err = report.into_result().unwrap_err();
    assert!(matches!(err, EtlError::TaskFailed { ref task_id, .. } if task_id == "extract_users"));
    assert_eq!(err.exit_code(), 2);
    Ok(())
}

#[tokio::test]
async fn test_malformed_user_fails_transform() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(200)
                .json_body(serde_json::json!([{"id": 1, "name": "No Address"}]));
        })
        .await;

    let config = config_for(&server.url("/users"), false);
    let (sink, buffer) = OutputSink::buffer();
    let dag = build_users_dag_with_sink(&config, LocalStorage::new(".".to_string()), sink);

    let report = DagRunner::new(dag).run(Utc::now(), RunType::Manual).await?;

    assert_eq!(report.task("extract_users").unwrap().state, TaskState::Success);
    assert_eq!(report.task("transform_users").unwrap().state, TaskState::Failed);
    assert_eq!(report.task("load_users").unwrap().state, TaskState::UpstreamFailed);
    assert!(buffer.lock().unwrap().is_empty());
    Ok(())
}
