//! Tests for the job runner.
//!
//! Most tests use `MockNode` so no filesystem or store is involved; the
//! end-to-end tests at the bottom run real producers and loaders against
//! temporary CSV files and a temporary SQLite store.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use db::{Column, ColumnType, Value};
use nodes::mock::MockNode;
use nodes::{DbLoader, Table};
use sqlx::Row;

use crate::{
    build_repository, AssetSpec, ExecutorConfig, JobExecutor, Node, NodeKind, NodeStatus,
    Repository,
};

fn small_table() -> Table {
    Table::new(
        vec![Column::new("id", ColumnType::Integer)],
        vec![vec![Value::Integer(1)]],
    )
}

fn node(name: &str, kind: NodeKind, upstreams: &[&str], action: Arc<MockNode>) -> Node {
    Node {
        name: name.into(),
        kind,
        description: String::new(),
        upstreams: upstreams.iter().map(|u| u.to_string()).collect::<BTreeSet<_>>(),
        action,
    }
}

fn fast_executor(max_retries: u32) -> JobExecutor {
    JobExecutor::new(ExecutorConfig {
        max_retries,
        retry_base_delay: Duration::from_millis(1),
    })
}

// ============================================================
// MockNode runs (no filesystem or store)
// ============================================================

#[tokio::test]
async fn loader_receives_its_producers_output() {
    let producer = Arc::new(MockNode::returning("orders", small_table()));
    let loader = Arc::new(MockNode::flaky("orders_db_load", 0));

    let repo = Repository::new(
        "job",
        vec![
            node("orders", NodeKind::Producer, &[], producer.clone()),
            node("orders_db_load", NodeKind::Loader, &["orders"], loader.clone()),
        ],
    )
    .unwrap();

    let report = fast_executor(0).run(&repo).await;

    assert!(report.succeeded());
    assert_eq!(report.job_name, "job");
    assert_eq!(producer.call_count(), 1);
    assert_eq!(loader.last_inputs(), Some(vec!["orders".to_owned()]));
}

#[tokio::test]
async fn failed_node_skips_downstreams_but_not_independent_branches() {
    // broken → broken_db_load → report
    // fine
    let broken = Arc::new(MockNode::failing_load("broken"));
    let broken_load = Arc::new(MockNode::flaky("broken_db_load", 0));
    let report_node = Arc::new(MockNode::returning("report", small_table()));
    let fine = Arc::new(MockNode::returning("fine", small_table()));

    let repo = Repository::new(
        "job",
        vec![
            node("broken", NodeKind::Producer, &[], broken.clone()),
            node("broken_db_load", NodeKind::Loader, &["broken"], broken_load.clone()),
            node("report", NodeKind::Producer, &["broken_db_load"], report_node.clone()),
            node("fine", NodeKind::Producer, &[], fine.clone()),
        ],
    )
    .unwrap();

    let report = fast_executor(3).run(&repo).await;

    assert!(!report.succeeded());
    assert!(matches!(
        report.status_of("broken"),
        Some(NodeStatus::Failed { .. })
    ));
    assert_eq!(
        report.status_of("broken_db_load"),
        Some(&NodeStatus::Skipped { upstream: "broken".into() })
    );
    assert_eq!(
        report.status_of("report"),
        Some(&NodeStatus::Skipped { upstream: "broken_db_load".into() })
    );
    assert_eq!(report.status_of("fine"), Some(&NodeStatus::Succeeded));

    // Load errors are not retried; skipped nodes never run.
    assert_eq!(broken.call_count(), 1);
    assert_eq!(broken_load.call_count(), 0);
    assert_eq!(report_node.call_count(), 0);
    assert_eq!(fine.call_count(), 1);
    assert_eq!(report.failures().count(), 1);
}

#[tokio::test]
async fn transient_failure_is_retried_until_success() {
    let flaky = Arc::new(MockNode::flaky("flaky", 2));
    let repo = Repository::new(
        "job",
        vec![node("flaky", NodeKind::Loader, &[], flaky.clone())],
    )
    .unwrap();

    let report = fast_executor(2).run(&repo).await;

    assert!(report.succeeded());
    assert_eq!(report.nodes[0].attempts, 3);
    assert_eq!(flaky.call_count(), 3);
}

#[tokio::test]
async fn retries_are_bounded() {
    let flaky = Arc::new(MockNode::flaky("flaky", 10));
    let repo = Repository::new(
        "job",
        vec![node("flaky", NodeKind::Loader, &[], flaky.clone())],
    )
    .unwrap();

    let report = fast_executor(1).run(&repo).await;

    assert!(matches!(report.status_of("flaky"), Some(NodeStatus::Failed { .. })));
    assert_eq!(report.nodes[0].attempts, 2);
    assert_eq!(flaky.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn retry_delay_doubles_after_each_attempt() {
    let flaky = Arc::new(MockNode::flaky("x", 2));
    let repo = Repository::new("job", vec![node("x", NodeKind::Loader, &[], flaky.clone())]).unwrap();
    let executor = JobExecutor::new(ExecutorConfig {
        max_retries: 2,
        retry_base_delay: Duration::from_millis(100),
    });

    let start = tokio::time::Instant::now();
    let report = executor.run(&repo).await;
    let elapsed = start.elapsed();

    // 100ms after the first failure, 200ms after the second.
    assert!(report.succeeded());
    assert_eq!(report.nodes[0].attempts, 3);
    assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(400), "{elapsed:?}");
}

#[tokio::test]
async fn report_lists_nodes_in_execution_order() {
    let a = Arc::new(MockNode::returning("a", small_table()));
    let b = Arc::new(MockNode::returning("b", small_table()));
    let repo = Repository::new(
        "job",
        vec![
            node("b", NodeKind::Producer, &["a"], b),
            node("a", NodeKind::Producer, &[], a),
        ],
    )
    .unwrap();

    let report = fast_executor(0).run(&repo).await;
    let names: Vec<&str> = report.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(report.finished_at >= report.started_at);
}

// ============================================================
// End-to-end: real CSV files and a SQLite store
// ============================================================

#[tokio::test]
async fn csv_assets_are_loaded_into_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("orders.csv"),
        "id,item,total\n1,pen,2.5\n2,ink,\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("customers.csv"), "id,name\n7,Ada\n").unwrap();

    let url = format!("sqlite:///{}", dir.path().join("warehouse.db").display());
    let specs = vec![
        AssetSpec::new("customers", dir.path(), "customers.csv"),
        AssetSpec::new("orders", dir.path(), "orders.csv")
            .with_upstream("customers")
            .with_database_url(&url),
    ];
    let repo = build_repository(&specs, "process_csvs_job").unwrap();

    let report = fast_executor(0).run(&repo).await;
    assert!(report.succeeded(), "{report:?}");

    let mut conn = db::connect(&url).await.unwrap();
    let rows = sqlx::query("SELECT id, item, total FROM orders ORDER BY id")
        .fetch_all(&mut conn)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].try_get::<String, _>("item").unwrap(), "pen");
    assert_eq!(rows[0].try_get::<f64, _>("total").unwrap(), 2.5);
    assert_eq!(rows[1].try_get::<Option<f64>, _>("total").unwrap(), None);

    // Only assets with a database_url are written.
    let customers = sqlx::query("SELECT name FROM sqlite_master WHERE name = 'customers'")
        .fetch_optional(&mut conn)
        .await
        .unwrap();
    assert!(customers.is_none());
}

#[tokio::test]
async fn store_write_failure_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:///{}", dir.path().join("warehouse.db").display());

    // Duplicate column names make the CREATE TABLE fail.
    let clashing = Table::new(
        vec![
            Column::new("id", ColumnType::Integer),
            Column::new("id", ColumnType::Integer),
        ],
        vec![vec![Value::Integer(1), Value::Integer(2)]],
    );
    let producer = Arc::new(MockNode::returning("orders", clashing));
    let repo = Repository::new(
        "job",
        vec![
            node("orders", NodeKind::Producer, &[], producer),
            Node {
                name: "orders_db_load".into(),
                kind: NodeKind::Loader,
                description: String::new(),
                upstreams: BTreeSet::from(["orders".to_owned()]),
                action: Arc::new(DbLoader::new("orders_db_load", "orders", "orders", &url)),
            },
        ],
    )
    .unwrap();

    let report = fast_executor(3).run(&repo).await;

    let run = report
        .nodes
        .iter()
        .find(|n| n.name == "orders_db_load")
        .unwrap();
    assert_eq!(run.attempts, 1);
    match &run.status {
        NodeStatus::Failed { error } => assert!(error.contains("orders"), "{error}"),
        other => panic!("expected write failure, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_csv_fails_producer_and_skips_loader() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("warehouse.db");
    let url = format!("sqlite:///{}", store.display());

    let specs = vec![AssetSpec::new("orders", dir.path(), "orders.csv").with_database_url(&url)];
    let repo = build_repository(&specs, "process_csvs_job").unwrap();

    let report = fast_executor(3).run(&repo).await;

    match report.status_of("orders") {
        Some(NodeStatus::Failed { error }) => assert!(error.contains("orders.csv"), "{error}"),
        other => panic!("expected producer failure, got {other:?}"),
    }
    assert_eq!(
        report.status_of("orders_db_load"),
        Some(&NodeStatus::Skipped { upstream: "orders".into() })
    );
    assert!(!store.exists());
}
