use combined_server::config::{Config, OnFailure};
use combined_server::lifecycle::{CombinedServer, Components};
use combined_server::model::{RoleKind, TaskState};
use role_framework::LaunchError;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

fn test_config(log_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.master.listen_addr = "127.0.0.1:0".into();
    config.master.heartbeat_interval_ms = 10;
    config.worker.listen_addr = "127.0.0.1:0".into();
    config.worker.heartbeat_interval_ms = 10;
    config.worker.fetch_interval_ms = 10;
    config.log_service.listen_addr = "127.0.0.1:0".into();
    config.log_service.log_dir = log_dir.to_path_buf();
    config.alert.poll_interval_ms = 10;
    config
}

/// Full run: all four roles start in order, a command flows Master -> Worker.
#[tokio::test]
async fn combined_server_runs_a_command_end_to_end() {
    let log_dir = tempfile::tempdir().unwrap();
    let server = CombinedServer::launch(&test_config(log_dir.path()))
        .await
        .expect("Failed to launch combined server");

    assert_eq!(
        server.role_names(),
        vec!["Master", "Worker", "LogService", "AlertDispatcher"]
    );

    let store = server.context().process_store();
    let master = store.servers(RoleKind::Master).await.unwrap();
    assert_eq!(master.len(), 1);
    assert_eq!(store.servers(RoleKind::Worker).await.unwrap().len(), 1);

    // Master health endpoint answers
    let mut probe = TcpStream::connect(master[0].addr).await.unwrap();
    let mut reply = String::new();
    probe.read_to_string(&mut reply).await.unwrap();
    assert_eq!(reply, "ok\n");

    let cmd = store
        .submit_command("nightly".into(), vec!["extract".into(), "load".into()])
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..200 {
        tasks = store.tasks_for_command(cmd).await.unwrap();
        if tasks.len() == 2 && tasks.iter().all(|t| t.state.is_finished()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.state == TaskState::Succeeded));

    let context = server.context().clone();
    server.shutdown().await;
    let store = context.process_store();
    assert!(store.servers(RoleKind::Master).await.unwrap().is_empty());
    assert!(store.servers(RoleKind::Worker).await.unwrap().is_empty());
}

#[tokio::test]
async fn worker_bind_conflict_fails_startup_naming_worker() {
    let log_dir = tempfile::tempdir().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = test_config(log_dir.path());
    config.worker.listen_addr = taken.local_addr().unwrap().to_string();

    let err = CombinedServer::launch(&config).await.err().unwrap();

    assert_eq!(err.failed_role(), Some("Worker"));
    assert!(err.to_string().contains("bind"));
    assert_eq!(err.exit_code(), 1);
}

/// Reserve a loopback address that is free right now.
fn free_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

#[tokio::test]
async fn missing_log_dir_fails_at_log_service() {
    let mut config = test_config(std::path::Path::new("/no/such/log/dir"));
    config.startup.on_failure = OnFailure::StopStarted;

    let err = CombinedServer::launch(&config).await.err().unwrap();

    assert_eq!(err.failed_role(), Some("LogService"));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn stop_started_releases_master_and_worker_ports() {
    let mut config = test_config(std::path::Path::new("/no/such/log/dir"));
    config.master.listen_addr = free_addr();
    config.worker.listen_addr = free_addr();
    config.startup.on_failure = OnFailure::StopStarted;

    let err = CombinedServer::launch(&config).await.err().unwrap();
    assert_eq!(err.failed_role(), Some("LogService"));

    // Both run loops have ended and dropped their listeners.
    std::net::TcpListener::bind(&config.master.listen_addr)
        .expect("Master port still held after failed launch");
    std::net::TcpListener::bind(&config.worker.listen_addr)
        .expect("Worker port still held after failed launch");
}

#[tokio::test]
async fn unknown_backend_fails_before_any_role_binds() {
    let log_dir = tempfile::tempdir().unwrap();
    // Occupy the master port: if Master were started, it would report a bind error.
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = test_config(log_dir.path());
    config.master.listen_addr = taken.local_addr().unwrap().to_string();
    config.persistence.backend = "postgres".into();

    let err = CombinedServer::launch(&config).await.err().unwrap();

    assert!(matches!(err, LaunchError::Context(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn dispatcher_without_channels_fails_last() {
    let log_dir = tempfile::tempdir().unwrap();
    let components = Components {
        alert_dispatcher: combined_server::roles::AlertDispatcher::new(),
        ..Components::default()
    };

    let err = CombinedServer::launch_with(&test_config(log_dir.path()), components)
        .await
        .err()
        .unwrap();

    assert_eq!(err.failed_role(), Some("AlertDispatcher"));
}
