use role_framework::mock::{CallLog, MockResolver, MockRole};
use role_framework::{
    launch, launch_with_policy, ContextProvider, ContextResolutionError, FailurePolicy,
    LaunchError, StartupSequence,
};
use std::time::Duration;

const ORDER: [&str; 4] = ["Master", "Worker", "LogService", "AlertDispatcher"];

fn mocks(log: &CallLog) -> Vec<MockRole> {
    ORDER
        .iter()
        .map(|name| MockRole::with_log(*name, log.clone()))
        .collect()
}

fn sequence(roles: &[MockRole]) -> StartupSequence<()> {
    roles
        .iter()
        .fold(StartupSequence::new(), |seq, mock| seq.with_role(mock.role()))
}

/// Every success/failure combination: a role is started only if all earlier roles succeeded.
#[tokio::test]
async fn roles_start_only_after_all_predecessors_succeed() {
    for mask in 0u8..16 {
        let log = CallLog::new();
        let mut roles = mocks(&log);
        let outcomes: Vec<bool> = (0..4).map(|i| mask & (1 << i) == 0).collect();
        let first_failure = outcomes.iter().position(|ok| !ok);

        for (i, role) in roles.iter_mut().enumerate() {
            if first_failure.map_or(true, |k| i <= k) {
                if outcomes[i] {
                    role.expect_start().return_ok();
                } else {
                    role.expect_start().return_err("failed".into());
                }
            }
        }

        let result = sequence(&roles).start_all(&()).await;

        for (i, role) in roles.iter().enumerate() {
            let expected = if first_failure.map_or(true, |k| i <= k) { 1 } else { 0 };
            assert_eq!(role.start_count(), expected, "mask {mask:04b}, role {}", ORDER[i]);
            role.verify();
        }
        match first_failure {
            Some(k) => assert_eq!(result.unwrap_err().role, ORDER[k]),
            None => assert_eq!(result.unwrap().len(), 4),
        }
    }
}

#[tokio::test]
async fn all_stub_roles_succeed_and_start_once() {
    let log = CallLog::new();
    let mut roles = mocks(&log);
    for role in roles.iter_mut() {
        role.expect_start().return_ok();
    }

    let started = sequence(&roles).start_all(&()).await.unwrap();

    assert_eq!(started.names(), ORDER.map(String::from).to_vec());
    for role in &roles {
        assert_eq!(role.start_count(), 1);
        assert_eq!(role.stop_count(), 0);
    }
    assert_eq!(
        log.entries(),
        vec!["start:Master", "start:Worker", "start:LogService", "start:AlertDispatcher"]
    );
}

#[tokio::test]
async fn worker_bind_failure_stops_the_sequence() {
    let log = CallLog::new();
    let mut roles = mocks(&log);
    roles[0].expect_start().return_ok();
    roles[1].expect_start().return_err("bind failed".into());

    let provider = ContextProvider::new(MockResolver::ok(()));
    let err = launch(&provider, sequence(&roles)).await.err().unwrap();

    assert_eq!(roles[0].start_count(), 1);
    assert_eq!(roles[1].start_count(), 1);
    assert_eq!(roles[2].start_count(), 0);
    assert_eq!(roles[3].start_count(), 0);
    assert_eq!(err.failed_role(), Some("Worker"));
    assert!(err.to_string().contains("bind failed"));
    assert_ne!(err.exit_code(), 0);
}

#[tokio::test]
async fn empty_sequence_launches_trivially() {
    let resolver = MockResolver::ok(());
    let provider = ContextProvider::new(resolver.clone());

    let launched = launch(&provider, StartupSequence::new()).await.unwrap();

    assert!(launched.roles.is_empty());
    assert_eq!(resolver.calls(), 1);
}

#[tokio::test]
async fn context_is_resolved_once_regardless_of_role_count() {
    let log = CallLog::new();
    let mut roles = mocks(&log);
    for role in roles.iter_mut() {
        role.expect_start().return_ok();
    }
    let resolver = MockResolver::ok(());
    let provider = ContextProvider::new(resolver.clone());

    launch(&provider, sequence(&roles)).await.unwrap();

    assert_eq!(resolver.calls(), 1);
}

#[tokio::test]
async fn resolution_failure_starts_no_role() {
    let log = CallLog::new();
    let roles = mocks(&log);
    let provider = ContextProvider::new(MockResolver::<()>::failing(
        ContextResolutionError::Misconfigured("no datasource".into()),
    ));

    let err = launch(&provider, sequence(&roles)).await.err().unwrap();

    assert!(matches!(err, LaunchError::Context(_)));
    assert!(log.entries().is_empty());
    for role in &roles {
        assert_eq!(role.start_count(), 0);
    }
}

#[tokio::test]
async fn hanging_role_blocks_everything_after_it() {
    let log = CallLog::new();
    let mut roles = mocks(&log);
    roles[0].expect_start().return_ok();
    roles[1].expect_start().hang();

    let pending = sequence(&roles).start_all(&());
    let outcome = tokio::time::timeout(Duration::from_millis(100), pending).await;

    assert!(outcome.is_err(), "sequence must not complete while a role hangs");
    assert_eq!(roles[1].start_count(), 1);
    assert_eq!(roles[2].start_count(), 0);
    assert_eq!(roles[3].start_count(), 0);
}

#[tokio::test]
async fn exit_policy_leaves_started_roles_alone() {
    let log = CallLog::new();
    let mut roles = mocks(&log);
    roles[0].expect_start().return_ok();
    roles[1].expect_start().return_ok();
    roles[2].expect_start().return_err("no log dir".into());

    let provider = ContextProvider::new(MockResolver::ok(()));
    let err = launch_with_policy(&provider, sequence(&roles), FailurePolicy::Exit)
        .await
        .err()
        .unwrap();

    assert_eq!(err.failed_role(), Some("LogService"));
    assert_eq!(roles[0].stop_count(), 0);
    assert_eq!(roles[1].stop_count(), 0);
}

#[tokio::test]
async fn stop_started_policy_unwinds_in_reverse() {
    let log = CallLog::new();
    let mut roles = mocks(&log);
    roles[0].expect_start().return_ok();
    roles[1].expect_start().return_ok();
    roles[2].expect_start().return_err("no log dir".into());

    let provider = ContextProvider::new(MockResolver::ok(()));
    let result = launch_with_policy(&provider, sequence(&roles), FailurePolicy::StopStarted).await;

    assert!(result.is_err());
    assert_eq!(
        log.entries(),
        vec![
            "start:Master",
            "start:Worker",
            "start:LogService",
            "stop:Worker",
            "stop:Master",
        ]
    );
    assert_eq!(roles[2].stop_count(), 0);
    assert_eq!(roles[3].start_count(), 0);
}
