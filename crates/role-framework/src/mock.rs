//! # Mock Roles & Resolvers
//!
//! Test doubles for the orchestration layer. They let you check ordering,
//! fail-fast behavior, and single resolution without binding a single socket.
//!
//! ## When to use Mocks vs Real Roles
//!
//! | Feature | MockRole | Real Role |
//! |---------|----------|-----------|
//! | **Speed** | Instant | Binds sockets, spawns tasks |
//! | **Determinism** | 100% Deterministic | Subject to port availability |
//! | **Error Injection** | Easy (`return_err`, `hang`) | Hard (needs a real conflict) |
//! | **Use Case** | Testing the sequencer and the owner | Testing a role itself |
//!
//! ## Usage
//!
//! A [`MockRole`] is the test-side controller. Queue expectations on it, insert
//! [`MockRole::role`] into a sequence, then inspect call counts and call
//! [`MockRole::verify`].
//!
//! ```rust
//! use role_framework::mock::{CallLog, MockRole};
//! use role_framework::StartupSequence;
//!
//! #[tokio::main]
//! async fn main() {
//!     let log = CallLog::new();
//!     let mut master = MockRole::with_log("Master", log.clone());
//!     let mut worker = MockRole::with_log("Worker", log.clone());
//!     master.expect_start().return_ok();
//!     worker.expect_start().return_err("bind failed".into());
//!
//!     let result = StartupSequence::<()>::new()
//!         .with_role(master.role())
//!         .with_role(worker.role())
//!         .start_all(&())
//!         .await;
//!
//!     assert_eq!(result.unwrap_err().role, "Worker");
//!     assert_eq!(log.entries(), vec!["start:Master", "start:Worker"]);
//!     master.verify();
//!     worker.verify();
//! }
//! ```

use crate::context::ContextResolver;
use crate::error::{ContextResolutionError, RoleError};
use crate::role::Role;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// CALL LOG
// =============================================================================

/// Shared, ordered record of `start:<name>` / `stop:<name>` calls across roles.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }
}

// =============================================================================
// MOCK ROLE
// =============================================================================

enum StartExpectation {
    Ok,
    Err(RoleError),
    Hang,
}

#[derive(Default)]
struct Counters {
    starts: AtomicUsize,
    stops: AtomicUsize,
}

/// Test-side controller for a mocked role.
pub struct MockRole {
    name: String,
    log: CallLog,
    expectations: Arc<Mutex<VecDeque<StartExpectation>>>,
    counters: Arc<Counters>,
}

/// The [`Role`] handed to the code under test. Shares state with its [`MockRole`].
pub struct StubRole {
    name: String,
    log: CallLog,
    expectations: Arc<Mutex<VecDeque<StartExpectation>>>,
    counters: Arc<Counters>,
}

impl MockRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_log(name, CallLog::new())
    }

    /// Create a mock that records into a log shared with other mocks.
    pub fn with_log(name: impl Into<String>, log: CallLog) -> Self {
        Self {
            name: name.into(),
            log,
            expectations: Arc::new(Mutex::new(VecDeque::new())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Returns the role for insertion into a sequence.
    pub fn role(&self) -> StubRole {
        StubRole {
            name: self.name.clone(),
            log: self.log.clone(),
            expectations: self.expectations.clone(),
            counters: self.counters.clone(),
        }
    }

    /// Expects one `start` call.
    pub fn expect_start(&mut self) -> StartExpectationBuilder {
        StartExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    pub fn start_count(&self) -> usize {
        self.counters.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.counters.stops.load(Ordering::SeqCst)
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!(
                "Not all expectations were met for {}. {} remaining",
                self.name,
                exps.len()
            );
        }
    }
}

/// Builder for `start` expectations.
pub struct StartExpectationBuilder {
    expectations: Arc<Mutex<VecDeque<StartExpectation>>>,
}

impl StartExpectationBuilder {
    /// `start` succeeds.
    pub fn return_ok(self) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(StartExpectation::Ok);
    }

    /// `start` fails with the given error.
    pub fn return_err(self, error: RoleError) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(StartExpectation::Err(error));
    }

    /// `start` never returns.
    pub fn hang(self) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(StartExpectation::Hang);
    }
}

#[async_trait]
impl<C: Send + Sync> Role<C> for StubRole {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self, _ctx: &C) -> Result<(), RoleError> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("start:{}", self.name));

        let expectation = self.expectations.lock().unwrap().pop_front();
        match expectation {
            Some(StartExpectation::Ok) => Ok(()),
            Some(StartExpectation::Err(e)) => Err(e),
            Some(StartExpectation::Hang) => std::future::pending().await,
            None => panic!("Unexpected start call on {}", self.name),
        }
    }

    async fn stop(&mut self) {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("stop:{}", self.name));
    }
}

// =============================================================================
// MOCK RESOLVER
// =============================================================================

/// A [`ContextResolver`] that returns a fixed result and counts its calls.
///
/// Clones share the call counter, so keep one clone in the test and hand the other
/// to the provider.
#[derive(Clone)]
pub struct MockResolver<C> {
    result: Result<C, ContextResolutionError>,
    calls: Arc<AtomicUsize>,
}

impl<C> MockResolver<C> {
    pub fn ok(context: C) -> Self {
        Self {
            result: Ok(context),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(error: ContextResolutionError) -> Self {
        Self {
            result: Err(error),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C: Clone + Send + Sync + 'static> ContextResolver for MockResolver<C> {
    type Context = C;

    async fn resolve(&self) -> Result<C, ContextResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}
