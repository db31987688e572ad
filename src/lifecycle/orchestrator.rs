//! Startup sequencing and supervision of the trigger service.
//!
//! # Phases
//! ```text
//! Idle → WaitingForSandbox → StartingService → WaitingForService
//!      → Registering → Running → ShuttingDown → Terminated
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error ends the run
//! - Once the child is spawned, every exit path requests its termination
//!   exactly once before the run returns
//! - After spawn, each phase also watches the child and the shutdown signal

use std::convert::Infallible;
use std::future::Future;
use std::process::ExitStatus;

use tokio::sync::watch;
use tokio::time;

use crate::config::LauncherConfig;
use crate::error::LauncherResult;
use crate::lifecycle::Shutdown;
use crate::net::{Endpoint, PortWaiter};
use crate::package::resolve_package_id;
use crate::process::{self, exit_code, ChildHandle, CommandSpec, Termination};
use crate::registration::{RegisteredTrigger, Registration, RegistrationClient};

/// Where the orchestrator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    WaitingForSandbox,
    StartingService,
    WaitingForService,
    Registering,
    Running,
    ShuttingDown,
    Terminated,
}

/// Why a run ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operator asked to stop.
    Interrupted,
    /// The trigger service exited while it was expected to keep running.
    ChildExited { code: i32, stderr: String },
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: Outcome,
    /// Triggers registered before the run ended.
    pub registered: Vec<RegisteredTrigger>,
    /// Result of the termination request, `None` if no child was started.
    pub termination: Option<Termination>,
}

impl RunReport {
    /// Process exit code for this run.
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            Outcome::Interrupted => 0,
            Outcome::ChildExited { code, .. } => *code,
        }
    }
}

/// What ended a supervised wait.
enum Step<T> {
    Done(T),
    Interrupted,
    Exited(LauncherResult<ExitStatus>),
}

/// Drives one launcher run.
pub struct Orchestrator {
    config: LauncherConfig,
    shutdown: Shutdown,
    phase: watch::Sender<Phase>,
}

impl Orchestrator {
    pub fn new(config: LauncherConfig, shutdown: Shutdown) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            config,
            shutdown,
            phase,
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Receiver that observes every phase change.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: Phase) {
        let previous = self.phase.send_replace(phase);
        tracing::debug!(from = ?previous, to = ?phase, "Phase transition");
    }

    /// Run the whole sequence until the child exits or shutdown is requested.
    pub async fn run(&self) -> LauncherResult<RunReport> {
        let timeouts = &self.config.timeouts;

        self.enter(Phase::WaitingForSandbox);
        let sandbox = PortWaiter::from_config(self.config.sandbox_host.clone(), timeouts);
        let waited = tokio::select! {
            biased;
            _ = self.shutdown.wait() => None,
            result = sandbox.wait_for_port(self.config.sandbox_port, timeouts.sandbox()) => Some(result),
        };
        match waited {
            None => {
                tracing::info!("Interrupted before the trigger service was started");
                self.enter(Phase::Terminated);
                return Ok(RunReport {
                    outcome: Outcome::Interrupted,
                    registered: Vec::new(),
                    termination: None,
                });
            }
            Some(Err(e)) => {
                self.enter(Phase::Terminated);
                return Err(e);
            }
            Some(Ok(_)) => {}
        }

        self.enter(Phase::StartingService);
        let mut child = match process::start(&CommandSpec::trigger_service(&self.config)) {
            Ok(child) => child,
            Err(e) => {
                self.enter(Phase::Terminated);
                return Err(e);
            }
        };

        let mut registered = Vec::new();
        let result = self.supervise(&mut child, &mut registered).await;

        self.enter(Phase::ShuttingDown);
        let termination = child.terminate();
        child.reap(timeouts.shutdown_grace()).await;
        self.enter(Phase::Terminated);

        let outcome = result?;
        tracing::info!(outcome = outcome_name(&outcome), "Launcher stopped");
        Ok(RunReport {
            outcome,
            registered,
            termination: Some(termination),
        })
    }

    /// Everything that happens while the child is alive.
    async fn supervise(
        &self,
        child: &mut ChildHandle,
        registered: &mut Vec<RegisteredTrigger>,
    ) -> LauncherResult<Outcome> {
        let timeouts = &self.config.timeouts;

        self.enter(Phase::WaitingForService);
        let service = PortWaiter::from_config(self.config.service_host.clone(), timeouts);
        let wait = service.wait_for_port(self.config.service_port, timeouts.service());
        match self.guarded(child, wait).await {
            Step::Done(result) => {
                result?;
            }
            Step::Interrupted => return Ok(self.interrupted()),
            Step::Exited(status) => return self.child_exited(child, status).await,
        }

        self.enter(Phase::Registering);
        match self.guarded(child, self.register()).await {
            Step::Done(result) => registered.extend(result?),
            Step::Interrupted => return Ok(self.interrupted()),
            Step::Exited(status) => return self.child_exited(child, status).await,
        }

        match self.guarded(child, time::sleep(timeouts.settle())).await {
            Step::Done(()) => {}
            Step::Interrupted => return Ok(self.interrupted()),
            Step::Exited(status) => return self.child_exited(child, status).await,
        }

        self.enter(Phase::Running);
        println!("\nPress Ctrl+C to stop...");
        match self.guarded(child, std::future::pending::<Infallible>()).await {
            Step::Done(never) => match never {},
            Step::Interrupted => Ok(self.interrupted()),
            Step::Exited(status) => self.child_exited(child, status).await,
        }
    }

    /// Resolve the package id and register every configured trigger.
    async fn register(&self) -> LauncherResult<Vec<RegisteredTrigger>> {
        let package_id = resolve_package_id(&self.config).await?;
        let endpoint = Endpoint::new(self.config.service_host.clone(), self.config.service_port)?;
        let client = RegistrationClient::new(&endpoint, self.config.timeouts.request())?;

        let registrations = Registration::from_config(&self.config.triggers, &package_id);
        let registered = client.register_all(&registrations).await?;

        tracing::info!(count = registered.len(), "All triggers registered");
        Ok(registered)
    }

    /// Run `fut` unless the child exits or shutdown is requested first.
    async fn guarded<T>(&self, child: &mut ChildHandle, fut: impl Future<Output = T>) -> Step<T> {
        tokio::select! {
            biased;
            _ = self.shutdown.wait() => Step::Interrupted,
            status = child.wait() => Step::Exited(status),
            value = fut => Step::Done(value),
        }
    }

    fn interrupted(&self) -> Outcome {
        tracing::info!(phase = ?self.phase(), "Interrupt received, shutting down");
        Outcome::Interrupted
    }

    async fn child_exited(
        &self,
        child: &mut ChildHandle,
        status: LauncherResult<ExitStatus>,
    ) -> LauncherResult<Outcome> {
        let status = status?;
        if self.shutdown.is_triggered() {
            return Ok(self.interrupted());
        }

        let code = exit_code(&status);
        let stderr = child.stderr_output().await;
        tracing::error!(
            program = %child.program(),
            pid = ?child.pid(),
            code,
            phase = ?self.phase(),
            "Trigger service died unexpectedly:\n{}",
            stderr
        );
        Ok(Outcome::ChildExited { code, stderr })
    }
}

fn outcome_name(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Interrupted => "interrupted",
        Outcome::ChildExited { .. } => "child_exited",
    }
}
