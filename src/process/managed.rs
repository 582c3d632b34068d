//! Externally spawned OS process with a readiness contract

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::probe;
use crate::{Error, Result};

/// Lifecycle of a managed process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Starting,
    Ready,
    Stopped,
}

/// Command line of a managed process
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl ProcessCommand {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// One spawned process bound to a single host:port.
///
/// A stopped instance is never restarted; build a new one instead.
#[derive(Debug)]
pub struct ManagedProcess {
    name: String,
    command: ProcessCommand,
    host: String,
    port: u16,
    readiness_url: String,
    ignore_http_errors: bool,
    startup_timeout: Duration,
    state: ProcessState,
    child: Option<Child>,
}

impl ManagedProcess {
    pub fn new<N, H, U>(name: N, command: ProcessCommand, host: H, port: u16, readiness_url: U) -> Self
    where
        N: Into<String>,
        H: Into<String>,
        U: Into<String>,
    {
        Self {
            name: name.into(),
            command,
            host: host.into(),
            port,
            readiness_url: readiness_url.into(),
            ignore_http_errors: false,
            startup_timeout: Duration::from_secs(30),
            state: ProcessState::NotStarted,
            child: None,
        }
    }

    /// Treat any HTTP response (including 4xx/5xx) as ready
    pub fn ignore_http_errors(mut self, ignore: bool) -> Self {
        self.ignore_http_errors = ignore;
        self
    }

    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn command(&self) -> &ProcessCommand {
        &self.command
    }

    /// OS process id while running
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Spawn the process and wait until it answers.
    ///
    /// No-op if this instance already runs. On failure the instance goes back to
    /// `NotStarted` and the child is killed.
    pub async fn start(&mut self) -> Result<()> {
        let running = self.is_running();
        match self.state {
            ProcessState::Ready if running => return Ok(()),
            ProcessState::Ready => {
                // The child died on its own; this instance is done
                warn!("{} exited while marked ready", self.name);
                self.child = None;
                self.state = ProcessState::Stopped;
                return Err(Error::internal(format!("{} exited and cannot be restarted", self.name)));
            }
            ProcessState::Stopped => {
                return Err(Error::internal(format!("{} was stopped and cannot be restarted", self.name)))
            }
            _ => {}
        }

        probe::check_port_available(&self.host, self.port).await?;

        self.state = ProcessState::Starting;
        info!(
            "Starting {}: {} {}",
            self.name,
            self.command.program.display(),
            self.command.args.join(" ")
        );

        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .envs(&self.command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.command.working_dir {
            command.current_dir(dir);
        }

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.state = ProcessState::NotStarted;
                return Err(Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to spawn {} ({}): {}", self.name, self.command.program.display(), e),
                )));
            }
        };
        let child = self.child.insert(child);

        if let Err(e) = probe::wait_until_ready(
            child,
            &self.readiness_url,
            self.ignore_http_errors,
            self.startup_timeout,
        )
        .await
        {
            warn!("{} failed to start: {}", self.name, e);
            self.kill().await;
            self.state = ProcessState::NotStarted;
            return Err(e);
        }

        self.state = ProcessState::Ready;
        info!("{} ready on {}:{} (pid {:?})", self.name, self.host, self.port, self.pid());
        Ok(())
    }

    /// Whether the OS process is still alive
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Stop the process; idempotent
    pub async fn stop(&mut self) -> Result<()> {
        if self.child.is_some() {
            info!("Stopping {} on {}:{}", self.name, self.host, self.port);
            self.kill().await;
        }
        if self.state != ProcessState::NotStarted {
            self.state = ProcessState::Stopped;
        }
        Ok(())
    }

    async fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                debug!("{} already gone: {}", self.name, e);
            }
        }
    }
}
