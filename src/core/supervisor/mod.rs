//! Run supervisor
//!
//! Drives one complete run over an open line:
//! probe → bring-up sequence → mode switch → nodes → wait → teardown.
//!
//! Nodes are only ever created after the mode switch succeeded, and the
//! termination signals are blocked before the first node exists, so every
//! created node is removed again before the line is closed.

mod process;

pub use process::ProcessLifecycle;

use crate::config::Config;
use crate::core::at::{ExchangeSettings, Probe};
use crate::core::nodes::{ClassRegistry, NodeFs, NodeManager, NodeSet, SystemFs};
use crate::core::profile;
use crate::core::transport::{LineTransport, Multiplexer, MuxParams};
use crate::error::Error;
use thiserror::Error;

/// Lifecycle error types
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Signal mask could not be changed
    #[error("Cannot block termination signals: {0}")]
    Signals(#[source] nix::Error),

    /// Fork to background failed
    #[error("Cannot daemonize: {0}")]
    Daemonize(#[source] nix::Error),

    /// `sigwait` failed
    #[error("Waiting for termination signal failed: {0}")]
    Wait(#[source] nix::Error),
}

/// Process hooks used by the supervisor
pub trait Lifecycle {
    /// Prepare for shutdown handling; called before any node is created
    fn arm(&mut self) -> Result<(), LifecycleError>;

    /// Detach from the controlling terminal
    fn detach(&mut self) -> Result<(), LifecycleError>;

    /// Block until the process is asked to terminate
    fn wait_for_shutdown(&mut self) -> Result<(), LifecycleError>;
}

/// What a completed run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Probe try that got an answer
    pub probe_attempt: u32,
    /// Parameters handed to the line discipline
    pub params: MuxParams,
    /// Nodes created, if node handling was enabled
    pub nodes: Option<NodeSet>,
}

/// Proof that the line is in mux mode
struct MuxActive(());

/// Owns the line for the whole run
pub struct Supervisor<'c, L, F = SystemFs> {
    config: &'c Config,
    line: L,
    registry: ClassRegistry,
    nodes: NodeManager<F>,
    probe: Probe,
    exchange: ExchangeSettings,
}

impl<'c, L> Supervisor<'c, L, SystemFs>
where
    L: LineTransport + Multiplexer,
{
    /// Supervisor with the real registry and filesystem
    pub fn new(config: &'c Config, line: L) -> Self {
        Self {
            config,
            line,
            registry: ClassRegistry::default(),
            nodes: NodeManager::new(SystemFs),
            probe: Probe::default(),
            exchange: ExchangeSettings::default(),
        }
    }
}

impl<'c, L, F> Supervisor<'c, L, F>
where
    L: LineTransport + Multiplexer,
    F: NodeFs,
{
    /// Use another device registry
    #[must_use]
    pub fn with_registry(mut self, registry: ClassRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Use another node filesystem
    pub fn with_node_fs<G: NodeFs>(self, fs: G) -> Supervisor<'c, L, G> {
        Supervisor {
            config: self.config,
            line: self.line,
            registry: self.registry,
            nodes: NodeManager::new(fs),
            probe: self.probe,
            exchange: self.exchange,
        }
    }

    /// Override probe tries and pacing
    #[must_use]
    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    /// Override exchange timing
    #[must_use]
    pub fn with_exchange_settings(mut self, settings: ExchangeSettings) -> Self {
        self.exchange = settings;
        self
    }

    /// Run to completion; returns once the process was asked to stop and
    /// everything was torn down.
    pub fn run<C: Lifecycle>(mut self, lifecycle: &mut C) -> Result<RunReport, Error> {
        let (probe_attempt, params, mux) = self.bring_up()?;
        lifecycle.arm()?;

        let nodes = match self.publish_nodes(&mux) {
            Ok(nodes) => nodes,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        let waited = Self::park(self.config, lifecycle);

        if let Some(set) = &nodes {
            self.nodes.teardown(set);
        }
        self.close();
        waited?;

        Ok(RunReport {
            probe_attempt,
            params,
            nodes,
        })
    }

    fn bring_up(&mut self) -> Result<(u32, MuxParams, MuxActive), Error> {
        let attempt = self.probe.run(&mut self.line, &self.exchange)?;
        tracing::info!("Modem answered");

        let params = profile::sequence(&mut self.line, self.config.profile, self.config, &self.exchange)?;

        self.line.enter_mux_mode(&params)?;
        tracing::info!("Line discipline set, mtu {}", params.mtu);

        Ok((attempt, params, MuxActive(())))
    }

    fn publish_nodes(&self, _mux: &MuxActive) -> Result<Option<NodeSet>, Error> {
        let count = u32::from(self.config.nodes);
        if count == 0 {
            return Ok(None);
        }

        let base = &self.config.base;
        if self.config.remove_stale_nodes {
            self.nodes.remove_nodes(base, count);
        }

        let major = self.registry.resolve_class(&self.config.driver)?;
        let set = self.nodes.create_nodes(major, base, count);

        if set.created_count() == 0 {
            tracing::warn!("No nodes have been created.");
        } else if !set.is_complete() {
            tracing::warn!(
                "Cannot create all nodes, only {} of {} have been created.",
                set.created_count(),
                count
            );
        } else {
            tracing::info!("Created {} nodes {}1..{}{}", count, base, base, count);
        }

        Ok(Some(set))
    }

    fn park<C: Lifecycle>(config: &Config, lifecycle: &mut C) -> Result<(), Error> {
        if config.daemonize {
            lifecycle.detach()?;
        }
        lifecycle.wait_for_shutdown()?;
        Ok(())
    }

    fn close(self) {
        tracing::debug!("Closing {}", self.config.device.display());
        drop(self.line);
    }
}
