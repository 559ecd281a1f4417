//! The simulator instance: owns the socket, the queue, the deferred store and
//! the statistics for its whole lifetime, and drives the three actors.
//!
//! - `udpsim-reactor`: single-threaded tokio runtime running the ingress and
//!   egress tasks
//! - `udpsim-processor`: blocking thread running [`Processor`]
//! - the caller, polling [`Simulator::stats`]

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use opentelemetry::KeyValue;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};
use udpsim_config::NetworkConfig;
use udpsim_core::events::{PacketInfo, PendingQueue};
use udpsim_core::{NetworkStats, StatsSnapshot};
use udpsim_telemetry::{EventLogger, MetricsRecorder};

use crate::deferred::DeferredStore;
use crate::egress::{self, EgressTask};
use crate::error::SimulatorError;
use crate::impairment::ImpairmentEngine;
use crate::ingress::Ingress;
use crate::processor::Processor;
use crate::resolver::{resolve_endpoints, Endpoints};
use crate::shared::{Pipeline, SharedConfig};

const REACTOR_THREAD: &str = "udpsim-reactor";
const PROCESSOR_THREAD: &str = "udpsim-processor";

struct Running {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    queue: Arc<PendingQueue<PacketInfo>>,
    reactor: JoinHandle<()>,
    processor: JoinHandle<()>,
}

pub struct Simulator {
    endpoints: Endpoints,
    pipeline: Pipeline,
    deferred: Arc<DeferredStore>,
    running: Option<Running>,
}

impl Simulator {
    /// Validates `config` and resolves both endpoints. Nothing is bound yet.
    pub fn new(config: NetworkConfig) -> Result<Self, SimulatorError> {
        Self::with_recorders(config, Arc::new(NetworkStats::new()), MetricsRecorder::new()?)
    }

    /// Like [`Simulator::new`], recording into caller-provided statistics and metrics.
    pub fn with_recorders(
        config: NetworkConfig,
        stats: Arc<NetworkStats>,
        metrics: MetricsRecorder,
    ) -> Result<Self, SimulatorError> {
        config.validate_all()?;
        let endpoints = resolve_endpoints(&config)?;

        Ok(Self {
            endpoints,
            pipeline: Pipeline {
                config: Arc::new(SharedConfig::new(config)),
                stats,
                metrics,
            },
            deferred: Arc::new(DeferredStore::new()),
            running: None,
        })
    }

    /// Binds the listening socket and spawns the reactor and processing threads.
    #[instrument(level = "info", name = "simulator_start", skip(self), fields(listen = %self.endpoints.listen))]
    pub fn start(&mut self) -> Result<SocketAddr, SimulatorError> {
        if self.running.is_some() {
            return Err(SimulatorError::AlreadyRunning);
        }

        let listen = self.endpoints.listen;
        let std_socket = std::net::UdpSocket::bind(listen)
            .map_err(|source| SimulatorError::Bind { addr: listen, source })?;
        std_socket.set_nonblocking(true)?;
        let local_addr = std_socket.local_addr()?;

        let engine = ImpairmentEngine::new(Arc::clone(&self.pipeline.config))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SimulatorError::Runtime(e.to_string()))?;
        let socket = {
            let _guard = runtime.enter();
            Arc::new(UdpSocket::from_std(std_socket)?)
        };

        let queue = Arc::new(PendingQueue::new());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (egress_sender, egress_rx) = egress::channel(self.pipeline.clone());
        let ingress = Ingress::new(
            Arc::clone(&socket),
            Arc::clone(&queue),
            self.endpoints.target,
            self.pipeline.clone(),
        );
        let egress_task = EgressTask::new(socket, egress_rx, self.pipeline.clone());
        let ingress_shutdown = shutdown_rx.clone();

        let reactor = thread::Builder::new()
            .name(REACTOR_THREAD.into())
            .spawn(move || {
                runtime.block_on(async move {
                    let ingress = tokio::spawn(ingress.run(ingress_shutdown));
                    let egress = tokio::spawn(egress_task.run(shutdown_rx));
                    for joined in [ingress.await, egress.await] {
                        if let Err(e) = joined {
                            error!("Reactor task failed: {e}");
                        }
                    }
                });
            })
            .map_err(|e| SimulatorError::Runtime(e.to_string()))?;

        let processor = Processor::new(
            Arc::clone(&queue),
            Arc::clone(&self.deferred),
            engine,
            egress_sender,
            self.pipeline.clone(),
        );
        let processor = match thread::Builder::new()
            .name(PROCESSOR_THREAD.into())
            .spawn(move || processor.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                let _ = shutdown.send(true);
                let _ = reactor.join();
                return Err(SimulatorError::Runtime(e.to_string()));
            }
        };

        self.running = Some(Running {
            local_addr,
            shutdown,
            queue,
            reactor,
            processor,
        });

        info!(%local_addr, target = %self.endpoints.target, "Simulator started");
        EventLogger::log_event(
            "started",
            &[
                KeyValue::new("listen", local_addr.to_string()),
                KeyValue::new("target", self.endpoints.target.to_string()),
            ],
        );
        Ok(local_addr)
    }

    /// Signals shutdown, joins both threads, and prints the final summary when
    /// statistics are enabled. Calling it again is a no-op.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.shutdown.send(true);
        running.queue.close();
        if running.processor.join().is_err() {
            error!("Processing thread panicked");
        }
        if running.reactor.join().is_err() {
            error!("Reactor thread panicked");
        }

        let snapshot = self.stats();
        info!(
            sent = snapshot.packets_sent,
            received = snapshot.packets_received,
            "Simulator stopped"
        );
        EventLogger::log_event(
            "stopped",
            &[
                KeyValue::new("listen", running.local_addr.to_string()),
                KeyValue::new("packets_sent", snapshot.packets_sent as i64),
                KeyValue::new("packets_dropped", snapshot.packets_dropped as i64),
            ],
        );
        if self.pipeline.config.load().enable_statistics {
            println!("{snapshot}");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Address the listening socket is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    pub fn target_addr(&self) -> SocketAddr {
        self.endpoints.target
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.pipeline.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.pipeline.stats.reset();
    }

    /// Swaps the active configuration for subsequent impairment decisions.
    /// The endpoints and the seed are fixed at construction; the stored
    /// configuration keeps the ones in use.
    pub fn update_config(&self, mut config: NetworkConfig) -> Result<(), SimulatorError> {
        config.validate_all()?;

        let current = self.pipeline.config.load();
        let endpoints_changed = current.listen_host != config.listen_host
            || current.listen_port != config.listen_port
            || current.target_host != config.target_host
            || current.target_port != config.target_port;
        if endpoints_changed {
            warn!("Endpoint changes take effect only for a new simulator instance");
        }
        if current.seed != config.seed {
            warn!("Seed changes take effect only for a new simulator instance");
        }
        config.listen_host.clone_from(&current.listen_host);
        config.listen_port = current.listen_port;
        config.target_host.clone_from(&current.target_host);
        config.target_port = current.target_port;
        config.seed = current.seed;

        EventLogger::log_event(
            "config_updated",
            &[
                KeyValue::new("packet_loss_rate", config.packet_loss_rate),
                KeyValue::new("delay_rate", config.delay_rate),
                KeyValue::new("jitter_rate", config.jitter_rate),
                KeyValue::new("reordering_rate", config.reordering_rate),
            ],
        );
        self.pipeline.config.replace(config);
        Ok(())
    }

    pub fn config(&self) -> Arc<NetworkConfig> {
        self.pipeline.config.load()
    }

    /// Shared statistics aggregator.
    pub fn stats_handle(&self) -> Arc<NetworkStats> {
        Arc::clone(&self.pipeline.stats)
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.pipeline.metrics
    }

    /// Packets currently parked in the deferred store.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.stop();
    }
}
