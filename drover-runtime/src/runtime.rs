//! Agent process entrypoint: CLI args, interrupt handling, control server.
use crate::error::RuntimeError;
use crate::server::serve;
use clap::Parser;
use drover::{Agent, DatabaseClient};
use drover_core::{AgentConfig, DEFAULT_AGENT_PORT};
use std::path::PathBuf;
use std::sync::Arc;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

#[derive(Parser, Debug)]
#[command(version)]
struct AgentCli {
    #[arg(short, long, default_value_t = DEFAULT_AGENT_PORT)]
    port: u16,

    #[arg(short, long)]
    name: Option<String>,

    /// JSON agent configuration; can also be pushed later via POST /config.
    #[arg(short, long)]
    config_file: Option<PathBuf>,
}

/// Long-running agent process wrapping an [`Agent`].
///
/// # Example
///
/// ```ignore
/// use drover_runtime::AgentRuntime;
///
/// #[tokio::main]
/// async fn main() {
///     let client = my_database_client();
///     AgentRuntime::new()
///         .with_args()
///         .unwrap()
///         .run(client)
///         .await
///         .unwrap();
/// }
/// ```
pub struct AgentRuntime {
    port: u16,
    name: Option<String>,
    config: AgentConfig,
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRuntime {
    pub fn new() -> Self {
        Self {
            port: DEFAULT_AGENT_PORT,
            name: None,
            config: AgentConfig::default(),
        }
    }

    /// Applies the standard CLI arguments: `-p`/`--port`, `-n`/`--name`,
    /// `-c`/`--config-file`.
    pub fn with_args(mut self) -> Result<Self, RuntimeError> {
        let args = AgentCli::parse();
        self.port = args.port;
        self.name = args.name;
        if let Some(path) = args.config_file {
            let file = std::fs::File::open(path)?;
            self.config = serde_json::from_reader(file)?;
        }
        Ok(self)
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[instrument(name = "agent", skip_all, fields(port = self.port))]
    pub async fn run(self, client: Arc<dyn DatabaseClient>) -> Result<(), RuntimeError> {
        let _ = tracing_subscriber::fmt().try_init();

        if let Some(name) = &self.name {
            info!("starting agent `{name}`");
        }
        let agent = Arc::new(Agent::new(self.config, client)?);

        tokio::spawn(interrupt_task(agent.clone()));
        serve(agent, self.port).await
    }
}

/// Translates process interrupts into exactly one cancel. Repeated
/// interrupts are logged and ignored; in-flight operations still complete.
async fn interrupt_task(agent: Arc<Agent>) {
    if tokio::signal::ctrl_c().await.is_err() {
        error!("interrupt handler unavailable");
        return;
    }
    info!("interrupt received, cancelling workloads");
    agent.cancel();
    loop {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("already cancelling");
    }
}
