use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use cadence_runner::scripts::{builtin_registry, Waypoints};
use cadence_runner::{init_logging, CadenceConfig, ConfigLoadError, ScriptStack, TakeBreak};
use cadence_scripting_host::{ModuleBundle, PreemptionPool, PreemptionSource, ScriptHandle};

/// How long terminated scripts get to unwind before we stop waiting on them
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// How often the CLI checks whether every script has ended
const STACK_POLL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "cadence", version, about, long_about = None)]
pub struct Cli {
    /// Enables debug mode (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,

    /// Also write logs to the data directory
    #[arg(long, global = true)]
    log_file: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List the available scripts
    List,

    /// Run scripts until they all end or Ctrl-C is pressed
    Run {
        /// Scripts to start, in order. Defaults to `autostart` from the config.
        names: Vec<String>,

        /// Run without the account service
        #[arg(long)]
        offline: bool,

        /// Start every script paused
        #[arg(long)]
        paused: bool,
    },

    /// Write an example config file
    InitConfig,
}

impl Cli {
    fn log_directive(&self) -> &'static str {
        match self.debug {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

const EXAMPLE_CONFIG: &str = r#"# Cadence Configuration

# Scripts started by `cadence run` when no names are given
autostart = ["heartbeat"]

[scripting]
idle_interval_ms = 200
thread_name_prefix = "script"

[session]
offline = false
# username = "you"
# group = "vip"

[breaks]
enabled = false
every_secs = 1800
length_ms = 30000
"#;

fn create_example_config(path: &Path) -> Result<()> {
    // Never overwrite an existing config file
    if path.exists() {
        bail!(
            "Config file already exists at {}. Please edit it manually or delete it to create a new one.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, EXAMPLE_CONFIG)?;
    info!("Created example config at {}", path.display());
    eprintln!("Config file created at: {}", path.display());

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<CadenceConfig> {
    let result = match path {
        Some(path) => CadenceConfig::load_from(path),
        None => CadenceConfig::load(),
    };

    match result {
        Ok(config) => Ok(config),
        Err(ConfigLoadError::NotFound(path)) => {
            info!("No config at {}, using defaults", path.display());
            Ok(CadenceConfig::default())
        }
        Err(e) => Err(e).context("Failed to load config"),
    }
}

fn list_scripts() {
    let registry = builtin_registry();
    for name in registry.available() {
        match registry.describe(&name) {
            Some(descriptor) => println!(
                "{:<16} {:<12} {}",
                name,
                descriptor.tier(),
                descriptor.authors().join(", ")
            ),
            None => println!("{}", name),
        }
    }
}

fn default_modules() -> ModuleBundle {
    ModuleBundle::builder()
        .with(Waypoints::new(vec![(0, 0), (12, 0), (12, 12), (0, 12)]))
        .build()
}

fn build_stack(config: &CadenceConfig, offline: bool) -> Arc<ScriptStack> {
    let preemption = config.breaks.enabled.then(|| {
        let pool = PreemptionPool::new().with(TakeBreak::from_config(&config.breaks));
        Arc::new(pool) as Arc<dyn PreemptionSource>
    });

    let mut session = config.session.clone();
    session.offline |= offline;

    ScriptStack::new(
        default_modules(),
        preemption,
        session.gate(),
        session.user(),
        config.scripting.clone(),
    )
}

/// Resolve once the stack has no running scripts. Never blocks a runtime thread.
async fn wait_for_stack(stack: &ScriptStack, poll: Duration) {
    let mut ticks = tokio::time::interval(poll);
    while !stack.is_empty() {
        ticks.tick().await;
    }
}

/// Wait for every script to end, or terminate them all when `interrupt` resolves first.
///
/// Returns `false` if some scripts were still running after `grace`.
async fn supervise(
    stack: &ScriptStack,
    interrupt: impl Future<Output = ()>,
    grace: Duration,
) -> bool {
    tokio::select! {
        _ = wait_for_stack(stack, STACK_POLL) => true,
        _ = interrupt => {
            warn!("Interrupted, terminating scripts");
            stack.terminate_all();

            let stopped = tokio::time::timeout(grace, wait_for_stack(stack, STACK_POLL))
                .await
                .is_ok();
            if !stopped {
                warn!("{} script(s) did not stop in time", stack.len());
            }
            stopped
        }
    }
}

async fn run_scripts(
    config: CadenceConfig,
    names: Vec<String>,
    offline: bool,
    paused: bool,
) -> Result<()> {
    let names = if names.is_empty() {
        config.autostart.clone()
    } else {
        names
    };
    if names.is_empty() {
        bail!("No scripts given and no autostart scripts configured");
    }

    let registry = builtin_registry();
    let stack = build_stack(&config, offline);
    let mut handles: Vec<ScriptHandle> = Vec::new();

    for name in &names {
        let Some(script) = registry.create(name) else {
            error!(
                "Unknown script '{}'. Available scripts: {}",
                name,
                registry.available().join(", ")
            );
            continue;
        };

        match stack.push(script) {
            Ok(handle) => {
                if paused {
                    handle.set_paused(true);
                }
                handles.push(handle);
            }
            Err(e) => error!("Could not start {}: {}", name, e),
        }
    }

    if handles.is_empty() {
        bail!("None of the requested scripts could be started");
    }

    info!("Running {} script(s), press Ctrl-C to stop", handles.len());

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    supervise(&stack, ctrl_c, TERMINATE_GRACE).await;

    for handle in handles.into_iter().filter(ScriptHandle::is_finished) {
        if !handle.join() {
            error!("Scheduler thread for {} panicked", handle.descriptor().name());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging("cli", cli.log_file, cli.log_directive())?;

    match cli.command {
        Command::List => list_scripts(),
        Command::InitConfig => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => CadenceConfig::config_path()?,
            };
            create_example_config(&path)?;
        }
        Command::Run {
            names,
            offline,
            paused,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_scripts(config, names, offline, paused).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_runner::scripts::CountdownScript;
    use cadence_scripting_host::{Script, ScriptControl, ScriptDescriptor, Tier};
    use std::sync::mpsc;
    use std::thread;

    static STUCK: ScriptDescriptor = ScriptDescriptor::new("stuck", Tier::Free, &["tests"]);

    /// A pulse that ignores termination for a long time
    struct StuckScript;

    impl Script for StuckScript {
        fn descriptor(&self) -> Option<&'static ScriptDescriptor> {
            Some(&STUCK)
        }

        fn init(&mut self, _script: &ScriptControl) -> bool {
            true
        }

        fn pulse(&mut self, _script: &ScriptControl) -> i64 {
            thread::sleep(Duration::from_secs(30));
            -1
        }

        fn close(&mut self, _script: &ScriptControl) {}
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["cadence", "-dd", "run", "heartbeat", "countdown", "--offline"])
            .unwrap();

        assert_eq!(cli.log_directive(), "trace");
        assert_eq!(
            cli.command,
            Command::Run {
                names: vec!["heartbeat".to_string(), "countdown".to_string()],
                offline: true,
                paused: false,
            }
        );
    }

    #[test]
    fn test_parse_requires_subcommand() {
        assert!(Cli::try_parse_from(["cadence"]).is_err());
        assert!(Cli::try_parse_from(["cadence", "list"]).is_ok());
    }

    #[test]
    fn test_example_config_written_once_and_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence").join("config.toml");

        create_example_config(&path).unwrap();
        assert!(create_example_config(&path).is_err());

        let config = CadenceConfig::load_from(&path).unwrap();
        assert_eq!(config.autostart, vec!["heartbeat"]);
        assert!(!config.breaks.enabled);
    }

    #[tokio::test]
    async fn test_supervise_returns_when_scripts_end() {
        let stack = build_stack(&CadenceConfig::default(), true);
        stack.push(Box::new(CountdownScript::new(2, 5))).unwrap();

        let finished = tokio::time::timeout(
            Duration::from_secs(5),
            supervise(&stack, std::future::pending(), Duration::from_secs(1)),
        )
        .await
        .unwrap();
        assert!(finished);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_interrupted_run_with_stuck_hook_still_shuts_down() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let stack = build_stack(&CadenceConfig::default(), true);
        stack.push(Box::new(StuckScript)).unwrap();
        thread::sleep(Duration::from_millis(50));

        let interrupt = async { tokio::time::sleep(Duration::from_millis(100)).await };
        let stopped = runtime.block_on(supervise(&stack, interrupt, Duration::from_millis(200)));
        assert!(!stopped);
        assert_eq!(stack.len(), 1);

        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            drop(runtime);
            let _ = done_tx.send(());
        });
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(load_config(Some(&path)).unwrap(), CadenceConfig::default());
    }
}
