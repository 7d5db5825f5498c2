//! Starting the programs behind launchable items.

use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::{debug, warn};

use crate::common::config::ExecSettings;
use crate::common::util::{shell_line, split_args};
use crate::model::item::{Item, ItemKind, KindTag, LaunchSpec};
use crate::sys::hotkey::Modifiers;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("\"{0}\" has nothing to run")]
    EmptyTarget(String),
    #[error("{0} items cannot be run here")]
    Unsupported(KindTag),
}

/// A per-activation override of how an item's launch spec is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAs {
    /// Start the program directly.
    App,
    /// Hand the line to the shell.
    Command,
}

impl RunAs {
    /// Control forces a direct start, Shift forces the shell. Control wins
    /// when both are held.
    pub fn from_modifiers(modifiers: Modifiers) -> Option<RunAs> {
        if modifiers.contains(Modifiers::CONTROL) {
            Some(RunAs::App)
        } else if modifiers.contains(Modifiers::SHIFT) {
            Some(RunAs::Command)
        } else {
            None
        }
    }
}

/// A started program. Dropping it does not wait for the process.
#[derive(Debug, Default)]
pub struct Launch {
    child: Option<Child>,
}

impl Launch {
    pub fn detached() -> Self { Launch { child: None } }

    pub fn id(&self) -> Option<u32> { self.child.as_ref().map(Child::id) }

    /// Runs `f` once the process exits, on a helper thread. Without a process
    /// to watch `f` runs right away with `None`.
    pub fn on_exit(self, f: impl FnOnce(Option<ExitStatus>) + Send + 'static) {
        let Some(mut child) = self.child else {
            f(None);
            return;
        };
        let pid = child.id();
        let spawned = std::thread::Builder::new().name("reaper".to_string()).spawn(move || {
            let status =
                child.wait().inspect_err(|e| warn!("Waiting for process {pid} failed: {e}")).ok();
            f(status)
        });
        if let Err(e) = spawned {
            warn!("Could not start reaper thread: {e}");
        }
    }
}

pub trait Executor {
    fn execute(&mut self, item: &Item, run_as: Option<RunAs>) -> Result<Launch, ExecError>;

    /// Called after the settings were edited.
    fn update_settings(&mut self, _settings: &ExecSettings) {}
}

/// Runs items as child processes of the launcher.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    settings: ExecSettings,
}

impl ProcessExecutor {
    pub fn new(settings: ExecSettings) -> Self { ProcessExecutor { settings } }

    /// The command line that `item` would be started with. The first element
    /// is the program.
    pub fn command_line(&self, item: &Item, run_as: Option<RunAs>) -> Result<Vec<String>, ExecError> {
        match &item.kind {
            ItemKind::App(spec) | ItemKind::Command(spec) => {
                if spec.path.trim().is_empty() {
                    return Err(ExecError::EmptyTarget(item.name.clone()));
                }
                let via_shell = match run_as {
                    Some(RunAs::App) => false,
                    Some(RunAs::Command) => true,
                    None => matches!(item.kind, ItemKind::Command(_)) || spec.use_shell,
                };
                Ok(if via_shell { self.shell_command(spec) } else { direct_command(spec) })
            }
            ItemKind::Task { task_name } => {
                if task_name.trim().is_empty() {
                    return Err(ExecError::EmptyTarget(item.name.clone()));
                }
                let mut line = self.settings.task_runner.clone();
                line.push(task_name.clone());
                Ok(line)
            }
            other => Err(ExecError::Unsupported(other.tag())),
        }
    }

    fn shell_command(&self, spec: &LaunchSpec) -> Vec<String> {
        let mut line = self.settings.shell.clone();
        line.push(shell_line(&spec.path, &spec.args));
        line
    }
}

fn direct_command(spec: &LaunchSpec) -> Vec<String> {
    let mut line = vec![spec.path.clone()];
    line.extend(split_args(&spec.args));
    line
}

impl Executor for ProcessExecutor {
    fn execute(&mut self, item: &Item, run_as: Option<RunAs>) -> Result<Launch, ExecError> {
        let line = self.command_line(item, run_as)?;
        let Some((program, args)) = line.split_first() else {
            return Err(ExecError::EmptyTarget(item.name.clone()));
        };

        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());
        if let Some(spec) = item.kind.launch_spec() {
            if let Some(dir) = spec.working_dir.as_deref().filter(|d| !d.is_empty()) {
                command.current_dir(dir);
            }
            if spec.no_window {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
            if spec.run_as_admin {
                warn!(item = %item.name, "Elevated launch is not supported; starting normally");
            }
        }

        let child = command
            .spawn()
            .map_err(|source| ExecError::Spawn { program: program.clone(), source })?;
        debug!(item = %item.name, pid = child.id(), ?line, "Started");
        Ok(Launch { child: Some(child) })
    }

    fn update_settings(&mut self, settings: &ExecSettings) { self.settings = settings.clone(); }
}
