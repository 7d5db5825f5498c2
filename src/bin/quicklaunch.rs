use std::path::PathBuf;
use std::process;

use clap::Parser;
use quicklaunch::actor::launcher::{self, Event, Launcher, Services, ViewEvent};
use quicklaunch::actor::{self, Receiver};
use quicklaunch::common::config::{Config, config_file, items_file, lock_file, socket_file};
use quicklaunch::common::log;
use quicklaunch::common::store::{self, RonTreeStore, TreeStore};
use quicklaunch::ipc::{self, IpcMessage, IpcServer};
use quicklaunch::model::document::default_tree;
use quicklaunch::sys::exec::ProcessExecutor;
use quicklaunch::sys::hotkey::{HotkeyRegistrar, NoopRegistrar};
use tracing::{info, warn};

#[derive(Parser)]
#[command(version, about = "A keyboard-driven launcher for a tree of shortcuts")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to the saved item tree (overrides default).
    #[arg(long, value_name = "PATH")]
    items: Option<PathBuf>,

    /// Check the configuration file and exit.
    #[arg(long)]
    validate: bool,

    /// Print the item tree and exit.
    #[arg(long)]
    print_tree: bool,

    /// Ask the running instance to show or hide itself, then exit.
    #[arg(long)]
    toggle: bool,
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse();

    log::init_logging();
    install_panic_hook();

    let config_path = opt.config.clone().unwrap_or_else(config_file);
    if opt.validate {
        let config = match Config::read(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e:#}");
                process::exit(1);
            }
        };
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
        } else {
            for issue in issues {
                eprintln!("{}", issue);
            }
            process::exit(1);
        }
        return;
    }

    let mut store = RonTreeStore::new(opt.items.clone().unwrap_or_else(items_file));
    if opt.print_tree {
        match store.load_tree() {
            Ok(tree) => print!("{}", tree.unwrap_or_else(default_tree).draw_tree()),
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
        return;
    }

    if opt.toggle {
        ipc::forward_toggle(&socket_file());
        return;
    }

    let lock = match ipc::claim_or_forward(&lock_file(), &socket_file()) {
        Ok(Some(lock)) => lock,
        Ok(None) => return,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let config = match Config::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            process::exit(1);
        }
    };
    for issue in config.validate() {
        warn!("{issue}");
    }

    let tree = store::load_or_default(&mut store);
    let (events_tx, events_rx) = actor::channel();
    let (view_tx, view_rx) = actor::channel();

    let ipc_tx = events_tx.clone();
    let server = IpcServer::spawn(&socket_file(), move |msg| match msg {
        IpcMessage::Toggle => ipc_tx.send(Event::Toggle),
    })
    .inspect_err(|e| warn!("Other instances will not be able to reach this one: {e}"))
    .ok();

    spawn_view_log(view_rx);

    let events_tx_for_signal = events_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || events_tx_for_signal.send(Event::Quit)) {
        warn!("Could not install Ctrl+C handler: {e}");
    }

    let services = Services {
        hotkeys: hotkey_registrar(events_tx.clone()),
        executor: Box::new(ProcessExecutor::new(config.settings.exec.clone())),
        store: Box::new(store),
    };
    let launcher = Launcher::new(config, Some(config_path), tree, services, events_tx, view_tx);

    let runtime = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Could not start runtime: {e}");
            process::exit(1);
        }
    };
    info!(lock = %lock.path().display(), "Primary instance started");
    runtime.block_on(launcher.run(events_rx));

    drop(server);
    drop(lock);
}

/// Stand-in frontend: the view is rendered elsewhere, here it is only logged.
fn spawn_view_log(mut view_rx: Receiver<ViewEvent>) {
    std::thread::spawn(move || {
        while let Some((span, event)) = view_rx.blocking_recv() {
            let _guard = span.enter();
            match event {
                ViewEvent::Show { path, items, .. } => {
                    let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
                    info!(path = %path.join(" / "), ?names, "show");
                }
                ViewEvent::Warning(message) => warn!("{message}"),
                ViewEvent::Quit => break,
                other => info!(?other, "view"),
            }
        }
    });
}

#[cfg(feature = "global-hotkey")]
fn hotkey_registrar(events_tx: launcher::Sender) -> Box<dyn HotkeyRegistrar> {
    use quicklaunch::sys::hotkey::GlobalHotkeyRegistrar;

    match GlobalHotkeyRegistrar::new(move || events_tx.send(Event::Toggle)) {
        Ok(registrar) => Box::new(registrar),
        Err(e) => {
            warn!("Global hotkey unavailable: {e}");
            Box::new(NoopRegistrar)
        }
    }
}

#[cfg(not(feature = "global-hotkey"))]
fn hotkey_registrar(_events_tx: launcher::Sender) -> Box<dyn HotkeyRegistrar> {
    Box::new(NoopRegistrar)
}

#[cfg(panic = "unwind")]
fn install_panic_hook() {
    // Abort on panic instead of propagating panics to the main thread.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        original_hook(info);
        std::process::abort();
    }));
}

#[cfg(not(panic = "unwind"))]
fn install_panic_hook() {}
