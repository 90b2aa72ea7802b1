//! Entry point for **wmbind**.
//!
//! ```text
//! wmbind [run]              register hotkeys and drive yabai
//! wmbind generate [path|-]  print (or write) the bindings as i3 config text
//! wmbind validate           check chords and that every exec'd program exists
//! wmbind func <key>         run one registered function and exit
//! ```
//!
//! In daemon mode every binding gets its own listener thread, a poller keeps
//! the status title fresh and a Unix socket accepts command sequences from
//! scripts.  The main thread only waits for SIGINT/SIGTERM; on macOS it
//! pumps the CoreFoundation run loop while waiting, which is where the OS
//! delivers hotkey events.

use log::{error, info};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use wmbind::chord::Chord;
use wmbind::command::{Command, CommandKind};
use wmbind::config::Config;
use wmbind::context::{FunctionTable, RuntimeContext};
use wmbind::dispatcher::{self, Dispatcher, NOTIFY_TITLE};
use wmbind::ipc::listener::UnixSocketListener;
use wmbind::quake::register_quake_functions;
use wmbind::shutdown::DoneSignal;
use wmbind::status::{self, StatusBoard};
use wmbind::system::hotkeys::GlobalHotkeyBackend;
use wmbind::system::launcher::{find_program, SystemLauncher};
use wmbind::system::notify::DesktopNotifier;
use wmbind::traits::{CommandSource, Notifier, NullNotifier};
use wmbind::translator::Translator;
use wmbind::yabai::YabaiWm;

type YabaiTranslator = Translator<Arc<YabaiWm>, SystemLauncher>;

const USAGE: &str = "usage: wmbind [run | generate [path|-] | validate | func <key>]";

/// Default socket path for the command listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/wmbind.sock", runtime)
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/wmbind`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("wmbind")
}

/// Try to load the config from `$XDG_CONFIG_HOME/wmbind/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

fn build_context(config: &Config) -> RuntimeContext {
    let mut functions = FunctionTable::new();
    register_quake_functions(&mut functions, config);
    RuntimeContext::new(config.variable_table(), functions)
}

fn notifier_for(config: &Config) -> Arc<dyn Notifier> {
    if config.notifications {
        Arc::new(DesktopNotifier::new())
    } else {
        Arc::new(NullNotifier)
    }
}

//  Main

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let code = match args.get(1).map(String::as_str) {
        None | Some("run") => run_daemon(),
        Some("generate") => generate(args.get(2).map(String::as_str)),
        Some("validate") => validate(),
        Some("func") => match args.get(2) {
            Some(key) => run_func(key),
            None => {
                eprintln!("{}", USAGE);
                2
            }
        },
        Some("-h") | Some("--help") => {
            println!("{}", USAGE);
            0
        }
        Some(other) => {
            eprintln!("unknown subcommand {:?}\n{}", other, USAGE);
            2
        }
    };
    std::process::exit(code);
}

//  Subcommands

/// Daemon mode.
fn run_daemon() -> i32 {
    let config = load_config();
    let context = Arc::new(build_context(&config));
    if !context.functions.is_empty() {
        info!("{} function(s) registered", context.functions.len());
    }
    let done = DoneSignal::new();

    {
        let done = done.clone();
        if let Err(e) = ctrlc::set_handler(move || done.close()) {
            error!("failed to install signal handler: {}", e);
            return 1;
        }
    }

    let wm = Arc::new(YabaiWm::new(config.yabai.binary.clone()));
    let translator = Arc::new(Translator::new(
        Arc::clone(&wm),
        SystemLauncher::new(),
        Arc::clone(&context),
    ));
    let notifier = notifier_for(&config);

    let backend = match GlobalHotkeyBackend::new() {
        Ok(backend) => backend,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };
    let mut dispatcher = Dispatcher::new(
        backend,
        Arc::clone(&translator),
        Arc::clone(&notifier),
        done.clone(),
    );
    for binding in config.all_bindings() {
        if let Err(e) = dispatcher.bind(&binding) {
            error!("{}", e);
            if let Err(e) = dispatcher.shutdown() {
                error!("{}", e);
            }
            return 1;
        }
    }

    let board = StatusBoard::new(config.status.title.clone());
    let poller = status::spawn_poller(
        Arc::clone(&wm),
        board,
        config.status.clone(),
        done.clone(),
    );

    let socket_path = config
        .socket_path
        .clone()
        .unwrap_or_else(default_socket_path);
    let socket_threads = spawn_command_socket(socket_path, translator, notifier, done.clone());

    info!("wmbind running");
    wait_for_shutdown(&done);
    info!("shutting down");

    let mut code = 0;
    if let Err(e) = dispatcher.shutdown() {
        error!("{}", e);
        code = 1;
    }
    for handle in std::iter::once(poller).chain(socket_threads) {
        if handle.join().is_err() {
            error!("background thread panicked");
            code = 1;
        }
    }
    code
}

/// Print the generated config, or write it to `path`.
fn generate(path: Option<&str>) -> i32 {
    let config = load_config();
    let program = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "wmbind".into());
    let text = config.generate(&program);
    match path {
        None | Some("-") => {
            print!("{}", text);
            0
        }
        Some(path) => match std::fs::write(path, text) {
            Ok(()) => {
                info!("wrote {}", path);
                0
            }
            Err(e) => {
                eprintln!("failed to write {}: {}", path, e);
                1
            }
        },
    }
}

fn validate() -> i32 {
    let config = load_config();
    let variables = config.variable_table();
    let functions = build_context(&config).functions;
    let mut ok = true;

    for binding in config.all_bindings() {
        for spec in binding.aliases.iter().chain(std::iter::once(&binding.keys)) {
            if let Err(e) = Chord::parse(spec, &variables) {
                eprintln!("{}", e);
                ok = false;
            }
        }
        for cmd in &binding.commands {
            match cmd.kind() {
                Ok(CommandKind::Func(key)) if !functions.contains(&key) => {
                    eprintln!("{}: no func {}", cmd, key);
                    ok = false;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("{}: {}", cmd, e);
                    ok = false;
                }
            }
        }
    }

    let missing = config.missing_programs(|p| find_program(p).is_some());
    if !missing.is_empty() {
        eprintln!("missing applications: {}", missing.join(", "));
        ok = false;
    }

    if ok {
        println!("config ok");
        0
    } else {
        1
    }
}

/// Run one registered function, as called back from generated config text.
fn run_func(key: &str) -> i32 {
    let config = load_config();
    let context = build_context(&config);
    let notifier = notifier_for(&config);

    let result = match context.functions.get(key) {
        Some(f) => f().map_err(|e| e.to_string()),
        None => Err(format!("no func {}", key)),
    };
    match result {
        Ok(()) => 0,
        Err(msg) => {
            error!("{}", msg);
            notifier.notify(NOTIFY_TITLE, &msg);
            eprintln!("{}", msg);
            1
        }
    }
}

//  Helpers

/// Start the socket listener and the thread that runs what it receives.
fn spawn_command_socket(
    path: String,
    translator: Arc<YabaiTranslator>,
    notifier: Arc<dyn Notifier>,
    done: DoneSignal,
) -> Vec<JoinHandle<()>> {
    let (tx, rx) = mpsc::channel::<Vec<Command>>();

    let listener = thread::spawn(move || {
        let mut source = UnixSocketListener::new(&path, done);
        if let Err(e) = source.run(tx) {
            error!("socket listener error: {}", e);
        }
    });

    let runner = thread::spawn(move || {
        for commands in rx {
            dispatcher::run_sequence(&translator, &commands, notifier.as_ref());
        }
    });

    vec![listener, runner]
}

#[cfg(target_os = "macos")]
fn wait_for_shutdown(done: &DoneSignal) {
    use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop};
    use std::time::Duration;

    while !done.is_closed() {
        CFRunLoop::run_in_mode(
            unsafe { kCFRunLoopDefaultMode },
            Duration::from_millis(200),
            false,
        );
    }
}

#[cfg(not(target_os = "macos"))]
fn wait_for_shutdown(done: &DoneSignal) {
    done.wait();
}
