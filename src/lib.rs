pub mod commands;
pub mod error;
pub mod state;

use std::path::PathBuf;
use std::sync::Mutex;

use state::AppStateManager;

const DATA_DIR_ENV: &str = "UMIQ_DATA_DIR";

/// Install the global logger. Noisy transport crates are held at `Warn`.
pub fn init_logging(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("reqwest", log::LevelFilter::Warn)
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("hyper_util", log::LevelFilter::Warn)
        .level_for("rustls", log::LevelFilter::Warn)
        .level_for("diesel", log::LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()
}

/// `$UMIQ_DATA_DIR`, else `~/.umiq-live`, else `./.umiq-live`.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".umiq-live")
}

/// Initialize the app, refresh once and print the resulting snapshot as
/// JSON on stdout.
pub fn run() {
    let manager = AppStateManager::new(default_data_dir());
    let _ = init_logging(manager.config().log_level());
    let first_launch = manager.is_first_launch();
    let state = Mutex::new(manager);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = state
        .lock()
        .map_err(|_| "app state lock failed".to_string())
        .and_then(|mut mgr| {
            if first_launch {
                let dir = mgr.app_data_dir().to_path_buf();
                mgr.config().save(&dir);
            }
            mgr.initialize().map_err(|e| e.to_string())
        })
    {
        log::error!("initialization failed: {e}");
        std::process::exit(1);
    }

    match runtime.block_on(commands::refresh_markets(&state)) {
        Ok(response) => match serde_json::to_string_pretty(&response.snapshot) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("failed to serialize snapshot: {e}"),
        },
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
