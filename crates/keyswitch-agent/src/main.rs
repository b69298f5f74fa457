//! KeySwitch agent entry point.
//!
//! Wires the Win32 adapters, the console prompt and the file storage into a
//! session and runs the raw input message loop until the console is closed
//! (Ctrl-C) or the user logs off.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load settings.toml, initialise tracing
//!  └─ load layout catalog                (fatal if missing)
//!  └─ RawInputHost::create()            (fatal if raw input is refused)
//!  └─ start_session()                   enumerate keyboards, load mapping
//!  └─ on_session_end / console handler  save mapping before Windows ends us
//!  └─ host.run(|event| session.dispatch(event))
//!  └─ session.finish()                  save mapping (if not saved yet)
//! ```

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keyswitch_agent::infrastructure::storage::config::{self, AppConfig};

fn main() -> anyhow::Result<()> {
    let (settings, settings_error) = match config::load_config() {
        Ok(settings) => (settings, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Initialise structured logging.  `RUST_LOG` overrides the settings file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.general.log_level)),
        )
        .init();

    match settings_error {
        Some(e) => warn!("settings not loaded, using defaults: {e}"),
        None => write_default_settings_once(),
    }

    info!("KeySwitch {} starting", env!("CARGO_PKG_VERSION"));
    run(settings)
}

/// Creates `settings.toml` with the defaults on first run so users can find
/// and edit it.
fn write_default_settings_once() {
    let Ok(path) = config::config_file_path() else {
        return;
    };
    if path.exists() {
        return;
    }
    match config::save_config(&AppConfig::default()) {
        Ok(()) => info!("default settings written to {}", path.display()),
        Err(e) => warn!("could not write default settings: {e}"),
    }
}

#[cfg(target_os = "windows")]
fn run(settings: AppConfig) -> anyhow::Result<()> {
    use std::sync::Arc;

    use anyhow::Context;
    use keyswitch_agent::application::session::{start_session, Collaborators, SharedSession};
    use keyswitch_agent::infrastructure::notifier::ConsoleNotifier;
    use keyswitch_agent::infrastructure::platform::windows::{
        install_console_handler, on_session_end, RawInputHost, WindowsPlatform,
    };
    use keyswitch_agent::infrastructure::prompt::ConsolePrompt;
    use keyswitch_agent::infrastructure::storage::catalog_file::load_catalog;
    use keyswitch_agent::infrastructure::storage::mapping_file::MappingFile;
    use keyswitch_agent::infrastructure::StartupError;

    let catalog_path = settings
        .catalog_file_path()
        .context("locating the layout catalog")?;
    let catalog = load_catalog(&catalog_path).map_err(StartupError::from)?;
    let mapping_path = settings
        .mapping_file_path()
        .context("locating the mapping file")?;
    info!("mapping file: {}", mapping_path.display());

    let host = RawInputHost::create()?;

    let platform = Arc::new(WindowsPlatform::new());
    let session = Arc::new(SharedSession::new(start_session(Collaborators {
        catalog,
        enumerator: platform.clone(),
        switcher: platform,
        prompt: Arc::new(ConsolePrompt::stdio()),
        repository: Arc::new(MappingFile::new(mapping_path)),
        notifier: Arc::new(ConsoleNotifier::stderr()),
    })));

    // ── Shutdown triggers ─────────────────────────────────────────────────────
    // Both save before returning to Windows.  A failed save has already been
    // reported to the user.
    on_session_end({
        let session = Arc::clone(&session);
        move || {
            session.try_finish();
        }
    });
    install_console_handler({
        let session = Arc::clone(&session);
        move || {
            session.finish();
        }
    })
    .context("installing the console handler")?;

    info!("KeySwitch ready.  Press Ctrl-C to exit.");
    host.run(|event| session.dispatch(event));

    session.finish();
    info!("KeySwitch stopped");
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn run(_settings: AppConfig) -> anyhow::Result<()> {
    use keyswitch_agent::infrastructure::StartupError;

    Err(StartupError::UnsupportedPlatform(std::env::consts::OS.to_string()).into())
}
