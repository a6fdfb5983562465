//! gshell-host: native shell process hosting the web application.
//!
//! Owns the tao event loop, creates the single shell window, and routes
//! webview IPC and native menu activations through the bridge.

mod config;
mod shell;

use anyhow::{Context, Result};
use config::{CliArgs, Manifest};
use gshell_storage::SettingsStore;
use shell::{ShellEvent, ShellWindow};
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // GSHELL_LOG env var selects log level, default "info".
    let filter = EnvFilter::try_from_env("GSHELL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = CliArgs::parse();
    let app_dir = args
        .app_dir
        .canonicalize()
        .with_context(|| format!("resolving app directory {}", args.app_dir.display()))?;
    let manifest = Manifest::load(&app_dir)?;
    info!(
        app = %manifest.app.name,
        dir = %app_dir.display(),
        dev = args.dev_mode,
        "starting shell"
    );

    let store = SettingsStore::open(&manifest.app.organization, &manifest.app.name)
        .context("opening settings store")?;
    info!(db = %store.db_path().display(), "settings store ready");

    let event_loop: EventLoop<ShellEvent> = EventLoopBuilder::with_user_event().build();
    let proxy = event_loop.create_proxy();

    // muda delivers activations on its own channel; forward them into the
    // event loop so they are handled on the UI thread.
    let menu_proxy = event_loop.create_proxy();
    std::thread::spawn(move || {
        let receiver = muda::MenuEvent::receiver();
        while let Ok(event) = receiver.recv() {
            if menu_proxy
                .send_event(ShellEvent::MenuActivated(event.id))
                .is_err()
            {
                break;
            }
        }
    });

    let mut shell = Some(ShellWindow::create(
        &event_loop,
        &manifest,
        app_dir,
        args.dev_mode,
        store,
        proxy,
    )?);

    event_loop.run(move |event, _target, control| {
        *control = ControlFlow::Wait;

        match event {
            Event::UserEvent(ShellEvent::Bridge(raw)) => {
                if let Some(shell) = shell.as_mut() {
                    shell.handle_bridge_message(&raw);
                }
            }
            Event::UserEvent(ShellEvent::EnvironmentReady) => {
                if let Some(shell) = shell.as_ref() {
                    shell.handle_environment_ready();
                }
            }
            Event::UserEvent(ShellEvent::MenuActivated(id)) => {
                if let Some(shell) = shell.as_mut() {
                    shell.handle_menu_activated(&id);
                }
            }
            Event::WindowEvent {
                event: WindowEvent::Resized(size),
                window_id,
                ..
            } => {
                if let Some(shell) = shell.as_ref() {
                    if shell.window_id() == window_id {
                        shell.handle_resized(size.width, size.height);
                    }
                }
            }
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                window_id,
                ..
            } => {
                if shell.as_ref().map(|s| s.window_id()) == Some(window_id) {
                    if let Some(shell) = shell.take() {
                        shell.persist_on_close();
                    }
                    info!("shell window closed");
                    *control = ControlFlow::Exit;
                }
            }
            _ => {}
        }
    });
}
