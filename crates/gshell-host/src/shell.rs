//! Shell window orchestration: one tao window, one wry view, and the
//! bridge object wired between them.
//!
//! The window is created hidden; the hosted application calls
//! `gshell.openShell()` once it has booted, at which point persisted
//! geometry (or centered defaults) is applied and the window is shown.

use crate::config::Manifest;
use anyhow::{Context, Result};
use gshell_bridge::{HostBridge, MudaBackend, RfdDialogs, ShellControl, BINDING_NAME};
use gshell_storage::{
    record_for_close, DisplayMode, Position, SettingsStore, Size, WindowSnapshot,
};
use std::borrow::Cow;
use std::path::PathBuf;
use std::rc::Rc;
use tao::dpi::{PhysicalPosition, PhysicalSize};
use tao::event_loop::{EventLoopProxy, EventLoopWindowTarget};
use tao::window::{Fullscreen, Window, WindowBuilder};
use tracing::{debug, info, warn};
use wry::http::{Response, StatusCode};
use wry::{PageLoadEvent, WebView, WebViewBuilder};

const INIT_SCRIPT: &str = include_str!("../assets/gshell.js");

/// Events funneled into the tao event loop from webview and menu threads.
#[derive(Debug)]
pub enum ShellEvent {
    /// Raw IPC payload from the hosted script environment.
    Bridge(String),
    /// The view started loading its document; the injected binding is live.
    EnvironmentReady,
    /// A native menu item was activated.
    MenuActivated(muda::MenuId),
}

/// Where a window's top-left corner lands when centered on a monitor.
pub fn centered_origin(
    monitor_pos: (i32, i32),
    monitor_size: (u32, u32),
    window_size: (u32, u32),
) -> (i32, i32) {
    let x = (monitor_size.0 as i32 - window_size.0 as i32) / 2;
    let y = (monitor_size.1 as i32 - window_size.1 as i32) / 2;
    (monitor_pos.0 + x, monitor_pos.1 + y)
}

fn center_window(window: &Window) {
    if let Some(monitor) = window.current_monitor() {
        let screen = monitor.size();
        let outer = window.outer_size();
        let (x, y) = centered_origin(
            (monitor.position().x, monitor.position().y),
            (screen.width, screen.height),
            (outer.width, outer.height),
        );
        window.set_outer_position(PhysicalPosition::new(x, y));
    }
}

/// [`ShellControl`] implementation for the real window: applies the
/// persisted record (or centered defaults) and makes the window visible.
pub struct ShellOpener {
    window: Rc<Window>,
    store: Rc<SettingsStore>,
    default_size: Size,
}

impl ShellControl for ShellOpener {
    fn open_shell(&mut self) {
        match self.store.load_window() {
            Some(record) => {
                info!(
                    width = record.size.width,
                    height = record.size.height,
                    mode = record.display_mode.as_str(),
                    "opening shell with persisted geometry"
                );
                self.window
                    .set_inner_size(PhysicalSize::new(record.size.width, record.size.height));
                match record.position {
                    Some(Position { x, y }) => {
                        self.window.set_outer_position(PhysicalPosition::new(x, y));
                    }
                    None => center_window(&self.window),
                }
                match record.display_mode {
                    DisplayMode::Normal => {}
                    DisplayMode::Maximized => self.window.set_maximized(true),
                    DisplayMode::Fullscreen => {
                        self.window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                    }
                }
            }
            None => {
                info!(
                    width = self.default_size.width,
                    height = self.default_size.height,
                    "opening shell with default geometry"
                );
                self.window.set_inner_size(PhysicalSize::new(
                    self.default_size.width,
                    self.default_size.height,
                ));
                center_window(&self.window);
            }
        }
        self.window.set_visible(true);
        self.window.set_focus();
    }
}

/// The shell: window, view, bridge, and settings store.
pub struct ShellWindow {
    window: Rc<Window>,
    webview: WebView,
    bridge: HostBridge<MudaBackend, RfdDialogs, ShellOpener>,
    store: Rc<SettingsStore>,
}

impl ShellWindow {
    pub fn create(
        target: &EventLoopWindowTarget<ShellEvent>,
        manifest: &Manifest,
        app_dir: PathBuf,
        dev_mode: bool,
        store: SettingsStore,
        proxy: EventLoopProxy<ShellEvent>,
    ) -> Result<Self> {
        let default_size = manifest.default_size();
        let window = WindowBuilder::new()
            .with_title(&manifest.app.name)
            .with_inner_size(PhysicalSize::new(default_size.width, default_size.height))
            .with_visible(false)
            .build(target)
            .context("creating shell window")?;
        let window = Rc::new(window);
        let store = Rc::new(store);

        let backend = MudaBackend::new();
        attach_menu_bar(backend.menu_bar(), &window);

        let ipc_proxy = proxy.clone();
        let load_proxy = proxy;
        let webview = WebViewBuilder::new()
            .with_initialization_script(INIT_SCRIPT)
            .with_ipc_handler(move |msg| {
                let _ = ipc_proxy.send_event(ShellEvent::Bridge(msg.body().to_string()));
            })
            .with_on_page_load_handler(move |event, _url| {
                if let PageLoadEvent::Started = event {
                    let _ = load_proxy.send_event(ShellEvent::EnvironmentReady);
                }
            })
            .with_custom_protocol("app".into(), move |_ctx, request| {
                serve_app_asset(&app_dir, &request.uri().to_string())
            })
            .with_devtools(dev_mode)
            .with_url(manifest.content_url(dev_mode))
            .build(&*window)
            .context("creating webview")?;

        let opener = ShellOpener {
            window: Rc::clone(&window),
            store: Rc::clone(&store),
            default_size,
        };
        let bridge = HostBridge::new(backend, RfdDialogs, opener);

        Ok(Self {
            window,
            webview,
            bridge,
            store,
        })
    }

    pub fn window_id(&self) -> tao::window::WindowId {
        self.window.id()
    }

    /// Dispatch one raw IPC message and resolve the pending promise in
    /// the view with the result.
    pub fn handle_bridge_message(&mut self, raw: &str) {
        if let Some(reply) = self.bridge.handle_request(raw) {
            let js = format!("{}._resolve({}, {});", BINDING_NAME, reply.id, reply.result);
            if let Err(e) = self.webview.evaluate_script(&js) {
                warn!("failed to resolve bridge call {}: {}", reply.id, e);
            }
        }
    }

    /// (Re)bind the bridge into a fresh script environment and announce
    /// it to the page. The shim itself makes repeat injection a no-op, so
    /// this is safe to run on every load.
    pub fn handle_environment_ready(&self) {
        debug!("script environment ready, binding {}", BINDING_NAME);
        if let Err(e) = self.webview.evaluate_script(INIT_SCRIPT) {
            warn!("failed to inject bridge shim: {}", e);
        }
        let js = format!("{0}._ready && {0}._ready();", BINDING_NAME);
        if let Err(e) = self.webview.evaluate_script(&js) {
            warn!("failed to signal environment ready: {}", e);
        }
    }

    /// Keep the view filling the client area exactly. Applied directly
    /// from the resize event, never deferred.
    pub fn handle_resized(&self, width: u32, height: u32) {
        let bounds = wry::Rect {
            position: wry::dpi::PhysicalPosition::new(0, 0).into(),
            size: wry::dpi::PhysicalSize::new(width, height).into(),
        };
        if let Err(e) = self.webview.set_bounds(bounds) {
            warn!("failed to resize webview: {}", e);
        }
    }

    /// Forward a native menu activation to the script-side callback.
    pub fn handle_menu_activated(&mut self, id: &muda::MenuId) {
        let backend = self.bridge.menu_backend();
        let Some(handle) = backend.handle_for_menu_id(id) else {
            debug!(?id, "menu activation without a registered item");
            return;
        };
        let checked = backend.item_checked(handle).unwrap_or(false);
        let js = format!("{}._trigger({}, {});", BINDING_NAME, handle, checked);
        if let Err(e) = self.webview.evaluate_script(&js) {
            warn!(handle, "failed to forward menu activation: {}", e);
        }
    }

    /// Persist the window record for the next launch. Called once, when
    /// the close request arrives.
    pub fn persist_on_close(&self) {
        let snapshot = WindowSnapshot {
            size: Size {
                width: self.window.inner_size().width,
                height: self.window.inner_size().height,
            },
            position: self
                .window
                .outer_position()
                .map(|p| Position { x: p.x, y: p.y })
                .unwrap_or(Position { x: 0, y: 0 }),
            is_maximized: self.window.is_maximized(),
            is_minimized: self.window.is_minimized(),
            is_fullscreen: self.window.fullscreen().is_some(),
        };
        let previous = self.store.load_window();
        let record = record_for_close(previous.as_ref(), &snapshot);
        if let Err(e) = self.store.save_window(&record) {
            warn!("failed to persist window state: {}", e);
        } else {
            debug!(mode = record.display_mode.as_str(), "window state persisted");
        }
    }
}

fn attach_menu_bar(bar: &muda::Menu, window: &Window) {
    #[cfg(target_os = "macos")]
    {
        let _ = window;
        bar.init_for_nsapp();
    }

    #[cfg(target_os = "windows")]
    {
        use tao::platform::windows::WindowExtWindows;
        unsafe {
            if let Err(e) = bar.init_for_hwnd(window.hwnd() as isize) {
                warn!("failed to attach menu bar: {}", e);
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        use gtk::prelude::*;
        use tao::platform::unix::WindowExtUnix;
        let gtk_win = window.gtk_window();
        let gtk_win_ref: &gtk::Window = gtk_win.upcast_ref();
        if let Err(e) = bar.init_for_gtk_window(gtk_win_ref, None::<&gtk::Box>) {
            warn!("failed to attach menu bar: {}", e);
        }
    }
}

fn serve_app_asset(app_dir: &std::path::Path, uri: &str) -> Response<Cow<'static, [u8]>> {
    // The requested file starts at the authority: app://index.html.
    let rel = uri
        .strip_prefix("app://")
        .unwrap_or(uri)
        .trim_start_matches('/')
        .trim_end_matches('/');
    let rel = if rel.is_empty() { "index.html" } else { rel };

    // Never step outside the app directory.
    if rel.split('/').any(|part| part == "..") {
        return not_found(rel);
    }

    let path = app_dir.join(rel);
    match std::fs::read(&path) {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", mime_for(rel))
            .header("X-Content-Type-Options", "nosniff")
            .body(Cow::Owned(bytes))
            .unwrap(),
        Err(_) => not_found(rel),
    }
}

fn not_found(path: &str) -> Response<Cow<'static, [u8]>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Cow::Owned(format!("Not found: {}", path).into_bytes()))
        .unwrap()
}

/// MIME type for a served asset path based on extension.
pub fn mime_for(path: &str) -> &'static str {
    if let Some(ext) = std::path::Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
    {
        match ext {
            "html" | "htm" => "text/html; charset=utf-8",
            "js" | "mjs" => "text/javascript; charset=utf-8",
            "css" => "text/css; charset=utf-8",
            "json" => "application/json",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "txt" => "text/plain; charset=utf-8",
            "wasm" => "application/wasm",
            _ => "application/octet-stream",
        }
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_origin() {
        assert_eq!(centered_origin((0, 0), (1920, 1080), (1280, 800)), (320, 140));
        // Secondary monitor to the left of the primary.
        assert_eq!(
            centered_origin((-1920, 0), (1920, 1080), (1280, 800)),
            (-1600, 140)
        );
        // Window larger than the monitor still yields a stable origin.
        assert_eq!(centered_origin((0, 0), (800, 600), (1280, 800)), (-240, -100));
    }

    #[test]
    fn test_mime_for_known_and_unknown() {
        assert_eq!(mime_for("index.html"), "text/html; charset=utf-8");
        assert_eq!(mime_for("app/main.js"), "text/javascript; charset=utf-8");
        assert_eq!(mime_for("style.css"), "text/css; charset=utf-8");
        assert_eq!(mime_for("font.woff2"), "application/octet-stream");
        assert_eq!(mime_for("no-extension"), "application/octet-stream");
    }

    #[test]
    fn test_serve_app_asset_reads_and_404s() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        let ok = serve_app_asset(dir.path(), "app://index.html");
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(ok.body().as_ref(), b"<html></html>");

        // Bare root maps to the entry document.
        let root = serve_app_asset(dir.path(), "app://");
        assert_eq!(root.status(), StatusCode::OK);

        let missing = serve_app_asset(dir.path(), "app://nope.js");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let escape = serve_app_asset(dir.path(), "app://../secret");
        assert_eq!(escape.status(), StatusCode::NOT_FOUND);
    }
}
