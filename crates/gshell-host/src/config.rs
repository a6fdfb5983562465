//! Manifest and command-line configuration for the shell process.
//!
//! `shell.toml` in the app directory carries the organization/application
//! identity used to scope the settings store, the default window size,
//! and the content sources; `--dev` switches the view to the development
//! server URL instead of the packaged entry file.

use anyhow::{Context, Result};
use gshell_storage::Size;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Manifest {
    pub app: App,
    #[serde(default)]
    pub window: WindowDefaults,
    #[serde(default)]
    pub content: Content,
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    pub name: String,
    pub organization: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WindowDefaults {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Content {
    /// Development server URL used with `--dev`.
    pub dev_url: Option<String>,
    /// Packaged entry file, served through the app:// protocol.
    pub entry: Option<String>,
}

impl Manifest {
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = app_dir.join("shell.toml");
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading manifest at {}", path.display()))?;
        toml::from_str(&text).context("parsing manifest")
    }

    /// First-run window size: manifest values over the built-in default.
    pub fn default_size(&self) -> Size {
        let fallback = Size::default();
        Size {
            width: self.window.width.unwrap_or(fallback.width),
            height: self.window.height.unwrap_or(fallback.height),
        }
    }

    pub fn entry(&self) -> &str {
        self.content.entry.as_deref().unwrap_or("index.html")
    }

    /// Which URL the view is pointed at during construction.
    pub fn content_url(&self, dev_mode: bool) -> String {
        if dev_mode {
            if let Some(url) = &self.content.dev_url {
                return url.clone();
            }
        }
        format!("app://{}", self.entry())
    }
}

/// Process launch surface: `--app-dir <dir>` and `--dev`.
#[derive(Debug, Clone)]
pub struct CliArgs {
    pub app_dir: PathBuf,
    pub dev_mode: bool,
}

impl CliArgs {
    pub fn parse() -> Self {
        Self::from_iter(env::args().skip(1))
    }

    pub fn from_iter(args: impl IntoIterator<Item = String>) -> Self {
        let mut args = args.into_iter();
        let mut app_dir = PathBuf::from(".");
        let mut dev_mode = false;
        while let Some(a) = args.next() {
            match a.as_str() {
                "--app-dir" => {
                    app_dir = PathBuf::from(args.next().expect("--app-dir requires a path"));
                }
                "--dev" => {
                    dev_mode = true;
                }
                _ => {}
            }
        }
        Self { app_dir, dev_mode }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(text: &str) -> Manifest {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_minimal_manifest_defaults() {
        let m = manifest(
            r#"
            [app]
            name = "Sketch"
            organization = "acme"
            "#,
        );
        assert_eq!(m.default_size(), Size::default());
        assert_eq!(m.entry(), "index.html");
        assert_eq!(m.content_url(false), "app://index.html");
        // No dev_url configured: --dev still falls back to the package.
        assert_eq!(m.content_url(true), "app://index.html");
    }

    #[test]
    fn test_full_manifest() {
        let m = manifest(
            r#"
            [app]
            name = "Sketch"
            organization = "acme"

            [window]
            width = 1440
            height = 900

            [content]
            dev_url = "http://127.0.0.1:8999/"
            entry = "shell.html"
            "#,
        );
        assert_eq!(m.default_size().width, 1440);
        assert_eq!(m.content_url(true), "http://127.0.0.1:8999/");
        assert_eq!(m.content_url(false), "app://shell.html");
    }

    #[test]
    fn test_cli_args() {
        let args = CliArgs::from_iter(
            ["--app-dir", "/opt/sketch", "--dev"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(args.app_dir, PathBuf::from("/opt/sketch"));
        assert!(args.dev_mode);

        let args = CliArgs::from_iter(std::iter::empty());
        assert!(!args.dev_mode);
    }
}
