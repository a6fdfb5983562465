//! The host bridge exposed to the hosted web application.
//!
//! A narrow, fixed method table with request/response semantics: script
//! sends `{id, method, args}` over the webview IPC channel, the shell
//! dispatches it on the UI thread through [`HostBridge::handle_request`],
//! and answers by resolving `id` in the view. Every native failure is
//! absorbed here and converted to a sentinel value (null / "" / false) so
//! hosted script never needs exception handling for bridge calls.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub mod dialog;
pub mod fileio;
pub mod handle;
pub mod menu;

pub use dialog::{DialogProvider, RfdDialogs};
pub use handle::{Handle, Resolved};
pub use menu::{MenuBackend, MenuRegistry, MudaBackend};

/// The fixed global name the bridge is bound under in the script
/// environment. The hosted application references exactly this name.
pub const BINDING_NAME: &str = "gshell";

/// Window-lifecycle seam: `openShell` is the one bridge method that acts
/// on the shell window itself, so the orchestrator supplies it.
pub trait ShellControl {
    /// Apply persisted-or-default geometry and make the window visible.
    /// Must be idempotent.
    fn open_shell(&mut self);
}

/// One call from the hosted script environment.
#[derive(Debug, Deserialize)]
pub struct BridgeRequest {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// The value to resolve a pending script call with.
#[derive(Debug, PartialEq)]
pub struct BridgeReply {
    pub id: u64,
    pub result: Value,
}

/// The bridge object: menu registry, dialog service, file I/O and shell
/// control behind one synchronous method table.
pub struct HostBridge<B: MenuBackend, D: DialogProvider, S: ShellControl> {
    menus: MenuRegistry<B>,
    dialogs: D,
    shell: S,
}

impl<B: MenuBackend, D: DialogProvider, S: ShellControl> HostBridge<B, D, S> {
    pub fn new(backend: B, dialogs: D, shell: S) -> Self {
        Self {
            menus: MenuRegistry::new(backend),
            dialogs,
            shell,
        }
    }

    /// The menu backend, for mapping native activation events back to
    /// script-side tokens.
    pub fn menu_backend(&self) -> &B {
        self.menus.backend()
    }

    /// Parse and dispatch one raw IPC message. `None` for messages that
    /// are not well-formed bridge requests (they are logged and dropped,
    /// never answered with an error).
    pub fn handle_request(&mut self, raw: &str) -> Option<BridgeReply> {
        let request: BridgeRequest = match serde_json::from_str(raw) {
            Ok(request) => request,
            Err(e) => {
                warn!("malformed bridge request dropped: {}", e);
                return None;
            }
        };
        debug!(id = request.id, method = %request.method, "bridge call");
        let result = self.dispatch(&request.method, &request.args);
        Some(BridgeReply {
            id: request.id,
            result,
        })
    }

    /// The method table. Unknown methods and wrong-kind handles resolve
    /// to null; dialogs and file reads resolve to "" on cancel/failure;
    /// writes resolve to false.
    pub fn dispatch(&mut self, method: &str, args: &[Value]) -> Value {
        match method {
            "openShell" => {
                self.shell.open_shell();
                Value::Null
            }
            "addMenu" => {
                let parent = arg_handle(args, 0);
                let title = arg_str(args, 1);
                json!(self.menus.add_menu(parent, title))
            }
            "addMenuItem" => {
                let parent = arg_handle(args, 0);
                let shortcut = arg_str(args, 1);
                let accelerator = (!shortcut.is_empty()).then_some(shortcut);
                match self.menus.add_item(parent, accelerator) {
                    Some(item) => json!(item),
                    None => Value::Null,
                }
            }
            "addMenuSeparator" => {
                self.menus.add_separator(arg_handle(args, 0));
                Value::Null
            }
            "updateMenuItemShortcut" => {
                self.menus
                    .update_item_shortcut(arg_handle(args, 0), arg_str(args, 1));
                Value::Null
            }
            "updateMenuItem" => {
                self.menus.update_item(
                    arg_handle(args, 0),
                    arg_str(args, 1),
                    arg_bool(args, 2, true),
                    arg_bool(args, 3, false),
                );
                Value::Null
            }
            "removeMenuItem" => {
                self.menus
                    .remove_item(arg_handle(args, 0), arg_handle(args, 1));
                Value::Null
            }
            "openFilePrompt" => {
                let path = self.dialogs.open_file(arg_str(args, 0), arg_str(args, 1));
                json!(path_or_empty(path))
            }
            "saveFilePrompt" => {
                let path = self.dialogs.save_file(arg_str(args, 0), arg_str(args, 1));
                json!(path_or_empty(path))
            }
            "readFile" => {
                let content = fileio::read_file(
                    arg_str(args, 0),
                    arg_bool(args, 1, false),
                    arg_str(args, 2),
                );
                json!(content)
            }
            "writeFile" => {
                let ok = fileio::write_file(
                    arg_str(args, 0),
                    arg_str(args, 1),
                    arg_bool(args, 2, false),
                    arg_str(args, 3),
                );
                json!(ok)
            }
            other => {
                warn!(method = other, "unknown bridge method");
                Value::Null
            }
        }
    }
}

fn arg_handle(args: &[Value], index: usize) -> Handle {
    args.get(index).and_then(Value::as_u64).unwrap_or(0)
}

fn arg_str<'a>(args: &'a [Value], index: usize) -> &'a str {
    args.get(index).and_then(Value::as_str).unwrap_or("")
}

fn arg_bool(args: &[Value], index: usize, default: bool) -> bool {
    args.get(index).and_then(Value::as_bool).unwrap_or(default)
}

fn path_or_empty(path: Option<std::path::PathBuf>) -> String {
    path.map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::menu::testing::{MemoryBackend, Node};
    use super::*;
    use std::path::PathBuf;

    /// Dialog double: canned selection, or None to simulate cancellation.
    struct ScriptedDialogs {
        open: Option<PathBuf>,
        save: Option<PathBuf>,
    }

    impl DialogProvider for ScriptedDialogs {
        fn open_file(&self, _filter: &str, _initial_dir: &str) -> Option<PathBuf> {
            self.open.clone()
        }
        fn save_file(&self, _filter: &str, _initial_dir: &str) -> Option<PathBuf> {
            self.save.clone()
        }
    }

    #[derive(Default)]
    struct CountingShell {
        opened: u32,
    }

    impl ShellControl for &mut CountingShell {
        fn open_shell(&mut self) {
            self.opened += 1;
        }
    }

    fn bridge(
        shell: &mut CountingShell,
    ) -> HostBridge<MemoryBackend, ScriptedDialogs, &mut CountingShell> {
        HostBridge::new(
            MemoryBackend::default(),
            ScriptedDialogs {
                open: None,
                save: None,
            },
            shell,
        )
    }

    #[test]
    fn test_open_shell_dispatch() {
        let mut shell = CountingShell::default();
        let mut bridge = bridge(&mut shell);
        assert_eq!(bridge.dispatch("openShell", &[]), Value::Null);
        assert_eq!(bridge.dispatch("openShell", &[]), Value::Null);
        drop(bridge);
        assert_eq!(shell.opened, 2);
    }

    #[test]
    fn test_menu_chain_from_script() {
        let mut shell = CountingShell::default();
        let mut bridge = bridge(&mut shell);

        // addMenu on a non-menu token creates a top-level menu, never null.
        let file = bridge.dispatch("addMenu", &[json!(0), json!("File")]);
        let file = file.as_u64().expect("top-level menu handle");

        let item = bridge.dispatch("addMenuItem", &[json!(file)]);
        let item = item.as_u64().expect("item under a valid menu");
        assert_eq!(
            bridge.menu_backend().children_of(file),
            &[Node::Item(item)]
        );

        // Submenu under the returned handle.
        let sub = bridge.dispatch("addMenu", &[json!(file), json!("Open Recent")]);
        assert!(sub.as_u64().is_some());
    }

    #[test]
    fn test_foreign_handles_never_error() {
        let mut shell = CountingShell::default();
        let mut bridge = bridge(&mut shell);

        assert_eq!(bridge.dispatch("addMenuItem", &[json!(555)]), Value::Null);
        assert_eq!(
            bridge.dispatch("addMenuSeparator", &[json!(555)]),
            Value::Null
        );
        assert_eq!(
            bridge.dispatch("updateMenuItemShortcut", &[json!(555), json!("Ctrl+Z")]),
            Value::Null
        );
        assert_eq!(
            bridge.dispatch("removeMenuItem", &[json!(555), json!(556)]),
            Value::Null
        );
        // Wrong arg types degrade to the zero token, same behavior.
        assert_eq!(
            bridge.dispatch("addMenuItem", &[json!("not-a-handle")]),
            Value::Null
        );
    }

    #[test]
    fn test_add_menu_fallback_from_script() {
        let mut shell = CountingShell::default();
        let mut bridge = bridge(&mut shell);
        let h = bridge.dispatch("addMenu", &[json!(987654), json!("Edit")]);
        assert!(h.as_u64().is_some(), "fallback to menu bar never fails");
        assert_eq!(bridge.menu_backend().roots.len(), 1);
    }

    #[test]
    fn test_dialog_cancellation_yields_empty_string() {
        let mut shell = CountingShell::default();
        let mut bridge = bridge(&mut shell);
        assert_eq!(
            bridge.dispatch("openFilePrompt", &[json!("*.gravit"), json!("")]),
            json!("")
        );
        assert_eq!(
            bridge.dispatch("saveFilePrompt", &[json!("*.gravit"), json!("")]),
            json!("")
        );
    }

    #[test]
    fn test_dialog_selection_yields_path() {
        let mut shell = CountingShell::default();
        let mut bridge = HostBridge::new(
            MemoryBackend::default(),
            ScriptedDialogs {
                open: Some(PathBuf::from("/tmp/drawing.gravit")),
                save: None,
            },
            &mut shell,
        );
        assert_eq!(
            bridge.dispatch("openFilePrompt", &[json!("*.gravit"), json!("/tmp")]),
            json!("/tmp/drawing.gravit")
        );
    }

    #[test]
    fn test_file_round_trip_through_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let path = path.to_str().unwrap();

        let mut shell = CountingShell::default();
        let mut bridge = bridge(&mut shell);
        let ok = bridge.dispatch(
            "writeFile",
            &[json!(path), json!("hello"), json!(false), json!("utf8")],
        );
        assert_eq!(ok, json!(true));

        let content = bridge.dispatch("readFile", &[json!(path), json!(false), json!("utf8")]);
        assert_eq!(content, json!("hello"));
    }

    #[test]
    fn test_read_failure_is_empty_write_failure_is_false() {
        let mut shell = CountingShell::default();
        let mut bridge = bridge(&mut shell);
        assert_eq!(
            bridge.dispatch("readFile", &[json!("/absent"), json!(false), json!("utf8")]),
            json!("")
        );
        assert_eq!(
            bridge.dispatch(
                "writeFile",
                &[json!("/absent/dir/f"), json!("x"), json!(false), json!("utf8")]
            ),
            json!(false)
        );
    }

    #[test]
    fn test_unknown_method_is_null() {
        let mut shell = CountingShell::default();
        let mut bridge = bridge(&mut shell);
        assert_eq!(bridge.dispatch("frobnicate", &[]), Value::Null);
    }

    #[test]
    fn test_handle_request_wire_format() {
        let mut shell = CountingShell::default();
        let mut bridge = bridge(&mut shell);

        let reply = bridge
            .handle_request(r#"{"id":7,"method":"addMenu","args":[0,"File"]}"#)
            .expect("well-formed request");
        assert_eq!(reply.id, 7);
        assert!(reply.result.as_u64().is_some());

        // Args may be omitted entirely.
        let reply = bridge
            .handle_request(r#"{"id":8,"method":"openShell"}"#)
            .unwrap();
        assert_eq!(reply.result, Value::Null);

        assert!(bridge.handle_request("not json").is_none());
        assert!(bridge.handle_request(r#"{"method":"x"}"#).is_none());
    }
}
