//! Native menu registry: owns the handle table and applies the single
//! dispatch rule shared by every menu operation.
//!
//! The registry is generic over a [`MenuBackend`] so the contract can be
//! exercised without a live menu bar; [`MudaBackend`] is the production
//! implementation over the window's muda menu tree.

use crate::handle::{Handle, HandleKind, HandleTable, Resolved};
use std::collections::HashMap;
use tracing::{debug, warn};

/// The menu surface the registry mutates. Handles are allocated by the
/// registry; the backend binds them to its own native objects.
pub trait MenuBackend {
    /// Append a top-level menu to the menu bar.
    fn add_root_menu(&mut self, handle: Handle, title: &str);
    /// Append a submenu to an existing menu.
    fn add_submenu(&mut self, parent: Handle, handle: Handle, title: &str);
    /// Append an initially unlabeled item to an existing menu.
    fn add_item(&mut self, parent: Handle, handle: Handle, accelerator: Option<&str>);
    /// Append a visual separator to an existing menu.
    fn add_separator(&mut self, parent: Handle);
    /// Rebind (or clear) an item's keyboard accelerator.
    fn set_item_accelerator(&mut self, item: Handle, accelerator: Option<&str>);
    /// Relabel an item and set its enabled/checked state.
    fn update_item(&mut self, item: Handle, label: &str, enabled: bool, checked: bool);
    /// Detach and destroy an item from its parent menu.
    fn remove_item(&mut self, parent: Handle, item: Handle);
}

/// Registry applying one resolution rule to all menu operations: resolve
/// the token once; operate only when the kind matches; `add_menu` alone
/// falls back to the root menu bar for non-menu tokens. Wrong-kind tokens
/// are a no-op or null result, never an error into script.
pub struct MenuRegistry<B: MenuBackend> {
    table: HandleTable,
    backend: B,
}

impl<B: MenuBackend> MenuRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            table: HandleTable::default(),
            backend,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Append a menu titled `title` under `parent` if it resolves to a
    /// menu, else as a top-level menu on the menu bar. Always succeeds.
    pub fn add_menu(&mut self, parent: Handle, title: &str) -> Handle {
        let handle = self.table.allocate(HandleKind::Menu);
        match self.table.resolve(parent) {
            Resolved::Menu(parent) => {
                debug!(parent, handle, title, "append submenu");
                self.backend.add_submenu(parent, handle, title);
            }
            _ => {
                debug!(handle, title, "append top-level menu");
                self.backend.add_root_menu(handle, title);
            }
        }
        handle
    }

    /// Append an unlabeled item under `parent`; `None` if it is not a menu.
    pub fn add_item(&mut self, parent: Handle, accelerator: Option<&str>) -> Option<Handle> {
        match self.table.resolve(parent) {
            Resolved::Menu(parent) => {
                let handle = self.table.allocate(HandleKind::Item);
                self.backend.add_item(parent, handle, accelerator);
                Some(handle)
            }
            _ => {
                warn!(parent, "addMenuItem on non-menu handle ignored");
                None
            }
        }
    }

    /// Append a separator under `parent`; no-op unless it is a menu.
    pub fn add_separator(&mut self, parent: Handle) {
        if let Resolved::Menu(parent) = self.table.resolve(parent) {
            self.backend.add_separator(parent);
        }
    }

    /// Rebind an item's accelerator; no-op unless `item` is an item. An
    /// empty shortcut clears the binding.
    pub fn update_item_shortcut(&mut self, item: Handle, shortcut: &str) {
        if let Resolved::Item(item) = self.table.resolve(item) {
            let accelerator = (!shortcut.is_empty()).then_some(shortcut);
            self.backend.set_item_accelerator(item, accelerator);
        }
    }

    /// Relabel an item and set enabled/checked; no-op unless `item` is an item.
    pub fn update_item(&mut self, item: Handle, label: &str, enabled: bool, checked: bool) {
        if let Resolved::Item(item) = self.table.resolve(item) {
            self.backend.update_item(item, label, enabled, checked);
        }
    }

    /// Detach and destroy `item` from `parent`; no-op unless both resolve
    /// to the right kinds. The destroyed token is forgotten.
    pub fn remove_item(&mut self, parent: Handle, item: Handle) {
        if let (Resolved::Menu(parent), Resolved::Item(item)) =
            (self.table.resolve(parent), self.table.resolve(item))
        {
            self.backend.remove_item(parent, item);
            self.table.forget(item);
        }
    }
}

fn parse_accelerator(accelerator: Option<&str>) -> Option<muda::accelerator::Accelerator> {
    accelerator.and_then(|a| a.parse().ok())
}

/// Production backend over the window's muda menu tree. The menu bar and
/// its children stay alive for as long as this backend does; the host
/// attaches [`MudaBackend::menu_bar`] to the shell window after creation.
pub struct MudaBackend {
    bar: muda::Menu,
    menus: HashMap<Handle, muda::Submenu>,
    items: HashMap<Handle, muda::CheckMenuItem>,
    ids: HashMap<muda::MenuId, Handle>,
}

impl MudaBackend {
    pub fn new() -> Self {
        Self {
            bar: muda::Menu::new(),
            menus: HashMap::new(),
            items: HashMap::new(),
            ids: HashMap::new(),
        }
    }

    /// The root menu bar, for platform attachment to the shell window.
    pub fn menu_bar(&self) -> &muda::Menu {
        &self.bar
    }

    /// Map a muda activation event back to the bridge token so the shell
    /// can fire the script-side callback for it.
    pub fn handle_for_menu_id(&self, id: &muda::MenuId) -> Option<Handle> {
        self.ids.get(id).copied()
    }

    /// Checked state after an activation toggled the native item.
    pub fn item_checked(&self, item: Handle) -> Option<bool> {
        self.items.get(&item).map(|i| i.is_checked())
    }
}

impl Default for MudaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuBackend for MudaBackend {
    fn add_root_menu(&mut self, handle: Handle, title: &str) {
        let submenu = muda::Submenu::new(title, true);
        if let Err(e) = self.bar.append(&submenu) {
            warn!("failed to append top-level menu {:?}: {}", title, e);
        }
        self.menus.insert(handle, submenu);
    }

    fn add_submenu(&mut self, parent: Handle, handle: Handle, title: &str) {
        let submenu = muda::Submenu::new(title, true);
        if let Some(parent) = self.menus.get(&parent) {
            if let Err(e) = parent.append(&submenu) {
                warn!("failed to append submenu {:?}: {}", title, e);
            }
        }
        self.menus.insert(handle, submenu);
    }

    fn add_item(&mut self, parent: Handle, handle: Handle, accelerator: Option<&str>) {
        // CheckMenuItem rather than MenuItem so updates can toggle the
        // checked state of any item, like the original host's actions.
        let item = muda::CheckMenuItem::new("", true, false, parse_accelerator(accelerator));
        if let Some(parent) = self.menus.get(&parent) {
            if let Err(e) = parent.append(&item) {
                warn!("failed to append menu item: {}", e);
            }
        }
        self.ids.insert(item.id().clone(), handle);
        self.items.insert(handle, item);
    }

    fn add_separator(&mut self, parent: Handle) {
        if let Some(parent) = self.menus.get(&parent) {
            let _ = parent.append(&muda::PredefinedMenuItem::separator());
        }
    }

    fn set_item_accelerator(&mut self, item: Handle, accelerator: Option<&str>) {
        if let Some(item) = self.items.get(&item) {
            if let Err(e) = item.set_accelerator(parse_accelerator(accelerator)) {
                warn!("failed to set accelerator {:?}: {}", accelerator, e);
            }
        }
    }

    fn update_item(&mut self, item: Handle, label: &str, enabled: bool, checked: bool) {
        if let Some(item) = self.items.get(&item) {
            item.set_text(label);
            item.set_enabled(enabled);
            item.set_checked(checked);
        }
    }

    fn remove_item(&mut self, parent: Handle, item: Handle) {
        if let Some(native) = self.items.remove(&item) {
            if let Some(parent) = self.menus.get(&parent) {
                let _ = parent.remove(&native);
            }
            self.ids.remove(native.id());
        }
    }
}
