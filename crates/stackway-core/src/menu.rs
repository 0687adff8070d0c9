//! Menus.
//!
//! Only the model lives here: which menus exist, which one is open and
//! where, and which view opened it. Drawing and keyboard navigation are up
//! to the renderer.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::action::ActionList;
use crate::config::{default_client_menu, MenuConfig};
use crate::interactive::ResizeEdges;
use crate::ssd::SsdPartType;
use crate::view::ViewId;
use crate::Core;

pub const ROOT_MENU: &str = "root-menu";
pub const CLIENT_MENU: &str = "client-menu";

#[derive(Debug, Clone)]
pub struct MenuItem {
    pub label: String,
    pub actions: ActionList,
}

#[derive(Debug, Clone)]
pub struct Menu {
    pub id: String,
    pub label: String,
    pub items: Vec<MenuItem>,
    /// View the menu was opened for; cleared when that view is destroyed.
    pub triggered_by_view: Option<ViewId>,
}

impl Menu {
    fn from_config(config: &MenuConfig) -> Self {
        Self {
            id: config.id.clone(),
            label: config.label.clone(),
            items: config
                .items
                .iter()
                .map(|item| MenuItem {
                    label: item.label.clone(),
                    actions: ActionList::from_config(&item.actions),
                })
                .collect(),
            triggered_by_view: None,
        }
    }
}

/// Position of the open menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMenu {
    pub id: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Default)]
pub struct MenuRegistry {
    menus: IndexMap<String, Menu>,
    open: Option<OpenMenu>,
}

impl MenuRegistry {
    /// Build menus from config. The client menu is always present.
    pub fn from_config(configs: &[MenuConfig]) -> Self {
        let mut menus = IndexMap::new();
        for config in configs {
            if menus.contains_key(&config.id) {
                warn!("Duplicate menu '{}', keeping the first", config.id);
                continue;
            }
            menus.insert(config.id.clone(), Menu::from_config(config));
        }
        if !menus.contains_key(CLIENT_MENU) {
            let client_menu = default_client_menu();
            menus.insert(client_menu.id.clone(), Menu::from_config(&client_menu));
        }
        Self { menus, open: None }
    }

    pub fn get(&self, id: &str) -> Option<&Menu> {
        self.menus.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Menu> {
        self.menus.get_mut(id)
    }

    pub fn open_menu(&self) -> Option<&OpenMenu> {
        self.open.as_ref()
    }

    /// Open `id` at a layout position, closing any other menu.
    pub fn open(&mut self, id: &str, x: i32, y: i32) -> bool {
        if !self.menus.contains_key(id) {
            return false;
        }
        self.open = Some(OpenMenu {
            id: id.to_string(),
            x,
            y,
        });
        true
    }

    pub fn close(&mut self) -> Option<OpenMenu> {
        self.open.take()
    }

    /// Clear every reference to a view that is being destroyed.
    pub fn forget_view(&mut self, view: ViewId) {
        for menu in self.menus.values_mut() {
            if menu.triggered_by_view == Some(view) {
                menu.triggered_by_view = None;
            }
        }
    }

    /// Menus that still refer to a view.
    pub fn triggering_views(&self) -> impl Iterator<Item = (&str, ViewId)> {
        self.menus
            .values()
            .filter_map(|menu| menu.triggered_by_view.map(|view| (menu.id.as_str(), view)))
    }
}

// ── Placement ────────────────────────────────────────────────────────

/// Where `ShowMenu` anchors a menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAnchor {
    Cursor,
    /// Top-left corner of the view's client area.
    ViewTopLeft,
}

/// Coarse classification of the decoration part under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitRegion {
    WindowMenuButton,
    Titlebar,
    Other,
}

impl HitRegion {
    pub fn classify(part: SsdPartType) -> Self {
        if part == SsdPartType::ButtonWindowMenu {
            Self::WindowMenuButton
        } else if SsdPartType::Titlebar.contains(part) {
            Self::Titlebar
        } else {
            Self::Other
        }
    }
}

/// Client-menu placement by hit region. A menu opened from the titlebar
/// follows the cursor; the window-menu button and everything else (key
/// bindings included) anchor it to the view.
const CLIENT_MENU_PLACEMENT: [(HitRegion, MenuAnchor); 3] = [
    (HitRegion::WindowMenuButton, MenuAnchor::ViewTopLeft),
    (HitRegion::Titlebar, MenuAnchor::Cursor),
    (HitRegion::Other, MenuAnchor::ViewTopLeft),
];

/// Anchor for `menu_id`, given what the cursor is over.
pub fn menu_anchor(menu_id: &str, hit: Option<SsdPartType>) -> MenuAnchor {
    if menu_id != CLIENT_MENU {
        return MenuAnchor::Cursor;
    }
    let region = hit.map_or(HitRegion::Other, HitRegion::classify);
    CLIENT_MENU_PLACEMENT
        .iter()
        .find(|(candidate, _)| *candidate == region)
        .map_or(MenuAnchor::ViewTopLeft, |&(_, anchor)| anchor)
}

impl Core {
    /// Open a menu for `view`. Unknown menus and a client menu without a
    /// view are ignored.
    pub fn show_menu(&mut self, view: Option<ViewId>, menu_id: Option<&str>) {
        let Some(menu_id) = menu_id else {
            return;
        };
        if self.state.menus.get(menu_id).is_none() {
            debug!("No menu named '{}'", menu_id);
            return;
        }

        let (cx, cy) = self.state.cursor;
        let cursor = (cx.floor() as i32, cy.floor() as i32);
        let (x, y) = if menu_id == CLIENT_MENU {
            let Some(view_id) = view else {
                return;
            };
            let Some(target) = self.state.view(view_id) else {
                return;
            };
            let hit = self.desktop_view_at(cx, cy).and_then(|(under, part)| {
                (under == view_id).then_some(part)
            });
            match menu_anchor(menu_id, hit) {
                MenuAnchor::Cursor => cursor,
                MenuAnchor::ViewTopLeft => (target.geometry.x, target.geometry.y),
            }
        } else {
            cursor
        };

        if let Some(menu) = self.state.menus.get_mut(menu_id) {
            menu.triggered_by_view = view;
        }
        self.state.menus.open(menu_id, x, y);
        debug!("Opened menu '{}' at {},{}", menu_id, x, y);
    }

    pub fn menu_close(&mut self) {
        self.state.menus.close();
    }

    /// Activate an item of the open menu: close the menu, then run the
    /// item's actions against the view that opened it.
    pub fn menu_item_select(&mut self, index: usize) {
        let Some(open) = self.state.menus.close() else {
            return;
        };
        let Some(menu) = self.state.menus.get(&open.id) else {
            return;
        };
        let Some(item) = menu.items.get(index) else {
            debug!("Menu '{}' has no item {}", open.id, index);
            return;
        };
        let actions = item.actions.clone();
        let activator = menu.triggered_by_view;
        self.dispatch_actions(activator, &actions, ResizeEdges::empty());
    }
}
