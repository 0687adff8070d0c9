//! Window switcher overlay.
//!
//! Model only. The renderer draws `entries` and highlights `selected`.

use serde::Serialize;

use crate::view::ViewId;
use crate::Core;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsdEntry {
    pub view: ViewId,
    pub title: String,
    pub app_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Osd {
    pub visible: bool,
    /// Candidates in cycle order.
    pub entries: Vec<OsdEntry>,
    pub selected: Option<usize>,
}

impl Osd {
    pub fn selected_entry(&self) -> Option<&OsdEntry> {
        self.selected.and_then(|index| self.entries.get(index))
    }
}

impl Core {
    /// Rebuild the overlay from the cycle state; hidden when not cycling.
    pub fn osd_update(&mut self) {
        let Some(cycle_view) = self.state.cycle_view else {
            self.state.osd = Osd::default();
            return;
        };

        let entries: Vec<OsdEntry> = self
            .cycle_candidates()
            .into_iter()
            .filter_map(|id| self.state.view(id))
            .map(|view| OsdEntry {
                view: view.id,
                title: view.title.clone(),
                app_id: view.app_id.clone(),
            })
            .collect();
        let selected = entries.iter().position(|entry| entry.view == cycle_view);

        self.state.osd = Osd {
            visible: true,
            entries,
            selected,
        };
    }
}
