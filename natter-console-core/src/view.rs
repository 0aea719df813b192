//! Exclusive panel visibility with back-navigation.
//!
//! Transitions are pure: every call returns the next [`ViewState`].

use std::collections::BTreeSet;
use std::fmt;

/// Top-level console views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Panel {
    Services,
    NewService,
    ServiceDetails,
    Help,
    Templates,
    Groups,
    IyuuSettings,
}

impl Panel {
    pub const ALL: [Panel; 7] = [
        Panel::Services,
        Panel::NewService,
        Panel::ServiceDetails,
        Panel::Help,
        Panel::Templates,
        Panel::Groups,
        Panel::IyuuSettings,
    ];

    /// Transient panels that remember where they were opened from.
    pub fn is_returnable(&self) -> bool {
        matches!(
            self,
            Panel::Help | Panel::Templates | Panel::Groups | Panel::IyuuSettings
        )
    }

    pub fn title(&self) -> &'static str {
        match self {
            Panel::Services => "SERVICES",
            Panel::NewService => "NEW SERVICE",
            Panel::ServiceDetails => "SERVICE DETAILS",
            Panel::Help => "HELP",
            Panel::Templates => "TEMPLATES",
            Panel::Groups => "GROUPS",
            Panel::IyuuSettings => "IYUU SETTINGS",
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Visible panel set plus the snapshot a transient panel returns to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    visible: BTreeSet<Panel>,
    previous: Option<BTreeSet<Panel>>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            visible: services_view(),
            previous: None,
        }
    }
}

/// The services list is always shown together with the new-service form.
fn services_view() -> BTreeSet<Panel> {
    [Panel::Services, Panel::NewService].into_iter().collect()
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `panel`, hiding everything else. Returnable panels keep a
    /// snapshot of the current view for [`ViewState::hide`].
    pub fn show(&self, panel: Panel) -> ViewState {
        if panel.is_returnable() {
            if self.is_visible(panel) {
                return self.clone();
            }
            return ViewState {
                visible: [panel].into_iter().collect(),
                previous: Some(self.visible.clone()),
            };
        }
        let visible = match panel {
            Panel::ServiceDetails => [Panel::ServiceDetails].into_iter().collect(),
            _ => services_view(),
        };
        ViewState {
            visible,
            previous: None,
        }
    }

    /// Hide `panel`, restoring whatever was visible before it was opened.
    /// Without a snapshot this resolves to the services list.
    pub fn hide(&self, panel: Panel) -> ViewState {
        if !self.is_visible(panel) {
            return self.clone();
        }
        let restored = self
            .previous
            .clone()
            .filter(|prev| !prev.is_empty() && !prev.contains(&panel));
        match restored {
            Some(visible) => ViewState {
                visible,
                previous: None,
            },
            None => ViewState::default(),
        }
    }

    pub fn is_visible(&self, panel: Panel) -> bool {
        self.visible.contains(&panel)
    }

    /// The panel that owns the main content area.
    pub fn active(&self) -> Panel {
        self.visible
            .iter()
            .copied()
            .find(|p| *p != Panel::NewService)
            .unwrap_or(Panel::Services)
    }

    #[cfg(test)]
    pub fn has_snapshot(&self) -> bool {
        self.previous.is_some()
    }

    /// Number of primary views visible; the services list and its form count as one.
    #[cfg(test)]
    pub fn primary_count(&self) -> usize {
        let mut count = self
            .visible
            .iter()
            .filter(|p| !matches!(p, Panel::Services | Panel::NewService))
            .count();
        if self.is_visible(Panel::Services) || self.is_visible(Panel::NewService) {
            count += 1;
        }
        count
    }
}
