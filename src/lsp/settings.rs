use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::LspConfig;

/// Runtime switches toggled by configuration changes and show/hide commands
#[derive(Debug)]
pub struct AppSettings {
    show_version_lenses: AtomicBool,
    show_dependency_statuses: AtomicBool,
    in_progress: AtomicBool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from_config(&LspConfig::default())
    }
}

impl AppSettings {
    pub fn from_config(config: &LspConfig) -> Self {
        Self {
            show_version_lenses: AtomicBool::new(config.show_version_lenses),
            show_dependency_statuses: AtomicBool::new(config.show_dependency_statuses),
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn apply(&self, config: &LspConfig) {
        self.set_show_version_lenses(config.show_version_lenses);
        self.set_show_dependency_statuses(config.show_dependency_statuses);
    }

    pub fn show_version_lenses(&self) -> bool {
        self.show_version_lenses.load(Ordering::Relaxed)
    }

    pub fn set_show_version_lenses(&self, value: bool) {
        self.show_version_lenses.store(value, Ordering::Relaxed);
    }

    pub fn show_dependency_statuses(&self) -> bool {
        self.show_dependency_statuses.load(Ordering::Relaxed)
    }

    pub fn set_show_dependency_statuses(&self, value: bool) {
        self.show_dependency_statuses.store(value, Ordering::Relaxed);
    }

    /// True while a lens request is generating
    pub fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Relaxed)
    }

    pub fn set_in_progress(&self, value: bool) {
        self.in_progress.store(value, Ordering::Relaxed);
    }
}
