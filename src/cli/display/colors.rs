//! Color theme for CLI output

use crate::domain::cluster::NodeReadiness;
use comfy_table::Color as TableColor;

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: TableColor,
    pub warning: TableColor,
    pub error: TableColor,
    pub muted: TableColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: TableColor::Green,
            warning: TableColor::Yellow,
            error: TableColor::Red,
            muted: TableColor::DarkGrey,
        }
    }
}

impl ColorTheme {
    /// Get color for a node's Ready condition
    pub fn readiness_color(&self, readiness: NodeReadiness) -> TableColor {
        match readiness {
            NodeReadiness::Ready => self.success,
            NodeReadiness::NotReady => self.error,
            NodeReadiness::Unknown => self.warning,
        }
    }

    /// Get color for a ready/total node count
    pub fn summary_color(&self, ready: usize, total: usize) -> TableColor {
        if total == 0 {
            self.muted
        } else if ready == total {
            self.success
        } else if ready > 0 {
            self.warning
        } else {
            self.error
        }
    }
}
