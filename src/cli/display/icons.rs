//! Status icons for CLI output

use crate::domain::cluster::NodeReadiness;

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    /// Node is Ready
    pub const SUCCESS: &'static str = "✓";

    /// Node reports an unknown Ready condition
    pub const WARNING: &'static str = "⚠";

    /// Node is NotReady
    pub const ERROR: &'static str = "✗";

    pub fn for_readiness(readiness: NodeReadiness) -> &'static str {
        match readiness {
            NodeReadiness::Ready => Self::SUCCESS,
            NodeReadiness::NotReady => Self::ERROR,
            NodeReadiness::Unknown => Self::WARNING,
        }
    }
}
