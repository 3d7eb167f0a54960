//! Table rendering for CLI output

use super::{ColorTheme, StatusIcon};
use crate::domain::cluster::NodeSummary;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    /// Create a new table renderer with default theme
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    /// Render nodes as a formatted table
    pub fn render_nodes(&self, nodes: &[NodeSummary]) -> String {
        if nodes.is_empty() {
            return "No nodes registered yet".to_string();
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("NAME").set_alignment(CellAlignment::Left),
                Cell::new("STATUS").set_alignment(CellAlignment::Center),
                Cell::new("ROLES").set_alignment(CellAlignment::Left),
                Cell::new("VERSION").set_alignment(CellAlignment::Left),
                Cell::new("INTERNAL-IP").set_alignment(CellAlignment::Left),
            ]);

        for node in nodes {
            table.add_row(vec![
                Cell::new(&node.name),
                Cell::new(format!(
                    "{} {}",
                    StatusIcon::for_readiness(node.readiness),
                    node.readiness.as_str()
                ))
                .fg(self.theme.readiness_color(node.readiness)),
                Cell::new(node.roles_display()),
                Cell::new(&node.version),
                Cell::new(node.internal_ip.as_deref().unwrap_or("<none>")),
            ]);
        }

        let ready = nodes.iter().filter(|n| n.is_ready()).count();
        let summary = format!("[{}/{} ready]", ready, nodes.len());
        let summary = match self.theme.summary_color(ready, nodes.len()) {
            c if c == self.theme.success => summary.green(),
            c if c == self.theme.warning => summary.yellow(),
            c if c == self.theme.error => summary.red(),
            _ => summary.bright_black(),
        };

        let mut output = String::new();
        output.push_str(&format!("╭─ Nodes {} ─╮\n", summary));
        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&format!(
            "Legend: {} Ready  {} Unknown  {} NotReady\n",
            StatusIcon::SUCCESS.green(),
            StatusIcon::WARNING.yellow(),
            StatusIcon::ERROR.red()
        ));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::NodeReadiness;

    fn summary(name: &str, readiness: NodeReadiness) -> NodeSummary {
        NodeSummary {
            name: name.to_string(),
            readiness,
            roles: vec!["control-plane".to_string(), "master".to_string()],
            version: "v1.30.4+k3s1".to_string(),
            internal_ip: Some("10.0.0.5".to_string()),
        }
    }

    #[test]
    fn test_render_empty_nodes() {
        let renderer = TableRenderer::new();
        assert!(renderer.render_nodes(&[]).contains("No nodes registered yet"));
    }

    #[test]
    fn test_render_nodes() {
        colored::control::set_override(false);
        let renderer = TableRenderer::new();
        let output = renderer.render_nodes(&[
            summary("server-1", NodeReadiness::Ready),
            summary("agent-1", NodeReadiness::NotReady),
        ]);

        assert!(output.contains("server-1"));
        assert!(output.contains("agent-1"));
        assert!(output.contains("control-plane,master"));
        assert!(output.contains("v1.30.4+k3s1"));
        assert!(output.contains("10.0.0.5"));
        assert!(output.contains("[1/2 ready]"));
    }
}
