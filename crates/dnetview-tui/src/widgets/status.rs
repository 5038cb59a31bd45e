//! Node liveness indicator — ●/◐/○/◌ with color mapping.

use ratatui::style::Style;
use ratatui::text::Span;

use dnetview_core::NodeView;

use crate::theme;

/// Symbol and color for a node's reachability.
///
/// Pending (never polled) and stale (failing, showing old data) are told
/// apart from plain unreachable so the operator can read the tree at a
/// glance.
fn indicator(node: &NodeView) -> (&'static str, ratatui::style::Color) {
    if node.is_online() {
        ("●", theme::SUCCESS_GREEN)
    } else if node.is_pending() {
        ("◌", theme::DIM_WHITE)
    } else if node.is_stale() {
        ("◐", theme::ELECTRIC_YELLOW)
    } else {
        ("○", theme::ERROR_RED)
    }
}

pub fn liveness_span(node: &NodeView) -> Span<'static> {
    let (symbol, color) = indicator(node);
    Span::styled(symbol, Style::default().fg(color))
}

/// Short textual status for the detail pane.
pub fn liveness_label(node: &NodeView) -> &'static str {
    if node.is_online() {
        "online"
    } else if node.is_pending() {
        "pending"
    } else if node.is_stale() {
        "unreachable (stale data)"
    } else {
        "unreachable"
    }
}
