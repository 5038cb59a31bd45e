//! Rendering: topology tree on the left, focused entity on the right,
//! status bar along the bottom.
//!
//! The tree is flattened into [`TreeRow`]s first (pure, tested), then drawn.

use chrono::{DateTime, Utc};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use dnetview_core::{
    Connection, Focus, MessageDirection, NavigationPath, NavigationState, NodeView, Session,
    Snapshot,
};

use crate::theme;
use crate::widgets::status::{liveness_label, liveness_span};
use crate::widgets::time_fmt::{fmt_ago, fmt_ago_opt, fmt_clock};

// ── Tree rows ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Node,
    Session,
    Connection,
}

/// One line of the flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub path: NavigationPath,
    pub kind: RowKind,
    pub label: String,
    /// Belongs to a node whose last poll failed.
    pub stale: bool,
}

/// Flatten `snapshot` in navigation order: nodes in configuration order,
/// each followed by its sessions and their connections.
pub fn tree_rows(snapshot: &Snapshot) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    for node in snapshot.nodes() {
        let stale = node.is_unreachable();
        rows.push(TreeRow {
            path: NavigationPath::node(node.id.clone()),
            kind: RowKind::Node,
            label: node_label(node),
            stale,
        });

        for session in node.sessions.values() {
            rows.push(TreeRow {
                path: NavigationPath::session(node.id.clone(), session.kind),
                kind: RowKind::Session,
                label: session_label(session),
                stale,
            });

            for conn in session.connections.values() {
                rows.push(TreeRow {
                    path: NavigationPath::connection(
                        node.id.clone(),
                        session.kind,
                        conn.key.clone(),
                    ),
                    kind: RowKind::Connection,
                    label: connection_label(conn),
                    stale,
                });
            }
        }
    }
    rows
}

/// Index of the row for `focus`.
pub fn selected_row(rows: &[TreeRow], focus: &NavigationPath) -> Option<usize> {
    rows.iter().position(|row| &row.path == focus)
}

fn node_label(node: &NodeView) -> String {
    let mut label = format!("{} [{}]", node.title, node.kind);
    if node.last_error.is_some() {
        label.push_str(" !");
    }
    label
}

fn session_label(session: &Session) -> String {
    format!("{} ({})", session.kind, session.connections.len())
}

fn connection_label(conn: &Connection) -> String {
    match &conn.last_message {
        Some(msg) => format!(
            "{}  {}  {} {}",
            conn.remote_addr,
            conn.state,
            direction_arrow(msg.direction),
            msg.command
        ),
        None => format!("{}  {}", conn.remote_addr, conn.state),
    }
}

fn direction_arrow(direction: MessageDirection) -> &'static str {
    match direction {
        MessageDirection::Sent => "→",
        MessageDirection::Received => "←",
    }
}

// ── Detail pane ──────────────────────────────────────────────────────

fn field(name: &'static str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{name:<14}"), theme::label()),
        Span::styled(value.into(), theme::value()),
    ])
}

/// Detail lines for the focused entity.
pub fn detail_lines(focus: &Focus<'_>, now: DateTime<Utc>) -> Vec<Line<'static>> {
    let node = focus.node();
    match *focus {
        Focus::Node(node) => {
            let mut lines = vec![
                field("Node", node.title.clone()),
                field("Id", node.id.to_string()),
                field("Kind", node.kind.to_string()),
                Line::from(vec![
                    Span::styled(format!("{:<14}", "Status"), theme::label()),
                    liveness_span(node),
                    Span::styled(format!(" {}", liveness_label(node)), theme::value()),
                ]),
                field("Last seen", fmt_ago_opt(node.last_seen, now)),
                field("Sessions", node.sessions.len().to_string()),
                field("Connections", node.connection_count().to_string()),
            ];
            if let Some(err) = &node.last_error {
                lines.push(field("Failures", node.consecutive_failures.to_string()));
                lines.push(Line::from(vec![
                    Span::styled(format!("{:<14}", "Last error"), theme::label()),
                    Span::styled(err.clone(), theme::error_text()),
                ]));
            }
            lines
        }
        Focus::Session { session, .. } => vec![
            field("Node", node.title.clone()),
            field("Session", session.kind.to_string()),
            field("Connections", session.connections.len().to_string()),
        ],
        Focus::Connection {
            session,
            connection,
            ..
        } => {
            let mut lines = vec![
                field("Node", node.title.clone()),
                field("Session", session.kind.to_string()),
                field("Remote", connection.remote_addr.clone()),
                field("Key", connection.key.to_string()),
                field("State", connection.state.clone()),
                field("First seen", fmt_ago(connection.first_seen, now)),
                field("Updated", fmt_ago(connection.last_updated, now)),
            ];
            match &connection.last_message {
                Some(msg) => {
                    lines.push(field(
                        "Last message",
                        format!("{} {}", direction_arrow(msg.direction), msg.command),
                    ));
                    lines.push(field("  at", fmt_ago(msg.timestamp, now)));
                }
                None => lines.push(field("Last message", "none")),
            }
            lines
        }
    }
}

// ── Frame ────────────────────────────────────────────────────────────

/// Draw the whole frame.
pub fn render(frame: &mut Frame, nav: &NavigationState, help_visible: bool) {
    let now = Utc::now();
    let [main, status] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());
    let [tree_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(main);

    render_tree(frame, tree_area, nav);
    render_detail(frame, detail_area, nav, now);
    render_status_bar(frame, status, nav.snapshot(), now);

    if help_visible {
        render_help_overlay(frame, frame.area());
    }
}

fn panel(title: &str, focused: bool) -> Block<'static> {
    Block::default()
        .title(format!(" {title} "))
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(if focused {
            theme::border_focused()
        } else {
            theme::border_default()
        })
}

fn render_tree(frame: &mut Frame, area: Rect, nav: &NavigationState) {
    let snapshot = nav.snapshot();
    let rows = tree_rows(snapshot);

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let indent = "  ".repeat(row.path.depth());
            let style = if row.stale {
                theme::row_stale()
            } else {
                theme::row_normal()
            };
            let mut spans = vec![Span::raw(indent)];
            if row.kind == RowKind::Node {
                if let Some(node) = snapshot.node(row.path.node_id()) {
                    spans.push(liveness_span(node));
                    spans.push(Span::raw(" "));
                }
            }
            spans.push(Span::styled(row.label.clone(), style));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let mut state = ListState::default().with_selected(selected_row(&rows, nav.current_focus()));
    let list = List::new(items)
        .block(panel("Topology", true))
        .highlight_style(theme::row_selected())
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_detail(frame: &mut Frame, area: Rect, nav: &NavigationState, now: DateTime<Utc>) {
    // An unresolvable focus is already logged by `resolve`.
    let lines = match nav.resolve() {
        Ok(focus) => detail_lines(&focus, now),
        Err(e) => vec![Line::from(Span::styled(e.to_string(), theme::error_text()))],
    };

    let paragraph = Paragraph::new(lines)
        .block(panel(&nav.current_focus().to_string(), false))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, area: Rect, snapshot: &Snapshot, now: DateTime<Utc>) {
    let published = snapshot.published_at().map_or_else(
        || "waiting for first round".to_owned(),
        |at| format!("{} ({})", fmt_clock(at), fmt_ago(at, now)),
    );

    let mut spans = vec![
        Span::styled(format!(" seq {} ", snapshot.seq()), theme::status_bar()),
        Span::styled("│ ", theme::key_hint()),
        Span::styled(published, theme::status_bar()),
        Span::styled(" │ ", theme::key_hint()),
        Span::styled(
            format!("{} online", snapshot.online_count()),
            Style::default().fg(theme::SUCCESS_GREEN),
        ),
        Span::raw(" "),
        Span::styled(
            format!("{} unreachable", snapshot.unreachable_count()),
            Style::default().fg(theme::CORAL),
        ),
    ];
    let pending = snapshot.pending_count();
    if pending > 0 {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("{pending} pending"),
            Style::default().fg(theme::ELECTRIC_YELLOW),
        ));
    }
    spans.extend([
        Span::styled(" │ ", theme::key_hint()),
        Span::styled("? ", theme::key_hint_key()),
        Span::styled("help  ", theme::key_hint()),
        Span::styled("q ", theme::key_hint_key()),
        Span::styled("quit", theme::key_hint()),
    ]);

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = 44u16.min(area.width.saturating_sub(4));
    let height = 11u16.min(area.height.saturating_sub(2));
    let help_area = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    );

    frame.render_widget(Clear, help_area);
    let block = panel("Keyboard Shortcuts", true).style(Style::default().bg(theme::BG_DARK));
    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let hint = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {keys:<14}"), theme::key_hint_key()),
            Span::styled(what, theme::key_hint()),
        ])
    };
    let text = vec![
        Line::from(""),
        hint("↑ k", "Previous sibling"),
        hint("↓ j", "Next sibling"),
        hint("→ l Enter", "Open"),
        hint("← h Esc", "Back to parent"),
        hint("?", "Toggle this help"),
        hint("q Ctrl+c", "Quit"),
        Line::from(""),
        Line::from(Span::styled("  Dimmed nodes show stale data", theme::key_hint())),
    ];
    frame.render_widget(Paragraph::new(text), inner);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use url::Url;

    use dnetview_core::{
        Batch, ConnectionKey, FetchOutcome, Message, MonitorConfig, NodeConfig, NodeFetch,
        NodeKind, NodeState, ObservedConnection, ObservedSession, SessionKind, StalePolicy,
        reconcile,
    };

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn config() -> MonitorConfig {
        let url = Url::parse("http://127.0.0.1:1").unwrap();
        MonitorConfig::new(vec![
            NodeConfig::new("a", url.clone()).with_title("alpha"),
            NodeConfig::new("b", url).with_kind(NodeKind::Lilith),
        ])
    }

    fn observed(sessions: &[(SessionKind, &[&str])]) -> NodeState {
        NodeState {
            sessions: sessions
                .iter()
                .map(|(kind, addrs)| {
                    let connections = addrs
                        .iter()
                        .map(|addr| {
                            (
                                ConnectionKey::from(*addr),
                                ObservedConnection {
                                    remote_addr: (*addr).to_owned(),
                                    state: "connected".into(),
                                    last_message: Some(Message {
                                        direction: MessageDirection::Received,
                                        command: "ping".into(),
                                        timestamp: ts(-2),
                                    }),
                                },
                            )
                        })
                        .collect::<BTreeMap<_, _>>();
                    (*kind, ObservedSession { connections })
                })
                .collect(),
        }
    }

    fn snapshot_after(outcomes: Vec<(&str, FetchOutcome)>) -> Snapshot {
        let initial = Snapshot::initial(&config());
        let batch = Batch {
            started_at: ts(0),
            completed_at: ts(0),
            entries: outcomes
                .into_iter()
                .map(|(id, outcome)| NodeFetch {
                    node: id.into(),
                    outcome,
                    elapsed: Duration::from_millis(5),
                })
                .collect(),
        };
        reconcile(&initial, &batch, StalePolicy::RetainForever).snapshot
    }

    #[test]
    fn rows_follow_navigation_order() {
        let snap = snapshot_after(vec![
            (
                "a",
                FetchOutcome::Success(observed(&[
                    (SessionKind::Seed, &["9.9.9.9:1"]),
                    (SessionKind::Outbound, &["5.6.7.8:1", "1.2.3.4:9000"]),
                ])),
            ),
            ("b", FetchOutcome::ConnectionError("refused".into())),
        ]);

        let rows = tree_rows(&snap);
        let labels: Vec<(usize, &str)> = rows
            .iter()
            .map(|r| (r.path.depth(), r.label.as_str()))
            .collect();

        assert_eq!(
            labels,
            vec![
                (0, "alpha [NORMAL]"),
                (1, "Outbound (2)"),
                (2, "1.2.3.4:9000  connected  ← ping"),
                (2, "5.6.7.8:1  connected  ← ping"),
                (1, "Seed (1)"),
                (2, "9.9.9.9:1  connected  ← ping"),
                (0, "b [LILITH] !"),
            ]
        );
        assert!(rows.iter().take(6).all(|r| !r.stale));
        assert!(rows[6].stale);
    }

    #[test]
    fn selected_row_tracks_focus() {
        let snap = snapshot_after(vec![(
            "a",
            FetchOutcome::Success(observed(&[(SessionKind::Inbound, &["7.7.7.7:1"])])),
        )]);
        let rows = tree_rows(&snap);

        let focus =
            NavigationPath::connection("a".into(), SessionKind::Inbound, "7.7.7.7:1".into());
        assert_eq!(selected_row(&rows, &focus), Some(2));
        assert_eq!(selected_row(&rows, &NavigationPath::node("b".into())), Some(3));
        assert_eq!(selected_row(&rows, &NavigationPath::node("zz".into())), None);
    }

    #[test]
    fn pending_node_is_not_dimmed() {
        let snap = snapshot_after(vec![("a", FetchOutcome::ConnectionError("refused".into()))]);
        let rows = tree_rows(&snap);

        assert_eq!(rows.len(), 2);
        assert!(rows[0].stale);
        assert!(snap.node(&"b".into()).unwrap().is_pending());
        assert!(!rows[1].stale);
        assert_eq!((snap.unreachable_count(), snap.pending_count()), (1, 1));
    }

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect()
    }

    #[test]
    fn unreachable_node_detail_shows_error() {
        let snap = snapshot_after(vec![("b", FetchOutcome::Timeout)]);
        let node = snap.node(&"b".into()).unwrap();

        let lines = text(&detail_lines(&Focus::Node(node), ts(10)));
        assert!(lines.iter().any(|l| l.contains("unreachable")));
        assert!(lines.iter().any(|l| l.contains("fetch timed out")));
        assert!(lines.iter().any(|l| l.starts_with("Last seen") && l.ends_with("never")));
    }

    #[test]
    fn connection_detail_shows_last_message() {
        let snap = snapshot_after(vec![(
            "a",
            FetchOutcome::Success(observed(&[(SessionKind::Outbound, &["1.2.3.4:9000"])])),
        )]);
        let node = snap.node(&"a".into()).unwrap();
        let session = node.session(SessionKind::Outbound).unwrap();
        let connection = session.connection(&"1.2.3.4:9000".into()).unwrap();

        let focus = Focus::Connection {
            node,
            session,
            connection,
        };
        let lines = text(&detail_lines(&focus, ts(10)));

        assert!(lines.contains(&format!("{:<14}1.2.3.4:9000", "Remote")));
        assert!(lines.contains(&format!("{:<14}← ping", "Last message")));
        assert!(lines.contains(&format!("{:<14}10s ago", "First seen")));
        assert!(lines.contains(&format!("{:<14}12s ago", "  at")));
    }
}
