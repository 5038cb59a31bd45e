//! Application core — event loop and action dispatch.

use std::time::Duration;

use color_eyre::eyre::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use dnetview_core::{Monitor, NavCommand, NavOutcome, NavigationState, Rebind};

use crate::action::Action;
use crate::event::{Event, EventReader};
use crate::keymap::map_key;
use crate::tui::Tui;
use crate::view;

/// Top-level application state and event loop.
pub struct App {
    monitor: Monitor,
    /// Cursor plus the snapshot it is bound to; everything drawn comes
    /// from here.
    nav: NavigationState,
    running: bool,
    help_visible: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    data_cancel: CancellationToken,
}

impl App {
    pub fn new(monitor: Monitor) -> Result<Self> {
        let nav = NavigationState::new(monitor.snapshot())?;
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        Ok(Self {
            monitor,
            nav,
            running: true,
            help_visible: false,
            action_tx,
            action_rx,
            data_cancel: CancellationToken::new(),
        })
    }

    /// Run the main event loop until the user quits.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;

        let bridge = tokio::spawn(crate::data_bridge::spawn_data_bridge(
            self.monitor.clone(),
            self.action_tx.clone(),
            self.data_cancel.clone(),
        ));

        // 4 Hz keeps "Ns ago" labels current without burning CPU.
        let mut events = EventReader::new(Duration::from_millis(250));

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = map_key(key) {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize => self.action_tx.send(Action::Resize)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            let mut redraw = false;
            while let Ok(action) = self.action_rx.try_recv() {
                redraw |= self.process_action(action);
            }
            if redraw {
                let (nav, help_visible) = (&self.nav, self.help_visible);
                tui.draw(|frame| view::render(frame, nav, help_visible))?;
            }
        }

        events.stop();
        self.data_cancel.cancel();
        if let Err(e) = bridge.await {
            warn!(error = %e, "data bridge task failed");
        }
        info!("TUI event loop ended");
        Ok(())
    }

    /// Apply one action. Returns whether the frame needs redrawing.
    fn process_action(&mut self, action: Action) -> bool {
        match action {
            Action::Render | Action::Resize => true,

            Action::ToggleHelp => {
                self.help_visible = !self.help_visible;
                true
            }

            Action::Navigate(command) => {
                if self.help_visible && command != NavCommand::Quit {
                    // Any other navigation key closes the overlay first.
                    self.help_visible = false;
                    return true;
                }
                match self.nav.apply(command) {
                    NavOutcome::Quit => {
                        self.running = false;
                        false
                    }
                    NavOutcome::Moved => {
                        debug!(focus = %self.nav.current_focus(), "focus moved");
                        true
                    }
                    NavOutcome::Unchanged => false,
                }
            }

            Action::SnapshotPublished(snapshot) => {
                let seq = snapshot.seq();
                match self.nav.rebind(snapshot) {
                    Ok(Rebind::Kept) => {}
                    Ok(Rebind::Ancestor { lost }) => {
                        debug!(
                            seq,
                            %lost,
                            focus = %self.nav.current_focus(),
                            "focus retargeted to parent"
                        );
                    }
                    Ok(Rebind::FirstNode { lost }) => {
                        error!(seq, %lost, "focused node missing from snapshot, focus reset");
                    }
                    Err(e) => error!(seq, error = %e, "cannot bind navigation to snapshot"),
                }
                true
            }

            Action::MonitorStopped => {
                if self.running {
                    warn!("monitor stopped while the UI is still running");
                }
                false
            }
        }
    }
}
