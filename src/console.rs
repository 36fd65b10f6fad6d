// Operator console — drives the overlay from poller updates, stdin commands,
// and the overlay's own timers.
//
// One select loop, one task. The poller runs its interval in the background
// and publishes views; everything the operator sees is rendered here.

use std::time::Instant;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::api::models::{QuickAction, ResponseValue};
use crate::output::terminal;
use crate::sos::dispatcher::ResponseDispatcher;
use crate::sos::overlay::{AlertOverlay, OverlayCommand, OverlayPhase};
use crate::sos::poller::{AlertPoller, AlertView};

/// A parsed line of operator input.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorInput {
    Drag(u8),
    Action(QuickAction),
    Dismiss,
    /// Silence the siren without dismissing.
    Mute,
    Refresh,
    List,
    Help,
    Quit,
    Unknown(String),
}

/// Parse one line typed by the operator.
pub fn parse_input(line: &str) -> OperatorInput {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return OperatorInput::Unknown(String::new());
    };

    match cmd.to_ascii_lowercase().as_str() {
        "d" | "drag" => match parts.next().map(str::parse::<u32>) {
            Some(Ok(v)) => OperatorInput::Drag(v.min(100) as u8),
            _ => OperatorInput::Unknown(line.trim().to_string()),
        },
        "a" | "ack" => OperatorInput::Action(QuickAction::Acknowledged),
        "h" | "help-dispatch" | "dispatch" => OperatorInput::Action(QuickAction::DispatchingHelp),
        "m" | "map" => OperatorInput::Action(QuickAction::ViewMap),
        "c" | "call" => OperatorInput::Action(QuickAction::Call),
        "x" | "dismiss" => OperatorInput::Dismiss,
        "s" | "mute" => OperatorInput::Mute,
        "r" | "refresh" => OperatorInput::Refresh,
        "l" | "list" => OperatorInput::List,
        "?" | "help" => OperatorInput::Help,
        "q" | "quit" | "exit" => OperatorInput::Quit,
        _ => OperatorInput::Unknown(line.trim().to_string()),
    }
}

/// Drag-to-confirm control rendered as a progress bar.
struct DragBar {
    bar: Option<ProgressBar>,
}

impl DragBar {
    fn new() -> Self {
        Self { bar: None }
    }

    fn set(&mut self, value: u8) {
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::with_template("  Slide to respond [{bar:40.red/white}] {pos:>3}%")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar
        });
        bar.set_position(value as u64);
    }

    fn clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

pub struct Console {
    poller: AlertPoller,
    dispatcher: ResponseDispatcher,
    overlay: AlertOverlay,
    drag_bar: DragBar,
    /// Phase and alert id of the last rendered overlay.
    last_render: (OverlayPhase, Option<String>),
    last_counts: Option<(usize, usize)>,
}

impl Console {
    pub fn new(poller: AlertPoller, dispatcher: ResponseDispatcher) -> Self {
        Self {
            poller,
            dispatcher,
            overlay: AlertOverlay::new(),
            drag_bar: DragBar::new(),
            last_render: (OverlayPhase::Hidden, None),
            last_counts: None,
        }
    }

    /// Watch `event_id` until the operator quits, stdin closes, or Ctrl-C.
    pub async fn run(mut self, event_id: &str) -> Result<()> {
        self.poller.start_polling(event_id);
        let mut views = self.poller.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!(
            "Watching event {}. Type {} for commands.",
            event_id.bold(),
            "?".bold()
        );

        loop {
            let deadline = self.overlay.next_deadline(Instant::now());
            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                changed = views.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let view = views.borrow_and_update().clone();
                    self.on_view(&view, Instant::now());
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if !self.on_input(parse_input(&line), Instant::now()).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = timer => self.on_timer(Instant::now()).await,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            }
        }

        self.drag_bar.clear();
        self.poller.stop_polling();
        Ok(())
    }

    pub fn overlay(&self) -> &AlertOverlay {
        &self.overlay
    }

    /// Follow a new poller view. A responding overlay is never replaced;
    /// the next alert shows once the response is settled.
    pub fn on_view(&mut self, view: &AlertView, now: Instant) {
        let counts = (view.unread_count, view.alerts.len());
        if view.polling && self.last_counts != Some(counts) {
            self.last_counts = Some(counts);
            if let Some(event_id) = &view.event_id {
                terminal::display_status_line(event_id, counts.0, counts.1);
            }
        }

        let responding = self.overlay.phase(now) == OverlayPhase::Responding;

        match &view.latest_alert {
            Some(alert) if !responding => {
                self.overlay.show(alert.clone(), now);
            }
            None if self.overlay.alert().is_some() && !responding => {
                debug!("Presented alert cleared");
                self.overlay.hide();
            }
            _ => {}
        }
        self.render_if_changed(now);
    }

    /// The overlay's deadline passed: emit any pending response.
    pub async fn on_timer(&mut self, now: Instant) {
        let commands = self.overlay.poll(now);
        self.execute(commands).await;
        self.render_if_changed(now);
    }

    /// Handle one operator command. Returns false to quit.
    pub async fn on_input(&mut self, input: OperatorInput, now: Instant) -> bool {
        match input {
            OperatorInput::Drag(value) => {
                let commands = self.overlay.drag(value, now);
                if self.overlay.phase(now) == OverlayPhase::ShownInteractive {
                    self.drag_bar.set(self.overlay.drag_value());
                } else if commands.is_empty() {
                    println!("{}", "The slider isn't available right now.".dimmed());
                }
                self.execute(commands).await;
            }
            OperatorInput::Action(action) => {
                let commands = self.overlay.action(action, now);
                if commands.is_empty() {
                    println!(
                        "{}",
                        format!("'{}' isn't available right now.", action.as_str()).dimmed()
                    );
                }
                self.execute(commands).await;
            }
            OperatorInput::Dismiss => {
                let commands = self.overlay.dismiss();
                self.execute(commands).await;
            }
            OperatorInput::Mute => self.poller.stop_sound(),
            OperatorInput::Refresh => {
                if let Err(e) = self.poller.refresh().await {
                    println!("{} {e}", "Refresh failed:".yellow());
                }
            }
            OperatorInput::List => {
                self.poller.clear_audio_tracking();
                terminal::display_alert_list(&self.poller.view().alerts);
            }
            OperatorInput::Help => print_help(),
            OperatorInput::Quit => return false,
            OperatorInput::Unknown(raw) => {
                if !raw.is_empty() {
                    println!("Unknown command {raw:?}. Type ? for help.");
                }
            }
        }
        self.render_if_changed(now);
        true
    }

    async fn execute(&mut self, commands: Vec<OverlayCommand>) {
        for command in commands {
            match command {
                OverlayCommand::StopAudio => self.poller.audio().stop(),
                OverlayCommand::Dismiss { alert_id } => self.dispatcher.dismiss(&alert_id),
                OverlayCommand::Respond {
                    alert_id,
                    value,
                    awaits_submission,
                } => {
                    if let ResponseValue::Action(action) = &value {
                        self.show_side_effect(*action);
                    }
                    let ok = self.dispatcher.respond(&alert_id, value).await;
                    if awaits_submission {
                        self.overlay.submission_finished(ok);
                        if ok {
                            self.poller.audio().play_chime();
                            println!("{}", "✓ Response Sent!".green().bold());
                        }
                    }
                    if !ok {
                        println!(
                            "{}",
                            "Failed to send response. The alert is still open; try again.".red()
                        );
                    }
                }
            }
        }
    }

    fn show_side_effect(&self, action: QuickAction) {
        let Some(alert) = self.overlay.alert() else {
            return;
        };
        match action {
            QuickAction::ViewMap => match (alert.lat, alert.lng) {
                (Some(lat), Some(lng)) => println!("  🗺  {}", terminal::map_url(lat, lng)),
                _ => println!("  🗺  {}", "No location on this alert".dimmed()),
            },
            QuickAction::Call => println!(
                "  📞 Calling {} ({})",
                alert.reporter_name(),
                alert.user_id.as_deref().unwrap_or("-")
            ),
            _ => {}
        }
    }

    /// Re-render the overlay when its phase or alert changed since the
    /// last render.
    fn render_if_changed(&mut self, now: Instant) {
        let phase = self.overlay.phase(now);
        let current = (phase, self.overlay.alert().map(|a| a.id.clone()));
        if current == self.last_render {
            return;
        }
        self.last_render = current;

        if phase != OverlayPhase::ShownInteractive {
            self.drag_bar.clear();
        }
        if let Some(alert) = self.overlay.alert() {
            terminal::display_overlay(alert, phase, self.overlay.response_sent());
        }
        if phase == OverlayPhase::ShownInteractive {
            self.drag_bar.set(self.overlay.drag_value());
        }
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  a            acknowledge (before the slider appears)");
    println!("  h            dispatch help (before the slider appears)");
    println!("  d <0-100>    move the response slider; 100 sends the response");
    println!("  m / c        view on map / call the reporter");
    println!("  x            dismiss the alert locally (snooze)");
    println!("  s            silence the siren");
    println!("  r            refresh now");
    println!("  l            list all alerts");
    println!("  q            quit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_drag_values() {
        assert_eq!(parse_input("d 40"), OperatorInput::Drag(40));
        assert_eq!(parse_input("drag 250"), OperatorInput::Drag(100));
        assert!(matches!(parse_input("d"), OperatorInput::Unknown(_)));
        assert!(matches!(parse_input("d -3"), OperatorInput::Unknown(_)));
    }

    #[test]
    fn parses_actions_and_controls() {
        assert_eq!(
            parse_input("a"),
            OperatorInput::Action(QuickAction::Acknowledged)
        );
        assert_eq!(
            parse_input("  H "),
            OperatorInput::Action(QuickAction::DispatchingHelp)
        );
        assert_eq!(parse_input("map"), OperatorInput::Action(QuickAction::ViewMap));
        assert_eq!(parse_input("x"), OperatorInput::Dismiss);
        assert_eq!(parse_input("q"), OperatorInput::Quit);
        assert_eq!(parse_input(""), OperatorInput::Unknown(String::new()));
    }
}
