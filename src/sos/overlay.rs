// Alert overlay — timed state machine for presenting one SOS at a time.
//
//   Hidden -> Shown (static) --1.5s--> Shown (interactive)
//   Shown  -> Responding (drag hits 100, or acknowledge/dispatch pressed)
//   Responding --0.5s--> response emitted --submitted--> Hidden
//   any shown state --dismiss--> Hidden
//
// The machine never reads a clock itself. Every transition takes `now`, and
// `next_deadline` tells the driver when to call `poll` again, so tests can
// walk it with synthetic instants.

use std::time::{Duration, Instant};

use crate::api::models::{Alert, QuickAction, ResponseValue};

/// Delay before the drag control replaces the quick responses.
pub const INTERACTIVE_DELAY: Duration = Duration::from_millis(1500);
/// Delay between entering Responding and emitting the response.
pub const RESPONSE_DELAY: Duration = Duration::from_millis(500);
/// Drag value that confirms a response.
pub const DRAG_COMPLETE: u8 = 100;

/// Externally visible phase of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    Hidden,
    /// Quick responses (acknowledge, dispatch help) available.
    ShownStatic,
    /// Drag-to-confirm control visible.
    ShownInteractive,
    /// Response chosen; audio stopped; awaiting emission or submission.
    Responding,
}

/// Side effects the driver must carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCommand {
    StopAudio,
    /// Send `value` for `alert_id` to the response dispatcher.
    Respond {
        alert_id: String,
        value: ResponseValue,
        /// False for map/call shortcuts, which don't wait on submission.
        awaits_submission: bool,
    },
    /// Local snooze through the dispatcher.
    Dismiss { alert_id: String },
}

#[derive(Debug, Clone)]
enum State {
    Hidden,
    Shown {
        alert: Alert,
        shown_at: Instant,
        drag: u8,
    },
    Responding {
        alert: Alert,
        shown_at: Instant,
        value: ResponseValue,
        emit_at: Instant,
        emitted: bool,
    },
}

#[derive(Debug, Clone)]
pub struct AlertOverlay {
    state: State,
}

impl Default for AlertOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertOverlay {
    pub fn new() -> Self {
        Self {
            state: State::Hidden,
        }
    }

    /// Present `alert`. Re-showing the alert already on screen is a no-op;
    /// a different alert replaces the current one and restarts the timers.
    pub fn show(&mut self, alert: Alert, now: Instant) {
        if self.alert().is_some_and(|current| current.id == alert.id) {
            return;
        }
        self.state = State::Shown {
            alert,
            shown_at: now,
            drag: 0,
        };
    }

    /// Hide without emitting anything (alert resolved elsewhere).
    pub fn hide(&mut self) {
        self.state = State::Hidden;
    }

    pub fn alert(&self) -> Option<&Alert> {
        match &self.state {
            State::Hidden => None,
            State::Shown { alert, .. } | State::Responding { alert, .. } => Some(alert),
        }
    }

    pub fn phase(&self, now: Instant) -> OverlayPhase {
        match &self.state {
            State::Hidden => OverlayPhase::Hidden,
            State::Shown { shown_at, .. } => {
                if now.saturating_duration_since(*shown_at) >= INTERACTIVE_DELAY {
                    OverlayPhase::ShownInteractive
                } else {
                    OverlayPhase::ShownStatic
                }
            }
            State::Responding { .. } => OverlayPhase::Responding,
        }
    }

    /// Current drag position (100 once responding via drag).
    pub fn drag_value(&self) -> u8 {
        match &self.state {
            State::Shown { drag, .. } => *drag,
            State::Responding {
                value: ResponseValue::Completion(v),
                ..
            } => *v,
            _ => 0,
        }
    }

    /// True once the response has been handed to the dispatcher.
    pub fn response_sent(&self) -> bool {
        matches!(self.state, State::Responding { emitted: true, .. })
    }

    /// Move the drag control. Ignored unless the control is visible.
    pub fn drag(&mut self, value: u8, now: Instant) -> Vec<OverlayCommand> {
        if self.phase(now) != OverlayPhase::ShownInteractive {
            return Vec::new();
        }
        let value = value.min(DRAG_COMPLETE);

        if value >= DRAG_COMPLETE {
            return self.begin_responding(ResponseValue::Completion(DRAG_COMPLETE), now);
        }
        if let State::Shown { drag, .. } = &mut self.state {
            *drag = value;
        }
        Vec::new()
    }

    /// Press one of the overlay's action buttons.
    ///
    /// Map and call are always available and emit straight away. Acknowledge
    /// and dispatch-help exist only before the drag control appears.
    pub fn action(&mut self, action: QuickAction, now: Instant) -> Vec<OverlayCommand> {
        let phase = self.phase(now);
        let Some(alert) = self.alert() else {
            return Vec::new();
        };

        if action.is_side_effect() {
            if phase == OverlayPhase::Responding {
                return Vec::new();
            }
            return vec![OverlayCommand::Respond {
                alert_id: alert.id.clone(),
                value: ResponseValue::Action(action),
                awaits_submission: false,
            }];
        }

        if phase != OverlayPhase::ShownStatic {
            return Vec::new();
        }
        self.begin_responding(ResponseValue::Action(action), now)
    }

    /// Close the overlay without responding.
    pub fn dismiss(&mut self) -> Vec<OverlayCommand> {
        let Some(alert_id) = self.alert().map(|a| a.id.clone()) else {
            return Vec::new();
        };
        self.state = State::Hidden;
        vec![OverlayCommand::Dismiss { alert_id }]
    }

    /// Advance timers. Emits the pending response once its delay has passed.
    pub fn poll(&mut self, now: Instant) -> Vec<OverlayCommand> {
        if let State::Responding {
            alert,
            value,
            emit_at,
            emitted,
            ..
        } = &mut self.state
        {
            if !*emitted && now >= *emit_at {
                *emitted = true;
                return vec![OverlayCommand::Respond {
                    alert_id: alert.id.clone(),
                    value: value.clone(),
                    awaits_submission: true,
                }];
            }
        }
        Vec::new()
    }

    /// The next instant at which `poll` or `phase` would change something.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        match &self.state {
            State::Shown { shown_at, .. } if self.phase(now) == OverlayPhase::ShownStatic => {
                Some(*shown_at + INTERACTIVE_DELAY)
            }
            State::Responding {
                emit_at,
                emitted: false,
                ..
            } => Some(*emit_at),
            _ => None,
        }
    }

    /// Report the dispatcher's verdict on the emitted response.
    ///
    /// Success hides the overlay. Failure puts the alert back on screen with
    /// the drag control reset so the operator can retry.
    pub fn submission_finished(&mut self, succeeded: bool) {
        let State::Responding {
            alert,
            shown_at,
            emitted: true,
            ..
        } = &self.state
        else {
            return;
        };

        self.state = if succeeded {
            State::Hidden
        } else {
            State::Shown {
                alert: alert.clone(),
                shown_at: *shown_at,
                drag: 0,
            }
        };
    }

    fn begin_responding(&mut self, value: ResponseValue, now: Instant) -> Vec<OverlayCommand> {
        let State::Shown {
            alert, shown_at, ..
        } = &self.state
        else {
            return Vec::new();
        };

        self.state = State::Responding {
            alert: alert.clone(),
            shown_at: *shown_at,
            value,
            emit_at: now + RESPONSE_DELAY,
            emitted: false,
        };
        vec![OverlayCommand::StopAudio]
    }
}
