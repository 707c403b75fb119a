//! Visibility state machine
//!
//! Pure transitions: `transition(state, event)` returns the next state and
//! the effects the widget must apply, in order. Nothing here touches the
//! render target or the scheduler.

use super::scheduler::Task;
use serde::Serialize;

/// Visibility of the iframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Hidden and out of layout
    #[default]
    Closed,
    /// In layout, waiting for the next frame to animate in
    Opening,
    /// Fully shown
    Open,
    /// Animating out, waiting for the settle delay to leave layout
    Closing,
}

impl Visibility {
    /// Whether the widget counts as open (`isOpen`)
    pub fn is_open(self) -> bool {
        matches!(self, Visibility::Opening | Visibility::Open)
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Toggle button clicked
    Toggle,
    /// Host API `open()`
    OpenRequested,
    /// `widget:close` or host API `close()`
    CloseRequested,
    /// The frame-deferred reveal fired
    FrameElapsed,
    /// The settle timer fired
    SettleElapsed,
}

impl From<Task> for Event {
    fn from(task: Task) -> Self {
        match task {
            Task::Reveal => Event::FrameElapsed,
            Task::Settle => Event::SettleElapsed,
        }
    }
}

/// Side effects of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Cancel whatever deferred step is still pending
    CancelPending,
    /// `display: block`
    ShowFrame,
    /// `opacity: 1`, resting transform
    Reveal,
    /// `opacity: 0`, hidden transform
    Conceal,
    /// `display: none`
    HideFrame,
    /// Schedule `Task::Reveal` for the next frame
    ScheduleReveal,
    /// Schedule `Task::Settle` after the settle delay
    ScheduleSettle,
    /// Post `widget:visibility`
    NotifyVisibility(bool),
}

/// Result of one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: Visibility,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(state: Visibility) -> Self {
        Self {
            next: state,
            effects: Vec::new(),
        }
    }
}

fn begin_open() -> Transition {
    Transition {
        next: Visibility::Opening,
        effects: vec![
            Effect::CancelPending,
            Effect::ShowFrame,
            Effect::ScheduleReveal,
            Effect::NotifyVisibility(true),
        ],
    }
}

fn begin_close() -> Transition {
    Transition {
        next: Visibility::Closing,
        effects: vec![
            Effect::CancelPending,
            Effect::Conceal,
            Effect::ScheduleSettle,
            Effect::NotifyVisibility(false),
        ],
    }
}

/// Compute the transition for `event` in `state`.
pub fn transition(state: Visibility, event: Event) -> Transition {
    use Visibility::*;

    match (state, event) {
        (Closed | Closing, Event::Toggle | Event::OpenRequested) => begin_open(),
        (Opening | Open, Event::Toggle | Event::CloseRequested) => begin_close(),
        (Opening, Event::FrameElapsed) => Transition {
            next: Open,
            effects: vec![Effect::Reveal],
        },
        (Closing, Event::SettleElapsed) => Transition {
            next: Closed,
            effects: vec![Effect::HideFrame],
        },
        // Already open/closed, or a deferred step that no longer applies
        (state, _) => Transition::stay(state),
    }
}
