/// Export session lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CapturePhase {
    /// Created, nothing started.
    Idle,
    /// Extracting frames from the surface.
    Capturing,
    /// Staging frame payloads and audio for the encoder.
    Writing,
    /// External encoder running.
    Encoding,
    /// Restoring render state and removing staged files.
    CleaningUp,
    /// Finished with output.
    Done,
    /// Finished with an error.
    Failed,
}

impl CapturePhase {
    /// Whether the state machine allows `self -> next`.
    ///
    /// Every active phase may jump straight to `CleaningUp` on failure.
    pub fn can_transition_to(self, next: CapturePhase) -> bool {
        use CapturePhase::*;
        matches!(
            (self, next),
            (Idle, Capturing)
                | (Capturing, Writing)
                | (Writing, Encoding)
                | (Capturing | Writing | Encoding, CleaningUp)
                | (CleaningUp, Done | Failed)
        )
    }

    /// `Done` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, CapturePhase::Done | CapturePhase::Failed)
    }
}

/// Event delivered on the progress/status channel.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusEvent {
    /// The session entered a new phase.
    Phase(CapturePhase),
    /// Overall progress in `0.0..=100.0`.
    Progress(f64),
}

/// Receiver for [`StatusEvent`]s.
pub trait StatusSink {
    /// Called synchronously from the capture thread.
    fn on_status(&mut self, event: StatusEvent);
}

impl<F: FnMut(StatusEvent)> StatusSink for F {
    fn on_status(&mut self, event: StatusEvent) {
        self(event)
    }
}

/// Sink that records every event, for tests and diagnostics.
#[derive(Debug, Default, Clone)]
pub struct StatusLog {
    events: Vec<StatusEvent>,
}

impl StatusLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in arrival order.
    pub fn events(&self) -> &[StatusEvent] {
        &self.events
    }

    /// Phase notifications only.
    pub fn phases(&self) -> Vec<CapturePhase> {
        self.events
            .iter()
            .filter_map(|e| match e {
                StatusEvent::Phase(p) => Some(*p),
                StatusEvent::Progress(_) => None,
            })
            .collect()
    }

    /// Progress values only.
    pub fn progress(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                StatusEvent::Progress(v) => Some(*v),
                StatusEvent::Phase(_) => None,
            })
            .collect()
    }
}

impl StatusSink for StatusLog {
    fn on_status(&mut self, event: StatusEvent) {
        self.events.push(event);
    }
}

/// How overall progress is split between phases (percent).
///
/// Capture covers `[0, capture_share)`, writing the next `write_share`, encoding the rest.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProgressPlan {
    /// Share of overall progress spent capturing.
    pub capture_share: f64,
    /// Share of overall progress spent staging frames.
    pub write_share: f64,
}

impl Default for ProgressPlan {
    fn default() -> Self {
        Self {
            capture_share: 30.0,
            write_share: 60.0,
        }
    }
}

/// Maps phase-local completion onto overall progress and forwards it to a [`StatusSink`].
pub struct ProgressTracker<'a> {
    plan: ProgressPlan,
    sink: &'a mut dyn StatusSink,
    last: f64,
}

impl<'a> ProgressTracker<'a> {
    /// Create a tracker at 0%.
    pub fn new(plan: ProgressPlan, sink: &'a mut dyn StatusSink) -> Self {
        Self {
            plan,
            sink,
            last: 0.0,
        }
    }

    /// Last reported overall progress.
    pub fn last(&self) -> f64 {
        self.last
    }

    /// Forward a phase change.
    pub fn phase(&mut self, phase: CapturePhase) {
        self.sink.on_status(StatusEvent::Phase(phase));
    }

    /// Report overall progress, clamped to `0..=100`.
    pub fn report(&mut self, value: f64) {
        let value = value.clamp(0.0, 100.0);
        self.last = value;
        self.sink.on_status(StatusEvent::Progress(value));
    }

    /// `done` of `total` frames captured.
    pub fn captured(&mut self, done: u64, total: u64) {
        let v = scaled(done, total, self.plan.capture_share);
        self.report(v);
    }

    /// `done` of `total` frames staged for the encoder.
    pub fn written(&mut self, done: u64, total: u64) {
        let v = self.plan.capture_share + scaled(done, total, self.plan.write_share);
        self.report(v);
    }

    /// Encoder returned its output.
    pub fn encoded(&mut self) {
        self.report(100.0);
    }
}

fn scaled(done: u64, total: u64, share: f64) -> f64 {
    if total == 0 {
        return share;
    }
    (done.min(total) as f64) * share / (total as f64)
}

#[cfg(test)]
#[path = "../../tests/unit/capture/progress.rs"]
mod tests;
