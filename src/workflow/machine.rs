use super::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    CameraActive,
    Captured,
    Analyzing,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    OpenCamera,
    Capture,
    Upload,
    Submit,
    SubmitRemote,
    AnalysisSucceeded,
    AnalysisFailed,
    RemoteAnalysisFailed,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: WorkflowState,
    pub event: WorkflowEvent,
    pub to: WorkflowState,
}

impl StateTransition {
    pub const fn new(from: WorkflowState, event: WorkflowEvent, to: WorkflowState) -> Self {
        Self { from, event, to }
    }
}

#[derive(Debug)]
pub struct StateMachine {
    state: WorkflowState,
    transition_history: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: WorkflowState::default(),
            transition_history: Vec::new(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn can_transition(&self, event: WorkflowEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: WorkflowEvent) -> Option<WorkflowState> {
        use WorkflowEvent::*;
        match (self.state, event) {
            (_, Reset) => Some(WorkflowState::Idle),
            (WorkflowState::Idle, OpenCamera) => Some(WorkflowState::CameraActive),
            (WorkflowState::Idle, Upload) => Some(WorkflowState::Captured),
            (WorkflowState::Idle, SubmitRemote) => Some(WorkflowState::Analyzing),
            (WorkflowState::CameraActive, Capture) => Some(WorkflowState::Captured),
            (WorkflowState::Captured, Submit) => Some(WorkflowState::Analyzing),
            (WorkflowState::Analyzing, AnalysisSucceeded) => Some(WorkflowState::Result),
            (WorkflowState::Analyzing, AnalysisFailed) => Some(WorkflowState::Captured),
            (WorkflowState::Analyzing, RemoteAnalysisFailed) => Some(WorkflowState::Idle),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: WorkflowEvent) -> WorkflowResult<WorkflowState> {
        tracing::debug!(from = ?self.state, event = ?event, "request workflow transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid workflow transition requested");
            WorkflowError::InvalidTransition { from, event }
        })?;

        self.transition_history
            .push(StateTransition::new(self.state, event, next));
        self.state = next;
        Ok(self.state)
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WorkflowState::{:?}", self.state)
    }
}
