use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OnboardingStep {
    pub title: &'static str,
    pub description: &'static str,
}

pub const STEPS: [OnboardingStep; 3] = [
    OnboardingStep {
        title: "Log your doses",
        description: "Keep track of when and how much of your GLP-1 medication you took.",
    },
    OnboardingStep {
        title: "Monitor symptoms",
        description: "Record side effects and symptoms to understand how your body responds.",
    },
    OnboardingStep {
        title: "Follow your progress",
        description: "See your journey over time with reports and a combined timeline.",
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OnboardingError {
    #[error("step {step} is out of range (0..{count})")]
    StepOutOfRange { step: usize, count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Transition {
    Next,
    Back,
    JumpTo { step: usize },
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowState {
    Step { step: usize },
    Complete,
}

/// Linear walk over [`STEPS`]. Nothing is persisted until the flow reaches
/// [`FlowState::Complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnboardingFlow {
    state: FlowState,
}

impl Default for OnboardingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingFlow {
    pub const STEP_COUNT: usize = STEPS.len();

    pub fn new() -> Self {
        Self { state: FlowState::Step { step: 0 } }
    }

    /// Resumes at `step`, as reported by a client that holds the position.
    pub fn at(step: usize) -> Result<Self, OnboardingError> {
        check_step(step)?;
        Ok(Self { state: FlowState::Step { step } })
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == FlowState::Complete
    }

    pub fn next(&mut self) -> FlowState {
        if let FlowState::Step { step } = self.state {
            self.state = if step + 1 < Self::STEP_COUNT {
                FlowState::Step { step: step + 1 }
            } else {
                FlowState::Complete
            };
        }
        self.state
    }

    pub fn back(&mut self) -> FlowState {
        if let FlowState::Step { step } = self.state {
            self.state = FlowState::Step { step: step.saturating_sub(1) };
        }
        self.state
    }

    pub fn jump_to(&mut self, step: usize) -> Result<FlowState, OnboardingError> {
        check_step(step)?;
        if !self.is_complete() {
            self.state = FlowState::Step { step };
        }
        Ok(self.state)
    }

    pub fn skip(&mut self) -> FlowState {
        self.state = FlowState::Complete;
        self.state
    }

    pub fn apply(&mut self, transition: Transition) -> Result<FlowState, OnboardingError> {
        match transition {
            Transition::Next => Ok(self.next()),
            Transition::Back => Ok(self.back()),
            Transition::JumpTo { step } => self.jump_to(step),
            Transition::Skip => Ok(self.skip()),
        }
    }
}

/// Share of the flow reached at `step`, as shown by the progress bar.
pub fn progress_percent(step: usize) -> u8 {
    let reached = step.min(OnboardingFlow::STEP_COUNT - 1) + 1;
    (reached * 100 / OnboardingFlow::STEP_COUNT) as u8
}

fn check_step(step: usize) -> Result<(), OnboardingError> {
    if step < OnboardingFlow::STEP_COUNT {
        Ok(())
    } else {
        Err(OnboardingError::StepOutOfRange { step, count: OnboardingFlow::STEP_COUNT })
    }
}
