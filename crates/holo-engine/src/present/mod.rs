//! Present/wait protocol and device-loss recovery.
//!
//! [`PresentationState`] is the pure state machine; [`PresentationCoordinator`]
//! performs the runtime calls around it and runs recovery.

mod coordinator;
mod signal;
mod state;

pub use coordinator::{PresentOutcome, PresentationCoordinator};
pub use signal::AvailabilitySignal;
pub use state::{
    PresentCapabilities, PresentPhase, PresentPlan, PresentStep, PresentationState, WaitStep,
};
