use crate::holographic::{GpuFault, HolographicSpace, HostError, PresentResult, PresentWaitBehavior};

/// Where the present protocol currently is.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentPhase {
    /// No present in flight.
    Idle,
    /// The next present must be preceded by a frame-readiness wait.
    AwaitingFrameReady,
    /// A present has been planned and not yet resolved.
    Presenting,
    /// The device is lost; recovery must run before anything else.
    Lost,
}

/// Runtime features probed once per holographic space.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PresentCapabilities {
    /// `wait_for_next_frame_ready` with a head start is supported.
    pub headstart_wait: bool,
}

impl PresentCapabilities {
    pub fn probe<S: HolographicSpace + ?Sized>(space: &S) -> Self {
        Self {
            headstart_wait: space.supports_headstart_wait(),
        }
    }

    /// Pre-headstart runtimes: present blocks until the frame finishes.
    pub fn uses_legacy_wait(self) -> bool {
        !self.headstart_wait
    }
}

/// What the coordinator must do for the upcoming present.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PresentPlan {
    /// Call `wait_for_next_frame_ready(0)` before presenting.
    pub explicit_wait: bool,
    pub behavior: PresentWaitBehavior,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WaitStep {
    /// Ready; go on and present.
    Proceed,
    /// Wait failed for another reason; drop this frame only.
    Skip,
    /// Device lost while waiting; recover, nothing is presented.
    Lost(GpuFault),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentStep {
    Presented,
    /// The connection was already closed; nothing changed.
    ConnectionClosed,
    /// Present failed; recover.
    Lost(GpuFault),
}

/// Present/wait protocol state.
///
/// Pure bookkeeping: the coordinator performs the calls and feeds results
/// back, so every transition is testable without a runtime or GPU.
#[derive(Debug, Clone)]
pub struct PresentationState {
    phase: PresentPhase,
    must_wait: bool,
    has_presented: bool,
    capabilities: PresentCapabilities,
}

impl PresentationState {
    pub fn new(capabilities: PresentCapabilities) -> Self {
        Self {
            phase: PresentPhase::Idle,
            must_wait: false,
            has_presented: false,
            capabilities,
        }
    }

    pub fn phase(&self) -> PresentPhase {
        self.phase
    }

    pub fn must_wait(&self) -> bool {
        self.must_wait
    }

    pub fn has_presented(&self) -> bool {
        self.has_presented
    }

    pub fn capabilities(&self) -> PresentCapabilities {
        self.capabilities
    }

    /// Runtime availability changed. Only the falling edge matters.
    pub fn on_availability_changed(&mut self, available: bool) {
        if available {
            return;
        }
        self.must_wait = true;
        match self.phase {
            PresentPhase::Idle | PresentPhase::Presenting => {
                self.phase = PresentPhase::AwaitingFrameReady;
            }
            PresentPhase::AwaitingFrameReady | PresentPhase::Lost => {}
        }
    }

    /// A device loss was observed outside of present (e.g. under the camera lock).
    pub fn on_device_lost(&mut self, fault: GpuFault) {
        log::debug!("present state: lost ({fault})");
        self.phase = PresentPhase::Lost;
        self.must_wait = true;
    }

    /// Decides how the next present runs.
    ///
    /// An explicit wait happens only when one is pending, the runtime has the
    /// head-start API and a previous present succeeded; otherwise the present
    /// call itself provides the blocking.
    pub fn plan_present(&mut self) -> PresentPlan {
        debug_assert_ne!(self.phase, PresentPhase::Lost, "present planned on a lost device");

        let legacy = self.capabilities.uses_legacy_wait();
        let explicit_wait = self.must_wait && !legacy && self.has_presented;
        let behavior = if legacy {
            PresentWaitBehavior::WaitForFrameToFinish
        } else {
            PresentWaitBehavior::DoNotWaitForFrameToFinish
        };

        self.phase = if explicit_wait {
            PresentPhase::AwaitingFrameReady
        } else {
            PresentPhase::Presenting
        };

        PresentPlan {
            explicit_wait,
            behavior,
        }
    }

    /// Feeds back the result of the explicit readiness wait.
    pub fn on_wait_complete(&mut self, result: Result<(), HostError>) -> WaitStep {
        match result {
            Ok(()) => {
                self.must_wait = false;
                self.phase = PresentPhase::Presenting;
                WaitStep::Proceed
            }
            Err(HostError::DeviceLost(fault)) => {
                self.on_device_lost(fault);
                WaitStep::Lost(fault)
            }
            Err(err) => {
                log::warn!("frame-ready wait failed, skipping present: {err}");
                WaitStep::Skip
            }
        }
    }

    /// Feeds back the result of the present call.
    pub fn on_present_result(&mut self, result: Result<PresentResult, HostError>) -> PresentStep {
        match result {
            Ok(PresentResult::Success) => {
                self.has_presented = true;
                self.must_wait = false;
                self.phase = PresentPhase::Idle;
                PresentStep::Presented
            }
            Err(HostError::ConnectionClosed) => {
                self.phase = self.resting_phase();
                PresentStep::ConnectionClosed
            }
            Ok(PresentResult::DeviceRemoved) => self.present_lost(GpuFault::Removed),
            Err(HostError::DeviceLost(fault)) => self.present_lost(fault),
            Err(err) => {
                log::error!("present failed: {err}");
                self.present_lost(GpuFault::Removed)
            }
        }
    }

    /// Recovery finished on a new device.
    pub fn on_recovered(&mut self) {
        self.has_presented = false;
        self.phase = PresentPhase::Idle;
    }

    /// Swaps in capabilities of a new holographic space; starts over.
    pub fn reset(&mut self, capabilities: PresentCapabilities) {
        *self = Self::new(capabilities);
    }

    fn present_lost(&mut self, fault: GpuFault) -> PresentStep {
        self.on_device_lost(fault);
        PresentStep::Lost(fault)
    }

    fn resting_phase(&self) -> PresentPhase {
        if self.must_wait {
            PresentPhase::AwaitingFrameReady
        } else {
            PresentPhase::Idle
        }
    }
}
