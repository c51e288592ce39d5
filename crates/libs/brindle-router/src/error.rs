use brindle_stack::StackError;

/// Failures of interface lifecycle operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LifecycleError {
    /// No radio driver has been registered.
    #[error("radio driver unavailable")]
    DriverUnavailable,

    /// The stack failed to allocate the interface or its MAC adaptation.
    #[error("interface creation failed: {0}")]
    InterfaceCreationFailed(StackError),

    /// The mesh management layer rejected its initialization.
    #[error("management init failed with stack code {code}")]
    ManagementInitFailed { code: i32 },

    /// The interface refused to come up.
    #[error("interface bring-up failed: {0}")]
    BringUpFailed(StackError),

    /// Bring-up requested while a live interface handle is already held.
    #[error("interface already active")]
    AlreadyActive,

    /// Teardown requested while no interface handle is held.
    #[error("interface not active")]
    NotActive,
}

impl LifecycleError {
    /// Benign conditions the dispatcher absorbs: logged, never escalated.
    pub fn is_benign(&self) -> bool {
        matches!(self, LifecycleError::AlreadyActive | LifecycleError::NotActive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_state_mismatches_are_benign() {
        assert!(LifecycleError::AlreadyActive.is_benign());
        assert!(LifecycleError::NotActive.is_benign());
        assert!(!LifecycleError::DriverUnavailable.is_benign());
        assert!(!LifecycleError::ManagementInitFailed { code: -1 }.is_benign());
        assert!(!LifecycleError::BringUpFailed(StackError::InterfaceAllocation).is_benign());
    }
}
