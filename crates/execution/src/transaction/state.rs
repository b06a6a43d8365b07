use serde::{Deserialize, Serialize};

use txexec_core::ClosedSet;

use crate::common::LockingMode;

/// Lifecycle of one transaction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionExecutionState {
    Started,
    SourceAddressLocked,
    SourceAndTargetAddressesLocked,
    Built,
    Signed,
    Broadcasted,
    SourceAddressReleased,
    SourceAndTargetAddressesReleased,
    WaitingForEnding,
    Completed,
    BuildingFailed,
    BroadcastingFailed,
    WaitingForEndingFailed,
    Cleared,
}

impl ClosedSet for TransactionExecutionState {
    fn members() -> &'static [Self] {
        use TransactionExecutionState::*;
        &[
            Started,
            SourceAddressLocked,
            SourceAndTargetAddressesLocked,
            Built,
            Signed,
            Broadcasted,
            SourceAddressReleased,
            SourceAndTargetAddressesReleased,
            WaitingForEnding,
            Completed,
            BuildingFailed,
            BroadcastingFailed,
            WaitingForEndingFailed,
            Cleared,
        ]
    }
}

impl TransactionExecutionState {
    /// State entered once the locks of `mode` are held.
    pub fn locked(mode: LockingMode) -> Self {
        match mode {
            LockingMode::Simple => Self::SourceAddressLocked,
            LockingMode::Exclusive => Self::SourceAndTargetAddressesLocked,
        }
    }

    /// State entered once the locks of `mode` are released.
    pub fn released(mode: LockingMode) -> Self {
        match mode {
            LockingMode::Simple => Self::SourceAddressReleased,
            LockingMode::Exclusive => Self::SourceAndTargetAddressesReleased,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(
            self,
            Self::SourceAddressLocked | Self::SourceAndTargetAddressesLocked
        )
    }

    pub fn is_released(&self) -> bool {
        matches!(
            self,
            Self::SourceAddressReleased | Self::SourceAndTargetAddressesReleased
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            Self::BuildingFailed | Self::BroadcastingFailed | Self::WaitingForEndingFailed
        )
    }
}

/// Terminal outcome classifier of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionExecutionResult {
    Completed,
    Failed,
    RepeatRequested,
}

impl TransactionExecutionResult {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}
