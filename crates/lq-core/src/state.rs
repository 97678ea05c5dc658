//! Engine lifecycle

/// Lifecycle of the background engine; there is no transition out of
/// `Ready` or `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineLifecycleState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

impl EngineLifecycleState {
    pub fn is_ready(&self) -> bool {
        matches!(self, EngineLifecycleState::Ready)
    }

    /// Whether the handshake has settled one way or the other
    pub fn is_settled(&self) -> bool {
        matches!(self, EngineLifecycleState::Ready | EngineLifecycleState::Failed(_))
    }

    /// Human-readable reason a request cannot be served in this state
    pub fn not_ready_reason(&self) -> String {
        match self {
            EngineLifecycleState::Uninitialized => "engine has not been started".to_string(),
            EngineLifecycleState::Initializing => "engine is still initializing".to_string(),
            EngineLifecycleState::Ready => "engine is ready".to_string(),
            EngineLifecycleState::Failed(reason) => format!("engine failed to start: {}", reason),
        }
    }
}
