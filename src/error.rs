use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CadenceError {
    SchedulerError(String),
    WorkflowError(String),
    LeadStoreError(String),
    GatewayError(String),
    ReconcileError(String),
    ValidationError(String),
    ConfigurationError(String),
}

impl fmt::Display for CadenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CadenceError::SchedulerError(msg) => write!(f, "Scheduler error: {msg}"),
            CadenceError::WorkflowError(msg) => write!(f, "Workflow error: {msg}"),
            CadenceError::LeadStoreError(msg) => write!(f, "Lead store error: {msg}"),
            CadenceError::GatewayError(msg) => write!(f, "Gateway error: {msg}"),
            CadenceError::ReconcileError(msg) => write!(f, "Reconcile error: {msg}"),
            CadenceError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            CadenceError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for CadenceError {}

pub type Result<T> = std::result::Result<T, CadenceError>;
