pub mod structured_logging;

pub use structured_logging::{
    init_structured_logging,
    LoggingConfig,
    LogTarget,
    StructuredLogEntry,
    ExecutionContext,
    PerformanceMetrics,
    OperationTimer,
    RequestContext,
};
