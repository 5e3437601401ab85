pub mod diagnostics;
pub mod types;
pub mod utils;

pub use diagnostics::{DiagnosticsSink, LocatorEvent, NoopDiagnostics, TracingDiagnostics};
