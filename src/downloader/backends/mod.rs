// Extraction backends

pub mod diagnostics;
pub mod metadata;
pub mod rapidapi;

pub use diagnostics::{diagnose_error, BlockingReason};
pub use metadata::{MetadataBackend, YtDlpInvocation};
pub use rapidapi::RapidApiBackend;
