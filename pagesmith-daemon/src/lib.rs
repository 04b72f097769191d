//! Intake server: accepts deploy requests over HTTP and runs each pipeline
//! in the background.

mod error;
pub mod protocol;
mod runtime;
pub mod server;

pub use error::{DaemonError, IntakeError};
pub use protocol::{AcceptedResponse, DeployRequest, ErrorResponse, HealthResponse};
pub use runtime::{build_pipeline, init_tracing, run, start_blocking};
pub use server::{build_router, dispatch, AppState};
