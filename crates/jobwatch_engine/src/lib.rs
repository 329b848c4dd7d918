//! Jobwatch engine: backend gateway and the refresh controller.
mod controller;
mod gateway;
mod types;

pub use controller::{
    ControllerState, RefreshController, RefreshOutcome, RequestToken, SharedStore,
};
pub use gateway::{GatewaySettings, JobsGateway, ReqwestGateway};
pub(crate) use types::JobsResponse;
pub use types::{FailureKind, GatewayError, JobsPage, StatusCounts};

pub use tokio_util::sync::CancellationToken;
