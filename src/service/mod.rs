//! Citizen Registry REST Service
//!
//! ## Endpoints
//!
//! - `POST /imports` - Validate and commit an import batch
//! - `PATCH /imports/:import_id/citizens/:citizen_id` - Replace citizen fields (also `POST`)
//! - `GET /imports/:import_id/citizens` - List citizens of an import
//! - `GET /imports/:import_id/birthdays` - Presents bought per month
//! - `GET /imports/:import_id/towns/stat/percentile/age` - Age percentiles per town
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_import_metrics};
pub use routes::{create_router, ApiError, DataResponse, ErrorResponse, ImportCreated};
pub use state::ServiceState;
