pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routes;

pub use middleware::{track_requests, InFlightGuard, RequestContext};
pub use routes::{create_router, instrument, AppState};
