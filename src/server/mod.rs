pub mod handlers;
pub mod metrics;
pub mod response;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
