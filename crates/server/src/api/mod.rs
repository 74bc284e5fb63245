pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod streams;

pub use routes::create_router;
