pub mod handlers;
pub mod layers;
pub mod middleware;
pub mod router;
