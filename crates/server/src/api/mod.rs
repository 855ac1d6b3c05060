pub mod build_hook;
pub mod gerrit_hook;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
