pub mod credential_handlers;
pub mod health_handlers;
