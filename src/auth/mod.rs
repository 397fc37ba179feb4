pub mod access;
pub mod client;
pub mod middleware;
pub mod session;
pub mod validate;
