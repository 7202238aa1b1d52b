pub mod auth;
pub mod auth_log;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
