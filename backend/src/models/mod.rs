pub mod user;
pub mod webhook;
