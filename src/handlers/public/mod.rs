pub mod auth;
pub mod impersonate;
pub mod status;
