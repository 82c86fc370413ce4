// handlers/public/auth - identity and admin session endpoints

pub mod login; // POST /admin/login
pub mod logout; // POST /admin/logout
pub mod me; // GET /auth/me

pub use login::admin_login;
pub use logout::admin_logout;
pub use me::me;
