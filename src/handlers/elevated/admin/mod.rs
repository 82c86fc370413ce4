// handlers/elevated/admin - admin-only operations

pub mod events; // GET /admin/events
pub mod impersonate; // POST /admin/impersonate
pub mod sessions; // GET /admin/impersonation/sessions

pub use events::events_list;
pub use impersonate::impersonate_start;
pub use sessions::sessions_list;
