// Route handlers, grouped by who may call them.
//
// public/   - no admin session required; identity comes from RequestContext
// elevated/ - behind require_admin_middleware

pub mod elevated;
pub mod public;
