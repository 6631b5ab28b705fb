/// Middleware modules for the API server
///
/// - `security`: Security response headers
///
/// Authentication is the access gate in `permit_shared::auth::gate`.

pub mod security;
