/// Middleware modules for the API server
///
/// - `security`: response security headers
/// - `suspension`: blocks suspended and banned accounts after authentication

pub mod security;
pub mod suspension;
