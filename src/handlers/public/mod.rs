// handlers/public/mod.rs - Handlers reachable without a session
//
// Route Prefix: /api/public-navbar
// Middleware: shared bearer token (server-to-server)

pub mod navbar;

pub use navbar::navbar_get;
