// handlers/protected/mod.rs - Handlers behind a session token
//
// Route Prefix: /api/internal/*
// Middleware: session authentication, then a role gate per route group

pub mod navbar;
pub mod users;
pub mod whoami;

pub use whoami::whoami;
