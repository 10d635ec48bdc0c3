pub mod navbar_service;

pub use navbar_service::{NavListing, NavbarService};
