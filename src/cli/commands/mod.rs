pub mod migrate;
pub mod nav;
pub mod token;
pub mod users;
