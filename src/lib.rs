pub mod config;
pub mod curve;
pub mod index;
pub mod layout;
pub mod matchlog;
pub mod outcome;
pub mod pipeline;
pub mod reconcile;
pub mod schema;
pub mod verify;
