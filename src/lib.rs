mod database {
    pub mod actions;
    pub mod error;
    pub mod memory;
    pub mod operations;
    pub mod postgres;
    pub mod schema;
    pub mod store;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod config;
mod constants;
mod media;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use media::*;
