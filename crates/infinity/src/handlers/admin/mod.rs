//! Back-office handlers. Everything here sits behind the `admin` and `csrf`
//! middleware.

pub mod dashboard;
pub mod migrations;
pub mod posts;
pub mod settings;
