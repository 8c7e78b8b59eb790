//! Kiln frontend - integration test support.
//!
//! This crate re-exports the workspace crates so integration tests can use
//! `kiln_test::` paths.

pub mod component {
    pub use kiln_core::{config, constants, util};

    pub mod db {
        pub use kiln_db::*;
    }

    pub mod auth {
        pub use kiln_service::auth::*;
        pub use kiln_service::{error, session};
    }
}

pub mod app {
    pub use kiln_app::*;
}
