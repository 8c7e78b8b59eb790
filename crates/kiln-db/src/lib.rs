//! User records and the persistence seam used by the authentication layer.

pub mod depot_types;
pub mod error;
pub mod model;
pub mod store;
