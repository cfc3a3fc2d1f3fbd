//! Data Transfer Objects for REST request/response serialization.
//!
//! Registration bodies reuse the service-layer input types
//! ([`ResetRegistration`](crate::service::ResetRegistration),
//! [`RaidConfiguration`](crate::service::RaidConfiguration)); the types
//! here cover responses and the smaller request bodies.

pub mod tracking_dto;
pub mod trigger_dto;

pub use tracking_dto::*;
pub use trigger_dto::*;
