pub mod ride_dto;

pub use ride_dto::*;
