pub mod dispatch_dto;

pub use dispatch_dto::*;
