pub mod dispatch_controller;

pub use dispatch_controller::*;
