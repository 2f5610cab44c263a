//! Services module
//!
//! Este módulo contiene la lógica de negocio y servicios de la aplicación.
//! Los servicios encapsulan operaciones que involucran varios modelos,
//! transacciones y la publicación de eventos.

pub mod dispatch_service;
pub mod notification_service;

pub use dispatch_service::*;
pub use notification_service::*;
