//! Repositorios de acceso a datos
//!
//! Cada repositorio encapsula las queries de una tabla. Los métodos con
//! sufijo _tx participan en la transacción que les pasa el servicio.

pub mod driver_repository;
pub mod drop_repository;
pub mod job_repository;
pub mod route_repository;
