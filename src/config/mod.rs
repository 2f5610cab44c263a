//! Configuración del proyecto
//!
//! Este módulo contiene las variables de entorno y los parámetros de
//! negocio configurables del sistema.

pub mod environment;

pub use environment::*;
