//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación,
//! geometría y otras funcionalidades comunes.

pub mod errors;
pub mod geo;
pub mod validation;
