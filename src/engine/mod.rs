//! Núcleo puro del motor de despacho
//!
//! Clustering, reglas de ciclo de vida, ganancias, agregación de pendientes
//! y progreso de rutas. Todo es síncrono y sin I/O; los servicios cargan el
//! estado, invocan estas funciones y persisten el resultado.

pub mod clustering;
pub mod earnings;
pub mod lifecycle;
pub mod pending;
pub mod progress;
