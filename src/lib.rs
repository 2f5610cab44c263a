//! Multi-drop Dispatch Engine
//!
//! Motor de clustering y despacho de rutas multi-parada para el marketplace
//! de mudanzas: agrupa jobs confirmados sin asignar en rutas geográficamente
//! coherentes, gestiona el ciclo de vida de rutas y drops, calcula ganancias
//! de conductores y notifica cambios en tiempo real vía pub/sub.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod engine;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
