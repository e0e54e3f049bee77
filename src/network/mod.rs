pub mod api;
pub mod client;

pub use api::ConsultApi;
pub use client::{ConsultBackend, ConsultClient};
