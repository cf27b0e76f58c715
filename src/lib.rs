//! Library crate for raffle-wheel-back: draw state machine, spin orchestration, animators and
//! the HTTP/SSE surface, exposed for the binary and tests.

pub mod animation;
pub mod audio;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod geometry;
pub mod input;
pub mod routes;
pub mod services;
pub mod state;
