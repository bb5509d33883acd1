// src/zkp/mod.rs
pub mod backend;
pub mod input;
pub mod limbs;
