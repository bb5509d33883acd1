// src/lib.rs
//! # zkcred
//!
//! Schema-driven canonicalisation and signing of identity credentials, and
//! preparation of zero-knowledge circuit inputs from signed credentials.
//!
//! ## Layers
//! 1. **Transform**: records, schemas, encoding steps and canonical bytes
//! 2. **Wallet**: issuer keys, signatures, EIP-1193 wallets, credential storage
//! 3. **ZKP**: limb packing, circuit inputs, the prover boundary
//! 4. **Services**: issuer, verifier, issuance client and the HTTP API

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod transform;
pub mod utils;
pub mod wallet;
pub mod zkp;

pub use error::{Error, Result};
