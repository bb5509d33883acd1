// src/wallet/mod.rs
pub mod credential_storage;
pub mod key_management;
pub mod local_provider;
pub mod provider;
