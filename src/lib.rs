//! A named-key, versioned envelope-encryption core: `Encrypt(name, pt)` /
//! `Decrypt(name, blob)` backed by a three-level key hierarchy (Master → KEK
//! → DEK → transit key version). `orchestrator::Orchestrator` is the entry
//! point gluing every other module together.

pub mod aead;
pub mod blob;
pub mod config;
pub mod dek;
pub mod error;
pub mod exit_codes;
pub mod kek;
pub mod masterkey;
pub mod model;
pub mod orchestrator;
pub mod repository;
pub mod secret;
pub mod transaction;

pub use error::TransitError;
pub use model::Algorithm;
pub use orchestrator::Orchestrator;
