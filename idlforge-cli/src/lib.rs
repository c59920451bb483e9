//! Command-line front end and network side of idlforge.
//!
//! Provides:
//! - Transaction composition, submission and confirmation ([`tx`])
//! - An RPC endpoint and a keypair signer ([`network`], [`wallet`])
//! - Saved test suites and sequential batch runs ([`suite`], [`batch`])
//! - Decoded program accounts and transaction history ([`browse`])
//! - The `idlforge` command set ([`args`], [`cmd`])
//!
//! Schema handling, coercion, encoding and address derivation live in
//! `idlforge-core`.

pub mod args;
pub mod batch;
pub mod browse;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod inspect;
pub mod network;
pub mod suite;
pub mod tx;
pub mod wallet;
