//! Core business logic for Tally.
//!
//! This crate contains the balance rules and the concurrency protocol with
//! ZERO web or database dependencies. Persistence plugs in through the
//! [`balance::AccountStore`] trait.
//!
//! # Modules
//!
//! - `balance` - Account balances, optimistic-concurrency updates and the ledger

pub mod balance;
