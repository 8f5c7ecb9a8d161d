//! Parties domain module (customers and suppliers with running balances).
//!
//! This crate contains business rules for parties, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod party;

pub use party::{
    BalanceCharged, BalanceSettled, ChargeBalance, ContactInfo, Party, PartyCommand, PartyEvent,
    PartyId, PartyKind, PartyRegistered, PartyUpdated, RegisterParty, SettleBalance,
    UpdateDetails,
};
