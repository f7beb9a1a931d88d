// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

/*! Raffle Application - Re-exports from raffle-abi */

pub use raffle_abi::{
    default_initial_balance, LedgerEntry, Lottery, LotteryRequest, Participant, Purchase,
    RaffleAbi, RaffleError, RaffleInstantiation, RaffleOperation, RaffleParameters,
    RaffleResponse, RaffleStats, Ticket, Winner, DEFAULT_PRESOLD_PERCENT, MAX_TICKETS,
    MIN_PARTICIPANT_TICKETS,
};
