// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

/*! Shared ABI definitions for the Raffle application */

use std::fmt;

use async_graphql::{Request, Response, SimpleObject};
use linera_sdk::linera_base_types::{AccountOwner, Amount, ContractAbi, ServiceAbi, Timestamp};
use serde::{Deserialize, Serialize};

/// Share of generated tickets marked as already sold, in percent.
pub const DEFAULT_PRESOLD_PERCENT: u8 = 30;

/// Participant tickets needed before a winner can be drawn.
pub const MIN_PARTICIPANT_TICKETS: u64 = 2;

/// Largest ticket inventory a single lottery may hold.
pub const MAX_TICKETS: u64 = 10_000;

/// Wallet balance handed to the acting user on instantiation.
pub fn default_initial_balance() -> Amount {
    Amount::from_tokens(10)
}

pub struct RaffleAbi;

impl ContractAbi for RaffleAbi {
    type Operation = RaffleOperation;
    type Response = RaffleResponse;
}

impl ServiceAbi for RaffleAbi {
    type Query = Request;
    type QueryResponse = Response;
}

/// Application parameters, fixed when the application is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RaffleParameters {
    /// Chance, in percent, that a freshly generated ticket starts out sold.
    pub presold_percent: u8,
    /// Seed every draw from this value instead of the block clock.
    pub fixed_seed: Option<u64>,
}

impl Default for RaffleParameters {
    fn default() -> Self {
        RaffleParameters {
            presold_percent: DEFAULT_PRESOLD_PERCENT,
            fixed_seed: None,
        }
    }
}

impl RaffleParameters {
    pub fn presold_percent(&self) -> u8 {
        self.presold_percent.min(100)
    }
}

/// Argument given once, when the application is instantiated on a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleInstantiation {
    pub user: AccountOwner,
    #[serde(default = "default_initial_balance")]
    pub initial_balance: Amount,
    #[serde(default = "default_seed_lotteries")]
    pub seed_lotteries: bool,
}

fn default_seed_lotteries() -> bool {
    true
}

impl RaffleInstantiation {
    pub fn new(user: AccountOwner) -> Self {
        RaffleInstantiation {
            user,
            initial_balance: default_initial_balance(),
            seed_lotteries: true,
        }
    }
}

/// What the operator fills in to open a new lottery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LotteryRequest {
    pub name: String,
    pub ticket_price: Amount,
    pub total_tickets: u64,
    pub deadline: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RaffleOperation {
    CreateLottery(LotteryRequest),
    /// Buy exactly these ticket numbers.
    BuyTickets {
        lottery_id: u64,
        ticket_numbers: Vec<u64>,
    },
    /// Buy the `count` lowest-numbered tickets still on sale.
    BuyAvailableTickets { lottery_id: u64, count: u64 },
    CloseLottery { lottery_id: u64 },
    AddFunds { amount: Amount },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RaffleResponse {
    Ok,
    LotteryId(u64),
    Purchased(Purchase),
    WinnerDrawn(Winner),
    Rejected(RaffleError),
}

/// One purchasable unit within a lottery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, SimpleObject)]
pub struct Ticket {
    pub id: String,
    pub number: u64,
    pub price: Amount,
    pub sold: bool,
    pub owner: Option<AccountOwner>,
}

impl Ticket {
    /// Sold through a purchase, as opposed to pre-sold at generation.
    pub fn is_participant(&self) -> bool {
        self.sold && self.owner.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, SimpleObject)]
pub struct Winner {
    pub ticket_number: u64,
    pub user: AccountOwner,
    pub prize: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, SimpleObject)]
pub struct Lottery {
    pub id: u64,
    pub name: String,
    pub ticket_price: Amount,
    pub total_tickets: u64,
    pub deadline: Timestamp,
    pub active: bool,
    pub tickets: Vec<Ticket>,
    pub winner: Option<Winner>,
}

impl Lottery {
    pub fn participant_tickets(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.iter().filter(|ticket| ticket.is_participant())
    }

    pub fn available_numbers(&self) -> impl Iterator<Item = u64> + '_ {
        self.tickets
            .iter()
            .filter(|ticket| !ticket.sold)
            .map(|ticket| ticket.number)
    }

    pub fn sold_count(&self) -> u64 {
        self.tickets.iter().filter(|ticket| ticket.sold).count() as u64
    }
}

/// Ticket numbers the acting user holds in one lottery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, SimpleObject)]
pub struct LedgerEntry {
    pub lottery_id: u64,
    pub ticket_numbers: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, SimpleObject)]
pub struct Purchase {
    pub lottery_id: u64,
    pub ticket_numbers: Vec<u64>,
    pub total_cost: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, SimpleObject)]
pub struct Participant {
    pub user: AccountOwner,
    pub ticket_count: u64,
}

/// Totals over every lottery that has been drawn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, SimpleObject)]
pub struct RaffleStats {
    pub completed_lotteries: u64,
    pub total_prizes: Amount,
    pub total_tickets_sold: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RaffleError {
    NotInitialized,
    AlreadyInitialized,
    NotFound(u64),
    InsufficientFunds { required: Amount, available: Amount },
    InsufficientParticipants { found: u64, required: u64 },
    AlreadyClosed(u64),
    NoTicketsRequested,
    TicketOutOfRange { number: u64, total: u64 },
    NotEnoughTickets { requested: u64, available: u64 },
    TooManyTickets { requested: u64, max: u64 },
    Storage(String),
}

impl fmt::Display for RaffleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaffleError::NotInitialized => write!(f, "raffle has not been instantiated"),
            RaffleError::AlreadyInitialized => write!(f, "raffle is already instantiated"),
            RaffleError::NotFound(id) => write!(f, "lottery {} not found", id),
            RaffleError::InsufficientFunds { required, available } => write!(
                f,
                "insufficient funds: {} required, {} available",
                required, available
            ),
            RaffleError::InsufficientParticipants { found, required } => write!(
                f,
                "not enough participants: {} participant tickets, {} required",
                found, required
            ),
            RaffleError::AlreadyClosed(id) => write!(f, "lottery {} is already closed", id),
            RaffleError::NoTicketsRequested => write!(f, "no tickets requested"),
            RaffleError::TicketOutOfRange { number, total } => {
                write!(f, "ticket {} is outside 1..={}", number, total)
            }
            RaffleError::NotEnoughTickets {
                requested,
                available,
            } => write!(
                f,
                "{} tickets requested but only {} available",
                requested, available
            ),
            RaffleError::TooManyTickets { requested, max } => write!(
                f,
                "a lottery holds at most {} tickets, {} requested",
                max, requested
            ),
            RaffleError::Storage(error) => write!(f, "storage error: {}", error),
        }
    }
}

impl std::error::Error for RaffleError {}
