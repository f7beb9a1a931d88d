// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use linera_sdk::linera_base_types::{AccountOwner, Amount, Timestamp};
use linera_sdk::views::{linera_views, MapView, RegisterView, RootView, ViewError, ViewStorageContext};
use num_bigint::BigUint;
use num_traits::cast::ToPrimitive;
use raffle::{
    LedgerEntry, Lottery, LotteryRequest, Participant, Purchase, RaffleError, RaffleInstantiation,
    RaffleStats, Ticket, Winner, MAX_TICKETS, MIN_PARTICIPANT_TICKETS,
};
use rand::Rng;

fn storage_error(error: ViewError) -> RaffleError {
    RaffleError::Storage(format!("{:?}", error))
}

/// Multiplies a unit price by a ticket count.
/// Returns `None` when the result does not fit in an `Amount`.
fn price_times(price: Amount, count: u64) -> Option<Amount> {
    let total = BigUint::from(u128::from(price)) * BigUint::from(count);
    total.to_u128().map(Amount::from_attos)
}

/// The lotteries every fresh raffle starts with, in display order.
fn seed_lotteries() -> [LotteryRequest; 2] {
    [
        LotteryRequest {
            name: "Golden Jackpot".to_string(),
            ticket_price: Amount::from_millis(100),
            total_tickets: 100,
            // 2025-11-01T23:59:59Z
            deadline: Timestamp::from(1_762_041_599_000_000),
        },
        LotteryRequest {
            name: "Mega Fortune".to_string(),
            ticket_price: Amount::from_millis(500),
            total_tickets: 50,
            // 2025-10-25T23:59:59Z
            deadline: Timestamp::from(1_761_436_799_000_000),
        },
    ]
}

/// Numbers tickets `1..=total_tickets`. Each one is marked sold, without an
/// owner, with probability `presold_percent`%.
fn generate_tickets(
    lottery_id: u64,
    request: &LotteryRequest,
    presold_percent: u8,
    rng: &mut impl Rng,
) -> Vec<Ticket> {
    let presold = u32::from(presold_percent.min(100));
    (1..=request.total_tickets)
        .map(|number| Ticket {
            id: format!("ticket-{}-{}", lottery_id, number),
            number,
            price: request.ticket_price,
            sold: rng.gen_ratio(presold, 100),
            owner: None,
        })
        .collect()
}

/// The application state for the Raffle.
#[derive(RootView)]
#[view(context = ViewStorageContext)]
pub struct RaffleState {
    /// The single acting user
    pub user: RegisterView<Option<AccountOwner>>,
    /// Wallet balance of the acting user
    pub balance: RegisterView<Amount>,
    /// Counter for generating unique lottery IDs
    pub lottery_counter: RegisterView<u64>,
    /// All lotteries by ID
    pub lotteries: MapView<u64, Lottery>,
    /// Lottery IDs, most recently created first
    pub lottery_order: RegisterView<Vec<u64>>,
    /// Tickets bought by the acting user, one entry per lottery
    pub ledger: RegisterView<Vec<LedgerEntry>>,
    /// Bumped after every accepted operation that drew random values
    pub rng_nonce: RegisterView<u64>,
}

#[allow(dead_code)]
impl RaffleState {
    /// Sets up the acting user, the wallet and, optionally, the seed lotteries.
    pub async fn initialize(
        &mut self,
        argument: RaffleInstantiation,
        presold_percent: u8,
        rng: &mut impl Rng,
    ) -> Result<(), RaffleError> {
        if self.user.get().is_some() {
            return Err(RaffleError::AlreadyInitialized);
        }
        self.user.set(Some(argument.user));
        self.balance.set(argument.initial_balance);

        if argument.seed_lotteries {
            for request in seed_lotteries() {
                let lottery_id = self.insert_lottery(request, presold_percent, rng)?;
                self.lottery_order.get_mut().push(lottery_id);
            }
        }
        Ok(())
    }

    /// Nonce mixed into the seed of the next random generator.
    pub fn nonce(&self) -> u64 {
        *self.rng_nonce.get()
    }

    /// Moves to a fresh nonce once randomness has been consumed by an
    /// accepted operation.
    pub fn advance_nonce(&mut self) {
        let nonce = self.nonce().wrapping_add(1);
        self.rng_nonce.set(nonce);
    }

    fn acting_user(&self) -> Result<AccountOwner, RaffleError> {
        self.user.get().clone().ok_or(RaffleError::NotInitialized)
    }

    fn insert_lottery(
        &mut self,
        request: LotteryRequest,
        presold_percent: u8,
        rng: &mut impl Rng,
    ) -> Result<u64, RaffleError> {
        if request.total_tickets > MAX_TICKETS {
            return Err(RaffleError::TooManyTickets {
                requested: request.total_tickets,
                max: MAX_TICKETS,
            });
        }
        let lottery_id = *self.lottery_counter.get() + 1;
        self.lottery_counter.set(lottery_id);

        let tickets = generate_tickets(lottery_id, &request, presold_percent, rng);
        let lottery = Lottery {
            id: lottery_id,
            name: request.name,
            ticket_price: request.ticket_price,
            total_tickets: request.total_tickets,
            deadline: request.deadline,
            active: true,
            tickets,
            winner: None,
        };
        self.lotteries
            .insert(&lottery_id, lottery)
            .map_err(storage_error)?;
        Ok(lottery_id)
    }

    async fn load_lottery(&self, lottery_id: u64) -> Result<Lottery, RaffleError> {
        self.lotteries
            .get(&lottery_id)
            .await
            .map_err(storage_error)?
            .ok_or(RaffleError::NotFound(lottery_id))
    }

    /// Creates a new lottery and lists it ahead of all existing ones.
    pub async fn create_lottery(
        &mut self,
        request: LotteryRequest,
        presold_percent: u8,
        rng: &mut impl Rng,
    ) -> Result<u64, RaffleError> {
        self.acting_user()?;
        let lottery_id = self.insert_lottery(request, presold_percent, rng)?;
        self.lottery_order.get_mut().insert(0, lottery_id);
        eprintln!("Created lottery {}", lottery_id);
        Ok(lottery_id)
    }

    /// Buys the given ticket numbers for the acting user.
    ///
    /// Tickets that are already sold are taken over, so callers are expected
    /// to request unsold numbers only. Duplicated numbers are charged and
    /// recorded in the ledger once per occurrence. Nothing changes on error.
    pub async fn buy_tickets(
        &mut self,
        lottery_id: u64,
        ticket_numbers: Vec<u64>,
    ) -> Result<Purchase, RaffleError> {
        let user = self.acting_user()?;
        if ticket_numbers.is_empty() {
            return Err(RaffleError::NoTicketsRequested);
        }

        let mut lottery = self.load_lottery(lottery_id).await?;
        if !lottery.active {
            return Err(RaffleError::AlreadyClosed(lottery_id));
        }
        if let Some(&number) = ticket_numbers
            .iter()
            .find(|&&number| number == 0 || number > lottery.total_tickets)
        {
            return Err(RaffleError::TicketOutOfRange {
                number,
                total: lottery.total_tickets,
            });
        }

        let available = *self.balance.get();
        let total_cost = price_times(lottery.ticket_price, ticket_numbers.len() as u64)
            .ok_or(RaffleError::InsufficientFunds {
                required: Amount::from_attos(u128::MAX),
                available,
            })?;
        if available < total_cost {
            return Err(RaffleError::InsufficientFunds {
                required: total_cost,
                available,
            });
        }

        let requested: BTreeSet<u64> = ticket_numbers.iter().copied().collect();
        for ticket in lottery
            .tickets
            .iter_mut()
            .filter(|ticket| requested.contains(&ticket.number))
        {
            ticket.sold = true;
            ticket.owner = Some(user.clone());
        }
        self.lotteries
            .insert(&lottery_id, lottery)
            .map_err(storage_error)?;

        self.balance.set(available.saturating_sub(total_cost));

        let ledger = self.ledger.get_mut();
        match ledger.iter_mut().find(|entry| entry.lottery_id == lottery_id) {
            Some(entry) => entry.ticket_numbers.extend(ticket_numbers.iter().copied()),
            None => ledger.push(LedgerEntry {
                lottery_id,
                ticket_numbers: ticket_numbers.clone(),
            }),
        }

        eprintln!(
            "Bought {} tickets in lottery {} for {}",
            ticket_numbers.len(),
            lottery_id,
            total_cost
        );
        Ok(Purchase {
            lottery_id,
            ticket_numbers,
            total_cost,
        })
    }

    /// Buys the `count` lowest-numbered tickets that are still unsold.
    pub async fn buy_available_tickets(
        &mut self,
        lottery_id: u64,
        count: u64,
    ) -> Result<Purchase, RaffleError> {
        self.acting_user()?;
        if count == 0 {
            return Err(RaffleError::NoTicketsRequested);
        }
        let lottery = self.load_lottery(lottery_id).await?;
        if !lottery.active {
            return Err(RaffleError::AlreadyClosed(lottery_id));
        }
        let unsold: Vec<u64> = lottery.available_numbers().collect();
        if (unsold.len() as u64) < count {
            return Err(RaffleError::NotEnoughTickets {
                requested: count,
                available: unsold.len() as u64,
            });
        }
        let selected = unsold.into_iter().take(count as usize).collect();
        self.buy_tickets(lottery_id, selected).await
    }

    /// Draws a winner among the participant tickets and closes the lottery.
    ///
    /// The prize is the ticket price times the number of participant tickets.
    pub async fn close_lottery(
        &mut self,
        lottery_id: u64,
        rng: &mut impl Rng,
    ) -> Result<Winner, RaffleError> {
        self.acting_user()?;
        let mut lottery = self.load_lottery(lottery_id).await?;
        if !lottery.active {
            return Err(RaffleError::AlreadyClosed(lottery_id));
        }

        let entrants: Vec<(u64, AccountOwner)> = lottery
            .tickets
            .iter()
            .filter(|ticket| ticket.sold)
            .filter_map(|ticket| ticket.owner.clone().map(|owner| (ticket.number, owner)))
            .collect();
        let found = entrants.len() as u64;
        if found < MIN_PARTICIPANT_TICKETS {
            return Err(RaffleError::InsufficientParticipants {
                found,
                required: MIN_PARTICIPANT_TICKETS,
            });
        }

        let (ticket_number, user) = entrants[rng.gen_range(0..entrants.len())].clone();
        let prize = price_times(lottery.ticket_price, found)
            .unwrap_or(Amount::from_attos(u128::MAX));
        let winner = Winner {
            ticket_number,
            user,
            prize,
        };

        lottery.active = false;
        lottery.winner = Some(winner.clone());
        self.lotteries
            .insert(&lottery_id, lottery)
            .map_err(storage_error)?;

        eprintln!(
            "Lottery {} closed: ticket {} wins {} out of {} participant tickets",
            lottery_id, ticket_number, prize, found
        );
        Ok(winner)
    }

    /// Credits the wallet.
    pub async fn add_funds(&mut self, amount: Amount) -> Result<(), RaffleError> {
        self.acting_user()?;
        let balance = self.balance.get().saturating_add(amount);
        self.balance.set(balance);
        Ok(())
    }

    pub fn current_user(&self) -> Option<AccountOwner> {
        self.user.get().clone()
    }

    pub fn wallet_balance(&self) -> Amount {
        *self.balance.get()
    }

    pub fn purchased_tickets(&self) -> Vec<LedgerEntry> {
        self.ledger.get().clone()
    }

    /// Get lottery by ID
    pub async fn get_lottery(&self, lottery_id: u64) -> Result<Option<Lottery>, RaffleError> {
        self.lotteries.get(&lottery_id).await.map_err(storage_error)
    }

    /// Get all lotteries, most recently created first
    pub async fn get_all_lotteries(&self) -> Result<Vec<Lottery>, RaffleError> {
        let order = self.lottery_order.get();
        let mut lotteries = Vec::with_capacity(order.len());
        for lottery_id in order {
            lotteries.push(self.load_lottery(*lottery_id).await?);
        }
        Ok(lotteries)
    }

    pub async fn get_active_lotteries(&self) -> Result<Vec<Lottery>, RaffleError> {
        let mut lotteries = self.get_all_lotteries().await?;
        lotteries.retain(|lottery| lottery.active);
        Ok(lotteries)
    }

    /// Lotteries that were closed with a winner.
    pub async fn get_completed_lotteries(&self) -> Result<Vec<Lottery>, RaffleError> {
        let mut lotteries = self.get_all_lotteries().await?;
        lotteries.retain(|lottery| !lottery.active && lottery.winner.is_some());
        Ok(lotteries)
    }

    /// Unsold ticket numbers of a lottery.
    pub async fn get_available_tickets(&self, lottery_id: u64) -> Result<Vec<u64>, RaffleError> {
        let lottery = self.load_lottery(lottery_id).await?;
        Ok(lottery.available_numbers().collect())
    }

    /// Distinct ticket owners of a lottery with the number of tickets each holds,
    /// in order of their first ticket.
    pub async fn get_participants(&self, lottery_id: u64) -> Result<Vec<Participant>, RaffleError> {
        let lottery = self.load_lottery(lottery_id).await?;
        let mut participants: Vec<Participant> = Vec::new();
        for owner in lottery
            .tickets
            .iter()
            .filter(|ticket| ticket.sold)
            .filter_map(|ticket| ticket.owner.as_ref())
        {
            match participants.iter_mut().find(|participant| &participant.user == owner) {
                Some(participant) => participant.ticket_count += 1,
                None => participants.push(Participant {
                    user: owner.clone(),
                    ticket_count: 1,
                }),
            }
        }
        Ok(participants)
    }

    pub async fn get_stats(&self) -> Result<RaffleStats, RaffleError> {
        let completed = self.get_completed_lotteries().await?;
        let mut stats = RaffleStats::default();
        for lottery in &completed {
            stats.completed_lotteries += 1;
            stats.total_tickets_sold += lottery.sold_count();
            if let Some(winner) = &lottery.winner {
                stats.total_prizes = stats.total_prizes.saturating_add(winner.prize);
            }
        }
        Ok(stats)
    }
}
