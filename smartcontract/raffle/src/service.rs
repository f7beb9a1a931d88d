// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(target_arch = "wasm32", no_main)]

mod state;

use std::sync::Arc;

use async_graphql::{EmptySubscription, Object, Request, Response, Schema};
use linera_sdk::{
    linera_base_types::{AccountOwner, Amount, Timestamp, WithServiceAbi},
    views::View,
    Service, ServiceRuntime,
};
use raffle::{
    LedgerEntry, Lottery, LotteryRequest, Participant, RaffleAbi, RaffleOperation,
    RaffleParameters, RaffleStats, MAX_TICKETS,
};

use self::state::RaffleState;

pub struct RaffleService {
    state: Arc<RaffleState>,
    runtime: Arc<ServiceRuntime<Self>>,
}

linera_sdk::service!(RaffleService);

impl WithServiceAbi for RaffleService {
    type Abi = RaffleAbi;
}

impl Service for RaffleService {
    type Parameters = RaffleParameters;

    async fn new(runtime: ServiceRuntime<Self>) -> Self {
        let state = RaffleState::load(runtime.root_view_storage_context())
            .await
            .expect("Failed to load state");
        RaffleService {
            state: Arc::new(state),
            runtime: Arc::new(runtime),
        }
    }

    async fn handle_query(&self, request: Request) -> Response {
        let schema = Schema::build(
            QueryRoot {
                state: self.state.clone(),
            },
            MutationRoot {
                state: self.state.clone(),
                runtime: self.runtime.clone(),
            },
            EmptySubscription,
        )
        .finish();
        schema.execute(request).await
    }
}

struct QueryRoot {
    state: Arc<RaffleState>,
}

#[Object]
impl QueryRoot {
    /// All lotteries, most recently created first
    async fn lotteries(&self) -> async_graphql::Result<Vec<Lottery>> {
        Ok(self.state.get_all_lotteries().await?)
    }

    async fn lottery(&self, id: u64) -> async_graphql::Result<Option<Lottery>> {
        Ok(self.state.get_lottery(id).await?)
    }

    /// Lotteries still accepting purchases
    async fn active_lotteries(&self) -> async_graphql::Result<Vec<Lottery>> {
        Ok(self.state.get_active_lotteries().await?)
    }

    /// Lotteries that have been drawn
    async fn completed_lotteries(&self) -> async_graphql::Result<Vec<Lottery>> {
        Ok(self.state.get_completed_lotteries().await?)
    }

    async fn available_tickets(&self, lottery_id: u64) -> async_graphql::Result<Vec<u64>> {
        Ok(self.state.get_available_tickets(lottery_id).await?)
    }

    /// Ticket owners of a lottery and how many tickets each holds
    async fn participants(&self, lottery_id: u64) -> async_graphql::Result<Vec<Participant>> {
        Ok(self.state.get_participants(lottery_id).await?)
    }

    async fn wallet_balance(&self) -> Amount {
        self.state.wallet_balance()
    }

    async fn current_user(&self) -> Option<AccountOwner> {
        self.state.current_user()
    }

    /// Tickets bought by the current user, per lottery
    async fn purchased_tickets(&self) -> Vec<LedgerEntry> {
        self.state.purchased_tickets()
    }

    async fn stats(&self) -> async_graphql::Result<RaffleStats> {
        Ok(self.state.get_stats().await?)
    }
}

struct MutationRoot {
    state: Arc<RaffleState>,
    runtime: Arc<ServiceRuntime<RaffleService>>,
}

fn parse_amount(value: &str) -> async_graphql::Result<Amount> {
    value
        .trim()
        .parse::<Amount>()
        .map_err(|e| async_graphql::Error::new(format!("Invalid amount {:?}: {}", value, e)))
}

#[Object]
impl MutationRoot {
    /// Open a new lottery. `ticket_price` is a decimal token amount.
    async fn create_lottery(
        &self,
        name: String,
        ticket_price: String,
        total_tickets: u64,
        deadline: Timestamp,
    ) -> async_graphql::Result<String> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err("Lottery name must not be empty".into());
        }
        let ticket_price = parse_amount(&ticket_price)?;
        if ticket_price == Amount::ZERO {
            return Err("Ticket price must be positive".into());
        }
        if total_tickets == 0 {
            return Err("A lottery needs at least one ticket".into());
        }
        if total_tickets > MAX_TICKETS {
            return Err(format!("A lottery holds at most {} tickets", MAX_TICKETS).into());
        }

        self.runtime
            .schedule_operation(&RaffleOperation::CreateLottery(LotteryRequest {
                name: name.clone(),
                ticket_price,
                total_tickets,
                deadline,
            }));
        Ok(format!("CreateLottery operation scheduled: {}", name))
    }

    /// Buy specific tickets. Every number must still be on sale.
    async fn buy_tickets(
        &self,
        lottery_id: u64,
        ticket_numbers: Vec<u64>,
    ) -> async_graphql::Result<String> {
        if ticket_numbers.is_empty() {
            return Err("Select at least one ticket".into());
        }
        let available = self.state.get_available_tickets(lottery_id).await?;
        let taken: Vec<u64> = ticket_numbers
            .iter()
            .copied()
            .filter(|number| !available.contains(number))
            .collect();
        if !taken.is_empty() {
            return Err(format!("Tickets no longer available: {:?}", taken).into());
        }

        self.runtime.schedule_operation(&RaffleOperation::BuyTickets {
            lottery_id,
            ticket_numbers,
        });
        Ok(format!("BuyTickets operation scheduled for lottery {}", lottery_id))
    }

    /// Buy the next `count` tickets still on sale
    async fn buy_available_tickets(&self, lottery_id: u64, count: u64) -> async_graphql::Result<String> {
        if count == 0 {
            return Err("Select at least one ticket".into());
        }
        self.runtime
            .schedule_operation(&RaffleOperation::BuyAvailableTickets { lottery_id, count });
        Ok(format!(
            "BuyAvailableTickets operation scheduled for {} tickets in lottery {}",
            count, lottery_id
        ))
    }

    /// Draw the winner and close the lottery
    async fn close_lottery(&self, lottery_id: u64) -> String {
        self.runtime
            .schedule_operation(&RaffleOperation::CloseLottery { lottery_id });
        format!("CloseLottery operation scheduled for lottery {}", lottery_id)
    }

    /// Credit the wallet. `amount` is a decimal token amount.
    async fn add_funds(&self, amount: String) -> async_graphql::Result<String> {
        let amount = parse_amount(&amount)?;
        self.runtime
            .schedule_operation(&RaffleOperation::AddFunds { amount });
        Ok(format!("AddFunds operation scheduled: {}", amount))
    }
}
