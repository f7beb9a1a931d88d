// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(target_arch = "wasm32", no_main)]

mod state;

use linera_sdk::{
    linera_base_types::WithContractAbi,
    views::{RootView, View},
    Contract, ContractRuntime,
};
use raffle::{
    RaffleAbi, RaffleError, RaffleInstantiation, RaffleOperation, RaffleParameters,
    RaffleResponse,
};
use rand::{rngs::StdRng, SeedableRng};

use self::state::RaffleState;

pub struct RaffleContract {
    state: RaffleState,
    runtime: ContractRuntime<Self>,
}

linera_sdk::contract!(RaffleContract);

impl WithContractAbi for RaffleContract {
    type Abi = RaffleAbi;
}

impl RaffleContract {
    /// Seeds a generator from the configured seed, or from the block clock and
    /// height when none is configured. The nonce keeps two draws in the same
    /// block apart; it only moves on once an operation is accepted.
    fn rng(&mut self) -> StdRng {
        let base = match self.runtime.application_parameters().fixed_seed {
            Some(seed) => seed,
            None => {
                let timestamp = self.runtime.system_time().micros();
                let block_height = self.runtime.block_height();
                timestamp.wrapping_add(block_height.into())
            }
        };
        let nonce = self.state.nonce();
        StdRng::seed_from_u64(base ^ nonce.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    fn presold_percent(&mut self) -> u8 {
        self.runtime.application_parameters().presold_percent()
    }
}

impl Contract for RaffleContract {
    type Message = ();
    type Parameters = RaffleParameters;
    type InstantiationArgument = RaffleInstantiation;
    type EventValue = ();

    async fn load(runtime: ContractRuntime<Self>) -> Self {
        let state = RaffleState::load(runtime.root_view_storage_context())
            .await
            .expect("Failed to load state");
        RaffleContract { state, runtime }
    }

    async fn instantiate(&mut self, argument: Self::InstantiationArgument) {
        let presold_percent = self.presold_percent();
        let mut rng = self.rng();
        if let Err(e) = self
            .state
            .initialize(argument, presold_percent, &mut rng)
            .await
        {
            panic!("Failed to instantiate raffle: {}", e);
        }
        self.state.advance_nonce();
    }

    async fn execute_operation(&mut self, operation: Self::Operation) -> Self::Response {
        let result = match operation {
            RaffleOperation::CreateLottery(request) => {
                let presold_percent = self.presold_percent();
                let mut rng = self.rng();
                let result = self
                    .state
                    .create_lottery(request, presold_percent, &mut rng)
                    .await
                    .map(RaffleResponse::LotteryId);
                if result.is_ok() {
                    self.state.advance_nonce();
                }
                result
            }

            RaffleOperation::BuyTickets {
                lottery_id,
                ticket_numbers,
            } => self
                .state
                .buy_tickets(lottery_id, ticket_numbers)
                .await
                .map(RaffleResponse::Purchased),

            RaffleOperation::BuyAvailableTickets { lottery_id, count } => self
                .state
                .buy_available_tickets(lottery_id, count)
                .await
                .map(RaffleResponse::Purchased),

            RaffleOperation::CloseLottery { lottery_id } => {
                let mut rng = self.rng();
                let result = self
                    .state
                    .close_lottery(lottery_id, &mut rng)
                    .await
                    .map(RaffleResponse::WinnerDrawn);
                if result.is_ok() {
                    self.state.advance_nonce();
                }
                result
            }

            RaffleOperation::AddFunds { amount } => self
                .state
                .add_funds(amount)
                .await
                .map(|()| RaffleResponse::Ok),
        };

        match result {
            Ok(response) => response,
            Err(RaffleError::Storage(e)) => panic!("Raffle storage failure: {}", e),
            Err(error) => {
                eprintln!("Operation rejected: {}", error);
                RaffleResponse::Rejected(error)
            }
        }
    }

    async fn execute_message(&mut self, _message: Self::Message) {
        panic!("Raffle application doesn't support any cross-chain messages");
    }

    async fn store(mut self) {
        self.state.save().await.expect("Failed to save state");
    }
}
