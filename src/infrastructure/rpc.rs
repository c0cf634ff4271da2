//! Chain access behind one async trait
//!
//! Domain code talks to [`ChainRpc`] only; [`SolanaRpc`] adapts the
//! nonblocking solana-client and converts jsonParsed transactions into the
//! runtime-neutral model in `shared::tx`.

use std::str::FromStr;

use async_trait::async_trait;
use solana_account_decoder::{UiAccountData, UiAccountEncoding};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{
    RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcTransactionConfig,
};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use solana_transaction_status::{
    EncodedTransaction, UiInstruction, UiMessage, UiParsedInstruction, UiTransactionEncoding,
};

use crate::shared::errors::{AppError, SwapError};
use crate::shared::tx::{
    InnerInstructions, ParsedConfirmedTx, ParsedInstruction, TxInstruction, TxTokenBalance,
};
use crate::shared::types::{HolderBalance, MintInfo, TokenAccountInfo, TxStatus};

/// Chain reads and transaction submission used across the application
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn get_parsed_transaction(&self, signature: &str) -> Result<ParsedConfirmedTx, AppError>;
    async fn get_account_data(&self, address: &Pubkey) -> Result<Vec<u8>, AppError>;
    async fn get_mint_info(&self, mint: &Pubkey) -> Result<MintInfo, AppError>;
    async fn get_token_largest_accounts(
        &self,
        mint: &Pubkey,
    ) -> Result<Vec<HolderBalance>, AppError>;
    async fn get_token_account_balance(&self, account: &Pubkey) -> Result<f64, AppError>;
    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        mint: Option<&Pubkey>,
    ) -> Result<Vec<TokenAccountInfo>, AppError>;
    async fn get_program_accounts_with_filters(
        &self,
        program: &Pubkey,
        data_size: u64,
        memcmp: Vec<(usize, Vec<u8>)>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, AppError>;
    async fn get_latest_blockhash(&self) -> Result<Hash, AppError>;
    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<String, AppError>;
    async fn simulate_transaction(&self, tx: &VersionedTransaction) -> Result<(), AppError>;
    async fn get_transaction_status(&self, signature: &str) -> Result<TxStatus, AppError>;
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, AppError>;
}

pub struct SolanaRpc {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl SolanaRpc {
    pub fn new(rpc_url: String, commitment: CommitmentConfig) -> Self {
        Self {
            client: RpcClient::new_with_commitment(rpc_url, commitment),
            commitment,
        }
    }
}

fn rpc_err(err: impl std::fmt::Display) -> AppError {
    AppError::Rpc(err.to_string())
}

fn convert_instruction(ui: &UiInstruction) -> Option<TxInstruction> {
    match ui {
        UiInstruction::Parsed(UiParsedInstruction::Parsed(p)) => {
            let program_id = Pubkey::from_str(&p.program_id).ok()?;
            let instruction_type = p.parsed.get("type")?.as_str()?.to_string();
            let info = p.parsed.get("info").cloned().unwrap_or_default();
            Some(TxInstruction::Parsed(ParsedInstruction {
                program_id,
                instruction_type,
                info,
            }))
        }
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(pd)) => {
            let program_id = Pubkey::from_str(&pd.program_id).ok()?;
            let accounts = pd
                .accounts
                .iter()
                .filter_map(|a| Pubkey::from_str(a).ok())
                .collect();
            Some(TxInstruction::PartiallyDecoded {
                program_id,
                accounts,
            })
        }
        // Compiled instructions carry no account addresses to act on
        UiInstruction::Compiled(_) => None,
    }
}

#[async_trait]
impl ChainRpc for SolanaRpc {
    async fn get_parsed_transaction(&self, signature: &str) -> Result<ParsedConfirmedTx, AppError> {
        let sig = Signature::from_str(signature).map_err(rpc_err)?;
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };
        let tx = self
            .client
            .get_transaction_with_config(&sig, config)
            .await
            .map_err(rpc_err)?;

        let mut parsed = ParsedConfirmedTx::default();

        if let EncodedTransaction::Json(ui_tx) = &tx.transaction.transaction {
            if let UiMessage::Parsed(message) = &ui_tx.message {
                parsed.instructions = message
                    .instructions
                    .iter()
                    .filter_map(convert_instruction)
                    .collect();
            }
        }

        if let Some(meta) = tx.transaction.meta {
            if let Some(inner) = Option::<Vec<_>>::from(meta.inner_instructions) {
                parsed.inner_instructions = inner
                    .iter()
                    .map(|set| InnerInstructions {
                        index: set.index,
                        instructions: set
                            .instructions
                            .iter()
                            .filter_map(convert_instruction)
                            .collect(),
                    })
                    .collect();
            }
            if let Some(logs) = Option::<Vec<String>>::from(meta.log_messages) {
                parsed.log_messages = logs;
            }
            if let Some(balances) = Option::<Vec<_>>::from(meta.pre_token_balances) {
                parsed.pre_token_balances = balances
                    .iter()
                    .map(|b| TxTokenBalance {
                        mint: b.mint.clone(),
                        decimals: b.ui_token_amount.decimals,
                    })
                    .collect();
            }
        }

        Ok(parsed)
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Vec<u8>, AppError> {
        self.client.get_account_data(address).await.map_err(rpc_err)
    }

    async fn get_mint_info(&self, mint: &Pubkey) -> Result<MintInfo, AppError> {
        let data = self.get_account_data(mint).await?;
        let parsed = spl_token::state::Mint::unpack(&data).map_err(rpc_err)?;
        Ok(MintInfo {
            mint_authority: Option::<Pubkey>::from(parsed.mint_authority).map(|k| k.to_string()),
            freeze_authority: Option::<Pubkey>::from(parsed.freeze_authority)
                .map(|k| k.to_string()),
            supply: parsed.supply,
            decimals: parsed.decimals,
        })
    }

    async fn get_token_largest_accounts(
        &self,
        mint: &Pubkey,
    ) -> Result<Vec<HolderBalance>, AppError> {
        let balances = self
            .client
            .get_token_largest_accounts(mint)
            .await
            .map_err(rpc_err)?;
        Ok(balances
            .into_iter()
            .map(|b| {
                let amount = b.amount.amount.parse().unwrap_or(0);
                let ui_amount = b
                    .amount
                    .ui_amount
                    .unwrap_or(amount as f64 / 10f64.powi(b.amount.decimals as i32));
                HolderBalance {
                    address: b.address,
                    amount,
                    ui_amount,
                }
            })
            .collect())
    }

    async fn get_token_account_balance(&self, account: &Pubkey) -> Result<f64, AppError> {
        let balance = self
            .client
            .get_token_account_balance(account)
            .await
            .map_err(rpc_err)?;
        Ok(balance.ui_amount.unwrap_or_else(|| {
            let raw: u64 = balance.amount.parse().unwrap_or(0);
            raw as f64 / 10f64.powi(balance.decimals as i32)
        }))
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        mint: Option<&Pubkey>,
    ) -> Result<Vec<TokenAccountInfo>, AppError> {
        let filter = match mint {
            Some(mint) => TokenAccountsFilter::Mint(*mint),
            None => TokenAccountsFilter::ProgramId(spl_token::id()),
        };
        let accounts = self
            .client
            .get_token_accounts_by_owner(owner, filter)
            .await
            .map_err(rpc_err)?;

        Ok(accounts
            .into_iter()
            .filter_map(|keyed| {
                let pubkey = Pubkey::from_str(&keyed.pubkey).ok()?;
                let parsed = match keyed.account.data {
                    UiAccountData::Json(parsed) => parsed.parsed,
                    _ => return None,
                };
                let info = parsed.get("info")?;
                let mint = info.get("mint")?.as_str()?.to_string();
                let ui_amount = info
                    .get("tokenAmount")?
                    .get("uiAmount")?
                    .as_f64()
                    .unwrap_or(0.0);
                Some(TokenAccountInfo {
                    pubkey,
                    mint,
                    ui_amount,
                })
            })
            .collect())
    }

    async fn get_program_accounts_with_filters(
        &self,
        program: &Pubkey,
        data_size: u64,
        memcmp: Vec<(usize, Vec<u8>)>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, AppError> {
        let mut filters = vec![RpcFilterType::DataSize(data_size)];
        for (offset, bytes) in memcmp {
            filters.push(RpcFilterType::Memcmp(Memcmp::new_raw_bytes(offset, bytes)));
        }
        let config = RpcProgramAccountsConfig {
            filters: Some(filters),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };
        let accounts = self
            .client
            .get_program_accounts_with_config(program, config)
            .await
            .map_err(rpc_err)?;
        Ok(accounts
            .into_iter()
            .map(|(pubkey, account)| (pubkey, account.data))
            .collect())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, AppError> {
        self.client.get_latest_blockhash().await.map_err(rpc_err)
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<String, AppError> {
        let signature = self
            .client
            .send_transaction(tx)
            .await
            .map_err(|e| AppError::Swap(SwapError::Submission(e.to_string())))?;
        Ok(signature.to_string())
    }

    async fn simulate_transaction(&self, tx: &VersionedTransaction) -> Result<(), AppError> {
        let response = self
            .client
            .simulate_transaction(tx)
            .await
            .map_err(|e| AppError::Swap(SwapError::Simulation(e.to_string())))?;
        if let Some(err) = response.value.err {
            return Err(AppError::Swap(SwapError::Simulation(format!("{:?}", err))));
        }
        Ok(())
    }

    async fn get_transaction_status(&self, signature: &str) -> Result<TxStatus, AppError> {
        let sig = Signature::from_str(signature).map_err(rpc_err)?;
        let statuses = self
            .client
            .get_signature_statuses_with_history(&[sig])
            .await
            .map_err(rpc_err)?;
        Ok(match statuses.value.into_iter().next().flatten() {
            None => TxStatus::Pending,
            Some(status) if status.err.is_some() => TxStatus::Failed,
            Some(_) => TxStatus::Success,
        })
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, AppError> {
        self.client.get_balance(address).await.map_err(rpc_err)
    }
}


#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Canned-response chain for unit tests. Missing entries surface as
    /// errors the same way a dead RPC node would.
    #[derive(Default)]
    pub(crate) struct StaticRpc {
        pub accounts: HashMap<Pubkey, Vec<u8>>,
        pub token_balances: HashMap<Pubkey, f64>,
        pub parsed_txs: HashMap<String, ParsedConfirmedTx>,
        pub mints: HashMap<Pubkey, MintInfo>,
        pub largest_accounts: HashMap<Pubkey, Vec<HolderBalance>>,
        pub owner_accounts: Vec<TokenAccountInfo>,
        pub program_accounts: Vec<(Pubkey, Vec<u8>)>,
        pub lamports: u64,
        pub fail_send: bool,
        pub statuses: Mutex<VecDeque<TxStatus>>,
        pub sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChainRpc for StaticRpc {
        async fn get_parsed_transaction(
            &self,
            signature: &str,
        ) -> Result<ParsedConfirmedTx, AppError> {
            self.parsed_txs
                .get(signature)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("transaction {signature}")))
        }

        async fn get_account_data(&self, address: &Pubkey) -> Result<Vec<u8>, AppError> {
            self.accounts
                .get(address)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("account {address}")))
        }

        async fn get_mint_info(&self, mint: &Pubkey) -> Result<MintInfo, AppError> {
            self.mints
                .get(mint)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("mint {mint}")))
        }

        async fn get_token_largest_accounts(
            &self,
            mint: &Pubkey,
        ) -> Result<Vec<HolderBalance>, AppError> {
            self.largest_accounts
                .get(mint)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("largest accounts for {mint}")))
        }

        async fn get_token_account_balance(&self, account: &Pubkey) -> Result<f64, AppError> {
            self.token_balances
                .get(account)
                .copied()
                .ok_or_else(|| AppError::NotFound(format!("token account {account}")))
        }

        async fn get_token_accounts_by_owner(
            &self,
            _owner: &Pubkey,
            mint: Option<&Pubkey>,
        ) -> Result<Vec<TokenAccountInfo>, AppError> {
            Ok(self
                .owner_accounts
                .iter()
                .filter(|a| mint.map_or(true, |m| a.mint == m.to_string()))
                .cloned()
                .collect())
        }

        async fn get_program_accounts_with_filters(
            &self,
            _program: &Pubkey,
            _data_size: u64,
            memcmp: Vec<(usize, Vec<u8>)>,
        ) -> Result<Vec<(Pubkey, Vec<u8>)>, AppError> {
            Ok(self
                .program_accounts
                .iter()
                .filter(|(_, data)| {
                    memcmp.iter().all(|(offset, bytes)| {
                        data.get(*offset..offset + bytes.len()) == Some(bytes.as_slice())
                    })
                })
                .cloned()
                .collect())
        }

        async fn get_latest_blockhash(&self) -> Result<Hash, AppError> {
            Ok(Hash::default())
        }

        async fn send_transaction(&self, _tx: &VersionedTransaction) -> Result<String, AppError> {
            if self.fail_send {
                return Err(AppError::Swap(SwapError::Submission(
                    "node rejected transaction".to_string(),
                )));
            }
            let mut sent = self.sent.lock().unwrap();
            let signature = format!("mock-signature-{}", sent.len() + 1);
            sent.push(signature.clone());
            Ok(signature)
        }

        async fn simulate_transaction(&self, _tx: &VersionedTransaction) -> Result<(), AppError> {
            Ok(())
        }

        async fn get_transaction_status(&self, _signature: &str) -> Result<TxStatus, AppError> {
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(TxStatus::Success))
        }

        async fn get_balance(&self, _address: &Pubkey) -> Result<u64, AppError> {
            Ok(self.lamports)
        }
    }
}
