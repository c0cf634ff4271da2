//! Trading wallet
//!
//! The secret is read from an environment variable as a bs58-encoded 64-byte
//! keypair, never from config files or the command line.

use std::sync::Arc;

use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

use crate::infrastructure::rpc::ChainRpc;
use crate::shared::errors::AppError;
use crate::shared::types::TokenAccountInfo;

pub struct WalletManager {
    keypair: Keypair,
}

impl WalletManager {
    pub fn from_env(var: &str) -> Result<Self, AppError> {
        let secret = std::env::var(var)
            .map_err(|_| AppError::Wallet(format!("environment variable {var} is not set")))?;
        Self::from_base58(&secret)
    }

    pub fn from_base58(secret: &str) -> Result<Self, AppError> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| AppError::Wallet(format!("secret is not valid base58: {e}")))?;
        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| AppError::Wallet(format!("invalid keypair bytes: {e}")))?;
        Ok(Self { keypair })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// SOL balance in whole SOL
    pub async fn sol_balance(&self, rpc: &Arc<dyn ChainRpc>) -> Result<f64, AppError> {
        let lamports = rpc.get_balance(&self.pubkey()).await?;
        Ok(lamports as f64 / LAMPORTS_PER_SOL as f64)
    }

    /// Summed ui balance across the wallet's accounts for one mint
    pub async fn token_balance(
        &self,
        rpc: &Arc<dyn ChainRpc>,
        mint: &Pubkey,
    ) -> Result<f64, AppError> {
        let accounts = rpc
            .get_token_accounts_by_owner(&self.pubkey(), Some(mint))
            .await?;
        Ok(accounts.iter().map(|a| a.ui_amount).sum())
    }

    /// Every SPL token account the wallet owns
    pub async fn token_accounts(
        &self,
        rpc: &Arc<dyn ChainRpc>,
    ) -> Result<Vec<TokenAccountInfo>, AppError> {
        rpc.get_token_accounts_by_owner(&self.pubkey(), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base58_round_trip() {
        let keypair = Keypair::new();
        let encoded = bs58::encode(keypair.to_bytes()).into_string();
        let wallet = WalletManager::from_base58(&encoded).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_invalid_secret_rejected() {
        assert!(WalletManager::from_base58("not-base58-0OIl").is_err());
        // valid base58 but wrong length
        let short = bs58::encode([1u8; 16]).into_string();
        assert!(WalletManager::from_base58(&short).is_err());
    }
}
