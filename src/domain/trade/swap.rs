//! Raydium V4 swap construction
//!
//! Builds the `swap_base_in` instruction and wraps it into a signed v0
//! transaction together with compute budget, ATA creation and WSOL
//! wrapping/unwrapping. Quoting is plain constant-product with the pool's
//! 25 bps taker fee.

use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::message::{v0::Message as MessageV0, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::system_instruction;
use solana_sdk::transaction::VersionedTransaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

use crate::shared::constants::WSOL_MINT;
use crate::shared::errors::SwapError;
use crate::shared::types::LiquidityPoolKeys;

/// Instruction tag of swap-base-in on the V4 AMM
const SWAP_BASE_IN_TAG: u8 = 9;
/// Pool taker fee, basis points
const SWAP_FEE_BPS: u128 = 25;

/// Constant-product output for a given input, fee deducted up front
pub fn quote_out_amount(amount_in: u64, reserve_in: u64, reserve_out: u64) -> u64 {
    if reserve_in == 0 || reserve_out == 0 {
        return 0;
    }
    let amount_in_after_fee = amount_in as u128 * (10_000 - SWAP_FEE_BPS) / 10_000;
    let numerator = reserve_out as u128 * amount_in_after_fee;
    let denominator = reserve_in as u128 + amount_in_after_fee;
    (numerator / denominator) as u64
}

/// Worst acceptable output under the slippage tolerance
pub fn min_amount_out(expected_out: u64, slippage_pct: f64) -> u64 {
    (expected_out as f64 * (1.0 - slippage_pct / 100.0)) as u64
}

/// The raw swap instruction. Account order is the V4 program's ABI.
pub fn swap_base_in_instruction(
    keys: &LiquidityPoolKeys,
    user_source: &Pubkey,
    user_destination: &Pubkey,
    user_owner: &Pubkey,
    amount_in: u64,
    min_amount_out: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(17);
    data.push(SWAP_BASE_IN_TAG);
    data.extend_from_slice(&amount_in.to_le_bytes());
    data.extend_from_slice(&min_amount_out.to_le_bytes());

    Instruction {
        program_id: keys.program_id,
        accounts: vec![
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new(keys.id, false),
            AccountMeta::new_readonly(keys.authority, false),
            AccountMeta::new(keys.open_orders, false),
            AccountMeta::new(keys.target_orders, false),
            AccountMeta::new(keys.base_vault, false),
            AccountMeta::new(keys.quote_vault, false),
            AccountMeta::new_readonly(keys.market_program_id, false),
            AccountMeta::new(keys.market_id, false),
            AccountMeta::new(keys.market_bids, false),
            AccountMeta::new(keys.market_asks, false),
            AccountMeta::new(keys.market_event_queue, false),
            AccountMeta::new(keys.market_base_vault, false),
            AccountMeta::new(keys.market_quote_vault, false),
            AccountMeta::new_readonly(keys.market_authority, false),
            AccountMeta::new(*user_source, false),
            AccountMeta::new(*user_destination, false),
            AccountMeta::new_readonly(*user_owner, true),
        ],
        data,
    }
}

pub struct SwapParams<'a> {
    pub keys: &'a LiquidityPoolKeys,
    pub wallet: &'a Keypair,
    /// Input amount in ui units of the input token
    pub amount_in_ui: f64,
    /// true buys the token with SOL, false sells it back
    pub sol_to_token: bool,
    pub slippage_pct: f64,
    pub priority_fee_microlamports: u64,
    /// Live base reserve, ui units
    pub base_reserve_ui: f64,
    /// Live quote reserve, ui units
    pub quote_reserve_ui: f64,
    pub blockhash: Hash,
}

#[derive(Debug)]
pub struct BuiltSwap {
    pub transaction: VersionedTransaction,
    pub amount_in_raw: u64,
    pub expected_out_ui: f64,
    pub min_out_raw: u64,
}

fn raw(ui: f64, decimals: u8) -> u64 {
    (ui * 10f64.powi(decimals as i32)) as u64
}

/// Build, compile and sign the full swap transaction
pub fn build_swap_transaction(params: SwapParams<'_>) -> Result<BuiltSwap, SwapError> {
    let keys = params.keys;
    let owner = params.wallet.pubkey();

    let sol_is_base = keys.base_mint == WSOL_MINT;
    let (sol_mint, sol_decimals, sol_reserve) = if sol_is_base {
        (keys.base_mint, keys.base_decimals, params.base_reserve_ui)
    } else {
        (keys.quote_mint, keys.quote_decimals, params.quote_reserve_ui)
    };
    let (token_mint, token_decimals, token_reserve) = if sol_is_base {
        (keys.quote_mint, keys.quote_decimals, params.quote_reserve_ui)
    } else {
        (keys.base_mint, keys.base_decimals, params.base_reserve_ui)
    };

    let (input_mint, input_decimals, reserve_in_ui) = if params.sol_to_token {
        (sol_mint, sol_decimals, sol_reserve)
    } else {
        (token_mint, token_decimals, token_reserve)
    };
    let (output_mint, output_decimals, reserve_out_ui) = if params.sol_to_token {
        (token_mint, token_decimals, token_reserve)
    } else {
        (sol_mint, sol_decimals, sol_reserve)
    };

    let amount_in_raw = raw(params.amount_in_ui, input_decimals);
    if amount_in_raw == 0 {
        return Err(SwapError::Build("input amount rounds to zero".to_string()));
    }
    let expected_out_raw = quote_out_amount(
        amount_in_raw,
        raw(reserve_in_ui, input_decimals),
        raw(reserve_out_ui, output_decimals),
    );
    let min_out_raw = min_amount_out(expected_out_raw, params.slippage_pct);

    let user_source = get_associated_token_address(&owner, &input_mint);
    let user_destination = get_associated_token_address(&owner, &output_mint);
    let wsol_account = get_associated_token_address(&owner, &WSOL_MINT);

    let mut instructions = vec![ComputeBudgetInstruction::set_compute_unit_price(
        params.priority_fee_microlamports,
    )];

    if params.sol_to_token {
        // Wrap the SOL leg, then make sure the output ATA exists
        instructions.push(create_associated_token_account_idempotent(
            &owner,
            &owner,
            &WSOL_MINT,
            &spl_token::id(),
        ));
        instructions.push(system_instruction::transfer(
            &owner,
            &wsol_account,
            amount_in_raw,
        ));
        instructions.push(
            spl_token::instruction::sync_native(&spl_token::id(), &wsol_account)
                .map_err(|e| SwapError::Build(e.to_string()))?,
        );
        instructions.push(create_associated_token_account_idempotent(
            &owner,
            &owner,
            &output_mint,
            &spl_token::id(),
        ));
    } else {
        instructions.push(create_associated_token_account_idempotent(
            &owner,
            &owner,
            &WSOL_MINT,
            &spl_token::id(),
        ));
    }

    instructions.push(swap_base_in_instruction(
        keys,
        &user_source,
        &user_destination,
        &owner,
        amount_in_raw,
        min_out_raw,
    ));

    // Closing the WSOL account returns the wrapped lamports either way
    instructions.push(
        spl_token::instruction::close_account(
            &spl_token::id(),
            &wsol_account,
            &owner,
            &owner,
            &[],
        )
        .map_err(|e| SwapError::Build(e.to_string()))?,
    );

    let message = MessageV0::try_compile(&owner, &instructions, &[], params.blockhash)
        .map_err(|e| SwapError::Build(e.to_string()))?;
    let transaction =
        VersionedTransaction::try_new(VersionedMessage::V0(message), &[params.wallet])
            .map_err(|e| SwapError::Build(e.to_string()))?;

    Ok(BuiltSwap {
        transaction,
        amount_in_raw,
        expected_out_ui: expected_out_raw as f64 / 10f64.powi(output_decimals as i32),
        min_out_raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::RAYDIUM_POOL_V4_PROGRAM_ID;

    fn sample_keys() -> LiquidityPoolKeys {
        LiquidityPoolKeys {
            id: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            quote_mint: WSOL_MINT,
            lp_mint: Pubkey::new_unique(),
            base_decimals: 6,
            quote_decimals: 9,
            lp_decimals: 9,
            version: 4,
            program_id: RAYDIUM_POOL_V4_PROGRAM_ID,
            authority: Pubkey::new_unique(),
            open_orders: Pubkey::new_unique(),
            target_orders: Pubkey::new_unique(),
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            withdraw_queue: Pubkey::new_unique(),
            lp_vault: Pubkey::new_unique(),
            market_version: 3,
            market_program_id: Pubkey::new_unique(),
            market_id: Pubkey::new_unique(),
            market_authority: Pubkey::new_unique(),
            market_base_vault: Pubkey::new_unique(),
            market_quote_vault: Pubkey::new_unique(),
            market_bids: Pubkey::new_unique(),
            market_asks: Pubkey::new_unique(),
            market_event_queue: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_quote_out_amount() {
        // 100 in against 1000/1000: fee leaves 99, out = 1000*99/1099
        assert_eq!(quote_out_amount(100, 1_000, 1_000), 90);
        assert_eq!(quote_out_amount(100, 0, 1_000), 0);
        assert_eq!(quote_out_amount(0, 1_000, 1_000), 0);
    }

    #[test]
    fn test_quote_is_monotonic_in_input() {
        let small = quote_out_amount(1_000, 1_000_000, 1_000_000);
        let large = quote_out_amount(10_000, 1_000_000, 1_000_000);
        assert!(large > small);
        // Output never exceeds the pool's reserve
        let huge = quote_out_amount(u64::MAX / 2, 1_000_000, 1_000_000);
        assert!(huge < 1_000_000);
    }

    #[test]
    fn test_min_amount_out_applies_slippage() {
        assert_eq!(min_amount_out(1_000, 5.0), 950);
        assert_eq!(min_amount_out(1_000, 0.0), 1_000);
    }

    #[test]
    fn test_swap_instruction_shape() {
        let keys = sample_keys();
        let source = Pubkey::new_unique();
        let destination = Pubkey::new_unique();
        let owner = Pubkey::new_unique();

        let ix = swap_base_in_instruction(&keys, &source, &destination, &owner, 5_000, 4_750);

        assert_eq!(ix.program_id, RAYDIUM_POOL_V4_PROGRAM_ID);
        assert_eq!(ix.data[0], SWAP_BASE_IN_TAG);
        assert_eq!(ix.data.len(), 17);
        assert_eq!(u64::from_le_bytes(ix.data[1..9].try_into().unwrap()), 5_000);
        assert_eq!(
            u64::from_le_bytes(ix.data[9..17].try_into().unwrap()),
            4_750
        );

        assert_eq!(ix.accounts.len(), 18);
        assert_eq!(ix.accounts[0].pubkey, spl_token::id());
        assert_eq!(ix.accounts[1].pubkey, keys.id);
        assert_eq!(ix.accounts[15].pubkey, source);
        assert_eq!(ix.accounts[16].pubkey, destination);
        let owner_meta = &ix.accounts[17];
        assert_eq!(owner_meta.pubkey, owner);
        assert!(owner_meta.is_signer);
    }

    #[test]
    fn test_build_buy_transaction() {
        let keys = sample_keys();
        let wallet = Keypair::new();
        let built = build_swap_transaction(SwapParams {
            keys: &keys,
            wallet: &wallet,
            amount_in_ui: 0.1,
            sol_to_token: true,
            slippage_pct: 5.0,
            priority_fee_microlamports: 500_000,
            base_reserve_ui: 1_000_000.0,
            quote_reserve_ui: 500.0,
            blockhash: Hash::default(),
        })
        .unwrap();

        assert_eq!(built.amount_in_raw, 100_000_000); // 0.1 SOL
        assert!(built.expected_out_ui > 0.0);
        assert!(built.min_out_raw > 0);
        assert_eq!(built.transaction.signatures.len(), 1);
    }

    #[test]
    fn test_zero_input_rejected() {
        let keys = sample_keys();
        let wallet = Keypair::new();
        let err = build_swap_transaction(SwapParams {
            keys: &keys,
            wallet: &wallet,
            amount_in_ui: 0.0,
            sol_to_token: true,
            slippage_pct: 5.0,
            priority_fee_microlamports: 500_000,
            base_reserve_ui: 1_000_000.0,
            quote_reserve_ui: 500.0,
            blockhash: Hash::default(),
        })
        .unwrap_err();
        assert!(matches!(err, SwapError::Build(_)));
    }
}
