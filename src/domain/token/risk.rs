//! Risk heuristics over enriched token records
//!
//! Every check is a pure function of the record and the evaluation clock.
//! A missing derived field resolves to the conservative side of its check,
//! except the distribution check which needs supply context to mean anything.

use crate::shared::types::TokenRecord;

/// Minimum quote-side liquidity, USD
pub const MIN_QUOTE_LIQUIDITY_USD: f64 = 2_000.0;
/// A pool older than this no longer counts as new, seconds
pub const MAX_POOL_AGE_SECS: i64 = 30;
/// LP supply burned below this share counts as unlocked, percent
pub const MIN_BURNED_LP_PCT: f64 = 80.0;
/// Top-ten holders above this share of supply is a distribution issue, percent
pub const MAX_TOP_HOLDERS_PCT: f64 = 80.0;
/// Any single holder above this share of supply is a distribution issue, percent
pub const MAX_SINGLE_HOLDER_PCT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskFlag {
    MintAuthorityEnabled,
    FreezeAuthorityEnabled,
    QuoteLiquidityBelowThreshold,
    NotNewToken,
    LiquidityPoolNotLocked,
    LiquidityDistributionIssue,
}

impl std::fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RiskFlag::MintAuthorityEnabled => "mint authority enabled",
            RiskFlag::FreezeAuthorityEnabled => "freeze authority enabled",
            RiskFlag::QuoteLiquidityBelowThreshold => "quote liquidity below threshold",
            RiskFlag::NotNewToken => "pool is not new",
            RiskFlag::LiquidityPoolNotLocked => "liquidity pool not locked",
            RiskFlag::LiquidityDistributionIssue => "liquidity distribution issue",
        };
        f.write_str(name)
    }
}

pub struct RiskEvaluator;

impl RiskEvaluator {
    /// Run all checks. Empty result means the token passed.
    pub fn evaluate(record: &TokenRecord, now_epoch: i64) -> Vec<RiskFlag> {
        let mut flags = Vec::new();

        if record.mint_authority.is_some() {
            flags.push(RiskFlag::MintAuthorityEnabled);
        }
        if record.freeze_authority.is_some() {
            flags.push(RiskFlag::FreezeAuthorityEnabled);
        }

        let quote_liquidity_usd = record
            .pool_info
            .as_ref()
            .map(|info| info.quote_liquidity)
            .unwrap_or(0.0);
        if quote_liquidity_usd < MIN_QUOTE_LIQUIDITY_USD {
            flags.push(RiskFlag::QuoteLiquidityBelowThreshold);
        }

        // Unknown creation time reads as stale, not fresh
        let age = record
            .pool_created_at
            .map(|created| now_epoch - created)
            .unwrap_or(i64::MAX);
        if age > MAX_POOL_AGE_SECS {
            flags.push(RiskFlag::NotNewToken);
        }

        if record.burned_lp_percentage.unwrap_or(0.0) < MIN_BURNED_LP_PCT {
            flags.push(RiskFlag::LiquidityPoolNotLocked);
        }

        if Self::distribution_issue(record) {
            flags.push(RiskFlag::LiquidityDistributionIssue);
        }

        flags
    }

    fn distribution_issue(record: &TokenRecord) -> bool {
        let (supply, decimals) = match (record.supply, record.decimals) {
            (Some(s), Some(d)) => (s, d),
            _ => return false,
        };
        let supply_ui = supply as f64 / 10f64.powi(decimals as i32);
        if supply_ui == 0.0 || record.holders_distribution.is_empty() {
            return false;
        }

        let top_ten: f64 = record
            .holders_distribution
            .iter()
            .take(10)
            .map(|h| h.ui_amount)
            .sum();
        if top_ten > supply_ui * (MAX_TOP_HOLDERS_PCT / 100.0) {
            return true;
        }

        record
            .holders_distribution
            .iter()
            .any(|h| h.ui_amount > supply_ui * (MAX_SINGLE_HOLDER_PCT / 100.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::{HolderBalance, ParsedPoolInfo};

    const NOW: i64 = 1_700_000_000;

    fn holder(ui_amount: f64) -> HolderBalance {
        HolderBalance {
            address: "holder".to_string(),
            amount: ui_amount as u64,
            ui_amount,
        }
    }

    fn pool_info(quote_liquidity_usd: f64) -> ParsedPoolInfo {
        ParsedPoolInfo {
            base_token_amount: 1_000_000.0,
            quote_token_amount: quote_liquidity_usd / 140.0,
            base_price_usd: 0.0,
            quote_price_usd: 140.0,
            base_liquidity: 0.0,
            quote_liquidity: quote_liquidity_usd,
        }
    }

    /// A record that passes every check
    fn clean_record() -> TokenRecord {
        let mut record = TokenRecord::new("token");
        record.mint_authority = None;
        record.freeze_authority = None;
        record.pool_info = Some(pool_info(5_000.0));
        record.pool_created_at = Some(NOW - 10);
        record.burned_lp_percentage = Some(95.0);
        record.supply = Some(1_000_000);
        record.decimals = Some(0);
        record.holders_distribution = vec![holder(100_000.0), holder(50_000.0)];
        record
    }

    #[test]
    fn test_clean_record_passes() {
        assert!(RiskEvaluator::evaluate(&clean_record(), NOW).is_empty());
    }

    #[test]
    fn test_authority_flags() {
        let mut record = clean_record();
        record.mint_authority = Some("auth".to_string());
        record.freeze_authority = Some("auth".to_string());
        let flags = RiskEvaluator::evaluate(&record, NOW);
        assert!(flags.contains(&RiskFlag::MintAuthorityEnabled));
        assert!(flags.contains(&RiskFlag::FreezeAuthorityEnabled));
    }

    #[test]
    fn test_quote_liquidity_threshold_is_strict() {
        let mut record = clean_record();
        record.pool_info = Some(pool_info(MIN_QUOTE_LIQUIDITY_USD));
        assert!(RiskEvaluator::evaluate(&record, NOW).is_empty());

        record.pool_info = Some(pool_info(1_999.0));
        let flags = RiskEvaluator::evaluate(&record, NOW);
        assert_eq!(flags, vec![RiskFlag::QuoteLiquidityBelowThreshold]);
    }

    #[test]
    fn test_missing_pool_info_counts_as_no_liquidity() {
        let mut record = clean_record();
        record.pool_info = None;
        let flags = RiskEvaluator::evaluate(&record, NOW);
        assert!(flags.contains(&RiskFlag::QuoteLiquidityBelowThreshold));
    }

    #[test]
    fn test_pool_age_threshold_is_strict() {
        let mut record = clean_record();
        record.pool_created_at = Some(NOW - MAX_POOL_AGE_SECS);
        assert!(RiskEvaluator::evaluate(&record, NOW).is_empty());

        record.pool_created_at = Some(NOW - MAX_POOL_AGE_SECS - 1);
        assert_eq!(
            RiskEvaluator::evaluate(&record, NOW),
            vec![RiskFlag::NotNewToken]
        );
    }

    #[test]
    fn test_missing_burn_counts_as_unlocked() {
        let mut record = clean_record();
        record.burned_lp_percentage = None;
        assert_eq!(
            RiskEvaluator::evaluate(&record, NOW),
            vec![RiskFlag::LiquidityPoolNotLocked]
        );

        record.burned_lp_percentage = Some(MIN_BURNED_LP_PCT);
        assert!(RiskEvaluator::evaluate(&record, NOW).is_empty());
    }

    #[test]
    fn test_top_holders_concentration() {
        let mut record = clean_record();
        // 1_000_000 supply, top ten sum 850_000 > 80%
        record.holders_distribution = (0..10).map(|_| holder(85_000.0)).collect();
        assert_eq!(
            RiskEvaluator::evaluate(&record, NOW),
            vec![RiskFlag::LiquidityDistributionIssue]
        );
    }

    #[test]
    fn test_single_holder_concentration() {
        let mut record = clean_record();
        // Top-ten sum stays under 80% but one holder crosses 50%
        record.holders_distribution = vec![holder(600_000.0), holder(100_000.0)];
        assert_eq!(
            RiskEvaluator::evaluate(&record, NOW),
            vec![RiskFlag::LiquidityDistributionIssue]
        );
    }

    #[test]
    fn test_distribution_skipped_without_supply() {
        let mut record = clean_record();
        record.supply = None;
        record.holders_distribution = vec![holder(999_999.0)];
        assert!(RiskEvaluator::evaluate(&record, NOW).is_empty());
    }
}
