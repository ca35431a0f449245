use ethers::types::U256;

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default downward tolerance on deposit, swap and single-coin withdrawal quotes.
pub const DEFAULT_SLIPPAGE_BPS: u64 = 500;

/// Minimum acceptable output: `floor(quote * (10000 - slippage_bps) / 10000)`.
///
/// Split into quotient and remainder so `quote * keep` cannot overflow.
pub fn min_out(quote: U256, slippage_bps: u64) -> U256 {
    let keep = U256::from(BPS_DENOMINATOR - slippage_bps.min(BPS_DENOMINATOR));
    let denominator = U256::from(BPS_DENOMINATOR);

    let whole = quote / denominator;
    let rest = quote % denominator;

    whole * keep + rest * keep / denominator
}
