//! Financial formula library
//!
//! Pure, synchronous, closed-form calculators. Nothing in here touches the
//! network or shared state, so every function is safe to call from any
//! request concurrently.
//!
//! Money is rounded half away from zero at two decimals. Derived amounts
//! (gain, interest) are computed from already-rounded components so that
//! `future_value == invested + gain` holds on the published figures.

pub mod investment;
pub mod planning;
pub mod tax;

pub use investment::{
    calculate_compound_interest, calculate_emi, calculate_fd, calculate_rd,
    calculate_reverse_sip, calculate_sip, CompoundInterestResult, EmiCalculationResult,
    FdCalculationResult, RdCalculationResult, ReverseSipResult, SipCalculationResult,
    FD_DEFAULT_FREQUENCY,
};
pub use planning::{
    calculate_budget_allocation, calculate_dti, calculate_fire, calculate_hra,
    calculate_portfolio_allocation, calculate_retirement_corpus, calculate_savings_ratio,
    calculate_term_insurance, BudgetAllocationResult, DtiBand, DtiResult,
    FireCalculationResult, HraResult, PortfolioAllocationResult, RetirementAssumptions,
    RetirementCorpusResult, SavingsBand, SavingsRatioResult, TermInsuranceResult,
};
pub use tax::{
    calculate_tax, BreakdownEntry, TaxCalculationResult, TaxComparison, TaxRegime,
    STANDARD_DEDUCTION,
};

/// Round half away from zero to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Number of whole monthly periods in `years`.
pub(crate) fn months_in(years: f64) -> u32 {
    (years * 12.0).round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(2.675_000_1), 2.68);
        assert_eq!(round2(1.005_000_1), 1.01);
        assert_eq!(round2(-1.255_000_1), -1.26);
        assert_eq!(round2(10.0), 10.0);
    }

    #[test]
    fn test_months_in() {
        assert_eq!(months_in(10.0), 120);
        assert_eq!(months_in(1.5), 18);
        assert_eq!(months_in(-1.0), 0);
    }
}
