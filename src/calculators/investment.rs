//! Recurring and lump-sum investment calculators: SIP, reverse SIP, RD, FD,
//! compound interest and loan EMI.

use super::{months_in, round2};
use serde::{Deserialize, Serialize};

/// Banks in India compound fixed deposits quarterly.
pub const FD_DEFAULT_FREQUENCY: u32 = 4;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SipCalculationResult {
    pub monthly_investment: f64,
    pub years: f64,
    pub annual_rate: f64,
    pub future_value: f64,
    pub total_invested: f64,
    pub total_gain: f64,
}

/// Same shape as a SIP result; `monthly_investment` is the solved quantity.
pub type ReverseSipResult = SipCalculationResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmiCalculationResult {
    pub principal: f64,
    pub annual_rate: f64,
    pub years: f64,
    pub tenure_months: u32,
    pub emi: f64,
    pub total_payment: f64,
    pub total_interest: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompoundInterestResult {
    pub principal: f64,
    pub annual_rate: f64,
    pub years: f64,
    pub compounding_frequency: u32,
    pub future_value: f64,
    pub total_interest: f64,
}

/// A fixed deposit is compound interest with a bank's compounding schedule.
pub type FdCalculationResult = CompoundInterestResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RdCalculationResult {
    pub monthly_deposit: f64,
    pub months: u32,
    pub annual_rate: f64,
    pub total_deposited: f64,
    pub future_value: f64,
    pub total_interest: f64,
}

fn monthly_rate(annual_rate: f64) -> f64 {
    annual_rate / 12.0 / 100.0
}

/// Accumulation factor of an annuity-due: each contribution is made at the
/// start of the period and grows within it.
fn annuity_due_factor(i: f64, n: u32) -> f64 {
    if i == 0.0 {
        n as f64
    } else {
        ((1.0 + i).powf(n as f64) - 1.0) / i * (1.0 + i)
    }
}

pub fn calculate_sip(monthly_investment: f64, years: f64, annual_rate: f64) -> SipCalculationResult {
    if monthly_investment <= 0.0 || years <= 0.0 {
        return SipCalculationResult::default();
    }

    let n = months_in(years);
    let future_value = round2(monthly_investment * annuity_due_factor(monthly_rate(annual_rate), n));
    let total_invested = round2(monthly_investment * n as f64);

    SipCalculationResult {
        monthly_investment,
        years,
        annual_rate,
        future_value,
        total_invested,
        total_gain: round2(future_value - total_invested),
    }
}

/// Monthly contribution needed to reach `target_amount` in `years`.
pub fn calculate_reverse_sip(target_amount: f64, years: f64, annual_rate: f64) -> ReverseSipResult {
    let n = months_in(years);
    if target_amount <= 0.0 || years <= 0.0 || n == 0 {
        return ReverseSipResult::default();
    }

    let monthly_investment =
        round2(target_amount / annuity_due_factor(monthly_rate(annual_rate), n));
    let future_value = round2(target_amount);
    let total_invested = round2(monthly_investment * n as f64);

    ReverseSipResult {
        monthly_investment,
        years,
        annual_rate,
        future_value,
        total_invested,
        total_gain: round2(future_value - total_invested),
    }
}

pub fn calculate_rd(monthly_deposit: f64, months: u32, annual_rate: f64) -> RdCalculationResult {
    if monthly_deposit <= 0.0 || months == 0 {
        return RdCalculationResult::default();
    }

    let future_value = round2(monthly_deposit * annuity_due_factor(monthly_rate(annual_rate), months));
    let total_deposited = round2(monthly_deposit * months as f64);

    RdCalculationResult {
        monthly_deposit,
        months,
        annual_rate,
        total_deposited,
        future_value,
        total_interest: round2(future_value - total_deposited),
    }
}

/// `FV = P * (1 + r / (100 f))^(f * y)`.
///
/// Zero years is a valid term and returns the principal unchanged; a
/// frequency of zero is treated as annual compounding.
pub fn calculate_compound_interest(
    principal: f64,
    annual_rate: f64,
    years: f64,
    compounding_frequency: u32,
) -> CompoundInterestResult {
    if principal <= 0.0 || years < 0.0 {
        return CompoundInterestResult::default();
    }

    let frequency = compounding_frequency.max(1);
    let periods = frequency as f64 * years;
    let growth = (1.0 + annual_rate / (100.0 * frequency as f64)).powf(periods);

    let principal_rounded = round2(principal);
    let future_value = round2(principal * growth);

    CompoundInterestResult {
        principal,
        annual_rate,
        years,
        compounding_frequency: frequency,
        future_value,
        total_interest: round2(future_value - principal_rounded),
    }
}

pub fn calculate_fd(
    principal: f64,
    annual_rate: f64,
    years: f64,
    compounding_frequency: u32,
) -> FdCalculationResult {
    calculate_compound_interest(principal, annual_rate, years, compounding_frequency)
}

/// Standard amortising-loan EMI: `P r (1+r)^n / ((1+r)^n - 1)`.
pub fn calculate_emi(principal: f64, years: f64, annual_rate: f64) -> EmiCalculationResult {
    let n = months_in(years);
    if principal <= 0.0 || years <= 0.0 || n == 0 {
        return EmiCalculationResult::default();
    }

    let r = monthly_rate(annual_rate);
    let raw_emi = if r == 0.0 {
        principal / n as f64
    } else {
        let growth = (1.0 + r).powf(n as f64);
        principal * r * growth / (growth - 1.0)
    };

    let emi = round2(raw_emi);
    let total_payment = round2(emi * n as f64);

    EmiCalculationResult {
        principal,
        annual_rate,
        years,
        tenure_months: n,
        emi,
        total_payment,
        total_interest: round2(total_payment - round2(principal)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    #[test]
    fn test_sip_zero_rate_is_exact() {
        let result = calculate_sip(5_000.0, 10.0, 0.0);
        assert_eq!(result.future_value, 5_000.0 * 10.0 * 12.0);
        assert_eq!(result.total_invested, 600_000.0);
        assert_eq!(result.total_gain, 0.0);
    }

    #[test]
    fn test_sip_default_rate() {
        let result = calculate_sip(5_000.0, 10.0, 12.0);
        assert_eq!(result.total_invested, 600_000.0);
        // 5000 * ((1.01^120 - 1) / 0.01) * 1.01
        assert!((result.future_value - 1_161_695.38).abs() < 0.05);
        assert_eq!(
            round2(result.total_invested + result.total_gain),
            result.future_value
        );
    }

    #[test]
    fn test_sip_degenerate_inputs() {
        assert_eq!(calculate_sip(0.0, 10.0, 12.0), SipCalculationResult::default());
        assert_eq!(calculate_sip(5_000.0, 0.0, 12.0), SipCalculationResult::default());
        assert_eq!(calculate_sip(-1.0, -1.0, 12.0).future_value, 0.0);
    }

    #[test]
    fn test_reverse_sip_zero_rate() {
        let result = calculate_reverse_sip(1_200_000.0, 10.0, 0.0);
        assert_eq!(result.monthly_investment, 10_000.0);
        assert_eq!(result.total_gain, 0.0);
    }

    #[test]
    fn test_rd() {
        let result = calculate_rd(2_000.0, 12, 0.0);
        assert_eq!(result.future_value, 24_000.0);

        let with_rate = calculate_rd(2_000.0, 12, 6.5);
        assert_eq!(with_rate.total_deposited, 24_000.0);
        assert!(with_rate.total_interest > 0.0);
        assert_eq!(
            round2(with_rate.total_deposited + with_rate.total_interest),
            with_rate.future_value
        );
        assert_eq!(calculate_rd(2_000.0, 0, 6.5), RdCalculationResult::default());
    }

    #[test]
    fn test_compound_interest() {
        let result = calculate_compound_interest(100_000.0, 10.0, 2.0, 1);
        assert_eq!(result.future_value, 121_000.0);
        assert_eq!(result.total_interest, 21_000.0);

        let zero_years = calculate_fd(50_000.0, 7.0, 0.0, FD_DEFAULT_FREQUENCY);
        assert_eq!(zero_years.future_value, 50_000.0);
        assert_eq!(zero_years.total_interest, 0.0);

        let zero_frequency = calculate_compound_interest(1_000.0, 10.0, 1.0, 0);
        assert_eq!(zero_frequency.compounding_frequency, 1);
        assert_eq!(zero_frequency.future_value, 1_100.0);
    }

    #[test]
    fn test_emi() {
        let result = calculate_emi(1_000_000.0, 20.0, 8.5);
        assert_eq!(result.tenure_months, 240);
        assert!((result.emi - 8_678.23).abs() < 0.05);
        assert_eq!(
            result.total_interest,
            round2(result.total_payment - 1_000_000.0)
        );

        let interest_free = calculate_emi(120_000.0, 1.0, 0.0);
        assert_eq!(interest_free.emi, 10_000.0);
        assert_eq!(interest_free.total_interest, 0.0);

        assert_eq!(calculate_emi(0.0, 5.0, 9.0), EmiCalculationResult::default());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_reverse_sip_round_trips(
            monthly in 500u32..200_000,
            years in 1u32..40,
            rate_bp in 1u32..2_000
        ) {
            let rate = rate_bp as f64 / 100.0;
            let sip = calculate_sip(monthly as f64, years as f64, rate);
            let reverse = calculate_reverse_sip(sip.future_value, years as f64, rate);
            prop_assert!((reverse.monthly_investment - monthly as f64).abs() <= 1.0);
        }

        #[test]
        fn prop_fd_never_loses_principal(
            principal in 1u32..10_000_000,
            rate_bp in 0u32..2_000,
            years in 0u32..30,
            frequency in 1u32..13
        ) {
            let result = calculate_fd(principal as f64, rate_bp as f64 / 100.0, years as f64, frequency);
            prop_assert!(result.future_value >= principal as f64);
        }

        #[test]
        fn prop_sip_gain_identity(
            monthly in 100u32..100_000,
            years in 1u32..30,
            rate_bp in 0u32..2_000
        ) {
            let result = calculate_sip(monthly as f64, years as f64, rate_bp as f64 / 100.0);
            prop_assert!((result.total_invested + result.total_gain - result.future_value).abs() < 0.005);
        }
    }
}
