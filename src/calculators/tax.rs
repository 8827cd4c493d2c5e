//! Income tax under the new and old slab regimes

use serde::{Deserialize, Serialize};
use std::fmt;

pub const STANDARD_DEDUCTION: f64 = 50_000.0;
const CESS_RATE: f64 = 0.04;

/// `(upper bound of band, marginal rate)`; the last band is open-ended.
const NEW_REGIME_SLABS: &[(f64, f64)] = &[
    (300_000.0, 0.00),
    (600_000.0, 0.05),
    (900_000.0, 0.10),
    (1_200_000.0, 0.15),
    (1_500_000.0, 0.20),
    (f64::INFINITY, 0.30),
];

const OLD_REGIME_SLABS: &[(f64, f64)] = &[
    (250_000.0, 0.00),
    (500_000.0, 0.05),
    (1_000_000.0, 0.20),
    (f64::INFINITY, 0.30),
];

const NEW_REGIME_REBATE_LIMIT: f64 = 700_000.0;
const OLD_REGIME_REBATE_LIMIT: f64 = 500_000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaxRegime {
    New,
    Old,
}

impl TaxRegime {
    fn slabs(self) -> &'static [(f64, f64)] {
        match self {
            TaxRegime::New => NEW_REGIME_SLABS,
            TaxRegime::Old => OLD_REGIME_SLABS,
        }
    }

    /// Section 87A: full rebate at or below this income.
    fn rebate_limit(self) -> f64 {
        match self {
            TaxRegime::New => NEW_REGIME_REBATE_LIMIT,
            TaxRegime::Old => OLD_REGIME_REBATE_LIMIT,
        }
    }
}

impl fmt::Display for TaxRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaxRegime::New => "New",
            TaxRegime::Old => "Old",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakdownEntry {
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxCalculationResult {
    pub total_tax: f64,
    pub taxable_income: f64,
    /// Insertion-ordered: Gross Income, Standard Deduction, Tax Before Cess, Cess.
    pub tax_breakdown: Vec<BreakdownEntry>,
}

impl TaxCalculationResult {
    pub fn breakdown_amount(&self, label: &str) -> Option<f64> {
        self.tax_breakdown
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.amount)
    }
}

/// Both regimes side by side for the same income.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxComparison {
    pub new: TaxCalculationResult,
    pub old: TaxCalculationResult,
}

impl TaxComparison {
    pub fn cheaper_regime(&self) -> TaxRegime {
        if self.old.total_tax < self.new.total_tax {
            TaxRegime::Old
        } else {
            TaxRegime::New
        }
    }

    pub fn savings(&self) -> f64 {
        (self.new.total_tax - self.old.total_tax).abs()
    }
}

/// Compute income tax for one regime.
///
/// `fiscal_year` is informational: a single slab table per regime is
/// implemented.
pub fn calculate_tax(income: f64, fiscal_year: &str, regime: TaxRegime) -> TaxCalculationResult {
    let taxable_income = (income - STANDARD_DEDUCTION).max(0.0);

    let mut slab_tax = 0.0;
    let mut lower = 0.0;
    for &(upper, rate) in regime.slabs() {
        if taxable_income <= lower {
            break;
        }
        let in_band = taxable_income.min(upper) - lower;
        slab_tax += in_band * rate;
        lower = upper;
    }

    // Rebate boundary is checked on the income as entered: 7,00,000 owes
    // nothing, 7,00,001 owes slab tax.
    let tax_before_cess = if income <= regime.rebate_limit() {
        0.0
    } else {
        slab_tax
    };
    let cess = tax_before_cess * CESS_RATE;

    tracing::debug!(
        income,
        fiscal_year,
        regime = %regime,
        taxable_income,
        tax_before_cess,
        "Tax computed"
    );

    TaxCalculationResult {
        total_tax: (tax_before_cess + cess).round(),
        taxable_income,
        tax_breakdown: vec![
            BreakdownEntry {
                label: "Gross Income".to_string(),
                amount: income,
            },
            BreakdownEntry {
                label: "Standard Deduction".to_string(),
                amount: -STANDARD_DEDUCTION,
            },
            BreakdownEntry {
                label: "Tax Before Cess".to_string(),
                amount: tax_before_cess,
            },
            BreakdownEntry {
                label: "Cess".to_string(),
                amount: cess,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const FY: &str = "2024-25";

    #[test]
    fn test_rebate_boundary() {
        assert_eq!(calculate_tax(700_000.0, FY, TaxRegime::New).total_tax, 0.0);

        let just_over = calculate_tax(700_001.0, FY, TaxRegime::New);
        assert_eq!(just_over.taxable_income, 650_001.0);
        // 15,000 + 50,001 at 10%, plus cess
        assert_eq!(just_over.total_tax, 20_800.0);
    }

    #[test]
    fn test_fifteen_lakh_breakdown() {
        let result = calculate_tax(1_500_000.0, FY, TaxRegime::New);
        assert_eq!(result.taxable_income, 1_450_000.0);

        // 15,000 + 30,000 + 45,000 + 50,000 (2.5L at 20%)
        let expected_slab = 15_000.0 + 30_000.0 + 45_000.0 + 50_000.0;
        assert_eq!(result.breakdown_amount("Tax Before Cess"), Some(expected_slab));
        assert_eq!(result.breakdown_amount("Cess"), Some(expected_slab * 0.04));
        assert_eq!(result.total_tax, (expected_slab * 1.04_f64).round());
        assert_eq!(result.total_tax, 145_600.0);

        let labels: Vec<&str> = result
            .tax_breakdown
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["Gross Income", "Standard Deduction", "Tax Before Cess", "Cess"]
        );
        assert_eq!(result.breakdown_amount("Gross Income"), Some(1_500_000.0));
        assert_eq!(result.breakdown_amount("Standard Deduction"), Some(-50_000.0));
    }

    #[test]
    fn test_top_band() {
        let result = calculate_tax(2_050_000.0, FY, TaxRegime::New);
        // taxable 20L: 15k + 30k + 45k + 60k + 150k
        assert_eq!(result.breakdown_amount("Tax Before Cess"), Some(300_000.0));
        assert_eq!(result.total_tax, 312_000.0);
    }

    #[test]
    fn test_negative_income_clamps() {
        let result = calculate_tax(-10_000.0, FY, TaxRegime::New);
        assert_eq!(result.taxable_income, 0.0);
        assert_eq!(result.total_tax, 0.0);
    }

    #[test]
    fn test_old_regime_uses_own_slabs() {
        let old = calculate_tax(1_500_000.0, FY, TaxRegime::Old);
        // taxable 14.5L: 12,500 + 1,00,000 + 1,35,000
        assert_eq!(old.breakdown_amount("Tax Before Cess"), Some(247_500.0));
        assert_eq!(old.total_tax, 257_400.0);

        let new = calculate_tax(1_500_000.0, FY, TaxRegime::New);
        assert_ne!(old.total_tax, new.total_tax);

        let comparison = TaxComparison { new, old };
        assert_eq!(comparison.cheaper_regime(), TaxRegime::New);
        assert_eq!(comparison.savings(), 111_800.0);
    }

    #[test]
    fn test_old_regime_rebate() {
        assert_eq!(calculate_tax(500_000.0, FY, TaxRegime::Old).total_tax, 0.0);
        assert!(calculate_tax(500_001.0, FY, TaxRegime::Old).total_tax > 0.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_tax_non_negative_and_monotonic(a in 0u32..10_000_000, b in 0u32..10_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let low = calculate_tax(lo as f64, FY, TaxRegime::New).total_tax;
            let high = calculate_tax(hi as f64, FY, TaxRegime::New).total_tax;
            prop_assert!(low >= 0.0);
            prop_assert!(high >= low);
        }
    }
}
