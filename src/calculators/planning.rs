//! Planning calculators: retirement corpus, FIRE, budget split, ratios,
//! portfolio allocation, term cover and HRA exemption.

use super::investment::calculate_reverse_sip;
use super::round2;
use crate::error::CalculationError;
use crate::models::RiskTolerance;
use serde::{Deserialize, Serialize};
use std::fmt;

const SAFE_WITHDRAWAL_RATE: f64 = 4.0;
const MAX_FIRE_YEARS: u32 = 60;
const TERM_COVER_MULTIPLIER: f64 = 15.0;
const GOLD_ALLOCATION: f64 = 10.0;

//
// ================= Retirement =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetirementAssumptions {
    pub inflation_rate: f64,
    pub life_expectancy: u32,
    pub pre_retirement_return: f64,
    pub post_retirement_return: f64,
}

impl Default for RetirementAssumptions {
    fn default() -> Self {
        Self {
            inflation_rate: 6.0,
            life_expectancy: 85,
            pre_retirement_return: 12.0,
            post_retirement_return: 7.0,
        }
    }
}

/// The corpus together with every assumption used to derive it, so an
/// explanation can reproduce the arithmetic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetirementCorpusResult {
    pub required_corpus: f64,
    pub current_age: u32,
    pub retirement_age: u32,
    pub years_to_retirement: u32,
    pub monthly_expenses: f64,
    pub future_annual_expenses: f64,
    pub monthly_sip_required: f64,
    pub assumptions: RetirementAssumptions,
}

/// Growing-perpetuity corpus needed to fund today's expenses from retirement.
///
/// Fails when the post-retirement return does not exceed inflation: the
/// perpetuity has no finite value there.
pub fn calculate_retirement_corpus(
    current_age: u32,
    retirement_age: u32,
    monthly_expenses: f64,
    assumptions: RetirementAssumptions,
) -> Result<RetirementCorpusResult, CalculationError> {
    if assumptions.post_retirement_return <= assumptions.inflation_rate {
        return Err(CalculationError::InvalidAssumption(format!(
            "post-retirement return ({}%) must exceed inflation ({}%)",
            assumptions.post_retirement_return, assumptions.inflation_rate
        )));
    }

    let years_to_retirement = retirement_age.saturating_sub(current_age);

    if monthly_expenses <= 0.0 {
        return Ok(RetirementCorpusResult {
            required_corpus: 0.0,
            current_age,
            retirement_age,
            years_to_retirement,
            monthly_expenses: 0.0,
            future_annual_expenses: 0.0,
            monthly_sip_required: 0.0,
            assumptions,
        });
    }

    let inflation = assumptions.inflation_rate / 100.0;
    let post_return = assumptions.post_retirement_return / 100.0;

    let future_annual = monthly_expenses * 12.0 * (1.0 + inflation).powi(years_to_retirement as i32);
    let required_corpus = round2(future_annual * (1.0 + inflation) / (post_return - inflation));

    let monthly_sip_required = calculate_reverse_sip(
        required_corpus,
        years_to_retirement as f64,
        assumptions.pre_retirement_return,
    )
    .monthly_investment;

    Ok(RetirementCorpusResult {
        required_corpus,
        current_age,
        retirement_age,
        years_to_retirement,
        monthly_expenses,
        future_annual_expenses: round2(future_annual),
        monthly_sip_required,
        assumptions,
    })
}

//
// ================= FIRE =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FireCalculationResult {
    pub current_age: u32,
    pub annual_expenses: f64,
    pub fire_number: f64,
    pub safe_withdrawal_rate: f64,
    pub current_corpus: f64,
    pub monthly_investment: f64,
    pub expected_return: f64,
    pub inflation_rate: f64,
    /// `None` when the target is not reached within 60 years.
    pub years_to_fire: Option<u32>,
    /// `None` when the target is never reached or the age would overflow.
    pub fire_age: Option<u32>,
    pub projected_corpus: f64,
}

pub fn calculate_fire(
    current_age: u32,
    monthly_expenses: f64,
    current_corpus: f64,
    monthly_investment: f64,
    expected_return: f64,
    inflation_rate: f64,
) -> FireCalculationResult {
    if monthly_expenses <= 0.0 {
        return FireCalculationResult {
            current_age,
            safe_withdrawal_rate: SAFE_WITHDRAWAL_RATE,
            ..Default::default()
        };
    }

    let annual_expenses = round2(monthly_expenses * 12.0);
    let fire_number = round2(annual_expenses * 100.0 / SAFE_WITHDRAWAL_RATE);

    let i = expected_return / 12.0 / 100.0;
    let contribution = monthly_investment.max(0.0);
    let mut corpus = current_corpus.max(0.0);
    let mut target = fire_number;
    let mut years_to_fire = None;

    for year in 0..=MAX_FIRE_YEARS {
        if corpus >= target {
            years_to_fire = Some(year);
            break;
        }
        if year == MAX_FIRE_YEARS {
            break;
        }
        for _ in 0..12 {
            corpus = (corpus + contribution) * (1.0 + i);
        }
        target *= 1.0 + inflation_rate / 100.0;
    }

    FireCalculationResult {
        current_age,
        annual_expenses,
        fire_number,
        safe_withdrawal_rate: SAFE_WITHDRAWAL_RATE,
        current_corpus,
        monthly_investment,
        expected_return,
        inflation_rate,
        years_to_fire,
        fire_age: years_to_fire.and_then(|years| current_age.checked_add(years)),
        projected_corpus: round2(corpus),
    }
}

//
// ================= Budget & Ratios =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BudgetAllocationResult {
    pub monthly_income: f64,
    pub needs: f64,
    pub wants: f64,
    pub savings: f64,
}

/// 50/30/20 rule.
pub fn calculate_budget_allocation(monthly_income: f64) -> BudgetAllocationResult {
    if monthly_income <= 0.0 {
        return BudgetAllocationResult::default();
    }

    BudgetAllocationResult {
        monthly_income,
        needs: round2(monthly_income * 0.50),
        wants: round2(monthly_income * 0.30),
        savings: round2(monthly_income * 0.20),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DtiBand {
    Safe,
    Moderate,
    #[serde(rename = "High Risk")]
    HighRisk,
}

impl DtiBand {
    /// Safe below 30%, Moderate from 30% to 40% inclusive, High Risk above.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 30.0 {
            DtiBand::Safe
        } else if ratio <= 40.0 {
            DtiBand::Moderate
        } else {
            DtiBand::HighRisk
        }
    }
}

impl fmt::Display for DtiBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DtiBand::Safe => "Safe",
            DtiBand::Moderate => "Moderate",
            DtiBand::HighRisk => "High Risk",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DtiResult {
    pub monthly_emi: f64,
    pub monthly_income: f64,
    pub ratio: f64,
    pub band: DtiBand,
}

pub fn calculate_dti(monthly_emi: f64, monthly_income: f64) -> DtiResult {
    let ratio = if monthly_income <= 0.0 || monthly_emi <= 0.0 {
        0.0
    } else {
        round2(monthly_emi / monthly_income * 100.0)
    };

    DtiResult {
        monthly_emi: monthly_emi.max(0.0),
        monthly_income: monthly_income.max(0.0),
        ratio,
        band: DtiBand::from_ratio(ratio),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SavingsBand {
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    #[serde(rename = "Good Start")]
    GoodStart,
    Healthy,
}

impl SavingsBand {
    /// Needs Improvement below 10%, Good Start below 20%, Healthy from 20%.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 10.0 {
            SavingsBand::NeedsImprovement
        } else if ratio < 20.0 {
            SavingsBand::GoodStart
        } else {
            SavingsBand::Healthy
        }
    }
}

impl fmt::Display for SavingsBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SavingsBand::NeedsImprovement => "Needs Improvement",
            SavingsBand::GoodStart => "Good Start",
            SavingsBand::Healthy => "Healthy",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavingsRatioResult {
    pub monthly_savings: f64,
    pub monthly_income: f64,
    pub ratio: f64,
    pub band: SavingsBand,
}

pub fn calculate_savings_ratio(monthly_savings: f64, monthly_income: f64) -> SavingsRatioResult {
    let ratio = if monthly_income <= 0.0 || monthly_savings <= 0.0 {
        0.0
    } else {
        round2(monthly_savings / monthly_income * 100.0)
    };

    SavingsRatioResult {
        monthly_savings: monthly_savings.max(0.0),
        monthly_income: monthly_income.max(0.0),
        ratio,
        band: SavingsBand::from_ratio(ratio),
    }
}

//
// ================= Portfolio / Insurance / HRA =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioAllocationResult {
    pub age: u32,
    pub risk_tolerance: RiskTolerance,
    pub equity_percent: f64,
    pub debt_percent: f64,
    pub gold_percent: f64,
}

/// "100 minus age" in equity, nudged by risk tolerance, with a fixed gold
/// sleeve and the rest in debt.
pub fn calculate_portfolio_allocation(age: u32, risk_tolerance: RiskTolerance) -> PortfolioAllocationResult {
    let adjustment = match risk_tolerance {
        RiskTolerance::Low => -10.0,
        RiskTolerance::Medium => 0.0,
        RiskTolerance::High => 10.0,
    };

    let equity_percent = (100.0 - age as f64 + adjustment).clamp(15.0, 85.0);
    let debt_percent = 100.0 - equity_percent - GOLD_ALLOCATION;

    PortfolioAllocationResult {
        age,
        risk_tolerance,
        equity_percent,
        debt_percent,
        gold_percent: GOLD_ALLOCATION,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TermInsuranceResult {
    pub annual_income: f64,
    pub multiplier: f64,
    pub recommended_cover: f64,
}

pub fn calculate_term_insurance(annual_income: f64) -> TermInsuranceResult {
    if annual_income <= 0.0 {
        return TermInsuranceResult {
            multiplier: TERM_COVER_MULTIPLIER,
            ..Default::default()
        };
    }

    TermInsuranceResult {
        annual_income,
        multiplier: TERM_COVER_MULTIPLIER,
        recommended_cover: round2(annual_income * TERM_COVER_MULTIPLIER),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HraResult {
    pub basic_salary: f64,
    pub hra_received: f64,
    pub rent_paid: f64,
    pub metro: bool,
    /// 50% (metro) or 40% (non-metro) of basic.
    pub salary_limit: f64,
    /// Rent paid in excess of 10% of basic.
    pub rent_excess: f64,
    pub exemption: f64,
    pub taxable_hra: f64,
}

/// Exempt HRA is the least of the three statutory limits, never negative.
pub fn calculate_hra(basic_salary: f64, hra_received: f64, rent_paid: f64, metro: bool) -> HraResult {
    let basic = basic_salary.max(0.0);
    let hra = hra_received.max(0.0);
    let rent = rent_paid.max(0.0);

    let salary_limit = round2(basic * if metro { 0.50 } else { 0.40 });
    let rent_excess = round2(rent - basic * 0.10);
    let exemption = hra.min(salary_limit).min(rent_excess).max(0.0);

    HraResult {
        basic_salary: basic,
        hra_received: hra,
        rent_paid: rent,
        metro,
        salary_limit,
        rent_excess,
        exemption,
        taxable_hra: round2(hra - exemption),
    }
}
