//! Tax explanation and regime comparison
//!
//! Turns computed tax results into user-facing text with citations. The
//! Gemini implementation writes prose around the numbers; the template
//! implementation is deterministic and needs no network.

use crate::calculators::{TaxCalculationResult, TaxComparison};
use crate::error::OrchestrationError;
use crate::gemini::LanguageModel;
use crate::models::{Source, TaxContext};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

const TAX_SOURCES: &[(&str, &str, &str)] = &[
    (
        "Income Tax Department - Tax Slabs",
        "https://www.incometax.gov.in/iec/foportal/help/individual-business-profession",
        "2024-07-23",
    ),
    (
        "Union Budget 2024-25 - Finance Act",
        "https://www.indiabudget.gov.in",
        "2024-07-23",
    ),
];

const EXPLAINER_INSTRUCTION: &str = r#"You are a friendly Indian personal-finance assistant.
Explain income tax calculations in plain language using markdown.
Use the exact figures provided; never recompute or change them.
Mention the standard deduction, the slab tax, the 4% health and education cess and, if tax is nil, the section 87A rebate.
Keep it under 200 words and end with a one-line disclaimer that this is an estimate."#;

#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub text: String,
    pub sources: Vec<Source>,
}

pub fn tax_sources() -> Vec<Source> {
    TAX_SOURCES
        .iter()
        .map(|(name, url, last_updated)| Source {
            name: name.to_string(),
            url: url.to_string(),
            last_updated: last_updated.to_string(),
        })
        .collect()
}

/// Explanation/comparison step for tax results
#[async_trait]
pub trait TaxExplainer: Send + Sync {
    async fn explain(&self, result: &TaxCalculationResult, context: &TaxContext) -> Result<Explanation>;

    async fn compare(&self, comparison: &TaxComparison, context: &TaxContext) -> Result<Explanation>;
}

/// Format a rupee amount with Indian digit grouping, e.g. `₹14,50,000`.
pub fn format_inr(amount: f64) -> String {
    let negative = amount < 0.0;
    let rounded = (amount.abs() * 100.0).round() / 100.0;
    let whole = rounded.trunc() as u64;
    let paise = ((rounded - whole as f64) * 100.0).round() as u64;

    let digits = whole.to_string();
    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 2 {
            groups.push(&head[end - 2..end]);
            end -= 2;
        }
        groups.push(&head[..end]);
        groups.reverse();
        format!("{},{}", groups.join(","), tail)
    };

    let sign = if negative { "-" } else { "" };
    if paise > 0 {
        format!("{}₹{}.{:02}", sign, grouped, paise)
    } else {
        format!("{}₹{}", sign, grouped)
    }
}

fn breakdown_lines(result: &TaxCalculationResult) -> String {
    let mut lines = String::new();
    for entry in &result.tax_breakdown {
        lines.push_str(&format!("- {}: {}\n", entry.label, format_inr(entry.amount)));
    }
    lines.push_str(&format!("- Taxable Income: {}\n", format_inr(result.taxable_income)));
    lines.push_str(&format!("- Total Tax: {}\n", format_inr(result.total_tax)));
    lines
}

/// Deterministic explanations built from the figures alone
pub struct TemplateTaxExplainer;

#[async_trait]
impl TaxExplainer for TemplateTaxExplainer {
    async fn explain(&self, result: &TaxCalculationResult, context: &TaxContext) -> Result<Explanation> {
        let regime = context
            .regime
            .map(|r| r.to_string())
            .unwrap_or_else(|| "New".to_string());

        let mut text = format!(
            "### Income tax for FY {} ({} regime)\n\n",
            context.fiscal_year, regime
        );
        text.push_str(&breakdown_lines(result));
        text.push('\n');

        if result.total_tax == 0.0 {
            text.push_str(
                "Your income falls within the section 87A rebate limit, so no tax is payable.\n",
            );
        } else {
            text.push_str(&format!(
                "On an income of {} you pay about {} in tax, an effective rate of {:.2}%.\n",
                format_inr(context.income),
                format_inr(result.total_tax),
                effective_rate(result.total_tax, context.income)
            ));
        }
        text.push_str("\n_This is an estimate; confirm with a tax professional before filing._");

        Ok(Explanation {
            text,
            sources: tax_sources(),
        })
    }

    async fn compare(&self, comparison: &TaxComparison, context: &TaxContext) -> Result<Explanation> {
        let mut text = format!(
            "### New vs old regime for FY {}\n\n| | New regime | Old regime |\n|---|---|---|\n",
            context.fiscal_year
        );
        text.push_str(&format!(
            "| Taxable income | {} | {} |\n",
            format_inr(comparison.new.taxable_income),
            format_inr(comparison.old.taxable_income)
        ));
        text.push_str(&format!(
            "| Total tax | {} | {} |\n\n",
            format_inr(comparison.new.total_tax),
            format_inr(comparison.old.total_tax)
        ));

        if comparison.savings() == 0.0 {
            text.push_str("Both regimes cost the same at this income.\n");
        } else {
            text.push_str(&format!(
                "The **{} regime** saves you {}. The old regime only wins if your deductions (80C, 80D, HRA, home loan) are large enough.\n",
                comparison.cheaper_regime(),
                format_inr(comparison.savings())
            ));
        }
        text.push_str("\n_This is an estimate; confirm with a tax professional before filing._");

        Ok(Explanation {
            text,
            sources: tax_sources(),
        })
    }
}

fn effective_rate(tax: f64, income: f64) -> f64 {
    if income <= 0.0 {
        0.0
    } else {
        tax / income * 100.0
    }
}

/// Model-written explanations around fixed figures
pub struct GeminiTaxExplainer {
    model: Arc<dyn LanguageModel>,
}

impl GeminiTaxExplainer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let text = self.model.generate(prompt, Some(EXPLAINER_INSTRUCTION)).await?;
        if text.trim().is_empty() {
            return Err(OrchestrationError::ExplanationError(
                "model returned an empty explanation".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl TaxExplainer for GeminiTaxExplainer {
    async fn explain(&self, result: &TaxCalculationResult, context: &TaxContext) -> Result<Explanation> {
        let prompt = format!(
            "Explain this income tax calculation for FY {} under the {} regime.\n\nGross income: {}\n{}",
            context.fiscal_year,
            context.regime.map(|r| r.to_string()).unwrap_or_else(|| "New".to_string()),
            format_inr(context.income),
            breakdown_lines(result)
        );

        let text = self.generate(&prompt).await?;
        info!(total_tax = result.total_tax, "Tax explanation generated");

        Ok(Explanation {
            text,
            sources: tax_sources(),
        })
    }

    async fn compare(&self, comparison: &TaxComparison, context: &TaxContext) -> Result<Explanation> {
        let prompt = format!(
            "Compare the new and old tax regimes for FY {} at a gross income of {}.\n\nNew regime:\n{}\nOld regime:\n{}\nSay which regime is cheaper and by how much ({}), and what deductions would change the answer.",
            context.fiscal_year,
            format_inr(context.income),
            breakdown_lines(&comparison.new),
            breakdown_lines(&comparison.old),
            format_inr(comparison.savings())
        );

        let text = self.generate(&prompt).await?;
        info!(
            cheaper = %comparison.cheaper_regime(),
            savings = comparison.savings(),
            "Regime comparison generated"
        );

        Ok(Explanation {
            text,
            sources: tax_sources(),
        })
    }
}
