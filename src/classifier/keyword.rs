//! Keyword classifier
//!
//! Offline fallback used when no model is configured. Picks the intent from
//! static keyword lists and pulls amounts, rates, tenures and ages out of the
//! text with a single numeric scan.

use super::IntentClassifier;
use crate::models::{IntentExtraction, IntentTag};
use crate::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

lazy_static! {
    /// A number with an optional unit. Alternation order matters: "years old"
    /// must win over "years".
    static ref NUMBER_RE: Regex = Regex::new(
        r"(?i)(\d+(?:,\d+)*(?:\.\d+)?)\s*(%|percent\b|years?\s+old\b|yrs?\s+old\b|years?\b|yrs?\b|months?\b|crores?\b|cr\b|lakhs?\b|lacs?\b|lac\b|l\b|k\b|thousand\b)?"
    )
    .expect("valid number regex");

    static ref WORD_RE: Regex = Regex::new(r"[a-z0-9/]+").expect("valid word regex");

    /// "FY 2024-25", "2023/24": never an amount.
    static ref FISCAL_YEAR_RE: Regex = Regex::new(
        r"(?i)\bfy\s*(?:19|20)\d{2}(?:\s*[-/]\s*\d{2,4})?\b|\b(?:19|20)\d{2}\s*[-/]\s*\d{2,4}\b"
    )
    .expect("valid fiscal year regex");

    /// "need 1 crore", "need to build 50 lakh": the amount is a goal, not a contribution.
    static ref NEED_TARGET_RE: Regex = Regex::new(
        r"\bneed\s+(?:rs\.?\s*|₹\s*)?\d|\bneed\b[^.?!]*\bto\s+(?:get|have|build|make|save|collect)\b"
    )
    .expect("valid target regex");
}

const REVERSE_SIP_CUES: &[&str] = &["reverse", "target", "goal", "reach", "accumulate", "corpus of"];

const COMPARE_CUES: &[&str] = &["vs", "versus", "compare", "comparison", "both", "better"];

/// Numeric mention found in the query.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mention {
    Amount { value: f64, with_unit: bool },
    Rate(f64),
    Years(f64),
    Months(f64),
    Age(f64),
    RetireAge(f64),
}

#[derive(Debug, Default)]
struct Mentions {
    items: Vec<Mention>,
}

impl Mentions {
    /// Amounts written with a unit ("15L", "10k") win over bare numbers.
    fn amount(&self) -> Option<f64> {
        let amounts = || {
            self.items.iter().filter_map(|m| match m {
                Mention::Amount { value, with_unit } => Some((*value, *with_unit)),
                _ => None,
            })
        };
        amounts()
            .find(|(_, with_unit)| *with_unit)
            .or_else(|| amounts().next())
            .map(|(value, _)| value)
    }

    fn rate(&self) -> Option<f64> {
        self.items.iter().find_map(|m| match m {
            Mention::Rate(v) => Some(*v),
            _ => None,
        })
    }

    fn years(&self) -> Option<f64> {
        self.items.iter().find_map(|m| match m {
            Mention::Years(v) => Some(*v),
            _ => None,
        })
    }

    fn months(&self) -> Option<f64> {
        self.items.iter().find_map(|m| match m {
            Mention::Months(v) => Some(*v),
            _ => None,
        })
    }

    fn age(&self) -> Option<f64> {
        self.items.iter().find_map(|m| match m {
            Mention::Age(v) => Some(*v),
            _ => None,
        })
    }

    fn retire_age(&self) -> Option<f64> {
        self.items.iter().find_map(|m| match m {
            Mention::RetireAge(v) => Some(*v),
            _ => None,
        })
    }

    /// Tenure in years, accepting "18 months" as 1.5 years.
    fn tenure_years(&self) -> Option<f64> {
        self.years().or_else(|| self.months().map(|m| m / 12.0))
    }

    /// Tenure in months, accepting "2 years" as 24 months.
    fn tenure_months(&self) -> Option<f64> {
        self.months().or_else(|| self.years().map(|y| y * 12.0))
    }
}

fn scaled(value: f64, multiplier: f64) -> Mention {
    Mention::Amount {
        value: value * multiplier,
        with_unit: true,
    }
}

fn scan_numbers(text: &str) -> Mentions {
    let mut mentions = Mentions::default();
    let text = FISCAL_YEAR_RE.replace_all(text, " ");
    let text = text.as_ref();

    for caps in NUMBER_RE.captures_iter(text) {
        let Some(number) = caps.get(1) else { continue };
        let Ok(value) = number.as_str().replace(',', "").parse::<f64>() else {
            continue;
        };

        let prefix = text[..number.start()].trim_end();
        let unit = caps
            .get(2)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();

        let mention = if prefix.ends_with("retire at")
            || prefix.ends_with("retire by")
            || prefix.ends_with("retirement at")
            || prefix.ends_with("retiring at")
        {
            Mention::RetireAge(value)
        } else if prefix.ends_with("age")
            || prefix.ends_with("aged")
            || prefix.ends_with("i am")
            || prefix.ends_with("i'm")
            || unit.ends_with("old")
        {
            Mention::Age(value)
        } else {
            match unit.as_str() {
                "%" | "percent" => Mention::Rate(value),
                "year" | "years" | "yr" | "yrs" => Mention::Years(value),
                "month" | "months" => Mention::Months(value),
                "crore" | "crores" | "cr" => scaled(value, 10_000_000.0),
                "lakh" | "lakhs" | "lac" | "lacs" | "l" => scaled(value, 100_000.0),
                "k" | "thousand" => scaled(value, 1_000.0),
                _ => Mention::Amount {
                    value,
                    with_unit: false,
                },
            }
        };

        mentions.items.push(mention);
    }

    mentions
}

fn compounding_frequency(text: &str) -> Option<f64> {
    if text.contains("monthly") {
        Some(12.0)
    } else if text.contains("quarterly") {
        Some(4.0)
    } else if text.contains("half-yearly") || text.contains("half yearly") || text.contains("semi") {
        Some(2.0)
    } else if text.contains("daily") {
        Some(365.0)
    } else if text.contains("annually") || text.contains("yearly") {
        Some(1.0)
    } else {
        None
    }
}

/// Keyword/regex intent classifier
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    /// Synchronous core, usable without a runtime.
    pub fn extract(query: &str) -> IntentExtraction {
        let text = query.to_lowercase();
        let words: HashSet<&str> = WORD_RE.find_iter(&text).map(|m| m.as_str()).collect();
        let has_word = |w: &str| words.contains(w);
        let has_any = |cues: &[&str]| cues.iter().any(|c| text.contains(c));
        let mentions = scan_numbers(&text);

        let mut extraction = IntentExtraction::general();

        if has_word("sip") || text.contains("systematic investment") {
            if has_any(REVERSE_SIP_CUES) || NEED_TARGET_RE.is_match(&text) {
                extraction.intent = IntentTag::ReverseSip;
                extraction.sip_target = mentions.amount();
            } else {
                extraction.intent = IntentTag::Sip;
                extraction.sip_monthly = mentions.amount();
            }
            extraction.sip_years = mentions.tenure_years();
            extraction.sip_rate = mentions.rate();
        } else if has_word("emi") || has_word("loan") {
            extraction.intent = IntentTag::Emi;
            extraction.emi_principal = mentions.amount();
            extraction.emi_years = mentions.tenure_years();
            extraction.emi_rate = mentions.rate();
        } else if has_word("fd") || text.contains("fixed deposit") {
            extraction.intent = IntentTag::Fd;
            extraction.fd_principal = mentions.amount();
            extraction.fd_years = mentions.tenure_years();
            extraction.fd_rate = mentions.rate();
        } else if has_word("rd") || text.contains("recurring deposit") {
            extraction.intent = IntentTag::Rd;
            extraction.rd_monthly = mentions.amount();
            extraction.rd_months = mentions.tenure_months();
            extraction.rd_rate = mentions.rate();
        } else if text.contains("compound interest") || text.contains("compounded") {
            extraction.intent = IntentTag::CompoundInterest;
            extraction.ci_principal = mentions.amount();
            extraction.ci_years = mentions.tenure_years();
            extraction.ci_rate = mentions.rate();
            extraction.ci_frequency = compounding_frequency(&text);
        } else if text.contains("retire") {
            extraction.intent = IntentTag::RetirementCorpus;
            extraction.ret_current_age = mentions.age();
            extraction.ret_retire_age = mentions.retire_age();
            extraction.ret_monthly_exp = mentions.amount();
        } else if has_word("budget") || text.contains("50/30/20") {
            extraction.intent = IntentTag::Budget;
            extraction.income = mentions.amount();
        } else if has_word("tax") || has_word("regime") || (has_word("old") && has_word("new")) {
            extraction.intent = IntentTag::Tax;
            extraction.income = mentions.amount();

            let compare = (has_word("old") && has_word("new"))
                || COMPARE_CUES.iter().any(|c| has_word(c));
            extraction.regime = if compare {
                Some("both".to_string())
            } else if has_word("old") {
                Some("old".to_string())
            } else if has_word("new") {
                Some("new".to_string())
            } else {
                None
            };
        }

        debug!(intent = ?extraction.intent, "Keyword classification");
        extraction
    }
}

#[async_trait]
impl IntentClassifier for KeywordIntentClassifier {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn classify(&self, query: &str) -> Result<IntentExtraction> {
        Ok(Self::extract(query))
    }
}
