//! Knowledge lookup
//!
//! A small fixed corpus of personal-finance notes searched by keyword
//! overlap, plus a fixed table of "dynamic" rates used as defaults when a
//! user leaves a deposit rate out.

use crate::models::Source;
use serde::Serialize;
use std::collections::HashSet;

const MAX_RESULTS: usize = 3;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "what", "how", "is", "are", "a", "an", "of", "to", "in", "on", "my",
    "me", "i", "do", "does", "can", "should", "with", "about", "tell", "explain", "which", "it",
    "this", "that", "be", "or", "vs",
];

#[derive(Debug, Clone, Copy)]
pub struct KnowledgeDocument {
    pub source_name: &'static str,
    pub url: &'static str,
    pub last_updated: &'static str,
    pub keywords: &'static [&'static str],
    pub content: &'static str,
}

/// A ranked search hit.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KnowledgeSnippet {
    pub source_name: String,
    pub url: String,
    pub content: String,
    pub last_updated: String,
}

impl KnowledgeSnippet {
    pub fn to_source(&self) -> Source {
        Source {
            name: self.source_name.clone(),
            url: self.url.clone(),
            last_updated: self.last_updated.clone(),
        }
    }
}

impl From<&KnowledgeDocument> for KnowledgeSnippet {
    fn from(doc: &KnowledgeDocument) -> Self {
        Self {
            source_name: doc.source_name.to_string(),
            url: doc.url.to_string(),
            content: doc.content.to_string(),
            last_updated: doc.last_updated.to_string(),
        }
    }
}

const DEFAULT_CORPUS: &[KnowledgeDocument] = &[
    KnowledgeDocument {
        source_name: "Income Tax Department - New Tax Regime",
        url: "https://www.incometax.gov.in/iec/foportal/help/individual/return-applicable-1",
        last_updated: "2024-07-23",
        keywords: &["new regime", "115bac", "slab", "slabs", "income tax", "rebate", "87a"],
        content: "Under the new tax regime (section 115BAC) income up to 3 lakh is nil, 3-6 lakh is taxed at 5%, 6-9 lakh at 10%, 9-12 lakh at 15%, 12-15 lakh at 20% and above 15 lakh at 30%. A standard deduction applies to salaried taxpayers and a section 87A rebate makes tax nil up to 7 lakh. Most deductions such as 80C are not available.",
    },
    KnowledgeDocument {
        source_name: "Income Tax Department - Old Tax Regime",
        url: "https://www.incometax.gov.in/iec/foportal/help/individual/return-applicable-1",
        last_updated: "2024-07-23",
        keywords: &["old regime", "80c", "80d", "deduction", "deductions", "exemption"],
        content: "The old tax regime taxes income up to 2.5 lakh at nil, 2.5-5 lakh at 5%, 5-10 lakh at 20% and above 10 lakh at 30%. It allows deductions such as 80C (up to 1.5 lakh for PPF, ELSS, EPF, life insurance), 80D for health insurance, HRA and home-loan interest.",
    },
    KnowledgeDocument {
        source_name: "SEBI Investor Education - Mutual Funds",
        url: "https://investor.sebi.gov.in/mutual_fund.html",
        last_updated: "2024-04-01",
        keywords: &["sip", "mutual fund", "mutual funds", "elss", "nav", "index fund"],
        content: "A Systematic Investment Plan (SIP) invests a fixed amount in a mutual fund every month, buying more units when prices are low (rupee cost averaging). Equity mutual funds carry market risk; returns are not guaranteed. ELSS funds qualify for 80C with a 3-year lock-in.",
    },
    KnowledgeDocument {
        source_name: "RBI - Fixed and Recurring Deposits",
        url: "https://www.rbi.org.in/commonperson/English/Scripts/FAQs.aspx?Id=2808",
        last_updated: "2024-06-07",
        keywords: &["fd", "fixed deposit", "rd", "recurring deposit", "dicgc", "deposit insurance"],
        content: "Bank fixed deposits pay a fixed rate for a chosen tenure, usually compounded quarterly. Recurring deposits accept a fixed monthly instalment. Deposits are insured by DICGC up to 5 lakh per depositor per bank. Interest is taxable at your slab rate.",
    },
    KnowledgeDocument {
        source_name: "RBI - Loans and EMIs",
        url: "https://www.rbi.org.in/commonperson/English/Scripts/FAQs.aspx?Id=3181",
        last_updated: "2024-02-08",
        keywords: &["emi", "loan", "home loan", "prepayment", "floating rate", "repo"],
        content: "An EMI is a fixed monthly payment that covers interest and principal. Floating-rate loans are linked to an external benchmark such as the RBI repo rate, so EMIs or tenure change when the repo rate moves. Prepayment of floating-rate home loans carries no penalty for individuals.",
    },
    KnowledgeDocument {
        source_name: "PFRDA - National Pension System",
        url: "https://www.pfrda.org.in/index1.cshtml?lsid=1170",
        last_updated: "2024-03-31",
        keywords: &["nps", "pension", "retirement", "annuity", "80ccd"],
        content: "The National Pension System is a market-linked retirement scheme. At 60, up to 60% of the corpus can be withdrawn tax-free and at least 40% must buy an annuity. Contributions get an extra deduction of 50,000 under 80CCD(1B) in the old regime.",
    },
    KnowledgeDocument {
        source_name: "National Savings Institute - PPF",
        url: "https://www.nsiindia.gov.in/InternalPage.aspx?Id_Pk=55",
        last_updated: "2024-07-01",
        keywords: &["ppf", "public provident fund", "small savings", "sukanya"],
        content: "The Public Provident Fund has a 15-year lock-in, accepts 500 to 1.5 lakh a year and pays a government-notified rate reset every quarter. Contributions, interest and maturity are all tax-free (EEE).",
    },
    KnowledgeDocument {
        source_name: "IRDAI - Term Insurance",
        url: "https://policyholder.gov.in/life_insurance",
        last_updated: "2024-01-15",
        keywords: &["term insurance", "life insurance", "insurance", "cover", "health insurance"],
        content: "Term insurance pays a lump sum to nominees if the insured dies during the policy term and has no maturity value, which keeps premiums low. A common rule of thumb is cover of 10-15 times annual income plus outstanding loans.",
    },
    KnowledgeDocument {
        source_name: "Personal Finance Basics - Budgeting",
        url: "https://www.ncfe.org.in/financial-education",
        last_updated: "2023-11-20",
        keywords: &["budget", "budgeting", "50/30/20", "emergency fund", "savings", "expenses"],
        content: "The 50/30/20 rule splits take-home pay into 50% needs, 30% wants and 20% savings. Keep an emergency fund of 6 months of expenses in a liquid fund or savings account before investing for long-term goals.",
    },
    KnowledgeDocument {
        source_name: "Personal Finance Basics - FIRE",
        url: "https://www.ncfe.org.in/financial-education",
        last_updated: "2023-11-20",
        keywords: &["fire", "financial independence", "retire early", "4% rule", "swr"],
        content: "FIRE (Financial Independence, Retire Early) targets a corpus of about 25 times annual expenses, based on a 4% safe withdrawal rate. Indian planners often use 30-33 times expenses to allow for higher inflation.",
    },
];

/// Keyword-overlap search over a fixed corpus
pub struct KnowledgeBase {
    documents: Vec<KnowledgeDocument>,
}

impl KnowledgeBase {
    pub fn new(documents: Vec<KnowledgeDocument>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Rank documents against `query`.
    ///
    /// Documents whose keywords appear in the query are returned best first.
    /// Without any keyword hit, at most the single document sharing the most
    /// words with the query is returned.
    pub fn search(&self, query: &str) -> Vec<KnowledgeSnippet> {
        let lowered = query.to_lowercase();
        let tokens = tokenize(&lowered);

        let mut hits: Vec<(usize, &KnowledgeDocument)> = self
            .documents
            .iter()
            .map(|doc| (keyword_score(doc, &lowered, &tokens), doc))
            .filter(|(score, _)| *score > 0)
            .collect();

        if !hits.is_empty() {
            // Stable sort keeps corpus order between equal scores.
            hits.sort_by(|a, b| b.0.cmp(&a.0));
            return hits
                .into_iter()
                .take(MAX_RESULTS)
                .map(|(_, doc)| KnowledgeSnippet::from(doc))
                .collect();
        }

        let mut best: Option<(usize, &KnowledgeDocument)> = None;
        for doc in &self.documents {
            let score = overlap_score(doc, &tokens);
            if score > 0 && best.map_or(true, |(top, _)| score > top) {
                best = Some((score, doc));
            }
        }

        best.map(|(_, doc)| vec![KnowledgeSnippet::from(doc)])
            .unwrap_or_default()
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(DEFAULT_CORPUS.to_vec())
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '/' || c == '%'))
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

fn keyword_score(doc: &KnowledgeDocument, lowered: &str, tokens: &HashSet<String>) -> usize {
    doc.keywords
        .iter()
        .filter(|kw| {
            if kw.contains(' ') {
                lowered.contains(*kw)
            } else {
                tokens.contains(**kw)
            }
        })
        .count()
}

fn overlap_score(doc: &KnowledgeDocument, tokens: &HashSet<String>) -> usize {
    let content = tokenize(&doc.content.to_lowercase());
    tokens
        .iter()
        .filter(|t| t.len() >= 3 && content.contains(*t))
        .count()
}

//
// ================= Dynamic rates =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    RepoRate,
    FixedDeposit,
    RecurringDeposit,
    Ppf,
    SavingsAccount,
    Inflation,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DynamicRate {
    pub kind: RateKind,
    pub label: &'static str,
    pub rate: f64,
    pub last_updated: &'static str,
    pub source: &'static str,
}

const DYNAMIC_RATES: &[DynamicRate] = &[
    DynamicRate {
        kind: RateKind::RepoRate,
        label: "RBI repo rate",
        rate: 6.5,
        last_updated: "2024-08-08",
        source: "https://www.rbi.org.in",
    },
    DynamicRate {
        kind: RateKind::FixedDeposit,
        label: "Typical bank FD rate (1-5 years)",
        rate: 7.0,
        last_updated: "2024-08-01",
        source: "https://www.rbi.org.in",
    },
    DynamicRate {
        kind: RateKind::RecurringDeposit,
        label: "Typical bank RD rate",
        rate: 6.5,
        last_updated: "2024-08-01",
        source: "https://www.rbi.org.in",
    },
    DynamicRate {
        kind: RateKind::Ppf,
        label: "PPF interest rate",
        rate: 7.1,
        last_updated: "2024-07-01",
        source: "https://www.nsiindia.gov.in",
    },
    DynamicRate {
        kind: RateKind::SavingsAccount,
        label: "Savings account rate",
        rate: 2.7,
        last_updated: "2024-08-01",
        source: "https://www.rbi.org.in",
    },
    DynamicRate {
        kind: RateKind::Inflation,
        label: "CPI inflation (long-run planning assumption)",
        rate: 6.0,
        last_updated: "2024-08-12",
        source: "https://www.mospi.gov.in",
    },
];

pub fn dynamic_rates() -> &'static [DynamicRate] {
    DYNAMIC_RATES
}

pub fn rate_for(kind: RateKind) -> f64 {
    DYNAMIC_RATES
        .iter()
        .find(|r| r.kind == kind)
        .map(|r| r.rate)
        .unwrap_or(0.0)
}
