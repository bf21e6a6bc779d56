use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::data_source::{
    CapabilitySet, DataSource, MarketRequest, SourceError, StatementsRequest,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, NoopHttpClient};
use crate::{
    BalanceSnapshot, CashflowYear, Endpoint, FinancialStatements, IncomeSnapshot, MarketSnapshot,
    ProviderId, Symbol, UtcDateTime,
};

const TICKER_INDEX_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const COMPANY_FACTS_BASE: &str = "https://data.sec.gov/api/xbrl/companyfacts";

// us-gaap concept tags, in preference order.
const OPERATING_CF_TAGS: [&str; 2] = [
    "NetCashProvidedByUsedInOperatingActivities",
    "NetCashProvidedByUsedInOperatingActivitiesContinuingOperations",
];
const CAPEX_TAGS: [&str; 2] = [
    "PaymentsToAcquirePropertyPlantAndEquipment",
    "PaymentsToAcquireProductiveAssets",
];
const LONG_TERM_DEBT_TAGS: [&str; 2] = ["LongTermDebtNoncurrent", "LongTermDebt"];
const CURRENT_DEBT_TAGS: [&str; 2] = ["LongTermDebtCurrent", "DebtCurrent"];
const CASH_TAGS: [&str; 2] = [
    "CashAndCashEquivalentsAtCarryingValue",
    "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalents",
];
const INTEREST_TAGS: [&str; 2] = ["InterestExpense", "InterestExpenseDebt"];

/// SEC EDGAR adapter: financial statements from XBRL company facts.
///
/// EDGAR knows nothing about live quotes, so this source is statements-only
/// and the router pairs it with Yahoo for market data. SEC asks automated
/// clients to identify themselves in the User-Agent.
#[derive(Clone)]
pub struct EdgarAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    timeout_ms: u64,
    use_real_api: bool,
}

impl Default for EdgarAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(NoopHttpClient))
    }
}

impl EdgarAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            auth: HttpAuth::Header {
                name: String::from("User-Agent"),
                value: String::from("tickval/0.1.0 (valuation research)"),
            },
            timeout_ms: 10_000,
            use_real_api,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Override the User-Agent SEC sees; automated clients must identify
    /// themselves.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.auth = HttpAuth::Header {
            name: String::from("User-Agent"),
            value: user_agent.into(),
        };
        self
    }

    async fn fetch_json(&self, url: &str) -> Result<String, SourceError> {
        let request = HttpRequest::get(url)
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms);
        let response = self.http_client.execute(request).await.map_err(|e| {
            SourceError::unavailable(format!("edgar transport error: {}", e.message()))
        })?;

        if response.status == 429 {
            return Err(SourceError::rate_limited("edgar rate limited the request"));
        }
        if response.status == 404 {
            return Err(SourceError::incomplete_data(
                "edgar has no filings for this company",
            ));
        }
        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "edgar returned status {}",
                response.status
            )));
        }

        Ok(response.body)
    }

    async fn resolve_cik(&self, symbol: &Symbol) -> Result<u64, SourceError> {
        let body = self.fetch_json(TICKER_INDEX_URL).await?;
        let index: BTreeMap<String, TickerEntry> = serde_json::from_str(&body)
            .map_err(|e| SourceError::internal(format!("failed to parse ticker index: {e}")))?;

        index
            .values()
            .find(|entry| entry.ticker.eq_ignore_ascii_case(symbol.as_str()))
            .map(|entry| entry.cik_str)
            .ok_or_else(|| {
                SourceError::incomplete_data(format!(
                    "ticker '{symbol}' is not in the SEC company index"
                ))
            })
    }
}

impl DataSource for EdgarAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Edgar
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::statements_only()
    }

    fn market<'a>(
        &'a self,
        _req: MarketRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MarketSnapshot, SourceError>> + Send + 'a>> {
        Box::pin(async move { Err(SourceError::unsupported_endpoint(Endpoint::Market)) })
    }

    fn statements<'a>(
        &'a self,
        req: StatementsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FinancialStatements, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if !self.use_real_api {
                return Ok(fake_statements(&req.symbol, req.years));
            }

            let cik = self.resolve_cik(&req.symbol).await?;
            let url = format!("{COMPANY_FACTS_BASE}/CIK{cik:010}.json");
            let body = self.fetch_json(&url).await?;
            let facts: CompanyFacts = serde_json::from_str(&body)
                .map_err(|e| SourceError::internal(format!("failed to parse company facts: {e}")))?;

            normalize_statements(&facts, req.years)
        })
    }
}

fn normalize_statements(
    facts: &CompanyFacts,
    years: usize,
) -> Result<FinancialStatements, SourceError> {
    let operating = annual_series(facts, &OPERATING_CF_TAGS);
    let capex = annual_series(facts, &CAPEX_TAGS);

    let cashflow_years = operating
        .iter()
        .filter_map(|(end, ocf)| {
            let period_end = UtcDateTime::parse(&format!("{end}T00:00:00Z")).ok()?;
            // XBRL reports the capex payment as a positive outflow; a year
            // with no reported capex still yields an FCF row.
            let capex_value = capex.get(end).copied().unwrap_or(0.0);
            CashflowYear::new(period_end, *ocf, capex_value).ok()
        })
        .collect::<Vec<_>>();

    if cashflow_years.is_empty() {
        return Err(SourceError::incomplete_data(
            "edgar facts are missing annual operating cash flow",
        ));
    }

    let mut statements = FinancialStatements::new(cashflow_years, balance(facts), income(facts));
    statements.cashflow_years.truncate(years);
    Ok(statements)
}

fn balance(facts: &CompanyFacts) -> BalanceSnapshot {
    let long_term = latest_annual(facts, &LONG_TERM_DEBT_TAGS);
    let current = latest_annual(facts, &CURRENT_DEBT_TAGS);
    let total_debt = match (long_term, current) {
        (None, None) => None,
        (lt, cur) => Some(lt.unwrap_or(0.0) + cur.unwrap_or(0.0)),
    };

    BalanceSnapshot::new(total_debt, latest_annual(facts, &CASH_TAGS)).unwrap_or_default()
}

fn income(facts: &CompanyFacts) -> IncomeSnapshot {
    IncomeSnapshot::new(latest_annual(facts, &INTEREST_TAGS).map(f64::abs), None)
        .unwrap_or_default()
}

/// Annual (10-K) values for the first tag that has any, keyed by period end.
/// Later filings restate earlier years, so the last fact per end date wins.
fn annual_series(facts: &CompanyFacts, tags: &[&str]) -> BTreeMap<String, f64> {
    for tag in tags {
        let Some(concept) = facts.us_gaap().and_then(|gaap| gaap.get(*tag)) else {
            continue;
        };
        let Some(usd) = concept.units.get("USD") else {
            continue;
        };

        let mut by_end = BTreeMap::new();
        for fact in usd {
            if fact.form.as_deref() == Some("10-K") && fact.fp.as_deref() == Some("FY") {
                if let Some(value) = fact.val {
                    by_end.insert(fact.end.clone(), value);
                }
            }
        }
        if !by_end.is_empty() {
            return by_end;
        }
    }
    BTreeMap::new()
}

fn latest_annual(facts: &CompanyFacts, tags: &[&str]) -> Option<f64> {
    let series = annual_series(facts, tags);
    series.into_iter().next_back().map(|(_, value)| value)
}

fn fake_statements(symbol: &Symbol, years: usize) -> FinancialStatements {
    let seed = symbol
        .as_str()
        .bytes()
        .fold(7_u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as u64));
    let base_ocf = 55_000_000_000.0 + (seed % 30_000) as f64 * 1_000_000.0;

    let cashflow_years = (0..years)
        .filter_map(|offset| {
            let period =
                UtcDateTime::parse(&format!("{}-09-30T00:00:00Z", 2024 - offset as i32)).ok()?;
            let scale = 0.93_f64.powi(offset as i32);
            CashflowYear::new(period, base_ocf * scale, base_ocf * scale * 0.15).ok()
        })
        .collect::<Vec<_>>();

    FinancialStatements::new(
        cashflow_years,
        BalanceSnapshot::new(Some(30_000_000_000.0), Some(12_000_000_000.0))
            .unwrap_or_default(),
        IncomeSnapshot::new(Some(1_500_000_000.0), None).unwrap_or_default(),
    )
}

// ============================================================================
// SEC response structures
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct TickerEntry {
    cik_str: u64,
    ticker: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CompanyFacts {
    #[serde(default)]
    facts: BTreeMap<String, BTreeMap<String, Concept>>,
}

impl CompanyFacts {
    fn us_gaap(&self) -> Option<&BTreeMap<String, Concept>> {
        self.facts.get("us-gaap")
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Concept {
    #[serde(default)]
    units: BTreeMap<String, Vec<Fact>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Fact {
    #[serde(default)]
    end: String,
    #[serde(default)]
    val: Option<f64>,
    #[serde(default)]
    form: Option<String>,
    #[serde(default)]
    fp: Option<String>,
}
