use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Deserialize;

use crate::data_source::{
    CapabilitySet, DataSource, MarketRequest, SourceError, StatementsRequest,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::{
    BalanceSnapshot, CashflowYear, FinancialStatements, IncomeSnapshot, MarketSnapshot,
    ProviderId, Symbol, UtcDateTime, ValidationError,
};

const QUOTE_SUMMARY_BASE: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const MARKET_MODULES: &str = "price,defaultKeyStatistics,financialData";
const STATEMENT_MODULES: &str =
    "cashflowStatementHistory,balanceSheetHistory,incomeStatementHistory";

/// Manages the Yahoo Finance session crumb.
///
/// The unofficial API wants a session cookie from fc.yahoo.com (held by the
/// transport's cookie jar) and a crumb token appended to every query.
struct CrumbCache {
    crumb: Mutex<Option<(String, Instant)>>,
    ttl_secs: u64,
}

impl Default for CrumbCache {
    fn default() -> Self {
        Self {
            crumb: Mutex::new(None),
            ttl_secs: 3_600,
        }
    }
}

impl CrumbCache {
    async fn get(&self, http_client: &Arc<dyn HttpClient>) -> Result<String, SourceError> {
        if let Some((crumb, fetched_at)) = self.crumb.lock().expect("crumb lock").clone() {
            if fetched_at.elapsed().as_secs() < self.ttl_secs {
                return Ok(crumb);
            }
        }
        self.refresh(http_client).await
    }

    fn invalidate(&self) {
        *self.crumb.lock().expect("crumb lock") = None;
    }

    async fn refresh(&self, http_client: &Arc<dyn HttpClient>) -> Result<String, SourceError> {
        // Seed the cookie jar first; the crumb endpoint rejects bare sessions.
        let cookie_request = HttpRequest::get("https://fc.yahoo.com")
            .with_header("referer", "https://finance.yahoo.com/");
        let _ = http_client.execute(cookie_request).await.map_err(|e| {
            SourceError::unavailable(format!("failed to open yahoo session: {}", e.message()))
        })?;

        for endpoint in [
            "https://query1.finance.yahoo.com/v1/test/getcrumb",
            "https://query2.finance.yahoo.com/v1/test/getcrumb",
        ] {
            let request =
                HttpRequest::get(endpoint).with_header("referer", "https://finance.yahoo.com/");
            let Ok(response) = http_client.execute(request).await else {
                continue;
            };
            if !response.is_success() {
                continue;
            }

            let body = response.body.trim();
            if body.to_ascii_lowercase().contains("too many requests") {
                return Err(SourceError::rate_limited(
                    "yahoo rate limited while fetching crumb",
                ));
            }
            // HTML means an error page, whitespace means garbage.
            if body.is_empty() || body.len() >= 100 || body.contains('<') || body.contains(' ') {
                continue;
            }

            let crumb = body.to_owned();
            *self.crumb.lock().expect("crumb lock") =
                Some((crumb.clone(), Instant::now()));
            return Ok(crumb);
        }

        Err(SourceError::unavailable(
            "failed to fetch yahoo crumb from all endpoints",
        ))
    }
}

/// Yahoo Finance adapter: market snapshot and financial statements through
/// the quoteSummary API, or deterministic fake data on a mock transport.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    crumb: Arc<CrumbCache>,
    timeout_ms: u64,
    use_real_api: bool,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(NoopHttpClient))
    }
}

impl YahooAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            crumb: Arc::new(CrumbCache::default()),
            timeout_ms: 10_000,
            use_real_api,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Issue a quoteSummary call, refreshing the crumb and retrying once on
    /// an auth/rate rejection.
    async fn fetch_summary(
        &self,
        symbol: &Symbol,
        modules: &str,
    ) -> Result<SummaryResult, SourceError> {
        let mut crumb = self.crumb.get(&self.http_client).await?;

        for attempt in 0..2 {
            let endpoint = format!(
                "{QUOTE_SUMMARY_BASE}/{}?modules={}&crumb={}",
                urlencoding::encode(symbol.as_str()),
                modules,
                urlencoding::encode(&crumb)
            );
            let request = HttpRequest::get(&endpoint)
                .with_header("referer", "https://finance.yahoo.com/")
                .with_timeout_ms(self.timeout_ms);

            let response = self.http_client.execute(request).await.map_err(|e| {
                SourceError::unavailable(format!("yahoo transport error: {}", e.message()))
            })?;

            if (response.status == 401 || response.status == 429) && attempt == 0 {
                self.crumb.invalidate();
                crumb = self.crumb.get(&self.http_client).await?;
                continue;
            }

            if !response.is_success() {
                return Err(SourceError::unavailable(format!(
                    "yahoo returned status {}",
                    response.status
                )));
            }

            return parse_summary(&response.body);
        }

        Err(SourceError::unavailable(
            "yahoo rejected the request after a crumb refresh",
        ))
    }
}

impl DataSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
    }

    fn market<'a>(
        &'a self,
        req: MarketRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MarketSnapshot, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if !self.use_real_api {
                return fake_market(&req.symbol);
            }

            let summary = self.fetch_summary(&req.symbol, MARKET_MODULES).await?;
            normalize_market(&req.symbol, summary)
        })
    }

    fn statements<'a>(
        &'a self,
        req: StatementsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FinancialStatements, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if !self.use_real_api {
                return Ok(fake_statements(&req.symbol, req.years));
            }

            let summary = self.fetch_summary(&req.symbol, STATEMENT_MODULES).await?;
            normalize_statements(summary, req.years)
        })
    }
}

// ============================================================================
// Response normalization
// ============================================================================

fn parse_summary(body: &str) -> Result<SummaryResult, SourceError> {
    let parsed: QuoteSummaryResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo response: {e}")))?;

    if let Some(error) = parsed.quote_summary.error {
        return Err(SourceError::unavailable(format!(
            "yahoo API error: {}",
            error.description.unwrap_or(error.code)
        )));
    }

    parsed
        .quote_summary
        .result
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::incomplete_data("yahoo returned no result for symbol"))
}

fn normalize_market(symbol: &Symbol, summary: SummaryResult) -> Result<MarketSnapshot, SourceError> {
    let price_module = summary.price.as_ref();
    let stats = summary.default_key_statistics.as_ref();
    let financial = summary.financial_data.as_ref();

    let price = financial
        .and_then(|f| f.current_price.as_ref().and_then(RawValue::to_option))
        .or_else(|| {
            price_module.and_then(|p| p.regular_market_price.as_ref().and_then(RawValue::to_option))
        });
    let beta = stats.and_then(|s| s.beta.as_ref().and_then(RawValue::to_option));
    let market_cap = price_module.and_then(|p| p.market_cap.as_ref().and_then(RawValue::to_option));
    let shares = stats.and_then(|s| s.shares_outstanding.as_ref().and_then(RawValue::to_option));
    let currency = price_module
        .and_then(|p| p.currency.clone())
        .unwrap_or_else(|| String::from("USD"));

    MarketSnapshot::new(
        symbol.clone(),
        price,
        beta,
        market_cap,
        shares,
        currency,
        UtcDateTime::now(),
    )
    .map_err(validation_to_error)
}

fn normalize_statements(
    summary: SummaryResult,
    years: usize,
) -> Result<FinancialStatements, SourceError> {
    let cashflow_years = summary
        .cashflow_statement_history
        .map(|history| history.cashflow_statements)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|statement| {
            let period_end =
                UtcDateTime::from_unix_timestamp(statement.end_date?.raw_i64()?).ok()?;
            let operating = statement
                .total_cash_from_operating_activities
                .as_ref()
                .and_then(RawValue::to_option)?;
            let capex = statement
                .capital_expenditures
                .as_ref()
                .and_then(RawValue::to_option)
                .unwrap_or(0.0);
            CashflowYear::new(period_end, operating, capex).ok()
        })
        .take(years)
        .collect::<Vec<_>>();

    if cashflow_years.is_empty() {
        return Err(SourceError::incomplete_data(
            "yahoo cash flow history is missing the operating/capex line items",
        ));
    }

    let balance = summary
        .balance_sheet_history
        .and_then(|history| history.balance_sheet_statements.into_iter().next())
        .map(|sheet| {
            let long_term = sheet.long_term_debt.as_ref().and_then(RawValue::to_option);
            let short_term = sheet
                .short_long_term_debt
                .as_ref()
                .and_then(RawValue::to_option);
            let total_debt = match (long_term, short_term) {
                (None, None) => None,
                (lt, st) => Some(lt.unwrap_or(0.0) + st.unwrap_or(0.0)),
            };
            BalanceSnapshot::new(
                total_debt,
                sheet.cash.as_ref().and_then(RawValue::to_option),
            )
            .unwrap_or_default()
        })
        .unwrap_or_default();

    let income = summary
        .income_statement_history
        .and_then(|history| history.income_statement_history.into_iter().next())
        .map(|statement| {
            let interest = statement
                .interest_expense
                .as_ref()
                .and_then(RawValue::to_option)
                .map(f64::abs);
            let tax_rate = match (
                statement
                    .income_tax_expense
                    .as_ref()
                    .and_then(RawValue::to_option),
                statement
                    .income_before_tax
                    .as_ref()
                    .and_then(RawValue::to_option),
            ) {
                (Some(tax), Some(pretax)) if pretax > 0.0 && tax >= 0.0 => {
                    Some((tax / pretax).min(1.0))
                }
                _ => None,
            };
            IncomeSnapshot::new(interest, tax_rate).unwrap_or_default()
        })
        .unwrap_or_default();

    Ok(FinancialStatements::new(cashflow_years, balance, income))
}

fn validation_to_error(error: ValidationError) -> SourceError {
    SourceError::internal(error.to_string())
}

// ============================================================================
// Deterministic fake data for mock transports
// ============================================================================

fn fake_market(symbol: &Symbol) -> Result<MarketSnapshot, SourceError> {
    let seed = symbol_seed(symbol);
    let price = 92.0 + (seed % 500) as f64 / 10.0;

    MarketSnapshot::new(
        symbol.clone(),
        Some(price),
        Some(0.8 + (seed % 90) as f64 / 100.0),
        Some(400_000_000_000.0 + (seed % 200_000) as f64 * 1_000_000.0),
        Some(4_000_000_000.0 + (seed % 500) as f64 * 1_000_000.0),
        "USD",
        UtcDateTime::now(),
    )
    .map_err(validation_to_error)
}

fn fake_statements(symbol: &Symbol, years: usize) -> FinancialStatements {
    let seed = symbol_seed(symbol);
    let base_year = 2024_i32;
    let base_ocf = 60_000_000_000.0 + (seed % 40_000) as f64 * 1_000_000.0;

    let cashflow_years = (0..years)
        .filter_map(|offset| {
            let period = UtcDateTime::parse(&format!(
                "{}-12-31T00:00:00Z",
                base_year - offset as i32
            ))
            .ok()?;
            // Older years shrink a few percent per step so every growth
            // method sees a positive trend.
            let scale = 0.94_f64.powi(offset as i32);
            CashflowYear::new(period, base_ocf * scale, base_ocf * scale * 0.18).ok()
        })
        .collect::<Vec<_>>();

    let balance = BalanceSnapshot::new(
        Some(25_000_000_000.0 + (seed % 10_000) as f64 * 1_000_000.0),
        Some(15_000_000_000.0),
    )
    .unwrap_or_default();
    let income = IncomeSnapshot::new(Some(1_200_000_000.0), Some(0.21)).unwrap_or_default();

    FinancialStatements::new(cashflow_years, balance, income)
}

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(byte as u64)
    })
}

// ============================================================================
// Yahoo quoteSummary response structures
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryData,
}

#[derive(Debug, Clone, Deserialize)]
struct QuoteSummaryData {
    #[serde(default)]
    result: Vec<SummaryResult>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooApiError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(rename = "defaultKeyStatistics", default)]
    default_key_statistics: Option<KeyStatisticsModule>,
    #[serde(rename = "financialData", default)]
    financial_data: Option<FinancialDataModule>,
    #[serde(rename = "cashflowStatementHistory", default)]
    cashflow_statement_history: Option<CashflowHistoryModule>,
    #[serde(rename = "balanceSheetHistory", default)]
    balance_sheet_history: Option<BalanceSheetHistoryModule>,
    #[serde(rename = "incomeStatementHistory", default)]
    income_statement_history: Option<IncomeHistoryModule>,
}

#[derive(Debug, Clone, Deserialize)]
struct PriceModule {
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<RawValue>,
    #[serde(rename = "marketCap", default)]
    market_cap: Option<RawValue>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct KeyStatisticsModule {
    #[serde(default)]
    beta: Option<RawValue>,
    #[serde(rename = "sharesOutstanding", default)]
    shares_outstanding: Option<RawValue>,
}

#[derive(Debug, Clone, Deserialize)]
struct FinancialDataModule {
    #[serde(rename = "currentPrice", default)]
    current_price: Option<RawValue>,
}

#[derive(Debug, Clone, Deserialize)]
struct CashflowHistoryModule {
    #[serde(rename = "cashflowStatements", default)]
    cashflow_statements: Vec<CashflowStatementEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct CashflowStatementEntry {
    #[serde(rename = "endDate", default)]
    end_date: Option<RawValue>,
    #[serde(rename = "totalCashFromOperatingActivities", default)]
    total_cash_from_operating_activities: Option<RawValue>,
    #[serde(rename = "capitalExpenditures", default)]
    capital_expenditures: Option<RawValue>,
}

#[derive(Debug, Clone, Deserialize)]
struct BalanceSheetHistoryModule {
    #[serde(rename = "balanceSheetStatements", default)]
    balance_sheet_statements: Vec<BalanceSheetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct BalanceSheetEntry {
    #[serde(rename = "longTermDebt", default)]
    long_term_debt: Option<RawValue>,
    #[serde(rename = "shortLongTermDebt", default)]
    short_long_term_debt: Option<RawValue>,
    #[serde(default)]
    cash: Option<RawValue>,
}

#[derive(Debug, Clone, Deserialize)]
struct IncomeHistoryModule {
    #[serde(rename = "incomeStatementHistory", default)]
    income_statement_history: Vec<IncomeStatementEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct IncomeStatementEntry {
    #[serde(rename = "interestExpense", default)]
    interest_expense: Option<RawValue>,
    #[serde(rename = "incomeTaxExpense", default)]
    income_tax_expense: Option<RawValue>,
    #[serde(rename = "incomeBeforeTax", default)]
    income_before_tax: Option<RawValue>,
}

/// Yahoo wraps numeric values in `{ "raw": ..., "fmt": ... }` objects.
#[derive(Debug, Clone, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

impl RawValue {
    fn to_option(&self) -> Option<f64> {
        self.raw.filter(|v| v.is_finite())
    }

    fn raw_i64(&self) -> Option<i64> {
        self.raw.filter(|v| v.is_finite()).map(|v| v as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};

    struct CannedHttpClient {
        responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl CannedHttpClient {
        fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .iter()
                .map(|r| r.url.clone())
                .collect()
        }
    }

    impl HttpClient for CannedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let mut responses = self.responses.lock().expect("responses");
            let response = if responses.is_empty() {
                Ok(HttpResponse::ok_json("{}"))
            } else {
                responses.remove(0)
            };
            Box::pin(async move { response })
        }
    }

    const STATEMENTS_BODY: &str = r#"{
        "quoteSummary": {
            "result": [{
                "cashflowStatementHistory": {
                    "cashflowStatements": [
                        {
                            "endDate": {"raw": 1727481600},
                            "totalCashFromOperatingActivities": {"raw": 118254000000},
                            "capitalExpenditures": {"raw": -9447000000}
                        },
                        {
                            "endDate": {"raw": 1695945600},
                            "totalCashFromOperatingActivities": {"raw": 110543000000},
                            "capitalExpenditures": {"raw": -10959000000}
                        }
                    ]
                },
                "balanceSheetHistory": {
                    "balanceSheetStatements": [{
                        "longTermDebt": {"raw": 85750000000},
                        "shortLongTermDebt": {"raw": 10912000000},
                        "cash": {"raw": 29943000000}
                    }]
                },
                "incomeStatementHistory": {
                    "incomeStatementHistory": [{
                        "interestExpense": {"raw": -3933000000},
                        "incomeTaxExpense": {"raw": 29749000000},
                        "incomeBeforeTax": {"raw": 123485000000}
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[tokio::test]
    async fn mock_transport_serves_deterministic_statements() {
        let adapter = YahooAdapter::default();
        let symbol = Symbol::parse("AAPL").expect("symbol");

        let first = adapter
            .statements(StatementsRequest::new(symbol.clone(), 5).expect("request"))
            .await
            .expect("statements");
        let second = adapter
            .statements(StatementsRequest::new(symbol, 5).expect("request"))
            .await
            .expect("statements");

        assert_eq!(first, second);
        assert_eq!(first.cashflow_years.len(), 5);
        assert!(first.cashflow_years[0].free_cash_flow() > 0.0);
    }

    #[tokio::test]
    async fn parses_real_statement_payload() {
        // Crumb handshake (cookie + crumb) then the statements call.
        let client = Arc::new(CannedHttpClient::new(vec![
            Ok(HttpResponse::ok_json("")),
            Ok(HttpResponse {
                status: 200,
                body: String::from("abcdef"),
            }),
            Ok(HttpResponse::ok_json(STATEMENTS_BODY)),
        ]));
        let adapter = YahooAdapter {
            http_client: client.clone(),
            crumb: Arc::new(CrumbCache::default()),
            timeout_ms: 10_000,
            use_real_api: true,
        };

        let statements = adapter
            .statements(
                StatementsRequest::new(Symbol::parse("AAPL").expect("symbol"), 5)
                    .expect("request"),
            )
            .await
            .expect("statements should parse");

        assert_eq!(statements.cashflow_years.len(), 2);
        let newest = &statements.cashflow_years[0];
        assert_eq!(newest.fiscal_year(), 2024);
        assert!((newest.free_cash_flow() - (118_254_000_000.0 - 9_447_000_000.0)).abs() < 1.0);
        assert_eq!(
            statements.balance.total_debt,
            Some(85_750_000_000.0 + 10_912_000_000.0)
        );
        // Interest expense normalized to a magnitude.
        assert_eq!(statements.income.interest_expense, Some(3_933_000_000.0));

        let urls = client.recorded_urls();
        assert!(urls.last().expect("urls").contains("crumb=abcdef"));
    }

    #[tokio::test]
    async fn refreshes_crumb_once_on_unauthorized() {
        let client = Arc::new(CannedHttpClient::new(vec![
            // First handshake.
            Ok(HttpResponse::ok_json("")),
            Ok(HttpResponse {
                status: 200,
                body: String::from("stale"),
            }),
            // Rejected call triggers one refresh.
            Ok(HttpResponse {
                status: 401,
                body: String::new(),
            }),
            // Second handshake.
            Ok(HttpResponse::ok_json("")),
            Ok(HttpResponse {
                status: 200,
                body: String::from("fresh"),
            }),
            Ok(HttpResponse::ok_json(STATEMENTS_BODY)),
        ]));
        let adapter = YahooAdapter {
            http_client: client.clone(),
            crumb: Arc::new(CrumbCache::default()),
            timeout_ms: 10_000,
            use_real_api: true,
        };

        adapter
            .statements(
                StatementsRequest::new(Symbol::parse("MSFT").expect("symbol"), 5)
                    .expect("request"),
            )
            .await
            .expect("retry should recover");

        let urls = client.recorded_urls();
        assert!(urls.last().expect("urls").contains("crumb=fresh"));
    }

    #[tokio::test]
    async fn missing_cashflow_lines_surface_incomplete_data() {
        let body = r#"{"quoteSummary": {"result": [{}], "error": null}}"#;
        let client = Arc::new(CannedHttpClient::new(vec![
            Ok(HttpResponse::ok_json("")),
            Ok(HttpResponse {
                status: 200,
                body: String::from("abcdef"),
            }),
            Ok(HttpResponse::ok_json(body)),
        ]));
        let adapter = YahooAdapter {
            http_client: client,
            crumb: Arc::new(CrumbCache::default()),
            timeout_ms: 10_000,
            use_real_api: true,
        };

        let err = adapter
            .statements(
                StatementsRequest::new(Symbol::parse("AAPL").expect("symbol"), 5)
                    .expect("request"),
            )
            .await
            .expect_err("must fail");
        assert_eq!(
            err.kind(),
            crate::data_source::SourceErrorKind::IncompleteData
        );
    }
}
