use std::sync::Arc;
use std::time::Instant;

use crate::adapters::{EdgarAdapter, YahooAdapter};
use crate::data_source::{
    DataSource, Endpoint, MarketRequest, SourceError, StatementsRequest,
};
use crate::http_client::{NoopHttpClient, ReqwestHttpClient};
use crate::{CompanyFinancials, FinancialStatements, ProviderId, Symbol};

/// One provider's failure inside a route attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteError {
    pub source: ProviderId,
    pub error: SourceError,
}

/// Successful route with the provenance the envelope reports.
#[derive(Debug, Clone)]
pub struct RouteSuccess<T> {
    pub data: T,
    /// Provider that served the financial statements.
    pub statements_source: ProviderId,
    /// Every provider attempted, in order.
    pub source_chain: Vec<ProviderId>,
    pub errors: Vec<RouteError>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

/// Exhausted route: every capable provider failed.
#[derive(Debug, Clone)]
pub struct RouteFailure {
    pub source_chain: Vec<ProviderId>,
    pub errors: Vec<RouteError>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

pub type RouteResult<T> = Result<RouteSuccess<T>, RouteFailure>;

/// Routes fetches across providers: market data comes from the quote-capable
/// source, statements are tried in preference order (EDGAR filings first,
/// Yahoo as fallback) with failures downgraded to warnings when a later
/// source succeeds.
pub struct SourceRouter {
    adapters: Vec<Arc<dyn DataSource>>,
}

impl SourceRouter {
    /// Statement preference order is the order of `adapters`.
    pub fn new(adapters: Vec<Arc<dyn DataSource>>) -> Self {
        Self { adapters }
    }

    pub fn sources(&self) -> impl Iterator<Item = &Arc<dyn DataSource>> {
        self.adapters.iter()
    }

    /// Fetch everything one valuation run needs.
    pub async fn fetch_company(
        &self,
        symbol: &Symbol,
        statement_years: usize,
    ) -> RouteResult<CompanyFinancials> {
        let started = Instant::now();
        let mut source_chain = Vec::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let market_adapter = self
            .adapters
            .iter()
            .find(|adapter| adapter.capabilities().supports(Endpoint::Market));

        let Some(market_adapter) = market_adapter else {
            return Err(RouteFailure {
                source_chain,
                errors,
                warnings: vec![String::from("no registered source supports market data")],
                latency_ms: elapsed_ms(started),
            });
        };

        source_chain.push(market_adapter.id());
        let market = match market_adapter
            .market(MarketRequest::new(symbol.clone()))
            .await
        {
            Ok(snapshot) => snapshot,
            Err(error) => {
                errors.push(RouteError {
                    source: market_adapter.id(),
                    error,
                });
                return Err(RouteFailure {
                    source_chain,
                    errors,
                    warnings,
                    latency_ms: elapsed_ms(started),
                });
            }
        };

        match self
            .statements_with_fallback(symbol, statement_years, &mut source_chain, &mut errors)
            .await
        {
            Ok((statements, statements_source)) => {
                for route_error in &errors {
                    warnings.push(format!(
                        "{} statements unavailable ({}); fell back to {}",
                        route_error.source,
                        route_error.error.message(),
                        statements_source
                    ));
                }
                Ok(RouteSuccess {
                    data: CompanyFinancials::new(market, statements),
                    statements_source,
                    source_chain,
                    errors,
                    warnings,
                    latency_ms: elapsed_ms(started),
                })
            }
            Err(()) => Err(RouteFailure {
                source_chain,
                errors,
                warnings,
                latency_ms: elapsed_ms(started),
            }),
        }
    }

    /// Fetch statements only (the `fcf` command path).
    pub async fn fetch_statements(
        &self,
        symbol: &Symbol,
        statement_years: usize,
    ) -> RouteResult<FinancialStatements> {
        let started = Instant::now();
        let mut source_chain = Vec::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match self
            .statements_with_fallback(symbol, statement_years, &mut source_chain, &mut errors)
            .await
        {
            Ok((statements, statements_source)) => {
                for route_error in &errors {
                    warnings.push(format!(
                        "{} statements unavailable ({}); fell back to {}",
                        route_error.source,
                        route_error.error.message(),
                        statements_source
                    ));
                }
                Ok(RouteSuccess {
                    data: statements,
                    statements_source,
                    source_chain,
                    errors,
                    warnings,
                    latency_ms: elapsed_ms(started),
                })
            }
            Err(()) => Err(RouteFailure {
                source_chain,
                errors,
                warnings,
                latency_ms: elapsed_ms(started),
            }),
        }
    }

    async fn statements_with_fallback(
        &self,
        symbol: &Symbol,
        statement_years: usize,
        source_chain: &mut Vec<ProviderId>,
        errors: &mut Vec<RouteError>,
    ) -> Result<(FinancialStatements, ProviderId), ()> {
        let request = match StatementsRequest::new(symbol.clone(), statement_years) {
            Ok(request) => request,
            Err(error) => {
                errors.push(RouteError {
                    source: self
                        .adapters
                        .first()
                        .map(|a| a.id())
                        .unwrap_or(ProviderId::Yahoo),
                    error,
                });
                return Err(());
            }
        };

        for adapter in &self.adapters {
            if !adapter.capabilities().supports(Endpoint::Statements) {
                continue;
            }
            if !source_chain.contains(&adapter.id()) {
                source_chain.push(adapter.id());
            }

            match adapter.statements(request.clone()).await {
                Ok(statements) if !statements.is_empty() => {
                    return Ok((statements, adapter.id()));
                }
                Ok(_) => errors.push(RouteError {
                    source: adapter.id(),
                    error: SourceError::incomplete_data("provider returned empty statements"),
                }),
                Err(error) => errors.push(RouteError {
                    source: adapter.id(),
                    error,
                }),
            }
        }

        Err(())
    }
}

/// Builds the standard router topology: EDGAR first for statements, Yahoo
/// for market data and statement fallback.
pub struct SourceRouterBuilder {
    mock: bool,
    timeout_ms: u64,
}

impl Default for SourceRouterBuilder {
    fn default() -> Self {
        Self {
            mock: false,
            timeout_ms: 10_000,
        }
    }
}

impl SourceRouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve deterministic offline data from every adapter.
    pub fn with_mock_mode(mut self) -> Self {
        self.mock = true;
        self
    }

    /// Per-request timeout applied to both providers.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn build(self) -> SourceRouter {
        let transport: Arc<dyn crate::http_client::HttpClient> = if self.mock {
            Arc::new(NoopHttpClient)
        } else {
            Arc::new(ReqwestHttpClient::new())
        };

        SourceRouter::new(vec![
            Arc::new(
                EdgarAdapter::with_http_client(transport.clone())
                    .with_timeout_ms(self.timeout_ms),
            ),
            Arc::new(
                YahooAdapter::with_http_client(transport).with_timeout_ms(self.timeout_ms),
            ),
        ])
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{CapabilitySet, SourceErrorKind};
    use crate::{MarketSnapshot, UtcDateTime};
    use std::future::Future;
    use std::pin::Pin;

    /// Statements-only adapter that always fails, standing in for a broken
    /// EDGAR.
    struct FailingStatements;

    impl DataSource for FailingStatements {
        fn id(&self) -> ProviderId {
            ProviderId::Edgar
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::statements_only()
        }

        fn market<'a>(
            &'a self,
            _req: MarketRequest,
        ) -> Pin<Box<dyn Future<Output = Result<MarketSnapshot, SourceError>> + Send + 'a>>
        {
            Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Market)) })
        }

        fn statements<'a>(
            &'a self,
            _req: StatementsRequest,
        ) -> Pin<Box<dyn Future<Output = Result<FinancialStatements, SourceError>> + Send + 'a>>
        {
            Box::pin(async { Err(SourceError::unavailable("edgar is down")) })
        }
    }

    /// Market-only failure double for the quote path.
    struct FailingMarket;

    impl DataSource for FailingMarket {
        fn id(&self) -> ProviderId {
            ProviderId::Yahoo
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::full()
        }

        fn market<'a>(
            &'a self,
            _req: MarketRequest,
        ) -> Pin<Box<dyn Future<Output = Result<MarketSnapshot, SourceError>> + Send + 'a>>
        {
            Box::pin(async { Err(SourceError::unavailable("quote service unreachable")) })
        }

        fn statements<'a>(
            &'a self,
            _req: StatementsRequest,
        ) -> Pin<Box<dyn Future<Output = Result<FinancialStatements, SourceError>> + Send + 'a>>
        {
            Box::pin(async { Err(SourceError::unavailable("quote service unreachable")) })
        }
    }

    fn symbol() -> Symbol {
        Symbol::parse("AAPL").expect("symbol")
    }

    #[tokio::test]
    async fn mock_router_serves_full_company_data() {
        let router = SourceRouterBuilder::new().with_mock_mode().build();
        let route = router
            .fetch_company(&symbol(), 5)
            .await
            .expect("mock route should succeed");

        assert_eq!(route.statements_source, ProviderId::Edgar);
        assert_eq!(route.source_chain, vec![ProviderId::Yahoo, ProviderId::Edgar]);
        assert!(route.errors.is_empty());
        assert!(!route.data.fcf_history().is_empty());
    }

    #[tokio::test]
    async fn statements_fall_back_to_yahoo_when_edgar_fails() {
        let transport: Arc<NoopHttpClient> = Arc::new(NoopHttpClient);
        let router = SourceRouter::new(vec![
            Arc::new(FailingStatements),
            Arc::new(YahooAdapter::with_http_client(transport)),
        ]);

        let route = router
            .fetch_company(&symbol(), 5)
            .await
            .expect("fallback should succeed");

        assert_eq!(route.statements_source, ProviderId::Yahoo);
        assert_eq!(route.errors.len(), 1);
        assert_eq!(route.errors[0].source, ProviderId::Edgar);
        assert_eq!(route.warnings.len(), 1);
        assert!(route.warnings[0].contains("fell back to yahoo"));
    }

    #[tokio::test]
    async fn market_failure_fails_the_route() {
        let route = SourceRouter::new(vec![Arc::new(FailingMarket)])
            .fetch_company(&symbol(), 5)
            .await;

        let failure = route.expect_err("must fail");
        assert_eq!(failure.errors.len(), 1);
        assert_eq!(failure.errors[0].error.kind(), SourceErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn all_statement_sources_failing_fails_the_route() {
        let router = SourceRouter::new(vec![Arc::new(FailingStatements)]);
        let failure = router
            .fetch_statements(&symbol(), 5)
            .await
            .expect_err("must fail");

        assert_eq!(failure.source_chain, vec![ProviderId::Edgar]);
        assert_eq!(failure.errors.len(), 1);
    }
}
