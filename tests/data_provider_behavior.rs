//! Behavior-driven tests for data provider behavior.
//!
//! These verify HOW the system handles provider scenarios: mock-mode
//! determinism, capability gating, and the EDGAR-to-Yahoo statement
//! fallback.

use std::future::Future;
use std::pin::Pin;

use tickval_tests::Arc;

use tickval_core::{
    data_source::{
        CapabilitySet, DataSource, Endpoint, MarketRequest, SourceError, SourceErrorKind,
        StatementsRequest,
    },
    EdgarAdapter, FinancialStatements, MarketSnapshot, ProviderId, SourceRouter,
    SourceRouterBuilder, Symbol, YahooAdapter,
};

// =============================================================================
// Adapter capability and mock-mode behavior
// =============================================================================

#[tokio::test]
async fn when_yahoo_serves_mock_data_the_snapshot_parses_into_domain_types() {
    // Given: a Yahoo adapter on the default (mock) transport
    let adapter = YahooAdapter::default();
    let symbol = Symbol::parse("AAPL").expect("valid");

    // When: the system requests a market snapshot
    let snapshot = adapter
        .market(MarketRequest::new(symbol))
        .await
        .expect("mock market data should parse");

    // Then: the snapshot carries the fields the valuation needs
    assert_eq!(snapshot.symbol.as_str(), "AAPL");
    assert!(snapshot.price.expect("price") > 0.0);
    assert!(snapshot.shares_outstanding.expect("shares") > 0.0);
    assert_eq!(snapshot.currency, "USD");
}

#[tokio::test]
async fn when_edgar_is_asked_for_quotes_it_reports_unsupported_endpoint() {
    let adapter = EdgarAdapter::default();
    let symbol = Symbol::parse("AAPL").expect("valid");

    let err = adapter
        .market(MarketRequest::new(symbol))
        .await
        .expect_err("edgar has no quote endpoint");
    assert_eq!(err.kind(), SourceErrorKind::UnsupportedEndpoint);
    assert!(!adapter.capabilities().supports(Endpoint::Market));
}

#[tokio::test]
async fn mock_statements_are_deterministic_and_newest_first() {
    let adapter = EdgarAdapter::default();
    let symbol = Symbol::parse("MSFT").expect("valid");
    let request = |years| StatementsRequest::new(Symbol::parse("MSFT").expect("valid"), years)
        .expect("request");

    let first = adapter.statements(request(5)).await.expect("statements");
    let second = adapter.statements(request(5)).await.expect("statements");

    assert_eq!(first, second, "mock data must be stable for {symbol}");
    let years: Vec<i32> = first
        .cashflow_years
        .iter()
        .map(|year| year.fiscal_year())
        .collect();
    let mut sorted = years.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(years, sorted, "statements must arrive newest first");
}

// =============================================================================
// Router fallback behavior
// =============================================================================

/// Stand-in for EDGAR when the service is unreachable.
struct UnreachableEdgar;

impl DataSource for UnreachableEdgar {
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
        Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Market)) })
    }

    fn statements<'a>(
        &'a self,
        _req: StatementsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FinancialStatements, SourceError>> + Send + 'a>> {
        Box::pin(async { Err(SourceError::unavailable("connection refused")) })
    }
}

#[tokio::test]
async fn when_edgar_fails_statements_fall_back_to_yahoo_with_a_warning() {
    // Given: a router whose EDGAR leg is down
    let router = SourceRouter::new(vec![
        Arc::new(UnreachableEdgar),
        Arc::new(YahooAdapter::default()),
    ]);
    let symbol = Symbol::parse("AAPL").expect("valid");

    // When: company data is fetched
    let route = router
        .fetch_company(&symbol, 5)
        .await
        .expect("yahoo fallback should succeed");

    // Then: Yahoo served the statements and the failure is downgraded to a
    // warning with full provenance
    assert_eq!(route.statements_source, ProviderId::Yahoo);
    assert_eq!(
        route.source_chain,
        vec![ProviderId::Yahoo, ProviderId::Edgar]
    );
    assert_eq!(route.errors.len(), 1);
    assert_eq!(route.errors[0].source, ProviderId::Edgar);
    assert!(route.warnings[0].contains("fell back to yahoo"));
}

#[tokio::test]
async fn when_every_statement_source_fails_the_route_reports_each_error() {
    let router = SourceRouter::new(vec![Arc::new(UnreachableEdgar)]);
    let symbol = Symbol::parse("AAPL").expect("valid");

    let failure = router
        .fetch_statements(&symbol, 5)
        .await
        .expect_err("no statements source left");

    assert_eq!(failure.source_chain, vec![ProviderId::Edgar]);
    assert_eq!(failure.errors.len(), 1);
    assert_eq!(failure.errors[0].error.kind(), SourceErrorKind::Unavailable);
}

#[tokio::test]
async fn default_mock_topology_prefers_edgar_statements() {
    let router = SourceRouterBuilder::new().with_mock_mode().build();
    let symbol = Symbol::parse("KO").expect("valid");

    let route = router.fetch_company(&symbol, 5).await.expect("route");

    assert_eq!(route.statements_source, ProviderId::Edgar);
    assert!(route.errors.is_empty());
    assert!(route.warnings.is_empty());
}
