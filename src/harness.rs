//! @ai:module:intent Wire registry, corpus, runner and aggregator into one benchmark suite
//! @ai:module:layer application
//! @ai:module:public_api Harness, BenchmarkResults
//! @ai:module:stateless false

use crate::aggregator::{AggregatedResult, StatisticalAggregator};
use crate::config::HarnessConfig;
use crate::corpus::ProgramCorpus;
use crate::error::{HarnessError, Result};
use crate::invoker::ProcessInvokerTrait;
use crate::ranking::{rank_by_test, TestRanking};
use crate::runner::BenchmarkRunner;
use crate::toolchain::{ToolchainInfo, ToolchainRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// @ai:intent Complete output of a suite run, handed to report renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResults {
    /// RFC 3339 start time of the run
    pub timestamp: String,
    pub iterations: u32,
    pub toolchains: Vec<ToolchainInfo>,
    /// One entry per (test, toolchain) pair, grouped by test with toolchains in registration order
    pub results: Vec<AggregatedResult>,
    pub rankings: Vec<TestRanking>,
}

impl BenchmarkResults {
    /// @ai:effects pure
    pub fn result(&self, toolchain: &str, test: &str) -> Option<&AggregatedResult> {
        self.results
            .iter()
            .find(|r| r.toolchain == toolchain && r.test_identifier == test)
    }

    /// @ai:effects pure
    pub fn ranking(&self, test: &str) -> Option<&TestRanking> {
        self.rankings.iter().find(|r| r.test_identifier == test)
    }
}

/// @ai:intent A configured, validated suite ready to run
pub struct Harness<I: ProcessInvokerTrait> {
    config: HarnessConfig,
    registry: Arc<ToolchainRegistry>,
    infos: BTreeMap<String, ToolchainInfo>,
    corpus: Arc<ProgramCorpus>,
    tests: Vec<String>,
    invoker: Arc<I>,
}

impl<I: ProcessInvokerTrait + 'static> Harness<I> {
    /// @ai:intent Build and validate the suite, then discover toolchains.
    ///            Invalid settings and an incomplete corpus fail here, before any build runs.
    /// @ai:effects io, fs:read
    pub async fn new(config: HarnessConfig, invoker: I) -> Result<Self> {
        if config.run.iterations == 0 {
            return Err(HarnessError::InvalidConfig(
                "run.iterations must be at least 1".to_string(),
            ));
        }

        let filter = &config.run.filter;

        let mut registry = ToolchainRegistry::from_config(&config)?;
        if let Some(unknown) = filter
            .toolchains
            .iter()
            .flatten()
            .find(|id| registry.get(id).is_none())
        {
            return Err(HarnessError::UnknownToolchain(unknown.clone()));
        }
        registry.retain(|id| filter.allows_toolchain(id));

        let corpus = ProgramCorpus::load(config.paths.corpus_dir.as_deref())?;
        if let Some(unknown) = filter
            .tests
            .iter()
            .flatten()
            .find(|id| corpus.test(id).is_none())
        {
            return Err(HarnessError::UnknownTest(unknown.clone()));
        }

        let tests: Vec<String> = corpus
            .test_ids()
            .into_iter()
            .filter(|id| filter.allows_test(id))
            .collect();

        corpus.validate_complete(&tests, &registry.ids())?;

        let infos = registry
            .discovered(&invoker, config.run.probe_timeout())
            .await
            .clone();
        ToolchainRegistry::log_unavailable(&infos);

        tracing::info!(
            "Suite ready: {} toolchains ({} available), {} tests",
            infos.len(),
            infos.values().filter(|i| i.available).count(),
            tests.len()
        );

        Ok(Self {
            config,
            registry: Arc::new(registry),
            infos,
            corpus: Arc::new(corpus),
            tests,
            invoker: Arc::new(invoker),
        })
    }

    /// @ai:intent Selected toolchains in registration order
    /// @ai:effects pure
    pub fn toolchains(&self) -> Vec<ToolchainInfo> {
        self.registry
            .ids()
            .iter()
            .filter_map(|id| self.infos.get(id).cloned())
            .collect()
    }

    /// @ai:effects pure
    pub fn test_ids(&self) -> &[String] {
        &self.tests
    }

    /// @ai:effects pure
    pub fn corpus(&self) -> &ProgramCorpus {
        &self.corpus
    }

    /// @ai:effects pure
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// @ai:effects pure
    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// @ai:intent Every (toolchain, test) pair, grouped by test
    /// @ai:effects pure
    pub fn pairs(&self) -> Vec<(String, String)> {
        let toolchains = self.registry.ids();

        self.tests
            .iter()
            .flat_map(|test| {
                toolchains
                    .iter()
                    .map(move |toolchain| (toolchain.clone(), test.clone()))
            })
            .collect()
    }

    /// @ai:intent Run every pair and rank the results
    /// @ai:effects io, fs:write
    pub async fn run(&self) -> Result<BenchmarkResults> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let run = &self.config.run;

        let runner = BenchmarkRunner::new(
            Arc::clone(&self.registry),
            self.infos.clone(),
            Arc::clone(&self.corpus),
            Arc::clone(&self.invoker),
            run.build_timeout(),
        );
        let aggregator = StatisticalAggregator::new(Arc::new(runner));

        let pairs = self.pairs();
        tracing::info!(
            "Running {} pairs x {} iterations (concurrency {})",
            pairs.len(),
            run.iterations,
            run.effective_concurrency()
        );

        let results = aggregator
            .aggregate_all(&pairs, run.iterations, run.effective_concurrency())
            .await?;
        let rankings = rank_by_test(&results);

        Ok(BenchmarkResults {
            timestamp,
            iterations: run.iterations,
            toolchains: self.toolchains(),
            results,
            rankings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::invoker::MockInvoker;
    use pretty_assertions::assert_eq;

    fn filtered(toolchains: Option<&[&str]>, tests: Option<&[&str]>) -> HarnessConfig {
        let to_vec = |ids: &[&str]| ids.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut config = HarnessConfig::default();
        config.run.filter = FilterConfig {
            toolchains: toolchains.map(to_vec),
            tests: tests.map(to_vec),
        };
        config
    }

    #[tokio::test]
    async fn test_unknown_toolchain_filter_is_rejected() {
        let config = filtered(Some(&["rust", "zig"]), None);
        let err = Harness::new(config, MockInvoker::succeeding()).await.err();
        assert!(matches!(err, Some(HarnessError::UnknownToolchain(id)) if id == "zig"));
    }

    #[tokio::test]
    async fn test_zero_iterations_is_rejected() {
        let mock = MockInvoker::succeeding();
        let mut config = HarnessConfig::default();
        config.run.iterations = 0;

        let err = Harness::new(config, mock).await.err();
        assert!(matches!(err, Some(HarnessError::InvalidConfig(ref msg)) if msg.contains("iterations")));
    }

    #[tokio::test]
    async fn test_unknown_test_filter_is_rejected() {
        let config = filtered(None, Some(&["matrix"]));
        let err = Harness::new(config, MockInvoker::succeeding()).await.err();
        assert!(matches!(err, Some(HarnessError::UnknownTest(id)) if id == "matrix"));
    }

    #[tokio::test]
    async fn test_pairs_grouped_by_test_in_registry_order() {
        let config = filtered(Some(&["go", "rust"]), None);
        let harness = Harness::new(config, MockInvoker::new(MockInvoker::with_stdout("x 1.0")))
            .await
            .unwrap();

        let all = harness.pairs();
        let pairs: Vec<(&str, &str)> = all.iter().map(|(t, c)| (t.as_str(), c.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("rust", "fibonacci"),
                ("go", "fibonacci"),
                ("rust", "sorting"),
                ("go", "sorting"),
            ]
        );
        assert_eq!(harness.invoker().call_count(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_toolchains_are_reported() {
        let mock = MockInvoker::new(MockInvoker::exited(127, std::time::Duration::ZERO));
        let harness = Harness::new(HarnessConfig::default(), mock).await.unwrap();

        let infos = harness.toolchains();
        let ids: Vec<&str> = infos.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["ea", "rust", "cpp", "go"]);
        assert!(infos.iter().all(|i| !i.available));
    }
}
