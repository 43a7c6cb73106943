//! @ai:module:intent Cross-compiler build-time benchmarking library
//! @ai:module:layer application
//! @ai:module:public_api config, corpus, toolchain, invoker, runner, stats, aggregator, ranking, harness, report

pub mod aggregator;
pub mod config;
pub mod corpus;
pub mod error;
pub mod harness;
pub mod invoker;
pub mod ranking;
pub mod report;
pub mod runner;
pub mod stats;
pub mod toolchain;

pub use aggregator::{AggregatedResult, PairOutcome, StatisticalAggregator};
pub use config::HarnessConfig;
pub use corpus::{ProgramCorpus, TestCase};
pub use error::{HarnessError, Result};
pub use harness::{BenchmarkResults, Harness};
pub use invoker::{MockInvoker, ProcessInvoker, ProcessInvokerTrait};
pub use ranking::{rank, rank_by_test, RankedResult, TestRanking};
pub use report::ReportGenerator;
pub use runner::{BenchmarkRunner, TrialResult, TrialStatus};
pub use toolchain::{Toolchain, ToolchainInfo, ToolchainRegistry};
