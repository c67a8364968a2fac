#![allow(clippy::exit)]

use anyhow::Result;
use ballot_suite::run::run_case;
use ballot_suite::scaffold::AshComputeExecutor;
use ballot_suite::{CaseError, HarnessConfig, build_ballot_mask_tree};
use std::sync::Arc;
use std::{env, process};
use tester::{
    ColorConfig, DynTestName, OutputFormat, RunIgnored, ShouldPanic, TestDesc, TestDescAndFn,
    TestFn, TestType, run_tests_console,
    test::{TestOpts, parse_opts},
};
use tracing_subscriber::FmtSubscriber;

const CONFIG_ENV: &str = "BALLOT_SUITE_CONFIG";

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global subscriber");

    let args: Vec<String> = env::args().collect();
    let opts: TestOpts = match parse_opts(&args) {
        Some(Ok(o)) => TestOpts {
            test_threads: Some(1),
            ..o
        },
        Some(Err(e)) => {
            eprintln!("Error parsing test options: {e}");
            process::exit(1);
        }
        None => TestOpts {
            list: false,
            filters: vec![],
            filter_exact: false,
            force_run_in_process: false,
            exclude_should_panic: false,
            run_ignored: RunIgnored::No,
            run_tests: true,
            bench_benchmarks: false,
            logfile: None,
            nocapture: false,
            color: ColorConfig::AutoColor,
            format: OutputFormat::Pretty,
            test_threads: Some(1),
            skip: vec![],
            time_options: None,
            options: tester::Options {
                display_output: true,
                panic_abort: true,
            },
        },
    };

    let config = match env::var_os(CONFIG_ENV) {
        Some(path) => HarnessConfig::from_path(&path)?,
        None => HarnessConfig::default(),
    };
    tracing::debug!(?config, "runner configuration");

    let cases = build_ballot_mask_tree(config.registry()).flatten();
    if cases.is_empty() {
        eprintln!("No test cases enumerated");
        process::exit(1);
    }

    // One device and executor shared by every case. When no usable device
    // exists, every case reports as skipped instead of failing the run.
    let executor: Option<Arc<AshComputeExecutor>> =
        match AshComputeExecutor::init(config.device_index) {
            Ok(executor) => {
                tracing::info!(device = %executor.profile().device_name, "initialized executor");
                Some(Arc::new(executor))
            }
            Err(e) => {
                tracing::warn!("no usable Vulkan device, skipping all cases: {e:#}");
                None
            }
        };

    let tests: Vec<TestDescAndFn> = cases
        .into_iter()
        .map(|flat| TestDescAndFn {
            desc: TestDesc {
                name: DynTestName(flat.full_name.clone()),
                ignore: false,
                should_panic: ShouldPanic::No,
                allow_fail: false,
                test_type: TestType::IntegrationTest,
            },
            testfn: TestFn::DynTestFn(Box::new({
                let executor = executor.clone();
                move || {
                    let Some(executor) = executor else {
                        tracing::warn!("skipped: no Vulkan device");
                        return;
                    };
                    let profile = executor.profile().clone();
                    match run_case(executor.as_ref(), &profile, &flat.case) {
                        Ok(()) => {}
                        Err(CaseError::NotSupported(reason)) => {
                            tracing::warn!("skipped: {reason}");
                        }
                        Err(e) => panic!("{e}"),
                    }
                }
            })),
        })
        .collect();

    // Filters written with '/' separators address tree paths; the test names
    // use '::', so rewrite them.
    let opts = if opts.filters.iter().any(|f| f.contains('/')) {
        let mut new_opts = opts;
        new_opts.filters = new_opts
            .filters
            .into_iter()
            .map(|filter| {
                if filter.contains('/') {
                    filter.replace('/', "::")
                } else {
                    filter
                }
            })
            .collect();
        new_opts
    } else {
        opts
    };

    let passed = run_tests_console(&opts, tests).expect("Failed to run tests");

    process::exit(if passed { 0 } else { 1 });
}
