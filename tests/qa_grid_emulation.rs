use std::cell::Cell;
use std::path::PathBuf;

use num_bigint::BigInt;
use weights_emulation::config::{EmulationConfig, GridConfig};
use weights_emulation::error::InvocationFailure;
use weights_emulation::formula::{NamedFormula, Ready};
use weights_emulation::grid::{Grid, TestCase};
use weights_emulation::harness::{Harness, emulate};
use weights_emulation::invoker::{FailureMatch, TestResult};
use weights_emulation::sample::uniform_distribution;

type WeightsResult = Result<Vec<BigInt>, InvocationFailure>;

fn pow10(exp: usize) -> BigInt {
    num_traits::pow(BigInt::from(10), exp)
}

/// Helper: grid where every dimension is `uniform_distribution(min, max, count)`
fn grid_of(dims: [(BigInt, BigInt, usize); 5]) -> Grid {
    let [a, b, c, d, e] = dims.map(|(min, max, count)| {
        uniform_distribution(&min, &max, count).expect("valid range")
    });
    Grid::new(a, b, c, d, e).expect("grid fits")
}

fn lines(buf: &[u8]) -> Vec<String> {
    String::from_utf8(buf.to_vec())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn qa_single_point_grid_emits_one_line() {
    let staked: BigInt = pow10(23) * 5;
    let rate = BigInt::from(500_000);
    let grid = grid_of([
        (staked.clone(), staked.clone(), 1),
        (staked.clone(), staked.clone(), 1),
        (staked.clone(), staked.clone(), 1),
        (rate.clone(), rate.clone(), 1),
        (rate.clone(), rate.clone(), 1),
    ]);
    assert_eq!(grid.total(), 1);

    // Both sides compute the same thing: rate1 / (rate1 + rate2) in ppm.
    let weights = |c: &TestCase| -> WeightsResult {
        let ppm = BigInt::from(1_000_000);
        let w1 = &c.rate1 * &ppm / (&c.rate1 + &c.rate2);
        Ok(vec![w1.clone(), ppm - w1])
    };
    let mut out = Vec::new();

    let report = emulate(
        &grid,
        Ready(NamedFormula::new("port", weights)),
        Ready(NamedFormula::new("formula", weights)),
        FailureMatch::Sentinel,
        &mut out,
    )
    .unwrap();

    assert!(report.is_equivalent());
    assert_eq!(report.executed, 1);
    assert_eq!(
        lines(&out),
        vec!["Test 1 out of 1: port = 500000,500000, formula = 500000,500000"]
    );
}

#[test]
fn qa_constant_mismatch_halts_after_first_case() {
    let grid = grid_of([
        (BigInt::from(1), BigInt::from(2), 2),
        (BigInt::from(10), BigInt::from(20), 2),
        (BigInt::from(100), BigInt::from(100), 1),
        (BigInt::from(5), BigInt::from(5), 1),
        (BigInt::from(6), BigInt::from(6), 1),
    ]);
    assert_eq!(grid.total(), 4);

    let evaluated = Cell::new(0usize);
    let candidate = NamedFormula::new("port", |_: &TestCase| -> WeightsResult {
        evaluated.set(evaluated.get() + 1);
        Ok(vec![BigInt::from(1), BigInt::from(2)])
    });
    let reference = NamedFormula::new("formula", |_: &TestCase| -> WeightsResult {
        Ok(vec![BigInt::from(1), BigInt::from(3)])
    });
    let mut out = Vec::new();

    let report = Harness::new(candidate, reference)
        .run(&grid, &mut out)
        .unwrap();

    // The three remaining cases are never evaluated.
    assert_eq!(evaluated.get(), 1);
    assert_eq!(report.executed, 1);
    assert_eq!(report.total, 4);

    assert_eq!(
        lines(&out),
        vec![
            "Test 1 out of 4: port = 1,2, formula = 1,3",
            "Emulation Error:",
            "staked1  = 1",
            "balance1 = 10",
            "balance2 = 100",
            "rate1    = 5",
            "rate2    = 6",
        ]
    );

    let divergence = report.divergence().expect("divergence expected");
    assert_eq!(divergence.case.index, 1);
    assert_eq!(divergence.candidate, TestResult::Success("1,2".into()));
    assert_eq!(divergence.reference, TestResult::Success("1,3".into()));
}

#[test]
fn qa_always_failing_candidate_halts_immediately() {
    let grid = GridConfig::default().build().unwrap();
    assert_eq!(grid.total(), 100_000);

    let candidate = NamedFormula::new("port", |_: &TestCase| -> WeightsResult {
        Err(InvocationFailure::Domain("unsupported".into()))
    });
    let reference = NamedFormula::new("formula", |_: &TestCase| -> WeightsResult {
        Ok(vec![BigInt::from(400_000), BigInt::from(600_000)])
    });

    for policy in [FailureMatch::Sentinel, FailureMatch::Strict] {
        let mut out = Vec::new();
        let report = Harness::new(&candidate, &reference)
            .with_policy(policy)
            .run(&grid, &mut out)
            .unwrap();

        assert_eq!(report.executed, 1, "policy {:?}", policy);
        let text = lines(&out);
        assert_eq!(
            text[0],
            "Test 1 out of 100000: port = -1, formula = 400000,600000"
        );
        assert_eq!(text[1], "Emulation Error:");
        assert_eq!(text[2], "staked1  = 100000000000000000000000");
        assert_eq!(text.len(), 7);
    }
}

#[test]
fn qa_panicking_candidate_is_reported_not_raised() {
    let grid = grid_of([
        (BigInt::from(0), BigInt::from(0), 1),
        (BigInt::from(1), BigInt::from(1), 1),
        (BigInt::from(1), BigInt::from(1), 1),
        (BigInt::from(1), BigInt::from(1), 1),
        (BigInt::from(1), BigInt::from(1), 1),
    ]);
    let candidate = NamedFormula::new("port", |c: &TestCase| -> WeightsResult {
        if c.staked1 == BigInt::from(0) {
            panic!("staked balance is zero");
        }
        Ok(vec![c.staked1.clone()])
    });
    let reference = NamedFormula::new("formula", |_: &TestCase| -> WeightsResult {
        Err(InvocationFailure::Revert("execution reverted".into()))
    });
    let mut out = Vec::new();

    let report = Harness::new(candidate, reference).run(&grid, &mut out).unwrap();

    // Under the sentinel policy two failures compare equal.
    assert!(report.is_equivalent());
    assert_eq!(report.both_failed, 1);
    assert_eq!(
        lines(&out),
        vec!["Test 1 out of 1: port = -1, formula = -1"]
    );
}

#[test]
fn qa_shipped_configs_parse_and_build() {
    let config_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config");

    let dev = EmulationConfig::from_file(config_dir.join("dev.yaml").to_str().unwrap())
        .expect("dev config");
    assert_eq!(dev.grid, GridConfig::default());
    assert_eq!(dev.grid.build().unwrap().total(), 100_000);
    assert_eq!(dev.reference.init_selector.as_deref(), Some("0xe1c7392a"));

    let smoke = EmulationConfig::from_file(config_dir.join("smoke.yaml").to_str().unwrap())
        .expect("smoke config");
    assert_eq!(smoke.failure_match, FailureMatch::Strict);
    let grid = smoke.grid.build().unwrap();
    assert_eq!(grid.total(), 1);
    let case = grid.iter().next().unwrap();
    assert_eq!(case.staked1, pow10(23) * 5);
    assert_eq!(case.rate2, BigInt::from(500_000));
}
