//! Pricing benchmarks

use cowguard_actuary::{PremiumCalculator, RiskScorer};
use cowguard_common::{CoverageType, LifecycleStage, RiskFactors};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

fn sample_factors() -> RiskFactors {
    RiskFactors {
        historical_claim_rate: 0.08,
        volatility: 0.35,
        liquidity: 62.0,
        market_cap: 750_000.0,
        trading_volume: 48_000.0,
        audit_score: 70.0,
        holder_distribution: 55.0,
        team_verification: 0.5,
        contract_complexity: 40.0,
        total_policies: 800,
        total_claims: 64,
        ..Default::default()
    }
}

fn bench_risk_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("risk_score");
    let factors = sample_factors();

    for ct in CoverageType::ALL {
        group.bench_with_input(BenchmarkId::new("coverage", ct), &ct, |b, &ct| {
            b.iter(|| RiskScorer::score(black_box(ct), black_box(&factors), false));
        });
    }

    group.finish();
}

fn bench_premium(c: &mut Criterion) {
    let mut group = c.benchmark_group("premium");
    group.measurement_time(Duration::from_secs(5));

    let calc = PremiumCalculator::default();
    let factors = sample_factors();

    for (label, stage, launch) in [
        ("standard", LifecycleStage::Standard, false),
        ("launch", LifecycleStage::LaunchPhase, true),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| {
                calc.calculate(
                    black_box(CoverageType::Comprehensive),
                    black_box(&factors),
                    stage,
                    launch,
                )
            });
        });
    }

    group.bench_function("premium_for_coverage", |b| {
        let result = calc
            .calculate(CoverageType::RugPull, &factors, LifecycleStage::Standard, false)
            .expect("valid factors");
        b.iter(|| result.premium_for(black_box(25_000_000_000)));
    });

    group.finish();
}

criterion_group!(benches, bench_risk_score, bench_premium);
criterion_main!(benches);
