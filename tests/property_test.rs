// ==========================================
// 属性测试 (proptest)
// ==========================================
// 覆盖: 单位装药量单调性 / 装药柱守恒 / 总量恒等 /
//       环路报告 / 时序确定性与最短到达
// ==========================================


use blast_design_engine::domain::{DrillPoint, ExplosiveMaterial};
use blast_design_engine::engine::error::{CalcError, GeometryError};
use blast_design_engine::engine::{per_meter, ChargeCalculator, InitiationNetwork, Sequencer};
use proptest::prelude::*;
use test_helpers::*;

fn chain_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("H{:02}", i)).collect()
}

fn chain_points(n: usize) -> Vec<DrillPoint> {
    chain_ids(n)
        .iter()
        .enumerate()
        .map(|(i, id)| hole(id, i as f64 * 3.0, 0.0, 10.0))
        .collect()
}

proptest! {
    #[test]
    fn prop_per_meter_monotonic(
        d in 0.05f64..0.5,
        dd in 0.001f64..0.1,
        rho in 0.5f64..2.0,
        drho in 0.01f64..1.0,
    ) {
        prop_assert!(per_meter(d + dd, rho) > per_meter(d, rho));
        prop_assert!(per_meter(d, rho + drho) > per_meter(d, rho));
    }

    #[test]
    fn prop_column_partition_and_totals(
        depths in prop::collection::vec(4.0f64..30.0, 1..20),
        stemming in 0.5f64..3.5,
        quota in 0.0f64..200.0,
    ) {
        let points: Vec<DrillPoint> = depths
            .iter()
            .enumerate()
            .map(|(i, d)| hole(&format!("P{:03}", i), i as f64 * 3.0, 0.0, *d).with_stemming(stemming))
            .collect();
        let material = ExplosiveMaterial { emulsion_per_hole: quota, ..test_material() };

        let result = ChargeCalculator::default().compute(&points, &material, &test_pattern()).unwrap();

        for h in &result.holes {
            prop_assert_eq!(h.chargeable_length, h.depth - stemming);
            prop_assert!((h.emulsion_covering_space + h.remaining_space - h.chargeable_length).abs() <= 1e-9);
            prop_assert!(h.emulsion_covering_space >= 0.0 && h.remaining_space >= 0.0);
            prop_assert!(h.stemming + h.emulsion_covering_space + h.remaining_space <= h.depth + 1e-9);
        }
        prop_assert_eq!(result.total_explosive, result.total_anfo + result.total_emulsion);
        prop_assert_eq!(result.number_of_filled_holes, points.len());
    }

    #[test]
    fn prop_non_positive_chargeable_length_fails(depth in 0.5f64..5.0, extra in 0.0f64..3.0) {
        let points = vec![hole("A", 0.0, 0.0, depth).with_stemming(depth + extra)];
        let err = ChargeCalculator::default()
            .compute(&points, &test_material(), &test_pattern())
            .unwrap_err();
        let is_non_positive = matches!(
            err,
            CalcError::InvalidGeometry(GeometryError::NonPositiveChargeableLength { .. })
        );
        prop_assert!(is_non_positive);
    }

    #[test]
    fn prop_closing_edge_reports_exact_cycle(n in 2usize..12, delay in 0u32..100) {
        let ids = chain_ids(n);
        let mut network = InitiationNetwork::from_points(test_scope(), &chain_points(n)).unwrap();
        for pair in ids.windows(2) {
            network.add_connector(&pair[0], &pair[1], delay, 0).unwrap();
        }
        prop_assert!(network.detect_cycles().is_ok());

        network.add_connector(&ids[n - 1], &ids[0], delay, 0).unwrap();
        let mut expected = ids.clone();
        expected.push(ids[0].clone());
        prop_assert_eq!(network.detect_cycles().unwrap_err().cycle, expected);
    }

    #[test]
    fn prop_schedule_deterministic_and_tight(
        n in 2usize..16,
        chain_delays in prop::collection::vec(0u32..200, 15),
        extra in prop::collection::vec((0usize..16, 0usize..16, 0u32..200, -3i32..3), 0..30),
    ) {
        let ids = chain_ids(n);
        let mut network = InitiationNetwork::from_points(test_scope(), &chain_points(n)).unwrap();
        for (i, pair) in ids.windows(2).enumerate() {
            network.add_connector(&pair[0], &pair[1], chain_delays[i], 0).unwrap();
        }
        // 只加前向边, 保证无环
        for (a, b, delay, seq) in extra {
            let (a, b) = (a % n, b % n);
            if a < b {
                let _ = network.add_connector(&ids[a], &ids[b], delay, seq);
            }
        }

        let sources = vec![ids[0].clone()];
        let first = Sequencer::compute_schedule(&network, &sources).unwrap();
        let second = Sequencer::compute_schedule(&network, &sources).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), n);

        // 任一连接都不能让目标孔更早
        for c in network.active_connectors() {
            let from = first.time_of(&c.from).unwrap();
            let to = first.time_of(&c.to).unwrap();
            prop_assert!(to <= from + u64::from(c.delay_ms));
        }
        // 起爆顺序按时刻非降
        let times: Vec<u64> = first.firing_order.iter().map(|h| first.time_of(h).unwrap()).collect();
        prop_assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }
}
