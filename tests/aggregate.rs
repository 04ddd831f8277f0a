use approx::assert_abs_diff_eq;
use chrono::NaiveDate;

use meddash::charts::{compute, ChartResult, ChartSet, PlaceholderReason, SLOT_IDS};
use meddash::data::filter::Selection;
use meddash::data::model::{Dataset, Record};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[allow(clippy::too_many_arguments)]
fn rec(
    id: &str,
    group: &str,
    sex: &str,
    age: f64,
    hb: f64,
    fer: f64,
    protein: f64,
    srh: f64,
) -> Record {
    Record {
        id: id.to_string(),
        group: group.to_string(),
        sex: sex.to_string(),
        age,
        exam_date: date(2024, 1, 1),
        hemoglobin: hb,
        ferritin: fer,
        protein,
        heart_rate: 70.0,
        self_rated_health: srh,
    }
}

fn sel(groups: &[&str]) -> Selection {
    groups.iter().map(|g| g.to_string()).collect()
}

fn sample() -> Dataset {
    Dataset::from_records(vec![
        rec("1", "A", "F", 30.0, 120.0, 40.0, 60.0, 4.0),
        rec("2", "A", "M", 45.0, 140.0, 90.0, 75.0, 7.0),
        rec("3", "B", "F", 30.0, 130.0, 20.0, 80.0, 6.0),
        rec("4", "C", "M", 60.0, 150.0, 120.0, 68.0, 8.0),
        rec("5", "B", "M", 45.0, 110.0, 60.0, 72.0, 3.0),
    ])
    .unwrap()
}

#[test]
fn empty_selection_yields_eight_placeholders() {
    let charts = compute(&sample(), &Selection::new());
    assert_eq!(charts, ChartSet::placeholder(PlaceholderReason::NoSelection));
    let all = charts.into_array();
    assert!(all.iter().all(|c| c == &all[0]));
    assert!(all[0].is_placeholder());
}

#[test]
fn unmatched_selection_yields_eight_placeholders() {
    let charts = compute(&sample(), &sel(&["Z"]));
    assert_eq!(
        charts,
        ChartSet::placeholder(PlaceholderReason::NoMatchingRecords)
    );

    assert!(charts
        .slots()
        .iter()
        .all(|(_, chart)| chart.title() == "No data to display"));

    let empty = Dataset::from_records(Vec::new()).unwrap();
    assert!(compute(&empty, &sel(&["A"])).all_placeholders());
}

#[test]
fn compute_is_idempotent() {
    let ds = sample();
    let s = sel(&["A", "B", "C"]);
    assert_eq!(compute(&ds, &s), compute(&ds, &s));
}

#[test]
fn slots_come_in_dashboard_order() {
    let charts = compute(&sample(), &sel(&["A", "B", "C"]));
    let slots = charts.slots();
    let ids: Vec<_> = slots.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, SLOT_IDS.to_vec());
    assert!(matches!(slots[0].1, ChartResult::Scatter(_)));
    assert!(matches!(slots[1].1, ChartResult::Pie(_)));
    assert!(matches!(slots[2].1, ChartResult::Bar(_)));
    assert!(matches!(slots[3].1, ChartResult::Histogram(_)));
    assert!(matches!(slots[4].1, ChartResult::Box(_)));
    assert!(matches!(slots[5].1, ChartResult::Heatmap(_)));
    assert!(matches!(slots[6].1, ChartResult::Line(_)));
    assert!(matches!(slots[7].1, ChartResult::AnimatedScatter(_)));
    assert_eq!(slots[0].1.title(), "Hemoglobin vs Ferritin");
}

#[test]
fn scatter_keeps_one_point_per_record() {
    let charts = compute(&sample(), &sel(&["A", "C"]));
    let ChartResult::Scatter(scatter) = charts.scatter else {
        panic!("expected scatter");
    };
    let ids: Vec<_> = scatter.points.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "4"]);
    assert_eq!(scatter.points[1].ferritin, 90.0);
    assert_eq!(scatter.points[1].hemoglobin, 140.0);
    assert_eq!(scatter.legend.len(), 2);
}

#[test]
fn pie_proportions_sum_to_one() {
    let charts = compute(&sample(), &sel(&["A", "B", "C"]));
    let ChartResult::Pie(pie) = charts.pie else {
        panic!("expected pie");
    };
    assert_eq!(pie.total, 5);
    let sum: f64 = pie.slices.iter().map(|s| s.proportion).sum();
    assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
    let counts: Vec<_> = pie.slices.iter().map(|s| (s.group.as_str(), s.count)).collect();
    assert_eq!(counts, vec![("A", 2), ("B", 2), ("C", 1)]);
}

#[test]
fn bar_mean_of_single_group() {
    let ds = Dataset::from_records(vec![
        rec("1", "G", "F", 30.0, 10.0, 1.0, 1.0, 1.0),
        rec("2", "G", "F", 31.0, 20.0, 2.0, 2.0, 2.0),
        rec("3", "G", "M", 32.0, 30.0, 3.0, 3.0, 3.0),
    ])
    .unwrap();
    let ChartResult::Bar(bar) = compute(&ds, &sel(&["G"])).bar else {
        panic!("expected bar");
    };
    assert_eq!(bar.bars.len(), 1);
    assert_eq!(bar.bars[0].group, "G");
    assert_abs_diff_eq!(bar.bars[0].mean, 20.0, epsilon = 1e-12);
}

#[test]
fn three_record_scenario_filters_to_selected_group() {
    let ds = Dataset::from_records(vec![
        rec("1", "A", "F", 30.0, 100.0, 10.0, 60.0, 5.0),
        rec("2", "A", "M", 40.0, 120.0, 20.0, 70.0, 6.0),
        rec("3", "B", "F", 50.0, 200.0, 30.0, 80.0, 7.0),
    ])
    .unwrap();
    let charts = compute(&ds, &sel(&["A"]));

    let ChartResult::Pie(pie) = &charts.pie else {
        panic!("expected pie");
    };
    assert_eq!(pie.total, 2);
    assert_eq!(pie.slices.len(), 1);
    assert_eq!(pie.slices[0].group, "A");
    assert_abs_diff_eq!(pie.slices[0].proportion, 1.0);

    let ChartResult::Bar(bar) = &charts.bar else {
        panic!("expected bar");
    };
    assert_eq!(bar.bars.len(), 1);
    assert_abs_diff_eq!(bar.bars[0].mean, 110.0, epsilon = 1e-12);
}

#[test]
fn histogram_edges_span_protein_range() {
    let charts = compute(&sample(), &sel(&["A", "B", "C"]));
    let ChartResult::Histogram(hist) = charts.histogram else {
        panic!("expected histogram");
    };
    assert_eq!(hist.edges.len(), 21);
    assert_eq!(hist.edges[0], 60.0);
    assert_eq!(hist.edges[20], 80.0);

    // record 1 holds the min protein (group A), record 3 the max (group B)
    let a = hist.series.iter().find(|s| s.group == "A").unwrap();
    let b = hist.series.iter().find(|s| s.group == "B").unwrap();
    assert_eq!(a.counts[0], 1);
    assert_eq!(b.counts[19], 1);

    let total: usize = hist.series.iter().flat_map(|s| s.counts.iter()).sum();
    assert_eq!(total, 5);
}

#[test]
fn single_protein_value_still_gets_a_histogram() {
    let ds = Dataset::from_records(vec![rec("1", "A", "F", 30.0, 120.0, 40.0, 70.0, 5.0)]).unwrap();
    let ChartResult::Histogram(hist) = compute(&ds, &sel(&["A"])).histogram else {
        panic!("expected histogram");
    };
    assert_eq!(hist.edges[0], 69.5);
    assert_eq!(hist.edges[20], 70.5);
    assert_eq!(hist.series[0].counts.iter().sum::<usize>(), 1);
}

#[test]
fn box_groups_ferritin_by_sex() {
    let charts = compute(&sample(), &sel(&["A", "B", "C"]));
    let ChartResult::Box(boxes) = charts.box_plot else {
        panic!("expected box");
    };
    let sexes: Vec<_> = boxes.groups.iter().map(|g| g.sex.as_str()).collect();
    assert_eq!(sexes, vec!["F", "M"]);
    assert_eq!(boxes.groups[0].values, vec![40.0, 20.0]);
    assert_eq!(boxes.groups[1].values, vec![90.0, 120.0, 60.0]);

    let summary = boxes.groups[1].summary().unwrap();
    assert_eq!(summary.median, 90.0);
}

#[test]
fn heatmap_cells_hold_means_and_empty_cells_are_absent() {
    let charts = compute(&sample(), &sel(&["A", "B", "C"]));
    let ChartResult::Heatmap(heat) = charts.heatmap else {
        panic!("expected heatmap");
    };
    assert_eq!(heat.hemoglobin_bins.len(), 6);
    assert_eq!(heat.protein_bins.len(), 6);
    assert_eq!(heat.cells.len(), 6);
    assert!(heat.cells.iter().all(|row| row.len() == 6));
    assert!(heat.populated_cells() <= 36);
    assert_eq!(heat.populated_cells(), 5);
    assert!(heat
        .cells
        .iter()
        .flatten()
        .flatten()
        .all(|v| *v != 0.0));

    // hb 110 (min) / protein 72 → row 0; hb 150 (max) / protein 68 → row 5
    let protein_col = |p: f64| {
        heat.protein_bins
            .iter()
            .position(|b| p >= b.lower && (p < b.upper || b.upper == 80.0))
            .unwrap()
    };
    assert_eq!(heat.cells[0][protein_col(72.0)], Some(3.0));
    assert_eq!(heat.cells[5][protein_col(68.0)], Some(8.0));
    assert_eq!(heat.value_range, [3.0, 8.0]);
}

#[test]
fn heatmap_averages_records_sharing_a_cell() {
    let ds = Dataset::from_records(vec![
        rec("1", "A", "F", 30.0, 100.0, 10.0, 50.0, 2.0),
        rec("2", "A", "F", 30.0, 100.5, 10.0, 50.5, 6.0),
        rec("3", "A", "F", 30.0, 160.0, 10.0, 90.0, 9.0),
    ])
    .unwrap();
    let ChartResult::Heatmap(heat) = compute(&ds, &sel(&["A"])).heatmap else {
        panic!("expected heatmap");
    };
    assert_eq!(heat.cells[0][0], Some(4.0));
    assert_eq!(heat.cells[5][5], Some(9.0));
    assert_eq!(heat.cells[0][5], None);
    assert_eq!(heat.populated_cells(), 2);
}

#[test]
fn degenerate_heatmap_falls_back_alone() {
    // every record has the same hemoglobin
    let ds = Dataset::from_records(vec![
        rec("1", "A", "F", 30.0, 130.0, 10.0, 60.0, 2.0),
        rec("2", "A", "M", 35.0, 130.0, 30.0, 70.0, 6.0),
    ])
    .unwrap();
    let charts = compute(&ds, &sel(&["A"]));
    match &charts.heatmap {
        ChartResult::NoData(p) => assert!(matches!(
            p.reason,
            PlaceholderReason::DerivationFailed { .. }
        )),
        other => panic!("expected placeholder, got {other:?}"),
    }
    for (slot, result) in charts.slots() {
        if slot != "heatmap" {
            assert!(!result.is_placeholder(), "{slot} should still render");
        }
    }
}

#[test]
fn line_orders_by_date_and_is_stable() {
    let mut r1 = rec("1", "A", "F", 30.0, 120.0, 40.0, 60.0, 4.0);
    r1.exam_date = date(2024, 3, 1);
    let mut r2 = rec("2", "A", "F", 30.0, 120.0, 40.0, 61.0, 4.0);
    r2.exam_date = date(2024, 1, 1);
    let mut r3 = rec("3", "A", "F", 30.0, 120.0, 40.0, 62.0, 4.0);
    r3.exam_date = date(2024, 3, 1);
    let mut r4 = rec("4", "A", "F", 30.0, 120.0, 40.0, 63.0, 4.0);
    r4.exam_date = date(2024, 2, 1);
    let mut r5 = rec("5", "B", "F", 30.0, 120.0, 40.0, 64.0, 4.0);
    r5.exam_date = date(2023, 12, 1);

    let ds = Dataset::from_records(vec![r1, r2, r3, r4, r5]).unwrap();
    let ChartResult::Line(line) = compute(&ds, &sel(&["A", "B"])).line else {
        panic!("expected line");
    };
    assert_eq!(line.series.len(), 2);
    let a_ids: Vec<_> = line.series[0].points.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(a_ids, vec!["2", "4", "1", "3"]);
    assert!(line.series[0]
        .points
        .windows(2)
        .all(|w| w[0].exam_date <= w[1].exam_date));
    assert_eq!(line.series[1].group, "B");
}

#[test]
fn animated_ranges_are_fixed_across_frames() {
    let ds = sample();
    let ChartResult::AnimatedScatter(anim) = compute(&ds, &sel(&["A", "B", "C"])).animated_scatter
    else {
        panic!("expected animated scatter");
    };
    assert_eq!(anim.x_range, [20.0, 120.0]);
    assert_eq!(anim.y_range, [110.0, 150.0]);

    let ages: Vec<_> = anim.frames.iter().map(|f| f.age).collect();
    assert_eq!(ages, vec![30.0, 45.0, 60.0]);
    let frame_30: Vec<_> = anim.frames[0].points.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(frame_30, vec!["1", "3"]);

    for frame in &anim.frames {
        for p in &frame.points {
            assert!(p.ferritin >= anim.x_range[0] && p.ferritin <= anim.x_range[1]);
            assert!(p.hemoglobin >= anim.y_range[0] && p.hemoglobin <= anim.y_range[1]);
        }
    }
    let points: usize = anim.frames.iter().map(|f| f.points.len()).sum();
    assert_eq!(points, 5);
}

#[test]
fn group_colours_do_not_depend_on_selection() {
    let ds = sample();
    let ChartResult::Scatter(all) = compute(&ds, &sel(&["A", "B", "C"])).scatter else {
        panic!("expected scatter");
    };
    let ChartResult::Scatter(only_c) = compute(&ds, &sel(&["C"])).scatter else {
        panic!("expected scatter");
    };
    let c_all = all.legend.iter().find(|e| e.label == "C").unwrap();
    assert_eq!(only_c.legend, vec![c_all.clone()]);
}

#[test]
fn descriptors_serialise_with_kind_tags() {
    let charts = compute(&sample(), &sel(&["A"]));
    let json = serde_json::to_value(&charts).unwrap();
    assert_eq!(json["scatter"]["kind"], "scatter");
    assert_eq!(json["animated_scatter"]["kind"], "animated_scatter");
    assert_eq!(json["line"]["series"][0]["points"][0]["exam_date"], "2024-01-01");

    let empty = serde_json::to_value(compute(&sample(), &Selection::new())).unwrap();
    assert_eq!(empty["pie"]["kind"], "no_data");
    assert_eq!(empty["pie"]["reason"], "no_selection");
    assert_eq!(empty["pie"]["title"], "No data to display");
}
