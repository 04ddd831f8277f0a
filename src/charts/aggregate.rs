use std::collections::{BTreeMap, BTreeSet};

use crate::color::{ColorMap, LegendEntry};
use crate::data::filter::{filter_records, Selection};
use crate::data::model::{Dataset, Record};

use super::binning::{value_range, EqualWidthBins};
use super::stats::mean;
use super::{
    AnimatedPoint, AnimatedScatterChart, AnimationFrame, Bar, BarChart, BoxChart, BoxGroup,
    ChartMeta, ChartResult, ChartSet, DerivationFailure, HeatmapChart, HistogramChart,
    HistogramSeries, LineChart, LinePoint, LineSeries, PieChart, PieSlice, PlaceholderReason,
    ScatterChart, ScatterPoint,
};

pub const HISTOGRAM_BINS: usize = 20;
pub const HEATMAP_BINS: usize = 6;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Filter `dataset` by `selection` and derive all eight charts.
///
/// Never fails: an empty selection or an empty filtered set yields eight
/// placeholders, and a chart that cannot be derived becomes a placeholder on
/// its own while the others are still built.
pub fn compute(dataset: &Dataset, selection: &Selection) -> ChartSet {
    if selection.is_empty() {
        log::debug!("empty selection, every slot gets the placeholder");
        return ChartSet::placeholder(PlaceholderReason::NoSelection);
    }
    let filtered = filter_records(dataset, selection);
    if filtered.is_empty() {
        log::debug!("selection {selection:?} matches no records");
        return ChartSet::placeholder(PlaceholderReason::NoMatchingRecords);
    }
    log::debug!(
        "computing charts for {} of {} records",
        filtered.len(),
        dataset.len()
    );

    // Palette over every group in the dataset so colours survive reselection.
    let colors = ColorMap::new(dataset.groups());

    ChartSet {
        scatter: ChartResult::Scatter(scatter(&filtered, &colors)),
        pie: ChartResult::Pie(pie(&filtered, &colors)),
        bar: ChartResult::Bar(bar(&filtered)),
        histogram: isolate(
            "histogram",
            histogram(&filtered, &colors).map(ChartResult::Histogram),
        ),
        box_plot: ChartResult::Box(box_plot(&filtered)),
        heatmap: isolate("heatmap", heatmap(&filtered).map(ChartResult::Heatmap)),
        line: ChartResult::Line(line(&filtered, &colors)),
        animated_scatter: isolate(
            "animated-scatter",
            animated_scatter(&filtered, &colors).map(ChartResult::AnimatedScatter),
        ),
    }
}

/// Turn a failed derivation into this slot's placeholder.
fn isolate(slot: &str, result: Result<ChartResult, DerivationFailure>) -> ChartResult {
    result.unwrap_or_else(|err| {
        log::warn!("{slot}: {err}; showing placeholder");
        ChartResult::placeholder(PlaceholderReason::DerivationFailed {
            message: err.to_string(),
        })
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bucket records by a label, keys sorted, record order kept within buckets.
fn group_by<'a>(
    records: &[&'a Record],
    key: impl Fn(&'a Record) -> &'a str,
) -> BTreeMap<&'a str, Vec<&'a Record>> {
    let mut buckets: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for &rec in records {
        buckets.entry(key(rec)).or_default().push(rec);
    }
    buckets
}

/// Legend rows for the groups present in `records`.
fn group_legend(records: &[&Record], colors: &ColorMap) -> Vec<LegendEntry> {
    let present: BTreeSet<&String> = records.iter().map(|r| &r.group).collect();
    colors.legend_for(present)
}

// ---------------------------------------------------------------------------
// R1 – R8
// ---------------------------------------------------------------------------

fn scatter(records: &[&Record], colors: &ColorMap) -> ScatterChart {
    ScatterChart {
        meta: ChartMeta::new("Hemoglobin vs Ferritin", "Ferritin", "Hemoglobin"),
        legend: group_legend(records, colors),
        points: records
            .iter()
            .map(|r| ScatterPoint {
                id: r.id.clone(),
                group: r.group.clone(),
                ferritin: r.ferritin,
                hemoglobin: r.hemoglobin,
            })
            .collect(),
    }
}

fn pie(records: &[&Record], colors: &ColorMap) -> PieChart {
    let total = records.len();
    let slices = group_by(records, |r| r.group.as_str())
        .into_iter()
        .map(|(group, members)| PieSlice {
            group: group.to_string(),
            color: colors.color_for(group).to_string(),
            count: members.len(),
            proportion: members.len() as f64 / total as f64,
        })
        .collect();

    PieChart {
        meta: ChartMeta::new("Distribution by group", "Group", "Records"),
        total,
        slices,
    }
}

fn bar(records: &[&Record]) -> BarChart {
    let bars = group_by(records, |r| r.group.as_str())
        .into_iter()
        .filter_map(|(group, members)| {
            let values: Vec<f64> = members.iter().map(|r| r.hemoglobin).collect();
            mean(&values).map(|mean| Bar {
                group: group.to_string(),
                mean,
            })
        })
        .collect();

    BarChart {
        meta: ChartMeta::new("Mean hemoglobin by group", "Group", "Hemoglobin"),
        bars,
    }
}

fn histogram(
    records: &[&Record],
    colors: &ColorMap,
) -> Result<HistogramChart, DerivationFailure> {
    let bins = EqualWidthBins::spanning_or_widened(
        "Protein",
        records.iter().map(|r| r.protein),
        HISTOGRAM_BINS,
    )?;

    let series = group_by(records, |r| r.group.as_str())
        .into_iter()
        .map(|(group, members)| {
            let mut counts = vec![0usize; bins.count()];
            for rec in members {
                if let Some(i) = bins.index_of(rec.protein) {
                    counts[i] += 1;
                }
            }
            HistogramSeries {
                group: group.to_string(),
                counts,
            }
        })
        .collect();

    Ok(HistogramChart {
        meta: ChartMeta::new("Total protein distribution", "Protein", "Count"),
        legend: group_legend(records, colors),
        edges: bins.edges(),
        series,
    })
}

fn box_plot(records: &[&Record]) -> BoxChart {
    let by_sex = group_by(records, |r| r.sex.as_str());
    let sexes: Vec<String> = by_sex.keys().map(|s| s.to_string()).collect();
    let legend = ColorMap::new(&sexes).legend_for(&sexes);

    BoxChart {
        meta: ChartMeta::new("Ferritin distribution by sex", "Sex", "Ferritin"),
        legend,
        groups: by_sex
            .into_iter()
            .map(|(sex, members)| BoxGroup {
                sex: sex.to_string(),
                values: members.iter().map(|r| r.ferritin).collect(),
            })
            .collect(),
    }
}

fn heatmap(records: &[&Record]) -> Result<HeatmapChart, DerivationFailure> {
    let hb_bins = EqualWidthBins::spanning(
        "Hemoglobin",
        records.iter().map(|r| r.hemoglobin),
        HEATMAP_BINS,
    )?;
    let protein_bins = EqualWidthBins::spanning(
        "Protein",
        records.iter().map(|r| r.protein),
        HEATMAP_BINS,
    )?;

    // (sum, count) per cell
    let mut acc = vec![vec![(0.0f64, 0usize); protein_bins.count()]; hb_bins.count()];
    for rec in records {
        if let (Some(row), Some(col)) = (
            hb_bins.index_of(rec.hemoglobin),
            protein_bins.index_of(rec.protein),
        ) {
            let cell = &mut acc[row][col];
            cell.0 += rec.self_rated_health;
            cell.1 += 1;
        }
    }

    let cells: Vec<Vec<Option<f64>>> = acc
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(sum, n)| (n > 0).then(|| sum / n as f64))
                .collect()
        })
        .collect();
    let value_range = value_range("SelfRatedHealth", cells.iter().flatten().flatten().copied())?;

    Ok(HeatmapChart {
        meta: ChartMeta::new(
            "Self-rated health by protein and hemoglobin",
            "Protein",
            "Hemoglobin",
        ),
        color_label: "Self-rated health".to_string(),
        hemoglobin_bins: hb_bins.bins(),
        protein_bins: protein_bins.bins(),
        cells,
        value_range,
    })
}

fn line(records: &[&Record], colors: &ColorMap) -> LineChart {
    let mut by_date = records.to_vec();
    // stable: equal dates keep dataset order
    by_date.sort_by_key(|r| r.exam_date);

    let series = group_by(&by_date, |r| r.group.as_str())
        .into_iter()
        .map(|(group, members)| LineSeries {
            group: group.to_string(),
            points: members
                .iter()
                .map(|r| LinePoint {
                    id: r.id.clone(),
                    exam_date: r.exam_date,
                    heart_rate: r.heart_rate,
                })
                .collect(),
        })
        .collect();

    LineChart {
        meta: ChartMeta::new("Heart rate by exam date", "Exam date", "Heart rate"),
        legend: group_legend(records, colors),
        series,
    }
}

fn animated_scatter(
    records: &[&Record],
    colors: &ColorMap,
) -> Result<AnimatedScatterChart, DerivationFailure> {
    let x_range = value_range("Ferritin", records.iter().map(|r| r.ferritin))?;
    let y_range = value_range("Hemoglobin", records.iter().map(|r| r.hemoglobin))?;
    if let Some(rec) = records.iter().find(|r| r.heart_rate < 0.0) {
        return Err(DerivationFailure::NegativeMarkerSize {
            id: rec.id.clone(),
            field: "HeartRate",
            value: rec.heart_rate,
        });
    }

    let mut ages: Vec<f64> = records.iter().map(|r| r.age).collect();
    ages.sort_by(f64::total_cmp);
    ages.dedup();

    let frames = ages
        .into_iter()
        .map(|age| AnimationFrame {
            age,
            points: records
                .iter()
                .filter(|r| r.age == age)
                .map(|r| AnimatedPoint {
                    id: r.id.clone(),
                    group: r.group.clone(),
                    ferritin: r.ferritin,
                    hemoglobin: r.hemoglobin,
                    heart_rate: r.heart_rate,
                })
                .collect(),
        })
        .collect();

    Ok(AnimatedScatterChart {
        meta: ChartMeta::new(
            "Animation: hemoglobin vs ferritin by age",
            "Ferritin",
            "Hemoglobin",
        ),
        legend: group_legend(records, colors),
        frame_label: "Age".to_string(),
        size_label: "Heart rate".to_string(),
        x_range,
        y_range,
        frames,
    })
}
