//! Chart descriptors and the aggregation that produces them.
//!
//! [`compute`] turns a [`Dataset`](crate::data::model::Dataset) and a
//! [`Selection`](crate::data::filter::Selection) into a [`ChartSet`]: eight
//! chart-ready tables in fixed dashboard order. Drawing them is the job of
//! whatever presentation layer consumes the descriptors.

pub mod aggregate;
pub mod binning;
pub mod stats;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::color::LegendEntry;
use binning::Bin;
use stats::FiveNumberSummary;

pub use aggregate::compute;

pub const PLACEHOLDER_TITLE: &str = "No data to display";

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// Why a single derived chart could not be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DerivationFailure {
    #[error("no {field} values to bin")]
    Empty { field: &'static str },

    #[error("{field} contains a non-finite value")]
    NonFinite { field: &'static str },

    #[error("{field} range is degenerate (min == max == {value})")]
    DegenerateRange { field: &'static str, value: f64 },

    #[error("cannot split a range into zero bins")]
    ZeroBins,

    #[error("record {id}: negative {field} {value} cannot size a marker")]
    NegativeMarkerSize {
        id: String,
        field: &'static str,
        value: f64,
    },
}

// ---------------------------------------------------------------------------
// Shared descriptor pieces
// ---------------------------------------------------------------------------

/// Display metadata every chart carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartMeta {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl ChartMeta {
    fn new(title: &str, x_label: &str, y_label: &str) -> Self {
        ChartMeta {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
        }
    }
}

/// Why a slot shows the placeholder instead of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PlaceholderReason {
    /// No group is selected.
    NoSelection,
    /// Groups are selected but none of them has records.
    NoMatchingRecords,
    /// This one chart could not be derived; the others are unaffected.
    DerivationFailed { message: String },
}

/// The designated empty chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placeholder {
    pub title: String,
    #[serde(flatten)]
    pub reason: PlaceholderReason,
}

impl Placeholder {
    pub fn new(reason: PlaceholderReason) -> Self {
        Placeholder {
            title: PLACEHOLDER_TITLE.to_string(),
            reason,
        }
    }
}

// ---------------------------------------------------------------------------
// The eight chart shapes
// ---------------------------------------------------------------------------

/// R1: one point per record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterChart {
    pub meta: ChartMeta,
    pub legend: Vec<LegendEntry>,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub id: String,
    pub group: String,
    pub ferritin: f64,
    pub hemoglobin: f64,
}

/// R2: share of records per group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieChart {
    pub meta: ChartMeta,
    pub total: usize,
    pub slices: Vec<PieSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub group: String,
    pub color: String,
    pub count: usize,
    pub proportion: f64,
}

/// R3: mean hemoglobin per group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub meta: ChartMeta,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub group: String,
    pub mean: f64,
}

/// R4: protein counts in equal-width bins, one series per group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramChart {
    pub meta: ChartMeta,
    pub legend: Vec<LegendEntry>,
    /// `bin_count + 1` edges; the first and last are the observed min and max.
    pub edges: Vec<f64>,
    pub series: Vec<HistogramSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSeries {
    pub group: String,
    pub counts: Vec<usize>,
}

/// R5: raw ferritin values per sex.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxChart {
    pub meta: ChartMeta,
    pub legend: Vec<LegendEntry>,
    pub groups: Vec<BoxGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxGroup {
    pub sex: String,
    pub values: Vec<f64>,
}

impl BoxGroup {
    /// Box-and-whisker statistics for renderers that do not compute their own.
    pub fn summary(&self) -> Option<FiveNumberSummary> {
        FiveNumberSummary::of(&self.values)
    }
}

/// R6: mean self-rated health over hemoglobin × protein bins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapChart {
    pub meta: ChartMeta,
    pub color_label: String,
    pub hemoglobin_bins: Vec<Bin>,
    pub protein_bins: Vec<Bin>,
    /// `cells[hb][protein]`; `None` where no record falls.
    pub cells: Vec<Vec<Option<f64>>>,
    /// Min and max over populated cells.
    pub value_range: [f64; 2],
}

impl HeatmapChart {
    pub fn populated_cells(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }
}

/// R7: heart rate over exam date, one line per group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub meta: ChartMeta,
    pub legend: Vec<LegendEntry>,
    pub series: Vec<LineSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub group: String,
    pub points: Vec<LinePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePoint {
    pub id: String,
    pub exam_date: NaiveDate,
    pub heart_rate: f64,
}

/// R8: ferritin vs hemoglobin, one frame per age.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimatedScatterChart {
    pub meta: ChartMeta,
    pub legend: Vec<LegendEntry>,
    pub frame_label: String,
    pub size_label: String,
    /// Fixed across frames: ferritin min/max of the whole filtered set.
    pub x_range: [f64; 2],
    /// Fixed across frames: hemoglobin min/max of the whole filtered set.
    pub y_range: [f64; 2],
    pub frames: Vec<AnimationFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationFrame {
    pub age: f64,
    pub points: Vec<AnimatedPoint>,
}

/// Points are matched across frames by `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimatedPoint {
    pub id: String,
    pub group: String,
    pub ferritin: f64,
    pub hemoglobin: f64,
    pub heart_rate: f64,
}

// ---------------------------------------------------------------------------
// ChartResult / ChartSet
// ---------------------------------------------------------------------------

/// One dashboard slot's content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartResult {
    Scatter(ScatterChart),
    Pie(PieChart),
    Bar(BarChart),
    Histogram(HistogramChart),
    Box(BoxChart),
    Heatmap(HeatmapChart),
    Line(LineChart),
    AnimatedScatter(AnimatedScatterChart),
    NoData(Placeholder),
}

impl ChartResult {
    pub fn placeholder(reason: PlaceholderReason) -> Self {
        ChartResult::NoData(Placeholder::new(reason))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ChartResult::NoData(_))
    }

    pub fn title(&self) -> &str {
        match self {
            ChartResult::Scatter(c) => &c.meta.title,
            ChartResult::Pie(c) => &c.meta.title,
            ChartResult::Bar(c) => &c.meta.title,
            ChartResult::Histogram(c) => &c.meta.title,
            ChartResult::Box(c) => &c.meta.title,
            ChartResult::Heatmap(c) => &c.meta.title,
            ChartResult::Line(c) => &c.meta.title,
            ChartResult::AnimatedScatter(c) => &c.meta.title,
            ChartResult::NoData(p) => &p.title,
        }
    }
}

/// Slot ids in dashboard order.
pub const SLOT_IDS: [&str; 8] = [
    "scatter-plot",
    "pie-chart",
    "bar-chart",
    "histogram",
    "box-plot",
    "heatmap",
    "line-chart",
    "animated-scatter",
];

/// The eight results of one `compute` call, in fixed dashboard order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSet {
    pub scatter: ChartResult,
    pub pie: ChartResult,
    pub bar: ChartResult,
    pub histogram: ChartResult,
    pub box_plot: ChartResult,
    pub heatmap: ChartResult,
    pub line: ChartResult,
    pub animated_scatter: ChartResult,
}

impl ChartSet {
    /// Eight identical placeholders.
    pub fn placeholder(reason: PlaceholderReason) -> Self {
        let p = ChartResult::placeholder(reason);
        ChartSet {
            scatter: p.clone(),
            pie: p.clone(),
            bar: p.clone(),
            histogram: p.clone(),
            box_plot: p.clone(),
            heatmap: p.clone(),
            line: p.clone(),
            animated_scatter: p,
        }
    }

    /// Results paired with their slot ids, in dashboard order.
    pub fn slots(&self) -> [(&'static str, &ChartResult); 8] {
        let results = [
            &self.scatter,
            &self.pie,
            &self.bar,
            &self.histogram,
            &self.box_plot,
            &self.heatmap,
            &self.line,
            &self.animated_scatter,
        ];
        std::array::from_fn(|i| (SLOT_IDS[i], results[i]))
    }

    pub fn into_array(self) -> [ChartResult; 8] {
        [
            self.scatter,
            self.pie,
            self.bar,
            self.histogram,
            self.box_plot,
            self.heatmap,
            self.line,
            self.animated_scatter,
        ]
    }

    pub fn all_placeholders(&self) -> bool {
        self.slots().iter().all(|(_, r)| r.is_placeholder())
    }
}
