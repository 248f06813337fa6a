//! Chart data for the secondary visual artifact: measured values per file
//! across the spec numbers of one group, with optional limit reference lines.

use serde::{Deserialize, Serialize};

use crate::config::ExpansionFilter;
use crate::model::{Bound, EvaluatedRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Category,
    OldName,
}

impl GroupBy {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Category => "Spec Item Category",
            Self::OldName => "Spec Item Old Name",
        }
    }

    fn value<'a>(&self, record: &'a EvaluatedRecord) -> &'a str {
        match self {
            Self::Category => &record.key().spec_item_category,
            Self::OldName => &record.key().spec_item_old_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChartConfig {
    #[serde(default)]
    pub group_by: GroupBy,
    /// Group to plot. Defaults to the first distinct value.
    #[serde(default)]
    pub group: Option<String>,
    /// Spec numbers to keep. Empty keeps all.
    #[serde(default)]
    pub spec_numbers: Vec<String>,
    #[serde(default = "default_true")]
    pub show_min_limit: bool,
    #[serde(default = "default_true")]
    pub show_typ_limit: bool,
    #[serde(default = "default_true")]
    pub show_max_limit: bool,
    /// Only plot rows with a blank expansion id (worst-case values).
    #[serde(default)]
    pub worst_case_only: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            group_by: GroupBy::default(),
            group: None,
            spec_numbers: Vec::new(),
            show_min_limit: true,
            show_typ_limit: true,
            show_max_limit: true,
            worst_case_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeriesKind {
    Measured { file: String, bound: Bound },
    Limit { bound: Bound },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    #[serde(flatten)]
    pub kind: SeriesKind,
    pub points: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub title: String,
    pub group_by: GroupBy,
    pub group: String,
    /// One category per plotted record: spec number, with `/expansion` when set.
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Distinct group values in record order.
pub fn group_values(records: &[EvaluatedRecord], by: GroupBy) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for record in records {
        let v = by.value(record);
        if !values.iter().any(|x| x == v) {
            values.push(v.to_string());
        }
    }
    values
}

pub struct ChartOptions<'a> {
    pub labels: &'a [String],
    pub track_typical: bool,
    pub expansion: &'a ExpansionFilter,
}

pub fn build_chart(records: &[EvaluatedRecord], config: &ChartConfig, options: &ChartOptions<'_>) -> ChartData {
    let visible: Vec<&EvaluatedRecord> = records
        .iter()
        .filter(|r| options.expansion.matches(&r.key().spec_id_expansion))
        .collect();

    let group = config
        .group
        .clone()
        .or_else(|| visible.first().map(|r| config.group_by.value(r).to_string()))
        .unwrap_or_default();

    let selected: Vec<&EvaluatedRecord> = visible
        .into_iter()
        .filter(|r| config.group_by.value(r) == group)
        .filter(|r| !config.worst_case_only || r.key().spec_id_expansion.is_empty())
        .filter(|r| {
            config.spec_numbers.is_empty()
                || config.spec_numbers.iter().any(|s| crate::key::canonical_id(s) == r.key().spec_number)
        })
        .collect();

    let bounds: Vec<Bound> = if options.track_typical {
        Bound::ALL.to_vec()
    } else {
        vec![Bound::Minimum, Bound::Maximum]
    };

    let mut series = Vec::new();
    for (position, label) in options.labels.iter().enumerate() {
        for &bound in &bounds {
            let points = selected
                .iter()
                .map(|r| {
                    r.record
                        .values
                        .get(position)
                        .and_then(|v| v.as_ref())
                        .and_then(|v| *v.get(bound))
                })
                .collect();
            series.push(ChartSeries {
                name: bound.column(label),
                kind: SeriesKind::Measured { file: label.clone(), bound },
                points,
            });
        }
    }

    let toggles = [
        (Bound::Minimum, config.show_min_limit),
        (Bound::Typical, config.show_typ_limit),
        (Bound::Maximum, config.show_max_limit),
    ];
    for (bound, shown) in toggles {
        if !shown {
            continue;
        }
        series.push(ChartSeries {
            name: format!("{bound} Limit"),
            kind: SeriesKind::Limit { bound },
            points: selected.iter().map(|r| *r.record.limits.get(bound)).collect(),
        });
    }

    if selected.is_empty() {
        log::warn!("chart: no rows for {} '{group}'", config.group_by.title());
    }
    log::debug!("chart: {} rows, {} series", selected.len(), series.len());

    ChartData {
        title: format!("CL Comparison for {} {group}", config.group_by.title()),
        group_by: config.group_by,
        group,
        categories: selected.iter().map(|r| r.key().to_string()).collect(),
        series,
    }
}
