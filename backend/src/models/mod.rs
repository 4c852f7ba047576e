//! Domain models for congress reports.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`RawRecord`] - One aggregated registration row from the API
//! - [`Gender`] - The two recognized gender buckets
//! - [`PivotCell`] - Male/female accumulator for one pivot cell
//! - [`CategorySet`] - Ordered canonical column labels plus synonyms
//! - [`ReportKind`] - The report pages and their static layouts
//! - [`ReportFilter`] / [`ReportPeriod`] - Query filter and date range

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Grouping key used when a row carries none.
pub const UNKNOWN_GROUP: &str = "Unknown";

// =============================================================================
// Gender
// =============================================================================

/// Gender bucket a record is counted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Case-insensitive match against `male` / `female`.
    ///
    /// Anything else, including a missing value, is `None` and the record
    /// is counted in neither bucket.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw?.to_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

// =============================================================================
// Raw Record
// =============================================================================

/// One row of an attendance/registration report as fetched from the API.
///
/// Field names differ per report (`fellowship_centre`, `region`,
/// `membership_status`, `category`...); [`RawRecord::from_row`] maps them
/// through the report's [`ReportLayout`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Primary dimension value (institution, region, cluster, state).
    pub grouping_key: Option<String>,
    /// Raw column label: membership status, category, or day for the
    /// daily reports. Free-form.
    pub category: Option<String>,
    /// Raw gender label, free-form.
    pub gender: Option<String>,
    /// Attendance count; malformed upstream values are already coerced to 0.
    pub count: u64,
}

impl RawRecord {
    pub fn new(
        grouping_key: impl Into<String>,
        category: impl Into<String>,
        gender: impl Into<String>,
        count: u64,
    ) -> Self {
        Self {
            grouping_key: Some(grouping_key.into()),
            category: Some(category.into()),
            gender: Some(gender.into()),
            count,
        }
    }

    /// Build a record from a loosely-typed API row.
    ///
    /// Daily reports take the `day_key` field, or the date part of
    /// `registration_date` when the row has no day key.
    pub fn from_row(row: &Value, layout: &ReportLayout) -> Self {
        let category = match layout.columns {
            ColumnAxis::Category => field_text(row.get(layout.category_field)),
            ColumnAxis::CongressDay => field_text(row.get(layout.category_field)).or_else(|| {
                field_text(row.get("registration_date")).map(|d| d.chars().take(10).collect())
            }),
        };
        Self {
            grouping_key: field_text(row.get(layout.grouping_field)),
            category,
            gender: field_text(row.get("gender")),
            count: coerce_count(row.get("total")),
        }
    }

    /// Resolved grouping key, `Unknown` when absent or empty.
    pub fn group(&self) -> &str {
        match self.grouping_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => UNKNOWN_GROUP,
        }
    }

    /// Resolved gender bucket.
    pub fn gender_bucket(&self) -> Option<Gender> {
        Gender::parse(self.gender.as_deref())
    }
}

/// Convert every row of a fetched payload into a [`RawRecord`].
pub fn records_from_rows(rows: &[Value], layout: &ReportLayout) -> Vec<RawRecord> {
    rows.iter().map(|row| RawRecord::from_row(row, layout)).collect()
}

/// Text view of a JSON field; empty, null and `false` read as absent.
pub(crate) fn field_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Coerce an upstream `total` into a non-negative integer count.
///
/// Numbers and numeric strings are accepted (fractions truncated), `true`
/// counts as 1. Negative, non-finite, non-numeric and missing values are 0.
pub fn coerce_count(value: Option<&Value>) -> u64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Some(Value::Bool(true)) => Some(1.0),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() && n > 0.0 => n.trunc() as u64,
        _ => 0,
    }
}

// =============================================================================
// Pivot Cell
// =============================================================================

/// Male/female accumulator for one (grouping key, category) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotCell {
    pub male: u64,
    pub female: u64,
}

impl PivotCell {
    pub fn new(male: u64, female: u64) -> Self {
        Self { male, female }
    }

    /// Add `count` into the bucket for `gender`; unrecognized gender adds nothing.
    ///
    /// Counts saturate at `u64::MAX`.
    pub fn record(&mut self, gender: Option<Gender>, count: u64) {
        match gender {
            Some(Gender::Male) => self.male = self.male.saturating_add(count),
            Some(Gender::Female) => self.female = self.female.saturating_add(count),
            None => {}
        }
    }

    pub fn total(&self) -> u64 {
        self.male.saturating_add(self.female)
    }
}

impl std::ops::AddAssign for PivotCell {
    fn add_assign(&mut self, other: Self) {
        self.male = self.male.saturating_add(other.male);
        self.female = self.female.saturating_add(other.female);
    }
}

// =============================================================================
// Category Set
// =============================================================================

/// Fixed, ordered set of canonical column labels.
///
/// Order defines column order in every output. Category sets always carry
/// a default label, so normalization into them is total. Day sets built by
/// [`CategorySet::congress_days`] have none: a row whose day cannot be
/// resolved is left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    labels: Vec<String>,
    /// Lower-cased raw spelling -> index into `labels`.
    synonyms: Vec<(String, usize)>,
    default_index: Option<usize>,
}

impl CategorySet {
    /// Create a set from ordered labels. `default` is appended if missing.
    pub fn new<I, S>(labels: I, default: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for label in labels {
            let label: String = label.into();
            if !ordered.iter().any(|l| l.eq_ignore_ascii_case(&label)) {
                ordered.push(label);
            }
        }
        let mut labels = ordered;

        let default_index = match labels.iter().position(|l| l == default) {
            Some(i) => i,
            None => {
                labels.push(default.to_string());
                labels.len() - 1
            }
        };

        Self {
            labels,
            synonyms: Vec::new(),
            default_index: Some(default_index),
        }
    }

    /// One column per day from `period.start` to `period.end`, inclusive.
    ///
    /// Labels read `Day 1 (Apr 1)`. Each day also matches its `day<N>` key
    /// and its `YYYY-MM-DD` date. An unset, unparsable or reversed period
    /// yields no columns.
    pub fn congress_days(period: &ReportPeriod) -> Self {
        let mut set = Self {
            labels: Vec::new(),
            synonyms: Vec::new(),
            default_index: None,
        };
        let (Some(start), Some(end)) = (parse_day(period.start.as_deref()), parse_day(period.end.as_deref()))
        else {
            return set;
        };

        let mut day = start;
        while day <= end {
            let index = set.labels.len();
            set.labels
                .push(format!("Day {} ({})", index + 1, day.format("%b %-d")));
            set.synonyms.push((format!("day{}", index + 1), index));
            set.synonyms.push((day.format("%Y-%m-%d").to_string(), index));
            day += Duration::days(1);
        }
        set
    }

    /// Register `raw` (case-insensitive) as an alias of the label `canonical`.
    ///
    /// Aliases pointing at a label outside the set are ignored.
    pub fn with_synonym(mut self, raw: &str, canonical: &str) -> Self {
        match self.index_of(canonical) {
            Some(index) => self.synonyms.push((raw.to_lowercase(), index)),
            None => tracing::warn!(raw, canonical, "synonym target is not a category, ignored"),
        }
        self
    }

    /// Guest / Member / Worker / Associate Coord, used by membership reports.
    pub fn membership() -> Self {
        Self::new(["Guest", "Member", "Worker", "Associate Coord"], "Guest")
            .with_synonym("associate coordinator", "Associate Coord")
            .with_synonym("associate coord", "Associate Coord")
    }

    /// Registration categories used by the category summary report.
    pub fn congress_categories() -> Self {
        Self::new(
            ["Student", "Children", "Corper", "Staff", "Others", "Youth"],
            "Others",
        )
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label unmatched input falls back to; `None` for day sets.
    pub fn default_label(&self) -> Option<&str> {
        self.default_index.map(|i| self.labels[i].as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Label an already lower-cased synonym resolves to.
    pub(crate) fn synonym(&self, lowered: &str) -> Option<&str> {
        self.synonyms
            .iter()
            .find(|(raw, _)| raw == lowered)
            .map(|(_, index)| self.labels[*index].as_str())
    }

    /// Case-insensitive lookup of a canonical label.
    pub(crate) fn label_matching(&self, lowered: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.to_lowercase() == lowered)
            .map(String::as_str)
    }

    fn index_of(&self, label: &str) -> Option<usize> {
        let lowered = label.to_lowercase();
        self.labels.iter().position(|l| l.to_lowercase() == lowered)
    }
}

fn parse_day(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?.trim(), "%Y-%m-%d").ok()
}

// =============================================================================
// Report Kinds
// =============================================================================

/// Congress the report belongs to; selects the settings endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CongressScope {
    State,
    Zonal,
}

impl CongressScope {
    /// Endpoint carrying the congress `start_date` / `end_date`.
    pub fn settings_path(&self) -> &'static str {
        match self {
            CongressScope::State => "/state-congress/settings",
            CongressScope::Zonal => "/zonal-congress/settings",
        }
    }
}

/// Where the known dimension list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "path", rename_all = "snake_case")]
pub enum DimensionSource {
    /// `GET <path>?state=<state>`, only consulted when a state is selected.
    StateMeta(&'static str),
    /// The selected state alone, or every state from `/meta/states`.
    States,
}

/// What the report's columns are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAxis {
    /// A fixed category set, with a default for unmatched labels.
    Category,
    /// One column per congress day, derived from the report period.
    CongressDay,
}

/// Shape of the trailing totals of a grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalsLayout {
    /// One `GT` column and a `Total` row.
    #[default]
    Compact,
    /// `Grand Total` F/M/T columns and a `Grand Total` row.
    Split,
}

/// Static description of one report page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLayout {
    pub slug: &'static str,
    pub title: &'static str,
    /// API resource returning `{ items: [...] }`.
    pub resource: &'static str,
    pub grouping_field: &'static str,
    pub category_field: &'static str,
    /// First header cell of the grid.
    pub row_label: &'static str,
    /// Spreadsheet name before the date range.
    pub file_stem: &'static str,
    pub dimension: DimensionSource,
    pub scope: CongressScope,
    pub columns: ColumnAxis,
    pub totals: TotalsLayout,
}

/// Report pages sharing the pivot pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    /// State congress membership status by institution.
    MembershipByInstitution,
    /// State congress membership status by region.
    MembershipByRegion,
    /// State congress membership status by cluster.
    MembershipByCluster,
    /// State congress registration categories by region.
    CategoriesByRegion,
    /// Zonal congress membership status by state.
    MembershipByState,
    /// State congress daily registration by region.
    RegionsByDay,
    /// Zonal congress daily registration by state.
    StatesByDay,
}

impl ReportKind {
    pub const ALL: [ReportKind; 7] = [
        ReportKind::MembershipByInstitution,
        ReportKind::MembershipByRegion,
        ReportKind::MembershipByCluster,
        ReportKind::CategoriesByRegion,
        ReportKind::MembershipByState,
        ReportKind::RegionsByDay,
        ReportKind::StatesByDay,
    ];

    pub fn layout(&self) -> ReportLayout {
        match self {
            ReportKind::MembershipByInstitution => ReportLayout {
                slug: "membership-by-institution",
                title: "Membership Status by Institution",
                resource: "/state-congress-reports/membership-by-institution",
                grouping_field: "fellowship_centre",
                category_field: "membership_status",
                row_label: "Institution",
                file_stem: "state-congress-membership-institution",
                dimension: DimensionSource::StateMeta("/meta/institutions"),
                scope: CongressScope::State,
                columns: ColumnAxis::Category,
                totals: TotalsLayout::Compact,
            },
            ReportKind::MembershipByRegion => ReportLayout {
                slug: "membership-by-region",
                title: "Membership Status by Region",
                resource: "/state-congress-reports/membership-by-region",
                grouping_field: "region",
                category_field: "membership_status",
                row_label: "Region",
                file_stem: "state-congress-membership-report",
                dimension: DimensionSource::StateMeta("/meta/regions"),
                scope: CongressScope::State,
                columns: ColumnAxis::Category,
                totals: TotalsLayout::Compact,
            },
            ReportKind::MembershipByCluster => ReportLayout {
                slug: "membership-by-cluster",
                title: "Membership Status by Cluster",
                resource: "/state-congress-reports/membership-by-cluster",
                grouping_field: "cluster",
                category_field: "membership_status",
                row_label: "Cluster",
                file_stem: "state-congress-membership-cluster",
                dimension: DimensionSource::StateMeta("/meta/clusters"),
                scope: CongressScope::State,
                columns: ColumnAxis::Category,
                totals: TotalsLayout::Compact,
            },
            ReportKind::CategoriesByRegion => ReportLayout {
                slug: "categories-by-region",
                title: "Category Summary by Region",
                resource: "/state-congress-reports/categories-by-region",
                grouping_field: "region",
                category_field: "category",
                row_label: "Region",
                file_stem: "state-congress-category-report",
                dimension: DimensionSource::StateMeta("/meta/regions"),
                scope: CongressScope::State,
                columns: ColumnAxis::Category,
                totals: TotalsLayout::Compact,
            },
            ReportKind::MembershipByState => ReportLayout {
                slug: "membership-by-state",
                title: "Zonal Membership by State",
                resource: "/zonal-congress-reports/membership-by-state",
                grouping_field: "state",
                category_field: "membership_status",
                row_label: "State",
                file_stem: "zonal-membership-report",
                dimension: DimensionSource::States,
                scope: CongressScope::Zonal,
                columns: ColumnAxis::Category,
                totals: TotalsLayout::Compact,
            },
            ReportKind::RegionsByDay => ReportLayout {
                slug: "regions-by-day",
                title: "Daily Registration by Region",
                resource: "/state-congress-reports/regions-by-day",
                grouping_field: "region",
                category_field: "day_key",
                row_label: "Region",
                file_stem: "state-congress-region-report",
                dimension: DimensionSource::StateMeta("/meta/regions"),
                scope: CongressScope::State,
                columns: ColumnAxis::CongressDay,
                totals: TotalsLayout::Compact,
            },
            ReportKind::StatesByDay => ReportLayout {
                slug: "states-by-day",
                title: "Daily Registration by State",
                resource: "/zonal-congress-reports/states-by-day",
                grouping_field: "state",
                category_field: "day_key",
                row_label: "State",
                file_stem: "zonal-daily-report",
                dimension: DimensionSource::States,
                scope: CongressScope::Zonal,
                columns: ColumnAxis::CongressDay,
                totals: TotalsLayout::Split,
            },
        }
    }

    /// Fixed category set of the kind; empty for daily reports, whose
    /// columns depend on the period (see [`ReportKind::columns`]).
    pub fn categories(&self) -> CategorySet {
        match self {
            ReportKind::CategoriesByRegion => CategorySet::congress_categories(),
            ReportKind::RegionsByDay | ReportKind::StatesByDay => {
                CategorySet::congress_days(&ReportPeriod::default())
            }
            _ => CategorySet::membership(),
        }
    }

    /// Columns of the kind for a report covering `period`.
    pub fn columns(&self, period: &ReportPeriod) -> CategorySet {
        match self.layout().columns {
            ColumnAxis::Category => self.categories(),
            ColumnAxis::CongressDay => CategorySet::congress_days(period),
        }
    }

    pub fn slug(&self) -> &'static str {
        self.layout().slug
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReportKind {
    type Err = crate::error::ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == wanted)
            .ok_or_else(|| crate::error::ReportError::UnknownKind(s.to_string()))
    }
}

// =============================================================================
// Filter & Period
// =============================================================================

/// User-selected report filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    /// Selected state; `None` means all states.
    #[serde(default)]
    pub state: Option<String>,
}

impl ReportFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter on one state; an empty or blank name means all states.
    pub fn for_state(state: impl Into<String>) -> Self {
        let state = state.into();
        let state = state.trim();
        Self {
            state: (!state.is_empty()).then(|| state.to_string()),
        }
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref().filter(|s| !s.is_empty())
    }
}

/// Date range a report covers, used in export file names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    #[serde(default, alias = "start_date")]
    pub start: Option<String>,
    #[serde(default, alias = "end_date")]
    pub end: Option<String>,
}

impl ReportPeriod {
    pub fn new(start: Option<String>, end: Option<String>) -> Self {
        Self {
            start: start.filter(|s| !s.trim().is_empty()),
            end: end.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Fill unset bounds from `fallback`.
    pub fn or(self, fallback: ReportPeriod) -> Self {
        Self::new(self.start.or(fallback.start), self.end.or(fallback.end))
    }

    pub fn is_unset(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Start bound for file names, `start` when unset.
    pub fn start_label(&self) -> &str {
        self.start.as_deref().filter(|s| !s.is_empty()).unwrap_or("start")
    }

    /// End bound for file names, `end` when unset.
    pub fn end_label(&self) -> &str {
        self.end.as_deref().filter(|s| !s.is_empty()).unwrap_or("end")
    }
}
