//! Time-ordered earthquake list shown beside the map.

use crate::models::EarthquakeFeature;
use crate::risk::{self, RiskTier};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// One entry of the sidebar.
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarRow {
    pub id: String,
    /// `"{mag:.1} - {place}"`
    pub title: String,
    pub local_time: String,
    /// `"{pct}% risk"`
    pub risk: String,
    pub tier: RiskTier,
    /// Event time (ms since epoch), kept for ordering checks and output
    pub time_ms: i64,
}

impl SidebarRow {
    fn from_feature(feature: &EarthquakeFeature) -> Self {
        Self {
            id: feature.id.clone(),
            title: format!("{:.1} - {}", feature.magnitude, feature.place),
            local_time: feature.local_time(),
            risk: format!("{} risk", risk::format_percent(feature.prediction)),
            tier: feature.tier(),
            time_ms: feature.time.timestamp_millis(),
        }
    }

    /// Two-line terminal rendering.
    #[must_use]
    pub fn to_ansi(&self) -> String {
        format!(
            "{BOLD}{}{RESET}\n  {DIM}{} -{RESET} {}{}{RESET}",
            self.title,
            self.local_time,
            self.tier.ansi(),
            self.risk
        )
    }
}

/// The sidebar list. Rebuilt wholesale on every render.
#[derive(Debug, Default)]
pub struct SidebarList {
    rows: Vec<SidebarRow>,
}

impl SidebarList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear and repopulate the list, most recent first.
    ///
    /// The sort is stable: events with equal times keep their input order.
    pub fn render(&mut self, features: &[EarthquakeFeature]) {
        let mut ordered: Vec<&EarthquakeFeature> = features.iter().collect();
        ordered.sort_by(|a, b| b.time.cmp(&a.time));

        self.rows.clear();
        self.rows
            .extend(ordered.into_iter().map(SidebarRow::from_feature));
    }

    #[must_use]
    pub fn rows(&self) -> &[SidebarRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
