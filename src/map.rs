//! World map view: viewport, legend, transient markers and a character
//! canvas for terminal rendering.

use tokio::time::Instant;

use crate::markers::{CircleMarker, MarkerLayer};
use crate::models::LatLng;
use crate::risk::RiskTier;

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

const GLYPH_QUAKE: char = '●';
const GLYPH_TEMPORARY: char = '◎';

/// Fixed world viewport. No horizontal wraparound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
    pub center: LatLng,
    pub zoom: u8,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            min_lat: -90.0,
            min_lon: -180.0,
            max_lat: 90.0,
            max_lon: 180.0,
            center: LatLng::new(20.0, 0.0),
            zoom: 2,
        }
    }
}

impl Viewport {
    /// Check if a point is within the viewport bounds.
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Project a point onto a `width` x `height` grid (equirectangular).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn project(&self, point: LatLng, width: usize, height: usize) -> Option<(usize, usize)> {
        if width == 0 || height == 0 || !self.contains(point.lat, point.lon) {
            return None;
        }
        let x = (point.lon - self.min_lon) / (self.max_lon - self.min_lon);
        let y = (self.max_lat - point.lat) / (self.max_lat - self.min_lat);
        let col = (x * (width - 1) as f64).round() as usize;
        let row = (y * (height - 1) as f64).round() as usize;
        Some((col.min(width - 1), row.min(height - 1)))
    }
}

/// Persistent legend listing the risk tiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Legend;

impl Legend {
    pub const TITLE: &'static str = "Risk Level";

    /// `(tier, label, color)` for every tier, highest first.
    #[must_use]
    pub fn entries(&self) -> Vec<(RiskTier, &'static str, &'static str)> {
        RiskTier::ALL
            .iter()
            .map(|tier| (*tier, tier.label(), tier.color()))
            .collect()
    }

    /// Terminal rendering, one line.
    #[must_use]
    pub fn render(&self) -> String {
        let items: Vec<String> = self
            .entries()
            .into_iter()
            .map(|(tier, label, _)| format!("{}■{RESET} {label}", tier.ansi()))
            .collect();
        format!("{}: {}", Self::TITLE, items.join("  "))
    }
}

/// Identifier of a temporary marker.
pub type MarkerId = u64;

#[derive(Debug, Clone)]
struct TemporaryMarker {
    id: MarkerId,
    marker: CircleMarker,
    expires_at: Instant,
}

/// The map widget.
#[derive(Debug, Default)]
pub struct MapView {
    viewport: Viewport,
    legend: Legend,
    temporary: Vec<TemporaryMarker>,
    next_id: MarkerId,
}

impl MapView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    /// Resolve a click gesture. Points outside the world bounds are rejected.
    #[must_use]
    pub fn click(&self, lat: f64, lon: f64) -> Option<LatLng> {
        self.viewport
            .contains(lat, lon)
            .then_some(LatLng::new(lat, lon))
    }

    /// Add a temporary marker removed once `expires_at` has passed.
    pub fn add_temporary(&mut self, marker: CircleMarker, expires_at: Instant) -> MarkerId {
        let id = self.next_id;
        self.next_id += 1;
        self.temporary.push(TemporaryMarker {
            id,
            marker,
            expires_at,
        });
        id
    }

    /// Remove a temporary marker. Returns `false` if it was already gone.
    pub fn remove_temporary(&mut self, id: MarkerId) -> bool {
        let before = self.temporary.len();
        self.temporary.retain(|t| t.id != id);
        self.temporary.len() != before
    }

    /// Remove every temporary marker whose deadline is at or before `now`.
    pub fn expire_due(&mut self, now: Instant) -> usize {
        let before = self.temporary.len();
        self.temporary.retain(|t| t.expires_at > now);
        before - self.temporary.len()
    }

    /// Drop every temporary marker, cancelling their pending removal.
    pub fn clear_temporary(&mut self) {
        self.temporary.clear();
    }

    /// Earliest pending removal.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.temporary.iter().map(|t| t.expires_at).min()
    }

    /// Temporary markers currently shown.
    pub fn temporary_markers(&self) -> impl Iterator<Item = &CircleMarker> {
        self.temporary.iter().map(|t| &t.marker)
    }

    /// Draw the viewport as `height` lines of `width` cells.
    ///
    /// Quake markers are drawn lowest tier first so the riskiest marker wins a
    /// shared cell; temporary markers are drawn last.
    #[must_use]
    pub fn render_canvas(&self, width: usize, height: usize, layer: &MarkerLayer) -> Vec<String> {
        let mut cells: Vec<Vec<Option<(char, RiskTier)>>> = vec![vec![None; width]; height];

        let equator = self.viewport.project(LatLng::new(0.0, 0.0), width, height);

        let mut quakes: Vec<&CircleMarker> = layer.markers().iter().collect();
        quakes.sort_by_key(|m| tier_rank(m.tier));

        let glyphs = quakes
            .into_iter()
            .map(|m| (m, GLYPH_QUAKE))
            .chain(self.temporary_markers().map(|m| (m, GLYPH_TEMPORARY)));

        for (marker, glyph) in glyphs {
            if let Some((col, row)) = self.viewport.project(marker.center, width, height) {
                cells[row][col] = Some((glyph, marker.tier));
            }
        }

        cells
            .into_iter()
            .enumerate()
            .map(|(row, line)| {
                line.into_iter()
                    .enumerate()
                    .map(|(col, cell)| match cell {
                        Some((glyph, tier)) => format!("{}{glyph}{RESET}", tier.ansi()),
                        None => format!("{DIM}{}{RESET}", background(col, row, equator)),
                    })
                    .collect()
            })
            .collect()
    }
}

fn tier_rank(tier: RiskTier) -> u8 {
    match tier {
        RiskTier::Low => 0,
        RiskTier::Medium => 1,
        RiskTier::High => 2,
    }
}

/// Graticule: equator and prime meridian over a dotted field.
fn background(col: usize, row: usize, origin: Option<(usize, usize)>) -> char {
    match origin {
        Some((c, r)) if c == col && r == row => '+',
        Some((_, r)) if r == row => '-',
        Some((c, _)) if c == col => '|',
        _ => '·',
    }
}
