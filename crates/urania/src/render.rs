//! Contract between the chart engine and wheel renderers.
//!
//! Rasterisation lives outside this crate. A renderer receives a
//! [`RenderPayload`], which is a pure function of a [`ChartResult`], and may
//! use [`WheelGeometry`] to place glyphs and aspect lines.

use serde::{Deserialize, Serialize};

use crate::aspects::AspectKind;
use crate::chart::ChartResult;
use crate::ephemeris::Body;
use crate::error::ChartError;
use crate::zodiac::normalize_deg;

/// Fewest bodies a wheel is drawn with.
pub const MIN_RENDER_BODIES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Color in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const PURPLE: Color = Color {
        r: 0x80,
        g: 0x00,
        b: 0x80,
        a: 255,
    };

    /// `#RRGGBB` or `#RRGGBBAA`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Color {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: 255,
            }),
            8 => Some(Color {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => None,
        }
    }

    pub fn for_aspect(kind: AspectKind) -> Self {
        let hex = match kind {
            AspectKind::Conjunction => "#FFD400",
            AspectKind::Sextile => "#1DB954",
            AspectKind::Square => "#E63946",
            AspectKind::Trine => "#1E88E5",
            AspectKind::Opposition => "#7B1FA2",
        };
        Color::from_hex(hex).unwrap_or(Color::PURPLE)
    }
}

/// Circle layout of a square wheel image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelGeometry {
    pub size: f64,
    pub center: Point,
    /// Radius of the body glyph ring
    pub body_radius: f64,
    /// Aspect lines end on this inner circle
    pub aspect_radius: f64,
}

impl WheelGeometry {
    pub fn new(size: f64) -> Self {
        Self {
            size,
            center: Point {
                x: size / 2.0,
                y: size / 2.0,
            },
            body_radius: size * 0.4,
            aspect_radius: size * 0.35,
        }
    }

    /// Image coordinates (y down) of a longitude: 0° at the top, increasing
    /// clockwise.
    pub fn angle_to_xy(&self, lon: f64, radius: f64) -> Point {
        let a = (90.0 - normalize_deg(lon)).to_radians();
        Point {
            x: self.center.x + radius * a.cos(),
            y: self.center.y - radius * a.sin(),
        }
    }

    /// Pull a point along its ray from the center onto a circle.
    pub fn clamp(&self, pt: Point, radius: f64) -> Point {
        let (vx, vy) = (pt.x - self.center.x, pt.y - self.center.y);
        let d = vx.hypot(vy);
        if d == 0.0 {
            return self.center;
        }
        let k = radius / d;
        Point {
            x: self.center.x + vx * k,
            y: self.center.y + vy * k,
        }
    }

    /// End points of the line joining two bodies inside the wheel.
    pub fn aspect_line(&self, from_lon: f64, to_lon: f64) -> (Point, Point) {
        let a = self.angle_to_xy(from_lon, self.body_radius);
        let b = self.angle_to_xy(to_lon, self.body_radius);
        (self.clamp(a, self.aspect_radius), self.clamp(b, self.aspect_radius))
    }
}

impl Default for WheelGeometry {
    fn default() -> Self {
        Self::new(1200.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderBody {
    pub body: Body,
    pub ecliptic_long: f64,
    pub retrograde: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderAspect {
    pub from: Body,
    pub to: Body,
    pub kind: AspectKind,
    pub color: Color,
}

/// Everything a renderer may draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPayload {
    pub title: String,
    /// Date, time and place caption
    pub subtitle: String,
    pub bodies: Vec<RenderBody>,
    pub cusps: Option<[f64; 12]>,
    pub aspects: Vec<RenderAspect>,
}

impl RenderPayload {
    pub fn from_chart(chart: &ChartResult) -> Result<Self, ChartError> {
        if chart.planets.len() < MIN_RENDER_BODIES {
            return Err(ChartError::InvalidInput(format!(
                "a wheel needs at least {MIN_RENDER_BODIES} bodies, got {}",
                chart.planets.len()
            )));
        }

        let title = chart
            .input
            .name
            .clone()
            .unwrap_or_else(|| "Natal Chart".to_string());
        let place = if chart.input.place.city.is_empty() {
            format!("{:.4}, {:.4}", chart.lat, chart.lon)
        } else {
            format!("{}, {}", chart.input.place.city, chart.input.place.country)
        };

        Ok(Self {
            title,
            subtitle: format!("{} | {}", chart.datetime_local, place),
            bodies: chart
                .planets
                .iter()
                .map(|(body, p)| RenderBody {
                    body: *body,
                    ecliptic_long: p.ecliptic_long,
                    retrograde: p.retrograde,
                })
                .collect(),
            cusps: Some(chart.houses.cusps_longitudes),
            aspects: chart
                .aspects
                .iter()
                .map(|a| RenderAspect {
                    from: a.from,
                    to: a.to,
                    kind: a.kind,
                    color: Color::for_aspect(a.kind),
                })
                .collect(),
        })
    }
}

/// Implemented by whatever turns a payload into an image.
pub trait ChartRenderer: Send + Sync {
    /// Encoded image bytes (e.g. PNG).
    fn render(&self, payload: &RenderPayload) -> Result<Vec<u8>, ChartError>;
}
