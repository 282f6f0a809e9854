use crate::aspects::types::{Aspect, AspectKind, AspectSettings};
use crate::ephemeris::Body;
use crate::zodiac::angular_distance;

/// Position and speed of one body, as seen by the calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectPoint {
    pub body: Body,
    pub lon: f64,
    pub speed_lon: f64,
}

/// Aspect calculator
#[derive(Debug, Clone, Default)]
pub struct AspectCalculator {
    settings: AspectSettings,
}

impl AspectCalculator {
    pub fn new(settings: AspectSettings) -> Self {
        Self { settings }
    }

    /// All aspects between distinct pairs, in input order.
    pub fn compute(&self, points: &[AspectPoint]) -> Vec<Aspect> {
        let mut aspects = Vec::new();
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                if let Some(aspect) = self.calculate_aspect(a, b) {
                    aspects.push(aspect);
                }
            }
        }
        aspects
    }

    /// The closest major aspect within orb, if any.
    pub fn calculate_aspect(&self, a: &AspectPoint, b: &AspectPoint) -> Option<Aspect> {
        let separation = angular_distance(a.lon, b.lon);

        AspectKind::ALL
            .iter()
            .map(|&kind| (kind, (separation - kind.angle()).abs()))
            .filter(|&(kind, orb)| orb < self.settings.orb_for(kind))
            .min_by(|x, y| x.1.total_cmp(&y.1))
            .map(|(kind, orb)| Aspect {
                from: a.body,
                to: b.body,
                kind,
                exact_angle: kind.angle(),
                orb,
                is_applying: is_applying(a, b, kind.angle(), separation),
                is_exact: orb < 0.1,
            })
    }
}

/// Project both bodies a short step forward and check whether the
/// separation moves toward the exact angle.
fn is_applying(a: &AspectPoint, b: &AspectPoint, exact: f64, separation: f64) -> bool {
    let relative_speed = a.speed_lon - b.speed_lon;
    if relative_speed.abs() < 0.01 {
        return separation < exact + 0.5;
    }

    let time_step = 0.1;
    let future = angular_distance(
        a.lon + a.speed_lon * time_step,
        b.lon + b.speed_lon * time_step,
    );
    (future - exact).abs() < (separation - exact).abs()
}
