//! Logo legibility against the header: tint policy, pixel classification and
//! "latest request wins" bookkeeping for the asynchronous sampling step.

use std::cell::Cell;
use std::rc::Rc;

use crate::core::catalog::{LogoTint, Station, StationTint};
use crate::core::color::{perceived_luma, Rgb};

/// Side length of the square grid the logo is resampled to before analysis.
pub const SAMPLE_GRID: u32 = 40;
const MIN_ALPHA: u8 = 20;
const MIN_OPAQUE_PIXELS: usize = 40;
const DARK_PIXEL_LUMA: f64 = 48.0;
const DARK_RATIO_FOR_BACKDROP: f64 = 0.65;
const BLEND_DISTANCE: f64 = 62.0;
const LIGHT_BACKGROUND_LUMA: f64 = 150.0;
const FALLBACK_BACKGROUND: Rgb = Rgb::new(30, 58, 138);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoProfile {
    /// Mostly-dark artwork; the header should switch to a light backdrop.
    pub needs_light_backdrop: bool,
    /// Average logo color blends into the header.
    pub needs_invert: bool,
    /// When inverting, white reads better than black.
    pub invert_to_white: bool,
}

impl LogoProfile {
    /// Returned whenever the logo cannot be sampled.
    pub const FAIL_SAFE: LogoProfile = LogoProfile {
        needs_light_backdrop: false,
        needs_invert: false,
        invert_to_white: true,
    };
}

/// Classifies RGBA samples (row-major, 4 bytes per pixel) against the header
/// background color.
pub fn classify_logo(rgba: &[u8], background_hex: &str) -> LogoProfile {
    let mut sampled = 0usize;
    let mut dark = 0usize;
    let (mut sum_r, mut sum_g, mut sum_b) = (0u64, 0u64, 0u64);

    for px in rgba.chunks_exact(4) {
        let (r, g, b, a) = (px[0], px[1], px[2], px[3]);
        if a < MIN_ALPHA {
            continue;
        }
        sampled += 1;
        if perceived_luma(f64::from(r), f64::from(g), f64::from(b)) < DARK_PIXEL_LUMA {
            dark += 1;
        }
        sum_r += u64::from(r);
        sum_g += u64::from(g);
        sum_b += u64::from(b);
    }

    if sampled < MIN_OPAQUE_PIXELS {
        return LogoProfile::FAIL_SAFE;
    }

    let avg = |sum: u64| (sum as f64 / sampled as f64).round().clamp(0.0, 255.0) as u8;
    let average = Rgb::new(avg(sum_r), avg(sum_g), avg(sum_b));
    let background = Rgb::parse_hex(background_hex).unwrap_or(FALLBACK_BACKGROUND);

    LogoProfile {
        needs_light_backdrop: dark as f64 / sampled as f64 > DARK_RATIO_FOR_BACKDROP,
        needs_invert: average.distance(background) < BLEND_DISTANCE,
        invert_to_white: background.luma() < LIGHT_BACKGROUND_LUMA,
    }
}

/// What the board should do with the station logo before any sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoTreatment {
    /// Explicitly opted out: never recolor, never sample.
    Plain,
    ForceWhite,
    ForceBlack,
    /// Sample the logo and let [`classify_logo`] decide.
    Analyze,
}

impl LogoTreatment {
    /// `None` means a custom (non-catalog) logo, which is always analyzed.
    pub fn for_station(station: Option<&Station>) -> Self {
        let Some(station) = station else {
            return LogoTreatment::Analyze;
        };
        if station.tint == StationTint::Disabled {
            return LogoTreatment::Plain;
        }
        match station.resolved_tint() {
            Some(LogoTint::Black) => LogoTreatment::ForceBlack,
            Some(LogoTint::White) => LogoTreatment::ForceWhite,
            None => LogoTreatment::Analyze,
        }
    }
}

/// Fox artwork without an explicit tint gets the extra "pop" styling.
pub fn fox_pop(station: Option<&Station>) -> bool {
    station
        .map(|s| !s.has_explicit_tint() && s.label.to_lowercase().contains("fox"))
        .unwrap_or(false)
}

/// CSS classes for the logo and header once a treatment (and possibly a
/// profile) is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogoAppearance {
    pub white_invert: bool,
    pub black_invert: bool,
    pub light_backdrop: bool,
}

impl LogoAppearance {
    pub fn settle(treatment: LogoTreatment, profile: Option<LogoProfile>) -> Self {
        match treatment {
            LogoTreatment::Plain => Self::default(),
            LogoTreatment::ForceWhite => Self {
                white_invert: true,
                ..Self::default()
            },
            LogoTreatment::ForceBlack => Self {
                black_invert: true,
                ..Self::default()
            },
            LogoTreatment::Analyze => match profile {
                Some(p) if p.needs_invert => Self {
                    white_invert: p.invert_to_white,
                    black_invert: !p.invert_to_white,
                    light_backdrop: false,
                },
                Some(p) => Self {
                    light_backdrop: p.needs_light_backdrop,
                    ..Self::default()
                },
                None => Self::default(),
            },
        }
    }
}

/// Ticket handed out for each sampling request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContrastTicket(u64);

impl ContrastTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Sequence counter: only the most recently issued ticket may apply its result.
#[derive(Debug, Clone, Default)]
pub struct ContrastTracker {
    latest: Rc<Cell<u64>>,
}

impl ContrastTracker {
    pub fn begin(&self) -> ContrastTicket {
        let next = self.latest.get().wrapping_add(1);
        self.latest.set(next);
        ContrastTicket(next)
    }

    pub fn accept(&self, ticket: ContrastTicket) -> bool {
        let current = self.latest.get();
        if ticket.0 != current {
            tracing::debug!(
                "[contrast] stale request skipped (request={}, active={current})",
                ticket.0
            );
            return false;
        }
        true
    }
}
