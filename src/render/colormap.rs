//! Color maps as piecewise-linear color stops.

use std::fmt;
use std::str::FromStr;

/// RGB color stop at position `t` in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorStop {
    pub t: f64,
    pub rgb: [u8; 3],
}

const fn stop(t: f64, r: u8, g: u8, b: u8) -> ColorStop {
    ColorStop { t, rgb: [r, g, b] }
}

const MAGMA: &[ColorStop] = &[
    stop(0.0, 0, 0, 4),
    stop(0.125, 28, 16, 68),
    stop(0.25, 79, 18, 123),
    stop(0.375, 129, 37, 129),
    stop(0.5, 181, 54, 122),
    stop(0.625, 229, 80, 100),
    stop(0.75, 251, 135, 97),
    stop(0.875, 254, 194, 135),
    stop(1.0, 252, 253, 191),
];

const VIRIDIS: &[ColorStop] = &[
    stop(0.0, 68, 1, 84),
    stop(0.25, 59, 82, 139),
    stop(0.5, 33, 145, 140),
    stop(0.75, 94, 201, 98),
    stop(1.0, 253, 231, 37),
];

const GRAY: &[ColorStop] = &[stop(0.0, 0, 0, 0), stop(1.0, 255, 255, 255)];

const COOLWARM: &[ColorStop] = &[
    stop(0.0, 59, 76, 192),
    stop(0.5, 221, 221, 221),
    stop(1.0, 180, 4, 38),
];

/// Available color maps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Colormap {
    /// Black -> purple -> orange -> pale yellow.
    #[default]
    Magma,
    /// Purple -> teal -> yellow.
    Viridis,
    /// Black -> white.
    Gray,
    /// Blue -> light gray -> red, centered for signed shifts.
    Coolwarm,
}

impl Colormap {
    pub const ALL: &'static [Colormap] = &[
        Colormap::Magma,
        Colormap::Viridis,
        Colormap::Gray,
        Colormap::Coolwarm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Colormap::Magma => "magma",
            Colormap::Viridis => "viridis",
            Colormap::Gray => "gray",
            Colormap::Coolwarm => "coolwarm",
        }
    }

    fn stops(self) -> &'static [ColorStop] {
        match self {
            Colormap::Magma => MAGMA,
            Colormap::Viridis => VIRIDIS,
            Colormap::Gray => GRAY,
            Colormap::Coolwarm => COOLWARM,
        }
    }

    /// Color at normalized position `t`, clamped to `[0, 1]`.
    pub fn eval(self, t: f64) -> [u8; 3] {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        for pair in stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if t <= hi.t {
                let span = hi.t - lo.t;
                let f = if span > 0.0 { (t - lo.t) / span } else { 0.0 };
                let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
                return [
                    mix(lo.rgb[0], hi.rgb[0]),
                    mix(lo.rgb[1], hi.rgb[1]),
                    mix(lo.rgb[2], hi.rgb[2]),
                ];
            }
        }
        stops[stops.len() - 1].rgb
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Colormap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Colormap::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = Colormap::ALL.iter().map(|c| c.name()).collect();
                format!("unknown colormap `{s}`, expected one of {}", names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_first_and_last_stop() {
        for &map in Colormap::ALL {
            let stops = map.stops();
            assert_eq!(map.eval(0.0), stops[0].rgb);
            assert_eq!(map.eval(1.0), stops[stops.len() - 1].rgb);
            assert_eq!(map.eval(-3.0), stops[0].rgb);
            assert_eq!(map.eval(7.0), stops[stops.len() - 1].rgb);
        }
    }

    #[test]
    fn gray_is_linear() {
        assert_eq!(Colormap::Gray.eval(0.5), [128, 128, 128]);
    }

    #[test]
    fn names_round_trip() {
        for &map in Colormap::ALL {
            assert_eq!(map.name().parse::<Colormap>().unwrap(), map);
        }
        assert!("jet".parse::<Colormap>().is_err());
    }
}
