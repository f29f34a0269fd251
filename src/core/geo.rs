use crate::core::constants::{GRID_HEIGHT, GRID_SQUARE_METRES, GRID_WIDTH};
use crate::core::projection;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate system a [`Point`] is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// WGS84 latitude/longitude in degrees (x = longitude, y = latitude)
    Wgs84,
    /// National grid eastings/northings in metres
    Grid,
}

/// An immutable 2D position tagged with its coordinate system.
///
/// A point never changes system implicitly: use [`Point::to_grid`] or
/// [`Point::to_geodetic`] to convert before mixing systems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f64,
    y: f64,
    system: CoordinateSystem,
}

impl Point {
    /// Creates a geodetic point from latitude and longitude in degrees
    pub fn geodetic(lat: f64, lng: f64) -> Self {
        Self {
            x: lng,
            y: lat,
            system: CoordinateSystem::Wgs84,
        }
    }

    /// Creates a grid point from easting and northing in metres
    pub fn grid(easting: f64, northing: f64) -> Self {
        Self {
            x: easting,
            y: northing,
            system: CoordinateSystem::Grid,
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn system(&self) -> CoordinateSystem {
        self.system
    }

    pub fn is_grid(&self) -> bool {
        self.system == CoordinateSystem::Grid
    }

    /// Latitude in degrees. Only meaningful for geodetic points.
    pub fn lat(&self) -> f64 {
        self.y
    }

    /// Longitude in degrees. Only meaningful for geodetic points.
    pub fn lng(&self) -> f64 {
        self.x
    }

    /// Converts to the national grid (identity for grid points)
    pub fn to_grid(&self) -> Point {
        projection::to_grid(*self)
    }

    /// Converts to WGS84 (identity for geodetic points)
    pub fn to_geodetic(&self) -> Point {
        projection::to_geodetic(*self)
    }

    /// Whether a grid point lies inside the national grid extent
    pub fn is_within_grid(&self) -> bool {
        self.is_grid()
            && self.x >= 0.0
            && self.x < GRID_WIDTH
            && self.y >= 0.0
            && self.y < GRID_HEIGHT
    }

    /// Euclidean distance to another point in the same system.
    /// Points in different systems are converted to the grid first.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let (a, b) = if self.system == other.system {
            (*self, *other)
        } else {
            (self.to_grid(), other.to_grid())
        };
        let dx = a.x - b.x;
        let dy = a.y - b.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Formats a grid reference with `digits` digits per axis (0..=5).
    ///
    /// Returns `None` for points outside the grid.
    pub fn to_grid_reference(&self, digits: usize) -> Option<String> {
        GridReference::from_point(&self.to_grid(), digits).map(|r| r.to_string())
    }

    /// Parses a grid reference such as `"SK35"` or `"TQ 30080 80568"`.
    ///
    /// The result is the south-west corner of the referenced square.
    pub fn parse_grid_reference(reference: &str) -> Result<Point> {
        reference.parse::<GridReference>().map(|r| r.to_point())
    }
}

/// A parsed national grid reference: two square letters plus a digit pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridReference {
    letters: [char; 2],
    easting: u32,
    northing: u32,
    digits: usize,
}

impl GridReference {
    /// Maximum digits per axis (1 metre resolution)
    pub const MAX_DIGITS: usize = 5;

    /// Builds the reference of the square containing `point` at the given precision
    pub fn from_point(point: &Point, digits: usize) -> Option<Self> {
        if !point.is_within_grid() || digits > Self::MAX_DIGITS {
            return None;
        }

        let e100k = (point.x / GRID_SQUARE_METRES).floor() as i32;
        let n100k = (point.y / GRID_SQUARE_METRES).floor() as i32;

        // 500km letter from the false origin at square SV, then the 100km letter
        let mut l1 = (19 - n100k) - (19 - n100k) % 5 + (e100k + 10) / 5;
        let mut l2 = (19 - n100k) * 5 % 25 + e100k % 5;
        // no letter I
        if l1 > 7 {
            l1 += 1;
        }
        if l2 > 7 {
            l2 += 1;
        }

        let resolution = 10_u32.pow((Self::MAX_DIGITS - digits) as u32);
        let within_e = (point.x - e100k as f64 * GRID_SQUARE_METRES).floor() as u32;
        let within_n = (point.y - n100k as f64 * GRID_SQUARE_METRES).floor() as u32;

        Some(Self {
            letters: [letter(l1)?, letter(l2)?],
            easting: within_e / resolution,
            northing: within_n / resolution,
            digits,
        })
    }

    pub fn digits(&self) -> usize {
        self.digits
    }

    /// Size of the referenced square in metres
    pub fn resolution(&self) -> f64 {
        10_f64.powi((Self::MAX_DIGITS - self.digits) as i32)
    }

    /// South-west corner of the referenced square
    pub fn to_point(&self) -> Point {
        let mut l1 = self.letters[0] as i32 - 'A' as i32;
        let mut l2 = self.letters[1] as i32 - 'A' as i32;
        if l1 > 7 {
            l1 -= 1;
        }
        if l2 > 7 {
            l2 -= 1;
        }

        let e100k = ((l1 - 2).rem_euclid(5)) * 5 + l2 % 5;
        let n100k = (19 - (l1 / 5) * 5) - l2 / 5;

        let resolution = self.resolution();
        Point::grid(
            e100k as f64 * GRID_SQUARE_METRES + self.easting as f64 * resolution,
            n100k as f64 * GRID_SQUARE_METRES + self.northing as f64 * resolution,
        )
    }
}

fn letter(index: i32) -> Option<char> {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| (b'A' + i) as char)
}

impl fmt::Display for GridReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letters[0], self.letters[1])?;
        if self.digits > 0 {
            write!(
                f,
                "{:0width$}{:0width$}",
                self.easting,
                self.northing,
                width = self.digits
            )?;
        }
        Ok(())
    }
}

impl std::str::FromStr for GridReference {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || MapError::InvalidGridReference(s.to_string());
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        let mut chars = compact.chars();
        let l1 = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
        let l2 = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
        for l in [l1, l2] {
            if !l.is_ascii_uppercase() || l == 'I' {
                return Err(invalid());
            }
        }

        let numbers = chars.as_str();
        if numbers.len() % 2 != 0
            || numbers.len() > 2 * Self::MAX_DIGITS
            || !numbers.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let digits = numbers.len() / 2;
        let (e, n) = numbers.split_at(digits);
        let parse = |part: &str| -> Result<u32> {
            if part.is_empty() {
                Ok(0)
            } else {
                part.parse::<u32>().map_err(|_| invalid())
            }
        };

        let reference = Self {
            letters: [l1, l2],
            easting: parse(e)?,
            northing: parse(n)?,
            digits,
        };

        // letters that exist but name a square off the grid
        if !reference.to_point().is_within_grid() {
            return Err(invalid());
        }
        Ok(reference)
    }
}
