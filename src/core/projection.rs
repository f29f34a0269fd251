//! Geodetic transform between WGS84 latitude/longitude and the national grid.
//!
//! The forward path is: WGS84 lat/long -> WGS84 Cartesian XYZ -> 7-parameter
//! Helmert -> Airy 1830 XYZ -> Airy 1830 lat/long -> transverse Mercator
//! easting/northing. The inverse mirrors it.
//!
//! Accuracy is around 5 m. The inverse Helmert step reuses the forward
//! parameters with every sign flipped instead of inverting the rotation
//! matrix; the difference is well below that tolerance and existing fixtures
//! depend on the exact output, so it is kept as is.
//!
//! All functions are total over `f64`: NaN and infinite inputs propagate to
//! the output instead of panicking.

use crate::core::constants::*;
use crate::core::geo::{CoordinateSystem, Point};

/// An ellipsoid defined by its semi-major and semi-minor axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub a: f64,
    pub b: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: WGS84_A,
        b: WGS84_B,
    };

    pub const AIRY1830: Ellipsoid = Ellipsoid {
        a: AIRY1830_A,
        b: AIRY1830_B,
    };

    /// First eccentricity squared
    pub fn e2(&self) -> f64 {
        (self.a * self.a - self.b * self.b) / (self.a * self.a)
    }
}

/// Earth-centred Cartesian coordinates in metres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Seven-parameter Helmert transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helmert {
    /// Translations in metres
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    /// Rotations in arc-seconds
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    /// Scale in parts per million
    pub s_ppm: f64,
}

impl Helmert {
    /// WGS84 to OSGB36 (Airy 1830)
    pub const WGS84_TO_OSGB36: Helmert = Helmert {
        tx: HELMERT_TX,
        ty: HELMERT_TY,
        tz: HELMERT_TZ,
        rx: HELMERT_RX,
        ry: HELMERT_RY,
        rz: HELMERT_RZ,
        s_ppm: HELMERT_S_PPM,
    };

    /// Approximate inverse: every parameter negated.
    pub fn reversed(&self) -> Helmert {
        Helmert {
            tx: -self.tx,
            ty: -self.ty,
            tz: -self.tz,
            rx: -self.rx,
            ry: -self.ry,
            rz: -self.rz,
            s_ppm: -self.s_ppm,
        }
    }

    pub fn apply(&self, p: Cartesian) -> Cartesian {
        let s1 = 1.0 + self.s_ppm * 1e-6;
        let rx = arcsec_to_rad(self.rx);
        let ry = arcsec_to_rad(self.ry);
        let rz = arcsec_to_rad(self.rz);

        Cartesian {
            x: self.tx + s1 * p.x - rz * p.y + ry * p.z,
            y: self.ty + rz * p.x + s1 * p.y - rx * p.z,
            z: self.tz - ry * p.x + rx * p.y + s1 * p.z,
        }
    }
}

fn arcsec_to_rad(arcsec: f64) -> f64 {
    (arcsec / 3600.0).to_radians()
}

/// Latitude/longitude (radians) plus ellipsoidal height to Cartesian XYZ
pub fn to_cartesian(lat: f64, lng: f64, height: f64, ellipsoid: Ellipsoid) -> Cartesian {
    let e2 = ellipsoid.e2();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let nu = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    Cartesian {
        x: (nu + height) * cos_lat * lng.cos(),
        y: (nu + height) * cos_lat * lng.sin(),
        z: ((1.0 - e2) * nu + height) * sin_lat,
    }
}

/// Cartesian XYZ to latitude/longitude (radians) and height.
///
/// Latitude is refined iteratively and the loop stops as soon as the change
/// between iterations stops shrinking, which also terminates on NaN.
pub fn from_cartesian(p: Cartesian, ellipsoid: Ellipsoid) -> (f64, f64, f64) {
    let e2 = ellipsoid.e2();
    let horizontal = (p.x * p.x + p.y * p.y).sqrt();

    let mut lat = p.z.atan2(horizontal * (1.0 - e2));
    let mut last_delta = f64::INFINITY;
    loop {
        let sin_lat = lat.sin();
        let nu = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let next = (p.z + e2 * nu * sin_lat).atan2(horizontal);
        let delta = (next - lat).abs();
        if !(delta < last_delta) {
            break;
        }
        lat = next;
        last_delta = delta;
        if delta == 0.0 {
            break;
        }
    }

    let lng = p.y.atan2(p.x);
    let sin_lat = lat.sin();
    let nu = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let height = horizontal / lat.cos() - nu;
    (lat, lng, height)
}

/// Meridional arc from the true origin latitude to `lat` (radians)
fn meridional_arc(lat: f64, ellipsoid: Ellipsoid) -> f64 {
    let Ellipsoid { a, b } = ellipsoid;
    let n = (a - b) / (a + b);
    let n2 = n * n;
    let n3 = n2 * n;
    let lat0 = GRID_LAT0.to_radians();
    let d = lat - lat0;
    let s = lat + lat0;

    let ma = (1.0 + n + 1.25 * n2 + 1.25 * n3) * d;
    let mb = (3.0 * n + 3.0 * n2 + 2.625 * n3) * d.sin() * s.cos();
    let mc = (1.875 * n2 + 1.875 * n3) * (2.0 * d).sin() * (2.0 * s).cos();
    let md = (35.0 / 24.0) * n3 * (3.0 * d).sin() * (3.0 * s).cos();
    b * GRID_F0 * (ma - mb + mc - md)
}

/// Radii of curvature `(nu, rho, eta2)` at `lat` scaled by the central scale factor
fn curvature(lat: f64, ellipsoid: Ellipsoid) -> (f64, f64, f64) {
    let e2 = ellipsoid.e2();
    let sin2 = lat.sin().powi(2);
    let nu = ellipsoid.a * GRID_F0 / (1.0 - e2 * sin2).sqrt();
    let rho = ellipsoid.a * GRID_F0 * (1.0 - e2) / (1.0 - e2 * sin2).powf(1.5);
    (nu, rho, nu / rho - 1.0)
}

/// Transverse Mercator projection of Airy 1830 lat/long (radians) to `(easting, northing)`
pub fn project(lat: f64, lng: f64) -> (f64, f64) {
    let ellipsoid = Ellipsoid::AIRY1830;
    let (nu, rho, eta2) = curvature(lat, ellipsoid);
    let m = meridional_arc(lat, ellipsoid);

    let (sin_lat, cos_lat) = lat.sin_cos();
    let cos3 = cos_lat.powi(3);
    let cos5 = cos_lat.powi(5);
    let tan2 = lat.tan().powi(2);
    let tan4 = tan2 * tan2;

    let i = m + GRID_N0;
    let ii = nu / 2.0 * sin_lat * cos_lat;
    let iii = nu / 24.0 * sin_lat * cos3 * (5.0 - tan2 + 9.0 * eta2);
    let iiia = nu / 720.0 * sin_lat * cos5 * (61.0 - 58.0 * tan2 + tan4);
    let iv = nu * cos_lat;
    let v = nu / 6.0 * cos3 * (nu / rho - tan2);
    let vi = nu / 120.0 * cos5 * (5.0 - 18.0 * tan2 + tan4 + 14.0 * eta2 - 58.0 * tan2 * eta2);

    let dl = lng - GRID_LON0.to_radians();
    let dl2 = dl * dl;

    let northing = i + ii * dl2 + iii * dl2 * dl2 + iiia * dl2 * dl2 * dl2;
    let easting = GRID_E0 + iv * dl + v * dl2 * dl + vi * dl2 * dl2 * dl;
    (easting, northing)
}

/// Inverse transverse Mercator: `(easting, northing)` to Airy 1830 lat/long (radians)
pub fn unproject(easting: f64, northing: f64) -> (f64, f64) {
    let ellipsoid = Ellipsoid::AIRY1830;
    let lat0 = GRID_LAT0.to_radians();

    let mut lat = (northing - GRID_N0) / (ellipsoid.a * GRID_F0) + lat0;
    let mut m = meridional_arc(lat, ellipsoid);
    // 0.01 mm; bounded so non-finite input cannot spin forever
    for _ in 0..32 {
        let residual = northing - GRID_N0 - m;
        if !(residual.abs() >= 1e-5) {
            break;
        }
        lat += residual / (ellipsoid.a * GRID_F0);
        m = meridional_arc(lat, ellipsoid);
    }

    let (nu, rho, eta2) = curvature(lat, ellipsoid);
    let tan = lat.tan();
    let tan2 = tan * tan;
    let tan4 = tan2 * tan2;
    let tan6 = tan4 * tan2;
    let sec = 1.0 / lat.cos();
    let nu3 = nu.powi(3);
    let nu5 = nu.powi(5);
    let nu7 = nu.powi(7);

    let vii = tan / (2.0 * rho * nu);
    let viii = tan / (24.0 * rho * nu3) * (5.0 + 3.0 * tan2 + eta2 - 9.0 * tan2 * eta2);
    let ix = tan / (720.0 * rho * nu5) * (61.0 + 90.0 * tan2 + 45.0 * tan4);
    let x = sec / nu;
    let xi = sec / (6.0 * nu3) * (nu / rho + 2.0 * tan2);
    let xii = sec / (120.0 * nu5) * (5.0 + 28.0 * tan2 + 24.0 * tan4);
    let xiia = sec / (5040.0 * nu7) * (61.0 + 662.0 * tan2 + 1320.0 * tan4 + 720.0 * tan6);

    let de = easting - GRID_E0;
    let de2 = de * de;
    let de3 = de2 * de;
    let de4 = de2 * de2;
    let de5 = de4 * de;
    let de6 = de4 * de2;
    let de7 = de6 * de;

    let lat_out = lat - vii * de2 + viii * de4 - ix * de6;
    let lng_out = GRID_LON0.to_radians() + x * de - xi * de3 + xii * de5 - xiia * de7;
    (lat_out, lng_out)
}

/// Moves a lat/long (radians) from one datum to another through a Helmert transform
fn shift_datum(lat: f64, lng: f64, from: Ellipsoid, helmert: &Helmert, to: Ellipsoid) -> (f64, f64) {
    let xyz = to_cartesian(lat, lng, 0.0, from);
    let shifted = helmert.apply(xyz);
    let (lat, lng, _) = from_cartesian(shifted, to);
    (lat, lng)
}

/// Converts a point to the national grid. Grid points are returned unchanged.
pub fn to_grid(point: Point) -> Point {
    if point.system() == CoordinateSystem::Grid {
        return point;
    }
    let (lat, lng) = shift_datum(
        point.lat().to_radians(),
        point.lng().to_radians(),
        Ellipsoid::WGS84,
        &Helmert::WGS84_TO_OSGB36,
        Ellipsoid::AIRY1830,
    );
    let (easting, northing) = project(lat, lng);
    Point::grid(easting, northing)
}

/// Converts a point to WGS84. Geodetic points are returned unchanged.
pub fn to_geodetic(point: Point) -> Point {
    if point.system() == CoordinateSystem::Wgs84 {
        return point;
    }
    let (lat, lng) = unproject(point.x(), point.y());
    let (lat, lng) = shift_datum(
        lat,
        lng,
        Ellipsoid::AIRY1830,
        &Helmert::WGS84_TO_OSGB36.reversed(),
        Ellipsoid::WGS84,
    );
    Point::geodetic(lat.to_degrees(), lng.to_degrees())
}
