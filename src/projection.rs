//! Coordinate conversions between WGS84, Swiss LV95, slippy-map tile
//! pixels and the local scene plane.
//!
//! All functions are pure. Latitudes outside (-90°, 90°) are outside
//! the contract and produce meaningless values.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::error::NavError;
use crate::geometry::Point;
use crate::types::{GeoBox, GeoPoint, ProjectedPoint, TilePixel, WorldBounds};

// -- Ellipsoids ----------------------------------------------------

struct Ellipsoid {
    a: f64,
    /// First eccentricity squared.
    es: f64,
}

impl Ellipsoid {
    fn e(&self) -> f64 {
        self.es.sqrt()
    }

    fn to_geocentric(&self, lat: f64, lon: f64, h: f64) -> (f64, f64, f64) {
        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = self.a / (1.0 - self.es * sin_lat * sin_lat).sqrt();
        (
            (n + h) * cos_lat * lon.cos(),
            (n + h) * cos_lat * lon.sin(),
            (n * (1.0 - self.es) + h) * sin_lat,
        )
    }

    /// Returns (lat, lon, h) in radians / metres.
    fn to_geodetic(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        let p = x.hypot(y);
        let lon = y.atan2(x);
        let mut lat = z.atan2(p * (1.0 - self.es));
        let mut h = 0.0;
        for _ in 0..20 {
            let sin_lat = lat.sin();
            let n = self.a / (1.0 - self.es * sin_lat * sin_lat).sqrt();
            h = p / lat.cos() - n;
            let next = z.atan2(p * (1.0 - self.es * n / (n + h)));
            let done = (next - lat).abs() < 1e-15;
            lat = next;
            if done {
                break;
            }
        }
        (lat, lon, h)
    }
}

const WGS84_F: f64 = 1.0 / 298.257_223_563;
const BESSEL_F: f64 = 1.0 / 299.152_812_8;

const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    es: WGS84_F * (2.0 - WGS84_F),
};
const BESSEL: Ellipsoid = Ellipsoid {
    a: 6_377_397.155,
    es: BESSEL_F * (2.0 - BESSEL_F),
};

/// Geocentric translation from the CH1903+ datum to WGS84 (metres).
const TO_WGS84: (f64, f64, f64) = (674.374, 15.056, 405.346);

// -- Swiss oblique Mercator ----------------------------------------

const LV95_LAT0_DEG: f64 = 46.952_405_555_555_56;
const LV95_LON0_DEG: f64 = 7.439_583_333_333_333;
const LV95_K0: f64 = 1.0;
const LV95_FALSE_EASTING: f64 = 2_600_000.0;
const LV95_FALSE_NORTHING: f64 = 1_200_000.0;

#[inline]
fn aasin(v: f64) -> f64 {
    v.clamp(-1.0, 1.0).asin()
}

/// Oblique conformal projection via a sphere tangent at the
/// projection centre, on the Bessel ellipsoid.
struct ObliqueMercator {
    e: f64,
    hlf_e: f64,
    rone_es: f64,
    c: f64,
    k: f64,
    kr: f64,
    sinp0: f64,
    cosp0: f64,
}

impl ObliqueMercator {
    fn lv95() -> Self {
        let es = BESSEL.es;
        let e = BESSEL.e();
        let hlf_e = 0.5 * e;
        let one_es = 1.0 - es;
        let rone_es = 1.0 / one_es;
        let phi0 = LV95_LAT0_DEG.to_radians();

        let cp = phi0.cos().powi(2);
        let c = (1.0 + es * cp * cp * rone_es).sqrt();
        let sinp0 = phi0.sin() / c;
        let phip0 = aasin(sinp0);
        let cosp0 = phip0.cos();
        let sp = phi0.sin() * e;
        let k = (FRAC_PI_4 + 0.5 * phip0).tan().ln()
            - c * ((FRAC_PI_4 + 0.5 * phi0).tan().ln() - hlf_e * ((1.0 + sp) / (1.0 - sp)).ln());
        let kr = LV95_K0 * one_es.sqrt() / (1.0 - sp * sp);

        Self {
            e,
            hlf_e,
            rone_es,
            c,
            k,
            kr,
            sinp0,
            cosp0,
        }
    }

    /// `lam` is relative to the central meridian. Output is in units
    /// of the semi-major axis.
    fn forward(&self, lam: f64, phi: f64) -> (f64, f64) {
        let sp = self.e * phi.sin();
        let phip = 2.0
            * (self.c
                * ((FRAC_PI_4 + 0.5 * phi).tan().ln() - self.hlf_e * ((1.0 + sp) / (1.0 - sp)).ln())
                + self.k)
                .exp()
                .atan()
            - FRAC_PI_2;
        let lamp = self.c * lam;
        let cp = phip.cos();
        let phipp = aasin(self.cosp0 * phip.sin() - self.sinp0 * cp * lamp.cos());
        let lampp = aasin(cp * lamp.sin() / phipp.cos());
        (self.kr * lampp, self.kr * (FRAC_PI_4 + 0.5 * phipp).tan().ln())
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let phipp = 2.0 * ((y / self.kr).exp().atan() - FRAC_PI_4);
        let lampp = x / self.kr;
        let cp = phipp.cos();
        let mut phip = aasin(self.cosp0 * phipp.sin() + self.sinp0 * cp * lampp.cos());
        let lamp = aasin(cp * lampp.sin() / phip.cos());
        let con = (self.k - (FRAC_PI_4 + 0.5 * phip).tan().ln()) / self.c;
        for _ in 0..30 {
            let esp = self.e * phip.sin();
            let delp = (con + (FRAC_PI_4 + 0.5 * phip).tan().ln()
                - self.hlf_e * ((1.0 + esp) / (1.0 - esp)).ln())
                * (1.0 - esp * esp)
                * phip.cos()
                * self.rone_es;
            phip -= delp;
            if delp.abs() < 1e-15 {
                break;
            }
        }
        (lamp / self.c, phip)
    }
}

/// WGS84 latitude/longitude to Swiss LV95 easting/northing.
pub fn geo_to_projected(latitude: f64, longitude: f64) -> ProjectedPoint {
    let (x, y, z) = WGS84.to_geocentric(latitude.to_radians(), longitude.to_radians(), 0.0);
    let (lat_b, lon_b, _) = BESSEL.to_geodetic(x - TO_WGS84.0, y - TO_WGS84.1, z - TO_WGS84.2);

    let proj = ObliqueMercator::lv95();
    let (px, py) = proj.forward(lon_b - LV95_LON0_DEG.to_radians(), lat_b);
    ProjectedPoint {
        easting: BESSEL.a * px + LV95_FALSE_EASTING,
        northing: BESSEL.a * py + LV95_FALSE_NORTHING,
    }
}

/// Swiss LV95 easting/northing back to WGS84 latitude/longitude.
///
/// The Bessel ellipsoidal height is solved for so the resulting point
/// lies on the WGS84 ellipsoid, which makes surface points round-trip
/// exactly through `geo_to_projected`.
pub fn projected_to_geo(p: ProjectedPoint) -> GeoPoint {
    let proj = ObliqueMercator::lv95();
    let (lam, lat_b) = proj.inverse(
        (p.easting - LV95_FALSE_EASTING) / BESSEL.a,
        (p.northing - LV95_FALSE_NORTHING) / BESSEL.a,
    );
    let lon_b = lam + LV95_LON0_DEG.to_radians();

    let mut h_b = 0.0;
    let mut geo = (lat_b, lon_b, 0.0);
    for _ in 0..8 {
        let (x, y, z) = BESSEL.to_geocentric(lat_b, lon_b, h_b);
        geo = WGS84.to_geodetic(x + TO_WGS84.0, y + TO_WGS84.1, z + TO_WGS84.2);
        if geo.2.abs() < 1e-7 {
            break;
        }
        h_b -= geo.2;
    }

    GeoPoint {
        latitude: geo.0.to_degrees(),
        longitude: geo.1.to_degrees(),
    }
}

// -- Slippy tiles --------------------------------------------------

#[inline]
fn tiles_at(zoom: u32) -> f64 {
    2f64.powi(zoom as i32)
}

pub fn lon_to_tile_x(longitude: f64, zoom: u32) -> f64 {
    (longitude + 180.0) / 360.0 * tiles_at(zoom)
}

pub fn lat_to_tile_y(latitude: f64, zoom: u32) -> f64 {
    let lat = latitude.to_radians();
    (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * tiles_at(zoom)
}

pub fn tile_x_to_lon(x: f64, zoom: u32) -> f64 {
    x / tiles_at(zoom) * 360.0 - 180.0
}

pub fn tile_y_to_lat(y: f64, zoom: u32) -> f64 {
    let n = PI - 2.0 * PI * y / tiles_at(zoom);
    n.sinh().atan().to_degrees()
}

pub fn geo_to_tile_pixel(latitude: f64, longitude: f64, zoom: u32) -> TilePixel {
    TilePixel {
        x: lon_to_tile_x(longitude, zoom),
        y: lat_to_tile_y(latitude, zoom),
    }
}

pub fn tile_pixel_to_geo(tile: TilePixel, zoom: u32) -> GeoPoint {
    GeoPoint {
        latitude: tile_y_to_lat(tile.y, zoom),
        longitude: tile_x_to_lon(tile.x, zoom),
    }
}

// -- Local plane ---------------------------------------------------

/// Tile pixels to the local plane.
///
/// Tile Y grows southwards from the top-left tile corner while local Y
/// grows northwards from the bottom-left one, hence the flip and the
/// one-tile offset.
pub fn tile_pixel_to_local(tile: TilePixel, bounds: &WorldBounds) -> Point {
    let ratio_x = bounds.x_bounds / bounds.x_delta;
    let ratio_z = bounds.z_bounds / bounds.z_delta;
    (
        (tile.x - bounds.xmin) * ratio_x - bounds.x_bounds / 2.0,
        (bounds.zmax - (tile.y - 1.0)) * ratio_z - bounds.z_bounds / 2.0,
    )
}

pub fn local_to_tile_pixel(p: Point, bounds: &WorldBounds) -> TilePixel {
    let ratio_x = bounds.x_bounds / bounds.x_delta;
    let ratio_z = bounds.z_bounds / bounds.z_delta;
    TilePixel {
        x: (p.0 + bounds.x_bounds / 2.0) / ratio_x + bounds.xmin,
        y: bounds.zmax + 1.0 - (p.1 + bounds.z_bounds / 2.0) / ratio_z,
    }
}

pub fn geo_to_local(g: GeoPoint, bounds: &WorldBounds) -> Point {
    tile_pixel_to_local(geo_to_tile_pixel(g.latitude, g.longitude, bounds.zoom), bounds)
}

pub fn local_to_geo(p: Point, bounds: &WorldBounds) -> GeoPoint {
    tile_pixel_to_geo(local_to_tile_pixel(p, bounds), bounds.zoom)
}

impl WorldBounds {
    /// Snap a geographic box to whole tiles at `zoom` and size the
    /// local plane so it is `terrain_width` wide, keeping the tile
    /// aspect ratio.
    pub fn from_geo_box(area: &GeoBox, zoom: u32, terrain_width: f64) -> Result<Self, NavError> {
        let min_tile = geo_to_tile_pixel(area.min_latitude, area.min_longitude, zoom);
        let max_tile = geo_to_tile_pixel(area.max_latitude, area.max_longitude, zoom);
        let tile_xmin = min_tile.x.floor() + 1.0;
        let tile_zmin = min_tile.y.floor() + 1.0;
        let tile_xmax = max_tile.x.floor();
        let tile_zmax = max_tile.y.floor() + 2.0;

        let corner_a = tile_pixel_to_geo(TilePixel { x: tile_xmin, y: tile_zmin - 1.0 }, zoom);
        let corner_b = tile_pixel_to_geo(TilePixel { x: tile_xmax, y: tile_zmax - 1.0 }, zoom);

        let raw_xmin = tile_xmin.min(tile_xmax);
        let raw_xmax = tile_xmin.max(tile_xmax);
        let raw_zmin = tile_zmin.min(tile_zmax);
        let raw_zmax = tile_zmin.max(tile_zmax);
        let x_delta = raw_xmax - raw_xmin;
        let z_delta = raw_zmax - raw_zmin;
        if x_delta <= 0.0 || z_delta <= 0.0 {
            return Err(NavError::InvalidParams(format!(
                "area covers no whole tile at zoom {zoom}"
            )));
        }
        if terrain_width <= 0.0 {
            return Err(NavError::InvalidParams("terrain width must be positive".into()));
        }

        Ok(Self {
            zoom,
            x_bounds: terrain_width,
            z_bounds: terrain_width * z_delta / x_delta,
            x_delta,
            z_delta,
            xmin: raw_xmin,
            zmax: raw_zmax,
            covered: Some(GeoBox {
                min_latitude: corner_a.latitude.min(corner_b.latitude),
                min_longitude: corner_a.longitude.min(corner_b.longitude),
                max_latitude: corner_a.latitude.max(corner_b.latitude),
                max_longitude: corner_a.longitude.max(corner_b.longitude),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> WorldBounds {
        WorldBounds {
            zoom: 17,
            x_bounds: 200.0,
            z_bounds: 100.0,
            x_delta: 4.0,
            z_delta: 2.0,
            xmin: 100.0,
            zmax: 50.0,
            covered: None,
        }
    }

    #[test]
    fn projection_centre_maps_near_false_origin() {
        // Old Bern observatory, the LV95 fundamental point.
        let p = geo_to_projected(46.951_082_8, 7.438_637_2);
        assert!((p.easting - 2_600_000.0).abs() < 5.0, "{p:?}");
        assert!((p.northing - 1_200_000.0).abs() < 5.0, "{p:?}");
    }

    #[test]
    fn known_lv95_reference_point() {
        // 46°2'38.87" N, 8°43'49.79" E is (2 700 000, 1 100 000).
        let p = geo_to_projected(46.044_130_6, 8.730_497_2);
        assert!((p.easting - 2_700_000.0).abs() < 5.0, "{p:?}");
        assert!((p.northing - 1_100_000.0).abs() < 5.0, "{p:?}");
    }

    #[test]
    fn projected_round_trip() {
        for &(lat, lon) in &[
            (46.778_943_6, 6.642_645_6),
            (47.376_9, 8.541_7),
            (45.9, 10.4),
            (46.952_405, 7.439_583),
        ] {
            let g = projected_to_geo(geo_to_projected(lat, lon));
            assert!((g.latitude - lat).abs() < 1e-6, "{lat} -> {}", g.latitude);
            assert!((g.longitude - lon).abs() < 1e-6, "{lon} -> {}", g.longitude);
        }
    }

    #[test]
    fn tile_math_reference_values() {
        let t = geo_to_tile_pixel(0.0, 0.0, 0);
        assert!((t.x - 0.5).abs() < 1e-12);
        assert!((t.y - 0.5).abs() < 1e-12);
        assert!(lon_to_tile_x(-180.0, 1).abs() < 1e-12);
        assert!((tile_y_to_lat(0.0, 0) - 85.051_128_78).abs() < 1e-6);
    }

    #[test]
    fn tile_pixel_round_trip() {
        for &(lat, lon) in &[(46.7789, 6.6426), (-33.86, 151.21), (64.1, -21.9)] {
            let g = tile_pixel_to_geo(geo_to_tile_pixel(lat, lon, 17), 17);
            assert!((g.latitude - lat).abs() < 1e-9);
            assert!((g.longitude - lon).abs() < 1e-9);
        }
    }

    #[test]
    fn local_plane_corners_flip_vertically() {
        let b = bounds();
        // Top-left of the loaded range sits one tile below zmax + 1.
        let bottom_left = tile_pixel_to_local(TilePixel { x: 100.0, y: 51.0 }, &b);
        assert_eq!(bottom_left, (-100.0, -50.0));
        let top_right = tile_pixel_to_local(TilePixel { x: 104.0, y: 49.0 }, &b);
        assert_eq!(top_right, (100.0, 50.0));
    }

    #[test]
    fn local_round_trip() {
        let area = GeoBox {
            min_latitude: 46.7789,
            min_longitude: 6.6426,
            max_latitude: 46.7827,
            max_longitude: 6.6529,
        };
        let b = WorldBounds::from_geo_box(&area, 17, 400.0).expect("bounds");
        for &(lat, lon) in &[(46.7800, 6.6450), (46.7815, 6.6500)] {
            let local = geo_to_local(GeoPoint { latitude: lat, longitude: lon }, &b);
            let tile = local_to_tile_pixel(local, &b);
            let direct = geo_to_tile_pixel(lat, lon, 17);
            assert!((tile.x - direct.x).abs() < 1e-9);
            assert!((tile.y - direct.y).abs() < 1e-9);
            let g = local_to_geo(local, &b);
            assert!((g.latitude - lat).abs() < 1e-6);
            assert!((g.longitude - lon).abs() < 1e-6);
        }
    }

    #[test]
    fn bounds_from_geo_box_keep_tile_aspect() {
        let area = GeoBox {
            min_latitude: 46.7789,
            min_longitude: 6.6426,
            max_latitude: 46.7827,
            max_longitude: 6.6529,
        };
        let b = WorldBounds::from_geo_box(&area, 17, 400.0).expect("bounds");
        assert!(b.x_delta >= 1.0 && b.z_delta >= 1.0);
        assert!((b.z_bounds / b.x_bounds - b.z_delta / b.x_delta).abs() < 1e-12);
        let covered = b.covered.expect("covered box");
        assert!(covered.min_latitude < covered.max_latitude);
        assert!(covered.min_longitude < covered.max_longitude);
    }

    #[test]
    fn box_within_one_tile_column_is_rejected() {
        // Spans tile x 10.89..11.21 at zoom 10: no whole tile inside.
        let area = GeoBox {
            min_latitude: 10.0,
            min_longitude: -176.17,
            max_latitude: 11.0,
            max_longitude: -176.06,
        };
        assert!(WorldBounds::from_geo_box(&area, 10, 400.0).is_err());

        let wide = GeoBox {
            min_longitude: -178.0,
            ..area
        };
        assert!(WorldBounds::from_geo_box(&wide, 10, 400.0).is_ok());
        assert!(WorldBounds::from_geo_box(&wide, 10, 0.0).is_err());
    }
}
