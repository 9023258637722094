//! Geodesy helpers and landing-zone geometry.
//!
//! Distances use the haversine formula on a spherical Earth. Over launch-site
//! ranges (a few kilometres) the error against an ellipsoidal geodesic is
//! well under a metre per kilometre.

use serde::Serialize;

/// IUGG mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance in metres between two (lat, lon) points in degrees.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

/// Displacement of a point relative to an origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoOffset {
    /// Signed distance along the origin's meridian, positive northwards.
    pub north_m: f64,
    /// Signed distance along the origin's parallel, positive eastwards.
    pub east_m: f64,
    /// Great-circle distance.
    pub range_m: f64,
}

pub fn offset_from(origin_lat: f64, origin_lon: f64, lat: f64, lon: f64) -> GeoOffset {
    let north = haversine_m(origin_lat, origin_lon, lat, origin_lon);
    let east = haversine_m(origin_lat, origin_lon, origin_lat, lon);
    GeoOffset {
        north_m: if lat < origin_lat { -north } else { north },
        east_m: if lon < origin_lon { -east } else { east },
        range_m: haversine_m(origin_lat, origin_lon, lat, lon),
    }
}

/// Permitted landing area as a closed polygon of (lat, lon) vertices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandingZone {
    name: String,
    vertices: Vec<(f64, f64)>,
}

impl LandingZone {
    pub fn new(name: impl Into<String>, vertices: Vec<(f64, f64)>) -> Self {
        Self {
            name: name.into(),
            vertices,
        }
    }

    /// Sea landing area off the Noshiro launch site.
    pub fn noshiro_sea() -> Self {
        Self::new("noshiro_sea", NOSHIRO_SEA_VERTICES.to_vec())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// Distance in metres from the point to the zone boundary: positive when
    /// the point lies inside the zone, negative outside.
    ///
    /// Computed in an equirectangular frame centred on the point.
    pub fn signed_distance_m(&self, lat: f64, lon: f64) -> f64 {
        if self.vertices.len() < 3 {
            return f64::NEG_INFINITY;
        }

        let scale_x = EARTH_RADIUS_M * lat.to_radians().cos();
        let projected: Vec<(f64, f64)> = self
            .vertices
            .iter()
            .map(|(v_lat, v_lon)| {
                (
                    (v_lon - lon).to_radians() * scale_x,
                    (v_lat - lat).to_radians() * EARTH_RADIUS_M,
                )
            })
            .collect();

        let mut inside = false;
        let mut nearest = f64::INFINITY;
        for idx in 0..projected.len() {
            let a = projected[idx];
            let b = projected[(idx + 1) % projected.len()];
            nearest = nearest.min(origin_to_segment(a, b));

            // Ray cast along +x from the origin.
            if (a.1 > 0.0) != (b.1 > 0.0) {
                let x_cross = a.0 + (0.0 - a.1) * (b.0 - a.0) / (b.1 - a.1);
                if x_cross > 0.0 {
                    inside = !inside;
                }
            }
        }

        if inside {
            nearest
        } else {
            -nearest
        }
    }
}

fn origin_to_segment(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq == 0.0 {
        0.0
    } else {
        (-(a.0 * dx + a.1 * dy) / length_sq).clamp(0.0, 1.0)
    };
    let (px, py) = (a.0 + t * dx, a.1 + t * dy);
    (px * px + py * py).sqrt()
}

const NOSHIRO_SEA_VERTICES: [(f64, f64); 33] = [
    (40.26149300294178, 140.0094791592612),
    (40.2642602688727, 139.9932398872506),
    (40.26460197870949, 139.9909318144494),
    (40.26479085228271, 139.987341377515),
    (40.26433616899444, 139.9822728225093),
    (40.26299626432305, 139.9772825248559),
    (40.26199299246836, 139.9749085824227),
    (40.26086444600114, 139.9728365038179),
    (40.25942370332147, 139.9707401748826),
    (40.25768975453263, 139.9687716646912),
    (40.25623515050533, 139.9674723780254),
    (40.2542151641483, 139.9660514425467),
    (40.25321298436799, 139.9655135448727),
    (40.25217003129539, 139.9650383050235),
    (40.25108666779969, 139.9646461338833),
    (40.24955206871581, 139.9642513745098),
    (40.24773454477712, 139.9640056563258),
    (40.24539983694682, 139.9640511121102),
    (40.24374397618987, 139.9643229542895),
    (40.2425575973181, 139.9646499711443),
    (40.24051201896022, 139.9654720128462),
    (40.2397071808194, 139.9658925750851),
    (40.23887443488726, 139.9663943856586),
    (40.23809058315737, 139.9669364758578),
    (40.23665050758729, 139.9680927149552),
    (40.23501881430268, 139.9697393127221),
    (40.23327859167702, 139.9720099153484),
    (40.2318726711675, 139.9743989893189),
    (40.23049586884894, 139.9776040232665),
    (40.22954585557037, 139.9808509371636),
    (40.22916933193805, 139.9828861110256),
    (40.22887535311624, 139.9845918728399),
    (40.22617410359279, 140.0002466848887),
];
