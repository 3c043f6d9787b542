//! Great-circle distance and nearest-candidate selection

use super::Coordinates;

/// Mean Earth radius used for every distance computation
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lon - from.lon).to_radians();

    // rounding can push `a` just past 1 near antipodes
    let a = ((d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Pick the candidate closest to `origin`.
///
/// Only a strictly smaller distance replaces the running minimum, so on a tie
/// the candidate yielded first wins. Returns `None` for an empty candidate set.
pub fn nearest<'a, I>(origin: Coordinates, candidates: I) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = (&'a str, Coordinates)>,
{
    let mut best: Option<&'a str> = None;
    let mut shortest = f64::MAX;

    for (name, coords) in candidates {
        let distance = haversine_km(origin, coords);
        if distance < shortest {
            shortest = distance;
            best = Some(name);
        }
    }

    best.map(|name| (name, shortest))
}
