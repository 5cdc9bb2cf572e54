//! Geographic helpers: great-circle distance and place-id derivation

/// Mean Earth radius in meters (spherical approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters, via the
/// haversine formula. Display accuracy only, not used for ranking.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Derive a stable place identifier from coordinates.
///
/// Coordinates are fixed to 6 decimal places (~0.1 m) so repeated favoriting
/// of the same location produces the same id.
pub fn place_id(latitude: f64, longitude: f64) -> String {
    format!("{latitude:.6},{longitude:.6}")
}

/// Parse a `"lat,lon"` place identifier back into coordinates.
pub fn parse_place_id(id: &str) -> Option<(f64, f64)> {
    let (lat, lon) = id.split_once(',')?;
    Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let d = haversine_distance(55.75, 37.61, 55.75, 37.61);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_known_distance_moscow_spb() {
        // Moscow (55.7558, 37.6173) to Saint Petersburg (59.9311, 30.3609)
        // reference great-circle distance ~634 km.
        let d = haversine_distance(55.7558, 37.6173, 59.9311, 30.3609);
        assert!((d - 634_000.0).abs() < 4_000.0, "got {d}");
    }

    #[test]
    fn test_known_distance_short_range() {
        // One degree of latitude is ~111.2 km on the sphere.
        let d = haversine_distance(55.0, 37.0, 56.0, 37.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = haversine_distance(48.8566, 2.3522, 51.5074, -0.1278);
        let b = haversine_distance(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_place_id_format() {
        assert_eq!(place_id(55.75, 37.61), "55.750000,37.610000");
        assert_eq!(place_id(-1.5, -0.25), "-1.500000,-0.250000");
    }

    #[test]
    fn test_place_id_collides_for_same_location() {
        // Differences below the fixed precision collapse to the same id.
        assert_eq!(place_id(55.7500001, 37.61), place_id(55.7500002, 37.61));
    }

    #[test]
    fn test_parse_place_id_round_trip() {
        let id = place_id(55.75, 37.61);
        let (lat, lon) = parse_place_id(&id).unwrap();
        assert!((lat - 55.75).abs() < 1e-6);
        assert!((lon - 37.61).abs() < 1e-6);
    }

    #[test]
    fn test_parse_place_id_rejects_garbage() {
        assert!(parse_place_id("no-comma").is_none());
        assert!(parse_place_id("a,b").is_none());
        assert!(parse_place_id("").is_none());
    }
}
