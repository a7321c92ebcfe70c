// Coordinate parsing and great-circle distance for scanner discovery.

use crate::error::ApiError;

/// Parses a "latitude, longitude" string, e.g. "40.714, -74.006".
pub fn parse_coordinates(raw: &str) -> Result<(f64, f64), ApiError> {
    let invalid = || ApiError::Validation("Coordinates has invalid format or not provided".into());
    let (lat, lon) = raw.split_once(',').ok_or_else(invalid)?;
    let latitude: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let longitude: f64 = lon.trim().parse().map_err(|_| invalid())?;
    if !latitude.is_finite()
        || latitude.abs() > 90.0
        || !longitude.is_finite()
        || longitude.abs() > 180.0
    {
        return Err(ApiError::Validation("Invalid coordinates".into()));
    }
    Ok((latitude, longitude))
}

/// Haversine great-circle distance in meters between two (lat, lon) points.
pub fn distance_meters(a: (f64, f64), b: (f64, f64), earth_radius_km: f64) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let h = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    // Rounding can push h just past 1.0 near antipodes; sqrt(1 - h) must stay real.
    let h = h.min(1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    earth_radius_km * c * 1000.0
}

pub fn within_radius(a: (f64, f64), b: (f64, f64), radius_m: f64, earth_radius_km: f64) -> bool {
    distance_meters(a, b, earth_radius_km) <= radius_m
}
