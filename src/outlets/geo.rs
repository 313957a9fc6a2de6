//! Distance helpers and the outlet density analysis.

use std::collections::BTreeMap;

use serde::Serialize;

use super::model::Outlet;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two `(lat, lng)` points in kilometres.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lng2) = (to.0.to_radians(), to.1.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = lng2 - lng1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Serialize)]
pub struct OutletDensity {
    pub name: String,
    pub address: String,
    pub nearby_count: usize,
    pub nearby: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DensityReport {
    pub radius_km: f64,
    pub outlets: Vec<OutletDensity>,
    /// Number of outlets keyed by how many neighbours they have.
    pub histogram: BTreeMap<usize, usize>,
}

/// Counts, for every geocoded outlet, the other outlets within `radius_km`.
///
/// Outlets without coordinates are left out. Rows are sorted by neighbour
/// count, busiest first, ties broken by name.
pub fn density_report(outlets: &[Outlet], radius_km: f64) -> DensityReport {
    let located: Vec<(&Outlet, (f64, f64))> = outlets
        .iter()
        .filter_map(|outlet| outlet.coordinates().map(|point| (outlet, point)))
        .collect();

    let mut rows: Vec<OutletDensity> = located
        .iter()
        .enumerate()
        .map(|(index, (outlet, point))| {
            let nearby: Vec<String> = located
                .iter()
                .enumerate()
                .filter(|(other_index, (_, other_point))| {
                    *other_index != index && haversine_km(*point, *other_point) <= radius_km
                })
                .map(|(_, (other, _))| other.name.clone())
                .collect();

            OutletDensity {
                name: outlet.name.clone(),
                address: outlet.address.clone(),
                nearby_count: nearby.len(),
                nearby,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.nearby_count
            .cmp(&a.nearby_count)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut histogram = BTreeMap::new();
    for row in &rows {
        *histogram.entry(row.nearby_count).or_insert(0) += 1;
    }

    DensityReport {
        radius_km,
        outlets: rows,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located(name: &str, lat: f64, lng: f64) -> Outlet {
        Outlet::new(name, format!("{} address", name), "x", "w").with_coordinates(Some((lat, lng)))
    }

    #[test]
    fn haversine_known_distance() {
        // KLCC to KL Sentral is roughly 4 km.
        let km = haversine_km((3.1579, 101.7123), (3.1340, 101.6862));
        assert!((3.5..4.5).contains(&km), "got {km}");
        assert!(haversine_km((3.0, 101.0), (3.0, 101.0)).abs() < 1e-9);
    }

    #[test]
    fn density_counts_neighbours_within_radius() {
        let outlets = vec![
            located("KLCC", 3.1579, 101.7123),
            located("Pavilion", 3.1490, 101.7130),
            located("Sentral", 3.1340, 101.6862),
            located("Putrajaya", 2.9264, 101.6964),
            Outlet::new("Unlocated", "somewhere", "x", "w"),
        ];

        let report = density_report(&outlets, 5.0);
        assert_eq!(report.outlets.len(), 4);

        let klcc = report.outlets.iter().find(|o| o.name == "KLCC").unwrap();
        assert_eq!(klcc.nearby_count, 2);
        assert!(klcc.nearby.contains(&"Pavilion".to_string()));

        let putrajaya = report.outlets.last().unwrap();
        assert_eq!(putrajaya.name, "Putrajaya");
        assert_eq!(putrajaya.nearby_count, 0);

        assert_eq!(report.histogram.get(&0), Some(&1));
        assert_eq!(report.histogram.values().sum::<usize>(), 4);
    }
}
