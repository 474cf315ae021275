//! Geographic proximity selection.
//!
//! # Responsibilities
//! - Read `latitude`/`longitude` from each server's metadata
//! - Pick the server nearest to the client's own coordinates
//!
//! # Design Decisions
//! - Great-circle (haversine) distance on a spherical earth
//! - Exact ties are broken uniformly at random
//! - Servers without coordinates rank behind every located server

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::selector::context::CallContext;
use crate::selector::metadata::{sorted_entries, Metadata};
use crate::selector::Selector;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

#[derive(Debug)]
struct Located {
    server: String,
    distance: f64,
}

/// Selects the server geographically closest to the client.
#[derive(Debug)]
pub struct ClosestSelector {
    origin: GeoPoint,
    /// Sorted by distance, then address.
    servers: ArcSwap<Vec<Located>>,
}

impl ClosestSelector {
    pub fn new(servers: &HashMap<String, String>, origin: GeoPoint) -> Self {
        Self {
            origin,
            servers: ArcSwap::from_pointee(locate(servers, &origin)),
        }
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }
}

fn locate(servers: &HashMap<String, String>, origin: &GeoPoint) -> Vec<Located> {
    let mut located: Vec<Located> = sorted_entries(servers)
        .into_iter()
        .map(|(addr, raw)| {
            let meta = Metadata::parse(raw);
            let distance = match (meta.latitude(), meta.longitude()) {
                (Some(lat), Some(lon)) => origin.distance_km(&GeoPoint::new(lat, lon)),
                _ => f64::INFINITY,
            };
            Located {
                server: addr.to_owned(),
                distance,
            }
        })
        .collect();
    // Stable sort keeps address order among equal distances.
    located.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    located
}

impl Selector for ClosestSelector {
    fn select(
        &self,
        _ctx: &CallContext,
        _service_path: &str,
        _service_method: &str,
        _args: Option<&[u8]>,
    ) -> Option<String> {
        let servers = self.servers.load();
        let nearest = servers.first()?;
        let ties = servers
            .iter()
            .take_while(|s| s.distance == nearest.distance)
            .count();
        Some(servers[fastrand::usize(..ties)].server.clone())
    }

    fn update_server(&self, servers: &HashMap<String, String>) {
        let located = locate(servers, &self.origin);
        tracing::debug!(
            servers = located.len(),
            nearest = located.first().map(|s| s.server.as_str()),
            "Rebuilt proximity table"
        );
        self.servers.store(Arc::new(located));
    }

    fn name(&self) -> &'static str {
        "closest"
    }

    fn len(&self) -> usize {
        self.servers.load().len()
    }
}
