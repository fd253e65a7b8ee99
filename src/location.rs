//! Proximity-based location estimation
//!
//! For each window, every beacon's signal-strength samples are summarized and
//! the beacon with the highest mean (least negative dBm) is taken as the
//! closest location. On equal means the lowest identifier wins.

use crate::timestamp::{parse_timestamp, WindowKey};
use crate::types::{
    round_to, DeviceId, DeviceRecord, LocationAnalysis, LocationWindow, SignalSummary,
    SIGNAL_STRENGTH_CHANNEL,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Decimal places kept for mean signal strength
const RSSI_DECIMALS: i32 = 2;

/// Locator for proximity beacons
pub struct ProximityLocator;

impl ProximityLocator {
    /// Estimate the closest beacon per window
    pub fn locate(beacons: &[&DeviceRecord], window_minutes: u32) -> LocationAnalysis {
        // window -> beacon -> samples
        let mut windows: BTreeMap<WindowKey, BTreeMap<DeviceId, Vec<f64>>> = BTreeMap::new();

        for beacon in beacons {
            let Some(series) = beacon.channels.get(SIGNAL_STRENGTH_CHANNEL) else {
                warn!(device = %beacon.id, "no signal-strength data for beacon");
                continue;
            };
            debug!(device = %beacon.id, readings = series.len(), "processing beacon");

            for (raw_ts, rssi) in series {
                match parse_timestamp(raw_ts) {
                    Ok(ts) => windows
                        .entry(WindowKey::bucket(ts, window_minutes))
                        .or_default()
                        .entry(beacon.id.clone())
                        .or_default()
                        .push(*rssi),
                    Err(e) => warn!(device = %beacon.id, error = %e, "skipping sample"),
                }
            }
        }

        let mut analysis = LocationAnalysis::default();

        for (key, per_beacon) in windows {
            let window = estimate_window(&per_beacon);
            if let Some(closest) = &window.closest_device {
                *analysis.closest_counts.entry(closest.clone()).or_insert(0) += 1;
            }
            analysis.windows.insert(key, window);
        }

        analysis
    }
}

fn estimate_window(per_beacon: &BTreeMap<DeviceId, Vec<f64>>) -> LocationWindow {
    let mut beacons = BTreeMap::new();
    let mut best: Option<(&DeviceId, f64)> = None;

    // BTreeMap iteration is ascending by identifier; strict `>` keeps the
    // lowest identifier on ties.
    for (id, samples) in per_beacon {
        if samples.is_empty() {
            continue;
        }
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);

        beacons.insert(
            id.clone(),
            SignalSummary {
                average_rssi: round_to(mean, RSSI_DECIMALS),
                max_rssi: max,
                min_rssi: min,
                sample_count: samples.len(),
            },
        );

        if best.map_or(true, |(_, best_mean)| mean > best_mean) {
            best = Some((id, mean));
        }
    }

    LocationWindow {
        closest_device: best.map(|(id, _)| id.clone()),
        closest_rssi: best.map(|(_, mean)| round_to(mean, RSSI_DECIMALS)),
        beacons,
    }
}
