// Chart series manager - owns every live chart handle for the session
use crate::domain::chart::{ChartDefinition, ChartKey};
use std::collections::BTreeMap;

/// Rendering backend. Handles are opaque; the manager never draws itself.
pub trait ChartSurface {
    type Handle;

    fn create(&mut self, chart: &ChartDefinition) -> Self::Handle;

    /// Frees every visual resource behind `handle`.
    fn destroy(&mut self, key: ChartKey, handle: Self::Handle);
}

/// Registry of live charts, at most one per container.
///
/// Charts are never updated in place: a re-render tears the old handle
/// down first so no scale or legend state survives a window change.
pub struct ChartSeriesManager<S: ChartSurface> {
    surface: S,
    live: BTreeMap<ChartKey, S::Handle>,
}

impl<S: ChartSurface> ChartSeriesManager<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            live: BTreeMap::new(),
        }
    }

    pub fn render(&mut self, chart: &ChartDefinition) -> &S::Handle {
        if let Some(old) = self.live.remove(&chart.key) {
            tracing::debug!(chart = %chart.key, "tearing down previous chart");
            self.surface.destroy(chart.key, old);
        }

        let handle = self.surface.create(chart);
        tracing::debug!(
            chart = %chart.key,
            series = chart.series.len(),
            points = chart.x_labels.len(),
            "chart created"
        );
        self.live.entry(chart.key).or_insert(handle)
    }

    /// Clears every tracked chart, then creates one per definition.
    pub fn render_all(&mut self, charts: &[ChartDefinition]) {
        self.clear();
        for chart in charts {
            self.render(chart);
        }
    }

    pub fn clear(&mut self) {
        for (key, handle) in std::mem::take(&mut self.live) {
            self.surface.destroy(key, handle);
        }
    }

    pub fn live_keys(&self) -> impl Iterator<Item = &ChartKey> {
        self.live.keys()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

impl<S: ChartSurface> Drop for ChartSeriesManager<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::chart::{daily_range_chart, history_charts, hourly_chart};
    use crate::domain::telemetry::{Metric, SensorReading, TimeWindow};
    use chrono::{TimeZone, Utc};

    /// Surface that records the order of create/destroy calls.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        next_id: u32,
        pub live: Vec<u32>,
        pub log: Vec<String>,
    }

    impl ChartSurface for RecordingSurface {
        type Handle = u32;

        fn create(&mut self, chart: &ChartDefinition) -> u32 {
            self.next_id += 1;
            self.live.push(self.next_id);
            self.log.push(format!("create {} #{}", chart.key, self.next_id));
            self.next_id
        }

        fn destroy(&mut self, key: ChartKey, handle: u32) {
            self.live.retain(|&h| h != handle);
            self.log.push(format!("destroy {} #{}", key, handle));
        }
    }

    fn readings() -> Vec<SensorReading> {
        (0..3)
            .map(|h| SensorReading {
                id: None,
                timestamp: Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap(),
                temperature: Some(20.0 + h as f64),
                humidity: Some(50.0),
                light_level: Some(0.0),
                soil_moisture: None,
            })
            .collect()
    }

    #[test]
    fn test_render_replaces_existing_handle() {
        let mut manager = ChartSeriesManager::new(RecordingSurface::default());
        let chart = hourly_chart(
            Metric::Temperature,
            &readings(),
            TimeWindow::TwentyFourHours,
            &Utc,
        );

        assert_eq!(*manager.render(&chart), 1);
        assert_eq!(*manager.render(&chart), 2);

        assert_eq!(manager.live_count(), 1);
        assert_eq!(manager.surface().live, vec![2]);
        assert_eq!(
            manager.surface().log,
            vec![
                "create temperature-chart #1",
                "destroy temperature-chart #1",
                "create temperature-chart #2",
            ]
        );
    }

    #[test]
    fn test_render_all_twice_does_not_accumulate() {
        let mut manager = ChartSeriesManager::new(RecordingSurface::default());
        let charts = history_charts(&readings(), &[], TimeWindow::TwentyFourHours, &Utc);

        manager.render_all(&charts);
        manager.render_all(&charts);

        assert_eq!(manager.live_count(), charts.len());
        assert_eq!(manager.surface().live.len(), charts.len());
        let keys: Vec<String> = manager.live_keys().map(|k| k.to_string()).collect();
        assert_eq!(keys.len(), charts.len());
        assert!(keys.contains(&"temperature-minmax-chart".to_string()));
    }

    #[test]
    fn test_render_all_tears_down_before_creating() {
        let mut manager = ChartSeriesManager::new(RecordingSurface::default());
        let first = vec![hourly_chart(
            Metric::Humidity,
            &readings(),
            TimeWindow::TwentyFourHours,
            &Utc,
        )];
        let second = vec![
            hourly_chart(Metric::Humidity, &readings(), TimeWindow::SevenDays, &Utc),
            daily_range_chart(Metric::Humidity, &[]),
        ];

        manager.render_all(&first);
        manager.render_all(&second);

        let log = &manager.surface().log;
        let last_destroy = log.iter().rposition(|l| l.starts_with("destroy")).unwrap();
        let first_create_after = log
            .iter()
            .skip(1)
            .position(|l| l.starts_with("create"))
            .unwrap()
            + 1;
        assert!(last_destroy < first_create_after);
        assert_eq!(manager.live_count(), 2);
    }

    #[test]
    fn test_clear_releases_handles() {
        let mut manager = ChartSeriesManager::new(RecordingSurface::default());
        manager.render(&daily_range_chart(Metric::Temperature, &[]));
        manager.clear();
        assert_eq!(manager.live_count(), 0);
        assert!(manager.surface().live.is_empty());
    }
}
