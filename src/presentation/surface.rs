// Chart surface that reports charts through the log instead of drawing them
use crate::application::chart_manager::ChartSurface;
use crate::domain::chart::{ChartDefinition, ChartKey, ScalePolicy};

#[derive(Debug, PartialEq, Eq)]
pub struct ChartHandle {
    pub id: u64,
    pub container: String,
}

#[derive(Debug, Default)]
pub struct LogSurface {
    next_id: u64,
    live: usize,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.live
    }
}

impl ChartSurface for LogSurface {
    type Handle = ChartHandle;

    fn create(&mut self, chart: &ChartDefinition) -> ChartHandle {
        self.next_id += 1;
        self.live += 1;

        for series in &chart.series {
            let (min, max) = value_range(&series.values);
            tracing::info!(
                chart = %chart.key,
                title = %chart.title,
                series = %series.label,
                points = series.values.len(),
                min = ?min,
                max = ?max,
                zero_based = chart.scale == ScalePolicy::ZeroBased,
                "chart series"
            );
        }

        ChartHandle {
            id: self.next_id,
            container: chart.key.container(),
        }
    }

    fn destroy(&mut self, key: ChartKey, handle: ChartHandle) {
        self.live = self.live.saturating_sub(1);
        tracing::debug!(chart = %key, id = handle.id, "chart destroyed");
    }
}

fn value_range(values: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    values.iter().flatten().fold((None, None), |(lo, hi), &v| {
        (
            Some(lo.map_or(v, |lo: f64| lo.min(v))),
            Some(hi.map_or(v, |hi: f64| hi.max(v))),
        )
    })
}
