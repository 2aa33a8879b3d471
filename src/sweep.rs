use std::panic;

use tracing::info;

use crate::{
    config::NamedGeometry,
    error::Result,
    replay::simulate,
    report::RunReport,
    trace::Access,
};

/// Replays the same trace against every geometry, one scoped thread per
/// geometry. Reports come back in config order.
pub fn run_sweep(geometries: &[NamedGeometry], records: &[Access]) -> Result<Vec<RunReport>> {
    info!(
        geometries = geometries.len(),
        records = records.len(),
        "starting sweep"
    );
    crossbeam::scope(|scope| {
        let handles: Vec<_> = geometries
            .iter()
            .map(|ng| {
                scope.spawn(move |_| {
                    simulate(ng.geometry, records)
                        .map(|stats| RunReport::new(&ng.name, ng.geometry, stats))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect()
    })
    .unwrap_or_else(|e| panic::resume_unwind(e))
}
