//! Sequential query throughput sampling.

use std::time::Instant;

use anyhow::bail;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;

use super::open_store;
use crate::config::Settings;
use crate::engine::{CollectionHandle, EngineResult, Include};

const PROBE_RESULTS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSample {
    pub queries: usize,
    pub seconds: f64,
}

impl ProbeSample {
    pub fn queries_per_second(&self) -> f64 {
        if self.seconds > 0.0 {
            self.queries as f64 / self.seconds
        } else {
            0.0
        }
    }
}

/// Time `n` back-to-back queries for each `n` in `intervals`.
pub fn run_samples(
    collection: &CollectionHandle,
    intervals: &[usize],
    text: &str,
) -> EngineResult<Vec<ProbeSample>> {
    let texts = [text.to_string()];
    let include = [Include::Documents];

    intervals
        .iter()
        .map(|&queries| {
            let start = Instant::now();
            for _ in 0..queries {
                collection.query(&texts, PROBE_RESULTS, &include)?;
            }
            Ok(ProbeSample {
                queries,
                seconds: start.elapsed().as_secs_f64(),
            })
        })
        .collect()
}

pub fn run(
    settings: &Settings,
    collection: Option<&str>,
    intervals: &[usize],
    text: &str,
) -> anyhow::Result<()> {
    let store = open_store(settings)?;

    let handle = match collection {
        Some(name) => store.get_collection(name)?,
        None => match store.list_collections()?.names.first() {
            Some(first) => store.find_exact(first)?,
            None => None,
        },
    };
    let Some(handle) = handle else {
        bail!("no collection to sample");
    };

    eprintln!("Probing '{}' with \"{text}\"", handle.name());
    let samples = run_samples(&handle, intervals, text)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Queries", "Seconds", "Queries/s"]);
    for sample in &samples {
        table.add_row(vec![
            sample.queries.to_string(),
            format!("{:.4}", sample.seconds),
            format!("{:.2}", sample.queries_per_second()),
        ]);
    }
    println!("{table}");
    Ok(())
}
