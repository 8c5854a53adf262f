use confetti_core::catalog::Catalog;
use confetti_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct BucketSummary {
    bucket: String,
    items: usize,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("catalog", "config", error.to_string(), 2),
    };

    let catalog = match Catalog::load_dir(&config.content.catalog_dir) {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::failure("catalog", "catalog", error.to_string(), 1),
    };

    let summaries: Vec<BucketSummary> = catalog
        .bucket_sizes()
        .map(|(bucket, items)| BucketSummary { bucket: bucket.to_string(), items })
        .collect();
    let total: usize = summaries.iter().map(|summary| summary.items).sum();

    match serde_json::to_string_pretty(&summaries) {
        Ok(listing) => CommandResult {
            exit_code: 0,
            output: format!("{listing}\n{total} items across {} buckets", summaries.len()),
        },
        Err(error) => CommandResult::failure("catalog", "serialization", error.to_string(), 1),
    }
}
