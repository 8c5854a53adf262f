use confetti_core::catalog::Catalog;
use confetti_core::config::{AppConfig, LoadOptions};
use confetti_store::Store;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub async fn run(json_output: bool) -> String {
    let report = build_report().await;

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('"', "\\\"")
            )
        });
    }

    render_human(&report)
}

async fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_catalog(&config));
            checks.push(check_store(&config).await);
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["catalog_load", "store_readiness"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    match Catalog::load_dir(&config.content.catalog_dir) {
        Ok(catalog) if catalog.is_empty() => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Fail,
            details: format!(
                "catalog at `{}` has no content in any bucket",
                config.content.catalog_dir.display()
            ),
        },
        Ok(catalog) => {
            let sizes = catalog
                .bucket_sizes()
                .map(|(bucket, size)| format!("{bucket}={size}"))
                .collect::<Vec<_>>()
                .join(" ");
            DoctorCheck { name: "catalog_load", status: CheckStatus::Pass, details: sizes }
        }
        Err(error) => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

async fn check_store(config: &AppConfig) -> DoctorCheck {
    let store = Store::open(&config.store.path).await;
    let summary = store.summary().await;
    DoctorCheck {
        name: "store_readiness",
        status: CheckStatus::Pass,
        details: format!(
            "{} posted items, {} engagement events, {} users, {} pending reveals",
            summary.posted_content,
            summary.engagement_events,
            summary.leaderboard_users,
            summary.pending_reveals
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "✓",
            CheckStatus::Fail => "✗",
            CheckStatus::Skipped => "-",
        };
        lines.push(format!("{marker} {}: {}", check.name, check.details));
    }
    lines.join("\n")
}
