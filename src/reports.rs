use serde::Serialize;
use tracing::info;

use crate::types::{CheckResult, DetailRow, DetailTable, StatusColor, SummaryRow};

/// Presentation-ready view of a set of check results.
#[derive(Debug, Clone, Serialize)]
pub struct QaqcReport {
    pub summary_table: Vec<SummaryRow>,
    pub detail_tables: Vec<DetailTable>,
    pub total_flags: usize,
}

impl QaqcReport {
    pub fn failing_checks(&self) -> usize {
        self.summary_table
            .iter()
            .filter(|r| r.status == StatusColor::Red)
            .count()
    }
}

/// One summary row per result; one detail table per result that has flags.
pub fn aggregate(results: &[CheckResult]) -> QaqcReport {
    let mut summary_table = Vec::with_capacity(results.len());
    let mut detail_tables = Vec::new();
    let mut total_flags = 0;

    for r in results {
        let count = r.flags.len();
        total_flags += count;
        summary_table.push(SummaryRow {
            name: r.name.clone(),
            category: r.category.clone(),
            flag_count: count,
            description: r.description.clone(),
            status: StatusColor::for_flag_count(count),
        });

        if r.passed() {
            info!(check = %r.name, category = %r.category, "no issues");
            continue;
        }
        for flag in &r.flags {
            info!(check = %r.name, category = %r.category, "{}", flag);
        }
        detail_tables.push(DetailTable {
            title: r.name.clone(),
            rows: r
                .flags
                .iter()
                .enumerate()
                .map(|(i, msg)| DetailRow {
                    index: i + 1,
                    message: msg.clone(),
                })
                .collect(),
        });
    }

    QaqcReport {
        summary_table,
        detail_tables,
        total_flags,
    }
}
