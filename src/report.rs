//! Machine-readable result emission.
//!
//! Downstream tooling greps stdout for `SUCCESS_METHOD:` and `PROFIT_WEI:`
//! lines (plus `SELECTOR:` for deep-scan hits), so those lines bypass the
//! tracing pipeline and go straight to stdout. Everything else is a tracing
//! event. A JSON rendering of the same report is available for export.

use alloy_primitives::U256;
use serde_json::json;
use tracing::info;

use crate::classifier::ExploitVerdict;
use crate::pipeline::ProbeReport;

/// Lines downstream consumers parse, in emission order.
pub fn result_lines(report: &ProbeReport) -> Vec<String> {
    match &report.verdict {
        ExploitVerdict::DirectDrain { method, profit } => vec![
            format!("SUCCESS_METHOD:{}", method),
            format!("PROFIT_WEI:{}", profit),
        ],
        ExploitVerdict::InflationAttack { victim_deposit } => vec![
            "SUCCESS_METHOD:inflation_attack".to_string(),
            format!("PROFIT_WEI:{}", victim_deposit),
        ],
        ExploitVerdict::RoundingDrift { before, after } => {
            let profit = after
                .total_assets
                .saturating_sub(before.total_assets);
            vec![
                "SUCCESS_METHOD:rounding_drift".to_string(),
                format!("PROFIT_WEI:{}", profit),
            ]
        }
        ExploitVerdict::SequencerFeeRefund { profit } => vec![
            "SUCCESS_METHOD:sequencer_fee_refund".to_string(),
            format!("PROFIT_WEI:{}", profit),
        ],
        ExploitVerdict::DeepScanHit {
            method,
            selector,
            profit,
        } => vec![
            format!("SUCCESS_METHOD:{}", method),
            format!("PROFIT_WEI:{}", profit),
            format!("SELECTOR:0x{}", hex::encode(selector)),
        ],
        ExploitVerdict::NoVulnerability => Vec::new(),
    }
}

/// Print the result lines to stdout. A clean target prints nothing here and
/// is only visible in the log stream.
pub fn emit(report: &ProbeReport) {
    let lines = result_lines(report);
    if lines.is_empty() {
        info!(target_address = %report.target, "no vulnerability found");
        return;
    }
    for line in lines {
        println!("{}", line);
    }
}

/// JSON rendering of a report, for file export or downstream ingestion.
pub fn to_json(report: &ProbeReport) -> serde_json::Value {
    let (class, method, profit, selector) = match &report.verdict {
        ExploitVerdict::DirectDrain { method, profit } => {
            ("direct_drain", Some(method.clone()), Some(*profit), None)
        }
        ExploitVerdict::InflationAttack { victim_deposit } => (
            "inflation_attack",
            None,
            Some(*victim_deposit),
            None,
        ),
        ExploitVerdict::RoundingDrift { before, after } => (
            "rounding_drift",
            None,
            Some(after.total_assets.saturating_sub(before.total_assets)),
            None,
        ),
        ExploitVerdict::SequencerFeeRefund { profit } => {
            ("sequencer_fee_refund", None, Some(*profit), None)
        }
        ExploitVerdict::DeepScanHit {
            method,
            selector,
            profit,
        } => (
            "deep_scan_hit",
            Some(method.to_string()),
            Some(*profit),
            Some(format!("0x{}", hex::encode(selector))),
        ),
        ExploitVerdict::NoVulnerability => ("no_vulnerability", None, None, None),
    };

    json!({
        "target": report.target.to_string(),
        "entry_method": report.entry_method,
        "classification": class,
        "method": method,
        "profit_wei": profit.map(|p: U256| p.to_string()),
        "selector": selector,
        "vulnerable": report.verdict.is_vulnerable(),
    })
}
