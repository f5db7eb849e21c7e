//! Prioritized rendering of validation findings and the matching exit codes

use std::process::ExitCode;

use serde::Serialize;

use super::output::Output;
use crate::domain::{CheckReport, CheckStatus, Edge, Graph};

/// Process exit code for a check outcome
pub fn exit_code(status: CheckStatus) -> u8 {
    match status {
        CheckStatus::Clean => 0,
        CheckStatus::UndefinedEdges => 1,
        CheckStatus::Cycles => 2,
        CheckStatus::ScanErrors | CheckStatus::Inconsistent { .. } => 3,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Failure<'a> {
    success: bool,
    command: &'a str,
    status: &'static str,
    exit_code: u8,
    drift: bool,
    report: &'a CheckReport,
}

fn status_name(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Clean => "clean",
        CheckStatus::ScanErrors => "scan-errors",
        CheckStatus::UndefinedEdges => "undefined-edges",
        CheckStatus::Cycles => "cycles",
        CheckStatus::Inconsistent { .. } => "inconsistent",
    }
}

/// Reports the highest-priority finding of `report`. Returns `None` when
/// there is nothing to report.
pub fn report_failure(
    output: &Output,
    command: &str,
    graph: &Graph,
    report: &CheckReport,
    drift: bool,
) -> Option<ExitCode> {
    let status = report.status(drift);
    if status == CheckStatus::Clean {
        return None;
    }
    let code = exit_code(status);

    if output.is_json() {
        output.data(&Failure {
            success: false,
            command,
            status: status_name(status),
            exit_code: code,
            drift,
            report,
        });
        return Some(ExitCode::from(code));
    }

    output.section(&format!("{}: failed", command));
    output.section("Errors");
    match status {
        CheckStatus::ScanErrors => {
            for diagnostic in &report.scan_errors {
                output.finding(&diagnostic.to_string());
            }
            output.warn("fix scan issues and re-run `todo-graph check`");
        }
        CheckStatus::UndefinedEdges => {
            for edge in &report.undefined_edges {
                output.finding(&describe_undefined(graph, edge));
            }
        }
        CheckStatus::Cycles => {
            output.finding("cycles detected:");
            for cycle in &report.cycles {
                output.finding(&format!("  cycle: {}", cycle.join(" -> ")));
            }
        }
        CheckStatus::Inconsistent { isolated, drift } => {
            if isolated {
                output.finding(&format!("isolated TODOs: {}", report.isolated.join(", ")));
            }
            if drift {
                output.finding("snapshot is out of date (run todo-graph generate)");
            }
        }
        CheckStatus::Clean => {}
    }

    Some(ExitCode::from(code))
}

/// Like [`report_failure`] without drift, but isolated TODOs pass
pub fn report_structural_failure(
    output: &Output,
    command: &str,
    graph: &Graph,
    report: &CheckReport,
) -> Option<ExitCode> {
    match report.status(false) {
        CheckStatus::Clean | CheckStatus::Inconsistent { .. } => None,
        _ => report_failure(output, command, graph, report, false),
    }
}

/// Names the undefined end of `edge`, located at the end that exists
fn describe_undefined(graph: &Graph, edge: &Edge) -> String {
    match (graph.node(&edge.from), graph.node(&edge.to)) {
        (None, Some(to)) => format!("missing \"{}\" (at {})", edge.from, to.location()),
        (Some(from), None) => format!("missing \"{}\" (at {})", edge.to, from.location()),
        (None, None) => format!(
            "missing TODOs \"{}\" and \"{}\" (edge present but ids undefined)",
            edge.from, edge.to
        ),
        (Some(_), Some(_)) => format!("undefined TODO reference: {} -> {}", edge.from, edge.to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Node;

    #[test]
    fn exit_codes_follow_priority() {
        assert_eq!(exit_code(CheckStatus::Clean), 0);
        assert_eq!(exit_code(CheckStatus::ScanErrors), 3);
        assert_eq!(exit_code(CheckStatus::UndefinedEdges), 1);
        assert_eq!(exit_code(CheckStatus::Cycles), 2);
        assert_eq!(
            exit_code(CheckStatus::Inconsistent {
                isolated: false,
                drift: true
            }),
            3
        );
    }

    #[test]
    fn undefined_edge_located_at_known_end() {
        let mut graph = Graph::new();
        graph.insert_node(Node::new("b", "b.go", 4));

        let message = describe_undefined(&graph, &Edge::blocks("ghost", "b"));
        assert_eq!(message, "missing \"ghost\" (at b.go:4)");

        let message = describe_undefined(&graph, &Edge::blocks("x", "y"));
        assert!(message.contains("\"x\" and \"y\""));
    }
}
