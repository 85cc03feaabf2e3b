use systemcraft_core::{Connection, Node, Question, RuleResult, RuleStatus};

use crate::ReasoningRequest;

fn kind_of<'a>(id: &str, nodes: &'a [Node]) -> &'a str {
    nodes
        .iter()
        .find(|n| n.id == id)
        .map(|n| n.kind.as_str())
        .unwrap_or("?")
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    out.push_str(heading);
    out.push_str(": ");
    if items.is_empty() {
        out.push_str("(none)");
    } else {
        out.push_str(&items.join(", "));
    }
    out.push('\n');
}

fn serialize_question(out: &mut String, question: &Question) {
    out.push_str("QUESTION:\n");
    out.push_str("Prompt: ");
    out.push_str(if question.prompt.is_empty() {
        "(not provided)"
    } else {
        question.prompt.as_str()
    });
    out.push('\n');
    push_list(out, "Requirements", &question.requirements);
    push_list(out, "Constraints", &question.constraints);
    if let Some(traffic) = &question.traffic_profile {
        out.push_str("Traffic: users=");
        out.push_str(&traffic.users);
        out.push_str(" rps=");
        out.push_str(&traffic.rps);
        out.push_str(" storage=");
        out.push_str(&traffic.storage);
        out.push('\n');
    }
}

/// Compact text form of the canvas. Positions and icons are left out.
pub fn serialize_design(nodes: &[Node], connections: &[Connection]) -> String {
    let mut out = String::with_capacity(1024);

    out.push_str("NODES:\n");
    for node in nodes {
        out.push_str("- ");
        out.push_str(&node.id);
        out.push_str(" (");
        out.push_str(&node.kind);
        out.push(')');
        if let Some(label) = node.label.as_deref().filter(|l| !l.is_empty()) {
            out.push_str(" \"");
            out.push_str(label);
            out.push('"');
        }
        out.push('\n');
    }

    out.push_str("CONNECTIONS:\n");
    for c in connections {
        out.push_str("- ");
        out.push_str(&c.from);
        out.push_str(" (");
        out.push_str(kind_of(&c.from, nodes));
        out.push_str(") --> ");
        out.push_str(&c.to);
        out.push_str(" (");
        out.push_str(kind_of(&c.to, nodes));
        out.push_str(")\n");
    }

    out
}

fn serialize_checks(out: &mut String, details: &[RuleResult]) {
    out.push_str("DETERMINISTIC CHECKS:\n");
    for r in details {
        out.push_str("- ");
        out.push_str(&r.rule);
        out.push_str(": ");
        out.push_str(match r.status {
            RuleStatus::Pass => "PASS",
            RuleStatus::Fail => "FAIL",
        });
        out.push_str(" (");
        out.push_str(&r.message);
        out.push_str(")\n");
    }
}

pub fn system_prompt() -> String {
    "You are a senior system design interviewer at a top-tier tech company. \
Evaluate the candidate's architecture against the question, its requirements and its scale constraints.\n\n\
Judge:\n\
1. Does the design meet ALL functional requirements qualitatively?\n\
2. Are the trade-offs appropriate for the stated scale constraints and traffic profile?\n\
3. Are there hidden bottlenecks or single points of failure the deterministic checks missed?\n\
4. Is the overall architecture coherent and justified?\n\n\
The deterministic checks have already been scored separately. Reference them where relevant \
but do not simply restate them.\n\n\
Output ONLY a JSON object with this exact shape:\n\
{\"score\": <integer 0-100>, \"strengths\": [\"...\"], \"weaknesses\": [\"...\"], \"suggestions\": [\"...\"]}\n\
Refer to components by their type and label so the text is human-readable. \
No markdown fences, no commentary outside the JSON."
        .to_string()
}

pub fn user_message(request: &ReasoningRequest<'_>) -> String {
    let mut out = String::with_capacity(2048);
    serialize_question(&mut out, request.question);
    out.push('\n');
    out.push_str(&serialize_design(request.nodes, request.connections));
    out.push('\n');
    serialize_checks(&mut out, request.structural);
    out
}
