//! Structural grading rules.
//!
//! Each rule is a plain record pairing metadata with a pure predicate. Rules never
//! see each other's outcomes; they all run against the same snapshot.

use serde::{Deserialize, Serialize};

use crate::{Connection, Node};

const LOAD_BALANCERS: &[&str] = &["LB"];
const COMPUTE: &[&str] = &["Server", "Function"];
const STORAGE: &[&str] = &["SQL", "Blob"];
const CACHES: &[&str] = &["Cache", "CDN"];
const QUEUES: &[&str] = &["Queue", "Kafka"];

/// Requirement keywords that make a caching layer mandatory.
const HIGH_LOAD_KEYWORDS: &[&str] = &["scale", "latency"];

/// How a failure is surfaced to the user. Does not affect scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub pass: bool,
    pub message: String,
}

impl Verdict {
    fn new(pass: bool, if_pass: &str, if_fail: &str) -> Self {
        Self {
            pass,
            message: if pass { if_pass } else { if_fail }.to_string(),
        }
    }

    fn pass(message: impl Into<String>) -> Self {
        Self {
            pass: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            pass: false,
            message: message.into(),
        }
    }
}

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub nodes: &'a [Node],
    pub connections: &'a [Connection],
    pub requirements: &'a [String],
    pub constraints: &'a [String],
}

#[derive(Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    /// Shown to the user as the rule name.
    pub description: &'static str,
    pub weight: u32,
    pub severity: Severity,
    pub check: fn(&RuleInput<'_>) -> Verdict,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("weight", &self.weight)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

pub static RULES: &[Rule] = &[
    Rule {
        id: "has_load_balancer",
        description: "Design includes a Load Balancer",
        weight: 15,
        severity: Severity::Critical,
        check: has_load_balancer,
    },
    Rule {
        id: "has_database",
        description: "Design includes a Database",
        weight: 15,
        severity: Severity::Critical,
        check: has_database,
    },
    Rule {
        id: "has_application_server",
        description: "Design includes Application Servers",
        weight: 15,
        severity: Severity::Critical,
        check: has_application_server,
    },
    Rule {
        id: "lb_connected_to_servers",
        description: "Load Balancer connects to Servers",
        weight: 10,
        severity: Severity::Warning,
        check: lb_connected_to_servers,
    },
    Rule {
        id: "servers_connected_to_db",
        description: "Servers connect to Database",
        weight: 10,
        severity: Severity::Warning,
        check: servers_connected_to_db,
    },
    Rule {
        id: "caching_layer",
        description: "Includes Caching for performance",
        weight: 10,
        severity: Severity::Info,
        check: caching_layer,
    },
    Rule {
        id: "asynchronous_processing",
        description: "Uses Queues for async tasks",
        weight: 10,
        severity: Severity::Info,
        check: asynchronous_processing,
    },
    Rule {
        id: "no_orphan_nodes",
        description: "All components are connected",
        weight: 10,
        severity: Severity::Warning,
        check: no_orphan_nodes,
    },
];

pub fn find_rule(id: &str) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.id == id)
}

// --- Graph helpers ---

fn any_of(nodes: &[Node], kinds: &[&str]) -> bool {
    nodes.iter().any(|n| n.is_any(kinds))
}

/// First node carrying `id`. Dangling ids resolve to nothing.
fn node_by_id<'a>(nodes: &'a [Node], id: &str) -> Option<&'a Node> {
    nodes.iter().find(|n| n.id == id)
}

/// True when some `from_kinds` node shares a connection, in either direction,
/// with some `to_kinds` node. One such wire is enough.
fn wired(input: &RuleInput<'_>, from_kinds: &[&str], to_kinds: &[&str]) -> bool {
    input.nodes.iter().filter(|n| n.is_any(from_kinds)).any(|source| {
        input.connections.iter().any(|c| {
            c.other_end(&source.id)
                .and_then(|other| node_by_id(input.nodes, other))
                .is_some_and(|other| other.is_any(to_kinds))
        })
    })
}

// --- Presence ---

fn has_load_balancer(input: &RuleInput<'_>) -> Verdict {
    Verdict::new(
        any_of(input.nodes, LOAD_BALANCERS),
        "Load balancer correctly identified",
        "Missing a Load Balancer to distribute traffic between servers.",
    )
}

fn has_database(input: &RuleInput<'_>) -> Verdict {
    Verdict::new(
        any_of(input.nodes, STORAGE),
        "Storage layer present",
        "Missing a persistent storage layer (SQL or Blob storage).",
    )
}

fn has_application_server(input: &RuleInput<'_>) -> Verdict {
    Verdict::new(
        any_of(input.nodes, COMPUTE),
        "Application logic layer present",
        "Missing application servers or functions to process business logic.",
    )
}

// --- Connectivity ---

fn lb_connected_to_servers(input: &RuleInput<'_>) -> Verdict {
    if !any_of(input.nodes, LOAD_BALANCERS) {
        return Verdict::fail("No Load Balancer to check connections.");
    }
    Verdict::new(
        wired(input, LOAD_BALANCERS, COMPUTE),
        "Traffic flows from Load Balancer to servers",
        "Load Balancer is not connected to any application servers.",
    )
}

fn servers_connected_to_db(input: &RuleInput<'_>) -> Verdict {
    if !any_of(input.nodes, COMPUTE) {
        return Verdict::fail("No servers to check connections.");
    }
    Verdict::new(
        wired(input, COMPUTE, STORAGE),
        "Servers are correctly connected to storage",
        "Application logic is not connected to any database or storage.",
    )
}

// --- Performance and decoupling ---

fn caching_layer(input: &RuleInput<'_>) -> Verdict {
    if any_of(input.nodes, CACHES) {
        return Verdict::pass("Caching layer used for performance optimization.");
    }
    let high_load = input.requirements.iter().any(|r| {
        let r = r.to_lowercase();
        HIGH_LOAD_KEYWORDS.iter().any(|k| r.contains(k))
    });
    if high_load {
        Verdict::fail("High performance requirements detected. Consider adding a Cache or CDN.")
    } else {
        Verdict::pass("Simple design: Caching not strictly required but recommended.")
    }
}

fn asynchronous_processing(input: &RuleInput<'_>) -> Verdict {
    Verdict::new(
        any_of(input.nodes, QUEUES),
        "Async processing used for decoupled architecture",
        "Consider using a Message Queue for long-running or non-blocking tasks.",
    )
}

// --- Graph health ---

fn no_orphan_nodes(input: &RuleInput<'_>) -> Verdict {
    if input.nodes.is_empty() {
        return Verdict::pass("Empty canvas");
    }
    let orphans = input
        .nodes
        .iter()
        .filter(|n| {
            !input
                .connections
                .iter()
                .any(|c| c.from == n.id || c.to == n.id)
        })
        .count();
    if orphans == 0 {
        Verdict::pass("Architecture is fully connected")
    } else {
        Verdict::fail(format!(
            "{orphans} component(s) are floating and not connected to the system."
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: &str, nodes: &[Node], connections: &[Connection], requirements: &[&str]) -> Verdict {
        let requirements: Vec<String> = requirements.iter().map(|s| s.to_string()).collect();
        let input = RuleInput {
            nodes,
            connections,
            requirements: &requirements,
            constraints: &[],
        };
        (find_rule(id).unwrap().check)(&input)
    }

    fn nodes(kinds: &[(&str, &str)]) -> Vec<Node> {
        kinds.iter().map(|(id, kind)| Node::new(*id, *kind)).collect()
    }

    #[test]
    fn catalog_ids_are_unique_and_weights_positive() {
        let mut ids: Vec<_> = RULES.iter().map(|r| r.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), RULES.len());
        assert!(RULES.iter().all(|r| r.weight > 0));
        assert_eq!(RULES.iter().map(|r| r.weight).sum::<u32>(), 95);
    }

    #[test]
    fn presence_rules_match_their_vocabularies() {
        let n = nodes(&[("1", "Function"), ("2", "Blob")]);
        assert!(run("has_application_server", &n, &[], &[]).pass);
        assert!(run("has_database", &n, &[], &[]).pass);
        assert!(!run("has_load_balancer", &n, &[], &[]).pass);
    }

    #[test]
    fn kind_matching_is_exact() {
        let n = nodes(&[("1", "lb"), ("2", "sql")]);
        assert!(!run("has_load_balancer", &n, &[], &[]).pass);
        assert!(!run("has_database", &n, &[], &[]).pass);
    }

    #[test]
    fn lb_wiring_is_direction_agnostic() {
        let n = nodes(&[("lb", "LB"), ("s", "Server")]);
        let backwards = [Connection::new("c", "s", "lb")];
        assert!(run("lb_connected_to_servers", &n, &backwards, &[]).pass);
    }

    #[test]
    fn lb_without_server_edge_fails() {
        let n = nodes(&[("lb", "LB"), ("s", "Server"), ("db", "SQL")]);
        let c = [Connection::new("c", "lb", "db")];
        let v = run("lb_connected_to_servers", &n, &c, &[]);
        assert!(!v.pass);
        assert_eq!(v.message, "Load Balancer is not connected to any application servers.");
    }

    #[test]
    fn missing_source_tier_fails_with_its_own_message() {
        let v = run("lb_connected_to_servers", &nodes(&[("s", "Server")]), &[], &[]);
        assert_eq!(v, Verdict::fail("No Load Balancer to check connections."));
        let v = run("servers_connected_to_db", &nodes(&[("db", "SQL")]), &[], &[]);
        assert_eq!(v, Verdict::fail("No servers to check connections."));
    }

    #[test]
    fn dangling_endpoints_never_match() {
        let n = nodes(&[("lb", "LB"), ("s", "Server")]);
        let c = [Connection::new("c", "lb", "ghost")];
        assert!(!run("lb_connected_to_servers", &n, &c, &[]).pass);
    }

    #[test]
    fn self_loop_does_not_count_as_wiring() {
        let n = nodes(&[("s", "Server"), ("db", "SQL")]);
        let c = [Connection::new("loop", "s", "s")];
        assert!(!run("servers_connected_to_db", &n, &c, &[]).pass);
        // but it does keep the node from being an orphan
        assert!(!run("no_orphan_nodes", &n, &c, &[]).pass);
        let c = [Connection::new("loop", "s", "s"), Connection::new("d", "db", "db")];
        assert!(run("no_orphan_nodes", &n, &c, &[]).pass);
    }

    #[test]
    fn one_wired_server_is_enough() {
        let n = nodes(&[("s1", "Server"), ("s2", "Server"), ("db", "SQL")]);
        let c = [Connection::new("c", "s2", "db")];
        assert!(run("servers_connected_to_db", &n, &c, &[]).pass);
    }

    #[test]
    fn caching_waived_for_simple_requirements() {
        let n = nodes(&[("s", "Server")]);
        let v = run("caching_layer", &n, &[], &["Users can post messages"]);
        assert!(v.pass);
        assert!(v.message.starts_with("Simple design"));
    }

    #[test]
    fn caching_required_for_scale_or_latency() {
        let n = nodes(&[("s", "Server")]);
        assert!(!run("caching_layer", &n, &[], &["Handle 1M scale"]).pass);
        assert!(!run("caching_layer", &n, &[], &["Low LATENCY reads"]).pass);
        // substring match, so "scaled" counts too
        assert!(!run("caching_layer", &n, &[], &["Must be horizontally scaled"]).pass);
    }

    #[test]
    fn caching_ignores_constraints() {
        let n = nodes(&[("s", "Server")]);
        let constraints = vec!["p99 latency under 50ms".to_string()];
        let input = RuleInput {
            nodes: &n,
            connections: &[],
            requirements: &[],
            constraints: &constraints,
        };
        assert!(caching_layer(&input).pass);
    }

    #[test]
    fn cdn_satisfies_caching() {
        let n = nodes(&[("c", "CDN")]);
        assert!(run("caching_layer", &n, &[], &["global scale"]).pass);
    }

    #[test]
    fn kafka_counts_as_queue() {
        assert!(run("asynchronous_processing", &nodes(&[("k", "Kafka")]), &[], &[]).pass);
        assert!(!run("asynchronous_processing", &nodes(&[("c", "Cache")]), &[], &[]).pass);
    }

    #[test]
    fn orphan_count_is_reported() {
        let n = nodes(&[("a", "Client"), ("b", "Server"), ("c", "SQL")]);
        let c = [Connection::new("x", "a", "b")];
        let v = run("no_orphan_nodes", &n, &c, &[]);
        assert_eq!(
            v,
            Verdict::fail("1 component(s) are floating and not connected to the system.")
        );
    }

    #[test]
    fn empty_canvas_has_no_orphans() {
        assert_eq!(run("no_orphan_nodes", &[], &[], &[]), Verdict::pass("Empty canvas"));
    }
}
