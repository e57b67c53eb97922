//! Formatted output helpers for CLI commands.

use std::fmt::Write as _;

use topoc_common::warning::ResolutionWarning;
use topoc_compiler::CompilePlan;
use topoc_model::graph::CategoryNode;

/// Prints collected warnings after a run, if any.
pub fn print_warnings(warnings: &[ResolutionWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    println!("  {} warning(s):", warnings.len());
    for warning in warnings {
        println!("    ! {warning}");
    }
}

/// Renders the category tree, two spaces of indentation per level.
#[must_use]
pub fn format_categories(categories: &[CategoryNode]) -> String {
    let mut out = String::new();
    for category in categories {
        write_category(&mut out, category, 1);
    }
    out
}

fn write_category(out: &mut String, category: &CategoryNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(out, "{indent}[{}]", category.name);
    for service in &category.services {
        let _ = writeln!(out, "{indent}  - {service}");
    }
    for nested in &category.categories {
        write_category(out, nested, depth + 1);
    }
}

/// Machine-readable form of a plan.
#[must_use]
pub fn plan_json(plan: &CompilePlan) -> serde_json::Value {
    let environments: Vec<serde_json::Value> = plan
        .environments
        .iter()
        .map(|env| {
            serde_json::json!({
                "name": env.name,
                "files": env
                    .files
                    .iter()
                    .map(|f| serde_json::json!({
                        "name": f.file_name,
                        "executable": f.executable,
                        "bytes": f.contents.len(),
                    }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    serde_json::json!({
        "environments": environments,
        "warnings": plan.warnings,
    })
}

#[cfg(test)]
mod tests {
    use topoc_common::warning::WarningKind;
    use topoc_compiler::{EnvironmentOutput, GeneratedFile};

    use super::*;

    fn node(name: &str, services: &[&str], categories: Vec<CategoryNode>) -> CategoryNode {
        CategoryNode {
            name: name.into(),
            services: services.iter().map(|s| (*s).to_string()).collect(),
            categories,
        }
    }

    #[test]
    fn categories_are_indented_by_depth() {
        let tree = vec![
            node("Default", &["api"], Vec::new()),
            node("Data", &[], vec![node("Search", &["search"], Vec::new())]),
        ];
        assert_eq!(
            format_categories(&tree),
            "  [Default]\n    - api\n  [Data]\n    [Search]\n      - search\n"
        );
    }

    #[test]
    fn plan_json_lists_files_and_warnings() {
        let plan = CompilePlan {
            environments: vec![EnvironmentOutput {
                name: "dev".into(),
                files: vec![GeneratedFile {
                    file_name: "run_api.sh".into(),
                    contents: "docker run".into(),
                    executable: true,
                }],
            }],
            warnings: vec![ResolutionWarning {
                environment: "dev".into(),
                service: "api".into(),
                container: None,
                kind: WarningKind::IngressWithoutPort,
            }],
        };
        let json = plan_json(&plan);
        assert_eq!(json["environments"][0]["files"][0]["name"], "run_api.sh");
        assert_eq!(json["environments"][0]["files"][0]["bytes"], 10);
        assert_eq!(json["warnings"][0]["kind"], "ingress_without_port");
    }
}
