use crate::compile::graph::escape_literal;
use crate::constraints::ConstraintSet;
use serde::Serialize;

/// A compiled hybrid-search request.
///
/// The engine handles free text plus a structured facet filter, but has no
/// native "ingredient NOT IN list" operator, so excluded ingredients ride
/// along as a post-filter list and are enforced downstream by the safety
/// filter. Required ingredients already appear in the query text.
#[derive(Debug, Clone, Serialize)]
pub struct HybridRequest {
    pub query: String,
    pub filter: Option<String>,
    pub limit: usize,
    #[serde(skip)]
    pub post_exclude: Vec<String>,
}

fn facet_clause(field: &str, values: &[String]) -> String {
    let terms: Vec<String> = values
        .iter()
        .map(|v| format!("{field} = \"{}\"", escape_literal(&v.to_lowercase())))
        .collect();
    if terms.len() == 1 {
        terms.into_iter().next().expect("one term")
    } else {
        format!("({})", terms.join(" OR "))
    }
}

/// Compile a constraint set into a hybrid-search request
pub fn compile_hybrid(constraints: &ConstraintSet, limit: usize) -> HybridRequest {
    let mut query_terms: Vec<String> = Vec::new();
    query_terms.extend(constraints.include.iter().cloned());
    query_terms.extend(constraints.keywords.iter().cloned());

    let mut clauses = Vec::new();
    if !constraints.cuisine.is_empty() {
        clauses.push(facet_clause("cuisine", &constraints.cuisine));
    }
    if !constraints.diet.is_empty() {
        clauses.push(facet_clause("diet", &constraints.diet));
    }
    if !constraints.course.is_empty() {
        clauses.push(facet_clause("course", &constraints.course));
    }
    if let Some(minutes) = constraints
        .max_cook_minutes
        .or(constraints.max_total_minutes)
    {
        clauses.push(format!("total_time <= {minutes}"));
    }

    HybridRequest {
        query: query_terms.join(" "),
        filter: if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" AND "))
        },
        limit,
        post_exclude: constraints.exclude.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints() -> ConstraintSet {
        ConstraintSet {
            include: vec!["paneer".to_string()],
            exclude: vec!["onion".to_string()],
            cuisine: vec!["indian".to_string(), "punjabi".to_string()],
            diet: vec!["jain".to_string()],
            keywords: vec!["grilled".to_string()],
            max_cook_minutes: Some(30),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_combines_include_and_keywords() {
        let request = compile_hybrid(&constraints(), 20);
        assert_eq!(request.query, "paneer grilled");
    }

    #[test]
    fn test_filter_expression_joins_facets() {
        let request = compile_hybrid(&constraints(), 20);
        let filter = request.filter.unwrap();
        assert!(filter.contains(r#"(cuisine = "indian" OR cuisine = "punjabi")"#));
        assert!(filter.contains(r#"diet = "jain""#));
        assert!(filter.contains("total_time <= 30"));
        assert!(filter.contains(" AND "));
    }

    #[test]
    fn test_exclusions_never_enter_filter_expression() {
        // The engine has no list-exclusion operator; exclusion enforcement
        // happens in the safety filter after retrieval.
        let request = compile_hybrid(&constraints(), 20);
        assert!(!request.filter.unwrap().contains("onion"));
        assert_eq!(request.post_exclude, vec!["onion"]);
    }

    #[test]
    fn test_no_facets_means_no_filter() {
        let c = ConstraintSet {
            include: vec!["dal".to_string()],
            ..Default::default()
        };
        let request = compile_hybrid(&c, 20);
        assert!(request.filter.is_none());
    }

    #[test]
    fn test_facet_values_escaped() {
        let mut c = constraints();
        c.diet = vec!["ja\"in".to_string()];
        let request = compile_hybrid(&c, 20);
        assert!(request.filter.unwrap().contains(r#"diet = "ja\"in""#));
    }
}
