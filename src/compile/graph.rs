use crate::constraints::ConstraintSet;

/// A compiled graph-store query
#[derive(Debug, Clone)]
pub struct GraphQuery {
    pub sparql: String,
}

/// Escape a user-controlled string for embedding in a SPARQL literal.
///
/// Backslash first, then quotes and control characters. Skipping this on
/// any interpolated string is a correctness and injection bug, not a style
/// issue.
pub fn escape_literal(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

fn contains_filter(var: &str, term: &str) -> String {
    format!(
        "FILTER(CONTAINS(LCASE(STR(?{var})), \"{}\"))",
        escape_literal(&term.to_lowercase())
    )
}

fn facet_filter(var: &str, values: &[String]) -> String {
    let clauses: Vec<String> = values
        .iter()
        .map(|v| {
            format!(
                "CONTAINS(LCASE(STR(?{var})), \"{}\")",
                escape_literal(&v.to_lowercase())
            )
        })
        .collect();
    format!("  FILTER({})\n", clauses.join(" || "))
}

/// Compile a constraint set into a SPARQL query.
///
/// One `CONTAINS` pattern per required ingredient, one `FILTER NOT EXISTS`
/// block per excluded ingredient, OR-joined facet filters, and a duration
/// filter that strips non-digits from the time literal and passes when the
/// field is unbound or unparsable. Ingredient edges are multi-valued, so
/// results aggregate per recipe with `GROUP_CONCAT` into one delimited
/// field.
pub fn compile_graph(constraints: &ConstraintSet, limit: usize) -> GraphQuery {
    let mut body = String::new();
    body.push_str("  ?recipe a rcp:Recipe ;\n");
    body.push_str("          rcp:title ?title .\n");
    body.push_str("  OPTIONAL { ?recipe rcp:description ?description . }\n");
    body.push_str("  OPTIONAL { ?recipe rcp:totalTime ?totalTime . }\n");
    body.push_str("  ?recipe rcp:hasIngredient ?ing .\n");
    body.push_str("  ?ing rcp:name ?ingredientName .\n");

    for (i, term) in constraints.include.iter().enumerate() {
        body.push_str(&format!(
            "  ?recipe rcp:hasIngredient ?req{i} .\n  ?req{i} rcp:name ?req{i}Name .\n  {}\n",
            contains_filter(&format!("req{i}Name"), term)
        ));
    }

    for (i, term) in constraints.exclude.iter().enumerate() {
        body.push_str(&format!(
            "  FILTER NOT EXISTS {{\n    ?recipe rcp:hasIngredient ?exc{i} .\n    ?exc{i} rcp:name ?exc{i}Name .\n    {}\n  }}\n",
            contains_filter(&format!("exc{i}Name"), term)
        ));
    }

    if !constraints.cuisine.is_empty() {
        body.push_str("  ?recipe rcp:cuisine ?cuisine .\n");
        body.push_str(&facet_filter("cuisine", &constraints.cuisine));
    }
    if !constraints.diet.is_empty() {
        body.push_str("  ?recipe rcp:diet ?diet .\n");
        body.push_str(&facet_filter("diet", &constraints.diet));
    }
    if !constraints.course.is_empty() {
        body.push_str("  ?recipe rcp:course ?course .\n");
        body.push_str(&facet_filter("course", &constraints.course));
    }
    if !constraints.keywords.is_empty() {
        body.push_str("  ?recipe rcp:keyword ?keyword .\n");
        body.push_str(&facet_filter("keyword", &constraints.keywords));
    }

    let bound = constraints
        .max_cook_minutes
        .or(constraints.max_total_minutes);
    if let Some(minutes) = bound {
        // Stored durations are messy literals ("45 minutes", "PT45M", 45).
        // Strip non-digits and treat unparsable values as unbounded so a
        // malformed literal never hides a recipe.
        body.push_str(&format!(
            "  FILTER(!BOUND(?totalTime) || REPLACE(STR(?totalTime), \"[^0-9]\", \"\") = \"\" || xsd:integer(REPLACE(STR(?totalTime), \"[^0-9]\", \"\")) <= {minutes})\n"
        ));
    }

    let sparql = format!(
        "PREFIX rcp: <http://example.org/recipe#>\n\
         PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>\n\
         SELECT ?recipe ?title ?description ?totalTime\n\
         \x20      (GROUP_CONCAT(DISTINCT ?ingredientName; SEPARATOR=\"|\") AS ?ingredients)\n\
         WHERE {{\n{body}}}\n\
         GROUP BY ?recipe ?title ?description ?totalTime\n\
         LIMIT {limit}\n"
    );

    GraphQuery { sparql }
}
