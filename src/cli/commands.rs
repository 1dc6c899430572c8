use crate::compile::QueryPlan;
use crate::pipeline::{SearchRequest, SearchService};
use crate::Result;

/// Run a full search and print the ranked results
pub async fn query(
    service: &SearchService,
    text: &str,
    language: &str,
    limit: Option<usize>,
    stats: bool,
) -> Result<()> {
    let request = SearchRequest {
        query: text.to_string(),
        language: language.to_string(),
        limit,
        overrides: None,
    };

    let response = service.search(&request).await?;

    if !response.backend_available {
        println!("Retrieval backend unavailable; no results.");
        return Ok(());
    }

    if response.results.is_empty() {
        println!("No results.");
    } else {
        if !response.exclusions_enforced {
            println!("! Exclusion filtering skipped to avoid an empty result set.");
            println!("! The results below are NOT verified against your exclusions.\n");
        }
        for (rank, result) in response.results.iter().enumerate() {
            println!("{:>2}. [{:.3}] {}", rank + 1, result.score, result.title);
            if !result.ingredients.is_empty() {
                println!("      {}", result.ingredients.join(", "));
            }
        }
    }

    if !response.constraints.exclude.is_empty() {
        println!("\nExcluded: {}", response.constraints.exclude.join(", "));
    }

    if stats {
        println!("\nProvider usage:");
        let provider_stats = service.provider_stats();
        if provider_stats.is_empty() {
            println!("  (no semantic providers called)");
        }
        let mut names: Vec<_> = provider_stats.keys().collect();
        names.sort();
        for name in names {
            let s = &provider_stats[name];
            println!(
                "  {}: {} request(s), {} prompt + {} completion tokens, ${:.6}",
                name, s.requests, s.prompt_tokens, s.completion_tokens, s.cost
            );
        }
        println!("  Total cost: ${:.6}", service.total_cost());
    }

    Ok(())
}

/// Show each extraction stage for a query
pub async fn extract(service: &SearchService, text: &str, language: &str) -> Result<()> {
    let request = SearchRequest {
        query: text.to_string(),
        language: language.to_string(),
        limit: None,
        overrides: None,
    };

    let breakdown = service.extract(&request).await;

    println!("Deterministic:");
    println!("{}", serde_json::to_string_pretty(&breakdown.deterministic)?);
    match &breakdown.semantic {
        Some(semantic) => {
            println!("\nSemantic:");
            println!("{}", serde_json::to_string_pretty(semantic)?);
        }
        None => println!("\nSemantic: (unavailable)"),
    }
    println!("\nMerged:");
    println!("{}", serde_json::to_string_pretty(&breakdown.merged)?);

    Ok(())
}

/// Print the compiled backend query
pub async fn compile(service: &SearchService, text: &str) -> Result<()> {
    let request = SearchRequest::new(text);
    match service.compile(&request).await {
        QueryPlan::Graph(query) => println!("{}", query.sparql),
        QueryPlan::Hybrid(request) => {
            println!("{}", serde_json::to_string_pretty(&request)?);
            if !request.post_exclude.is_empty() {
                println!(
                    "# post-filter exclusions (enforced after retrieval): {}",
                    request.post_exclude.join(", ")
                );
            }
        }
    }
    Ok(())
}

/// Print the alias family for a term
pub fn resolve(service: &SearchService, term: &str) {
    let forms = service.resolve(term);
    if forms.len() == 1 && forms[0] == term {
        println!("{term}: no known aliases");
    } else {
        println!("{}", forms.join(", "));
    }
}
