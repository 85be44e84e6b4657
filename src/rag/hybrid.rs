//! Fusion ranker: merges the lexical probe (filter search over the record
//! store) with the semantic probe (vector index) into one ordered,
//! deduplicated, paginated result, and produces an answer from the top
//! context slice.

use crate::db::models::RecipeDetails;
use crate::db::search::{FilterResults, RecipeFilter};
use crate::db::{recipes, search, DbPool};
use crate::error::{Error, Result};
use crate::rag::vector_index::ScoredPoint;
use crate::rag::RagEngine;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Distance reduction when the whole query appears in the candidate's name.
const EXACT_MATCH_BOOST: f32 = 0.30;
/// Distance reduction per matching query token (tokens longer than 3 chars).
const TOKEN_MATCH_BOOST: f32 = 0.10;

pub const NO_MATCHES_ANSWER: &str =
    "I couldn't find any recipes matching your request. Try different ingredients or a broader description.";

pub const FALLBACK_ANSWER: &str =
    "I found some recipes that match your request, but couldn't generate a summary right now. The results below should still help.";

const ANSWER_SYSTEM: &str = "You are a helpful cooking assistant. Given a user's request and a list \
of matching recipes, recommend the most suitable ones in two or three short sentences. Mention \
recipes by name and keep the tone practical.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridSearchResults {
    /// Hydrated details for the requested page of the merged ranking.
    pub recipes: Vec<RecipeDetails>,
    /// Size of the whole merged ranking, not of this page.
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    /// Top slice of the whole ranking, independent of the requested page;
    /// this is what the answer was generated from.
    pub context: Vec<RecipeDetails>,
    pub answer: String,
}

/// Keyword boosting over vector candidates: an exact (case-insensitive)
/// substring match of the whole query is worth more than per-token matches,
/// and boosts only ever lower distance. Candidates are re-filtered by the
/// threshold and re-sorted afterwards.
pub fn apply_keyword_boost(query: &str, candidates: &mut Vec<ScoredPoint>, threshold: f32) {
    let query_lc = query.trim().to_lowercase();
    let tokens: Vec<&str> = query_lc
        .split_whitespace()
        .filter(|t| t.chars().count() > 3)
        .collect();

    for candidate in candidates.iter_mut() {
        let name_lc = candidate.metadata.name.to_lowercase();
        if !query_lc.is_empty() && name_lc.contains(&query_lc) {
            candidate.distance -= EXACT_MATCH_BOOST;
        } else {
            for token in &tokens {
                if name_lc.contains(token) {
                    candidate.distance -= TOKEN_MATCH_BOOST;
                }
            }
        }
    }

    candidates.retain(|c| c.distance <= threshold);
    candidates.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Order-preserving deduplicating merge: every lexical id comes before any
/// vector-only id. Lexical matches are treated as strictly higher confidence.
pub fn merge_candidates(lexical_ids: &[i64], vector_ids: &[i64]) -> Vec<i64> {
    let mut merged = Vec::with_capacity(lexical_ids.len() + vector_ids.len());
    let mut seen = HashSet::new();

    for &id in lexical_ids.iter().chain(vector_ids.iter()) {
        if seen.insert(id) {
            merged.push(id);
        }
    }

    merged
}

fn page_slice(ids: &[i64], page: i64, page_size: i64) -> &[i64] {
    let offset = ((page - 1) * page_size) as usize;
    if offset >= ids.len() {
        return &[];
    }
    let end = (offset + page_size as usize).min(ids.len());
    &ids[offset..end]
}

fn build_context_prompt(query: &str, context: &[RecipeDetails]) -> String {
    let mut prompt = format!("The user asked: \"{query}\"\n\nMatching recipes:\n");
    for details in context {
        let ingredients: Vec<&str> = details.ingredients.iter().map(|i| i.name.as_str()).collect();
        prompt.push_str(&format!(
            "- {} (ingredients: {}; tags: {})\n",
            details.recipe.name,
            ingredients.join(", "),
            details.tags.join(", "),
        ));
    }
    prompt.push_str("\nRecommend the most suitable recipes for the request.");
    prompt
}

impl RagEngine {
    /// Natural-language search: lexical and semantic probes run concurrently
    /// and meet at a barrier; the merged ranking is paginated and the top
    /// slice feeds answer generation. A semantic-probe failure degrades to
    /// lexical-only results; a store failure fails the request.
    pub async fn hybrid_search(
        &self,
        pool: &DbPool,
        query: &str,
        page: i64,
        page_size: i64,
    ) -> Result<HybridSearchResults> {
        if page < 1 {
            return Err(Error::Validation("page must be >= 1".to_string()));
        }
        if !(1..=100).contains(&page_size) {
            return Err(Error::Validation(
                "page_size must be between 1 and 100".to_string(),
            ));
        }

        let lexical_filter = RecipeFilter {
            q: query.to_string(),
            page: 1,
            page_size: self.tuning.lexical_candidates as i64,
            ..RecipeFilter::default()
        };

        let lexical_probe = search::search_recipes(pool, &lexical_filter);
        let semantic_probe = async {
            let vector = self.embedder.embed(query).await?;
            let mut hits = self.index.query(vector, self.tuning.semantic_top_k).await;
            hits.retain(|h| h.distance <= self.tuning.distance_threshold);
            Ok::<_, Error>(hits)
        };

        let (lexical_result, semantic_result) = tokio::join!(lexical_probe, semantic_probe);

        let lexical: FilterResults = lexical_result?;
        let mut semantic: Vec<ScoredPoint> = match semantic_result {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Semantic probe failed, degrading to lexical-only results: {e}");
                Vec::new()
            }
        };

        apply_keyword_boost(query, &mut semantic, self.tuning.distance_threshold);

        let lexical_ids: Vec<i64> = lexical.recipes.iter().map(|r| r.id).collect();
        let vector_ids: Vec<i64> = semantic.iter().map(|h| h.recipe_id).collect();
        let merged = merge_candidates(&lexical_ids, &vector_ids);

        debug!(
            "Hybrid search '{}': {} lexical, {} semantic, {} merged",
            query,
            lexical_ids.len(),
            vector_ids.len(),
            merged.len()
        );

        if merged.is_empty() {
            return Ok(HybridSearchResults {
                recipes: Vec::new(),
                total: 0,
                page,
                page_size,
                context: Vec::new(),
                answer: NO_MATCHES_ANSWER.to_string(),
            });
        }

        let page_ids = page_slice(&merged, page, page_size);
        let context_ids = &merged[..merged.len().min(self.tuning.context_size)];

        // Hydrate each unique id once across page and context. Embedding
        // entries whose recipe has since been deleted are dropped here.
        let mut hydrated: HashMap<i64, RecipeDetails> = HashMap::new();
        for &id in page_ids.iter().chain(context_ids.iter()) {
            if hydrated.contains_key(&id) {
                continue;
            }
            match recipes::get_recipe_with_details(pool, id).await {
                Ok(details) => {
                    hydrated.insert(id, details);
                }
                Err(Error::NotFound(_)) => {
                    debug!("Dropping stale candidate {id}: no longer in the record store");
                }
                Err(e) => return Err(e),
            }
        }

        let recipes_page: Vec<RecipeDetails> = page_ids
            .iter()
            .filter_map(|id| hydrated.get(id).cloned())
            .collect();
        let context: Vec<RecipeDetails> = context_ids
            .iter()
            .filter_map(|id| hydrated.get(id).cloned())
            .collect();

        let answer = if context.is_empty() {
            NO_MATCHES_ANSWER.to_string()
        } else {
            let prompt = build_context_prompt(query, &context);
            match self.completer.complete(ANSWER_SYSTEM, &prompt).await {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => FALLBACK_ANSWER.to_string(),
                Err(e) => {
                    warn!("Answer generation failed, using fallback: {e}");
                    FALLBACK_ANSWER.to_string()
                }
            }
        };

        Ok(HybridSearchResults {
            recipes: recipes_page,
            total: merged.len() as i64,
            page,
            page_size,
            context,
            answer,
        })
    }
}
