//! Turns a raw user query into match expressions for either index.
//!
//! Every term ends up inside an FTS5 double-quoted string, so operator
//! characters typed by the user are searched for literally instead of being
//! interpreted by the match grammar.

use super::fuzzy;
use crate::database::{IndexKind, IndexQuery};
use crate::error::QueryError;
use std::collections::HashMap;

const AND_KEYWORD: &str = "AND";

/// Characters removed from unquoted tokens
const STRIPPED_CHARS: [char; 3] = ['"', '\'', '`'];

/// Equivalence classes of spellings that should find each other
#[derive(Debug, Clone)]
pub struct Thesaurus {
    classes: Vec<Vec<String>>,
    lookup: HashMap<String, usize>,
}

impl Default for Thesaurus {
    fn default() -> Self {
        Self::with_extra(&[])
    }
}

impl Thesaurus {
    /// The built-in classes plus `extra`. A class sharing a member with an
    /// earlier one is merged into it.
    pub fn with_extra(extra: &[Vec<String>]) -> Self {
        let mut thesaurus = Self {
            classes: Vec::new(),
            lookup: HashMap::new(),
        };
        thesaurus.add_class(&["george", "jorge"]);
        for class in extra {
            thesaurus.add_class(class);
        }
        thesaurus
    }

    fn add_class<S: AsRef<str>>(&mut self, members: &[S]) {
        let members: Vec<String> = members
            .iter()
            .map(|m| sanitize_token(m.as_ref()).to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        if members.len() < 2 {
            return;
        }

        let idx = match members.iter().find_map(|m| self.lookup.get(m).copied()) {
            Some(idx) => idx,
            None => {
                self.classes.push(Vec::new());
                self.classes.len() - 1
            }
        };
        for member in members {
            if !self.classes[idx].contains(&member) {
                self.classes[idx].push(member.clone());
            }
            self.lookup.insert(member, idx);
        }
    }

    pub fn expand(&self, token: &str) -> Option<&[String]> {
        self.lookup
            .get(&token.to_lowercase())
            .map(|&idx| self.classes[idx].as_slice())
    }
}

fn sanitize_token(token: &str) -> String {
    token.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect()
}

/// FTS5 string literal
fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Word(String),
    /// Thesaurus expansion; any member may match
    AnyOf(Vec<String>),
}

impl Term {
    fn alternatives(&self) -> Vec<&str> {
        match self {
            Term::Word(w) => vec![w.as_str()],
            Term::AnyOf(ws) => ws.iter().map(String::as_str).collect(),
        }
    }

    fn match_expr(&self) -> String {
        match self {
            Term::Word(w) => quote(w),
            Term::AnyOf(ws) => format!(
                "({})",
                ws.iter().map(|w| quote(w)).collect::<Vec<_>>().join(" OR ")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Fully quoted query, searched as one phrase
    Phrase(String),
    /// AND clauses, each a conjunction of terms
    Clauses(Vec<Vec<Term>>),
}

impl QueryPlan {
    /// `Ok(None)` when nothing searchable is left
    pub fn parse(raw: &str, thesaurus: &Thesaurus) -> Result<Option<Self>, QueryError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let quote_count = trimmed.matches('"').count();
        if quote_count % 2 != 0 {
            return Err(QueryError::Malformed(trimmed.to_string()));
        }

        if quote_count == 2 && trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            let phrase = trimmed[1..trimmed.len() - 1]
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            return Ok((!phrase.is_empty()).then_some(QueryPlan::Phrase(phrase)));
        }

        let mut clauses: Vec<Vec<Term>> = vec![Vec::new()];
        for token in trimmed.split_whitespace() {
            if token.eq_ignore_ascii_case(AND_KEYWORD) {
                clauses.push(Vec::new());
                continue;
            }
            let word = sanitize_token(token);
            if !word.chars().any(char::is_alphanumeric) {
                continue;
            }
            let term = match thesaurus.expand(&word) {
                Some(class) => Term::AnyOf(class.to_vec()),
                None => Term::Word(word),
            };
            if let Some(current) = clauses.last_mut() {
                current.push(term);
            }
        }
        clauses.retain(|c| !c.is_empty());

        Ok((!clauses.is_empty()).then_some(QueryPlan::Clauses(clauses)))
    }

    pub fn is_verbatim(&self) -> bool {
        matches!(self, QueryPlan::Phrase(_))
    }

    /// Lookup against the stemmed index
    pub fn exact_query(&self) -> IndexQuery {
        match self {
            QueryPlan::Phrase(phrase) => IndexQuery::exact(quote(phrase), Vec::new()),
            QueryPlan::Clauses(clauses) => {
                let exprs: Vec<String> = clauses
                    .iter()
                    .map(|terms| {
                        terms
                            .iter()
                            .map(Term::match_expr)
                            .collect::<Vec<_>>()
                            .join(" AND ")
                    })
                    .collect();
                let (match_expr, required) = combine_clauses(exprs);
                IndexQuery::exact(match_expr, required)
            }
        }
    }

    /// Lookup against the trigram index. `None` for phrases, and when some
    /// clause has no word long enough to produce a trigram.
    pub fn fuzzy_query(&self, min_score: f64) -> Option<IndexQuery> {
        let clauses = match self {
            QueryPlan::Phrase(_) => return None,
            QueryPlan::Clauses(clauses) => clauses,
        };

        let mut exprs = Vec::with_capacity(clauses.len());
        let mut clause_groups = Vec::with_capacity(clauses.len());
        for terms in clauses {
            let groups: Vec<Vec<String>> = terms
                .iter()
                .map(|term| {
                    let mut alts: Vec<String> = Vec::new();
                    for alt in term.alternatives() {
                        let word = fuzzy::normalize_word(alt);
                        if !word.is_empty() && !alts.contains(&word) {
                            alts.push(word);
                        }
                    }
                    alts
                })
                .filter(|alts| !alts.is_empty())
                .collect();

            let mut trigrams: Vec<String> = Vec::new();
            for word in groups.iter().flatten() {
                for trigram in fuzzy::index_trigrams(word) {
                    if !trigrams.contains(&trigram) {
                        trigrams.push(trigram);
                    }
                }
            }
            if trigrams.is_empty() {
                return None;
            }

            exprs.push(
                trigrams
                    .iter()
                    .map(|t| quote(t))
                    .collect::<Vec<_>>()
                    .join(" OR "),
            );
            clause_groups.push(groups);
        }

        let clause_score_terms = if clause_groups.len() > 1 {
            clause_groups.iter().map(|g| fuzzy::encode_terms(g)).collect()
        } else {
            Vec::new()
        };
        let (match_expr, required_clauses) = combine_clauses(exprs);

        Some(IndexQuery {
            kind: IndexKind::Fuzzy,
            match_expr,
            required_clauses,
            score_terms: Some(fuzzy::encode_clauses(&clause_groups)),
            clause_score_terms,
            min_score,
        })
    }
}

/// Row predicate matching any clause, plus the per-clause expressions that
/// restrict results to files matching every clause
fn combine_clauses(exprs: Vec<String>) -> (String, Vec<String>) {
    if exprs.len() == 1 {
        let expr = exprs.into_iter().next().unwrap_or_default();
        return (expr, Vec::new());
    }
    let combined = exprs
        .iter()
        .map(|e| format!("({})", e))
        .collect::<Vec<_>>()
        .join(" OR ");
    (combined, exprs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(raw: &str) -> QueryPlan {
        QueryPlan::parse(raw, &Thesaurus::default())
            .unwrap()
            .expect("searchable query")
    }

    #[test]
    fn test_blank_and_separator_only_queries() {
        let thesaurus = Thesaurus::default();
        assert_eq!(QueryPlan::parse("   ", &thesaurus), Ok(None));
        assert_eq!(QueryPlan::parse("AND and", &thesaurus), Ok(None));
        assert_eq!(QueryPlan::parse("' ` ''", &thesaurus), Ok(None));
        assert_eq!(QueryPlan::parse("\"  \"", &thesaurus), Ok(None));
    }

    #[test]
    fn test_odd_quotes_are_malformed() {
        let result = QueryPlan::parse("\"rick said", &Thesaurus::default());
        assert!(matches!(result, Err(QueryError::Malformed(_))));
    }

    #[test]
    fn test_verbatim_phrase() {
        let p = plan("\"  Rick   AND george \"");
        assert!(p.is_verbatim());
        assert_eq!(p, QueryPlan::Phrase("Rick AND george".into()));

        let q = p.exact_query();
        assert_eq!(q.match_expr, "\"Rick AND george\"");
        assert!(q.required_clauses.is_empty());
        assert!(p.fuzzy_query(0.3).is_none());
    }

    #[test]
    fn test_quoted_words_are_not_verbatim() {
        let p = plan("\"rick\" \"suds\"");
        assert!(!p.is_verbatim());
        assert_eq!(p.exact_query().match_expr, "\"rick\" AND \"suds\"");
    }

    #[test]
    fn test_thesaurus_expansion() {
        let p = plan("Jorge's call");
        assert_eq!(
            p.exact_query().match_expr,
            "\"Jorges\" AND \"call\""
        );

        let p = plan("JORGE call");
        assert_eq!(
            p.exact_query().match_expr,
            "(\"george\" OR \"jorge\") AND \"call\""
        );
    }

    #[test]
    fn test_thesaurus_extra_classes_merge() {
        let thesaurus = Thesaurus::with_extra(&[
            vec!["suds".into(), "sudsy".into()],
            vec!["Jorge".into(), "Jorje".into()],
        ]);
        assert_eq!(
            thesaurus.expand("jorje"),
            Some(&["george".to_string(), "jorge".to_string(), "jorje".to_string()][..])
        );
        assert_eq!(thesaurus.expand("SUDSY").map(|c| c.len()), Some(2));
        assert_eq!(thesaurus.expand("rick"), None);
    }

    #[test]
    fn test_stripped_characters() {
        let p = plan("o'brien `tick` (paren) x*");
        assert_eq!(
            p.exact_query().match_expr,
            "\"obrien\" AND \"tick\" AND \"(paren)\" AND \"x*\""
        );
    }

    #[test]
    fn test_punctuation_tokens_dropped() {
        assert_eq!(plan("snacks &").exact_query().match_expr, "\"snacks\"");
        assert_eq!(
            plan("Rick - Suds \u{2014}").exact_query().match_expr,
            "\"Rick\" AND \"Suds\""
        );
        assert_eq!(QueryPlan::parse("& -", &Thesaurus::default()), Ok(None));
    }

    #[test]
    fn test_and_splits_clauses() {
        let p = plan("Rick and Suds");
        let q = p.exact_query();
        assert_eq!(q.match_expr, "(\"Rick\") OR (\"Suds\")");
        assert_eq!(q.required_clauses, vec!["\"Rick\"", "\"Suds\""]);
        assert_eq!(q.kind, IndexKind::Exact);
    }

    #[test]
    fn test_fuzzy_single_clause() {
        let q = plan("Sudds").fuzzy_query(0.3).unwrap();
        assert_eq!(q.kind, IndexKind::Fuzzy);
        assert_eq!(q.match_expr, "\"sud\" OR \"udd\" OR \"dds\"");
        assert!(q.required_clauses.is_empty());
        assert!(q.clause_score_terms.is_empty());
        assert_eq!(q.score_terms.as_deref(), Some("sudds"));
        assert_eq!(q.min_score, 0.3);
    }

    #[test]
    fn test_fuzzy_clauses_and_groups() {
        let q = plan("jorge AND sudds").fuzzy_query(0.4).unwrap();
        assert_eq!(q.required_clauses.len(), 2);
        assert_eq!(q.clause_score_terms, vec!["george|jorge", "sudds"]);
        assert_eq!(q.score_terms.as_deref(), Some("george|jorge;sudds"));
    }

    #[test]
    fn test_fuzzy_needs_trigrams_in_every_clause() {
        assert!(plan("ab").fuzzy_query(0.3).is_none());
        assert!(plan("suds AND ab").fuzzy_query(0.3).is_none());
        // Short words still take part in scoring when a sibling yields trigrams
        let q = plan("ab suds").fuzzy_query(0.3).unwrap();
        assert_eq!(q.score_terms.as_deref(), Some("ab suds"));
    }
}
