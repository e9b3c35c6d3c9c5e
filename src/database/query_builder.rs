//! Composes the segment lookup statement.
//!
//! Only table names (from `IndexKind`) and fixed clause text are written into
//! the SQL; every user-derived value goes into the parameter list, in the
//! same order as its `?` placeholder.

use super::models::{IndexQuery, SegmentFilter};
use rusqlite::types::Value;

pub(crate) struct SegmentQueryBuilder<'q> {
    query: &'q IndexQuery,
    filter: &'q SegmentFilter,
}

impl<'q> SegmentQueryBuilder<'q> {
    pub fn new(query: &'q IndexQuery, filter: &'q SegmentFilter) -> Self {
        Self { query, filter }
    }

    pub fn build(&self, limit: i64, offset: i64) -> (String, Vec<Value>) {
        let t = self.query.kind.table();
        let content_type = self.filter.content_type.as_str().to_string();
        let mut values: Vec<Value> = Vec::new();

        let mut sql = format!(
            "SELECT {t}.segment_id, {t}.file, {t}.line_offset, {t}.date, {t}.content_type,
                    {t}.start_seconds, {t}.text_content,
                    snippet({t}, 6, '<mark>', '</mark>', '...', 32) AS snippet,
                    bm25({t}) AS rank,
                    COALESCE(l.video_url, e.video_url),
                    COALESCE(l.custom_title, e.custom_title),
                    l.host"
        );

        if let Some(terms) = &self.query.score_terms {
            sql.push_str(&format!(", fuzzy_score({t}.text_content, ?) AS score"));
            values.push(Value::from(terms.clone()));
        }

        sql.push_str(&format!(
            "
             FROM {t}
             LEFT JOIN episodes e ON e.file = {t}.file
             LEFT JOIN links l ON l.date = {t}.date
             WHERE {t} MATCH ? AND {t}.content_type = ?"
        ));
        values.push(Value::from(self.query.match_expr.clone()));
        values.push(Value::from(content_type.clone()));

        if !self.filter.years.is_empty() {
            let ors = vec![format!("{t}.date LIKE ?"); self.filter.years.len()].join(" OR ");
            sql.push_str(&format!(" AND ({})", ors));
            for year in &self.filter.years {
                values.push(Value::from(format!("{:04}-%", year)));
            }
        }

        if let Some(terms) = &self.query.score_terms {
            sql.push_str(&format!(" AND fuzzy_score({t}.text_content, ?) >= ?"));
            values.push(Value::from(terms.clone()));
            values.push(Value::from(self.query.min_score));
        }

        if !self.query.required_clauses.is_empty() {
            let mut parts = Vec::with_capacity(self.query.required_clauses.len());
            for (i, clause) in self.query.required_clauses.iter().enumerate() {
                let mut part = format!("SELECT file FROM {t}(?) WHERE content_type = ?");
                values.push(Value::from(clause.clone()));
                values.push(Value::from(content_type.clone()));

                if let Some(terms) = self.query.clause_score_terms.get(i) {
                    part.push_str(" AND fuzzy_score(text_content, ?) >= ?");
                    values.push(Value::from(terms.clone()));
                    values.push(Value::from(self.query.min_score));
                }
                parts.push(part);
            }
            sql.push_str(&format!(
                " AND {t}.file IN ({})",
                parts.join(" INTERSECT ")
            ));
        }

        if self.query.score_terms.is_some() {
            sql.push_str(&format!(" ORDER BY score DESC, rank, {t}.rowid"));
        } else {
            sql.push_str(&format!(" ORDER BY rank, {t}.rowid"));
        }

        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(Value::from(limit));
        values.push(Value::from(offset));

        (sql, values)
    }
}
