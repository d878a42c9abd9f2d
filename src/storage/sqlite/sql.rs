//! Filter translation for the `SQLite` backend.
//!
//! Turns a [`MetadataFilter`] into a parameterized SQL predicate over the
//! metadata side table. Every key and value travels as a bound `?`
//! parameter; the only identifiers spliced into SQL are table names, which
//! are validated when options are parsed.
//!
//! Predicates are written against the records table aliased as `r`:
//!
//! ```text
//! Equals(k, v)   EXISTS (SELECT 1 FROM "t_metadata" m
//!                        WHERE m.record_id = r.id AND m.key = ? AND m.value = ?)
//! Contains(k, s) ... AND instr(m.value, ?) > 0
//! HasKey(k)      ... AND m.key = ?
//! In(k, {})      0
//! ```
//!
//! # Planning
//!
//! [`FilterTranslator::plan`] either translates a filter exactly, or pushes
//! down a predicate that matches a superset of the filter and asks the
//! caller to re-check every fetched row with [`MetadataFilter::evaluate`].
//! Both paths therefore select exactly the records the evaluator accepts.
//!
//! Translation stops at [`MAX_PUSHDOWN_DEPTH`] levels and
//! [`MAX_PUSHDOWN_PARAMS`] bound parameters; anything larger is planned the
//! same way as an untranslatable filter.

use crate::models::MetadataFilter;

/// Most bound parameters a pushed-down predicate may carry. `SQLite`
/// rejects statements with more than 32766.
pub const MAX_PUSHDOWN_PARAMS: usize = 10_000;

/// Deepest filter tree that is pushed down. `SQLite` limits expression depth
/// and parser nesting; deeper filters are evaluated in memory.
pub const MAX_PUSHDOWN_DEPTH: usize = 32;

/// Takes `n` parameters from `budget`, or `None` if it would run out.
fn charge(budget: &mut usize, n: usize) -> Option<()> {
    *budget = budget.checked_sub(n)?;
    Some(())
}

/// A SQL boolean expression and its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlPredicate {
    /// SQL text using anonymous `?` placeholders.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<String>,
}

impl SqlPredicate {
    fn new(sql: String, params: Vec<String>) -> Self {
        Self { sql, params }
    }

    fn constant(value: bool) -> Self {
        Self::new(if value { "1" } else { "0" }.to_string(), Vec::new())
    }

    fn combine(self, op: &str, other: Self) -> Self {
        let mut params = self.params;
        params.extend(other.params);
        Self::new(format!("({} {op} {})", self.sql, other.sql), params)
    }

    fn negate(self) -> Self {
        Self::new(format!("(NOT {})", self.sql), self.params)
    }
}

/// Which filter shapes the backend may translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushdownCapabilities {
    /// Translate filters at all.
    pub enabled: bool,
    /// Translate `Contains`.
    pub substring: bool,
}

impl Default for PushdownCapabilities {
    fn default() -> Self {
        Self {
            enabled: true,
            substring: true,
        }
    }
}

/// How a filter will be applied to a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPlan {
    /// Predicate to add to the `WHERE` clause, if any.
    pub predicate: Option<SqlPredicate>,
    /// Fetched rows must be re-checked in memory.
    pub residual: bool,
}

impl FilterPlan {
    /// Plan that selects every row.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            predicate: None,
            residual: false,
        }
    }

    /// Returns true when the SQL result is already exact.
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        !self.residual
    }
}

/// Translates metadata filters into SQL predicates.
#[derive(Debug, Clone)]
pub struct FilterTranslator {
    metadata_table: String,
    capabilities: PushdownCapabilities,
}

impl FilterTranslator {
    /// Creates a translator for the given metadata side table.
    #[must_use]
    pub fn new(metadata_table: impl Into<String>, capabilities: PushdownCapabilities) -> Self {
        Self {
            metadata_table: metadata_table.into(),
            capabilities,
        }
    }

    /// Plans how to apply `filter`.
    #[must_use]
    pub fn plan(&self, filter: Option<&MetadataFilter>) -> FilterPlan {
        let Some(filter) = filter else {
            return FilterPlan::all();
        };
        if !self.capabilities.enabled {
            return FilterPlan {
                predicate: None,
                residual: true,
            };
        }
        if let Some(predicate) = self.translate(filter) {
            return FilterPlan {
                predicate: Some(predicate),
                residual: false,
            };
        }
        let predicate = self.superset(filter);
        tracing::debug!(
            %filter,
            partial = predicate.is_some(),
            "Filter not fully translatable, evaluating in memory"
        );
        FilterPlan {
            predicate,
            residual: true,
        }
    }

    /// Translates `filter` exactly, or returns `None` if any part of it
    /// cannot be expressed.
    ///
    /// Filters deeper than [`MAX_PUSHDOWN_DEPTH`] or needing more than
    /// [`MAX_PUSHDOWN_PARAMS`] bound parameters are not translated.
    #[must_use]
    pub fn translate(&self, filter: &MetadataFilter) -> Option<SqlPredicate> {
        if !self.capabilities.enabled {
            return None;
        }
        let mut budget = MAX_PUSHDOWN_PARAMS;
        self.translate_bounded(filter, 0, &mut budget)
    }

    fn translate_bounded(
        &self,
        filter: &MetadataFilter,
        depth: usize,
        budget: &mut usize,
    ) -> Option<SqlPredicate> {
        if depth > MAX_PUSHDOWN_DEPTH {
            return None;
        }
        match filter {
            MetadataFilter::Equals { key, value } => {
                charge(budget, 2)?;
                Some(self.exists(
                    "m.key = ? AND m.value = ?",
                    vec![key.clone(), value.clone()],
                ))
            },
            MetadataFilter::Contains { key, substring } => {
                if substring.is_empty() {
                    charge(budget, 1)?;
                    Some(self.exists("m.key = ?", vec![key.clone()]))
                } else if self.capabilities.substring {
                    charge(budget, 2)?;
                    Some(self.exists(
                        "m.key = ? AND instr(m.value, ?) > 0",
                        vec![key.clone(), substring.clone()],
                    ))
                } else {
                    None
                }
            },
            MetadataFilter::HasKey { key } => {
                charge(budget, 1)?;
                Some(self.exists("m.key = ?", vec![key.clone()]))
            },
            MetadataFilter::In { key, values } => {
                if values.is_empty() {
                    return Some(SqlPredicate::constant(false));
                }
                charge(budget, values.len() + 1)?;
                let placeholders = vec!["?"; values.len()].join(", ");
                let mut params = Vec::with_capacity(values.len() + 1);
                params.push(key.clone());
                params.extend(values.iter().cloned());
                Some(self.exists(
                    &format!("m.key = ? AND m.value IN ({placeholders})"),
                    params,
                ))
            },
            MetadataFilter::And(left, right) => {
                let left = self.translate_bounded(left, depth + 1, budget)?;
                Some(left.combine("AND", self.translate_bounded(right, depth + 1, budget)?))
            },
            MetadataFilter::Or(left, right) => {
                let left = self.translate_bounded(left, depth + 1, budget)?;
                Some(left.combine("OR", self.translate_bounded(right, depth + 1, budget)?))
            },
            MetadataFilter::Not(inner) => {
                Some(self.translate_bounded(inner, depth + 1, budget)?.negate())
            },
        }
    }

    /// Returns a predicate matching every record `filter` matches, possibly
    /// more. `None` means no useful narrowing exists.
    fn superset(&self, filter: &MetadataFilter) -> Option<SqlPredicate> {
        let mut budget = MAX_PUSHDOWN_PARAMS;
        self.superset_bounded(filter, 0, &mut budget)
    }

    fn superset_bounded(
        &self,
        filter: &MetadataFilter,
        depth: usize,
        budget: &mut usize,
    ) -> Option<SqlPredicate> {
        if depth > MAX_PUSHDOWN_DEPTH {
            return None;
        }
        let mut trial = *budget;
        if let Some(exact) = self.translate_bounded(filter, depth, &mut trial) {
            *budget = trial;
            return Some(exact);
        }
        match filter {
            MetadataFilter::And(left, right) => {
                let left = self.superset_bounded(left, depth + 1, budget);
                let right = self.superset_bounded(right, depth + 1, budget);
                match (left, right) {
                    (Some(l), Some(r)) => Some(l.combine("AND", r)),
                    (Some(side), None) | (None, Some(side)) => Some(side),
                    (None, None) => None,
                }
            },
            MetadataFilter::Or(left, right) => {
                let left = self.superset_bounded(left, depth + 1, budget)?;
                Some(left.combine("OR", self.superset_bounded(right, depth + 1, budget)?))
            },
            // Both still require the key: Contains without substring
            // support, In with too many values to bind.
            MetadataFilter::Contains { key, .. } | MetadataFilter::In { key, .. } => {
                charge(budget, 1)?;
                Some(self.exists("m.key = ?", vec![key.clone()]))
            },
            _ => None,
        }
    }

    fn exists(&self, condition: &str, params: Vec<String>) -> SqlPredicate {
        SqlPredicate::new(
            format!(
                "EXISTS (SELECT 1 FROM \"{}\" m WHERE m.record_id = r.id AND {condition})",
                self.metadata_table
            ),
            params,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> FilterTranslator {
        FilterTranslator::new("vectors_metadata", PushdownCapabilities::default())
    }

    fn without_substring() -> FilterTranslator {
        FilterTranslator::new(
            "vectors_metadata",
            PushdownCapabilities {
                enabled: true,
                substring: false,
            },
        )
    }

    #[test]
    fn test_translate_equals() {
        let predicate = translator()
            .translate(&MetadataFilter::equals("type", "doc"))
            .unwrap();
        assert_eq!(
            predicate.sql,
            "EXISTS (SELECT 1 FROM \"vectors_metadata\" m WHERE m.record_id = r.id AND m.key = ? AND m.value = ?)"
        );
        assert_eq!(predicate.params, vec!["type", "doc"]);
    }

    #[test]
    fn test_values_are_parameters() {
        let hostile = "x' OR 1=1 --";
        let predicate = translator()
            .translate(&MetadataFilter::equals(hostile, hostile))
            .unwrap();
        assert!(!predicate.sql.contains(hostile));
        assert_eq!(predicate.params, vec![hostile, hostile]);
    }

    #[test]
    fn test_translate_in() {
        let predicate = translator()
            .translate(&MetadataFilter::is_in("lang", ["en", "es"]))
            .unwrap();
        assert!(predicate.sql.contains("m.value IN (?, ?)"));
        assert_eq!(predicate.params, vec!["lang", "en", "es"]);

        let empty = translator()
            .translate(&MetadataFilter::is_in("lang", Vec::<String>::new()))
            .unwrap();
        assert_eq!(empty.sql, "0");
        assert!(empty.params.is_empty());
    }

    #[test]
    fn test_translate_contains() {
        let predicate = translator()
            .translate(&MetadataFilter::contains("title", "rust"))
            .unwrap();
        assert!(predicate.sql.contains("instr(m.value, ?) > 0"));
        assert_eq!(predicate.params, vec!["title", "rust"]);

        let empty_needle = translator()
            .translate(&MetadataFilter::contains("title", ""))
            .unwrap();
        assert!(!empty_needle.sql.contains("instr"));
        assert_eq!(empty_needle.params, vec!["title"]);
    }

    #[test]
    fn test_translate_composites_keep_param_order() {
        let filter = MetadataFilter::equals("a", "1")
            .or(MetadataFilter::has_key("b"))
            .and(!MetadataFilter::equals("c", "3"));
        let predicate = translator().translate(&filter).unwrap();
        assert!(predicate.sql.starts_with("(("));
        assert!(predicate.sql.contains(" OR "));
        assert!(predicate.sql.contains(" AND (NOT "));
        assert_eq!(predicate.params, vec!["a", "1", "b", "c", "3"]);
    }

    #[test]
    fn test_plan_without_filter() {
        assert_eq!(translator().plan(None), FilterPlan::all());
    }

    #[test]
    fn test_plan_exact() {
        let filter = MetadataFilter::equals("type", "doc");
        let plan = translator().plan(Some(&filter));
        assert!(plan.is_exact());
        assert!(plan.predicate.is_some());
    }

    #[test]
    fn test_plan_disabled() {
        let translator = FilterTranslator::new(
            "vectors_metadata",
            PushdownCapabilities {
                enabled: false,
                substring: true,
            },
        );
        let filter = MetadataFilter::equals("type", "doc");
        let plan = translator.plan(Some(&filter));
        assert!(plan.residual);
        assert!(plan.predicate.is_none());
    }

    #[test]
    fn test_plan_partial_and() {
        let filter =
            MetadataFilter::equals("type", "doc").and(MetadataFilter::contains("title", "rust"));
        let plan = without_substring().plan(Some(&filter));
        assert!(plan.residual);
        let predicate = plan.predicate.unwrap();
        assert_eq!(predicate.params, vec!["type", "doc", "title"]);
        assert!(!predicate.sql.contains("instr"));
    }

    #[test]
    fn test_plan_partial_not_pushes_nothing() {
        let filter = !MetadataFilter::contains("title", "rust");
        let plan = without_substring().plan(Some(&filter));
        assert!(plan.residual);
        assert!(plan.predicate.is_none());
    }

    #[test]
    fn test_plan_partial_or_needs_both_sides() {
        let both = MetadataFilter::contains("title", "rust").or(MetadataFilter::has_key("x"));
        let plan = without_substring().plan(Some(&both));
        assert!(plan.residual);
        assert_eq!(plan.predicate.unwrap().params, vec!["title", "x"]);

        let one = (!MetadataFilter::contains("title", "rust")).or(MetadataFilter::has_key("x"));
        let plan = without_substring().plan(Some(&one));
        assert!(plan.residual);
        assert!(plan.predicate.is_none());
    }

    fn or_chain(terms: usize) -> MetadataFilter {
        (1..terms).fold(MetadataFilter::equals("n", "0"), |acc, i| {
            acc.or(MetadataFilter::equals("n", i.to_string()))
        })
    }

    #[test]
    fn test_large_in_set_falls_back_to_key() {
        let values: Vec<String> = (0..=MAX_PUSHDOWN_PARAMS).map(|i| i.to_string()).collect();
        let filter = MetadataFilter::is_in("tag", values);
        assert!(translator().translate(&filter).is_none());

        let plan = translator().plan(Some(&filter));
        assert!(plan.residual);
        assert_eq!(plan.predicate.unwrap().params, vec!["tag"]);
    }

    #[test]
    fn test_param_budget_spans_the_whole_tree() {
        let half: Vec<String> = (0..MAX_PUSHDOWN_PARAMS / 2).map(|i| i.to_string()).collect();
        let one = MetadataFilter::is_in("a", half.clone());
        assert!(translator().translate(&one).is_some());

        let both = one.and(MetadataFilter::is_in("b", half));
        assert!(translator().translate(&both).is_none());
        let plan = translator().plan(Some(&both));
        assert!(plan.residual);
        assert!(plan.predicate.unwrap().params.len() <= MAX_PUSHDOWN_PARAMS);
    }

    #[test]
    fn test_deep_filters_are_not_pushed_down() {
        assert!(translator().translate(&or_chain(MAX_PUSHDOWN_DEPTH)).is_some());

        let deep = or_chain(1_200);
        assert!(translator().translate(&deep).is_none());
        let plan = translator().plan(Some(&deep));
        assert!(plan.residual);
        assert!(plan.predicate.is_none());

        let narrowed = MetadataFilter::has_key("n").and(deep);
        let plan = translator().plan(Some(&narrowed));
        assert!(plan.residual);
        assert_eq!(plan.predicate.unwrap().params, vec!["n"]);
    }
}
