//! Condition chains
//!
//! A chain is the alternating list `[pred0, op0, pred1, op1, pred2, ...]`
//! folded strictly left to right, with no operator precedence:
//!
//! - `pred0` filters the full record set (an empty `pred0` keeps it whole)
//! - `AND pred` filters the previous step's result
//! - `OR pred` filters the full record set and appends the matches to the
//!   running result, without deduplication
//!
//! Evaluation works on record positions so callers can both project the
//! matches (select) and remove them (delete).

use std::fmt;
use std::str::FromStr;

use super::predicate::Predicate;
use crate::errors::{DbError, DbResult};
use crate::types::Record;

/// Logical connective between two predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl FromStr for LogicalOp {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("and") {
            Ok(LogicalOp::And)
        } else if s.eq_ignore_ascii_case("or") {
            Ok(LogicalOp::Or)
        } else {
            Err(DbError::MalformedCondition(format!(
                "expected AND or OR, got '{}'",
                s
            )))
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "AND"),
            LogicalOp::Or => write!(f, "OR"),
        }
    }
}

/// A parsed condition chain.
///
/// `None` predicates come from empty tokens and match every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionChain {
    first: Option<Predicate>,
    rest: Vec<(LogicalOp, Option<Predicate>)>,
}

fn parse_predicate(token: &str) -> DbResult<Option<Predicate>> {
    if token.is_empty() {
        Ok(None)
    } else {
        Predicate::parse(token).map(Some)
    }
}

impl ConditionChain {
    /// A chain matching every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Parses an alternating predicate/operator token list.
    ///
    /// An empty list matches every record. A non-empty list must have odd
    /// length, otherwise it fails with `MalformedCondition`.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> DbResult<Self> {
        if tokens.is_empty() {
            return Ok(Self::all());
        }
        if tokens.len() % 2 == 0 {
            return Err(DbError::MalformedCondition(format!(
                "expected predicate/operator alternation, got {} tokens",
                tokens.len()
            )));
        }

        let first = parse_predicate(tokens[0].as_ref())?;
        let rest = tokens[1..]
            .chunks(2)
            .map(|pair| {
                let op: LogicalOp = pair[0].as_ref().parse()?;
                Ok((op, parse_predicate(pair[1].as_ref())?))
            })
            .collect::<DbResult<Vec<_>>>()?;

        Ok(Self { first, rest })
    }

    fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.first
            .iter()
            .chain(self.rest.iter().filter_map(|(_, p)| p.as_ref()))
    }

    /// Checks every referenced column against the known columns.
    pub fn validate_columns(&self, columns: &[&str]) -> DbResult<()> {
        for pred in self.predicates() {
            if !columns.contains(&pred.column.as_str()) {
                return Err(DbError::UnknownColumn(pred.column.clone()));
            }
        }
        Ok(())
    }

    /// Folds the chain over `records`, returning matching positions.
    ///
    /// A position may appear more than once when several OR branches
    /// match the same record.
    pub fn evaluate(&self, records: &[Record]) -> DbResult<Vec<usize>> {
        let all: Vec<usize> = (0..records.len()).collect();
        let mut result = filter_positions(records, &all, self.first.as_ref())?;

        for (op, pred) in &self.rest {
            match op {
                LogicalOp::And => {
                    result = filter_positions(records, &result, pred.as_ref())?;
                }
                LogicalOp::Or => {
                    let matches = filter_positions(records, &all, pred.as_ref())?;
                    result.extend(matches);
                }
            }
        }

        Ok(result)
    }

    /// Returns the matching records in evaluation order.
    pub fn filter<'a>(&self, records: &'a [Record]) -> DbResult<Vec<&'a Record>> {
        Ok(self
            .evaluate(records)?
            .into_iter()
            .map(|i| &records[i])
            .collect())
    }
}

fn filter_positions(
    records: &[Record],
    positions: &[usize],
    predicate: Option<&Predicate>,
) -> DbResult<Vec<usize>> {
    let Some(predicate) = predicate else {
        return Ok(positions.to_vec());
    };

    let mut kept = Vec::with_capacity(positions.len());
    for &i in positions {
        if predicate.matches(&records[i])? {
            kept.push(i);
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn records(column: &str, values: &[i64]) -> Vec<Record> {
        values
            .iter()
            .map(|v| {
                let mut r = Record::new();
                r.insert(column.to_string(), Value::Integer(*v));
                r
            })
            .collect()
    }

    fn values(matched: Vec<&Record>, column: &str) -> Vec<i64> {
        matched
            .into_iter()
            .map(|r| match r.get(column) {
                Some(Value::Integer(v)) => *v,
                other => panic!("unexpected value {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_and_chain() {
        let recs = records("age", &[10, 30, 70]);
        let chain = ConditionChain::parse(&["age:>:18", "AND", "age:<:65"]).unwrap();
        assert_eq!(values(chain.filter(&recs).unwrap(), "age"), vec![30]);
    }

    #[test]
    fn test_or_chain_preserves_order() {
        let recs = records("x", &[1, 2, 3]);
        let chain = ConditionChain::parse(&["x:==:1", "OR", "x:==:2"]).unwrap();
        assert_eq!(values(chain.filter(&recs).unwrap(), "x"), vec![1, 2]);
    }

    #[test]
    fn test_or_does_not_deduplicate() {
        let recs = records("x", &[1, 2, 3]);
        let chain = ConditionChain::parse(&["x:<=:2", "or", "x:>=:2"]).unwrap();
        assert_eq!(chain.evaluate(&recs).unwrap(), vec![0, 1, 1, 2]);
    }

    #[test]
    fn test_left_fold_without_precedence() {
        // ((x == 1 OR x == 3) AND x > 2): AND applies to the whole prefix.
        let recs = records("x", &[1, 2, 3]);
        let chain =
            ConditionChain::parse(&["x:==:1", "OR", "x:==:3", "AND", "x:>:2"]).unwrap();
        assert_eq!(values(chain.filter(&recs).unwrap(), "x"), vec![3]);

        // (x > 2 AND x == 1) OR x == 2: OR re-reads the full set.
        let chain =
            ConditionChain::parse(&["x:>:2", "AND", "x:==:1", "OR", "x:==:2"]).unwrap();
        assert_eq!(values(chain.filter(&recs).unwrap(), "x"), vec![2]);
    }

    #[test]
    fn test_empty_chain_matches_all() {
        let recs = records("x", &[1, 2]);
        let empty: [&str; 0] = [];
        let chain = ConditionChain::parse(&empty).unwrap();
        assert_eq!(chain.evaluate(&recs).unwrap(), vec![0, 1]);

        let chain = ConditionChain::parse(&[""]).unwrap();
        assert_eq!(chain.evaluate(&recs).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_even_length_is_malformed() {
        assert!(matches!(
            ConditionChain::parse(&["x:==:1", "AND"]),
            Err(DbError::MalformedCondition(_))
        ));
    }

    #[test]
    fn test_bad_logical_operator() {
        assert!(matches!(
            ConditionChain::parse(&["x:==:1", "XOR", "x:==:2"]),
            Err(DbError::MalformedCondition(_))
        ));
    }

    #[test]
    fn test_validate_columns() {
        let chain = ConditionChain::parse(&["x:==:1", "AND", "y:==:2"]).unwrap();
        assert!(chain.validate_columns(&["x", "y"]).is_ok());
        assert_eq!(
            chain.validate_columns(&["x"]).unwrap_err(),
            DbError::UnknownColumn("y".into())
        );
    }

    #[test]
    fn test_empty_record_set() {
        let chain = ConditionChain::parse(&["x:==:1"]).unwrap();
        assert!(chain.evaluate(&[]).unwrap().is_empty());
    }
}
