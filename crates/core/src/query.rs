//! Query expressions
//!
//! Queries are a small tagged tree instead of nested string-keyed maps:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | `Literal(v)` | a value operand (may hold records before canonicalization) |
//! | `Sequence(xs)` | an ordered list operand (`$in`, `$all`, ...) |
//! | `FieldMatch { field, op, operand }` | one predicate on a field path |
//! | `And(xs)` / `Or(xs)` / `Nor(xs)` | boolean combinators |
//! | `Raw(json)` | operand already in storage form, passed through untouched |
//!
//! The untyped mapping form used by document stores can be parsed with
//! [`Expr::from_value`]; a canonical tree is rendered back to that form with
//! [`Expr::to_storage`].

use crate::codec::ReferenceCodec;
use crate::error::{BridgeError, BridgeResult};
use crate::value::Value;
use serde_json::{Map, Value as StoredValue};
use std::fmt;

/// Comparison operator of a field predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `$eq`
    Eq,
    /// `$ne`
    Ne,
    /// `$gt`
    Gt,
    /// `$gte`
    Gte,
    /// `$lt`
    Lt,
    /// `$lte`
    Lte,
    /// `$in`: equals one of
    In,
    /// `$nin`: equals none of
    Nin,
    /// `$all`: contains all of
    All,
    /// `$exists`
    Exists,
}

impl Operator {
    /// Storage spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::In => "$in",
            Operator::Nin => "$nin",
            Operator::All => "$all",
            Operator::Exists => "$exists",
        }
    }

    /// Parse the storage spelling
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "$eq" => Operator::Eq,
            "$ne" => Operator::Ne,
            "$gt" => Operator::Gt,
            "$gte" => Operator::Gte,
            "$lt" => Operator::Lt,
            "$lte" => Operator::Lte,
            "$in" => Operator::In,
            "$nin" => Operator::Nin,
            "$all" => Operator::All,
            "$exists" => Operator::Exists,
            _ => return None,
        })
    }

    /// Operators taking a list of candidates
    pub fn is_membership(self) -> bool {
        matches!(self, Operator::In | Operator::Nin | Operator::All)
    }

    /// Operators comparing against a single value for (in)equality
    pub fn is_equality(self) -> bool {
        matches!(self, Operator::Eq | Operator::Ne)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Value operand
    Literal(Value),
    /// Ordered list operand
    Sequence(Vec<Expr>),
    /// Predicate on one field path
    FieldMatch {
        /// Dotted field path
        field: String,
        /// Comparison operator
        op: Operator,
        /// Right-hand side
        operand: Box<Expr>,
    },
    /// All children match
    And(Vec<Expr>),
    /// Any child matches
    Or(Vec<Expr>),
    /// No child matches
    Nor(Vec<Expr>),
    /// Storage-form operand, never rewritten
    Raw(StoredValue),
}

impl Expr {
    /// Match everything
    pub fn all() -> Self {
        Expr::And(Vec::new())
    }

    /// Generic field predicate
    pub fn field(field: impl Into<String>, op: Operator, operand: Expr) -> Self {
        Expr::FieldMatch {
            field: field.into(),
            op,
            operand: Box::new(operand),
        }
    }

    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Operator::Eq, Expr::Literal(value.into()))
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Operator::Ne, Expr::Literal(value.into()))
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Operator::Gt, Expr::Literal(value.into()))
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Operator::Gte, Expr::Literal(value.into()))
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Operator::Lt, Expr::Literal(value.into()))
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Operator::Lte, Expr::Literal(value.into()))
    }

    /// `field` equals one of `values`
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::field(field, Operator::In, Self::sequence(values))
    }

    /// `field` equals none of `values`
    pub fn not_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::field(field, Operator::Nin, Self::sequence(values))
    }

    /// `field` contains all of `values`
    pub fn all_of<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::field(field, Operator::All, Self::sequence(values))
    }

    /// `field` is present (or absent)
    pub fn exists(field: impl Into<String>, present: bool) -> Self {
        Self::field(field, Operator::Exists, Expr::Literal(Value::Bool(present)))
    }

    /// Conjunction
    pub fn and(children: Vec<Expr>) -> Self {
        Expr::And(children)
    }

    /// Disjunction
    pub fn or(children: Vec<Expr>) -> Self {
        Expr::Or(children)
    }

    /// Negated disjunction
    pub fn nor(children: Vec<Expr>) -> Self {
        Expr::Nor(children)
    }

    fn sequence<I, V>(values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expr::Sequence(values.into_iter().map(|v| Expr::Literal(v.into())).collect())
    }

    /// Parse the untyped mapping form
    ///
    /// - `{"$and": [..]}`, `{"$or": [..]}`, `{"$nor": [..]}` become combinators
    /// - `{field: {"$op": operand, ..}}` becomes one predicate per operator
    /// - `{field: value}` becomes an equality predicate
    /// - several entries in one mapping are joined with `And`
    ///
    /// List operands become `Sequence`s.
    pub fn from_value(value: Value) -> BridgeResult<Self> {
        let map = match value {
            Value::Map(m) => m,
            other => {
                return Err(BridgeError::invalid_query(format!(
                    "query must be a mapping, got {}",
                    other.type_name()
                )))
            }
        };

        let mut clauses = Vec::with_capacity(map.len());
        for (key, value) in map {
            match key.as_str() {
                "$and" | "$or" | "$nor" => {
                    let items = match value {
                        Value::Array(items) => items,
                        other => {
                            return Err(BridgeError::invalid_query(format!(
                                "{} expects a list, got {}",
                                key,
                                other.type_name()
                            )))
                        }
                    };
                    let children = items
                        .into_iter()
                        .map(Expr::from_value)
                        .collect::<BridgeResult<Vec<_>>>()?;
                    clauses.push(match key.as_str() {
                        "$and" => Expr::And(children),
                        "$or" => Expr::Or(children),
                        _ => Expr::Nor(children),
                    });
                }
                k if k.starts_with('$') => {
                    return Err(BridgeError::invalid_query(format!(
                        "unsupported top-level operator '{}'",
                        k
                    )))
                }
                _ => clauses.extend(Self::parse_field(key, value)?),
            }
        }

        Ok(match clauses.len() {
            1 => clauses.remove(0),
            _ => Expr::And(clauses),
        })
    }

    fn parse_field(field: String, value: Value) -> BridgeResult<Vec<Expr>> {
        let is_operator_map = matches!(
            &value,
            Value::Map(m) if !m.is_empty() && m.keys().all(|k| k.starts_with('$'))
        );
        if !is_operator_map {
            return Ok(vec![Expr::field(field, Operator::Eq, Expr::Literal(value))]);
        }
        let Value::Map(ops) = value else {
            return Ok(Vec::new());
        };
        ops.into_iter()
            .map(|(op, operand)| {
                let op = Operator::parse(&op).ok_or_else(|| {
                    BridgeError::invalid_query(format!("unsupported operator '{}'", op))
                })?;
                let operand = match operand {
                    Value::Array(items) => {
                        Expr::Sequence(items.into_iter().map(Expr::Literal).collect())
                    }
                    other => Expr::Literal(other),
                };
                Ok(Expr::field(field.clone(), op, operand))
            })
            .collect()
    }

    /// Render into the store's query document
    ///
    /// Predicates always use explicit operators (`{"f": {"$eq": v}}`);
    /// conjunctions render as `$and`, and an empty conjunction as `{}`.
    pub fn to_storage(&self, codec: &ReferenceCodec) -> BridgeResult<StoredValue> {
        match self {
            Expr::Literal(v) => codec.encode(v),
            Expr::Raw(raw) => Ok(raw.clone()),
            Expr::Sequence(items) => Ok(StoredValue::Array(
                items
                    .iter()
                    .map(|e| e.to_storage(codec))
                    .collect::<BridgeResult<Vec<_>>>()?,
            )),
            Expr::FieldMatch { field, op, operand } => {
                let mut predicate = Map::new();
                predicate.insert(op.as_str().to_string(), operand.to_storage(codec)?);
                let mut doc = Map::new();
                doc.insert(field.clone(), StoredValue::Object(predicate));
                Ok(StoredValue::Object(doc))
            }
            Expr::And(children) if children.is_empty() => Ok(StoredValue::Object(Map::new())),
            Expr::And(children) => Self::render_combinator("$and", children, codec),
            Expr::Or(children) => Self::render_combinator("$or", children, codec),
            Expr::Nor(children) => Self::render_combinator("$nor", children, codec),
        }
    }

    fn render_combinator(
        key: &str,
        children: &[Expr],
        codec: &ReferenceCodec,
    ) -> BridgeResult<StoredValue> {
        let rendered = children
            .iter()
            .map(|c| match c {
                Expr::FieldMatch { .. } | Expr::And(_) | Expr::Or(_) | Expr::Nor(_) => {
                    c.to_storage(codec)
                }
                Expr::Raw(raw) if raw.is_object() => Ok(raw.clone()),
                other => Err(BridgeError::invalid_query(format!(
                    "{} children must be predicates, got {:?}",
                    key, other
                ))),
            })
            .collect::<BridgeResult<Vec<_>>>()?;
        let mut doc = Map::new();
        doc.insert(key.to_string(), StoredValue::Array(rendered));
        Ok(StoredValue::Object(doc))
    }
}
