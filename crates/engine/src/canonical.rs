//! Query canonicalization
//!
//! Rewrites a query so that reference-valued terms compare against the
//! form references take on disk. A predicate comparing a field with a record
//! (or a list of records, for the membership operators) is redirected to the
//! reference's identity subfield, and the records themselves become the
//! scalar stored there:
//!
//! | mode       | field            | operand             |
//! |------------|------------------|---------------------|
//! | pk-based   | `<field>.pk`      | `<pk>`              |
//! | marker     | `<field>.__ref__` | `<collection>:<pk>` |
//!
//! Pre-encoders run on every node before the node itself is rewritten.
//! Canonicalization is idempotent.

use docbridge_core::{BridgeResult, Expr, Operator, ReferenceCodec, Value, ValueMap};
use std::collections::BTreeMap;

/// Node-level query rewrite applied before canonicalization
pub trait QueryEncoder: Send + Sync {
    /// Rewrite one node; children are visited afterwards
    fn encode(&self, expr: Expr) -> BridgeResult<Expr>;
}

/// Renames field paths
///
/// A field equal to an alias, or starting with `<alias>.`, has that prefix
/// replaced by the target. Targets must not themselves be aliases or the
/// rewrite is no longer idempotent.
#[derive(Debug, Clone, Default)]
pub struct FieldAliasEncoder {
    aliases: BTreeMap<String, String>,
}

impl FieldAliasEncoder {
    /// Create an encoder without aliases
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add one alias
    pub fn alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.into(), to.into());
        self
    }

    fn rename(&self, field: &str) -> Option<String> {
        if let Some(to) = self.aliases.get(field) {
            return Some(to.clone());
        }
        let (head, rest) = field.split_once('.')?;
        self.aliases.get(head).map(|to| format!("{}.{}", to, rest))
    }
}

impl QueryEncoder for FieldAliasEncoder {
    fn encode(&self, expr: Expr) -> BridgeResult<Expr> {
        Ok(match expr {
            Expr::FieldMatch { field, op, operand } => Expr::FieldMatch {
                field: self.rename(&field).unwrap_or(field),
                op,
                operand,
            },
            other => other,
        })
    }
}

/// Rewrites queries into their on-disk reference form
pub struct QueryCanonicalizer {
    codec: ReferenceCodec,
    encoders: Vec<Box<dyn QueryEncoder>>,
}

impl QueryCanonicalizer {
    /// Create a canonicalizer without pre-encoders
    pub fn new(codec: ReferenceCodec) -> Self {
        Self {
            codec,
            encoders: Vec::new(),
        }
    }

    /// Append a pre-encoder; encoders run in the order they were added
    pub fn add_encoder(&mut self, encoder: Box<dyn QueryEncoder>) {
        self.encoders.push(encoder);
    }

    /// Number of registered pre-encoders
    pub fn encoder_count(&self) -> usize {
        self.encoders.len()
    }

    /// Canonicalize a query tree
    ///
    /// # Errors
    ///
    /// `InvalidIdentity` if the query references a record without pk;
    /// any error raised by a pre-encoder.
    pub fn canonicalize(&self, expr: &Expr) -> BridgeResult<Expr> {
        self.transform(expr.clone())
    }

    fn transform(&self, expr: Expr) -> BridgeResult<Expr> {
        let mut expr = expr;
        for encoder in &self.encoders {
            expr = encoder.encode(expr)?;
        }

        Ok(match expr {
            Expr::FieldMatch { field, op, operand } => {
                let field = if self.targets_reference(op, &operand) {
                    format!("{}.{}", field, self.codec.mode().identity_field())
                } else {
                    field
                };
                Expr::FieldMatch {
                    field,
                    op,
                    operand: Box::new(self.transform(*operand)?),
                }
            }
            Expr::Sequence(items) => Expr::Sequence(self.transform_all(items)?),
            Expr::And(children) => Expr::And(self.transform_all(children)?),
            Expr::Or(children) => Expr::Or(self.transform_all(children)?),
            Expr::Nor(children) => Expr::Nor(self.transform_all(children)?),
            Expr::Literal(value) => Expr::Literal(self.literal(value)?),
            raw @ Expr::Raw(_) => raw,
        })
    }

    fn transform_all(&self, items: Vec<Expr>) -> BridgeResult<Vec<Expr>> {
        items.into_iter().map(|e| self.transform(e)).collect()
    }

    /// Whether a predicate compares a field against references
    fn targets_reference(&self, op: Operator, operand: &Expr) -> bool {
        if op.is_membership() {
            let first = match operand {
                Expr::Sequence(items) => match items.first() {
                    Some(Expr::Literal(v)) => Some(v),
                    _ => None,
                },
                Expr::Literal(Value::Array(items)) => items.first(),
                _ => None,
            };
            return first.map_or(false, Value::is_reference_like);
        }
        op.is_equality() && matches!(operand, Expr::Literal(v) if v.is_reference_like())
    }

    fn literal(&self, value: Value) -> BridgeResult<Value> {
        if let Some(scalar) = self.codec.reference_literal(&value)? {
            return Ok(scalar);
        }
        Ok(match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|v| self.literal(v))
                    .collect::<BridgeResult<Vec<_>>>()?,
            ),
            Value::Map(map) => Value::Map(self.embedded_map(map)?),
            other => other,
        })
    }

    /// Records nested in a map literal become full reference objects
    fn embedded_map(&self, map: ValueMap) -> BridgeResult<ValueMap> {
        map.into_iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::Record(record) => {
                        self.codec.reference_value(&self.codec.reference_to(&record)?)
                    }
                    Value::Reference(reference) => self.codec.reference_value(&reference),
                    Value::Map(inner) => Value::Map(self.embedded_map(inner)?),
                    other => other,
                };
                Ok((k, v))
            })
            .collect()
    }
}

impl std::fmt::Debug for QueryCanonicalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCanonicalizer")
            .field("mode", &self.codec.mode())
            .field("encoders", &self.encoders.len())
            .finish()
    }
}
