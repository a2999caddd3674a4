//! Query evaluation for the in-memory store
//!
//! Implements the subset of document-store query semantics the adapter
//! emits: `$and`/`$or`/`$nor`, and per-field `$eq`, `$ne`, `$gt`, `$gte`,
//! `$lt`, `$lte`, `$in`, `$nin`, `$all`, `$exists`. Dotted paths descend
//! into objects and fan out over arrays; a predicate holds if any reached
//! value (or any element of a reached array) satisfies it.

use docbridge_core::{BridgeError, BridgeResult, StoredDocument, StoredValue};
use serde_json::Map;
use std::cmp::Ordering;

/// Evaluate a query document against a stored document
pub fn matches(doc: &StoredDocument, query: &StoredValue) -> BridgeResult<bool> {
    let clauses = query
        .as_object()
        .ok_or_else(|| BridgeError::invalid_query("query document must be an object"))?;

    for (key, cond) in clauses {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for q in sub_queries(key, cond)? {
                    all &= matches(doc, q)?;
                }
                all
            }
            "$or" => {
                let mut any = false;
                for q in sub_queries(key, cond)? {
                    any |= matches(doc, q)?;
                }
                any
            }
            "$nor" => {
                let mut any = false;
                for q in sub_queries(key, cond)? {
                    any |= matches(doc, q)?;
                }
                !any
            }
            k if k.starts_with('$') => {
                return Err(BridgeError::invalid_query(format!(
                    "unsupported top-level operator '{}'",
                    k
                )))
            }
            path => field_matches(&values_at_path(doc, path), cond)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_queries<'a>(key: &str, cond: &'a StoredValue) -> BridgeResult<&'a Vec<StoredValue>> {
    cond.as_array()
        .ok_or_else(|| BridgeError::invalid_query(format!("{} expects a list", key)))
}

fn is_operator_object(cond: &StoredValue) -> bool {
    match cond.as_object() {
        Some(obj) => !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')),
        None => false,
    }
}

fn field_matches(candidates: &[&StoredValue], cond: &StoredValue) -> BridgeResult<bool> {
    if !is_operator_object(cond) {
        return Ok(eq_match(candidates, cond));
    }
    let ops = cond.as_object().map(|o| o.iter()).into_iter().flatten();
    for (op, operand) in ops {
        let ok = match op.as_str() {
            "$eq" => eq_match(candidates, operand),
            "$ne" => !eq_match(candidates, operand),
            "$gt" => cmp_match(candidates, operand, |o| o == Ordering::Greater),
            "$gte" => cmp_match(candidates, operand, |o| o != Ordering::Less),
            "$lt" => cmp_match(candidates, operand, |o| o == Ordering::Less),
            "$lte" => cmp_match(candidates, operand, |o| o != Ordering::Greater),
            "$in" => list_operand(op, operand)?
                .iter()
                .any(|t| eq_match(candidates, t)),
            "$nin" => !list_operand(op, operand)?
                .iter()
                .any(|t| eq_match(candidates, t)),
            "$all" => {
                let targets = list_operand(op, operand)?;
                !targets.is_empty() && targets.iter().all(|t| eq_match(candidates, t))
            }
            "$exists" => {
                let want = operand.as_bool().ok_or_else(|| {
                    BridgeError::invalid_query("$exists expects a boolean")
                })?;
                !candidates.is_empty() == want
            }
            other => {
                return Err(BridgeError::invalid_query(format!(
                    "unsupported operator '{}'",
                    other
                )))
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn list_operand<'a>(op: &str, operand: &'a StoredValue) -> BridgeResult<&'a Vec<StoredValue>> {
    operand
        .as_array()
        .ok_or_else(|| BridgeError::invalid_query(format!("{} expects a list", op)))
}

fn eq_match(candidates: &[&StoredValue], target: &StoredValue) -> bool {
    candidates.iter().any(|c| {
        values_equal(c, target)
            || c.as_array()
                .map_or(false, |items| items.iter().any(|i| values_equal(i, target)))
    })
}

fn cmp_match(
    candidates: &[&StoredValue],
    target: &StoredValue,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    let check = |v: &StoredValue| compare(v, target).map_or(false, &accept);
    candidates.iter().any(|c| match c.as_array() {
        Some(items) => items.iter().any(check),
        None => check(c),
    })
}

fn values_equal(a: &StoredValue, b: &StoredValue) -> bool {
    match (a, b) {
        (StoredValue::Number(x), StoredValue::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &StoredValue, b: &StoredValue) -> Option<Ordering> {
    match (a, b) {
        (StoredValue::Number(x), StoredValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (StoredValue::String(x), StoredValue::String(y)) => Some(x.cmp(y)),
        (StoredValue::Bool(x), StoredValue::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// All values reachable at a dotted path
///
/// Arrays met along the way are traversed element-wise.
pub fn values_at_path<'a>(doc: &'a StoredDocument, path: &str) -> Vec<&'a StoredValue> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let mut out = Vec::new();
    if let Some(value) = doc.get(head) {
        collect(value, rest, &mut out);
    }
    out
}

fn collect<'a>(value: &'a StoredValue, rest: Option<&str>, out: &mut Vec<&'a StoredValue>) {
    let Some(rest) = rest else {
        out.push(value);
        return;
    };
    match value {
        StoredValue::Object(obj) => out.extend(values_at_path(obj, rest)),
        StoredValue::Array(items) => {
            for item in items {
                if let StoredValue::Object(obj) = item {
                    out.extend(values_at_path(obj, rest));
                }
            }
        }
        _ => {}
    }
}

/// Set a value at a dotted path, creating intermediate objects
pub fn set_path(doc: &mut StoredDocument, path: &str, value: StoredValue) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = doc
                .entry(head.to_string())
                .or_insert_with(|| StoredValue::Object(Map::new()));
            if !slot.is_object() {
                *slot = StoredValue::Object(Map::new());
            }
            if let StoredValue::Object(child) = slot {
                set_path(child, rest, value);
            }
        }
    }
}

/// Remove the value at a dotted path
pub fn unset_path(doc: &mut StoredDocument, path: &str) -> Option<StoredValue> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, rest)) => match doc.get_mut(head)? {
            StoredValue::Object(child) => unset_path(child, rest),
            _ => None,
        },
    }
}

/// Keep only the projected paths (plus `pk`)
pub fn project(doc: &StoredDocument, fields: &[String], always: &str) -> StoredDocument {
    let mut out = Map::new();
    if let Some(v) = doc.get(always) {
        out.insert(always.to_string(), v.clone());
    }
    for field in fields {
        if let Some(value) = first_at_path(doc, field) {
            set_path(&mut out, field, value.clone());
        }
    }
    out
}

pub(crate) fn first_at_path<'a>(doc: &'a StoredDocument, path: &str) -> Option<&'a StoredValue> {
    match path.split_once('.') {
        None => doc.get(path),
        Some((head, rest)) => first_at_path(doc.get(head)?.as_object()?, rest),
    }
}
