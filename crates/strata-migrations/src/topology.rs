//! Creation order for a batch of new tables.
//!
//! [`sort_for_creation`] reorders tables so that every foreign key parent in
//! the batch is created before its children. Tables keep their original
//! relative order wherever no dependency forces a move: a table whose parents
//! are not yet placed has them spliced in immediately before it.
//!
//! Parents outside the batch already exist and impose no constraint.
//! Self-references are ignored. A cycle across two or more tables cannot be
//! ordered and raises [`StrataError::CycleDetected`].

use std::collections::HashSet;

use strata_core::{StrataError, StrataResult};
use strata_schema::Table;

/// Returns `tables` ordered parents-first.
pub fn sort_for_creation(tables: &[Table]) -> StrataResult<Vec<Table>> {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut order: Vec<&Table> = Vec::with_capacity(tables.len());
    for table in tables {
        let mut path = Vec::new();
        place(table, tables, &mut placed, &mut path, &mut order)?;
    }
    tracing::debug!(
        order = ?order.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        "Sorted tables for creation"
    );
    Ok(order.into_iter().cloned().collect())
}

fn place<'a>(
    table: &'a Table,
    batch: &'a [Table],
    placed: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
    order: &mut Vec<&'a Table>,
) -> StrataResult<()> {
    if placed.contains(table.name.as_str()) {
        return Ok(());
    }
    if let Some(start) = path.iter().position(|name| *name == table.name) {
        let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
        cycle.push(table.name.clone());
        return Err(StrataError::CycleDetected(cycle));
    }
    path.push(&table.name);
    for parent in table.parents() {
        if let Some(parent) = batch.iter().find(|t| t.name == parent) {
            place(parent, batch, placed, path, order)?;
        }
    }
    path.pop();
    placed.insert(&table.name);
    order.push(table);
    Ok(())
}
