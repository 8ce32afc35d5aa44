use std::collections::BTreeMap;

use crate::{
    constants::{SHOPPING_LIST_FILE_NAME, SHOPPING_LIST_HEADERS},
    error::CoreError,
    schema::{CartLine, Id, ShoppingRow},
    store::EntityStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShoppingList {
    /// The cart holds nothing to buy.
    NoContent,
    Rows(Vec<ShoppingRow>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingExport {
    pub file_name: &'static str,
    pub body: String,
}

/// One row per distinct (name, unit) with the amounts summed, ordered by name
/// then unit using byte-wise, case-sensitive comparison. Positions start at 1.
pub fn aggregate_lines(lines: Vec<CartLine>) -> Vec<ShoppingRow> {
    let mut groups: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *groups
            .entry((line.name, line.measurement_unit))
            .or_insert(0) += i64::from(line.amount);
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(i, ((name, measurement_unit), amount))| ShoppingRow {
            position: i + 1,
            name,
            amount,
            measurement_unit,
        })
        .collect()
}

pub async fn build_shopping_list(
    user_id: Id,
    store: &impl EntityStore,
) -> Result<ShoppingList, CoreError> {
    let lines = store.list_cart_lines(user_id).await?;
    if lines.is_empty() {
        log::trace!("Shopping cart of user {user_id} is empty");
        return Ok(ShoppingList::NoContent);
    }

    Ok(ShoppingList::Rows(aggregate_lines(lines)))
}

// No. and Amount are right aligned.
const NUMERIC_COLUMNS: [bool; 4] = [true, false, true, false];

fn format_row(row: [&str; 4], widths: &[usize; 4]) -> String {
    let mut line = String::from("|");
    for ((cell, width), right) in row.iter().zip(widths.iter()).zip(NUMERIC_COLUMNS.iter()) {
        let width = *width;
        if *right {
            line.push_str(&format!(" {cell:>width$} |"));
        } else {
            line.push_str(&format!(" {cell:<width$} |"));
        }
    }
    line
}

/// Pipe table with a dashed rule under the header. Numeric columns are right
/// aligned and text columns left aligned; widths count characters.
pub fn render_shopping_list(rows: &[ShoppingRow]) -> String {
    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|row| {
            [
                row.position.to_string(),
                row.name.to_owned(),
                row.amount.to_string(),
                row.measurement_unit.to_owned(),
            ]
        })
        .collect();

    let mut widths = SHOPPING_LIST_HEADERS.map(|header| header.chars().count());
    for row in cells.iter() {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = vec![format_row(SHOPPING_LIST_HEADERS, &widths)];
    let mut rule = String::from("|");
    for width in widths.iter() {
        rule.push_str(&"-".repeat(width + 2));
        rule.push('|');
    }
    lines.push(rule);

    for row in cells.iter() {
        lines.push(format_row(
            [
                row[0].as_str(),
                row[1].as_str(),
                row[2].as_str(),
                row[3].as_str(),
            ],
            &widths,
        ));
    }

    let mut table = lines.join("\n");
    table.push('\n');
    table
}

/// The downloadable shopping list, or `None` when the cart is empty.
pub async fn export_shopping_list(
    user_id: Id,
    store: &impl EntityStore,
) -> Result<Option<ShoppingExport>, CoreError> {
    match build_shopping_list(user_id, store).await? {
        ShoppingList::NoContent => Ok(None),
        ShoppingList::Rows(rows) => Ok(Some(ShoppingExport {
            file_name: SHOPPING_LIST_FILE_NAME,
            body: render_shopping_list(&rows),
        })),
    }
}
