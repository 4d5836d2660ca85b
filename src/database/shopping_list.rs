use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::{CartLine, Id};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShoppingListEntry {
    pub name: String,
    pub total_amount: i64,
    pub measurement_unit: String,
}

impl ShoppingListEntry {
    /// `"<Capitalized name> - <total amount> <unit>"`
    pub fn to_line(&self) -> String {
        format!(
            "{} - {} {}",
            capitalize(&self.name),
            self.total_amount,
            self.measurement_unit
        )
    }
}

/// Ingredient totals over every recipe in a shopping cart.
///
/// Entries are keyed by ingredient id and keep the order in which each
/// ingredient was first seen.
#[derive(Debug, Clone, Default)]
pub struct ShoppingList {
    entries: IndexMap<Id, ShoppingListEntry>,
}

impl ShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, line: &CartLine) {
        self.entries
            .entry(line.ingredient_id)
            .and_modify(|entry| entry.total_amount += i64::from(line.amount))
            .or_insert_with(|| ShoppingListEntry {
                name: line.name.to_owned(),
                total_amount: i64::from(line.amount),
                measurement_unit: line.measurement_unit.to_owned(),
            });
    }

    pub fn entries(&self) -> impl Iterator<Item = &ShoppingListEntry> {
        self.entries.values()
    }

    pub fn get(&self, ingredient_id: Id) -> Option<&ShoppingListEntry> {
        self.entries.get(&ingredient_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries().map(ShoppingListEntry::to_line).collect()
    }

    /// Plain text document, one line per ingredient. An empty list renders
    /// to an empty body.
    pub fn render(&self) -> String {
        self.lines()
            .into_iter()
            .map(|line| line + "\n")
            .collect()
    }
}

impl<'a> FromIterator<&'a CartLine> for ShoppingList {
    fn from_iter<I: IntoIterator<Item = &'a CartLine>>(iter: I) -> Self {
        let mut list = Self::new();
        iter.into_iter().for_each(|line| list.add(line));
        list
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ingredient_id: Id, name: &str, amount: i32, unit: &str) -> CartLine {
        CartLine {
            ingredient_id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn sums_across_recipes_in_first_seen_order() {
        let cart = vec![
            // R1
            line(1, "flour", 200, "g"),
            line(2, "salt", 5, "g"),
            // R2
            line(1, "flour", 100, "g"),
            line(3, "egg", 2, "pcs"),
        ];

        let list: ShoppingList = cart.iter().collect();

        assert_eq!(list.len(), 3);
        assert_eq!(
            list.lines(),
            vec!["Flour - 300 g", "Salt - 5 g", "Egg - 2 pcs"]
        );
    }

    #[test]
    fn repeated_ingredient_in_one_recipe_is_added_not_overwritten() {
        let list: ShoppingList = [line(9, "milk", 100, "ml"), line(9, "milk", 150, "ml")]
            .iter()
            .collect();

        assert_eq!(list.get(9).map(|entry| entry.total_amount), Some(250));
    }

    #[test]
    fn empty_cart_renders_empty_document() {
        let list = ShoppingList::new();

        assert!(list.is_empty());
        assert_eq!(list.render(), "");
    }

    #[test]
    fn render_writes_one_line_per_ingredient() {
        let list: ShoppingList = [line(1, "SUGAR", 50, "g"), line(2, "ёлка", 1, "шт")]
            .iter()
            .collect();

        assert_eq!(list.render(), "Sugar - 50 g\nЁлка - 1 шт\n");
    }

    #[test]
    fn totals_do_not_overflow_on_large_amounts() {
        let list: ShoppingList = [line(1, "water", i32::MAX, "ml"), line(1, "water", i32::MAX, "ml")]
            .iter()
            .collect();

        assert_eq!(list.get(1).unwrap().total_amount, 2 * i64::from(i32::MAX));
    }
}
