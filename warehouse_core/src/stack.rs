use serde::{Deserialize, Serialize};

use crate::{Item, ItemType, Position};

/// A bounded pile of items of a single type at a fixed warehouse location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    position: Position,
    item_type: ItemType,
    capacity: usize,
    items: Vec<Item>,
}

impl Stack {
    pub fn new(position: Position, item_type: ItemType, capacity: usize) -> Self {
        Stack {
            position,
            item_type,
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items in deposit order, oldest first.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Appends `item` unless the stack is full, in which case the item is handed back.
    pub(crate) fn try_push(&mut self, item: Item) -> Result<(), Item> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    /// Appends every item, or none of them if they would not all fit.
    pub(crate) fn try_extend(&mut self, items: Vec<Item>) -> Result<(), Vec<Item>> {
        if self.items.len() + items.len() > self.capacity {
            return Err(items);
        }
        self.items.extend(items);
        Ok(())
    }
}
