use crate::model::QAItem;

/// Read-only, possibly filtered projection over the unified store. Holds
/// references only; items are never copied or mutated through a view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct View<'a> {
    items: Vec<&'a QAItem>,
}

impl<'a> View<'a> {
    pub fn new(items: Vec<&'a QAItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[&'a QAItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a QAItem> + '_ {
        self.items.iter().copied()
    }
}

impl<'a> FromIterator<&'a QAItem> for View<'a> {
    fn from_iter<T: IntoIterator<Item = &'a QAItem>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> From<&'a [QAItem]> for View<'a> {
    fn from(items: &'a [QAItem]) -> Self {
        items.iter().collect()
    }
}
