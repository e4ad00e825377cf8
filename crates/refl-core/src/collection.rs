use crate::domain::{ReflError, ReflResult};

/// Ordered, named sequence of element identifiers.
///
/// Elements are referenced, never copied; the same identifier may appear
/// more than once. Index operations never leave gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    name: String,
    populate_if_none: bool,
    items: Vec<T>,
}

impl<T: Clone + PartialEq> Collection<T> {
    pub fn new(name: impl Into<String>, populate_if_none: bool) -> Self {
        Self {
            name: name.into(),
            populate_if_none,
            items: Vec::new(),
        }
    }

    pub fn with_items(name: impl Into<String>, populate_if_none: bool, items: Vec<T>) -> Self {
        Self {
            name: name.into(),
            populate_if_none,
            items,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn populate_if_none(&self) -> bool {
        self.populate_if_none
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn get(&self, index: usize) -> ReflResult<&T> {
        self.items.get(index).ok_or_else(|| self.out_of_range(index))
    }

    pub fn count(&self, item: &T) -> usize {
        self.items.iter().filter(|candidate| *candidate == item).count()
    }

    pub fn append(&mut self, item: T) {
        self.items.push(item);
    }

    /// `index == len` appends.
    pub fn insert(&mut self, index: usize, item: T) -> ReflResult<()> {
        if index > self.items.len() {
            return Err(self.out_of_range(index));
        }
        self.items.insert(index, item);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> ReflResult<T> {
        self.check_index(index)?;
        Ok(self.items.remove(index))
    }

    /// Swaps `index` with its predecessor. Returns `false` for the no-op at
    /// the front.
    pub fn move_up(&mut self, index: usize) -> ReflResult<bool> {
        self.check_index(index)?;
        if index == 0 {
            return Ok(false);
        }
        self.items.swap(index - 1, index);
        Ok(true)
    }

    /// Swaps `index` with its successor. Returns `false` for the no-op at the
    /// back.
    pub fn move_down(&mut self, index: usize) -> ReflResult<bool> {
        self.check_index(index)?;
        if index + 1 == self.items.len() {
            return Ok(false);
        }
        self.items.swap(index, index + 1);
        Ok(true)
    }

    pub fn check_index(&self, index: usize) -> ReflResult<()> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(self.out_of_range(index))
        }
    }

    fn out_of_range(&self, index: usize) -> ReflError {
        ReflError::index_out_of_range(index, self.items.len(), &self.name)
    }
}

/// Elements a new collection starts with: `items` as given, or `seed()` when
/// `items` is empty and the collection is flagged `populate_if_none`.
pub(crate) fn initial_items<T: Clone>(
    items: &[T],
    populate_if_none: bool,
    seed: impl FnOnce() -> ReflResult<Vec<T>>,
) -> ReflResult<Vec<T>> {
    if populate_if_none && items.is_empty() {
        seed()
    } else {
        Ok(items.to_vec())
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Collection, initial_items};
    use crate::domain::ReflErrorCategory;

    fn abc() -> Collection<&'static str> {
        Collection::with_items("layers", true, vec!["a", "b", "c"])
    }

    #[test]
    fn repeated_promotion_moves_the_last_element_to_the_front() {
        let mut layers = abc();
        let error = layers.move_up(3).expect_err("index 3 is out of range");
        assert_eq!(error.category(), ReflErrorCategory::Lookup);
        assert_eq!(error.code(), "LOOKUP.INDEX_OUT_OF_RANGE");

        assert!(layers.move_up(2).unwrap());
        assert_eq!(layers.items(), &["a", "c", "b"]);
        assert!(layers.move_up(1).unwrap());
        assert_eq!(layers.items(), &["c", "a", "b"]);
        assert!(!layers.move_up(0).unwrap());
        assert_eq!(layers.items(), &["c", "a", "b"]);
    }

    #[test]
    fn move_up_then_move_down_restores_order() {
        for index in 1..3 {
            let mut layers = abc();
            layers.move_up(index).unwrap();
            layers.move_down(index - 1).unwrap();
            assert_eq!(layers.items(), &["a", "b", "c"]);
        }

        let mut layers = abc();
        assert!(!layers.move_down(2).unwrap());
        assert_eq!(layers.items(), &["a", "b", "c"]);
    }

    #[test]
    fn insert_accepts_the_end_position_only() {
        let mut layers = abc();
        layers.insert(3, "d").expect("insert at len appends");
        assert_eq!(layers.last(), Some(&"d"));
        assert!(layers.insert(5, "e").is_err());
        assert_eq!(layers.len(), 4);
    }

    #[test]
    fn remove_reports_out_of_range_and_keeps_items_dense() {
        let mut layers = abc();
        assert!(layers.remove(3).is_err());
        assert_eq!(layers.remove(1).unwrap(), "b");
        assert_eq!(layers.items(), &["a", "c"]);
        assert_eq!(layers.get(1).unwrap(), &"c");
        assert!(layers.get(2).is_err());
    }

    #[test]
    fn the_same_element_may_appear_twice() {
        let mut layers = abc();
        layers.append("a");
        assert_eq!(layers.count(&"a"), 2);
        assert_eq!(layers.len(), 4);
    }

    #[test]
    fn only_empty_flagged_collections_are_seeded() {
        let seed = || Ok(vec!["x", "y"]);
        assert_eq!(initial_items(&[], true, seed).unwrap(), vec!["x", "y"]);
        assert!(initial_items::<&str>(&[], false, seed).unwrap().is_empty());
        assert_eq!(initial_items(&["a"], true, seed).unwrap(), vec!["a"]);
    }
}
