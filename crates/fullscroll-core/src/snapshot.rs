#![forbid(unsafe_code)]

//! Inline style snapshots for exact restoration.
//!
//! Before the controller overrides an inline style property it records what
//! was there: the value and priority, or nothing at all. On exit every record
//! is replayed, so set properties get their old value back and absent ones
//! are removed again.
//!
//! Element handles only need `PartialEq`; DOM handles are not hashable, and
//! an activation touches a handful of elements, so lookup is linear.

/// An inline style declaration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleValue {
    pub value: String,
    pub important: bool,
}

impl StyleValue {
    pub fn new(value: impl Into<String>, important: bool) -> Self {
        Self {
            value: value.into(),
            important,
        }
    }
}

/// Original state of the touched properties of one element.
#[derive(Debug, Clone)]
pub struct ElementSnapshot<E> {
    pub element: E,
    /// `(property, original)`; `None` means the property was not set.
    pub properties: Vec<(String, Option<StyleValue>)>,
}

/// Snapshots for every element adjusted during one activation.
#[derive(Debug, Clone)]
pub struct StyleSnapshots<E> {
    entries: Vec<ElementSnapshot<E>>,
}

impl<E> Default for StyleSnapshots<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: Clone + PartialEq> StyleSnapshots<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of snapshotted elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of snapshotted properties across all elements.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.properties.len()).sum()
    }

    #[must_use]
    pub fn contains(&self, element: &E, property: &str) -> bool {
        self.entry(element)
            .is_some_and(|entry| entry.properties.iter().any(|(name, _)| name == property))
    }

    /// Record the original value of `property` unless already recorded.
    /// Returns `true` when this call captured it.
    pub fn record(&mut self, element: &E, property: &str, original: Option<StyleValue>) -> bool {
        if self.contains(element, property) {
            return false;
        }
        match self.entries.iter_mut().find(|entry| entry.element == *element) {
            Some(entry) => entry.properties.push((property.to_owned(), original)),
            None => self.entries.push(ElementSnapshot {
                element: element.clone(),
                properties: vec![(property.to_owned(), original)],
            }),
        }
        true
    }

    /// Take every snapshot out for replay, leaving the set empty.
    pub fn drain(&mut self) -> Vec<ElementSnapshot<E>> {
        core::mem::take(&mut self.entries)
    }

    fn entry(&self, element: &E) -> Option<&ElementSnapshot<E>> {
        self.entries.iter().find(|entry| entry.element == *element)
    }
}
