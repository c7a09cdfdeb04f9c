use std::collections::BTreeSet;

use super::values::FieldKey;

/// Which fields contribute to completion progress.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum CountingFields {
    All,
    #[default]
    RequiredOnly,
    Explicit(Vec<FieldKey>),
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Progress {
    pub count: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(self) -> bool {
        self.count == self.total
    }

    pub fn ratio(self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.count as f32 / self.total as f32
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProgressCounter {
    counted: Vec<FieldKey>,
    valid: BTreeSet<FieldKey>,
}

impl ProgressCounter {
    /// `counted` is taken as-is, minus duplicates.
    pub fn new(counted: impl IntoIterator<Item = FieldKey>) -> Self {
        let mut seen = BTreeSet::new();
        let counted = counted
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();
        Self {
            counted,
            valid: BTreeSet::new(),
        }
    }

    /// Resolves the counted set against the declared fields.
    ///
    /// `required` is only consulted for [`CountingFields::RequiredOnly`]. Explicit
    /// entries that are not declared are dropped.
    pub fn resolve(
        counting: &CountingFields,
        declared: &[FieldKey],
        required: impl FnOnce() -> Vec<FieldKey>,
    ) -> Self {
        match counting {
            CountingFields::Explicit(fields) => Self::new(
                fields
                    .iter()
                    .filter(|field| declared.contains(*field))
                    .cloned(),
            ),
            CountingFields::RequiredOnly => Self::new(required()),
            CountingFields::All => Self::new(declared.iter().cloned()),
        }
    }

    pub fn mark_valid(&mut self, field: &FieldKey) -> bool {
        if !self.is_counted(field.as_str()) {
            return false;
        }
        self.valid.insert(field.clone())
    }

    pub fn mark_invalid(&mut self, field: &FieldKey) -> bool {
        self.valid.remove(field)
    }

    pub fn is_counted(&self, field: &str) -> bool {
        self.counted.iter().any(|counted| counted.as_str() == field)
    }

    pub fn is_valid(&self, field: &str) -> bool {
        self.valid.contains(field)
    }

    pub fn counted_fields(&self) -> &[FieldKey] {
        &self.counted
    }

    pub fn progress(&self) -> Progress {
        Progress {
            count: self.valid.len(),
            total: self.counted.len(),
        }
    }
}
