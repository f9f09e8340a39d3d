use std::collections::HashMap;

const FNV_OFFSET_BASIS: u32 = 2166136261;
const FNV_PRIME: u32 = 16777619;

/// 32-bit FNV-1a.
pub fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ *byte as u32).wrapping_mul(FNV_PRIME)
    })
}

/// Content-addressed labels for string literals.
///
/// A literal's label is `str.<fnv1a of its raw bytes>`. Byte-identical
/// literals always share a label; on the rare hash collision between two
/// different texts the later one gets a numeric suffix.
#[derive(Debug, Default)]
pub struct StringPool {
    labels: HashMap<String, String>,
    owners: HashMap<String, String>,
}

impl StringPool {
    pub fn new() -> Self {
        StringPool::default()
    }

    /// Returns the label for `raw`, allocating one the first time it is seen.
    pub fn intern(&mut self, raw: &str) -> String {
        if let Some(label) = self.labels.get(raw) {
            return label.clone();
        }

        let base = format!("str.{}", fnv1a(raw.as_bytes()));
        let mut label = base.clone();
        let mut suffix = 1;
        while self.owners.contains_key(&label) {
            label = format!("{}.{}", base, suffix);
            suffix += 1;
        }

        self.owners.insert(label.clone(), raw.to_string());
        self.labels.insert(raw.to_string(), label.clone());
        label
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
