use ahash::AHashSet;

/// Import statements deduplicated by exact text, kept in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ImportSet {
    seen: AHashSet<String>,
    ordered: Vec<String>,
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a statement unless the identical text was already added. Statements that
    /// differ only in whitespace are distinct; blank statements are ignored.
    pub fn insert(&mut self, statement: &str) -> bool {
        if statement.trim().is_empty() || self.seen.contains(statement) {
            return false;
        }
        self.seen.insert(statement.to_string());
        self.ordered.push(statement.to_string());
        true
    }

    pub fn extend<I, S>(&mut self, statements: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for statement in statements {
            self.insert(statement.as_ref());
        }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order_and_exact_dedup() {
        let mut imports = ImportSet::new();
        imports.extend(["import pandas as pd", "import os"]);
        imports.extend(["import os", "import  os", "", "  ", " import os "]);
        assert_eq!(
            imports.into_vec(),
            vec![
                "import pandas as pd".to_string(),
                "import os".to_string(),
                "import  os".to_string(),
                " import os ".to_string(),
            ]
        );
    }
}
