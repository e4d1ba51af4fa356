/// Discriminator every transaction carries exactly one of, e.g. "expense"
/// or "income". User-defined types are allowed alongside the seeded pair.
#[derive(Debug, Clone)]
pub struct TransactionType {
    pub id: Option<i64>,
    pub name: String,
}

impl TransactionType {
    pub fn new(name: String) -> Self {
        Self { id: None, name }
    }

    /// Find a type by name (case-insensitive) in a slice.
    pub fn find_by_name<'a>(types: &'a [TransactionType], name: &str) -> Option<&'a TransactionType> {
        let lower = name.to_lowercase();
        types.iter().find(|t| t.name.to_lowercase() == lower)
    }

    /// Find a type by ID in a slice.
    pub fn find_by_id(types: &[TransactionType], id: i64) -> Option<&TransactionType> {
        types.iter().find(|t| t.id == Some(id))
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
