use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Option<i64>,
    pub type_id: i64,
    pub amount: Decimal,
    /// Format: "YYYY-MM-DD"
    pub date: String,
    pub description: Option<String>,
    /// Legacy single-category link from before the join table existed.
    /// Read-only: services never write it, category membership lives in
    /// `transaction_categories`. Still populated on rows migrated from the
    /// old schema.
    pub category_id: Option<i64>,
}

impl Transaction {
    pub fn new(type_id: i64, amount: Decimal, date: String) -> Self {
        Self {
            id: None,
            type_id,
            amount,
            date,
            description: None,
            category_id: None,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// The "YYYY-MM" prefix of the date.
    pub fn month(&self) -> &str {
        if self.date.len() >= 7 {
            &self.date[..7]
        } else {
            &self.date
        }
    }

    pub fn abs_amount(&self) -> Decimal {
        self.amount.abs()
    }
}
