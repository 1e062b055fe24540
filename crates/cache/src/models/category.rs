/// An entry in the category vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Category {
    pub name: String,
    pub display_order: i64,
}
