/// Trimmed borrow of an optional field, `None` when blank.
pub fn trimmed(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}
