use uuid::Uuid;

/// Fresh identifier for a match row that arrived without one.
///
/// UUIDv7 keeps ids roughly insertion-ordered, which keeps them readable in
/// exports sorted by id.
pub fn new_match_id() -> String {
    Uuid::now_v7().to_string()
}
