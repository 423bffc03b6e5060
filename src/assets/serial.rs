//! Human-readable serial numbers, derived from the asset's name or type.
//!
//! Type `asset` takes the first word of the name, `room` hyphenates the whole
//! name, and everything else uses the capitalized type name. The sequence part
//! is the count of existing serials with the same prefix plus one; uniqueness
//! is ultimately enforced by the database constraint, with a bounded retry on
//! collision (see `services::create_asset`).

use crate::assets::repo::AssetType;

pub fn derive_prefix(name: &str, kind: AssetType) -> String {
    match kind {
        AssetType::Asset => name
            .split_whitespace()
            .next()
            .unwrap_or(name)
            .to_string(),
        AssetType::Room => name.split(' ').collect::<Vec<_>>().join("-"),
        _ => capitalize(kind.as_str()),
    }
}

pub fn format_serial(prefix: &str, seq: i64) -> String {
    format!("{prefix}-{seq:03}")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_prefix_is_first_word_of_name() {
        assert_eq!(derive_prefix("Laptop Dell XPS", AssetType::Asset), "Laptop");
        assert_eq!(derive_prefix("Projector", AssetType::Asset), "Projector");
    }

    #[test]
    fn room_prefix_hyphenates_spaces() {
        assert_eq!(
            derive_prefix("Meeting Room A", AssetType::Room),
            "Meeting-Room-A"
        );
    }

    #[test]
    fn other_types_use_capitalized_type_name() {
        assert_eq!(derive_prefix("Toyota Avanza", AssetType::Vehicle), "Vehicle");
        assert_eq!(derive_prefix("Drill", AssetType::Equipment), "Equipment");
    }

    #[test]
    fn serial_is_zero_padded_to_three_digits() {
        assert_eq!(format_serial("Laptop", 1), "Laptop-001");
        assert_eq!(format_serial("Laptop", 42), "Laptop-042");
        assert_eq!(format_serial("Laptop", 1000), "Laptop-1000");
    }

    #[test]
    fn full_serial_for_first_room() {
        let prefix = derive_prefix("Ruang Rapat", AssetType::Room);
        assert_eq!(format_serial(&prefix, 1), "Ruang-Rapat-001");
    }
}
