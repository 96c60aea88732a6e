// Display names for the backend's numeric taxonomy codes.
pub const MACROSECTOR_LABELS: [(u32, &str); 6] = [
    (11, "Infraestructura"),
    (22, "Productivo"),
    (33, "Social"),
    (44, "Ambiental"),
    (55, "Gobernanza – Público"),
    (66, "Multisectorial – Otros"),
];

pub const MODALITY_LABELS: [(u32, &str); 4] = [
    (111, "Investment"),
    (222, "Results"),
    (333, "Emergency"),
    (444, "Policy-Based"),
];

pub fn macrosector_label(id: u32) -> Option<&'static str> {
    MACROSECTOR_LABELS
        .iter()
        .find(|(code, _)| *code == id)
        .map(|(_, name)| *name)
}

pub fn modality_label(id: u32) -> Option<&'static str> {
    MODALITY_LABELS
        .iter()
        .find(|(code, _)| *code == id)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels() {
        assert_eq!(macrosector_label(33), Some("Social"));
        assert_eq!(macrosector_label(55), Some("Gobernanza – Público"));
        assert_eq!(modality_label(111), Some("Investment"));
        assert_eq!(modality_label(444), Some("Policy-Based"));
    }

    #[test]
    fn test_unknown_ids_have_no_label() {
        assert_eq!(macrosector_label(99), None);
        assert_eq!(modality_label(0), None);
    }
}
