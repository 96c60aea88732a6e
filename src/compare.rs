use crate::filters::{
    DEFAULT_MODALITY, DEFAULT_YEAR_FROM, DEFAULT_YEAR_TO, FilterSpec, MACROSECTOR_UNIVERSE, Scope,
};
use crate::labels::{macrosector_label, modality_label};

/// Hard capacity of the comparison set.
pub const MAX_COMPARISONS: usize = 7;

/// Input to [`CompareSet::add`]: a filter snapshot with an optional
/// explicit label.
#[derive(Debug, Clone, PartialEq)]
pub struct AddRequest {
    pub filters: FilterSpec,
    pub label: Option<String>,
}

impl AddRequest {
    pub fn labeled(filters: FilterSpec, label: impl Into<String>) -> Self {
        AddRequest {
            filters,
            label: Some(label.into()),
        }
    }
}

impl From<FilterSpec> for AddRequest {
    fn from(filters: FilterSpec) -> Self {
        AddRequest {
            filters,
            label: None,
        }
    }
}

impl From<&FilterSpec> for AddRequest {
    fn from(filters: &FilterSpec) -> Self {
        AddRequest {
            filters: filters.clone(),
            label: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareEntry {
    pub id: String,
    pub label: String,
    pub filters: FilterSpec,
}

/// Ordered set of comparison curves, capped at [`MAX_COMPARISONS`].
/// All operations are synchronous and total; capacity and minimum-pick
/// violations are silent no-ops, so callers pre-check with [`CompareSet::can_add`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompareSet {
    entries: Vec<CompareEntry>,
    next_id: u64,
}

impl CompareSet {
    pub fn new() -> Self {
        CompareSet::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_add(&self) -> bool {
        self.entries.len() < MAX_COMPARISONS
    }

    pub fn entries(&self) -> &[CompareEntry] {
        &self.entries
    }

    /// Structural duplicate check against every stored entry.
    pub fn contains_filters(&self, filters: &FilterSpec) -> bool {
        self.entries.iter().any(|entry| &entry.filters == filters)
    }

    /// Appends a snapshot and returns its id, or `None` when the set is
    /// full. Sequence fields are deduplicated on ingest; the stored filters
    /// are owned, never a view of live state.
    pub fn add(&mut self, request: impl Into<AddRequest>) -> Option<String> {
        if !self.can_add() {
            return None;
        }
        let request = request.into();
        let mut filters = request.filters;
        filters.dedup();
        self.next_id += 1;
        let id = self.next_id.to_string();
        let label = request.label.unwrap_or_else(|| default_label(&filters));
        self.entries.push(CompareEntry {
            id: id.clone(),
            label,
            filters,
        });
        Some(id)
    }

    /// Removes the entry with `id`, keeping the order of the rest.
    pub fn remove(&mut self, id: &str) {
        self.entries.retain(|entry| entry.id != id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Merges the entries named by `ids` into one new entry, routed through
    /// [`CompareSet::add`]. Fewer than two matches is a no-op.
    pub fn combine(&mut self, ids: &[String]) -> Option<String> {
        let picks: Vec<&CompareEntry> = self
            .entries
            .iter()
            .filter(|entry| ids.contains(&entry.id))
            .collect();
        if picks.len() < 2 {
            return None;
        }

        let mut countries = Vec::new();
        let mut mdbs = Vec::new();
        for pick in &picks {
            countries.extend(pick.filters.countries.iter().cloned());
            mdbs.extend(pick.filters.mdbs.iter().cloned());
        }

        // The single macrosector survives only when every pick selects
        // exactly that one; any disagreement widens to the universe.
        let sole_macrosectors: Vec<Option<u32>> = picks
            .iter()
            .map(|pick| match Scope::of(&pick.filters.macrosectors) {
                Scope::Exactly(&id) => Some(id),
                _ => None,
            })
            .collect();
        let macrosectors = match sole_macrosectors.as_slice() {
            [Some(first), rest @ ..] if rest.iter().all(|sole| *sole == Some(*first)) => {
                vec![*first]
            }
            _ => MACROSECTOR_UNIVERSE.to_vec(),
        };

        let year_from = picks
            .iter()
            .map(|pick| pick.filters.year_from)
            .min()
            .unwrap_or(DEFAULT_YEAR_FROM);
        let year_to = picks
            .iter()
            .map(|pick| pick.filters.year_to)
            .max()
            .unwrap_or(DEFAULT_YEAR_TO);
        let ticket_min = picks
            .iter()
            .map(|pick| pick.filters.ticket_min)
            .fold(f64::INFINITY, f64::min);
        let ticket_max = picks
            .iter()
            .map(|pick| pick.filters.ticket_max)
            .fold(f64::NEG_INFINITY, f64::max);
        let from_first_disbursement = picks
            .iter()
            .all(|pick| pick.filters.from_first_disbursement);

        let mut filters = FilterSpec {
            macrosectors,
            modalities: vec![DEFAULT_MODALITY],
            countries,
            mdbs,
            ticket_min,
            ticket_max,
            year_from,
            year_to,
            only_exited: true,
            from_first_disbursement,
        };
        filters.dedup();

        let label = combined_label(&filters);
        self.add(AddRequest::labeled(filters, label))
    }
}

fn macro_phrase(macrosectors: &[u32]) -> String {
    match Scope::of(macrosectors) {
        Scope::Exactly(&id) => macrosector_label(id).unwrap_or("Global").to_string(),
        _ => "Global".to_string(),
    }
}

fn modality_phrase(modalities: &[u32]) -> String {
    match Scope::of(modalities) {
        Scope::Exactly(&id) => modality_label(id).unwrap_or("Global").to_string(),
        _ => "Global".to_string(),
    }
}

fn country_phrase(countries: &[String]) -> String {
    match Scope::of(countries) {
        Scope::All => "Global".to_string(),
        Scope::Exactly(code) => code.clone(),
        Scope::Subset(codes) => format!("{}+{}", codes[0], codes.len() - 1),
    }
}

/// Label a filter snapshot the way [`CompareSet::add`] would.
pub fn default_label(filters: &FilterSpec) -> String {
    let mdb_prefix = match Scope::of(&filters.mdbs) {
        Scope::Exactly(code) => format!("{code} \u{b7} "),
        _ => String::new(),
    };
    format!(
        "{mdb_prefix}{} \u{b7} {} \u{b7} {} \u{b7} {}\u{2013}{}",
        country_phrase(&filters.countries),
        macro_phrase(&filters.macrosectors),
        modality_phrase(&filters.modalities),
        filters.year_from,
        filters.year_to,
    )
}

fn combined_label(filters: &FilterSpec) -> String {
    let mdbs_part = match Scope::of(&filters.mdbs) {
        Scope::All => "Global".to_string(),
        Scope::Exactly(code) => code.clone(),
        Scope::Subset(codes) => format!("{}+{}", codes[0], codes.len() - 1),
    };
    let countries_part = match Scope::of(&filters.countries) {
        Scope::All => "Global".to_string(),
        Scope::Exactly(code) => code.clone(),
        Scope::Subset(codes) => {
            let shown: Vec<&str> = codes.iter().take(3).map(String::as_str).collect();
            let rest = codes.len() - shown.len();
            if rest > 0 {
                format!("{}+{rest}", shown.join("+"))
            } else {
                shown.join("+")
            }
        }
    };
    format!(
        "{mdbs_part} \u{b7} {countries_part} \u{b7} {} \u{b7} {} \u{b7} {}\u{2013}{}",
        macro_phrase(&filters.macrosectors),
        modality_phrase(&filters.modalities),
        filters.year_from,
        filters.year_to,
    )
}
