use serde::{Deserialize, Serialize};

pub const MACROSECTOR_UNIVERSE: [u32; 6] = [11, 22, 33, 44, 55, 66];
pub const DEFAULT_MODALITY: u32 = 111;
pub const DEFAULT_TICKET_MIN: f64 = 0.0;
pub const DEFAULT_TICKET_MAX: f64 = 1_000_000_000.0;
pub const DEFAULT_YEAR_FROM: i32 = 2010;
pub const DEFAULT_YEAR_TO: i32 = 2024;

/// Portfolio selection criteria, serialized camelCase for the backend.
/// An empty `countries`/`mdbs` sequence means no restriction (global).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    pub macrosectors: Vec<u32>,
    pub modalities: Vec<u32>,
    pub countries: Vec<String>,
    pub mdbs: Vec<String>,
    pub ticket_min: f64,
    pub ticket_max: f64,
    pub year_from: i32,
    pub year_to: i32,
    pub only_exited: bool,
    pub from_first_disbursement: bool,
}

impl Default for FilterSpec {
    fn default() -> Self {
        FilterSpec {
            macrosectors: MACROSECTOR_UNIVERSE.to_vec(),
            modalities: vec![DEFAULT_MODALITY],
            countries: Vec::new(),
            mdbs: Vec::new(),
            ticket_min: DEFAULT_TICKET_MIN,
            ticket_max: DEFAULT_TICKET_MAX,
            year_from: DEFAULT_YEAR_FROM,
            year_to: DEFAULT_YEAR_TO,
            only_exited: true,
            from_first_disbursement: false,
        }
    }
}

impl FilterSpec {
    /// Drops repeated elements from the sequence fields, keeping first occurrences.
    pub fn dedup(&mut self) {
        dedup_first_seen(&mut self.macrosectors);
        dedup_first_seen(&mut self.modalities);
        dedup_first_seen(&mut self.countries);
        dedup_first_seen(&mut self.mdbs);
    }
}

fn dedup_first_seen<T: PartialEq + Clone>(values: &mut Vec<T>) {
    let mut seen: Vec<T> = Vec::with_capacity(values.len());
    values.retain(|v| {
        if seen.contains(v) {
            false
        } else {
            seen.push(v.clone());
            true
        }
    });
}

/// Explicit selection scope of a sequence field. "Global" in labels and merge
/// rules means `All`; a sole selection drives single-value display rules.
#[derive(Debug, PartialEq)]
pub enum Scope<'a, T> {
    All,
    Exactly(&'a T),
    Subset(&'a [T]),
}

impl<'a, T> Scope<'a, T> {
    pub fn of(values: &'a [T]) -> Self {
        match values {
            [] => Scope::All,
            [single] => Scope::Exactly(single),
            many => Scope::Subset(many),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogOption {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MdbOption {
    pub id: String,
    pub name: String,
}

/// Available filter options reported by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCatalog {
    pub macrosectors: Vec<CatalogOption>,
    pub modalities: Vec<CatalogOption>,
    pub countries: Vec<String>,
    pub mdbs: Vec<MdbOption>,
    pub ticket_min: Option<f64>,
    pub ticket_max: Option<f64>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}
