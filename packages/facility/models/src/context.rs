//! Reference data that frames computed results: curated pollution
//! clusters and livestock census totals.
//!
//! Like water-quality standards, these are inputs to a load rather than
//! process-wide tables. The built-in editions come from
//! [`KnownHotspot::curated`] and [`LivestockCensus::twentieth`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A documented animal-agriculture pollution cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownHotspot {
    pub id: String,
    /// Human-readable area, e.g. `Anand-Kheda Districts, Gujarat`.
    pub area: String,
    pub state: String,
    /// Districts the cluster covers.
    pub districts: Vec<String>,
    /// Dominant activity, e.g. `Poultry cluster`.
    pub cluster_type: String,
    pub description: String,
    #[serde(default)]
    pub operators: Vec<String>,
    /// Poultry head count from the livestock census, where recorded.
    #[serde(default)]
    pub census_poultry: Option<u64>,
}

impl KnownHotspot {
    /// Whether the cluster covers `district` in `state` (case-insensitive).
    #[must_use]
    pub fn covers(&self, state: &str, district: &str) -> bool {
        self.state.eq_ignore_ascii_case(state.trim())
            && self
                .districts
                .iter()
                .any(|d| d.eq_ignore_ascii_case(district.trim()))
    }

    /// The curated clusters.
    #[must_use]
    pub fn curated() -> Vec<Self> {
        vec![
            Self {
                id: "namakkal-poultry".to_string(),
                area: "Namakkal District, Tamil Nadu".to_string(),
                state: "Tamil Nadu".to_string(),
                districts: vec!["Namakkal".to_string()],
                cluster_type: "Poultry cluster".to_string(),
                description: "India's largest poultry cluster, around 50 million birds. Manure \
                              runoff and dead bird disposal pollute water and air; nitrate in \
                              groundwater; ammonia emissions."
                    .to_string(),
                operators: vec![
                    "Suguna".to_string(),
                    "SKM".to_string(),
                    "numerous small operators".to_string(),
                ],
                census_poultry: Some(39_000_000),
            },
            Self {
                id: "west-godavari-aquaculture".to_string(),
                area: "West Godavari District, Andhra Pradesh".to_string(),
                state: "Andhra Pradesh".to_string(),
                districts: vec!["West Godavari".to_string()],
                cluster_type: "Aquaculture (shrimp)".to_string(),
                description: "Shrimp farming belt on converted farmland and mangroves. \
                              Groundwater salinization, antibiotic residues in waterways, \
                              disease outbreaks."
                    .to_string(),
                operators: vec![
                    "Avanti Feeds".to_string(),
                    "numerous small operators".to_string(),
                ],
                census_poultry: None,
            },
            Self {
                id: "anand-kheda-dairy".to_string(),
                area: "Anand-Kheda Districts, Gujarat".to_string(),
                state: "Gujarat".to_string(),
                districts: vec!["Anand".to_string(), "Kheda".to_string()],
                cluster_type: "Dairy cluster".to_string(),
                description: "High density of dairy animals. Methane emissions, fodder water \
                              demand, effluent from chilling centres and processing plants."
                    .to_string(),
                operators: vec!["GCMMF/Amul member unions".to_string()],
                census_poultry: None,
            },
            Self {
                id: "pune-nashik-poultry-dairy".to_string(),
                area: "Pune-Nashik Belt, Maharashtra".to_string(),
                state: "Maharashtra".to_string(),
                districts: vec!["Pune".to_string(), "Nashik".to_string()],
                cluster_type: "Poultry and dairy".to_string(),
                description: "Concentration of integrator poultry operations and dairy farms. \
                              Processing plant effluent and contract farming density."
                    .to_string(),
                operators: vec!["Venky's".to_string(), "Godrej Agrovet".to_string()],
                census_poultry: None,
            },
            Self {
                id: "nellore-aquaculture".to_string(),
                area: "Nellore District, Andhra Pradesh".to_string(),
                state: "Andhra Pradesh".to_string(),
                districts: vec!["Nellore".to_string()],
                cluster_type: "Aquaculture (shrimp and fish)".to_string(),
                description: "Major aquaculture zone. Coastal pollution, mangrove loss and \
                              antibiotic use in ponds."
                    .to_string(),
                operators: vec![
                    "Avanti Feeds".to_string(),
                    "Waterbase".to_string(),
                    "numerous small operators".to_string(),
                ],
                census_poultry: None,
            },
            Self {
                id: "banaskantha-dairy".to_string(),
                area: "Banaskantha District, Gujarat".to_string(),
                state: "Gujarat".to_string(),
                districts: vec!["Banaskantha".to_string()],
                cluster_type: "Dairy".to_string(),
                description: "Largest milk-producing district in India. Large fodder water \
                              footprint and groundwater depletion."
                    .to_string(),
                operators: vec![
                    "Banaskantha District Co-operative Milk Producers' Union".to_string(),
                ],
                census_poultry: None,
            },
        ]
    }
}

/// Head counts by species (`cattle`, `buffalo`, `poultry`, ...).
pub type SpeciesCounts = BTreeMap<String, u64>;

/// A livestock census edition: national totals and per-state counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivestockCensus {
    pub edition: String,
    pub source: String,
    pub national: SpeciesCounts,
    /// State name to counts. Not every state is covered.
    #[serde(default)]
    pub states: BTreeMap<String, SpeciesCounts>,
}

/// Census figures relevant to one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LivestockContext<'a> {
    pub edition: &'a str,
    pub source: &'a str,
    pub national: &'a SpeciesCounts,
    /// `None` when the census has no breakdown for the state.
    pub state: Option<&'a SpeciesCounts>,
}

const NATIONAL_2019: &[(&str, u64)] = &[
    ("total_livestock", 535_780_000),
    ("cattle", 192_490_000),
    ("buffalo", 109_850_000),
    ("sheep", 74_260_000),
    ("goat", 148_880_000),
    ("pig", 9_060_000),
    ("poultry", 851_810_000),
];

const STATES_2019: &[(&str, &[(&str, u64)])] = &[
    (
        "Uttar Pradesh",
        &[("cattle", 19_600_000), ("buffalo", 33_000_000), ("goat", 15_700_000)],
    ),
    (
        "Rajasthan",
        &[
            ("cattle", 13_900_000),
            ("buffalo", 12_900_000),
            ("sheep", 7_900_000),
            ("goat", 20_800_000),
        ],
    ),
    (
        "Madhya Pradesh",
        &[("cattle", 19_300_000), ("buffalo", 10_700_000), ("goat", 10_400_000)],
    ),
    (
        "West Bengal",
        &[("cattle", 16_700_000), ("buffalo", 700_000), ("goat", 16_200_000)],
    ),
    (
        "Bihar",
        &[("cattle", 12_200_000), ("buffalo", 7_800_000), ("goat", 12_800_000)],
    ),
    (
        "Maharashtra",
        &[("cattle", 13_900_000), ("buffalo", 6_200_000), ("goat", 10_600_000)],
    ),
    (
        "Andhra Pradesh",
        &[
            ("cattle", 6_600_000),
            ("buffalo", 10_300_000),
            ("sheep", 13_900_000),
            ("poultry", 227_000_000),
        ],
    ),
    (
        "Tamil Nadu",
        &[
            ("cattle", 8_800_000),
            ("buffalo", 780_000),
            ("sheep", 4_600_000),
            ("goat", 8_100_000),
            ("poultry", 117_000_000),
        ],
    ),
    (
        "Karnataka",
        &[("cattle", 9_500_000), ("buffalo", 3_700_000), ("sheep", 11_100_000)],
    ),
    (
        "Telangana",
        &[
            ("cattle", 4_600_000),
            ("buffalo", 5_000_000),
            ("sheep", 19_100_000),
            ("poultry", 79_000_000),
        ],
    ),
    ("Gujarat", &[("cattle", 10_400_000), ("buffalo", 10_700_000)]),
    ("Punjab", &[("cattle", 2_300_000), ("buffalo", 5_200_000)]),
    ("Haryana", &[("cattle", 1_800_000), ("buffalo", 6_100_000)]),
];

fn counts(table: &[(&str, u64)]) -> SpeciesCounts {
    table
        .iter()
        .map(|(species, count)| ((*species).to_string(), *count))
        .collect()
}

impl LivestockCensus {
    /// 20th Livestock Census (2019), national totals and the major
    /// livestock states.
    #[must_use]
    pub fn twentieth() -> Self {
        Self {
            edition: "20th Livestock Census (2019)".to_string(),
            source: "Department of Animal Husbandry and Dairying".to_string(),
            national: counts(NATIONAL_2019),
            states: STATES_2019
                .iter()
                .map(|(state, table)| ((*state).to_string(), counts(table)))
                .collect(),
        }
    }

    /// Counts for `state` (case-insensitive).
    #[must_use]
    pub fn state(&self, state: &str) -> Option<&SpeciesCounts> {
        self.states
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(state.trim()))
            .map(|(_, counts)| counts)
    }

    #[must_use]
    pub fn context_for(&self, state: &str) -> LivestockContext<'_> {
        LivestockContext {
            edition: &self.edition,
            source: &self.source,
            national: &self.national,
            state: self.state(state),
        }
    }
}
