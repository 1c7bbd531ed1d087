// Region presets
// Danish regions as lat/lon rectangles, plus ASCII/English aliases for user input

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub name: &'static str,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl Region {
    const fn new(name: &'static str, lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            name,
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    // Inclusive on all edges
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.lat_min <= lat && lat <= self.lat_max && self.lon_min <= lon && lon <= self.lon_max
    }
}

pub const REGION_PRESETS: [Region; 7] = [
    Region::new("sjælland", 54.60, 55.95, 11.00, 12.80),
    Region::new("fyn", 55.00, 55.60, 9.60, 10.80),
    Region::new("jylland", 54.55, 57.80, 8.00, 10.60),
    Region::new("bornholm", 55.00, 55.40, 14.60, 15.30),
    Region::new("lolland-falster", 54.50, 54.95, 11.05, 12.30),
    Region::new("møn", 54.85, 55.08, 12.15, 12.60),
    Region::new("amager", 55.55, 55.75, 12.45, 12.75),
];

// Normalized alias -> preset name
pub const REGION_ALIASES: [(&str, &str); 16] = [
    ("sjaelland", "sjælland"),
    ("zealand", "sjælland"),
    ("sjalland", "sjælland"),
    ("fyn", "fyn"),
    ("funen", "fyn"),
    ("jylland", "jylland"),
    ("jutland", "jylland"),
    ("jyland", "jylland"),
    ("bornholm", "bornholm"),
    ("lolland", "lolland-falster"),
    ("falster", "lolland-falster"),
    ("lollandfalster", "lolland-falster"),
    ("moen", "møn"),
    ("mon", "møn"),
    ("møn", "møn"),
    ("amager", "amager"),
];

pub fn find_preset(name: &str) -> Option<&'static Region> {
    REGION_PRESETS.iter().find(|region| region.name == name)
}

pub fn preset_names() -> Vec<&'static str> {
    let mut names: Vec<_> = REGION_PRESETS.iter().map(|r| r.name).collect();
    names.sort_unstable();
    names
}

fn normalize_ascii(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .replace('æ', "ae")
        .replace('ø', "oe")
        .replace('å', "aa")
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect()
}

// Exact preset, exact alias, then loose containment on either. Blank input never matches.
pub fn resolve_region_name(input: &str) -> Option<&'static str> {
    let raw = input.trim().to_lowercase();
    if raw.is_empty() {
        return None;
    }
    if let Some(region) = find_preset(&raw) {
        return Some(region.name);
    }

    let norm = normalize_ascii(&raw);
    if let Some((_, name)) = REGION_ALIASES.iter().find(|(alias, _)| *alias == norm) {
        return Some(*name);
    }

    if let Some(region) = REGION_PRESETS
        .iter()
        .find(|r| r.name.contains(raw.as_str()) || raw.contains(r.name))
    {
        return Some(region.name);
    }

    REGION_ALIASES
        .iter()
        .find(|(alias, _)| !norm.is_empty() && (alias.contains(norm.as_str()) || norm.contains(alias)))
        .map(|(_, name)| *name)
}

pub fn resolve_regions(inputs: &[String]) -> (Vec<&'static Region>, Vec<String>) {
    let mut names = Vec::new();
    let mut unknown = Vec::new();
    for input in inputs {
        match resolve_region_name(input) {
            Some(name) => names.push(name),
            None => unknown.push(input.clone()),
        }
    }
    names.sort_unstable();
    names.dedup();

    let regions = names.into_iter().filter_map(find_preset).collect();
    (regions, unknown)
}
