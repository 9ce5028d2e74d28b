use rand::Rng;

/// Pre-authored reports served when live generation is unavailable.
static SIMULATED_ADVISORIES: &[&str] = &[
    "Trajectory nominal. Spectroscopic analysis confirms high silicate content. No immediate impact threat detected.",
    "Object tracking locked. Rotational period suggests a loose rubble-pile structure. Maintaining surveillance.",
    "Radar cross-section analysis complete. Velocity vector remains stable. Composition: Carbonaceous chondrite.",
    "Gravitational perturbation analysis negative. Object will pass safely within lunar orbit. Status: Green.",
    "Thermal emission signature matches S-type classification. No orbital deviation predicted. Monitoring continues.",
    "Surface reflectivity analysis indicates metallic composition. Trajectory stable. No Earth intersection calculated.",
    "Astrometric residuals are within tolerance. Encounter geometry remains nominal and no alert is warranted.",
    "Object remains on its catalogued ephemeris. Close-approach parameters confirmed; no corrective action advised.",
];

/// A non-empty set of canned reports with uniform random selection.
#[derive(Debug, Clone, Copy)]
pub struct FallbackPool {
    entries: &'static [&'static str],
}

impl FallbackPool {
    /// The built-in pool.
    pub fn standard() -> Self {
        Self {
            entries: SIMULATED_ADVISORIES,
        }
    }

    /// A custom pool; `None` when `entries` is empty.
    pub fn new(entries: &'static [&'static str]) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self { entries })
        }
    }

    pub fn entries(&self) -> &'static [&'static str] {
        self.entries
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains(&text)
    }

    pub fn pick(&self) -> &'static str {
        self.pick_with(&mut rand::thread_rng())
    }

    pub fn pick_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static str {
        self.entries[rng.gen_range(0..self.entries.len())]
    }
}

impl Default for FallbackPool {
    fn default() -> Self {
        Self::standard()
    }
}
