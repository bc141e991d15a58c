// src/fixture.rs

//! Fichiers : courbes JSON ou texte à deux colonnes, jeux de référence,
//! fichiers de calibration et export texte des étapes d'une comparaison.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FIXTURE_THRESHOLD_RATIO;
use crate::curve::IvCurve;
use crate::error::{Error, Result};
use crate::score::{Comparator, ComparisonTrace};
use crate::thresholds::{self, Thresholds};

/// Courbe telle que stockée dans les fichiers JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRecord {
    #[serde(alias = "voltage")]
    pub voltages: Vec<f64>,
    #[serde(alias = "current")]
    pub currents: Vec<f64>,
}

impl CurveRecord {
    pub fn to_curve(&self) -> Result<IvCurve> {
        IvCurve::new(self.voltages.clone(), self.currents.clone())
    }
}

impl From<&IvCurve> for CurveRecord {
    fn from(curve: &IvCurve) -> Self {
        Self {
            voltages: curve.voltage().to_vec(),
            currents: curve.current().to_vec(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CurveFile {
    Wrapped { ivc: CurveRecord },
    Bare(CurveRecord),
}

pub fn parse_curve_json(text: &str) -> Result<IvCurve> {
    let record = match serde_json::from_str::<CurveFile>(text)? {
        CurveFile::Wrapped { ivc } => ivc,
        CurveFile::Bare(record) => record,
    };
    record.to_curve()
}

/// Une paire `tension courant` par ligne. Lignes vides et commentaires `#`
/// ignorés; virgules et points-virgules séparent aussi les colonnes.
pub fn parse_curve_text(text: &str) -> Result<IvCurve> {
    let mut voltage = Vec::new();
    let mut current = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() != 2 {
            return Err(Error::InvalidInput(format!(
                "ligne {} : 2 colonnes attendues, {} trouvées",
                number + 1,
                fields.len()
            )));
        }

        let parse = |field: &str| {
            field.parse::<f64>().map_err(|e| {
                Error::InvalidInput(format!("ligne {} : '{}' : {}", number + 1, field, e))
            })
        };
        voltage.push(parse(fields[0])?);
        current.push(parse(fields[1])?);
    }

    IvCurve::new(voltage, current)
}

/// Charge une courbe, le format suit l'extension du fichier.
pub fn load_curve<P: AsRef<Path>>(path: P) -> Result<IvCurve> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let curve = match extension.as_deref() {
        Some("json") => parse_curve_json(&fs::read_to_string(path)?)?,
        Some("txt") | Some("dat") | Some("csv") => parse_curve_text(&fs::read_to_string(path)?)?,
        _ => return Err(Error::UnsupportedFormat(path.display().to_string())),
    };

    debug!("{} : {} points", path.display(), curve.len());
    Ok(curve)
}

pub fn save_curve_json<P: AsRef<Path>>(curve: &IvCurve, path: P) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, serde_json::to_string_pretty(&CurveRecord::from(curve))?)?;
    info!("Courbe enregistrée : {}", path.display());
    Ok(())
}

pub fn load_thresholds<P: AsRef<Path>>(path: P) -> Result<Thresholds> {
    let stored: Thresholds = serde_json::from_str(&fs::read_to_string(path)?)?;
    Thresholds::new(stored.min_var_v, stored.min_var_c)
}

pub fn save_thresholds<P: AsRef<Path>>(thresholds: &Thresholds, path: P) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, serde_json::to_string_pretty(thresholds)?)?;
    info!("Calibration enregistrée : {}", path.display());
    Ok(())
}

/// Seuils d'une commande : le fichier de calibration s'il est donné, sinon
/// les valeurs explicites, sinon les seuils globaux.
pub fn resolve_thresholds(file: Option<&Path>, explicit: Option<(f64, f64)>) -> Result<Thresholds> {
    match (file, explicit) {
        (Some(path), _) => load_thresholds(path),
        (None, Some((min_var_v, min_var_c))) => Thresholds::new(min_var_v, min_var_c),
        (None, None) => Ok(thresholds::thresholds()),
    }
}

/// Broche mesurée, sa référence et le score attendu.
#[derive(Debug, Clone, Deserialize)]
pub struct Pin {
    pub ivc: CurveRecord,
    pub reference_ivc: CurveRecord,
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub pins: Vec<Pin>,
}

/// Description d'une carte avec le score attendu de chaque broche.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureSuite {
    pub elements: Vec<Element>,
}

impl FixtureSuite {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PinOutcome {
    Scored(f64),
    /// Comparaison impossible (courbe invalide, trop peu de points).
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PinReport {
    pub element: usize,
    pub pin: usize,
    pub expected: f64,
    pub outcome: PinOutcome,
}

impl PinReport {
    pub fn passed(&self, tolerance: f64) -> bool {
        match self.outcome {
            PinOutcome::Scored(score) => (score - self.expected).abs() < tolerance,
            PinOutcome::Failed(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub tolerance: f64,
    pub pins: Vec<PinReport>,
}

impl SuiteReport {
    pub fn failures(&self) -> impl Iterator<Item = &PinReport> {
        self.pins.iter().filter(move |p| !p.passed(self.tolerance))
    }

    pub fn passed(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Seuils d'une broche mesurée : une fraction fixe de ses valeurs crêtes.
pub fn pin_thresholds(measured: &IvCurve) -> Result<Thresholds> {
    let peak = |values: &[f64]| values.iter().copied().fold(0.0, f64::max);
    Thresholds::new(
        FIXTURE_THRESHOLD_RATIO * peak(measured.voltage()),
        FIXTURE_THRESHOLD_RATIO * peak(measured.current()),
    )
}

fn score_pin(pin: &Pin) -> Result<f64> {
    let measured = pin.ivc.to_curve()?;
    let reference = pin.reference_ivc.to_curve()?;
    Comparator::new(pin_thresholds(&measured)?).compare(&measured, &reference)
}

/// Compare chaque broche à sa référence. Une broche sans score est notée en
/// échec et le reste du jeu continue.
pub fn run_fixture_suite(suite: &FixtureSuite, tolerance: f64) -> SuiteReport {
    let mut pins = Vec::new();
    for (element, e) in suite.elements.iter().enumerate() {
        for (index, pin) in e.pins.iter().enumerate() {
            let outcome = match score_pin(pin) {
                Ok(score) => PinOutcome::Scored(score),
                Err(e) => PinOutcome::Failed(e.to_string()),
            };
            debug!("élément {} broche {} : {:?}", element, index, outcome);
            pins.push(PinReport {
                element,
                pin: index,
                expected: pin.score,
                outcome,
            });
        }
    }
    SuiteReport { tolerance, pins }
}

/// Écrit `<étape>_a.txt` et `<étape>_b.txt` pour chaque étape, plus
/// `score.txt`. Renvoie les fichiers écrits.
pub fn write_trace_text<P: AsRef<Path>>(trace: &ComparisonTrace, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for stage in &trace.stages {
        for (suffix, points) in [("a", &stage.a), ("b", &stage.b)] {
            let path = dir.join(format!("{}_{}.txt", stage.name, suffix));
            let mut text = format!("# {} ({})\n# tension courant\n", stage.title, suffix);
            for p in points.iter() {
                text.push_str(&format!("{} {}\n", p.v, p.c));
            }
            fs::write(&path, text)?;
            written.push(path);
        }
    }

    let path = dir.join("score.txt");
    let mut text = format!("{}\n", trace.score);
    for warning in &trace.warnings {
        text.push_str(&format!("# {}\n", warning));
    }
    fs::write(&path, text)?;
    written.push(path);

    info!("Étapes écrites dans {} ({} fichiers)", dir.display(), written.len());
    Ok(written)
}
