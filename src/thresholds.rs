// src/thresholds.rs

//! Seuils de bruit utilisés pour la mise à l'échelle avant comparaison.
//!
//! Un [`Thresholds`] est passé explicitement à un [`crate::Comparator`].
//! La valeur globale ci-dessous ne sert qu'aux fonctions libres de la racine.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::config::{MIN_VAR_C_DEFAULT, MIN_VAR_V_DEFAULT};
use crate::curve::{std_dev, IvCurve};
use crate::error::{Error, Result};

/// Variation minimale supposée par axe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Seuil de bruit en tension (V).
    pub min_var_v: f64,
    /// Seuil de bruit en courant (même unité que les courants de la courbe).
    pub min_var_c: f64,
}

impl Thresholds {
    pub const DEFAULT: Thresholds = Thresholds {
        min_var_v: MIN_VAR_V_DEFAULT,
        min_var_c: MIN_VAR_C_DEFAULT,
    };

    pub fn new(min_var_v: f64, min_var_c: f64) -> Result<Self> {
        check("min_var_v", min_var_v)?;
        check("min_var_c", min_var_c)?;
        Ok(Self {
            min_var_v,
            min_var_c,
        })
    }

    /// Estime les seuils à partir d'une courbe en circuit ouvert et d'une
    /// courbe en court-circuit.
    ///
    /// Pointes ouvertes, le courant ne porte que du bruit; pointes en
    /// court-circuit, c'est la tension. Chaque seuil est l'écart type de
    /// l'axe qui aurait dû rester plat.
    pub fn from_reference_curves(open_circuit: &IvCurve, short_circuit: &IvCurve) -> Self {
        Self {
            min_var_v: std_dev(short_circuit.voltage()),
            min_var_c: std_dev(open_circuit.current()),
        }
    }

    /// Avertissements liés à ces seuils.
    pub fn warnings(&self) -> Vec<Warning> {
        let mut warnings = Vec::new();
        if self.min_var_v == 0.0 {
            warnings.push(Warning::DegenerateThreshold { axis: Axis::Voltage });
        }
        if self.min_var_c == 0.0 {
            warnings.push(Warning::DegenerateThreshold { axis: Axis::Current });
        }
        warnings
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn check(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidThreshold { name, value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Voltage,
    Current,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Voltage => write!(f, "tension"),
            Axis::Current => write!(f, "courant"),
        }
    }
}

/// Conditions non bloquantes relevées pendant une comparaison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// Seuil nul : la mise à l'échelle repose sur le seul écart type mesuré.
    DegenerateThreshold { axis: Axis },
    /// Écart type et seuil nuls sur cet axe; échelle unité.
    FlatAxis { axis: Axis },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DegenerateThreshold { axis } => {
                write!(f, "seuil nul en {}, la mise à l'échelle peut amplifier le bruit", axis)
            }
            Warning::FlatAxis { axis } => {
                write!(f, "axe {} plat et sans seuil, échelle unité", axis)
            }
        }
    }
}

static DEFAULT_THRESHOLDS: RwLock<Thresholds> = RwLock::new(Thresholds::DEFAULT);

/// Remplace les seuils globaux.
pub fn set_thresholds(min_var_v: f64, min_var_c: f64) -> Result<()> {
    let thresholds = Thresholds::new(min_var_v, min_var_c)?;
    store(thresholds);
    Ok(())
}

/// Seuils globaux courants.
pub fn thresholds() -> Thresholds {
    *DEFAULT_THRESHOLDS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Calcule les seuils à partir des courbes de référence et les rend globaux.
pub fn derive_thresholds_from_curves(
    open_circuit: &IvCurve,
    short_circuit: &IvCurve,
) -> Thresholds {
    let thresholds = Thresholds::from_reference_curves(open_circuit, short_circuit);
    store(thresholds);
    thresholds
}

fn store(thresholds: Thresholds) {
    *DEFAULT_THRESHOLDS
        .write()
        .unwrap_or_else(PoisonError::into_inner) = thresholds;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_nan() {
        assert!(matches!(
            Thresholds::new(-1.0, 0.1),
            Err(Error::InvalidThreshold {
                name: "min_var_v",
                ..
            })
        ));
        assert!(matches!(
            Thresholds::new(0.1, f64::NAN),
            Err(Error::InvalidThreshold {
                name: "min_var_c",
                ..
            })
        ));
    }

    #[test]
    fn zero_is_legal_but_warned() {
        let thresholds = Thresholds::new(0.0, 0.5).unwrap();
        assert_eq!(
            thresholds.warnings(),
            vec![Warning::DegenerateThreshold {
                axis: Axis::Voltage
            }]
        );
        assert!(Thresholds::DEFAULT.warnings().is_empty());
    }

    #[test]
    fn derived_from_noise_axes() {
        let n = 100;
        let sine: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / n as f64).sin())
            .collect();
        let noise: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 0.05 } else { -0.05 }).collect();

        let open = IvCurve::new(sine.clone(), noise.clone()).unwrap();
        let short = IvCurve::new(noise.iter().map(|x| 2.0 * x).collect(), sine).unwrap();

        let thresholds = Thresholds::from_reference_curves(&open, &short);
        assert!((thresholds.min_var_v - 0.1).abs() < 1e-12);
        assert!((thresholds.min_var_c - 0.05).abs() < 1e-12);
    }

    #[test]
    fn serializes_as_plain_pair() {
        let thresholds = Thresholds::new(0.36, 0.75).unwrap();
        let json = serde_json::to_string(&thresholds).unwrap();
        assert_eq!(json, r#"{"min_var_v":0.36,"min_var_c":0.75}"#);
        let back: Thresholds = serde_json::from_str(&json).unwrap();
        assert_eq!(back, thresholds);
    }
}
