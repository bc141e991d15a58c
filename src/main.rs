// src/main.rs

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ivc_compare::capture::Capture;
use ivc_compare::config::FIXTURE_SCORE_TOLERANCE;
use ivc_compare::fixture::{self, FixtureSuite, PinOutcome};
use ivc_compare::image_export;
use ivc_compare::{
    compute_max_deviations, derive_thresholds_from_curves, Comparator, IvCurve, Thresholds,
    Warning,
};

/// Comparaison de signatures V-I
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score de dissemblance entre deux courbes
    Compare {
        a: PathBuf,
        b: PathBuf,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        /// Dossier où écrire chaque étape de la comparaison (texte et PNG)
        #[arg(long)]
        trace_dir: Option<PathBuf>,
        /// Image des deux courbes superposées
        #[arg(long)]
        png: Option<PathBuf>,
    },
    /// Score de planéité d'une courbe (proche de 0 en circuit ouvert)
    Flatness {
        curve: PathBuf,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Écarts maximaux par axe entre une référence et une mesure
    Maxdev { reference: PathBuf, test: PathBuf },
    /// Seuils de bruit à partir des courbes circuit ouvert et court-circuit
    Calibrate {
        open: PathBuf,
        short: PathBuf,
        /// Fichier JSON où enregistrer les seuils
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Rejoue des fichiers de référence et vérifie les scores attendus
    Verify {
        #[arg(required = true)]
        suites: Vec<PathBuf>,
        #[arg(long, default_value_t = FIXTURE_SCORE_TOLERANCE)]
        tolerance: f64,
    },
    /// Compare les dernières courbes des voies 0 et 1 d'une capture CT220S
    Capture {
        file: PathBuf,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        #[arg(long)]
        png: Option<PathBuf>,
        /// Dossier où enregistrer les deux courbes en JSON (voie0.json, voie1.json)
        #[arg(long)]
        save_curves: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct ThresholdArgs {
    /// Seuil de bruit en tension
    #[arg(long, requires = "min_var_c", conflicts_with = "thresholds")]
    min_var_v: Option<f64>,
    /// Seuil de bruit en courant
    #[arg(long, requires = "min_var_v", conflicts_with = "thresholds")]
    min_var_c: Option<f64>,
    /// Fichier de calibration (voir `calibrate --save`)
    #[arg(long)]
    thresholds: Option<PathBuf>,
}

impl ThresholdArgs {
    fn resolve(&self) -> Result<Thresholds> {
        let explicit = self.min_var_v.zip(self.min_var_c);
        let thresholds = fixture::resolve_thresholds(self.thresholds.as_deref(), explicit)
            .context("Seuils inutilisables")?;
        info!(
            "Seuils : min_var_v={}, min_var_c={}",
            thresholds.min_var_v, thresholds.min_var_c
        );
        Ok(thresholds)
    }
}

fn load(path: &Path) -> Result<IvCurve> {
    fixture::load_curve(path).with_context(|| format!("Impossible de lire {}", path.display()))
}

fn report(warnings: &[Warning]) {
    for w in warnings {
        warn!("{}", w);
    }
}

fn compare(
    a: &Path,
    b: &Path,
    thresholds: &ThresholdArgs,
    trace_dir: Option<&Path>,
    png: Option<&Path>,
) -> Result<()> {
    let (ca, cb) = (load(a)?, load(b)?);
    let comparator = Comparator::new(thresholds.resolve()?);

    let score = match trace_dir {
        Some(dir) => {
            let trace = comparator.trace(&ca, &cb)?;
            fixture::write_trace_text(&trace, dir)?;
            image_export::save_trace_png(&trace, dir.join("stages.png"))?;
            report(&trace.warnings);
            trace.score
        }
        None => {
            let result = comparator.compare_detailed(&ca, &cb)?;
            report(&result.warnings);
            result.score
        }
    };

    if let Some(png) = png {
        image_export::save_overlay_png(&ca, &cb, png)?;
    }

    println!("{:.6}", score);
    Ok(())
}

fn verify(suites: &[PathBuf], tolerance: f64) -> Result<()> {
    let mut total = 0;
    let mut failed = 0;

    for path in suites {
        let suite = FixtureSuite::load(path)
            .with_context(|| format!("Fichier de référence illisible : {}", path.display()))?;
        let result = fixture::run_fixture_suite(&suite, tolerance);

        total += result.pins.len();
        for pin in result.failures() {
            failed += 1;
            match &pin.outcome {
                PinOutcome::Scored(score) => println!(
                    "{} élément {} broche {} : score {:.4}, attendu {:.4}",
                    path.display(),
                    pin.element,
                    pin.pin,
                    score,
                    pin.expected
                ),
                PinOutcome::Failed(e) => println!(
                    "{} élément {} broche {} : erreur {}",
                    path.display(),
                    pin.element,
                    pin.pin,
                    e
                ),
            }
        }
    }

    println!("{}/{} broches dans la tolérance", total - failed, total);
    if failed > 0 {
        bail!("{} broches hors tolérance", failed);
    }
    Ok(())
}

fn compare_capture(
    file: &Path,
    thresholds: &ThresholdArgs,
    png: Option<&Path>,
    save_curves: Option<&Path>,
) -> Result<()> {
    let capture = Capture::load(file)
        .with_context(|| format!("Capture illisible : {}", file.display()))?;

    let ch0 = capture
        .last_on_channel(0)
        .context("Aucune courbe sur la voie 0")?;
    let ch1 = capture
        .last_on_channel(1)
        .context("Aucune courbe sur la voie 1")?;

    let result = Comparator::new(thresholds.resolve()?).compare_detailed(&ch0.curve, &ch1.curve)?;
    report(&result.warnings);

    if let Some(png) = png {
        image_export::save_overlay_png(&ch0.curve, &ch1.curve, png)?;
    }
    if let Some(dir) = save_curves {
        std::fs::create_dir_all(dir)?;
        for captured in [ch0, ch1] {
            let path = dir.join(format!("voie{}.json", captured.channel));
            fixture::save_curve_json(&captured.curve, path)?;
        }
    }

    println!("{:.6}", result.score);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ivc_compare=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Compare {
            a,
            b,
            thresholds,
            trace_dir,
            png,
        } => compare(&a, &b, &thresholds, trace_dir.as_deref(), png.as_deref()),
        Command::Flatness { curve, thresholds } => {
            let result = Comparator::new(thresholds.resolve()?).flatness_detailed(&load(&curve)?)?;
            report(&result.warnings);
            println!("{:.6}", result.score);
            Ok(())
        }
        Command::Maxdev { reference, test } => {
            let dev = compute_max_deviations(&load(&reference)?, &load(&test)?)?;
            println!("tension {:.6}", dev.voltage);
            println!("courant {:.6}", dev.current);
            Ok(())
        }
        Command::Calibrate { open, short, save } => {
            let thresholds = derive_thresholds_from_curves(&load(&open)?, &load(&short)?);
            report(&thresholds.warnings());
            println!("min_var_v {}", thresholds.min_var_v);
            println!("min_var_c {}", thresholds.min_var_c);
            if let Some(path) = save {
                fixture::save_thresholds(&thresholds, path)?;
            }
            Ok(())
        }
        Command::Verify { suites, tolerance } => verify(&suites, tolerance),
        Command::Capture {
            file,
            thresholds,
            png,
            save_curves,
        } => compare_capture(&file, &thresholds, png.as_deref(), save_curves.as_deref()),
    }
}
