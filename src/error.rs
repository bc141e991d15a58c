// src/error.rs

//! Erreurs du noyau de comparaison et de la lecture des fichiers de courbes.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Courbe vide, échantillon non fini ou longueur au-delà de la capacité.
    #[error("courbe invalide : {0}")]
    InvalidInput(String),

    #[error("longueurs différentes : {voltage} tensions, {current} courants")]
    LengthMismatch { voltage: usize, current: usize },

    /// Trop peu de points distincts pour construire la spline.
    #[error("points insuffisants : {found} après suppression des répétitions, {required} au minimum")]
    InsufficientPoints { found: usize, required: usize },

    #[error("seuil invalide {name} : {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    /// Distance ou planéité non finie malgré des entrées finies.
    #[error("résultat non fini : {0}")]
    NonFinite(&'static str),

    /// Capture CT220S mal formée.
    #[error("erreur de capture : {0}")]
    Capture(String),

    #[error("format de courbe non reconnu : {0}")]
    UnsupportedFormat(String),

    #[error("erreur d'E/S : {0}")]
    Io(#[from] std::io::Error),

    #[error("erreur JSON : {0}")]
    Json(#[from] serde_json::Error),

    #[error("erreur d'image : {0}")]
    Image(#[from] image::ImageError),
}
