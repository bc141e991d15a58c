// src/capture.rs

//! Fichiers de capture CT220S : une trame HID par ligne, en hexadécimal.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, info, warn};

use crate::config::{HEADER_MAGIC, POINTS_PER_CURVE, READ_SIZE, REPORTS_PER_CURVE, REPORT_DATA_SIZE};
use crate::curve::IvCurve;
use crate::error::{Error, Result};

/// Une courbe décodée et la voie qui l'a produite.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedCurve {
    pub channel: u8,
    pub curve: IvCurve,
}

/// Toutes les courbes complètes d'un fichier, dans l'ordre d'arrivée.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    pub curves: Vec<CapturedCurve>,
}

impl Capture {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let capture = Self::from_reader(BufReader::new(file))?;
        info!(
            "Capture {} : {} courbes",
            path.display(),
            capture.curves.len()
        );
        Ok(capture)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut reports: Vec<Vec<u8>> = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let bytes = parse_hex_line(line)
                .map_err(|e| Error::Capture(format!("ligne {}: {}", number + 1, e)))?;
            if !bytes.is_empty() {
                reports.push(bytes);
            }
        }

        if reports.is_empty() {
            return Err(Error::Capture("aucune trame dans le fichier".to_string()));
        }
        debug!("{} trames lues", reports.len());

        let mut curves = Vec::new();
        let mut index = 0;
        while let Some(curve) = read_one_curve(&reports, &mut index)? {
            curves.push(curve);
        }

        if curves.is_empty() {
            return Err(Error::Capture("aucune courbe complète".to_string()));
        }
        Ok(Self { curves })
    }

    /// Dernière courbe reçue sur `channel`.
    pub fn last_on_channel(&self, channel: u8) -> Option<&CapturedCurve> {
        self.curves.iter().rev().find(|c| c.channel == channel)
    }
}

/// Octets d'une ligne hexadécimale; les séparateurs sont ignorés, un
/// demi-octet final aussi.
pub fn parse_hex_line(line: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = line
        .bytes()
        .filter(|b| b.is_ascii_hexdigit())
        .collect();

    digits
        .chunks_exact(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair)
                .map_err(|e| Error::Capture(e.to_string()))?;
            u8::from_str_radix(text, 16)
                .map_err(|e| Error::Capture(format!("hex '{}': {}", text, e)))
        })
        .collect()
}

/// Charge utile d'une trame : lecture brute de 65 octets (identifiant de
/// rapport en tête) ou rapport de 64 octets.
fn extract_payload(report: &[u8]) -> Option<&[u8]> {
    match report.len() {
        READ_SIZE => Some(&report[1..]),
        REPORT_DATA_SIZE => Some(report),
        _ => None,
    }
}

fn header_channel(report: &[u8]) -> Option<u8> {
    let payload = extract_payload(report)?;
    if payload.len() >= 3 && payload[..2] == HEADER_MAGIC {
        Some(payload[2])
    } else {
        None
    }
}

/// Avance jusqu'au prochain en-tête puis lit les trames de données qui le
/// suivent. `None` quand il ne reste plus de courbe complète.
fn read_one_curve(reports: &[Vec<u8>], index: &mut usize) -> Result<Option<CapturedCurve>> {
    let mut channel = None;
    while *index < reports.len() {
        let report = &reports[*index];
        *index += 1;
        if let Some(ch) = header_channel(report) {
            channel = Some(ch);
            break;
        }
    }

    let Some(channel) = channel else {
        return Ok(None);
    };

    if *index + REPORTS_PER_CURVE > reports.len() {
        warn!(
            "Courbe tronquée sur la voie {} : {} trames sur {}",
            channel,
            reports.len() - *index,
            REPORTS_PER_CURVE
        );
        *index = reports.len();
        return Ok(None);
    }

    let mut data = Vec::with_capacity(REPORTS_PER_CURVE * REPORT_DATA_SIZE);
    for report in &reports[*index..*index + REPORTS_PER_CURVE] {
        let payload = extract_payload(report).ok_or_else(|| {
            Error::Capture(format!("trame de {} octets invalide", report.len()))
        })?;
        data.extend_from_slice(payload);
    }
    *index += REPORTS_PER_CURVE;

    let curve = decode_curve(&data)?;
    debug!("Courbe voie {} : {} points", channel, curve.len());
    Ok(Some(CapturedCurve { channel, curve }))
}

/// Échantillons bruts : courant puis tension, `u16` petit-boutiste chacun.
/// Les valeurs restent en points de convertisseur; la comparaison se charge
/// du centrage et de l'échelle.
pub fn decode_curve(data: &[u8]) -> Result<IvCurve> {
    let count = (data.len() / 4).min(POINTS_PER_CURVE);
    if count == 0 {
        return Err(Error::Capture("aucun échantillon".to_string()));
    }

    let mut voltage = Vec::with_capacity(count);
    let mut current = Vec::with_capacity(count);
    for sample in data[..count * 4].chunks_exact(4) {
        current.push(LittleEndian::read_u16(&sample[..2]) as f64);
        voltage.push(LittleEndian::read_u16(&sample[2..]) as f64);
    }

    IvCurve::new(voltage, current)
}
