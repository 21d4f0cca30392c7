use crate::domain::KtpFields;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_NIK: Regex = Regex::new(r"\b\d{16}\b").unwrap();
    static ref RE_DATE: Regex = Regex::new(r"\b\d{2}-\d{2}-\d{4}\b").unwrap();
    static ref RE_GENDER: Regex = Regex::new(r"(?i)\b(PEREMPUAN|LAKI-?LAKI)\b").unwrap();
    static ref RE_BLOOD: Regex = Regex::new(r"(?i)Gol\.?\s*Darah[:\s]*([A-Z]+)").unwrap();
    static ref RE_VALID_UNTIL: Regex =
        Regex::new(r"(?i)BERLAKU HINGGA[:\s]*(\d{2}-\d{2}-\d{4})").unwrap();
    static ref RE_CITIZENSHIP: Regex = Regex::new(r"(?i)\b(WNI|WNA)\b").unwrap();
    static ref RE_MARITAL: Regex =
        Regex::new(r"(?i)\b(BELUM KAWIN|KAWIN|CERAI HIDUP|CERAI MATI)\b").unwrap();
    static ref RE_RELIGION: Regex =
        Regex::new(r"(?i)\b(ISLAM|KRISTEN|KATOLIK|HINDU|BUDDHA|KONGHUCU)\b").unwrap();
}

/// Best-effort heuristic extraction of KTP fields from OCR text.
///
/// Misses leave the field as an empty string; the scorer downstream decides
/// what incomplete extraction means. The layout assumptions (address block
/// follows the gender line, name sits between NIK and birthplace) come from
/// the standard KTP print layout.
pub fn parse_ktp(ocr_text: &str) -> KtpFields {
    let mut fields = KtpFields::default();
    let text = ocr_text.lines().collect::<Vec<_>>().join(" ");

    if let Some(m) = RE_NIK.find(&text) {
        fields.nik = m.as_str().to_string();
    }

    if let Some(m) = RE_DATE.find(&text) {
        fields.tanggal_lahir = m.as_str().to_string();
    }

    if let Some(c) = RE_GENDER.captures(&text) {
        fields.jenis_kelamin = capitalize(&c[1]);
    }

    if let Some(c) = RE_BLOOD.captures(&text) {
        fields.gol_darah = c[1].to_uppercase();
    }

    if let Some(c) = RE_VALID_UNTIL.captures(&text) {
        fields.berlaku_hingga = c[1].to_string();
    } else {
        // Fallback: second-to-last date on the card is usually the expiry.
        let dates: Vec<&str> = RE_DATE.find_iter(&text).map(|m| m.as_str()).collect();
        if dates.len() >= 2 {
            fields.berlaku_hingga = dates[dates.len() - 2].to_string();
        }
    }

    if let Some(c) = RE_CITIZENSHIP.captures(&text) {
        fields.kewarganegaraan = c[1].to_uppercase();
    }

    if let Some(c) = RE_MARITAL.captures(&text) {
        fields.status_perkawinan = title_case(&c[1]);
    }

    if let Some(c) = RE_RELIGION.captures(&text) {
        fields.agama = title_case(&c[1]);
    }

    // Birthplace precedes the birth date, comma-separated.
    if !fields.tanggal_lahir.is_empty() {
        let pattern = format!(
            r"(?i)([A-Z][A-Z\s]+?),\s*{}",
            regex::escape(&fields.tanggal_lahir)
        );
        if let Ok(re) = Regex::new(&pattern) {
            if let Some(c) = re.captures(&text) {
                fields.tempat = title_case(c[1].trim());
            }
        }
    }

    // The name sits between the NIK and the birthplace.
    if !fields.nik.is_empty() && !fields.tempat.is_empty() {
        let pattern = format!(
            r"(?i){}[:\s]*([A-Z][A-Z\s]+?)[:\s]*{}",
            regex::escape(&fields.nik),
            regex::escape(&fields.tempat)
        );
        if let Ok(re) = Regex::new(&pattern) {
            if let Some(c) = re.captures(&text) {
                fields.nama = title_case(c[1].trim());
            }
        }
    }

    // Address block: the lines after the gender line.
    if !fields.jenis_kelamin.is_empty() {
        let lines: Vec<&str> = ocr_text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let gender_upper = fields.jenis_kelamin.to_uppercase();
        if let Some(idx) = lines
            .iter()
            .position(|l| l.to_uppercase().contains(&gender_upper))
        {
            let mut block = lines
                .iter()
                .skip(idx + 1)
                .map(|l| l.replace(':', "").trim().to_string());
            fields.alamat = block.next().unwrap_or_default();
            fields.rt_rw = block.next().unwrap_or_default();
            fields.kel_desa = block.next().unwrap_or_default();
            fields.kecamatan = block.next().unwrap_or_default();
        }
    }

    // Occupation sits between religion and citizenship.
    if !fields.kewarganegaraan.is_empty() && !fields.agama.is_empty() {
        let pattern = format!(
            r"(?i){}[:\s]*(.*?)\s+{}",
            regex::escape(&fields.agama),
            regex::escape(&fields.kewarganegaraan)
        );
        if let Ok(re) = Regex::new(&pattern) {
            if let Some(c) = re.captures(&text) {
                fields.pekerjaan = title_case(c[1].replace(':', "").trim());
            }
        }
    }

    trim_all(&mut fields);
    fields
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn trim_all(fields: &mut KtpFields) {
    for value in [
        &mut fields.nik,
        &mut fields.nama,
        &mut fields.tempat,
        &mut fields.tanggal_lahir,
        &mut fields.jenis_kelamin,
        &mut fields.alamat,
        &mut fields.rt_rw,
        &mut fields.kel_desa,
        &mut fields.kecamatan,
        &mut fields.agama,
        &mut fields.status_perkawinan,
        &mut fields.pekerjaan,
        &mut fields.kewarganegaraan,
        &mut fields.gol_darah,
        &mut fields.berlaku_hingga,
    ] {
        *value = value.trim().to_string();
    }
}
