use serde::{Deserialize, Serialize};

/// Fields extracted from an Indonesian KTP identity card.
///
/// Fixed schema rather than an open map, so the confidence-scoring contract
/// and the serialized log format are explicit. Fields the parser could not
/// find are empty strings, never omitted keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KtpFields {
    #[serde(rename = "NIK", default)]
    pub nik: String,
    #[serde(rename = "Nama", default)]
    pub nama: String,
    #[serde(rename = "Tempat", default)]
    pub tempat: String,
    #[serde(rename = "TanggalLahir", default)]
    pub tanggal_lahir: String,
    #[serde(rename = "JenisKelamin", default)]
    pub jenis_kelamin: String,
    #[serde(rename = "Alamat", default)]
    pub alamat: String,
    #[serde(rename = "RT/RW", default)]
    pub rt_rw: String,
    #[serde(rename = "Kel/Desa", default)]
    pub kel_desa: String,
    #[serde(rename = "Kecamatan", default)]
    pub kecamatan: String,
    #[serde(rename = "Agama", default)]
    pub agama: String,
    #[serde(rename = "StatusPerkawinan", default)]
    pub status_perkawinan: String,
    #[serde(rename = "Pekerjaan", default)]
    pub pekerjaan: String,
    #[serde(rename = "Kewarganegaraan", default)]
    pub kewarganegaraan: String,
    #[serde(rename = "GolDarah", default)]
    pub gol_darah: String,
    #[serde(rename = "BerlakuHingga", default)]
    pub berlaku_hingga: String,
}

impl KtpFields {
    /// The four fields that drive the confidence verdict.
    pub fn required(&self) -> [&str; 4] {
        [&self.nik, &self.nama, &self.tanggal_lahir, &self.alamat]
    }

    /// How many of the required fields are non-empty.
    pub fn required_filled(&self) -> usize {
        self.required().iter().filter(|v| !v.is_empty()).count()
    }
}
