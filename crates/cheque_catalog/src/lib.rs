use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_ROTATION_DEGREES: i32 = -90;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog io error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("template {template:?} has invalid dimensions {width}cm x {height}cm")]
    InvalidDimensions {
        template: String,
        width: f32,
        height: f32,
    },
    #[error("template {template:?} has rotation {degrees}, expected a multiple of 90")]
    InvalidRotation { template: String, degrees: i32 },
}

/// The five canonical cheque slots, in planning order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Date,
    Beneficiary,
    AmountWords,
    Amount,
    Signer,
}

impl FieldKey {
    pub const ALL: [FieldKey; 5] = [
        FieldKey::Date,
        FieldKey::Beneficiary,
        FieldKey::AmountWords,
        FieldKey::Amount,
        FieldKey::Signer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Date => "dateField",
            FieldKey::Beneficiary => "beneficiaryField",
            FieldKey::AmountWords => "amountWordsField",
            FieldKey::Amount => "amountField",
            FieldKey::Signer => "signerField",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        FieldKey::ALL
            .into_iter()
            .find(|key| key.as_str() == raw.trim())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Field {
    pub x: i32,
    pub y: i32,
    pub font_size: i32,
    pub alignment: i32,
    pub width: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixedTextField {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub font_size: i32,
    pub alignment: i32,
    pub width: i32,
}

impl FixedTextField {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Template {
    pub template_name: String,
    // Preview-only artwork; never part of printed output.
    pub image_path: Option<String>,
    pub width: f32,
    pub height: f32,
    pub fields: BTreeMap<String, Field>,
    pub date_format: Option<String>,
    pub fixed_text_field: Option<FixedTextField>,
    pub rotation: Option<i32>,
}

impl Template {
    pub fn field(&self, key: FieldKey) -> Option<&Field> {
        self.fields.get(key.as_str())
    }

    pub fn fixed_text(&self) -> Option<&FixedTextField> {
        self.fixed_text_field
            .as_ref()
            .filter(|fixed| !fixed.is_blank())
    }

    pub fn rotation_degrees(&self) -> i32 {
        self.rotation.unwrap_or(DEFAULT_ROTATION_DEGREES)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if !ok(self.width) || !ok(self.height) {
            return Err(CatalogError::InvalidDimensions {
                template: self.template_name.clone(),
                width: self.width,
                height: self.height,
            });
        }
        let degrees = self.rotation_degrees();
        if degrees % 90 != 0 {
            return Err(CatalogError::InvalidRotation {
                template: self.template_name.clone(),
                degrees,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BankTemplate {
    pub name: String,
    pub templates: Vec<Template>,
}

impl BankTemplate {
    pub fn template(&self, name: &str) -> Option<&Template> {
        let name = name.trim();
        self.templates.iter().find(|t| t.template_name == name)
    }
}

/// Immutable snapshot of a loaded catalog. Reloading produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    banks: Vec<BankTemplate>,
    fingerprint: String,
}

impl Catalog {
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        Self::from_json_slice(raw.as_bytes())
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CatalogError> {
        let banks: Vec<BankTemplate> = serde_json::from_slice(bytes)?;
        Ok(Self {
            banks,
            fingerprint: hex_sha256(bytes),
        })
    }

    pub fn load_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_slice(&bytes)
    }

    /// Loads the user's edited copy when present and valid, otherwise the shipped default.
    pub fn load_with_override(
        user_path: impl AsRef<Path>,
        default_path: impl AsRef<Path>,
    ) -> Result<Self, CatalogError> {
        let user_path = user_path.as_ref();
        if user_path.is_file() {
            if let Ok(catalog) = Self::load_path(user_path) {
                return Ok(catalog);
            }
        }
        Self::load_path(default_path)
    }

    pub fn banks(&self) -> &[BankTemplate] {
        &self.banks
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn bank(&self, name: &str) -> Option<&BankTemplate> {
        let name = name.trim();
        self.banks.iter().find(|b| b.name == name)
    }

    pub fn template(&self, bank: &str, template: &str) -> Option<&Template> {
        self.bank(bank).and_then(|b| b.template(template))
    }

    /// First template with this name across all banks.
    pub fn find_template(&self, template: &str) -> Option<&Template> {
        self.banks.iter().find_map(|b| b.template(template))
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
