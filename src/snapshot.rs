use crate::error::Result;
use crate::types::Product;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use serde_json::Value;
use tracing::{debug, info, warn};

/// The JSON document consumed by the front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_updated: String,
    pub products: Vec<Product>,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    last_updated: String,
    #[serde(default)]
    products: Vec<Value>,
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Snapshot {
    pub fn new(products: Vec<Product>) -> Self {
        Self::at(Utc::now(), products)
    }

    pub fn at(at: DateTime<Utc>, products: Vec<Product>) -> Self {
        Self {
            last_updated: format_timestamp(at),
            products,
        }
    }

    /// Read a snapshot; a missing file is `None`.
    ///
    /// Records that no longer form a valid product (no readable price, an
    /// unknown retailer) are dropped with a warning instead of failing the load.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("No previous snapshot at {}", path.display());
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let raw: RawSnapshot = serde_json::from_str(&content)?;

        let total = raw.products.len();
        let products: Vec<Product> = raw
            .products
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Product>(record) {
                Ok(product) => Some(product),
                Err(e) => {
                    debug!("Unreadable snapshot record: {}", e);
                    None
                }
            })
            .collect();
        if products.len() < total {
            warn!(
                "Dropped {} unreadable records from {}",
                total - products.len(),
                path.display()
            );
        }

        Ok(Some(Self {
            last_updated: raw.last_updated,
            products,
        }))
    }

    /// Pretty-printed (4-space indent) JSON bytes, non-ASCII left unescaped
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Write through a sibling temp file and rename, so readers never see a partial file
    pub fn write(&self, path: &Path) -> Result<()> {
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir)?;
        }

        let bytes = self.to_pretty_json()?;
        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        info!(
            "Snapshot saved with {} products to {}",
            self.products.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Retailer;
    use chrono::TimeZone;

    fn sample() -> Snapshot {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 6, 30, 0).unwrap();
        Snapshot::at(
            at,
            vec![Product {
                name: "Творог 5%".into(),
                price: 119.99,
                old_price: Some(149.99),
                discount_percent: Some(20),
                category: "Молочные продукты".into(),
                retailer: Retailer::Pyaterochka,
                img_url: Some("https://example.test/t.png".into()),
            }],
        )
    }

    #[test]
    fn timestamp_is_utc_iso_with_z() {
        assert_eq!(sample().last_updated, "2026-10-19T06:30:00.000000Z");
    }

    #[test]
    fn pretty_json_keeps_cyrillic_and_four_space_indent() {
        let text = String::from_utf8(sample().to_pretty_json().unwrap()).unwrap();
        assert!(text.contains("\"name\": \"Творог 5%\""));
        assert!(text.contains("\"retailer\": \"Пятёрочка\""));
        assert!(text.contains("\n    \"last_updated\""));
    }

    #[test]
    fn write_then_load_returns_same_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs").join("data.json");

        let snapshot = sample();
        snapshot.write(&path).unwrap();

        assert!(!dir.path().join("docs").join("data.json.tmp").exists());
        assert_eq!(Snapshot::load(&path).unwrap(), Some(snapshot));
    }

    #[test]
    fn load_accepts_records_in_the_legacy_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(
            &path,
            r#"{
    "last_updated": "2025-03-01T10:00:00.123456Z",
    "products": [
        {"name": "Молоко", "price": "89,99 ₽", "store": "Чижик", "category": "молоко"},
        {"name": "Кефир", "price": null, "store": "Пятёрочка", "category": "Молочная продукция"},
        {"name": "Хлеб", "price": 45.5, "store": "Пятёрочка", "category": "Хлеб", "img_url": null}
    ]
}"#,
        )
        .unwrap();

        let snapshot = Snapshot::load(&path).unwrap().unwrap();

        assert_eq!(snapshot.last_updated, "2025-03-01T10:00:00.123456Z");
        assert_eq!(snapshot.products.len(), 2);
        assert_eq!(snapshot.products[0].price, 89.99);
        assert_eq!(snapshot.products[0].retailer, Retailer::Chizhik);
        assert_eq!(snapshot.products[1].name, "Хлеб");
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Snapshot::load(&dir.path().join("nope.json")).unwrap(), None);
    }
}
