//! Spreadsheet input for the product import.
//!
//! Workbooks (`.xlsx`, `.xlsm`, `.xls`, `.ods`) are read with calamine,
//! `.csv` files with the csv crate. Either way the first row holds the
//! headers and every following non-blank row becomes a [`SheetRow`].

use crate::utils::error::{OpsError, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => CellValue::from_text(s),
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(f) => CellValue::Float(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            other => CellValue::from_text(&other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Cell rendered as trimmed text. Integral numbers lose the `.0` that a
    /// spreadsheet adds to numeric SKUs.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

/// Price cell: numbers as-is, text with `$` and thousands separators removed.
pub fn parse_decimal(cell: &CellValue) -> Option<Decimal> {
    match cell {
        CellValue::Int(i) => Some(Decimal::from(*i)),
        CellValue::Float(f) => Decimal::from_str(&f.to_string()).ok(),
        CellValue::Text(s) => {
            let cleaned = s.replace(['$', ','], "");
            let cleaned = cleaned.trim();
            Decimal::from_str(cleaned)
                .or_else(|_| Decimal::from_scientific(cleaned))
                .ok()
        }
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

/// Integer cell; floats are truncated.
pub fn parse_int(cell: &CellValue) -> Option<i64> {
    match cell {
        CellValue::Int(i) => Some(*i),
        CellValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        CellValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// 1-based row number as shown by the spreadsheet application.
    pub number: usize,
    pub cells: Vec<CellValue>,
}

impl SheetRow {
    pub fn cell(&self, index: Option<usize>) -> &CellValue {
        index
            .and_then(|i| self.cells.get(i))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn text(&self, index: Option<usize>) -> String {
        self.cell(index).as_text()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
}

impl SheetData {
    /// Loads `path`. `sheet` picks a worksheet by name; the first one is
    /// used otherwise. CSV files have a single implicit sheet.
    pub fn from_path(path: &Path, sheet: Option<&str>) -> Result<Self> {
        if !path.is_file() {
            return Err(OpsError::InputNotFound {
                path: path.display().to_string(),
            });
        }

        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        if is_csv {
            if let Some(name) = sheet {
                tracing::warn!("⚠️ --sheet {} ignored for CSV input", name);
            }
            return Self::from_csv(path);
        }

        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();
        let sheet_name = match sheet {
            Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
            Some(name) => {
                return Err(OpsError::NotFound {
                    entity: "Sheet".to_string(),
                    key: format!("{} (available: {})", name, sheet_names.join(", ")),
                })
            }
            None => sheet_names.first().cloned().ok_or_else(|| OpsError::ValidationError {
                message: format!("{} contains no worksheets", path.display()),
            })?,
        };

        tracing::debug!("📄 Reading sheet '{}' from {}", sheet_name, path.display());
        let range = workbook.worksheet_range(&sheet_name)?;
        Ok(Self::from_range(&range))
    }

    fn from_range(range: &Range<Data>) -> Self {
        let first_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
        let mut rows = range.rows();

        let headers = rows
            .next()
            .map(|cells| {
                cells
                    .iter()
                    .map(|c| CellValue::from_data(c).as_text())
                    .collect()
            })
            .unwrap_or_default();

        let rows = rows
            .enumerate()
            .map(|(offset, cells)| SheetRow {
                number: first_row + offset + 1,
                cells: cells.iter().map(CellValue::from_data).collect(),
            })
            .filter(|row| !row.cells.iter().all(CellValue::is_empty))
            .collect();

        Self { headers, rows }
    }

    fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut data = SheetData::default();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            if index == 0 {
                data.headers = record
                    .iter()
                    .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
                    .collect();
                continue;
            }

            let cells: Vec<CellValue> = record.iter().map(CellValue::from_text).collect();
            if cells.iter().all(CellValue::is_empty) {
                continue;
            }
            data.rows.push(SheetRow {
                number: index + 1,
                cells,
            });
        }

        Ok(data)
    }
}

/// Canonical import fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Category,
    Name,
    Sku,
    Price,
    Stock,
    Description,
    ImageUrl,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Category,
        Field::Name,
        Field::Sku,
        Field::Price,
        Field::Stock,
        Field::Description,
        Field::ImageUrl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Category => "category",
            Field::Name => "name",
            Field::Sku => "sku",
            Field::Price => "price",
            Field::Stock => "stock",
            Field::Description => "description",
            Field::ImageUrl => "image_url",
        }
    }

    /// Accepted header spellings, tried in order.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Field::Category => &["categoria", "categoría", "category", "cat", "familia"],
            Field::Name => &["nombre", "name", "titulo", "título", "producto"],
            Field::Sku => &["sku", "codigo", "código", "codigo_sku", "id", "referencia"],
            Field::Price => &["precio", "price", "valor"],
            Field::Stock => &["stock", "cantidad", "inventario", "existencias"],
            Field::Description => &["descripcion", "descripción", "description", "detalle"],
            Field::ImageUrl => &["imagen", "imagen_url", "image", "image_url", "foto", "foto_url"],
        }
    }

    pub fn is_mandatory(&self) -> bool {
        matches!(self, Field::Category | Field::Sku)
    }
}

/// Column index of each canonical field in a concrete header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub category: usize,
    pub sku: usize,
    pub name: Option<usize>,
    pub price: Option<usize>,
    pub stock: Option<usize>,
    pub description: Option<usize>,
    pub image_url: Option<usize>,
}

impl ColumnMapping {
    pub fn from_headers(headers: &[String]) -> Result<Self> {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |field: Field| -> Option<usize> {
            field
                .synonyms()
                .iter()
                .find_map(|syn| lowered.iter().position(|h| !h.is_empty() && h == syn))
        };
        let require = |field: Field| -> Result<usize> {
            find(field).ok_or_else(|| OpsError::MissingColumn {
                field: field.as_str().to_string(),
                headers: headers.to_vec(),
            })
        };

        let mapping = Self {
            category: require(Field::Category)?,
            sku: require(Field::Sku)?,
            name: find(Field::Name),
            price: find(Field::Price),
            stock: find(Field::Stock),
            description: find(Field::Description),
            image_url: find(Field::ImageUrl),
        };

        for field in Field::ALL {
            match mapping.column(field) {
                Some(index) => tracing::debug!("🔗 {} <- '{}'", field.as_str(), headers[index]),
                None => tracing::debug!("🔗 {} <- (none)", field.as_str()),
            }
        }

        Ok(mapping)
    }

    pub fn column(&self, field: Field) -> Option<usize> {
        match field {
            Field::Category => Some(self.category),
            Field::Sku => Some(self.sku),
            Field::Name => self.name,
            Field::Price => self.price,
            Field::Stock => self.stock,
            Field::Description => self.description,
            Field::ImageUrl => self.image_url,
        }
    }
}
